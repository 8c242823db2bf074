//! History boundary for finalized messages.
//!
//! Provides the [`HistoryStore`] trait as a port for persistence adapters,
//! keyed by conversation id, along with an in-memory adapter.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::message::{Message, Role};
use crate::text::preview;

/// Maximum characters of the preview shown in conversation listings.
const PREVIEW_CHARS: usize = 50;

/// Errors that can occur during history operations.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The requested conversation was not found.
    #[error("conversation not found: {0}")]
    NotFound(String),

    /// The backing store failed.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Summary information for listing conversations.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSummary {
    /// Conversation id.
    pub id: String,
    /// Number of stored messages.
    pub message_count: u32,
    /// Preview of the first user message.
    pub preview: Option<String>,
    /// Timestamp of the newest message.
    pub updated_at: DateTime<Utc>,
}

/// Port for history storage implementations.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append a finalized message to a conversation, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Storage`] if the write fails.
    async fn append(&self, conversation_id: &str, message: &Message) -> Result<(), HistoryError>;

    /// Load all messages of a conversation, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::NotFound`] if the conversation doesn't exist.
    async fn load(&self, conversation_id: &str) -> Result<Vec<Message>, HistoryError>;

    /// List conversations, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Storage`] if the read fails.
    async fn conversations(&self) -> Result<Vec<ConversationSummary>, HistoryError>;
}

/// History kept in process memory.
///
/// # Examples
///
/// ```
/// use flowchat_core::history::{HistoryStore, MemoryHistory};
/// use flowchat_core::message::{Message, Role};
///
/// # async fn example() {
/// let history = MemoryHistory::new();
/// history.append("c-1", &Message::new(Role::User, "hi")).await.unwrap();
///
/// let messages = history.load("c-1").await.unwrap();
/// assert_eq!(messages.len(), 1);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryHistory {
    conversations: RwLock<HashMap<String, Vec<Message>>>,
}

impl MemoryHistory {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn append(&self, conversation_id: &str, message: &Message) -> Result<(), HistoryError> {
        let mut conversations = self.conversations.write().await;
        conversations
            .entry(conversation_id.to_string())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn load(&self, conversation_id: &str) -> Result<Vec<Message>, HistoryError> {
        let conversations = self.conversations.read().await;
        conversations
            .get(conversation_id)
            .cloned()
            .ok_or_else(|| HistoryError::NotFound(conversation_id.to_string()))
    }

    async fn conversations(&self) -> Result<Vec<ConversationSummary>, HistoryError> {
        let conversations = self.conversations.read().await;
        let mut summaries: Vec<ConversationSummary> = conversations
            .iter()
            .filter_map(|(id, messages)| {
                let updated_at = messages.iter().map(|m| m.timestamp).max()?;
                Some(ConversationSummary {
                    id: id.clone(),
                    message_count: u32::try_from(messages.len()).unwrap_or(u32::MAX),
                    preview: messages
                        .iter()
                        .find(|m| m.role == Role::User)
                        .map(|m| preview(&m.content, PREVIEW_CHARS)),
                    updated_at,
                })
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_and_load() {
        let history = MemoryHistory::new();
        let user = Message::new(Role::User, "Show my flows");
        let reply = Message::new(Role::Assistant, "You have none.");

        history.append("c-1", &user).await.unwrap();
        history.append("c-1", &reply).await.unwrap();

        let messages = history.load("c-1").await.unwrap();
        assert_eq!(messages, vec![user, reply]);
    }

    #[tokio::test]
    async fn test_load_missing_conversation() {
        let history = MemoryHistory::new();
        let result = history.load("missing").await;
        assert!(matches!(result, Err(HistoryError::NotFound(id)) if id == "missing"));
    }

    #[tokio::test]
    async fn test_conversations_sorted_by_recency() {
        let history = MemoryHistory::new();
        history
            .append("old", &Message::new(Role::User, "first question"))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        history
            .append("new", &Message::new(Role::Assistant, "hello"))
            .await
            .unwrap();
        history
            .append("new", &Message::new(Role::User, "second\nquestion"))
            .await
            .unwrap();

        let summaries = history.conversations().await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, "new");
        assert_eq!(summaries[0].message_count, 2);
        assert_eq!(summaries[0].preview.as_deref(), Some("second question"));
        assert_eq!(summaries[1].preview.as_deref(), Some("first question"));
    }

    #[tokio::test]
    async fn test_history_store_is_object_safe() {
        let history: Box<dyn HistoryStore> = Box::new(MemoryHistory::new());
        assert!(history.conversations().await.unwrap().is_empty());
    }
}
