//! Message types for support-chat conversations.
//!
//! Provides the [`Role`] enum and the immutable [`Message`] record that a
//! finished exchange is folded into before it is handed to history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
}

/// A finalized message in a conversation.
///
/// Assistant messages carry the accumulated answer text in `content` and the
/// accumulated reasoning, if any was streamed, in `thinking`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique identifier (UUID v7, time-sortable).
    pub id: Uuid,
    /// The role of this message.
    pub role: Role,
    /// The text content of this message.
    pub content: String,
    /// Reasoning text streamed alongside the answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    /// When the message was created.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new message with the given role and content.
    ///
    /// # Examples
    ///
    /// ```
    /// use flowchat_core::message::{Message, Role};
    ///
    /// let msg = Message::new(Role::User, "List my flows");
    /// assert_eq!(msg.role, Role::User);
    /// assert_eq!(msg.content, "List my flows");
    /// assert!(msg.thinking.is_none());
    /// ```
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            role,
            content: content.into(),
            thinking: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach reasoning text. Empty reasoning is stored as `None`.
    pub fn with_thinking(mut self, thinking: impl Into<String>) -> Self {
        let thinking = thinking.into();
        self.thinking = (!thinking.is_empty()).then_some(thinking);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_new_with_str() {
        let msg = Message::new(Role::User, "Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
        assert!(!msg.id.is_nil());
        assert!(msg.timestamp <= Utc::now());
    }

    #[test]
    fn test_message_with_thinking() {
        let msg = Message::new(Role::Assistant, "Done").with_thinking("checking runs");
        assert_eq!(msg.thinking.as_deref(), Some("checking runs"));
    }

    #[test]
    fn test_message_with_empty_thinking_is_none() {
        let msg = Message::new(Role::Assistant, "Done").with_thinking("");
        assert!(msg.thinking.is_none());
    }

    #[test]
    fn test_message_ids_are_unique() {
        let a = Message::new(Role::User, "a");
        let b = Message::new(Role::User, "b");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn test_message_serializes_camel_case_and_skips_empty_thinking() {
        let msg = Message::new(Role::Assistant, "hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "hi");
        assert!(json.get("thinking").is_none());
        assert!(json.get("timestamp").is_some());
    }

    #[test]
    fn test_message_deserialization() {
        let msg = Message::new(Role::Assistant, "hi").with_thinking("hmm");
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
