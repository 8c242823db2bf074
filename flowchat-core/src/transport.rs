//! Streaming transport abstraction.
//!
//! Defines the [`ChatTransport`] port that delivers the raw response body of
//! one chat request as a stream of byte chunks, and the [`TransportError`]
//! type for connection failures.

mod http;
mod mock;

pub use http::HttpTransport;
pub use mock::MockTransport;

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Request failed due to network or connection issues.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The backend rejected the credentials.
    #[error("authentication failed: {0}")]
    AuthenticationError(String),

    /// The backend answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, if readable.
        body: String,
    },

    /// No chunk arrived within the configured read timeout.
    #[error("no data received for {0:?}")]
    Timeout(Duration),
}

/// Body of a chat request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// The user's message text.
    pub message: String,
    /// Conversation to continue, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// Stream of raw response body chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, TransportError>> + Send>>;

/// Port for chat transports.
///
/// Implementations must be thread-safe (`Send + Sync`) for use
/// in async contexts.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send the request and return the streamed response body.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the connection cannot be established
    /// or the backend rejects the request.
    async fn open(&self, request: &ChatRequest) -> Result<ChunkStream, TransportError>;
}
