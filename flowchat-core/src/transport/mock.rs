//! Mock transport for testing.
//!
//! Provides [`MockTransport`], a scripted implementation of
//! [`ChatTransport`] for unit and integration testing.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{ChatRequest, ChatTransport, ChunkStream, TransportError};

/// A scripted transport.
///
/// Replays the configured body chunks in order, optionally failing before
/// the body opens or after the last chunk, or hanging after the last chunk. Every request is recorded.
///
/// # Examples
///
/// ```
/// use flowchat_core::transport::{ChatRequest, ChatTransport, MockTransport};
/// use futures::StreamExt;
///
/// # async fn example() {
/// let transport = MockTransport::new().with_chunk("data: [DONE]\n\n");
/// let request = ChatRequest { message: "hi".into(), conversation_id: None };
///
/// let mut body = transport.open(&request).await.unwrap();
/// assert_eq!(body.next().await.unwrap().unwrap(), b"data: [DONE]\n\n".to_vec());
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MockTransport {
    chunks: Vec<Vec<u8>>,
    open_error: Option<String>,
    stream_error: Option<String>,
    stall: bool,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockTransport {
    /// Create a transport whose body is empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a body chunk.
    #[must_use]
    pub fn with_chunk(mut self, chunk: impl Into<Vec<u8>>) -> Self {
        self.chunks.push(chunk.into());
        self
    }

    /// Append several body chunks.
    #[must_use]
    pub fn with_chunks<I, C>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        self.chunks.extend(chunks.into_iter().map(Into::into));
        self
    }

    /// Fail to connect.
    #[must_use]
    pub fn with_open_error(mut self, message: impl Into<String>) -> Self {
        self.open_error = Some(message.into());
        self
    }

    /// Fail after the scripted chunks have been delivered.
    #[must_use]
    pub fn with_stream_error(mut self, message: impl Into<String>) -> Self {
        self.stream_error = Some(message.into());
        self
    }

    /// Never end the body after the scripted chunks.
    #[must_use]
    pub fn with_stall(mut self) -> Self {
        self.stall = true;
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        match self.requests.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn open(&self, request: &ChatRequest) -> Result<ChunkStream, TransportError> {
        match self.requests.lock() {
            Ok(mut guard) => guard.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }

        if let Some(ref message) = self.open_error {
            return Err(TransportError::RequestFailed(message.clone()));
        }

        let chunks = self.chunks.clone();
        let stream_error = self.stream_error.clone();
        let stall = self.stall;
        Ok(Box::pin(async_stream::stream! {
            for chunk in chunks {
                tokio::task::yield_now().await;
                yield Ok(chunk);
            }
            if let Some(message) = stream_error {
                yield Err(TransportError::RequestFailed(message));
            }
            if stall {
                futures::future::pending::<()>().await;
            }
        }))
    }
}
