//! HTTP transport.
//!
//! POSTs the chat request as JSON and exposes the streamed response body.

use async_trait::async_trait;
use futures::StreamExt;

use super::{ChatRequest, ChatTransport, ChunkStream, TransportError};
use crate::config::Config;

/// Transport that talks to the dashboard's chat endpoint over HTTP.
///
/// # Examples
///
/// ```no_run
/// use flowchat_core::transport::{ChatRequest, ChatTransport, HttpTransport};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = HttpTransport::new("http://localhost:3000/api/support/chat");
/// let request = ChatRequest {
///     message: "Which flows failed today?".to_string(),
///     conversation_id: None,
/// };
/// let _body = transport.open(&request).await?;
/// # Ok(())
/// # }
/// ```
pub struct HttpTransport {
    /// HTTP client for API requests.
    client: reqwest::Client,
    /// Chat endpoint URL.
    endpoint: String,
    /// Optional bearer token.
    api_key: Option<String>,
}

impl HttpTransport {
    /// Create a transport for the given endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: None,
        }
    }

    /// Create a transport from application configuration.
    pub fn from_config(config: &Config) -> Self {
        let transport = Self::new(&config.endpoint);
        match config.api_key {
            Some(ref key) => transport.with_api_key(key),
            None => transport,
        }
    }

    /// Send a bearer token with every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// The endpoint requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open(&self, request: &ChatRequest) -> Result<ChunkStream, TransportError> {
        let endpoint = self.endpoint.as_str();
        tracing::debug!(endpoint, "http: POST chat request");

        let mut builder = self
            .client
            .post(endpoint)
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(request);
        if let Some(ref key) = self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

        let status = response.status();
        tracing::debug!(status = status.as_u16(), "http: chat response status");

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(TransportError::AuthenticationError(
                "Invalid API key".to_string(),
            ));
        }

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| TransportError::RequestFailed(e.to_string()))
        });
        Ok(Box::pin(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_transport_new() {
        let transport = HttpTransport::new("http://localhost:1/chat");
        assert_eq!(transport.endpoint(), "http://localhost:1/chat");
        assert!(transport.api_key.is_none());
    }

    #[test]
    fn test_http_transport_from_config() {
        let config = Config {
            api_key: Some("tok".to_string()),
            ..Config::default()
        };
        let transport = HttpTransport::from_config(&config);
        assert_eq!(transport.endpoint(), config.endpoint);
        assert_eq!(transport.api_key.as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_request_failure() {
        // Port 1 is reserved and refuses connections.
        let transport = HttpTransport::new("http://127.0.0.1:1/chat");
        let request = ChatRequest {
            message: "hi".to_string(),
            conversation_id: None,
        };
        let result = transport.open(&request).await;
        assert!(matches!(result, Err(TransportError::RequestFailed(_))));
    }
}
