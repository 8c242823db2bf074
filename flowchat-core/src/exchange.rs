//! Async driver for one request/response exchange.
//!
//! [`run_exchange`] awaits body chunks from a [`ChatTransport`] and feeds them
//! to a [`ChatSession`]. Awaiting the next chunk is the only suspension
//! point; everything between reads is synchronous. Dropping the returned
//! future is the cancellation mechanism.

use std::time::Duration;

use futures::StreamExt;

use crate::message::Message;
use crate::segment::ContentSegment;
use crate::session::{ChatSession, SessionError};
use crate::transport::{ChatTransport, TransportError};

/// How an exchange ended.
#[derive(Debug)]
pub enum ExchangeOutcome {
    /// A finish frame arrived; the message is in history.
    Finished(Message),
    /// The body ended without a finish frame. The exchange stays in flight.
    Incomplete,
    /// The transport failed; the fallback message is in history.
    Failed(TransportError),
}

/// Send `text` and stream the response into `session`.
///
/// `observer` is called with the current render view after every chunk,
/// and once more with the final message's segments when it finishes.
/// With `read_timeout` set, a read that stalls longer than the limit counts
/// as a transport failure; without it reads wait indefinitely.
///
/// # Errors
///
/// Returns [`SessionError::ExchangeInFlight`] if `session` is still
/// streaming a previous exchange.
///
/// # Examples
///
/// ```
/// use flowchat_core::exchange::{ExchangeOutcome, run_exchange};
/// use flowchat_core::session::ChatSession;
/// use flowchat_core::transport::MockTransport;
///
/// # async fn example() {
/// let transport = MockTransport::new()
///     .with_chunk("data: {\"type\":\"text-delta\",\"delta\":\"Hi\"}\n\n")
///     .with_chunk("data: {\"type\":\"finish\"}\n\n");
/// let mut session = ChatSession::new();
///
/// let outcome = run_exchange(&mut session, &transport, "hello", None, |_| {})
///     .await
///     .unwrap();
/// assert!(matches!(outcome, ExchangeOutcome::Finished(m) if m.content == "Hi"));
/// # }
/// ```
pub async fn run_exchange<F>(
    session: &mut ChatSession,
    transport: &dyn ChatTransport,
    text: &str,
    read_timeout: Option<Duration>,
    mut observer: F,
) -> Result<ExchangeOutcome, SessionError>
where
    F: FnMut(&[ContentSegment]),
{
    let request = session.begin(text)?;

    let mut body = match transport.open(&request).await {
        Ok(body) => body,
        Err(e) => {
            session.fail(&e.to_string());
            return Ok(ExchangeOutcome::Failed(e));
        }
    };
    tracing::debug!("exchange: body stream opened");

    loop {
        let next = match read_timeout {
            Some(limit) => match tokio::time::timeout(limit, body.next()).await {
                Ok(next) => next,
                Err(_) => Some(Err(TransportError::Timeout(limit))),
            },
            None => body.next().await,
        };

        match next {
            Some(Ok(chunk)) => {
                let outcome = session.receive_bytes(&chunk)?;
                if let Some(message) = outcome.finished {
                    observer(&session.render_message(&message));
                    return Ok(ExchangeOutcome::Finished(message));
                }
                observer(&session.render());
            }
            Some(Err(e)) => {
                session.fail(&e.to_string());
                return Ok(ExchangeOutcome::Failed(e));
            }
            None => break,
        }
    }

    let outcome = session.end_of_stream()?;
    if let Some(message) = outcome.finished {
        observer(&session.render_message(&message));
        return Ok(ExchangeOutcome::Finished(message));
    }

    tracing::warn!("exchange: body ended without a finish frame");
    Ok(ExchangeOutcome::Incomplete)
}
