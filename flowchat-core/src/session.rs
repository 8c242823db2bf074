//! Chat session controller.
//!
//! A [`ChatSession`] owns the conversation id, the finalized history and at
//! most one in-flight exchange. Chunks received from the transport are
//! decoded, accumulated and, on a finish frame, folded into an immutable
//! [`Message`]. All of it runs synchronously per chunk.

use crate::buffer::{Applied, MessageBuffer};
use crate::frame::{FrameParser, StreamFrame};
use crate::message::{Message, Role};
use crate::segment::{ContentSegment, Segmenter};
use crate::transport::ChatRequest;

/// Assistant message shown when the transport fails.
pub const CONNECT_FAILURE_MESSAGE: &str = "Sorry, I failed to connect. Please try again.";

/// Errors from session state transitions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// `begin` was called while an exchange is still streaming.
    #[error("an exchange is already in flight")]
    ExchangeInFlight,

    /// A chunk arrived with no exchange in flight.
    #[error("no exchange is in flight")]
    NoExchange,
}

/// Result of feeding one chunk.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChunkOutcome {
    /// Number of frames decoded from the chunk.
    pub frames: usize,
    /// The finalized message, when the chunk carried the finish frame.
    pub finished: Option<Message>,
}

#[derive(Debug, Default)]
struct InFlight {
    parser: FrameParser,
    buffer: MessageBuffer,
}

/// Conversation state for one chat widget.
///
/// # Examples
///
/// ```
/// use flowchat_core::session::ChatSession;
///
/// let mut session = ChatSession::new();
/// session.begin("How many runs failed?").unwrap();
/// session
///     .receive_chunk("data: {\"type\":\"text-delta\",\"delta\":\"Two.\"}\n\n")
///     .unwrap();
/// let outcome = session
///     .receive_chunk("data: {\"type\":\"finish\",\"conversationId\":\"c-7\"}\n\n")
///     .unwrap();
///
/// assert_eq!(outcome.finished.unwrap().content, "Two.");
/// assert_eq!(session.conversation_id(), Some("c-7"));
/// assert_eq!(session.history().len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct ChatSession {
    conversation_id: Option<String>,
    history: Vec<Message>,
    in_flight: Option<InFlight>,
    segmenter: Segmenter,
}

impl ChatSession {
    /// Create an empty session without a conversation id.
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue an existing conversation.
    pub fn with_conversation_id(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }

    /// Seed the session with previously stored messages.
    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    /// Use a configured segmenter for rendering.
    pub fn with_segmenter(mut self, segmenter: Segmenter) -> Self {
        self.segmenter = segmenter;
        self
    }

    /// Conversation id assigned by the backend, if any.
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Finalized messages, oldest first.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Whether an exchange is streaming.
    pub fn is_streaming(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Buffer of the in-flight message.
    pub fn buffer(&self) -> Option<&MessageBuffer> {
        self.in_flight.as_ref().map(|f| &f.buffer)
    }

    /// Record the user's message and open a new exchange.
    ///
    /// Returns the request to send to the transport.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ExchangeInFlight`] if the previous exchange
    /// has not finished.
    pub fn begin(&mut self, text: impl Into<String>) -> Result<ChatRequest, SessionError> {
        if self.in_flight.is_some() {
            return Err(SessionError::ExchangeInFlight);
        }

        let text = text.into();
        self.history.push(Message::new(Role::User, text.clone()));
        self.in_flight = Some(InFlight::default());
        tracing::debug!(conversation = ?self.conversation_id, "session: exchange started");

        Ok(ChatRequest {
            message: text,
            conversation_id: self.conversation_id.clone(),
        })
    }

    /// Feed a text chunk of the response body.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoExchange`] if no exchange is in flight.
    pub fn receive_chunk(&mut self, chunk: &str) -> Result<ChunkOutcome, SessionError> {
        let in_flight = self.in_flight.as_mut().ok_or(SessionError::NoExchange)?;
        let frames = in_flight.parser.push(chunk);
        Ok(self.apply_frames(frames))
    }

    /// Feed a raw byte chunk of the response body.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoExchange`] if no exchange is in flight.
    pub fn receive_bytes(&mut self, bytes: &[u8]) -> Result<ChunkOutcome, SessionError> {
        let in_flight = self.in_flight.as_mut().ok_or(SessionError::NoExchange)?;
        let frames = in_flight.parser.push_bytes(bytes);
        Ok(self.apply_frames(frames))
    }

    /// Process the final unterminated line once the body has ended.
    ///
    /// The exchange stays in flight unless that line was the finish frame.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoExchange`] if no exchange is in flight.
    pub fn end_of_stream(&mut self) -> Result<ChunkOutcome, SessionError> {
        let in_flight = self.in_flight.as_mut().ok_or(SessionError::NoExchange)?;
        let frames = in_flight.parser.flush();
        Ok(self.apply_frames(frames))
    }

    fn apply_frames(&mut self, frames: Vec<StreamFrame>) -> ChunkOutcome {
        let mut outcome = ChunkOutcome {
            frames: frames.len(),
            finished: None,
        };

        for frame in frames {
            let Some(in_flight) = self.in_flight.as_mut() else {
                tracing::debug!(kind = ?frame.kind(), "session: frame after finish ignored");
                continue;
            };
            if let Applied::Finished(payload) = in_flight.buffer.apply(frame) {
                if let Some(id) = payload.conversation_id {
                    self.conversation_id = Some(id);
                }
                outcome.finished = Some(self.finalize());
            }
        }

        outcome
    }

    fn finalize(&mut self) -> Message {
        let in_flight = self.in_flight.take().unwrap_or_default();
        let message = in_flight.buffer.into_message();
        tracing::debug!(
            conversation = ?self.conversation_id,
            chars = message.content.len(),
            "session: exchange finished"
        );
        self.history.push(message.clone());
        message
    }

    /// Abort the in-flight exchange after a transport failure.
    ///
    /// Partial content is discarded and a single fallback assistant message
    /// is appended to history.
    pub fn fail(&mut self, reason: &str) -> Message {
        tracing::warn!(reason, "session: transport failed");
        self.in_flight = None;
        let message = Message::new(Role::Assistant, CONNECT_FAILURE_MESSAGE);
        self.history.push(message.clone());
        message
    }

    /// Drop the in-flight exchange without recording anything.
    pub fn abandon(&mut self) -> Option<MessageBuffer> {
        self.in_flight.take().map(|f| f.buffer)
    }

    /// Segments of the in-flight message's output so far.
    pub fn render(&self) -> Vec<ContentSegment> {
        self.buffer()
            .map(|b| self.segmenter.segment(b.output_text()))
            .unwrap_or_default()
    }

    /// Segments of a finalized message.
    pub fn render_message(&self, message: &Message) -> Vec<ContentSegment> {
        self.segmenter.segment(&message.content)
    }
}
