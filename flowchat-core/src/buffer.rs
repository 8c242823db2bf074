//! Per-message delta accumulation.
//!
//! A [`MessageBuffer`] collects the frames of one in-flight assistant message
//! and tracks its lifecycle: `Streaming` until a finish frame, then
//! `Finished`. There is no other transition.

use serde_json::Value;

use crate::frame::{FinishPayload, StreamFrame, TOOL_NAME_KEYS, string_field};
use crate::message::{Message, Role};

/// What the buffer is currently accumulating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// The most recent delta was reasoning.
    ReasoningAccumulating,
    /// The most recent delta was answer text, or nothing arrived yet.
    OutputAccumulating,
}

/// Lifecycle state of one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// Deltas are still arriving.
    Streaming(StreamPhase),
    /// A finish frame was observed.
    Finished,
}

/// Result of applying one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// The frame was accumulated.
    Updated,
    /// The frame was a finish frame; the buffer is now finished.
    Finished(FinishPayload),
    /// The frame carried nothing to accumulate.
    Ignored,
}

/// Mutable accumulation state for one in-flight message.
///
/// # Examples
///
/// ```
/// use flowchat_core::buffer::{Applied, MessageBuffer};
/// use flowchat_core::frame::StreamFrame;
///
/// let mut buffer = MessageBuffer::new();
/// buffer.apply(StreamFrame::ReasoningDelta("Checking flows.".into()));
/// buffer.apply(StreamFrame::TextDelta("You have 3 flows.".into()));
///
/// assert_eq!(buffer.output_text(), "You have 3 flows.");
/// assert_eq!(buffer.reasoning_text(), "Checking flows.");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MessageBuffer {
    output_text: String,
    reasoning_text: String,
    current_tool: Option<String>,
    tool_calls: Vec<Value>,
    tool_results: Vec<Value>,
    state: BufferState,
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self {
            output_text: String::new(),
            reasoning_text: String::new(),
            current_tool: None,
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            state: BufferState::Streaming(StreamPhase::OutputAccumulating),
        }
    }
}

impl MessageBuffer {
    /// Create an empty buffer in the streaming state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one frame.
    ///
    /// Deltas are appended, never reordered. Frames after the finish frame
    /// are ignored.
    pub fn apply(&mut self, frame: StreamFrame) -> Applied {
        if self.is_finished() {
            tracing::debug!(kind = ?frame.kind(), "buffer: frame after finish ignored");
            return Applied::Ignored;
        }

        match frame {
            StreamFrame::TextDelta(delta) => {
                self.output_text.push_str(&delta);
                self.state = BufferState::Streaming(StreamPhase::OutputAccumulating);
                Applied::Updated
            }
            StreamFrame::ReasoningDelta(delta) => {
                self.reasoning_text.push_str(&delta);
                self.state = BufferState::Streaming(StreamPhase::ReasoningAccumulating);
                Applied::Updated
            }
            StreamFrame::ToolCall(record) => {
                self.current_tool = string_field(&record, TOOL_NAME_KEYS);
                tracing::debug!(tool = ?self.current_tool, "buffer: tool call started");
                self.tool_calls.push(record);
                Applied::Updated
            }
            StreamFrame::ToolResult(record) => {
                self.current_tool = None;
                self.tool_results.push(record);
                Applied::Updated
            }
            StreamFrame::Finish(payload) => {
                self.state = BufferState::Finished;
                Applied::Finished(payload)
            }
            StreamFrame::Unknown(_) => Applied::Ignored,
        }
    }

    /// Accumulated answer text.
    pub fn output_text(&self) -> &str {
        &self.output_text
    }

    /// Accumulated reasoning text.
    pub fn reasoning_text(&self) -> &str {
        &self.reasoning_text
    }

    /// Name of the tool currently being invoked.
    pub fn current_tool(&self) -> Option<&str> {
        self.current_tool.as_deref()
    }

    /// Tool call records in arrival order.
    pub fn tool_calls(&self) -> &[Value] {
        &self.tool_calls
    }

    /// Tool result records in arrival order.
    pub fn tool_results(&self) -> &[Value] {
        &self.tool_results
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BufferState {
        self.state
    }

    /// Whether a finish frame has been applied.
    pub fn is_finished(&self) -> bool {
        self.state == BufferState::Finished
    }

    /// Fold the buffer into an immutable assistant message.
    pub fn into_message(self) -> Message {
        Message::new(Role::Assistant, self.output_text).with_thinking(self.reasoning_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(s: &str) -> StreamFrame {
        StreamFrame::TextDelta(s.to_string())
    }

    fn reasoning(s: &str) -> StreamFrame {
        StreamFrame::ReasoningDelta(s.to_string())
    }

    #[test]
    fn test_new_buffer_is_streaming_output() {
        let buffer = MessageBuffer::new();
        assert_eq!(
            buffer.state(),
            BufferState::Streaming(StreamPhase::OutputAccumulating)
        );
        assert!(buffer.output_text().is_empty());
        assert!(buffer.reasoning_text().is_empty());
    }

    #[test]
    fn test_deltas_are_routed_by_kind() {
        let mut buffer = MessageBuffer::new();
        buffer.apply(reasoning("Look up "));
        assert_eq!(
            buffer.state(),
            BufferState::Streaming(StreamPhase::ReasoningAccumulating)
        );
        buffer.apply(text("Here "));
        buffer.apply(reasoning("the runs."));
        buffer.apply(text("they are."));

        assert_eq!(buffer.output_text(), "Here they are.");
        assert_eq!(buffer.reasoning_text(), "Look up the runs.");
        assert_eq!(
            buffer.state(),
            BufferState::Streaming(StreamPhase::OutputAccumulating)
        );
    }

    #[test]
    fn test_output_is_append_only() {
        let deltas = ["Hel", "lo", "", " wor", "ld", "```json\n{", "}\n```"];
        let mut buffer = MessageBuffer::new();
        let mut previous = String::new();

        for delta in deltas {
            buffer.apply(text(delta));
            assert!(buffer.output_text().starts_with(&previous));
            previous = buffer.output_text().to_string();
        }
        assert_eq!(previous, deltas.concat());
    }

    #[test]
    fn test_tool_call_and_result() {
        let mut buffer = MessageBuffer::new();
        buffer.apply(StreamFrame::ToolCall(json!({"toolName": "list_agents"})));
        assert_eq!(buffer.current_tool(), Some("list_agents"));
        assert_eq!(buffer.tool_calls().len(), 1);

        buffer.apply(StreamFrame::ToolResult(json!({"toolName": "list_agents", "result": []})));
        assert_eq!(buffer.current_tool(), None);
        assert_eq!(buffer.tool_results().len(), 1);
    }

    #[test]
    fn test_finish_transitions_and_returns_payload() {
        let mut buffer = MessageBuffer::new();
        buffer.apply(text("done"));
        let applied = buffer.apply(StreamFrame::Finish(FinishPayload::from_record(
            json!({"type": "finish", "conversationId": "abc"}),
        )));

        let Applied::Finished(payload) = applied else {
            panic!("expected finished");
        };
        assert_eq!(payload.conversation_id.as_deref(), Some("abc"));
        assert!(buffer.is_finished());
        assert_eq!(buffer.output_text(), "done");
    }

    #[test]
    fn test_frames_after_finish_are_ignored() {
        let mut buffer = MessageBuffer::new();
        buffer.apply(StreamFrame::Finish(FinishPayload::from_record(json!({}))));
        assert_eq!(buffer.apply(text("late")), Applied::Ignored);
        assert!(buffer.output_text().is_empty());
    }

    #[test]
    fn test_unknown_frame_is_ignored() {
        let mut buffer = MessageBuffer::new();
        assert_eq!(
            buffer.apply(StreamFrame::Unknown(json!({"type": "start"}))),
            Applied::Ignored
        );
    }

    #[test]
    fn test_into_message() {
        let mut buffer = MessageBuffer::new();
        buffer.apply(reasoning("plan"));
        buffer.apply(text("answer"));

        let msg = buffer.into_message();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content, "answer");
        assert_eq!(msg.thinking.as_deref(), Some("plan"));
    }

    #[test]
    fn test_into_message_without_reasoning() {
        let mut buffer = MessageBuffer::new();
        buffer.apply(text("answer"));
        assert!(buffer.into_message().thinking.is_none());
    }
}
