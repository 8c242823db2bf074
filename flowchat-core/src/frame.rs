//! Server-sent-event frame parsing.
//!
//! Splits raw response chunks into `data:` lines and decodes each line into a
//! typed [`StreamFrame`]. A malformed line is logged and skipped; it never
//! stops the remaining lines of the chunk from being decoded.

use serde_json::{Map, Value};

/// Marker some backends send instead of a JSON finish payload.
const SSE_DONE_MARKER: &str = "[DONE]";

/// Keys that may carry the conversation identifier on a finish payload.
const CONVERSATION_ID_KEYS: &[&str] = &[
    "conversationId",
    "conversation_id",
    "sessionId",
    "session_id",
];

/// Longest unterminated line [`FrameParser`] buffers before dropping it.
pub const MAX_LINE_BYTES: usize = 1 << 20;

/// Keys that may carry a tool name on tool-call/tool-result payloads.
pub(crate) const TOOL_NAME_KEYS: &[&str] = &["toolName", "tool_name", "name"];

/// Discriminant of a [`StreamFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// A fragment of the answer text.
    TextDelta,
    /// A fragment of the reasoning text.
    ReasoningDelta,
    /// A tool invocation started.
    ToolCall,
    /// A tool invocation produced a result.
    ToolResult,
    /// The stream is complete.
    Finish,
    /// Valid JSON with no recognized shape.
    Unknown,
}

/// Payload of a finish frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishPayload {
    /// Conversation or session identifier assigned by the backend.
    pub conversation_id: Option<String>,
    /// The complete finish record as received.
    pub record: Value,
}

impl FinishPayload {
    /// Build a finish payload from a decoded record, surfacing its identifier.
    pub fn from_record(record: Value) -> Self {
        let conversation_id = CONVERSATION_ID_KEYS
            .iter()
            .find_map(|key| match record.get(*key) {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            });
        Self {
            conversation_id,
            record,
        }
    }

    fn empty() -> Self {
        Self::from_record(Value::Object(Map::new()))
    }
}

/// One decoded server-sent event.
///
/// # Examples
///
/// ```
/// use flowchat_core::frame::{FrameKind, StreamFrame, parse_chunk};
///
/// let frames = parse_chunk("data: {\"type\":\"text-delta\",\"delta\":\"Hi\"}\n\n");
/// assert_eq!(frames, vec![StreamFrame::TextDelta("Hi".to_string())]);
/// assert_eq!(frames[0].kind(), FrameKind::TextDelta);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    /// Answer text fragment (empty when the payload carried none).
    TextDelta(String),
    /// Reasoning fragment: the concatenated reasoning details.
    ReasoningDelta(String),
    /// Tool invocation record.
    ToolCall(Value),
    /// Tool result record.
    ToolResult(Value),
    /// Stream completion.
    Finish(FinishPayload),
    /// Unrecognized record.
    Unknown(Value),
}

impl StreamFrame {
    /// The discriminant of this frame.
    pub fn kind(&self) -> FrameKind {
        match self {
            Self::TextDelta(_) => FrameKind::TextDelta,
            Self::ReasoningDelta(_) => FrameKind::ReasoningDelta,
            Self::ToolCall(_) => FrameKind::ToolCall,
            Self::ToolResult(_) => FrameKind::ToolResult,
            Self::Finish(_) => FrameKind::Finish,
            Self::Unknown(_) => FrameKind::Unknown,
        }
    }
}

/// Parse a self-contained chunk into frames.
///
/// Every line of the chunk is processed, including a final line without a
/// terminating newline. Use [`FrameParser`] when payloads may be split across
/// chunk boundaries.
pub fn parse_chunk(chunk: &str) -> Vec<StreamFrame> {
    chunk.lines().filter_map(decode_line).collect()
}

/// Decode a single SSE line. Returns `None` for non-`data:` lines and for
/// payloads that are not valid JSON.
pub fn decode_line(line: &str) -> Option<StreamFrame> {
    let line = line.trim_end_matches(['\n', '\r']);
    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data);
    decode_data(data)
}

/// Decode the value of a `data:` field.
pub fn decode_data(data: &str) -> Option<StreamFrame> {
    let data = data.trim();
    if data.is_empty() {
        return None;
    }
    if data == SSE_DONE_MARKER {
        return Some(StreamFrame::Finish(FinishPayload::empty()));
    }

    match serde_json::from_str::<Value>(data) {
        Ok(value) => Some(classify(value)),
        Err(e) => {
            tracing::warn!(error = %e, "frame: skipping malformed data line");
            None
        }
    }
}

fn classify(value: Value) -> StreamFrame {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_ascii_lowercase);

    match kind.as_deref() {
        Some("finish" | "done" | "end" | "complete") => {
            StreamFrame::Finish(FinishPayload::from_record(value))
        }
        Some("reasoning" | "reasoning-delta" | "reasoning_delta" | "thinking") => {
            StreamFrame::ReasoningDelta(reasoning_text(&value))
        }
        Some("text-delta" | "text_delta" | "text" | "content" | "delta") => StreamFrame::TextDelta(
            string_field(&value, &["delta", "content", "text"]).unwrap_or_default(),
        ),
        Some("tool-call" | "tool_call" | "tool-input-available") => StreamFrame::ToolCall(value),
        Some("tool-result" | "tool_result" | "tool-output-available") => {
            StreamFrame::ToolResult(value)
        }
        _ => classify_untyped(value),
    }
}

fn classify_untyped(value: Value) -> StreamFrame {
    if let Some(delta) = value.get("delta").and_then(Value::as_str) {
        return StreamFrame::TextDelta(delta.to_string());
    }

    if string_field(&value, &TOOL_NAME_KEYS[..2]).is_some() {
        return if value.get("result").is_some() || value.get("output").is_some() {
            StreamFrame::ToolResult(value)
        } else {
            StreamFrame::ToolCall(value)
        };
    }

    tracing::debug!(payload = %value, "frame: unrecognized payload");
    StreamFrame::Unknown(value)
}

fn reasoning_text(value: &Value) -> String {
    let details = value
        .get("reasoning_details")
        .or_else(|| value.get("reasoningDetails"))
        .and_then(Value::as_array);

    match details {
        Some(details) => details
            .iter()
            .filter_map(|d| d.get("text").and_then(Value::as_str).or(d.as_str()))
            .collect(),
        None => string_field(value, &["delta", "reasoning", "text"]).unwrap_or_default(),
    }
}

pub(crate) fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Incremental SSE parser that tolerates transport fragmentation.
///
/// Incomplete trailing lines are buffered until their newline arrives, and
/// byte input holds back an incomplete trailing UTF-8 sequence.
#[derive(Debug, Default)]
pub struct FrameParser {
    /// Text of the current, not yet terminated line.
    line_buf: String,
    /// Bytes of a UTF-8 sequence split across chunks.
    utf8_tail: Vec<u8>,
}

impl FrameParser {
    /// Create an empty parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a text chunk; returns the frames of every line it completed.
    pub fn push(&mut self, chunk: &str) -> Vec<StreamFrame> {
        self.line_buf.push_str(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.line_buf.find('\n') {
            let line: String = self.line_buf.drain(..=pos).collect();
            frames.extend(decode_line(&line));
        }

        if self.line_buf.len() > MAX_LINE_BYTES {
            tracing::warn!(
                bytes = self.line_buf.len(),
                "frame: dropping unterminated line over size limit"
            );
            self.line_buf.clear();
        }
        frames
    }

    /// Feed a raw byte chunk from the transport.
    ///
    /// Invalid bytes become U+FFFD; an incomplete sequence at the end of the
    /// buffered bytes is held back for the next chunk.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<StreamFrame> {
        self.utf8_tail.extend_from_slice(bytes);

        let mut text = String::with_capacity(self.utf8_tail.len());
        let mut rest: &[u8] = &self.utf8_tail;
        while !rest.is_empty() {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    rest = &[];
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        let held = rest.len();
        let consumed = self.utf8_tail.len() - held;
        self.utf8_tail.drain(..consumed);
        self.push(&text)
    }

    /// Process whatever is still buffered as a final, unterminated line.
    pub fn flush(&mut self) -> Vec<StreamFrame> {
        if !self.utf8_tail.is_empty() {
            let tail = std::mem::take(&mut self.utf8_tail);
            self.line_buf.push_str(&String::from_utf8_lossy(&tail));
        }
        let line = std::mem::take(&mut self.line_buf);
        decode_line(&line).into_iter().collect()
    }

    /// Whether a partial line or byte sequence is buffered.
    pub fn has_pending(&self) -> bool {
        !self.line_buf.is_empty() || !self.utf8_tail.is_empty()
    }
}
