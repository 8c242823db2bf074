//! Flowchat core library.
//!
//! Turns a streamed support-chat response into render-ready content blocks:
//! SSE frame decoding, per-message delta accumulation, segmentation of the
//! answer text, and classification of embedded structured payloads.

pub mod buffer;
pub mod config;
pub mod exchange;
pub mod frame;
pub mod history;
pub mod message;
pub mod payload;
pub mod segment;
pub mod session;
pub mod text;
pub mod transport;

pub use buffer::{Applied, BufferState, MessageBuffer, StreamPhase};
pub use config::{Config, ConfigError, RenderConfig};
pub use exchange::{ExchangeOutcome, run_exchange};
pub use frame::{FinishPayload, FrameKind, FrameParser, StreamFrame, parse_chunk};
pub use history::{ConversationSummary, HistoryError, HistoryStore, MemoryHistory};
pub use message::{Message, Role};
pub use payload::{PayloadShape, StructuredPayload, resolve};
pub use segment::{ContentSegment, SegmentKind, Segmenter, segment};
pub use session::{CONNECT_FAILURE_MESSAGE, ChatSession, ChunkOutcome, SessionError};
pub use transport::{
    ChatRequest, ChatTransport, ChunkStream, HttpTransport, MockTransport, TransportError,
};
