mod decoder;
mod event;

pub(crate) use event::DecodedFrame;

pub use decoder::{FrameDecoder, StreamDiagnostics};
pub use event::{
    AgentStartPayload, DoneMessage, DonePayload, ErrorPayload, StartPayload, StreamEvent,
    TokenPayload, ToolCallPayload, ToolResultPayload, opaque_text,
};
