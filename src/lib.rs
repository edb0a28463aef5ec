pub mod approvals;
pub mod cli;
pub mod client;
pub mod config;
pub mod console;
pub mod conversations;
pub mod protocol;

pub use approvals::{
    ApprovalAction, ApprovalConfig, ApprovalError, ApprovalList, ApprovalRequest, ApprovalStatus,
    ApprovalTransport, format_countdown,
};
pub use client::{
    ApiClient, ClientConfig, ClientError, ClientResult, SendMessageResponse, SessionInfo,
    StreamHandle, StreamTarget, TurnRequest, drive_turn,
};
pub use config::AppConfig;
pub use console::{Console, VerbosityLevel, console, init_console};
pub use conversations::{
    AgentTracker, Conversation, Message, PendingToolCall, Role, StreamProfile, ToolCallRegistry,
    ToolCallStatus,
};
pub use protocol::{FrameDecoder, StreamDiagnostics, StreamEvent};
