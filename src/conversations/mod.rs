mod agent_tracker;
mod conversation;
mod tool_calls;

pub use agent_tracker::AgentTracker;
pub use conversation::{Conversation, Message, Role, StreamProfile};
pub use tool_calls::{PendingToolCall, ToolCallRegistry, ToolCallStatus};
