use serde::Serialize;

use crate::approvals::{ApprovalAction, ApprovalError, ApprovalList, ApprovalTransport};
use crate::conversations::agent_tracker::AgentTracker;
use crate::conversations::tool_calls::{PendingToolCall, ToolCallRegistry};
use crate::protocol::{DonePayload, ErrorPayload, StreamEvent};

const GENERIC_ERROR: &str = "An unexpected error occurred";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A finalized conversation entry. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<PendingToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agents_used: Option<Vec<String>>,
}

impl Message {
    pub fn user(content: String) -> Self {
        Self {
            role: Role::User,
            content,
            images: None,
            tool_calls: None,
            agents_used: None,
        }
    }

    pub fn assistant(content: String) -> Self {
        Self {
            role: Role::Assistant,
            content,
            images: None,
            tool_calls: None,
            agents_used: None,
        }
    }

    pub fn system(content: String) -> Self {
        Self {
            role: Role::System,
            content,
            images: None,
            tool_calls: None,
            agents_used: None,
        }
    }
}

/// Per-call-site capabilities. The three streaming entry points share one
/// transport and one state machine; only these switches differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamProfile {
    /// Drop `transfer_to_*` entries from finalize snapshots.
    pub filter_transfer_tools: bool,
    /// Append stream errors to history as an `"Error: ..."` assistant
    /// message, on top of the session-level error field.
    pub error_as_message: bool,
}

impl StreamProfile {
    /// Plain chat: errors stay session-level, nothing filtered.
    pub fn chat() -> Self {
        Self {
            filter_transfer_tools: false,
            error_as_message: false,
        }
    }

    /// Direct agent invocation (builder test chat): errors land in the
    /// transcript so a test run reads as a dialogue.
    pub fn agent_test() -> Self {
        Self {
            filter_transfer_tools: false,
            error_as_message: true,
        }
    }

    /// Multi-agent workflow: hand-off tools are plumbing, not tool use.
    pub fn workflow() -> Self {
        Self {
            filter_transfer_tools: true,
            error_as_message: false,
        }
    }
}

impl Default for StreamProfile {
    fn default() -> Self {
        Self::chat()
    }
}

/// Per-session view model: finalized messages plus the transient state of
/// the active turn. `apply` is the single reducer every stream event goes
/// through; the network side only produces events.
#[derive(Debug, Clone)]
pub struct Conversation {
    session_id: Option<String>,
    profile: StreamProfile,
    messages: Vec<Message>,
    streaming_buffer: String,
    is_streaming: bool,
    tool_calls: ToolCallRegistry,
    approvals: ApprovalList,
    agents: AgentTracker,
    last_error: Option<String>,
}

impl Conversation {
    pub fn new(profile: StreamProfile) -> Self {
        Self {
            session_id: None,
            profile,
            messages: Vec::new(),
            streaming_buffer: String::new(),
            is_streaming: false,
            tool_calls: ToolCallRegistry::new(),
            approvals: ApprovalList::new(),
            agents: AgentTracker::new(),
            last_error: None,
        }
    }

    pub fn with_session_id(mut self, session_id: String) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_streaming(&self) -> bool {
        self.is_streaming
    }

    pub fn streaming_buffer(&self) -> &str {
        &self.streaming_buffer
    }

    pub fn tool_calls(&self) -> &ToolCallRegistry {
        &self.tool_calls
    }

    pub fn approvals(&self) -> &ApprovalList {
        &self.approvals
    }

    pub fn active_agent(&self) -> Option<&str> {
        self.agents.active()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Append the user's message and open the turn. Callers gate submission
    /// on `is_streaming`; the machine itself does not reject re-entry.
    pub fn begin_turn(&mut self, content: String, images: Option<Vec<String>>) {
        self.last_error = None;
        self.messages.push(Message {
            role: Role::User,
            content,
            images,
            tool_calls: None,
            agents_used: None,
        });
        self.is_streaming = true;
    }

    /// Fold one stream event into the session state.
    pub fn apply(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Start(payload) => {
                if self.session_id.is_none() {
                    self.session_id = payload.session_id;
                }
            }
            StreamEvent::Token(payload) => {
                self.streaming_buffer.push_str(&payload.content);
            }
            StreamEvent::ToolCall(payload) => {
                self.tool_calls.record_call(&payload, self.agents.active());
            }
            StreamEvent::ToolResult(payload) => {
                self.tool_calls.record_result(&payload);
            }
            StreamEvent::ApprovalRequest(request) => {
                self.tool_calls.mark_awaiting_approval(&request.tool_id);
                self.approvals.upsert(request);
            }
            StreamEvent::AgentStart(payload) => {
                self.agents.start(&payload.agent_name);
            }
            StreamEvent::AgentEnd => {
                self.agents.end();
            }
            StreamEvent::Done(payload) => {
                self.finalize(payload);
            }
            StreamEvent::Error(payload) => {
                self.fail(payload);
            }
        }
    }

    /// Discard the active turn without finalizing a message. Used when the
    /// stream closes with no terminal event: cancellation or server hangup.
    pub fn reset_turn(&mut self) {
        self.clear_turn_state();
    }

    /// Resolve a pending approval: local validation, then the network call,
    /// then keyed removal. A validation failure never reaches the wire.
    pub async fn resolve_approval(
        &mut self,
        transport: &dyn ApprovalTransport,
        approval_id: &str,
        action: ApprovalAction,
        reason: Option<&str>,
    ) -> Result<(), ApprovalError> {
        self.approvals.validate(approval_id, action, reason)?;
        transport
            .resolve_approval(approval_id, action, reason)
            .await?;
        self.approvals.remove(approval_id);
        Ok(())
    }

    fn finalize(&mut self, payload: DonePayload) {
        let mut content = std::mem::take(&mut self.streaming_buffer);
        if content.is_empty() {
            if let Some(fallback) = payload.fallback_text() {
                content = fallback.to_string();
            }
        }

        let snapshot = self.tool_calls.snapshot(self.profile.filter_transfer_tools);
        let tool_calls = if snapshot.is_empty() {
            None
        } else {
            Some(snapshot)
        };

        let agents_used = self.agents.finish_turn();
        let agents_used = if agents_used.is_empty() {
            None
        } else {
            Some(agents_used)
        };

        self.messages.push(Message {
            role: Role::Assistant,
            content,
            images: None,
            tool_calls,
            agents_used,
        });
        self.clear_turn_state();
    }

    fn fail(&mut self, payload: ErrorPayload) {
        let text = payload.error.unwrap_or_else(|| GENERIC_ERROR.to_string());
        if self.profile.error_as_message {
            self.messages
                .push(Message::assistant(format!("Error: {}", text)));
        }
        self.last_error = Some(text);
        self.clear_turn_state();
    }

    // Approvals deliberately survive this: they are session-scoped and a
    // human may resolve one long after the triggering stream has ended.
    fn clear_turn_state(&mut self) {
        self.streaming_buffer.clear();
        self.tool_calls.clear();
        self.agents.finish_turn();
        self.is_streaming = false;
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(StreamProfile::default())
    }
}
