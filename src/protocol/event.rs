use serde::Deserialize;
use serde_json::Value;

use crate::approvals::ApprovalRequest;

/// One application-level event decoded from the stream.
///
/// The wire discriminant is the SSE `event:` name; payload fields come from
/// the `data:` line's JSON object.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Start(StartPayload),
    Token(TokenPayload),
    ToolCall(ToolCallPayload),
    ToolResult(ToolResultPayload),
    ApprovalRequest(ApprovalRequest),
    AgentStart(AgentStartPayload),
    AgentEnd,
    Done(DonePayload),
    Error(ErrorPayload),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StartPayload {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenPayload {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolCallPayload {
    pub tool_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

impl ToolCallPayload {
    pub fn arguments_text(&self) -> Option<String> {
        self.arguments.as_ref().map(opaque_text)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolResultPayload {
    pub tool_id: String,
    #[serde(default)]
    pub result: Option<Value>,
}

impl ToolResultPayload {
    pub fn result_text(&self) -> Option<String> {
        self.result.as_ref().map(opaque_text)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentStartPayload {
    #[serde(alias = "name")]
    pub agent_name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DonePayload {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub message: Option<DoneMessage>,
}

/// Terminal payloads carry the full text either as a bare string or as a
/// message object, depending on the server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DoneMessage {
    Structured {
        #[serde(default)]
        role: Option<String>,
        content: String,
    },
    Text(String),
}

impl DonePayload {
    /// Full-text fallback used when no incremental tokens arrived.
    pub fn fallback_text(&self) -> Option<&str> {
        if let Some(response) = &self.response {
            return Some(response);
        }
        match &self.message {
            Some(DoneMessage::Structured { content, .. }) => Some(content),
            Some(DoneMessage::Text(text)) => Some(text),
            None => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub error: Option<String>,
}

/// Outcome of decoding one `data:` frame against a named event kind.
#[derive(Debug)]
pub(crate) enum DecodedFrame {
    Event(StreamEvent),
    UnknownKind,
    InvalidPayload,
}

impl StreamEvent {
    pub(crate) fn from_wire(kind: &str, data: Value) -> DecodedFrame {
        match kind {
            "start" => decode(data, StreamEvent::Start),
            "token" => decode(data, StreamEvent::Token),
            "tool_call" => decode(data, StreamEvent::ToolCall),
            "tool_result" => decode(data, StreamEvent::ToolResult),
            "approval_request" => decode(data, StreamEvent::ApprovalRequest),
            "agent_start" => decode(data, StreamEvent::AgentStart),
            "agent_end" => DecodedFrame::Event(StreamEvent::AgentEnd),
            "done" => decode(data, StreamEvent::Done),
            "error" => decode(data, StreamEvent::Error),
            _ => DecodedFrame::UnknownKind,
        }
    }
}

fn decode<T, F>(data: Value, wrap: F) -> DecodedFrame
where
    T: serde::de::DeserializeOwned,
    F: FnOnce(T) -> StreamEvent,
{
    match serde_json::from_value(data) {
        Ok(payload) => DecodedFrame::Event(wrap(payload)),
        Err(_) => DecodedFrame::InvalidPayload,
    }
}

/// Opaque text form of a wire value: strings pass through, anything else is
/// re-serialized as JSON.
pub fn opaque_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
