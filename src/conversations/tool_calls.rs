use indexmap::IndexMap;
use serde::Serialize;

use crate::protocol::{ToolCallPayload, ToolResultPayload};

/// Hand-off plumbing between agents; filtered from user-facing snapshots.
const TRANSFER_TOOL_PREFIX: &str = "transfer_to_";

const PENDING_APPROVAL_PLACEHOLDER: &str = "pending approval";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Calling,
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingToolCall {
    pub tool_id: String,
    pub tool_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
    pub status: ToolCallStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
}

impl PendingToolCall {
    pub fn is_done(&self) -> bool {
        self.status == ToolCallStatus::Done
    }

    pub fn is_transfer(&self) -> bool {
        self.tool_name.starts_with(TRANSFER_TOOL_PREFIX)
    }
}

/// In-flight tool invocations for the active turn, keyed by `tool_id` and
/// ordered by first insertion.
#[derive(Debug, Default, Clone)]
pub struct ToolCallRegistry {
    calls: IndexMap<String, PendingToolCall>,
}

impl ToolCallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh `calling` entry. A colliding id is overwritten (last
    /// write wins) but keeps its original position.
    pub fn record_call(&mut self, payload: &ToolCallPayload, agent_name: Option<&str>) {
        let entry = PendingToolCall {
            tool_id: payload.tool_id.clone(),
            tool_name: payload.tool_name.clone(),
            arguments: payload.arguments_text(),
            status: ToolCallStatus::Calling,
            result: None,
            agent_name: agent_name.map(str::to_string),
        };
        self.calls.insert(payload.tool_id.clone(), entry);
    }

    /// Correlate a result. An unknown id is a no-op: results may outlive the
    /// visibility of the call that produced them.
    pub fn record_result(&mut self, payload: &ToolResultPayload) {
        if let Some(call) = self.calls.get_mut(&payload.tool_id) {
            call.status = ToolCallStatus::Done;
            call.result = payload.result_text();
        }
    }

    /// A tool now gated on a human is no longer executing; stop rendering it
    /// as in-flight.
    pub fn mark_awaiting_approval(&mut self, tool_id: &str) {
        if let Some(call) = self.calls.get_mut(tool_id) {
            call.status = ToolCallStatus::Done;
            call.result = Some(PENDING_APPROVAL_PLACEHOLDER.to_string());
        }
    }

    pub fn get(&self, tool_id: &str) -> Option<&PendingToolCall> {
        self.calls.get(tool_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingToolCall> {
        self.calls.values()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Snapshot for a finalized message, in first-insertion order.
    pub fn snapshot(&self, filter_transfer_tools: bool) -> Vec<PendingToolCall> {
        self.calls
            .values()
            .filter(|call| !(filter_transfer_tools && call.is_transfer()))
            .cloned()
            .collect()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}
