use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::client::ClientError;

/// A human-in-the-loop approval request, as delivered on the stream.
///
/// Approvals belong to the session, not to the tool call that triggered
/// them: the originating stream may be long gone by the time a human acts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApprovalRequest {
    pub approval_id: String,
    pub tool_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub tool_args: Map<String, Value>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub config: ApprovalConfig,
    #[serde(skip, default)]
    pub status: ApprovalStatus,
}

impl ApprovalRequest {
    /// Advisory countdown for display; `None` when the server set no expiry.
    pub fn countdown(&self, now: DateTime<Utc>) -> Option<String> {
        self.expires_at.map(|at| format_countdown(at, now))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApprovalConfig {
    #[serde(default = "default_show_args")]
    pub show_args: bool,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub require_reason_on_reject: bool,
}

fn default_show_args() -> bool {
    true
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            show_args: default_show_args(),
            timeout_seconds: None,
            require_reason_on_reject: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalAction {
    Approve,
    Reject,
    Cancel,
}

impl ApprovalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalAction::Approve => "approve",
            ApprovalAction::Reject => "reject",
            ApprovalAction::Cancel => "cancel",
        }
    }

    pub fn resolved_status(&self) -> ApprovalStatus {
        match self {
            ApprovalAction::Approve => ApprovalStatus::Approved,
            ApprovalAction::Reject => ApprovalStatus::Rejected,
            ApprovalAction::Cancel => ApprovalStatus::Cancelled,
        }
    }
}

#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("Please provide a reason for rejection")]
    ReasonRequired,

    #[error("No pending approval with id '{0}'")]
    UnknownApproval(String),

    #[error(transparent)]
    Transport(#[from] ClientError),
}

/// The approval-resolution endpoint, behind a trait so the lifecycle rules
/// are testable without a network.
#[async_trait]
pub trait ApprovalTransport: Send + Sync {
    async fn resolve_approval(
        &self,
        approval_id: &str,
        action: ApprovalAction,
        reason: Option<&str>,
    ) -> Result<(), ClientError>;
}

/// The session's pending approvals. Every mutation is keyed by
/// `approval_id`; there is no index-based access, so resolving one entry can
/// never disturb its neighbours.
#[derive(Debug, Default, Clone)]
pub struct ApprovalList {
    pending: Vec<ApprovalRequest>,
}

impl ApprovalList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a request, replacing any earlier entry with the same id.
    pub fn upsert(&mut self, request: ApprovalRequest) {
        self.pending
            .retain(|entry| entry.approval_id != request.approval_id);
        self.pending.push(request);
    }

    pub fn get(&self, approval_id: &str) -> Option<&ApprovalRequest> {
        self.pending
            .iter()
            .find(|entry| entry.approval_id == approval_id)
    }

    /// Remove by id via filter/replace, returning the removed entry.
    pub fn remove(&mut self, approval_id: &str) -> Option<ApprovalRequest> {
        let (removed, kept): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|entry| entry.approval_id == approval_id);
        self.pending = kept;
        removed.into_iter().next()
    }

    /// Local validation only; never touches the network.
    pub fn validate(
        &self,
        approval_id: &str,
        action: ApprovalAction,
        reason: Option<&str>,
    ) -> Result<(), ApprovalError> {
        let request = self
            .get(approval_id)
            .ok_or_else(|| ApprovalError::UnknownApproval(approval_id.to_string()))?;

        if action == ApprovalAction::Reject
            && request.config.require_reason_on_reject
            && reason.is_none_or(|text| text.trim().is_empty())
        {
            return Err(ApprovalError::ReasonRequired);
        }

        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ApprovalRequest> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// `minutes:seconds` remaining until `expires_at`, clamped to `"Expired"`.
pub fn format_countdown(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let remaining = expires_at.signed_duration_since(now);
    if remaining <= Duration::zero() {
        return "Expired".to_string();
    }
    let seconds = remaining.num_seconds();
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request(approval_id: &str) -> ApprovalRequest {
        ApprovalRequest {
            approval_id: approval_id.to_string(),
            tool_id: format!("tool-{}", approval_id),
            tool_name: "run_command".to_string(),
            message: "The agent wants to run a command".to_string(),
            tool_args: Map::new(),
            expires_at: None,
            config: ApprovalConfig::default(),
            status: ApprovalStatus::Pending,
        }
    }

    #[test]
    fn removing_one_approval_leaves_the_others_untouched() {
        let mut list = ApprovalList::new();
        list.upsert(request("a"));
        list.upsert(request("b"));
        list.upsert(request("c"));

        let b_before = list.get("b").cloned().unwrap();
        let c_before = list.get("c").cloned().unwrap();

        let removed = list.remove("a").unwrap();
        assert_eq!(removed.approval_id, "a");
        assert_eq!(list.len(), 2);
        assert_eq!(list.get("b"), Some(&b_before));
        assert_eq!(list.get("c"), Some(&c_before));
    }

    #[test]
    fn removing_an_unknown_id_changes_nothing() {
        let mut list = ApprovalList::new();
        list.upsert(request("a"));

        assert!(list.remove("missing").is_none());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn upsert_replaces_an_entry_with_the_same_id() {
        let mut list = ApprovalList::new();
        list.upsert(request("a"));

        let mut updated = request("a");
        updated.message = "updated".to_string();
        list.upsert(updated);

        assert_eq!(list.len(), 1);
        assert_eq!(list.get("a").unwrap().message, "updated");
    }

    #[test]
    fn reject_without_reason_fails_validation_when_required() {
        let mut list = ApprovalList::new();
        let mut entry = request("a");
        entry.config.require_reason_on_reject = true;
        list.upsert(entry);

        let result = list.validate("a", ApprovalAction::Reject, None);
        assert!(matches!(result, Err(ApprovalError::ReasonRequired)));

        let result = list.validate("a", ApprovalAction::Reject, Some("   "));
        assert!(matches!(result, Err(ApprovalError::ReasonRequired)));
    }

    #[test]
    fn reject_with_reason_passes_validation() {
        let mut list = ApprovalList::new();
        let mut entry = request("a");
        entry.config.require_reason_on_reject = true;
        list.upsert(entry);

        assert!(
            list.validate("a", ApprovalAction::Reject, Some("too risky"))
                .is_ok()
        );
    }

    #[test]
    fn approve_and_cancel_never_require_a_reason() {
        let mut list = ApprovalList::new();
        let mut entry = request("a");
        entry.config.require_reason_on_reject = true;
        list.upsert(entry);

        assert!(list.validate("a", ApprovalAction::Approve, None).is_ok());
        assert!(list.validate("a", ApprovalAction::Cancel, None).is_ok());
    }

    #[test]
    fn validating_an_unknown_id_fails() {
        let list = ApprovalList::new();
        let result = list.validate("ghost", ApprovalAction::Approve, None);
        assert!(matches!(result, Err(ApprovalError::UnknownApproval(_))));
    }

    #[test]
    fn actions_map_onto_resolved_statuses() {
        assert_eq!(
            ApprovalAction::Approve.resolved_status(),
            ApprovalStatus::Approved
        );
        assert_eq!(
            ApprovalAction::Reject.resolved_status(),
            ApprovalStatus::Rejected
        );
        assert_eq!(
            ApprovalAction::Cancel.resolved_status(),
            ApprovalStatus::Cancelled
        );
    }

    #[test]
    fn countdown_formats_minutes_and_seconds() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let expires = now + Duration::seconds(299);

        assert_eq!(format_countdown(expires, now), "4:59");
    }

    #[test]
    fn countdown_pads_single_digit_seconds() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let expires = now + Duration::seconds(65);

        assert_eq!(format_countdown(expires, now), "1:05");
    }

    #[test]
    fn countdown_clamps_past_expiry_to_expired() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let expires = now - Duration::seconds(10);

        assert_eq!(format_countdown(expires, now), "Expired");
        assert_eq!(format_countdown(now, now), "Expired");
    }

    #[test]
    fn approval_request_deserializes_with_defaults() {
        let request: ApprovalRequest = serde_json::from_value(serde_json::json!({
            "approval_id": "a1",
            "tool_id": "t1",
            "tool_name": "search_web"
        }))
        .unwrap();

        assert_eq!(request.status, ApprovalStatus::Pending);
        assert!(request.config.show_args);
        assert!(!request.config.require_reason_on_reject);
        assert!(request.expires_at.is_none());
    }
}
