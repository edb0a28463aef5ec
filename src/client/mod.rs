mod error;
mod stream;

pub use error::{ClientError, ClientResult};
pub use stream::{StreamHandle, drive_turn};

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::approvals::{ApprovalAction, ApprovalTransport};
use crate::conversations::StreamProfile;

pub(crate) const REQUEST_TIMEOUT_SECS: u64 = 120;
const CONNECT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageResponse {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
}

/// Request body shared by the non-streaming send and all three streaming
/// entry points.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TurnRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp_servers: Option<Vec<String>>,
}

impl TurnRequest {
    pub fn new(message: String) -> Self {
        Self {
            message,
            ..Self::default()
        }
    }

    pub fn with_session_id(mut self, session_id: String) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_provider(mut self, provider: String) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn with_mcp_servers(mut self, mcp_servers: Vec<String>) -> Self {
        self.mcp_servers = Some(mcp_servers);
        self
    }
}

/// Which streaming endpoint a turn goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamTarget {
    Chat,
    Agent(String),
    Workflow(String),
}

impl StreamTarget {
    fn path(&self) -> String {
        match self {
            StreamTarget::Chat => "/api/chat/stream".to_string(),
            StreamTarget::Agent(name) => format!("/api/agents/{}/invoke/stream", name),
            StreamTarget::Workflow(name) => format!("/api/workflows/{}/invoke/stream", name),
        }
    }

    /// The state-machine capabilities this call site uses.
    pub fn default_profile(&self) -> StreamProfile {
        match self {
            StreamTarget::Chat => StreamProfile::chat(),
            StreamTarget::Agent(_) => StreamProfile::agent_test(),
            StreamTarget::Workflow(_) => StreamProfile::workflow(),
        }
    }
}

/// HTTP client for the agent backend: session CRUD, non-streaming send,
/// approval resolution, and the one parameterized streaming entry point.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ClientError::ConfigurationError(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn check(response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::from_status(status.as_u16(), body))
    }

    pub async fn create_session(&self) -> ClientResult<SessionInfo> {
        let response = self
            .request(Method::POST, "/api/sessions")
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn get_session(&self, session_id: &str) -> ClientResult<SessionInfo> {
        let response = self
            .request(Method::GET, &format!("/api/sessions/{}", session_id))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn list_sessions(&self) -> ClientResult<Vec<SessionInfo>> {
        let response = self
            .request(Method::GET, "/api/sessions")
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn delete_session(&self, session_id: &str) -> ClientResult<()> {
        let response = self
            .request(Method::DELETE, &format!("/api/sessions/{}", session_id))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Non-streaming send, bounded by the fixed request timeout.
    pub async fn send_message(
        &self,
        session_id: &str,
        request: &TurnRequest,
    ) -> ClientResult<SendMessageResponse> {
        let response = self
            .request(
                Method::POST,
                &format!("/api/sessions/{}/messages", session_id),
            )
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .json(request)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Open one streaming turn. Chat, direct agent invocation and workflows
    /// all go through here; no client-side timeout applies to a stream.
    pub fn stream_turn(
        &self,
        target: &StreamTarget,
        request: &TurnRequest,
        cancel: CancellationToken,
    ) -> StreamHandle {
        let builder = self.request(Method::POST, &target.path()).json(request);
        stream::spawn_stream(builder, cancel)
    }

    pub async fn resolve_approval(
        &self,
        approval_id: &str,
        action: ApprovalAction,
        reason: Option<&str>,
    ) -> ClientResult<()> {
        let body = json!({
            "action": action.as_str(),
            "reason": reason,
        });
        let response = self
            .request(
                Method::POST,
                &format!("/api/approvals/{}/resolve", approval_id),
            )
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl ApprovalTransport for ApiClient {
    async fn resolve_approval(
        &self,
        approval_id: &str,
        action: ApprovalAction,
        reason: Option<&str>,
    ) -> Result<(), ClientError> {
        ApiClient::resolve_approval(self, approval_id, action, reason).await
    }
}
