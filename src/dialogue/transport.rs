use super::messages::{MessageRequest, MessageResponse, SessionResponse};
use crate::config::DialogueConfig;
use crate::error::{AgentError, AgentResult};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info};

/// Wire access to the dialogue backend
///
/// Stateless: the session token is owned by `DialogueClient`.
#[async_trait::async_trait]
pub trait DialogueTransport: Send + Sync {
    /// Create a dialogue session and return its token
    async fn create_session(&self) -> AgentResult<String>;

    /// Post one utterance within a session
    ///
    /// Fails with `SessionExpired` when the backend no longer knows the token.
    async fn post_message(&self, session_token: &str, text: &str) -> AgentResult<MessageResponse>;

    /// Get transport name for logging
    fn name(&self) -> &str;
}

/// Assistant v2 HTTP protocol over reqwest, authenticated with `apikey:<key>` Basic auth
#[derive(Debug, Clone)]
pub struct HttpDialogueTransport {
    config: DialogueConfig,
    client: reqwest::Client,
}

impl HttpDialogueTransport {
    pub fn new(config: DialogueConfig) -> AgentResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn base_url(&self) -> &str {
        self.config.instance_url.trim_end_matches('/')
    }

    pub fn sessions_url(&self) -> String {
        format!(
            "{}/v2/assistants/{}/sessions?version={}",
            self.base_url(),
            self.config.assistant_id,
            self.config.api_version
        )
    }

    pub fn message_url(&self, session_token: &str) -> String {
        format!(
            "{}/v2/assistants/{}/sessions/{}/message?version={}",
            self.base_url(),
            self.config.assistant_id,
            session_token,
            self.config.api_version
        )
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .basic_auth("apikey", Some(&self.config.api_key))
    }
}

#[async_trait::async_trait]
impl DialogueTransport for HttpDialogueTransport {
    async fn create_session(&self) -> AgentResult<String> {
        let response = self.post(&self.sessions_url()).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::BackendUnavailable(format!(
                "session creation returned {}: {}",
                status, body
            )));
        }

        let session: SessionResponse = response.json().await.map_err(|e| {
            AgentError::BackendUnavailable(format!("unreadable session response: {}", e))
        })?;

        match session.session_id {
            Some(id) if !id.trim().is_empty() => {
                info!("Dialogue session created: {}", id);
                Ok(id)
            }
            _ => Err(AgentError::BackendUnavailable(
                "session creation returned no session_id".to_string(),
            )),
        }
    }

    async fn post_message(&self, session_token: &str, text: &str) -> AgentResult<MessageResponse> {
        let response = self
            .post(&self.message_url(session_token))
            .json(&MessageRequest::text(text))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("Dialogue backend raw response ({}): {}", status, body);

        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(AgentError::SessionExpired(format!(
                "session {} returned {}",
                session_token, status
            )));
        }

        if !status.is_success() {
            return Err(AgentError::BackendUnavailable(format!(
                "message call returned {}: {}",
                status, body
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| AgentError::MalformedResponse(format!("invalid reply body: {}", e)))
    }

    fn name(&self) -> &str {
        "http"
    }
}
