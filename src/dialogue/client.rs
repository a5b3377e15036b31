use super::transport::DialogueTransport;
use crate::error::{AgentError, AgentResult};
use std::sync::Arc;
use tracing::{info, warn};

/// Stateful adapter to the dialogue backend for one call
///
/// Owns the dialogue session token: created lazily on first use and reused
/// for every later utterance. The token can only change through
/// [`get_or_create_session`](Self::get_or_create_session) or by being dropped
/// when the backend reports it expired.
pub struct DialogueClient {
    transport: Arc<dyn DialogueTransport>,
    session_token: Option<String>,
}

impl DialogueClient {
    pub fn new(transport: Arc<dyn DialogueTransport>) -> Self {
        Self {
            transport,
            session_token: None,
        }
    }

    /// Cached session token, if one has been created
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    /// Return the cached token, creating a session first if there is none
    pub async fn get_or_create_session(&mut self) -> AgentResult<String> {
        if let Some(token) = &self.session_token {
            return Ok(token.clone());
        }

        let token = self
            .transport
            .create_session()
            .await
            .map_err(|e| match e {
                AgentError::BackendUnavailable(_) => e,
                other => AgentError::BackendUnavailable(other.to_string()),
            })?;

        if token.trim().is_empty() {
            return Err(AgentError::BackendUnavailable(
                "dialogue backend returned an empty session token".to_string(),
            ));
        }

        info!("New dialogue session via {}: {}", self.transport.name(), token);
        self.session_token = Some(token.clone());

        Ok(token)
    }

    /// Send an utterance and return the reply text
    ///
    /// An empty string means the backend had nothing to say. No retries: an
    /// expired token is dropped so the next call creates a fresh session.
    pub async fn send(&mut self, utterance: &str) -> AgentResult<String> {
        let token = self.get_or_create_session().await?;

        info!("Sending to dialogue backend: {}", utterance);

        let response = match self.transport.post_message(&token, utterance).await {
            Ok(response) => response,
            Err(AgentError::SessionExpired(detail)) => {
                warn!("Dialogue session {} expired, will recreate on next utterance", token);
                self.session_token = None;
                return Err(AgentError::BackendUnavailable(detail));
            }
            Err(e) => return Err(e),
        };

        let reply = response.reply_text()?;

        if reply.is_empty() {
            warn!("Dialogue backend returned no text for: {}", utterance);
        } else {
            info!("Dialogue reply: {}", reply);
        }

        Ok(reply)
    }
}
