//! Wiring of per-call sessions to concrete backends

use crate::config::{AgentConfig, Config};
use crate::dialogue::{DialogueTransport, HttpDialogueTransport};
use crate::nats::{NatsClient, NatsRecognizer, NatsSynthesizer};
use crate::session::{CallSession, SessionComponents, SessionConfig};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info};

/// Builds call sessions for the HTTP control API
#[async_trait::async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create(&self, call_id: String) -> Result<Arc<CallSession>>;
}

/// Sessions whose speech runs over NATS and whose dialogue runs over HTTP
pub struct BridgeSessionFactory {
    nats_url: String,
    language: String,
    agent: AgentConfig,
    dialogue: Arc<dyn DialogueTransport>,
}

impl BridgeSessionFactory {
    pub fn from_config(config: &Config) -> Result<Self> {
        let dialogue = HttpDialogueTransport::new(config.dialogue.clone())
            .context("Failed to build dialogue client")?;

        Ok(Self {
            nats_url: config.nats.url.clone(),
            language: config.speech.language.clone(),
            agent: config.agent.clone(),
            dialogue: Arc::new(dialogue),
        })
    }

    fn session_config(&self, call_id: String) -> SessionConfig {
        SessionConfig {
            greeting: self.agent.greeting.clone(),
            strip_trailing_period: self.agent.strip_trailing_period,
            ..SessionConfig::new(call_id)
        }
    }
}

#[async_trait::async_trait]
impl SessionFactory for BridgeSessionFactory {
    async fn create(&self, call_id: String) -> Result<Arc<CallSession>> {
        let config = self.session_config(call_id);

        let client = Arc::new(
            NatsClient::connect(&self.nats_url, config.call_id.clone())
                .await
                .context("Failed to connect to NATS")?,
        );

        let components = SessionComponents {
            recognizer: Box::new(NatsRecognizer::new(Arc::clone(&client), self.language.clone())),
            synthesizer: Arc::new(NatsSynthesizer::new(
                Arc::clone(&client),
                self.language.clone(),
                config.audio_format,
            )),
            dialogue: Arc::clone(&self.dialogue),
        };

        let session = Arc::new(CallSession::new(config, components));

        // Spawn outbound forwarding task; ends when the speech output is released
        if let Some(mut outbound_rx) = session.take_outbound_receiver().await {
            let call_id = session.call_id().to_string();
            tokio::spawn(async move {
                while let Some(batch) = outbound_rx.recv().await {
                    if let Err(e) = client.publish_outbound(&batch).await {
                        error!("Failed to forward outbound audio for call {}: {}", call_id, e);
                    }
                }
                info!("Outbound forwarding stopped for call {}", call_id);
            });
        }

        Ok(session)
    }
}
