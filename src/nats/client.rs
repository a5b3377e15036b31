use super::messages::{
    AudioFrameMessage, OutboundAudioMessage, SynthesisRequest, SynthesisResponse,
};
use crate::audio::{AudioFormat, OutboundAudioBatch, MEDIA_BUFFER_MS};
use anyhow::{Context, Result};
use async_nats::Client;
use base64::Engine;
use tracing::{debug, info};

/// Subject the TTS service answers synthesis requests on
pub const SYNTHESIS_SUBJECT: &str = "tts.synthesize";

pub struct NatsClient {
    client: Client,
    call_id: String,
}

impl NatsClient {
    /// Connect to NATS server
    pub async fn connect(url: &str, call_id: String) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client, call_id })
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    /// Publish an inbound audio frame for recognition
    pub async fn publish_audio_frame(
        &self,
        pcm_bytes: &[u8],
        format: AudioFormat,
        language: &str,
        sequence: u32,
        is_final: bool,
    ) -> Result<()> {
        let subject = format!("audio.frame.{}", self.call_id);

        let message = AudioFrameMessage {
            session_id: self.call_id.clone(),
            sequence,
            pcm: base64::engine::general_purpose::STANDARD.encode(pcm_bytes),
            sample_rate: format.sample_rate,
            channels: format.channels,
            language: language.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            final_frame: is_final,
        };

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish audio frame")?;

        debug!(
            "Published audio frame to {} (seq={}, bytes={}, final={})",
            subject,
            sequence,
            pcm_bytes.len(),
            is_final
        );

        Ok(())
    }

    /// Subscribe to transcript messages
    pub async fn subscribe_transcripts(&self) -> Result<async_nats::Subscriber> {
        // The STT service publishes to stt.text.partial and stt.text.final;
        // we filter by session_id in the message payload
        let subject = "stt.text.>";

        info!("Subscribing to transcripts on {}", subject);

        let subscriber = self
            .client
            .subscribe(subject)
            .await
            .context("Failed to subscribe to transcripts")?;

        Ok(subscriber)
    }

    /// Subscribe to recognition session boundaries (stopped / canceled)
    pub async fn subscribe_session_events(&self) -> Result<async_nats::Subscriber> {
        let subject = "stt.session.>";

        info!("Subscribing to recognition session events on {}", subject);

        let subscriber = self
            .client
            .subscribe(subject)
            .await
            .context("Failed to subscribe to session events")?;

        Ok(subscriber)
    }

    /// Ask the TTS service to synthesize text
    pub async fn request_synthesis(&self, text: &str, language: &str) -> Result<SynthesisResponse> {
        let request = SynthesisRequest {
            session_id: self.call_id.clone(),
            text: text.to_string(),
            language: language.to_string(),
        };

        let payload = serde_json::to_vec(&request)?;

        let reply = self
            .client
            .request(SYNTHESIS_SUBJECT.to_string(), payload.into())
            .await
            .context("Synthesis request failed")?;

        serde_json::from_slice(&reply.payload).context("Failed to parse synthesis response")
    }

    /// Publish a packaged outbound batch for the call transport
    pub async fn publish_outbound(&self, batch: &OutboundAudioBatch) -> Result<()> {
        let subject = format!("audio.out.{}", self.call_id);

        let message = OutboundAudioMessage {
            session_id: self.call_id.clone(),
            captured_at: batch.captured_at.to_rfc3339(),
            sample_rate: batch.format.sample_rate,
            channels: batch.format.channels,
            buffer_ms: MEDIA_BUFFER_MS,
            buffers: batch
                .buffers
                .iter()
                .map(|b| base64::engine::general_purpose::STANDARD.encode(&b.data))
                .collect(),
        };

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish outbound audio")?;

        info!(
            "Published outbound audio to {} ({} buffers)",
            subject,
            batch.buffers.len()
        );

        Ok(())
    }
}
