use super::synthesizer::SpeechSynthesizer;
use crate::audio::{decode_synthesized, AudioFormat, OutboundAudioBatch};
use crate::error::{AgentError, AgentResult};
use chrono::Utc;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// What a successful `speak` emitted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpokenAudio {
    /// Media buffers handed to the transport (0 when nothing was emitted)
    pub buffers: usize,
    pub duration_ms: u64,
}

/// Synthesizes text and emits the packaged audio to the transport boundary
///
/// Cheap to clone; clones share the synthesizer and the outbound channel.
/// Once closed, nothing more is emitted, including results of syntheses that
/// were already in flight.
#[derive(Clone)]
pub struct SpeechOutput {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    format: AudioFormat,
    outbound_tx: Arc<Mutex<Option<mpsc::UnboundedSender<OutboundAudioBatch>>>>,
}

impl SpeechOutput {
    /// Create the output and the receiver the transport drains
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        format: AudioFormat,
    ) -> (Self, mpsc::UnboundedReceiver<OutboundAudioBatch>) {
        let (tx, rx) = mpsc::unbounded_channel();

        (
            Self {
                synthesizer,
                format,
                outbound_tx: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// Synthesize `text`, package it and emit one outbound batch
    pub async fn speak(&self, text: &str) -> AgentResult<SpokenAudio> {
        if self.is_closed() {
            return Err(AgentError::Closed("speech output"));
        }

        info!("Converting text to speech via {}: {}", self.synthesizer.name(), text);

        let audio = self.synthesizer.synthesize(text).await.map_err(|e| match e {
            AgentError::SynthesisFailed(_) => e,
            other => AgentError::SynthesisFailed(other.to_string()),
        })?;

        let pcm = decode_synthesized(&audio, self.format)?;
        let batch = OutboundAudioBatch::package(&pcm, self.format, Utc::now());

        if batch.is_empty() {
            warn!("Synthesizer returned no audio for: {}", text);
            return Ok(SpokenAudio::default());
        }

        let spoken = SpokenAudio {
            buffers: batch.len(),
            duration_ms: batch.duration_ms(),
        };

        self.emit(batch)?;

        info!(
            "Emitted {} media buffers ({}ms of audio)",
            spoken.buffers, spoken.duration_ms
        );

        Ok(spoken)
    }

    fn emit(&self, batch: OutboundAudioBatch) -> AgentResult<()> {
        let guard = self
            .outbound_tx
            .lock()
            .map_err(|_| AgentError::Closed("outbound audio channel"))?;

        match guard.as_ref() {
            Some(tx) => tx
                .send(batch)
                .map_err(|_| AgentError::Closed("outbound audio channel")),
            None => {
                info!("Discarding synthesized audio, speech output already released");
                Err(AgentError::Closed("speech output"))
            }
        }
    }

    /// Stop emitting and release the synthesizer. Safe to call repeatedly.
    pub async fn close(&self) {
        let sender = match self.outbound_tx.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };

        if sender.is_none() {
            return;
        }

        if let Err(e) = self.synthesizer.close().await {
            error!("Failed to release synthesizer {}: {}", self.synthesizer.name(), e);
        }

        info!("Speech output released ({})", self.synthesizer.name());
    }

    pub fn is_closed(&self) -> bool {
        match self.outbound_tx.lock() {
            Ok(guard) => guard.is_none(),
            Err(_) => true,
        }
    }
}
