use super::events::RecognitionEvent;
use super::recognizer::SpeechRecognizer;
use crate::audio::{AudioFormat, AudioInputReader, AudioInputStream};
use crate::error::{AgentError, AgentResult};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    /// Audio input bound, recognition not started
    Bound,
    /// Continuous recognition running
    Running,
    /// Canceled or SessionStopped observed, stop not yet requested
    Completed,
    /// Recognition stopped and audio input released
    Stopped,
}

/// One continuous-recognition run bound to one audio input
///
/// Events are pulled lazily with [`next_event`](Self::next_event). The run is
/// complete once a Canceled or SessionStopped event has been delivered; after
/// that no further events are surfaced.
pub struct RecognitionSession {
    call_id: String,
    recognizer: Box<dyn SpeechRecognizer>,
    input: Arc<AudioInputStream>,
    reader: Option<AudioInputReader>,
    events: Option<mpsc::Receiver<RecognitionEvent>>,
    lifecycle: Lifecycle,
}

impl RecognitionSession {
    /// Bind a recognizer to a fresh push audio stream
    pub fn bind(
        call_id: impl Into<String>,
        recognizer: Box<dyn SpeechRecognizer>,
        format: AudioFormat,
    ) -> Self {
        let (input, reader) = AudioInputStream::create_push_stream(format);

        Self {
            call_id: call_id.into(),
            recognizer,
            input: Arc::new(input),
            reader: Some(reader),
            events: None,
            lifecycle: Lifecycle::Bound,
        }
    }

    /// Writer side of the bound audio input
    pub fn input(&self) -> Arc<AudioInputStream> {
        Arc::clone(&self.input)
    }

    /// Start continuous recognition. Calling again is a no-op.
    pub async fn start(&mut self) -> AgentResult<()> {
        if self.lifecycle != Lifecycle::Bound {
            warn!("Recognition already started for call {}", self.call_id);
            return Ok(());
        }

        let reader = self
            .reader
            .take()
            .ok_or(AgentError::Closed("audio input reader"))?;

        info!(
            "Starting continuous recognition for call {} ({})",
            self.call_id,
            self.recognizer.name()
        );

        let events = self.recognizer.start_continuous(reader).await?;
        self.events = Some(events);
        self.lifecycle = Lifecycle::Running;

        Ok(())
    }

    /// Next recognition event, or `None` once the run is complete
    ///
    /// A recognizer that drops its event channel without a terminal event is
    /// reported as SessionStopped.
    pub async fn next_event(&mut self) -> Option<RecognitionEvent> {
        if self.lifecycle != Lifecycle::Running {
            return None;
        }

        let events = self.events.as_mut()?;

        let event = match events.recv().await {
            Some(event) => event,
            None => {
                warn!(
                    "Recognizer {} closed its event channel for call {}",
                    self.recognizer.name(),
                    self.call_id
                );
                RecognitionEvent::SessionStopped
            }
        };

        if event.is_terminal() {
            self.lifecycle = Lifecycle::Completed;
        }

        Some(event)
    }

    /// Stop recognition, then release the audio input
    ///
    /// Safe to call repeatedly.
    pub async fn shutdown(&mut self) {
        match self.lifecycle {
            Lifecycle::Stopped => return,
            Lifecycle::Running | Lifecycle::Completed => {
                info!("Stopping recognition for call {}", self.call_id);
                if let Err(e) = self.recognizer.stop_continuous().await {
                    error!("Failed to stop recognizer {}: {}", self.recognizer.name(), e);
                }
            }
            Lifecycle::Bound => {}
        }

        self.input.close();
        self.events = None;
        self.reader = None;
        self.lifecycle = Lifecycle::Stopped;

        info!("Recognition session released for call {}", self.call_id);
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle == Lifecycle::Running
    }

    pub fn is_stopped(&self) -> bool {
        self.lifecycle == Lifecycle::Stopped
    }
}
