use super::config::SessionConfig;
use super::stats::{SessionStats, TranscriptEntry};
use crate::audio::{AudioIngress, OutboundAudioBatch};
use crate::dialogue::DialogueTransport;
use crate::recognition::{RecognitionSession, SpeechRecognizer};
use crate::speech::{SpeechOutput, SpeechSynthesizer};
use crate::turn::{TurnController, TurnCounters, TurnState};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Backends one call session talks to
pub struct SessionComponents {
    pub recognizer: Box<dyn SpeechRecognizer>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub dialogue: Arc<dyn DialogueTransport>,
}

enum Lifecycle {
    /// Created, waiting for the first audio frame
    Idle(TurnController),
    /// Turn controller running in its own task
    Running {
        handle: JoinHandle<()>,
        shutdown_tx: oneshot::Sender<()>,
    },
    Stopped,
}

/// One call leg: audio in, turn-taking, audio out
///
/// Recognition starts on the first audio frame; later frames only feed the
/// recognizer. `start` and `shutdown` are idempotent.
pub struct CallSession {
    /// Session configuration
    config: SessionConfig,

    /// When the session was created
    started_at: DateTime<Utc>,

    /// Writes transport audio into the recognizer input
    ingress: AudioIngress,

    lifecycle: Mutex<Lifecycle>,

    /// Fast path so frames after the first skip the lifecycle lock
    started: AtomicBool,

    state_rx: watch::Receiver<TurnState>,

    counters: Arc<TurnCounters>,

    transcript: Arc<Mutex<Vec<TranscriptEntry>>>,

    /// Outbound audio until the transport takes it
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<OutboundAudioBatch>>>,

    end_reason: Arc<Mutex<Option<String>>>,
}

impl CallSession {
    /// Create a call session in the `Idle` state
    pub fn new(config: SessionConfig, components: SessionComponents) -> Self {
        info!("Creating call session: {}", config.call_id);

        let recognition = RecognitionSession::bind(
            config.call_id.clone(),
            components.recognizer,
            config.audio_format,
        );
        let ingress = AudioIngress::new(recognition.input());
        let (speech, outbound_rx) = SpeechOutput::new(components.synthesizer, config.audio_format);

        let controller =
            TurnController::new(config.clone(), recognition, components.dialogue, speech);

        Self {
            state_rx: controller.subscribe(),
            counters: controller.counters(),
            transcript: controller.transcript(),
            config,
            started_at: Utc::now(),
            ingress,
            lifecycle: Mutex::new(Lifecycle::Idle(controller)),
            started: AtomicBool::new(false),
            outbound_rx: Mutex::new(Some(outbound_rx)),
            end_reason: Arc::new(Mutex::new(None)),
        }
    }

    pub fn call_id(&self) -> &str {
        &self.config.call_id
    }

    /// Push one frame of raw PCM from the transport
    ///
    /// Empty frames are ignored. The first frame starts recognition. Write
    /// failures are logged and never returned to the transport.
    pub async fn push_audio_frame(&self, frame: &[u8]) {
        if frame.is_empty() {
            return;
        }

        if !self.started.load(Ordering::SeqCst) {
            self.start().await;
        }

        self.ingress.push_frame(frame);
    }

    /// Start continuous recognition and the turn controller
    pub async fn start(&self) {
        let mut lifecycle = self.lifecycle.lock().await;

        let controller = match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Idle(controller) => controller,
            other => {
                *lifecycle = other;
                return;
            }
        };

        info!("Starting call session: {}", self.config.call_id);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let end_reason = Arc::clone(&self.end_reason);

        let handle = tokio::spawn(async move {
            let end = controller.run(shutdown_rx).await;
            *end_reason.lock().await = Some(end.to_string());
        });

        *lifecycle = Lifecycle::Running {
            handle,
            shutdown_tx,
        };
        self.started.store(true, Ordering::SeqCst);
    }

    /// Stop recognition, release audio input and synthesizer, and wait for it
    ///
    /// Returns final stats. Calling again is a no-op.
    pub async fn shutdown(&self) -> SessionStats {
        let mut lifecycle = self.lifecycle.lock().await;
        self.started.store(true, Ordering::SeqCst);

        match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Stopped => {
                debug!("Call session {} already stopped", self.config.call_id);
            }
            Lifecycle::Idle(controller) => {
                info!("Shutting down idle call session: {}", self.config.call_id);
                let end = controller.shutdown_idle().await;
                *self.end_reason.lock().await = Some(end.to_string());
            }
            Lifecycle::Running {
                handle,
                shutdown_tx,
            } => {
                info!("Shutting down call session: {}", self.config.call_id);
                // Err means the controller already finished on its own
                let _ = shutdown_tx.send(());

                if let Err(e) = handle.await {
                    error!("Turn controller task panicked: {}", e);
                }
            }
        }

        drop(lifecycle);

        info!("Call session {} shut down", self.config.call_id);
        self.stats().await
    }

    /// Current turn-taking state
    pub fn state(&self) -> TurnState {
        *self.state_rx.borrow()
    }

    /// Resolve once the session reaches `Stopped`
    pub async fn stopped(&self) {
        let mut state_rx = self.state_rx.clone();
        // Err means the controller is gone, which only happens after Stopped
        let _ = state_rx
            .wait_for(|state| *state == TurnState::Stopped)
            .await;
    }

    /// Take the outbound audio receiver; only the first caller gets it
    pub async fn take_outbound_receiver(&self) -> Option<mpsc::UnboundedReceiver<OutboundAudioBatch>> {
        self.outbound_rx.lock().await.take()
    }

    /// Get current session statistics
    pub async fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);

        let state = self.state();

        SessionStats {
            call_id: self.config.call_id.clone(),
            state,
            active: state.is_active(),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            frames_ingested: self.ingress.frames_written(),
            bytes_ingested: self.ingress.bytes_written(),
            frames_dropped: self.ingress.frames_dropped(),
            utterances_dispatched: self.counters.utterances_dispatched.load(Ordering::SeqCst),
            replies_spoken: self.counters.replies_spoken.load(Ordering::SeqCst),
            silent_turns: self.counters.silent_turns.load(Ordering::SeqCst),
            turns_failed: self.counters.turns_failed.load(Ordering::SeqCst),
            events_discarded: self.counters.events_discarded.load(Ordering::SeqCst),
            end_reason: self.end_reason.lock().await.clone(),
        }
    }

    /// Get the conversation so far
    pub async fn transcript(&self) -> Vec<TranscriptEntry> {
        self.transcript.lock().await.clone()
    }
}
