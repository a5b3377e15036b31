use super::state::{TurnInput, TurnState};
use crate::dialogue::{DialogueClient, DialogueTransport};
use crate::error::AgentError;
use crate::recognition::{CancellationReason, RecognitionEvent, RecognitionSession, ResultReason};
use crate::session::{SessionConfig, TranscriptEntry};
use crate::speech::{SpeechOutput, SpokenAudio};
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

/// Turn counters shared with the session facade
#[derive(Debug, Default)]
pub struct TurnCounters {
    pub utterances_dispatched: AtomicU64,
    pub replies_spoken: AtomicU64,
    pub silent_turns: AtomicU64,
    pub turns_failed: AtomicU64,
    pub events_discarded: AtomicU64,
}

impl TurnCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

/// Why a call session ended
#[derive(Debug)]
pub enum SessionEnd {
    /// Recognizer reported SessionStopped (or went away)
    RecognitionStopped,
    /// Recognizer reported Canceled
    RecognitionCanceled(AgentError),
    /// Recognition could not be started
    RecognizerFailed(AgentError),
    /// Caller shut the session down
    ShutdownRequested,
}

impl std::fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEnd::RecognitionStopped => write!(f, "recognition session stopped"),
            SessionEnd::RecognitionCanceled(e) => write!(f, "{}", e),
            SessionEnd::RecognizerFailed(e) => write!(f, "{}", e),
            SessionEnd::ShutdownRequested => write!(f, "shutdown requested"),
        }
    }
}

/// How a turn finished
#[derive(Debug)]
pub enum TurnOutcome {
    /// Reply synthesized and emitted
    Spoke { reply: String, audio: SpokenAudio },
    /// Nothing to say, or nothing came out of synthesis
    Silent,
    /// Failed somewhere in the pipeline; nothing was spoken
    Failed(AgentError),
}

impl TurnOutcome {
    fn label(&self) -> &'static str {
        match self {
            TurnOutcome::Spoke { .. } => "spoke",
            TurnOutcome::Silent => "silent",
            TurnOutcome::Failed(_) => "failed",
        }
    }
}

enum TurnRequest {
    Utterance(String),
    Greeting(String),
}

struct TurnCompletion {
    dialogue: DialogueClient,
    utterance: Option<String>,
    outcome: TurnOutcome,
}

/// Listening/speaking state machine for one call
///
/// A single driver loop consumes recognition events in order. At most one
/// turn is in flight: the dialogue client is moved into the turn task and
/// only comes back when the turn completes, so two dialogue calls can never
/// overlap. While a turn is in flight, recognized speech is discarded so the
/// agent never reacts to its own synthesized audio.
pub struct TurnController {
    config: SessionConfig,
    state: watch::Sender<TurnState>,
    recognition: RecognitionSession,
    dialogue: Option<DialogueClient>,
    dialogue_transport: Arc<dyn DialogueTransport>,
    speech: SpeechOutput,
    counters: Arc<TurnCounters>,
    transcript: Arc<Mutex<Vec<TranscriptEntry>>>,
    in_flight: Option<JoinHandle<TurnCompletion>>,
}

impl TurnController {
    pub fn new(
        config: SessionConfig,
        recognition: RecognitionSession,
        dialogue_transport: Arc<dyn DialogueTransport>,
        speech: SpeechOutput,
    ) -> Self {
        let (state, _) = watch::channel(TurnState::Idle);

        Self {
            config,
            state,
            recognition,
            dialogue: Some(DialogueClient::new(Arc::clone(&dialogue_transport))),
            dialogue_transport,
            speech,
            counters: Arc::new(TurnCounters::default()),
            transcript: Arc::new(Mutex::new(Vec::new())),
            in_flight: None,
        }
    }

    /// Watch the turn state
    pub fn subscribe(&self) -> watch::Receiver<TurnState> {
        self.state.subscribe()
    }

    pub fn counters(&self) -> Arc<TurnCounters> {
        Arc::clone(&self.counters)
    }

    pub fn transcript(&self) -> Arc<Mutex<Vec<TranscriptEntry>>> {
        Arc::clone(&self.transcript)
    }

    pub fn state(&self) -> TurnState {
        *self.state.borrow()
    }

    /// Run the session from first audio until teardown completes
    ///
    /// Returns once the session is `Stopped`. Dropping or firing `shutdown`
    /// requests shutdown.
    pub async fn run(mut self, mut shutdown: oneshot::Receiver<()>) -> SessionEnd {
        self.transition(TurnInput::AudioArrived);

        let end = match self.recognition.start().await {
            Ok(()) => self.drive(&mut shutdown).await,
            Err(e) => {
                error!(
                    "Failed to start recognition for call {}: {}",
                    self.config.call_id, e
                );
                self.transition(TurnInput::RecognitionEnded);
                SessionEnd::RecognizerFailed(e)
            }
        };

        self.teardown().await;

        info!("Call {} stopped: {}", self.config.call_id, end);
        end
    }

    /// Tear down a session that never received audio
    pub async fn shutdown_idle(mut self) -> SessionEnd {
        self.transition(TurnInput::ShutdownRequested);
        self.teardown().await;
        SessionEnd::ShutdownRequested
    }

    async fn drive(&mut self, shutdown: &mut oneshot::Receiver<()>) -> SessionEnd {
        loop {
            tokio::select! {
                event = self.recognition.next_event() => {
                    let Some(event) = event else {
                        self.transition(TurnInput::RecognitionEnded);
                        return SessionEnd::RecognitionStopped;
                    };

                    if let Some(end) = self.handle_event(event) {
                        return end;
                    }
                }
                joined = wait_for_turn(&mut self.in_flight) => {
                    self.in_flight = None;
                    self.finish_turn(joined).await;
                }
                _ = &mut *shutdown => {
                    info!("Shutdown requested for call {}", self.config.call_id);
                    self.transition(TurnInput::ShutdownRequested);
                    return SessionEnd::ShutdownRequested;
                }
            }
        }
    }

    fn handle_event(&mut self, event: RecognitionEvent) -> Option<SessionEnd> {
        let processing = self.state().is_processing();

        match event {
            RecognitionEvent::Partial { text } => {
                if processing {
                    self.discard("partial", &text);
                } else {
                    debug!("RECOGNIZING: {}", text);
                }
                None
            }

            RecognitionEvent::Final { text, reason } => {
                if processing {
                    self.discard("final", &text);
                    return None;
                }

                match reason {
                    ResultReason::NoMatch => {
                        info!("NOMATCH: Speech could not be recognized");
                    }
                    ResultReason::RecognizedSpeech => {
                        if text.trim().is_empty() {
                            return None;
                        }

                        info!("RECOGNIZED: {}", text);

                        match normalize_utterance(&text, self.config.strip_trailing_period) {
                            Some(utterance) => self.dispatch(TurnRequest::Utterance(utterance)),
                            None => debug!("Utterance empty after normalization: {:?}", text),
                        }
                    }
                }
                None
            }

            RecognitionEvent::SessionStarted => {
                info!("Session started event for call {}", self.config.call_id);

                if processing {
                    self.discard("session_started", "");
                } else if let Some(greeting) = self.config.greeting.clone() {
                    self.dispatch(TurnRequest::Greeting(greeting));
                }
                None
            }

            RecognitionEvent::SessionStopped => {
                info!("Session stopped event for call {}, stopping recognition", self.config.call_id);
                self.transition(TurnInput::RecognitionEnded);
                Some(SessionEnd::RecognitionStopped)
            }

            RecognitionEvent::Canceled {
                reason,
                error_code,
                error_details,
            } => {
                info!("CANCELED: Reason={}", reason);

                if reason == CancellationReason::Error {
                    error!(
                        "CANCELED: ErrorCode={} ErrorDetails={}",
                        error_code.as_deref().unwrap_or("-"),
                        error_details.as_deref().unwrap_or("-")
                    );
                }

                self.transition(TurnInput::RecognitionEnded);
                Some(SessionEnd::RecognitionCanceled(AgentError::RecognitionCanceled {
                    reason: reason.to_string(),
                    error_code,
                    error_details,
                }))
            }
        }
    }

    fn discard(&self, kind: &str, text: &str) {
        TurnCounters::bump(&self.counters.events_discarded);
        info!(
            "Ignoring {} event because a response is being processed: {:?}",
            kind, text
        );
    }

    fn dispatch(&mut self, request: TurnRequest) {
        if !self.transition(TurnInput::TurnDispatched) {
            return;
        }

        // None only after a turn task died; start over with a fresh client
        let dialogue = self
            .dialogue
            .take()
            .unwrap_or_else(|| DialogueClient::new(Arc::clone(&self.dialogue_transport)));

        if matches!(request, TurnRequest::Utterance(_)) {
            TurnCounters::bump(&self.counters.utterances_dispatched);
        }

        info!("Recognition paused while processing response for call {}", self.config.call_id);

        let speech = self.speech.clone();
        self.in_flight = Some(tokio::spawn(run_turn(dialogue, speech, request)));
    }

    async fn finish_turn(&mut self, joined: Result<TurnCompletion, JoinError>) {
        match joined {
            Ok(completion) => {
                self.dialogue = Some(completion.dialogue);

                let reply = match &completion.outcome {
                    TurnOutcome::Spoke { reply, audio } => {
                        TurnCounters::bump(&self.counters.replies_spoken);
                        info!("Turn complete: spoke {}ms of audio", audio.duration_ms);
                        Some(reply.clone())
                    }
                    TurnOutcome::Silent => {
                        TurnCounters::bump(&self.counters.silent_turns);
                        warn!("Turn for call {} produced no audio", self.config.call_id);
                        None
                    }
                    TurnOutcome::Failed(e) => {
                        TurnCounters::bump(&self.counters.turns_failed);
                        error!("Error during turn processing for call {}: {}", self.config.call_id, e);
                        None
                    }
                };

                let entry = TranscriptEntry {
                    utterance: completion.utterance,
                    reply,
                    outcome: completion.outcome.label().to_string(),
                    timestamp: Utc::now(),
                };
                self.transcript.lock().await.push(entry);
            }
            Err(e) => {
                TurnCounters::bump(&self.counters.turns_failed);
                error!("Turn task for call {} died: {}", self.config.call_id, e);
            }
        }

        if self.transition(TurnInput::TurnFinished) {
            info!("Recognition resumed after processing response for call {}", self.config.call_id);
        }
    }

    /// Stop recognition, release audio input, release synthesis, in that order
    async fn teardown(&mut self) {
        self.recognition.shutdown().await;
        self.speech.close().await;

        if self.in_flight.take().is_some() {
            info!(
                "Turn still in flight for call {}; its result will be discarded",
                self.config.call_id
            );
        }

        self.transition(TurnInput::TeardownComplete);
    }

    /// Apply one transition atomically. Returns whether it was valid.
    fn transition(&self, input: TurnInput) -> bool {
        let call_id = &self.config.call_id;

        let applied = self.state.send_if_modified(|state| match state.next(input) {
            Some(next) => {
                debug!("Call {}: {} -> {} ({:?})", call_id, state, next, input);
                *state = next;
                true
            }
            None => false,
        });

        if !applied {
            warn!(
                "Call {}: ignoring {:?} in state {}",
                call_id,
                input,
                self.state()
            );
        }

        applied
    }
}

async fn wait_for_turn(
    in_flight: &mut Option<JoinHandle<TurnCompletion>>,
) -> Result<TurnCompletion, JoinError> {
    match in_flight {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

async fn run_turn(
    mut dialogue: DialogueClient,
    speech: SpeechOutput,
    request: TurnRequest,
) -> TurnCompletion {
    let (utterance, outcome) = match request {
        TurnRequest::Utterance(text) => {
            let outcome = respond(&mut dialogue, &speech, &text).await;
            (Some(text), outcome)
        }
        TurnRequest::Greeting(text) => (None, speak(&speech, text).await),
    };

    TurnCompletion {
        dialogue,
        utterance,
        outcome,
    }
}

async fn respond(dialogue: &mut DialogueClient, speech: &SpeechOutput, utterance: &str) -> TurnOutcome {
    info!("Processing text with dialogue backend: {}", utterance);

    match dialogue.send(utterance).await {
        Ok(reply) if reply.is_empty() => TurnOutcome::Silent,
        Ok(reply) => speak(speech, reply).await,
        Err(e) => TurnOutcome::Failed(e),
    }
}

async fn speak(speech: &SpeechOutput, text: String) -> TurnOutcome {
    match speech.speak(&text).await {
        // Nothing reached the transport
        Ok(audio) if audio.buffers == 0 => TurnOutcome::Silent,
        Ok(audio) => TurnOutcome::Spoke { reply: text, audio },
        Err(e) => TurnOutcome::Failed(e),
    }
}

/// Trim a final transcript and drop trailing periods
///
/// Returns `None` when nothing is left to send.
pub fn normalize_utterance(text: &str, strip_trailing_period: bool) -> Option<String> {
    let mut utterance = text.trim();

    if strip_trailing_period {
        utterance = utterance.trim_end_matches('.').trim_end();
    }

    if utterance.is_empty() {
        None
    } else {
        Some(utterance.to_string())
    }
}
