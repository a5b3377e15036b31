#![allow(dead_code)]

use anyhow::{anyhow, Result};
use loqa_voice_agent::audio::AudioInputReader;
use loqa_voice_agent::dialogue::{DialogueTransport, GenericItem, MessageResponse};
use loqa_voice_agent::error::{AgentError, AgentResult};
use loqa_voice_agent::recognition::{RecognitionEvent, SpeechRecognizer};
use loqa_voice_agent::session::{CallSession, SessionComponents, SessionConfig, SessionStats};
use loqa_voice_agent::speech::SpeechSynthesizer;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Ordered record of lifecycle calls made on the fakes
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn logged(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Recognizer whose events are fed by the test through a channel
pub struct ScriptedRecognizer {
    events: Option<mpsc::Receiver<RecognitionEvent>>,
    log: CallLog,
    audio_bytes: Arc<AtomicUsize>,
    input_closed: Arc<AtomicBool>,
    fail_start: bool,
}

pub struct RecognizerHandle {
    pub events: mpsc::Sender<RecognitionEvent>,
    pub audio_bytes: Arc<AtomicUsize>,
    pub input_closed: Arc<AtomicBool>,
}

impl RecognizerHandle {
    pub async fn emit(&self, event: RecognitionEvent) {
        self.events.send(event).await.unwrap();
    }

    pub async fn say(&self, text: &str) {
        self.emit(RecognitionEvent::final_speech(text)).await;
    }
}

impl ScriptedRecognizer {
    pub fn new(log: CallLog) -> (Self, RecognizerHandle) {
        let (tx, rx) = mpsc::channel(32);
        let audio_bytes = Arc::new(AtomicUsize::new(0));
        let input_closed = Arc::new(AtomicBool::new(false));

        (
            Self {
                events: Some(rx),
                log,
                audio_bytes: Arc::clone(&audio_bytes),
                input_closed: Arc::clone(&input_closed),
                fail_start: false,
            },
            RecognizerHandle {
                events: tx,
                audio_bytes,
                input_closed,
            },
        )
    }

    pub fn failing(log: CallLog) -> Self {
        let (mut recognizer, _) = Self::new(log);
        recognizer.fail_start = true;
        recognizer
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    async fn start_continuous(
        &mut self,
        mut input: AudioInputReader,
    ) -> AgentResult<mpsc::Receiver<RecognitionEvent>> {
        self.log.lock().unwrap().push("recognizer.start".to_string());

        if self.fail_start {
            return Err(AgentError::Recognizer("invalid subscription key".to_string()));
        }

        let audio_bytes = Arc::clone(&self.audio_bytes);
        let input_closed = Arc::clone(&self.input_closed);
        tokio::spawn(async move {
            while let Some(buffer) = input.read().await {
                audio_bytes.fetch_add(buffer.len(), Ordering::SeqCst);
            }
            input_closed.store(true, Ordering::SeqCst);
        });

        self.events
            .take()
            .ok_or_else(|| AgentError::Recognizer("already started".to_string()))
    }

    async fn stop_continuous(&mut self) -> AgentResult<()> {
        self.log.lock().unwrap().push("recognizer.stop".to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Dialogue backend with queued replies; echoes when the queue is empty
pub struct FakeDialogue {
    replies: Mutex<VecDeque<AgentResult<MessageResponse>>>,
    pub sessions_created: AtomicUsize,
    pub messages: Mutex<Vec<(String, String)>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    /// When set, each reply waits for one permit
    gate: Option<Arc<Semaphore>>,
    fail_session: bool,
}

impl FakeDialogue {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            sessions_created: AtomicUsize::new(0),
            messages: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            gate: None,
            fail_session: false,
        }
    }

    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }

    pub fn unauthorized() -> Self {
        Self {
            fail_session: true,
            ..Self::new()
        }
    }

    pub fn push_reply(&self, reply: AgentResult<MessageResponse>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn push_text(&self, texts: &[&str]) {
        let items = texts.iter().map(|t| GenericItem::text_item(*t)).collect();
        self.push_reply(Ok(MessageResponse::with_items(items)));
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl DialogueTransport for FakeDialogue {
    async fn create_session(&self) -> AgentResult<String> {
        if self.fail_session {
            return Err(AgentError::BackendUnavailable(
                "session creation returned 401 Unauthorized".to_string(),
            ));
        }

        let n = self.sessions_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("session-{}", n))
    }

    async fn post_message(&self, session_token: &str, text: &str) -> AgentResult<MessageResponse> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        self.messages
            .lock()
            .unwrap()
            .push((session_token.to_string(), text.to_string()));

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        let reply = self.replies.lock().unwrap().pop_front();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        reply.unwrap_or_else(|| {
            Ok(MessageResponse::with_items(vec![GenericItem::text_item(format!(
                "You said {}",
                text
            ))]))
        })
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Synthesizer returning silence, `bytes_per_char` bytes per character of text
pub struct FakeSynthesizer {
    log: CallLog,
    bytes_per_char: usize,
    fail_on: Option<String>,
    pub spoken: Mutex<Vec<String>>,
}

impl FakeSynthesizer {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            bytes_per_char: 64,
            fail_on: None,
            spoken: Mutex::new(Vec::new()),
        }
    }

    /// Synthesizes every text to zero bytes of audio
    pub fn mute(log: CallLog) -> Self {
        Self {
            bytes_per_char: 0,
            ..Self::new(log)
        }
    }

    pub fn failing_on(log: CallLog, text: &str) -> Self {
        Self {
            fail_on: Some(text.to_string()),
            ..Self::new(log)
        }
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str) -> AgentResult<Vec<u8>> {
        if self.fail_on.as_deref() == Some(text) {
            return Err(AgentError::SynthesisFailed("voice not available".to_string()));
        }

        self.spoken.lock().unwrap().push(text.to_string());
        Ok(vec![0u8; text.len() * self.bytes_per_char])
    }

    async fn close(&self) -> AgentResult<()> {
        self.log.lock().unwrap().push("synthesizer.close".to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// A call session wired to fakes
pub struct TestCall {
    pub session: CallSession,
    pub recognizer: RecognizerHandle,
    pub dialogue: Arc<FakeDialogue>,
    pub synthesizer: Arc<FakeSynthesizer>,
    pub outbound: mpsc::UnboundedReceiver<loqa_voice_agent::audio::OutboundAudioBatch>,
    pub log: CallLog,
}

impl TestCall {
    pub async fn new(config: SessionConfig, dialogue: FakeDialogue) -> Self {
        let log = call_log();
        let synthesizer = Arc::new(FakeSynthesizer::new(Arc::clone(&log)));
        Self::with_synthesizer(config, dialogue, synthesizer, log).await
    }

    pub async fn with_synthesizer(
        config: SessionConfig,
        dialogue: FakeDialogue,
        synthesizer: Arc<FakeSynthesizer>,
        log: CallLog,
    ) -> Self {
        let (recognizer, handle) = ScriptedRecognizer::new(Arc::clone(&log));
        let dialogue = Arc::new(dialogue);

        let session = CallSession::new(
            config,
            SessionComponents {
                recognizer: Box::new(recognizer),
                synthesizer: synthesizer.clone(),
                dialogue: dialogue.clone(),
            },
        );
        let outbound = session.take_outbound_receiver().await.unwrap();

        Self {
            session,
            recognizer: handle,
            dialogue,
            synthesizer,
            outbound,
            log,
        }
    }

    /// Push one 20ms frame, which starts the session on first call
    pub async fn push_silence(&self) {
        self.session.push_audio_frame(&[0u8; 640]).await;
    }
}

/// Poll until `check` holds or fail after `WAIT_TIMEOUT`
pub async fn wait_until(mut check: impl FnMut() -> bool) -> Result<()> {
    tokio::time::timeout(WAIT_TIMEOUT, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .map_err(|_| anyhow!("condition not met within {:?}", WAIT_TIMEOUT))
}

/// Poll session stats until `check` holds
pub async fn wait_for_stats(
    session: &CallSession,
    check: impl Fn(&SessionStats) -> bool,
) -> Result<SessionStats> {
    tokio::time::timeout(WAIT_TIMEOUT, async {
        loop {
            let stats = session.stats().await;
            if check(&stats) {
                return stats;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .map_err(|_| anyhow!("stats condition not met within {:?}", WAIT_TIMEOUT))
}
