use super::client::NatsClient;
use super::messages::{SttSessionMessage, SynthesisResponse, TranscriptMessage};
use crate::audio::{AudioFormat, AudioInputReader};
use crate::error::{AgentError, AgentResult};
use crate::recognition::{RecognitionEvent, SpeechRecognizer};
use crate::speech::SpeechSynthesizer;
use base64::Engine;
use futures::stream::{Stream, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Recognizer backed by a speech service on NATS
///
/// Audio read from the input stream is published frame by frame; transcripts
/// and session boundaries for this call are turned into recognition events.
pub struct NatsRecognizer {
    client: Arc<NatsClient>,
    language: String,
    is_capturing: Arc<AtomicBool>,
    format: AudioFormat,
    frame_sequence: Arc<AtomicU32>,
    audio_task: Option<JoinHandle<()>>,
    event_task: Option<JoinHandle<()>>,
}

impl NatsRecognizer {
    pub fn new(client: Arc<NatsClient>, language: impl Into<String>) -> Self {
        Self {
            client,
            language: language.into(),
            is_capturing: Arc::new(AtomicBool::new(false)),
            format: AudioFormat::PCM_16K_MONO,
            frame_sequence: Arc::new(AtomicU32::new(0)),
            audio_task: None,
            event_task: None,
        }
    }
}

fn parse_transcript(payload: &[u8], call_id: &str) -> Option<RecognitionEvent> {
    match serde_json::from_slice::<TranscriptMessage>(payload) {
        Ok(transcript) if transcript.session_id == call_id => Some(transcript.into_event()),
        Ok(_) => None,
        Err(e) => {
            warn!("Failed to parse transcript message: {}", e);
            None
        }
    }
}

fn parse_session_event(payload: &[u8], call_id: &str) -> Option<RecognitionEvent> {
    match serde_json::from_slice::<SttSessionMessage>(payload) {
        Ok(message) if message.session_id == call_id => Some(message.into_event()),
        Ok(_) => None,
        Err(e) => {
            warn!("Failed to parse session event message: {}", e);
            None
        }
    }
}

/// Turn transcript and session-event payloads for `call_id` into recognition events
///
/// SessionStarted is sent first. Stops after forwarding a terminal event or
/// once the receiver goes away.
async fn forward_events<T, S>(
    mut transcripts: T,
    mut session_events: S,
    call_id: String,
    tx: mpsc::Sender<RecognitionEvent>,
) where
    T: Stream<Item = Vec<u8>> + Unpin,
    S: Stream<Item = Vec<u8>> + Unpin,
{
    // The service opens its session on the first frame; report it now
    if tx.send(RecognitionEvent::SessionStarted).await.is_err() {
        return;
    }

    loop {
        let event = tokio::select! {
            Some(payload) = transcripts.next() => parse_transcript(&payload, &call_id),
            Some(payload) = session_events.next() => parse_session_event(&payload, &call_id),
            else => break,
        };

        let Some(event) = event else {
            continue;
        };

        let terminal = event.is_terminal();
        if tx.send(event).await.is_err() || terminal {
            break;
        }
    }

    info!("Recognition event task stopped for call {}", call_id);
}

#[async_trait::async_trait]
impl SpeechRecognizer for NatsRecognizer {
    async fn start_continuous(
        &mut self,
        mut input: AudioInputReader,
    ) -> AgentResult<mpsc::Receiver<RecognitionEvent>> {
        if self.is_capturing.load(Ordering::SeqCst) {
            return Err(AgentError::Recognizer("recognition already running".to_string()));
        }

        let transcripts = self
            .client
            .subscribe_transcripts()
            .await
            .map_err(|e| AgentError::Recognizer(e.to_string()))?;
        let session_events = self
            .client
            .subscribe_session_events()
            .await
            .map_err(|e| AgentError::Recognizer(e.to_string()))?;

        self.is_capturing.store(true, Ordering::SeqCst);
        self.format = input.format();

        // Spawn audio publishing task
        let client = Arc::clone(&self.client);
        let is_capturing = Arc::clone(&self.is_capturing);
        let frame_sequence = Arc::clone(&self.frame_sequence);
        let language = self.language.clone();

        let audio_task = tokio::spawn(async move {
            info!("Audio publishing task started");
            let format = input.format();

            while let Some(pcm) = input.read().await {
                if !is_capturing.load(Ordering::SeqCst) {
                    break;
                }

                let seq = frame_sequence.fetch_add(1, Ordering::SeqCst);

                if let Err(e) = client
                    .publish_audio_frame(&pcm, format, &language, seq, false)
                    .await
                {
                    error!("Failed to publish audio frame: {}", e);
                }
            }

            info!("Audio publishing task stopped");
        });

        // Spawn event receiving task
        let (tx, rx) = mpsc::channel(100);
        let call_id = self.client.call_id().to_string();

        let transcripts = transcripts.map(|msg| msg.payload.to_vec());
        let session_events = session_events.map(|msg| msg.payload.to_vec());
        let event_task = tokio::spawn(forward_events(transcripts, session_events, call_id, tx));

        self.audio_task = Some(audio_task);
        self.event_task = Some(event_task);

        Ok(rx)
    }

    async fn stop_continuous(&mut self) -> AgentResult<()> {
        if !self.is_capturing.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        if let Some(task) = self.event_task.take() {
            task.abort();
        }
        if let Some(task) = self.audio_task.take() {
            task.abort();
        }

        // Tell the service the stream is over
        let seq = self.frame_sequence.load(Ordering::SeqCst);
        self.client
            .publish_audio_frame(&[], self.format, &self.language, seq, true)
            .await
            .map_err(|e| AgentError::Recognizer(e.to_string()))?;

        Ok(())
    }

    fn name(&self) -> &str {
        "nats"
    }
}

/// Check a TTS reply against the session format and decode its audio
fn decode_synthesis(response: SynthesisResponse, format: AudioFormat) -> AgentResult<Vec<u8>> {
    if let Some(error) = response.error {
        return Err(AgentError::SynthesisFailed(error));
    }

    if response.sample_rate != 0 && response.sample_rate != format.sample_rate {
        return Err(AgentError::SynthesisFailed(format!(
            "TTS returned {}Hz audio, expected {}Hz",
            response.sample_rate, format.sample_rate
        )));
    }

    base64::engine::general_purpose::STANDARD
        .decode(response.pcm.as_bytes())
        .map_err(|e| AgentError::SynthesisFailed(format!("invalid audio payload: {}", e)))
}

/// Synthesizer backed by request/reply against a TTS service on NATS
pub struct NatsSynthesizer {
    client: Arc<NatsClient>,
    language: String,
    format: AudioFormat,
    closed: AtomicBool,
}

impl NatsSynthesizer {
    pub fn new(client: Arc<NatsClient>, language: impl Into<String>, format: AudioFormat) -> Self {
        Self {
            client,
            language: language.into(),
            format,
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for NatsSynthesizer {
    async fn synthesize(&self, text: &str) -> AgentResult<Vec<u8>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AgentError::Closed("synthesizer"));
        }

        let response = self
            .client
            .request_synthesis(text, &self.language)
            .await
            .map_err(|e| AgentError::SynthesisFailed(e.to_string()))?;

        decode_synthesis(response, self.format)
    }

    async fn close(&self) -> AgentResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "nats"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::{CancellationReason, ResultReason};
    use futures::stream;

    fn transcript(session_id: &str, text: &str, partial: bool) -> Vec<u8> {
        serde_json::json!({
            "session_id": session_id,
            "text": text,
            "partial": partial,
            "timestamp": "2025-10-27T14:30:05Z"
        })
        .to_string()
        .into_bytes()
    }

    fn session_event(session_id: &str, event: &str) -> Vec<u8> {
        serde_json::json!({ "session_id": session_id, "event": event })
            .to_string()
            .into_bytes()
    }

    #[test]
    fn test_transcripts_for_other_calls_dropped() {
        assert_eq!(
            parse_transcript(&transcript("call-2", "book a table", false), "call-1"),
            None
        );
        assert_eq!(
            parse_transcript(&transcript("call-1", "book a table", false), "call-1"),
            Some(RecognitionEvent::Final {
                text: "book a table".to_string(),
                reason: ResultReason::RecognizedSpeech,
            })
        );
        assert_eq!(parse_transcript(b"not json", "call-1"), None);
    }

    #[test]
    fn test_session_events_for_other_calls_dropped() {
        assert_eq!(
            parse_session_event(&session_event("call-2", "stopped"), "call-1"),
            None
        );
        assert_eq!(
            parse_session_event(&session_event("call-1", "stopped"), "call-1"),
            Some(RecognitionEvent::SessionStopped)
        );
        assert!(matches!(
            parse_session_event(&session_event("call-1", "canceled"), "call-1"),
            Some(RecognitionEvent::Canceled {
                reason: CancellationReason::Error,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_forwarding_starts_with_session_started_and_filters() {
        let transcripts = stream::iter(vec![
            transcript("call-2", "not mine", false),
            transcript("call-1", "what time", true),
            transcript("call-1", "what time is it", false),
        ]);
        let (tx, mut rx) = mpsc::channel(8);

        tokio::spawn(forward_events(
            transcripts,
            stream::pending::<Vec<u8>>(),
            "call-1".to_string(),
            tx,
        ));

        assert_eq!(rx.recv().await, Some(RecognitionEvent::SessionStarted));
        assert_eq!(
            rx.recv().await,
            Some(RecognitionEvent::Partial {
                text: "what time".to_string()
            })
        );
        assert_eq!(
            rx.recv().await,
            Some(RecognitionEvent::final_speech("what time is it"))
        );
    }

    #[tokio::test]
    async fn test_forwarding_stops_after_terminal_event() {
        let session_events = stream::iter(vec![
            session_event("call-2", "canceled"),
            session_event("call-1", "stopped"),
            session_event("call-1", "canceled"),
        ]);
        let (tx, mut rx) = mpsc::channel(8);

        forward_events(
            stream::empty::<Vec<u8>>(),
            session_events,
            "call-1".to_string(),
            tx,
        )
        .await;

        assert_eq!(rx.recv().await, Some(RecognitionEvent::SessionStarted));
        assert_eq!(rx.recv().await, Some(RecognitionEvent::SessionStopped));
        assert_eq!(rx.recv().await, None);
    }

    fn response(pcm: &str, sample_rate: u32, error: Option<&str>) -> SynthesisResponse {
        SynthesisResponse {
            pcm: pcm.to_string(),
            sample_rate,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_synthesis_decoded() {
        let pcm = base64::engine::general_purpose::STANDARD.encode([1u8, 2, 3, 4]);

        let audio = decode_synthesis(response(&pcm, 16000, None), AudioFormat::PCM_16K_MONO);
        assert_eq!(audio.unwrap(), vec![1, 2, 3, 4]);

        // Services that omit the rate are trusted
        let audio = decode_synthesis(response(&pcm, 0, None), AudioFormat::PCM_16K_MONO);
        assert_eq!(audio.unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_synthesis_sample_rate_mismatch() {
        let pcm = base64::engine::general_purpose::STANDARD.encode([0u8; 4]);

        let err = decode_synthesis(response(&pcm, 24000, None), AudioFormat::PCM_16K_MONO)
            .unwrap_err();

        assert!(matches!(err, AgentError::SynthesisFailed(_)), "{:?}", err);
        assert!(err.to_string().contains("24000Hz"));
    }

    #[test]
    fn test_synthesis_invalid_payload_and_error() {
        let err = decode_synthesis(response("%%%not-base64", 16000, None), AudioFormat::PCM_16K_MONO)
            .unwrap_err();
        assert!(err.to_string().contains("invalid audio payload"));

        let err = decode_synthesis(response("", 0, Some("voice not found")), AudioFormat::PCM_16K_MONO)
            .unwrap_err();
        assert!(matches!(err, AgentError::SynthesisFailed(ref m) if m == "voice not found"));
    }
}
