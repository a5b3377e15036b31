use crate::recognition::{CancellationReason, RecognitionEvent, ResultReason};
use serde::{Deserialize, Serialize};

/// Inbound audio frame published to the speech service
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioFrameMessage {
    pub session_id: String,
    pub sequence: u32,
    pub pcm: String, // Base64-encoded PCM bytes
    pub sample_rate: u32,
    pub channels: u16,
    pub language: String,
    pub timestamp: String, // RFC3339 timestamp
    #[serde(rename = "final")]
    pub final_frame: bool,
}

/// Transcript message received from the STT service
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub session_id: String,
    pub text: String,
    pub partial: bool,
    pub timestamp: String,
    #[serde(default)]
    pub confidence: Option<f32>,
    /// Final result where speech was heard but not recognized
    #[serde(default)]
    pub no_match: bool,
}

impl TranscriptMessage {
    pub fn into_event(self) -> RecognitionEvent {
        if self.partial {
            RecognitionEvent::Partial { text: self.text }
        } else {
            let reason = if self.no_match {
                ResultReason::NoMatch
            } else {
                ResultReason::RecognizedSpeech
            };
            RecognitionEvent::Final {
                text: self.text,
                reason,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SttSessionEvent {
    Stopped,
    Canceled,
}

/// Recognition session boundary published by the STT service
#[derive(Debug, Serialize, Deserialize)]
pub struct SttSessionMessage {
    pub session_id: String,
    pub event: SttSessionEvent,
    #[serde(default)]
    pub reason: Option<CancellationReason>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_details: Option<String>,
}

impl SttSessionMessage {
    pub fn into_event(self) -> RecognitionEvent {
        match self.event {
            SttSessionEvent::Stopped => RecognitionEvent::SessionStopped,
            SttSessionEvent::Canceled => RecognitionEvent::Canceled {
                reason: self.reason.unwrap_or(CancellationReason::Error),
                error_code: self.error_code,
                error_details: self.error_details,
            },
        }
    }
}

/// Synthesis request sent to the TTS service
#[derive(Debug, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub session_id: String,
    pub text: String,
    pub language: String,
}

/// Synthesis reply from the TTS service
#[derive(Debug, Serialize, Deserialize)]
pub struct SynthesisResponse {
    #[serde(default)]
    pub pcm: String, // Base64-encoded PCM or WAV bytes
    #[serde(default)]
    pub sample_rate: u32,
    #[serde(default)]
    pub error: Option<String>,
}

/// Outbound audio batch published for the call transport
#[derive(Debug, Serialize, Deserialize)]
pub struct OutboundAudioMessage {
    pub session_id: String,
    pub captured_at: String, // RFC3339 timestamp
    pub sample_rate: u32,
    pub channels: u16,
    pub buffer_ms: u64,
    pub buffers: Vec<String>, // Base64-encoded media buffers, in playback order
}
