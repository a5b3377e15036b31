use crate::audio::AudioFormat;

/// Configuration for one call session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Unique call identifier (e.g., "call-4f1c...")
    pub call_id: String,

    /// Format of inbound and outbound PCM (16kHz / 16-bit / mono)
    pub audio_format: AudioFormat,

    /// Spoken once when recognition reports its session started
    pub greeting: Option<String>,

    /// Remove trailing periods from final transcripts before dispatch
    pub strip_trailing_period: bool,
}

impl SessionConfig {
    pub fn new(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            ..Default::default()
        }
    }

    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = Some(greeting.into());
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            call_id: format!("call-{}", uuid::Uuid::new_v4()),
            audio_format: AudioFormat::PCM_16K_MONO,
            greeting: None,
            strip_trailing_period: true,
        }
    }
}
