use crate::error::AgentResult;

/// Text-to-speech engine
///
/// Implementations:
/// - NATS: request/reply against a speech service
/// - Tests: canned audio or scripted failures
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize text to audio
    ///
    /// Returns raw PCM in the session's audio format, or a WAV container
    /// holding the same.
    async fn synthesize(&self, text: &str) -> AgentResult<Vec<u8>>;

    /// Release engine resources
    async fn close(&self) -> AgentResult<()>;

    /// Get synthesizer name for logging
    fn name(&self) -> &str;
}
