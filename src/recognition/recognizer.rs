use super::events::RecognitionEvent;
use crate::audio::AudioInputReader;
use crate::error::AgentResult;
use tokio::sync::mpsc;

/// Continuous speech recognition engine
///
/// Implementations:
/// - NATS: bridges to a speech service over NATS subjects
/// - Tests: scripted recognizers that replay events
#[async_trait::async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Start continuous recognition on the given audio input
    ///
    /// Returns a channel receiver that delivers every recognition event in order
    async fn start_continuous(
        &mut self,
        input: AudioInputReader,
    ) -> AgentResult<mpsc::Receiver<RecognitionEvent>>;

    /// Stop continuous recognition
    async fn stop_continuous(&mut self) -> AgentResult<()>;

    /// Get recognizer name for logging
    fn name(&self) -> &str;
}
