//! Error types for the turn-taking pipeline

use thiserror::Error;

/// Result type alias for turn pipeline operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors that can occur while taking turns on a call
///
/// Every variant raised inside a turn is caught by the turn controller and
/// downgraded to "turn completed with no output".
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Audio ingress write failed: {0}")]
    IngressWriteFailure(String),

    #[error("Recognition canceled: {reason}")]
    RecognitionCanceled {
        reason: String,
        error_code: Option<String>,
        error_details: Option<String>,
    },

    #[error("Recognizer error: {0}")]
    Recognizer(String),

    #[error("Dialogue backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Dialogue session expired: {0}")]
    SessionExpired(String),

    #[error("Malformed dialogue response: {0}")]
    MalformedResponse(String),

    #[error("Speech synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("{0} already released")]
    Closed(&'static str),
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        AgentError::BackendUnavailable(err.to_string())
    }
}

impl From<hound::Error> for AgentError {
    fn from(err: hound::Error) -> Self {
        AgentError::SynthesisFailed(format!("WAV decode failed: {}", err))
    }
}
