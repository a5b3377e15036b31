use serde::{Deserialize, Serialize};

/// Why a final result was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultReason {
    /// Speech was recognized
    RecognizedSpeech,
    /// Audio was heard but nothing could be recognized
    NoMatch,
}

/// Why recognition was canceled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationReason {
    /// Audio input ended
    EndOfStream,
    /// The recognizer failed (bad credentials, network, quota...)
    Error,
    /// Canceled on request
    CancelledByUser,
}

impl std::fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CancellationReason::EndOfStream => "EndOfStream",
            CancellationReason::Error => "Error",
            CancellationReason::CancelledByUser => "CancelledByUser",
        };
        f.write_str(s)
    }
}

/// Event surfaced by a continuous recognition run
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    /// In-progress hypothesis
    Partial { text: String },
    /// Completed result
    Final { text: String, reason: ResultReason },
    /// Recognition ended abnormally or on request
    Canceled {
        reason: CancellationReason,
        error_code: Option<String>,
        error_details: Option<String>,
    },
    SessionStarted,
    SessionStopped,
}

impl RecognitionEvent {
    /// Canceled and SessionStopped end the recognition run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RecognitionEvent::Canceled { .. } | RecognitionEvent::SessionStopped
        )
    }

    pub fn final_speech(text: impl Into<String>) -> Self {
        RecognitionEvent::Final {
            text: text.into(),
            reason: ResultReason::RecognizedSpeech,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RecognitionEvent::Partial { .. } => "partial",
            RecognitionEvent::Final { .. } => "final",
            RecognitionEvent::Canceled { .. } => "canceled",
            RecognitionEvent::SessionStarted => "session_started",
            RecognitionEvent::SessionStopped => "session_stopped",
        }
    }
}
