use crate::turn::TurnState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistics about a call session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub call_id: String,

    /// Current turn-taking state
    pub state: TurnState,

    /// Listening or mid-turn
    pub active: bool,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Audio frames written to the recognizer
    pub frames_ingested: u64,

    pub bytes_ingested: u64,

    /// Frames dropped because the input stream rejected them
    pub frames_dropped: u64,

    /// Utterances sent to the dialogue backend
    pub utterances_dispatched: u64,

    /// Turns that ended with audio emitted
    pub replies_spoken: u64,

    /// Turns where the backend had nothing to say
    pub silent_turns: u64,

    /// Turns that ended in an error
    pub turns_failed: u64,

    /// Recognition events ignored while a turn was in flight
    pub events_discarded: u64,

    /// Why the session ended, once it has
    pub end_reason: Option<String>,
}

/// One completed turn of the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// What the caller said (None for the greeting)
    pub utterance: Option<String>,

    /// What the agent said (None when it stayed silent)
    pub reply: Option<String>,

    /// spoke / silent / failed
    pub outcome: String,

    /// When the turn completed
    pub timestamp: DateTime<Utc>,
}
