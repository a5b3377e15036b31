use serde::{Deserialize, Serialize};

/// Turn-taking state of one call
///
/// `Listening` and `Processing` together form the active phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    /// No audio received yet
    Idle,
    /// Recognition running, waiting for a final utterance
    Listening,
    /// One turn in flight; recognized speech is ignored
    Processing,
    /// Recognition ended or shutdown requested, tearing down
    Draining,
    /// Terminal
    Stopped,
}

/// Input driving a state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnInput {
    /// First audio frame arrived
    AudioArrived,
    /// An utterance or greeting was handed to the turn pipeline
    TurnDispatched,
    /// The in-flight turn finished, whatever its outcome
    TurnFinished,
    /// Canceled or SessionStopped observed
    RecognitionEnded,
    /// Caller asked for shutdown
    ShutdownRequested,
    /// Recognition, audio input and synthesizer released
    TeardownComplete,
}

impl TurnState {
    /// Transition table; `None` means the input is not valid in this state
    pub fn next(self, input: TurnInput) -> Option<TurnState> {
        use TurnInput::*;
        use TurnState::*;

        match (self, input) {
            (Idle, AudioArrived) => Some(Listening),
            (Idle, ShutdownRequested) => Some(Draining),
            (Listening, TurnDispatched) => Some(Processing),
            (Processing, TurnFinished) => Some(Listening),
            (Listening | Processing, RecognitionEnded | ShutdownRequested) => Some(Draining),
            (Draining, TeardownComplete) => Some(Stopped),
            _ => None,
        }
    }

    /// True once audio is flowing and until teardown begins
    pub fn is_active(self) -> bool {
        matches!(self, TurnState::Listening | TurnState::Processing)
    }

    /// True while a turn is in flight (barge-in suppression applies)
    pub fn is_processing(self) -> bool {
        self == TurnState::Processing
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TurnState::Idle => "idle",
            TurnState::Listening => "listening",
            TurnState::Processing => "processing",
            TurnState::Draining => "draining",
            TurnState::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_turn_cycle() {
        let state = TurnState::Idle;
        let state = state.next(TurnInput::AudioArrived).unwrap();
        assert_eq!(state, TurnState::Listening);

        let state = state.next(TurnInput::TurnDispatched).unwrap();
        assert_eq!(state, TurnState::Processing);

        let state = state.next(TurnInput::TurnFinished).unwrap();
        assert_eq!(state, TurnState::Listening);

        let state = state.next(TurnInput::RecognitionEnded).unwrap();
        assert_eq!(state, TurnState::Draining);

        let state = state.next(TurnInput::TeardownComplete).unwrap();
        assert_eq!(state, TurnState::Stopped);
    }

    #[test]
    fn test_active_only_between_audio_and_teardown() {
        assert!(!TurnState::Idle.is_active());
        assert!(TurnState::Listening.is_active());
        assert!(TurnState::Processing.is_active());
        assert!(!TurnState::Draining.is_active());
        assert!(!TurnState::Stopped.is_active());
    }

    #[test]
    fn test_no_second_dispatch_while_processing() {
        assert_eq!(TurnState::Processing.next(TurnInput::TurnDispatched), None);
    }

    #[test]
    fn test_audio_does_not_restart_active_session() {
        assert_eq!(TurnState::Listening.next(TurnInput::AudioArrived), None);
        assert_eq!(TurnState::Processing.next(TurnInput::AudioArrived), None);
    }

    #[test]
    fn test_recognition_end_drains_mid_turn() {
        assert_eq!(
            TurnState::Processing.next(TurnInput::RecognitionEnded),
            Some(TurnState::Draining)
        );
    }

    #[test]
    fn test_stopped_is_terminal() {
        for input in [
            TurnInput::AudioArrived,
            TurnInput::TurnDispatched,
            TurnInput::TurnFinished,
            TurnInput::RecognitionEnded,
            TurnInput::ShutdownRequested,
            TurnInput::TeardownComplete,
        ] {
            assert_eq!(TurnState::Stopped.next(input), None);
        }
    }

    #[test]
    fn test_late_turn_completion_does_not_resurrect() {
        assert_eq!(TurnState::Draining.next(TurnInput::TurnFinished), None);
        assert_eq!(TurnState::Stopped.next(TurnInput::TurnFinished), None);
    }
}
