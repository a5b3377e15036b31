//! Turn-taking
//!
//! Decides when the agent is listening and when it is speaking, serializes
//! final utterances against the in-flight dialogue turn, and tears the call
//! down when recognition ends.

mod controller;
mod state;

pub use controller::{normalize_utterance, SessionEnd, TurnController, TurnCounters, TurnOutcome};
pub use state::{TurnInput, TurnState};
