//! Continuous speech recognition
//!
//! - `SpeechRecognizer`: engine seam (push audio in, ordered events out)
//! - `RecognitionSession`: one recognition run bound to one audio input
//! - `RecognitionEvent`: partial/final results, cancellation and session boundaries

mod events;
mod recognizer;
mod session;

pub use events::{CancellationReason, RecognitionEvent, ResultReason};
pub use recognizer::SpeechRecognizer;
pub use session::RecognitionSession;
