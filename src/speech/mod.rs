mod output;
mod synthesizer;

pub use output::{SpeechOutput, SpokenAudio};
pub use synthesizer::SpeechSynthesizer;
