pub mod client;
pub mod messages;
mod speech;

pub use client::NatsClient;
pub use messages::{
    AudioFrameMessage, OutboundAudioMessage, SttSessionMessage, SynthesisRequest,
    SynthesisResponse, TranscriptMessage,
};
pub use speech::{NatsRecognizer, NatsSynthesizer};
