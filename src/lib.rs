pub mod audio;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod http;
pub mod nats;
pub mod recognition;
pub mod service;
pub mod session;
pub mod speech;
pub mod turn;

pub use audio::{AudioFormat, AudioIngress, AudioInputStream, OutboundAudioBatch};
pub use config::Config;
pub use dialogue::{DialogueClient, DialogueTransport, HttpDialogueTransport};
pub use error::{AgentError, AgentResult};
pub use http::{create_router, AppState};
pub use nats::{NatsClient, NatsRecognizer, NatsSynthesizer};
pub use recognition::{RecognitionEvent, RecognitionSession, SpeechRecognizer};
pub use service::{BridgeSessionFactory, SessionFactory};
pub use session::{CallSession, SessionComponents, SessionConfig, SessionStats, TranscriptEntry};
pub use speech::{SpeechOutput, SpeechSynthesizer};
pub use turn::{TurnController, TurnState};
