pub mod ingress;
pub mod media;
pub mod stream;

pub use ingress::AudioIngress;
pub use media::{decode_synthesized, AudioMediaBuffer, OutboundAudioBatch, MEDIA_BUFFER_MS};
pub use stream::{AudioFormat, AudioInputReader, AudioInputStream};
