use super::stream::AudioInputStream;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

/// Accepts raw PCM frames from the call transport and feeds the recognizer
///
/// Nothing is buffered beyond the single write. Failures are logged and the
/// frame is dropped; they never reach the transport.
#[derive(Debug)]
pub struct AudioIngress {
    input: Arc<AudioInputStream>,
    frames_written: AtomicU64,
    bytes_written: AtomicU64,
    frames_dropped: AtomicU64,
}

impl AudioIngress {
    pub fn new(input: Arc<AudioInputStream>) -> Self {
        Self {
            input,
            frames_written: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
        }
    }

    /// Push one frame of raw PCM. Returns whether the frame was written.
    pub fn push_frame(&self, frame: &[u8]) -> bool {
        if frame.is_empty() {
            return false;
        }

        if frame.len() % 2 != 0 {
            debug!("Odd-length PCM frame ({} bytes) for 16-bit input", frame.len());
        }

        match self.input.write(frame.to_vec()) {
            Ok(()) => {
                self.frames_written.fetch_add(1, Ordering::Relaxed);
                self.bytes_written.fetch_add(frame.len() as u64, Ordering::Relaxed);
                true
            }
            Err(e) => {
                self.frames_dropped.fetch_add(1, Ordering::Relaxed);
                error!("Failed to write to input stream, frame dropped: {}", e);
                false
            }
        }
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written.load(Ordering::Relaxed)
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }
}
