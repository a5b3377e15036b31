use crate::error::{AgentError, AgentResult};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// PCM layout of an audio stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Bits per sample (signed little-endian integer PCM)
    pub bits_per_sample: u16,
    /// Number of channels
    pub channels: u16,
}

impl AudioFormat {
    /// 16kHz / 16-bit / mono, the format calls deliver and recognizers expect
    pub const PCM_16K_MONO: AudioFormat = AudioFormat {
        sample_rate: 16000,
        bits_per_sample: 16,
        channels: 1,
    };

    /// Bytes per second of audio in this format
    pub fn bytes_per_second(&self) -> usize {
        self.sample_rate as usize * self.channels as usize * (self.bits_per_sample as usize / 8)
    }

    /// Bytes needed to hold `duration_ms` of audio
    pub fn bytes_for_ms(&self, duration_ms: u64) -> usize {
        self.bytes_per_second() * duration_ms as usize / 1000
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::PCM_16K_MONO
    }
}

/// Writer side of a push audio stream feeding a recognizer
///
/// Writes are appended in the order they are made. Closing is idempotent;
/// any write after close fails with `IngressWriteFailure`.
#[derive(Debug)]
pub struct AudioInputStream {
    format: AudioFormat,
    tx: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
}

/// Reader side of a push audio stream, handed to the recognizer
#[derive(Debug)]
pub struct AudioInputReader {
    format: AudioFormat,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl AudioInputStream {
    /// Create a push stream and its reader
    pub fn create_push_stream(format: AudioFormat) -> (Self, AudioInputReader) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                format,
                tx: Mutex::new(Some(tx)),
            },
            AudioInputReader { format, rx },
        )
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Append a buffer to the stream
    pub fn write(&self, buffer: Vec<u8>) -> AgentResult<()> {
        let guard = self
            .tx
            .lock()
            .map_err(|_| AgentError::IngressWriteFailure("input stream lock poisoned".to_string()))?;

        match guard.as_ref() {
            Some(tx) => tx
                .send(buffer)
                .map_err(|_| AgentError::IngressWriteFailure("recognizer stopped reading".to_string())),
            None => Err(AgentError::IngressWriteFailure("input stream closed".to_string())),
        }
    }

    /// Close the stream; the reader sees end of stream once drained
    pub fn close(&self) {
        if let Ok(mut guard) = self.tx.lock() {
            guard.take();
        }
    }

    pub fn is_closed(&self) -> bool {
        match self.tx.lock() {
            Ok(guard) => guard.as_ref().map_or(true, |tx| tx.is_closed()),
            Err(_) => true,
        }
    }
}

impl AudioInputReader {
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Next buffer written to the stream, or `None` once closed and drained
    pub async fn read(&mut self) -> Option<Vec<u8>> {
        self.rx.recv().await
    }
}
