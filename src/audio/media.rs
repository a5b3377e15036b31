use super::stream::AudioFormat;
use crate::error::{AgentError, AgentResult};
use chrono::{DateTime, Duration, Utc};
use hound::WavReader;
use std::io::Cursor;

/// Duration of one outbound media buffer
pub const MEDIA_BUFFER_MS: u64 = 20;

/// One fixed-size buffer of outbound PCM audio
#[derive(Debug, Clone)]
pub struct AudioMediaBuffer {
    /// Raw PCM bytes (always a full 20ms frame)
    pub data: Vec<u8>,
    /// Batch capture time plus this buffer's offset
    pub reference_time: DateTime<Utc>,
}

/// Timestamped buffers produced from one synthesis result
///
/// Ownership passes to the transport once emitted.
#[derive(Debug, Clone)]
pub struct OutboundAudioBatch {
    /// Single capture timestamp for the whole batch
    pub captured_at: DateTime<Utc>,
    pub format: AudioFormat,
    pub buffers: Vec<AudioMediaBuffer>,
}

impl OutboundAudioBatch {
    /// Split PCM into 20ms buffers, zero-padding the last one
    pub fn package(pcm: &[u8], format: AudioFormat, captured_at: DateTime<Utc>) -> Self {
        let frame_len = format.bytes_for_ms(MEDIA_BUFFER_MS).max(1);

        let buffers = pcm
            .chunks(frame_len)
            .enumerate()
            .map(|(index, chunk)| {
                let mut data = chunk.to_vec();
                data.resize(frame_len, 0);
                let offset = Duration::milliseconds((index as u64 * MEDIA_BUFFER_MS) as i64);
                AudioMediaBuffer {
                    data,
                    reference_time: captured_at + offset,
                }
            })
            .collect();

        Self {
            captured_at,
            format,
            buffers,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Playback duration of the batch in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.buffers.len() as u64 * MEDIA_BUFFER_MS
    }
}

/// Extract raw PCM from synthesizer output
///
/// WAV containers are decoded and must match `format`; anything else is
/// taken to be raw PCM already in `format`.
pub fn decode_synthesized(audio: &[u8], format: AudioFormat) -> AgentResult<Vec<u8>> {
    if !audio.starts_with(b"RIFF") {
        return Ok(audio.to_vec());
    }

    let reader = WavReader::new(Cursor::new(audio))?;
    let spec = reader.spec();

    if spec.sample_rate != format.sample_rate
        || spec.channels != format.channels
        || spec.bits_per_sample != format.bits_per_sample
    {
        return Err(AgentError::SynthesisFailed(format!(
            "Synthesized WAV is {}Hz/{}-bit/{}ch, expected {}Hz/{}-bit/{}ch",
            spec.sample_rate,
            spec.bits_per_sample,
            spec.channels,
            format.sample_rate,
            format.bits_per_sample,
            format.channels
        )));
    }

    let samples: Vec<i16> = reader.into_samples::<i16>().collect::<Result<Vec<_>, _>>()?;

    Ok(samples.iter().flat_map(|s| s.to_le_bytes()).collect())
}
