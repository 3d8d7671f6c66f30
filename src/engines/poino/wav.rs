//! Minimal RIFF/WAVE writer.

use super::model::PoinoError;

const HEADER_LEN: usize = 44;
const FORMAT_PCM: u16 = 1;
const FORMAT_IEEE_FLOAT: u16 = 3;

/// A sample type that can be stored verbatim in a WAVE data chunk.
pub trait PcmSample: Copy {
    /// WAVE format tag: 1 for integer PCM, 3 for IEEE float.
    const FORMAT: u16;
    const BYTES: usize;

    fn write_le(self, out: &mut Vec<u8>);
}

impl PcmSample for u8 {
    const FORMAT: u16 = FORMAT_PCM;
    const BYTES: usize = 1;

    fn write_le(self, out: &mut Vec<u8>) {
        out.push(self);
    }
}

impl PcmSample for i16 {
    const FORMAT: u16 = FORMAT_PCM;
    const BYTES: usize = 2;

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl PcmSample for f32 {
    const FORMAT: u16 = FORMAT_IEEE_FLOAT;
    const BYTES: usize = 4;

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

/// Encode interleaved samples as a 44-byte-header WAVE file.
pub fn encode_wav<S: PcmSample>(
    samples: &[S],
    sample_rate: u32,
    channels: u16,
) -> Result<Vec<u8>, PoinoError> {
    if sample_rate == 0 {
        return Err(PoinoError::Validation("sample_rate must be > 0".into()));
    }
    if channels == 0 {
        return Err(PoinoError::Validation("channels must be > 0".into()));
    }

    let block_align = (S::BYTES as u16)
        .checked_mul(channels)
        .ok_or_else(|| PoinoError::Validation("block align overflows u16".into()))?;
    let bits_per_sample = 8 * S::BYTES as u16;
    let byte_rate = sample_rate
        .checked_mul(block_align as u32)
        .ok_or_else(|| PoinoError::Validation("byte rate overflows u32".into()))?;
    let data_size = u32::try_from(samples.len() * S::BYTES)
        .ok()
        .filter(|size| size.checked_add(36).is_some())
        .ok_or_else(|| PoinoError::Validation("audio too long for a WAVE file".into()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + data_size as usize);

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_size).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&S::FORMAT.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&bits_per_sample.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());
    for &s in samples {
        s.write_le(&mut out);
    }

    Ok(out)
}

/// Clamp to [-1, 1] and map to 16-bit: -1.0 -> -32768, +1.0 -> 32767.
pub fn f32_to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&x| {
            let x = x.clamp(-1.0, 1.0);
            if x >= 0.0 {
                (x * 32767.0).round() as i16
            } else {
                (x * 32768.0).round() as i16
            }
        })
        .collect()
}
