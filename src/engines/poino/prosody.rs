//! Model feature windows and the timing/pitch plan handed to the vocoder.

use ndarray::Array2;

use super::codec::{check_durations, MoraUnit, PhoneticUnit};
use super::dsp::{interp_zeros, resample};
use super::model::PoinoError;
use super::tables::{EnvKey, Kana};
use super::voices::SpeakerVoice;

/// Value of window cells that fall outside the sequence.
const PAD_VALUE: f32 = -1.0;

/// Center every value in a window of `win_len` cells, one row per value.
///
/// The sequence is padded with `ceil((W-1)/2)` cells before and
/// `floor((W-1)/2)` after.
pub fn sliding_windows(values: &[f32], win_len: usize) -> Result<Array2<f32>, PoinoError> {
    if win_len == 0 {
        return Err(PoinoError::Validation(
            "sliding window length must be positive".to_string(),
        ));
    }

    let before = win_len / 2;
    let after = (win_len - 1) / 2;

    let mut padded = vec![PAD_VALUE; before];
    padded.extend_from_slice(values);
    padded.extend(std::iter::repeat(PAD_VALUE).take(after));

    let mut flat = Vec::with_capacity(values.len() * win_len);
    for row in padded.windows(win_len).take(values.len()) {
        flat.extend_from_slice(row);
    }

    Ok(Array2::from_shape_vec((values.len(), win_len), flat)?)
}

/// Windows of normalized phoneme ids.
pub fn phoneme_windows(units: &[PhoneticUnit], win_len: usize) -> Result<Array2<f32>, PoinoError> {
    let values: Vec<f32> = units.iter().map(|u| u.phoneme.feature()).collect();
    sliding_windows(&values, win_len)
}

/// Windows of accent flags (1 = high).
pub fn accent_windows(units: &[PhoneticUnit], win_len: usize) -> Result<Array2<f32>, PoinoError> {
    let values: Vec<f32> = units.iter().map(|u| u.accent.flag()).collect();
    sliding_windows(&values, win_len)
}

/// Factors turning normalized pitch predictions into Hz for one voice.
#[derive(Debug, Clone, Copy)]
pub struct PitchScale {
    /// Training normalization constant.
    pub norm_max: f64,
    /// User pitch multiplier.
    pub pitch: f64,
    /// Voice base frequency over the model's training base frequency.
    pub base_ratio: f64,
}

impl PitchScale {
    pub fn factor(&self) -> f64 {
        self.norm_max * self.pitch * self.base_ratio
    }
}

/// De-zero each predicted pitch row and scale it to Hz.
pub fn denormalize_pitch(curves: &Array2<f32>, scale: PitchScale) -> Vec<Vec<f64>> {
    let factor = scale.factor();
    curves
        .rows()
        .into_iter()
        .map(|row| {
            let raw: Vec<f64> = row.iter().map(|&v| v as f64).collect();
            interp_zeros(&raw).into_iter().map(|v| v * factor).collect()
        })
        .collect()
}

/// One articulatory segment scheduled for synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvSpan {
    pub env_key: EnvKey,
    /// Seconds, already divided by the speed factor.
    pub length: f64,
    /// Pitch in Hz, one value per output sample of the segment.
    pub f0: Vec<f64>,
}

/// The segments of one mora, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct MoraPlan {
    pub kana: Kana,
    pub spans: Vec<EnvSpan>,
}

impl MoraPlan {
    pub fn duration(&self) -> f64 {
        self.spans.iter().map(|s| s.length).sum()
    }
}

/// Split every mora's duration across the voice's articulatory classes and
/// cut the matching pitch samples for each class.
///
/// `pitch_curves` holds one curve in Hz per phoneme of `moras`.
pub fn plan_moras(
    moras: &[MoraUnit],
    pitch_curves: &[Vec<f64>],
    voice: &SpeakerVoice,
    speed: f64,
) -> Result<Vec<MoraPlan>, PoinoError> {
    let phoneme_count: usize = moras.iter().map(|m| m.kana.phonemes().len()).sum();
    if pitch_curves.len() != phoneme_count {
        return Err(PoinoError::Validation(format!(
            "got {} pitch curves for {} phonemes",
            pitch_curves.len(),
            phoneme_count
        )));
    }

    let fs = voice.fs as f64;
    let mut curve_index = 0;
    let mut plans = Vec::with_capacity(moras.len());

    for (index, mora) in moras.iter().enumerate() {
        let count = mora.kana.phonemes().len();
        check_durations(index, mora, count)?;

        let curves = &pitch_curves[curve_index..curve_index + count];
        curve_index += count;

        let Some(allocations) = voice.kanas.get(&mora.kana) else {
            log::warn!("Voice '{}' has no allocation for {}, skipping", voice.id, mora.kana);
            continue;
        };

        let f0: Vec<f64> = curves
            .iter()
            .zip(&mora.durations)
            .flat_map(|(curve, &length)| {
                let num = (fs * (length / speed)).ceil().max(0.0) as usize;
                resample(curve, num)
            })
            .collect();

        let mut remaining = mora.total_duration() / speed;
        let mut cursor = 0usize;

        let spans = allocations
            .iter()
            .map(|allocation| {
                let mut length = allocation.len.map(|l| l / speed).unwrap_or(remaining);
                if length > remaining {
                    length = remaining;
                }
                remaining -= length;
                let length = length.max(0.0);

                let num = (fs * length).ceil() as usize;
                let begin = cursor.min(f0.len());
                let end = (cursor + num).min(f0.len());
                cursor += num;

                EnvSpan {
                    env_key: allocation.env_key,
                    length,
                    f0: f0[begin..end].to_vec(),
                }
            })
            .collect();

        plans.push(MoraPlan {
            kana: mora.kana,
            spans,
        });
    }

    Ok(plans)
}
