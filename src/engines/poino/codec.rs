//! Conversion between mora-level and phoneme-level sequences.

use serde::{Deserialize, Serialize};

use super::model::PoinoError;
use super::tables::{Accent, Kana, Phoneme};

/// Longest accepted phoneme length in seconds.
pub const MAX_PHONEME_SECS: f64 = 10.0;

/// One mora with its pitch accent and, once predicted, the length in
/// seconds of each phoneme it decomposes into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoraUnit {
    pub kana: Kana,
    pub accent: Accent,
    #[serde(default)]
    pub durations: Vec<f64>,
}

impl MoraUnit {
    pub fn new(kana: Kana, accent: Accent) -> Self {
        Self {
            kana,
            accent,
            durations: Vec::new(),
        }
    }

    /// Total length of the mora in seconds.
    pub fn total_duration(&self) -> f64 {
        self.durations.iter().sum()
    }
}

/// One phoneme with its pitch accent and optional length in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhoneticUnit {
    pub phoneme: Phoneme,
    pub accent: Accent,
    pub length: Option<f64>,
}

impl PhoneticUnit {
    pub fn new(phoneme: Phoneme, accent: Accent) -> Self {
        Self {
            phoneme,
            accent,
            length: None,
        }
    }
}

/// Decompose moras into phonemes. Every phoneme inherits its mora's accent;
/// lengths are left unset.
pub fn moras_to_phonemes(moras: &[MoraUnit]) -> Vec<PhoneticUnit> {
    moras
        .iter()
        .flat_map(|mora| {
            mora.kana
                .phonemes()
                .into_iter()
                .map(move |p| PhoneticUnit::new(p, mora.accent))
        })
        .collect()
}

/// Decompose moras into phonemes carrying their stored durations.
///
/// Fails when a mora's duration count differs from its phoneme count, or
/// when a duration is not a finite length within `0..=MAX_PHONEME_SECS`.
pub fn moras_to_timed_phonemes(moras: &[MoraUnit]) -> Result<Vec<PhoneticUnit>, PoinoError> {
    let mut units = Vec::new();
    for (index, mora) in moras.iter().enumerate() {
        let phonemes = mora.kana.phonemes();
        check_durations(index, mora, phonemes.len())?;
        units.extend(
            phonemes
                .into_iter()
                .zip(&mora.durations)
                .map(|(phoneme, &length)| PhoneticUnit {
                    phoneme,
                    accent: mora.accent,
                    length: Some(length),
                }),
        );
    }
    Ok(units)
}

pub(crate) fn check_durations(
    index: usize,
    mora: &MoraUnit,
    expected: usize,
) -> Result<(), PoinoError> {
    if mora.durations.len() != expected {
        return Err(PoinoError::InconsistentDuration {
            index,
            expected,
            actual: mora.durations.len(),
        });
    }
    if let Some(length) = mora
        .durations
        .iter()
        .find(|l| !(0.0..=MAX_PHONEME_SECS).contains(*l))
    {
        return Err(PoinoError::Validation(format!(
            "mora {index} ({}) has duration {length}; expected 0..={MAX_PHONEME_SECS} seconds",
            mora.kana
        )));
    }
    Ok(())
}

/// Clamp a predicted length into the accepted range. NaN becomes 0.
pub(crate) fn clamp_length(length: f64) -> f64 {
    if length.is_nan() {
        0.0
    } else {
        length.clamp(0.0, MAX_PHONEME_SECS)
    }
}

/// Rebuild moras from phonemes.
///
/// Phoneme symbols accumulate until they spell a known romanized mora, which
/// is then emitted with the accent of its first phoneme. Durations are kept
/// only when every phoneme of the mora has a length. Silence never starts a
/// mora and is skipped.
pub fn phonemes_to_moras(units: &[PhoneticUnit]) -> Vec<MoraUnit> {
    let mut spelled = String::new();
    let mut accent = None;
    let mut lengths: Vec<Option<f64>> = Vec::new();
    let mut moras = Vec::new();

    for unit in units {
        if unit.phoneme == Phoneme::Sil && spelled.is_empty() {
            continue;
        }

        spelled.push_str(unit.phoneme.as_str());
        accent.get_or_insert(unit.accent);
        lengths.push(unit.length);

        if let Some(kana) = Kana::from_romaji(&spelled) {
            let durations = lengths.iter().copied().collect::<Option<Vec<f64>>>();
            moras.push(MoraUnit {
                kana,
                accent: accent.take().unwrap_or_default(),
                durations: durations.unwrap_or_default(),
            });
            spelled.clear();
            lengths.clear();
        }
    }

    if !spelled.is_empty() {
        log::debug!("Dropping incomplete mora spelling {spelled:?}");
    }

    moras
}
