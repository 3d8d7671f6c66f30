use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::model::PoinoError;
use super::tables::{EnvKey, Kana};

const LAYCHIE_JSON: &str = include_str!("data/laychie.json");

/// Id of the bundled default voice.
pub const DEFAULT_VOICE: &str = "laychie";

/// One articulatory segment of a mora: its class and how long it lasts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvAllocation {
    pub env_key: EnvKey,
    /// Seconds at speed 1, or `None` to take whatever the mora has left.
    pub len: Option<f64>,
}

/// Immutable description of one speaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerVoice {
    pub id: String,
    pub name: String,
    /// Sample rate in Hz.
    pub fs: u32,
    /// Synthesis segment length in samples.
    pub seg_len: usize,
    pub hop_len: usize,
    /// Reference fundamental frequency in Hz.
    pub base_freq: u32,
    /// Control points `(frequency Hz, magnitude 0..=1)` per class.
    pub envelopes: HashMap<EnvKey, Vec<(f64, f64)>>,
    /// How each mora's duration splits across classes.
    pub kanas: HashMap<Kana, Vec<EnvAllocation>>,
}

impl SpeakerVoice {
    /// Parse and validate a voice from JSON.
    pub fn from_json(json: &str) -> Result<Self, PoinoError> {
        let voice: SpeakerVoice = serde_json::from_str(json)?;
        voice.validate()?;
        Ok(voice)
    }

    /// The bundled 24 kHz voice.
    pub fn laychie() -> Result<Self, PoinoError> {
        Self::from_json(LAYCHIE_JSON)
    }

    pub fn validate(&self) -> Result<(), PoinoError> {
        let invalid = |msg: String| Err(PoinoError::Validation(format!("voice {:?}: {msg}", self.id)));

        if !(12000..=48000).contains(&self.fs) {
            return invalid(format!("fs must be within 12000..=48000, got {}", self.fs));
        }
        if self.seg_len < 120 || self.seg_len % 2 != 0 {
            return invalid(format!(
                "segLen must be an even number >= 120, got {}",
                self.seg_len
            ));
        }
        if self.hop_len < 30 {
            return invalid(format!("hopLen must be >= 30, got {}", self.hop_len));
        }
        if !(100..=1000).contains(&self.base_freq) {
            return invalid(format!(
                "baseFreq must be within 100..=1000, got {}",
                self.base_freq
            ));
        }

        for (key, points) in &self.envelopes {
            for &(x, y) in points {
                if !(0.0..=48000.0).contains(&x) || !(0.0..=1.0).contains(&y) {
                    return invalid(format!("envelope {key:?} has point ({x}, {y}) out of range"));
                }
            }
        }

        for (kana, allocations) in &self.kanas {
            if allocations.iter().any(|a| a.len.is_some_and(|l| !(l >= 0.0))) {
                return invalid(format!("kana {kana} has a negative allocation"));
            }
        }

        Ok(())
    }
}

/// All voices known to an engine, keyed by id.
pub struct VoiceStore {
    voices: HashMap<String, SpeakerVoice>,
}

impl VoiceStore {
    /// A store holding the bundled voices.
    pub fn builtin() -> Result<Self, PoinoError> {
        let mut store = Self {
            voices: HashMap::new(),
        };
        store.insert(SpeakerVoice::laychie()?)?;
        Ok(store)
    }

    /// Load a voice JSON file and add it to the store.
    pub fn load(&mut self, path: &Path) -> Result<&SpeakerVoice, PoinoError> {
        let content = std::fs::read_to_string(path)?;
        let voice = SpeakerVoice::from_json(&content)?;
        let id = voice.id.clone();
        self.insert(voice)?;
        log::info!("Loaded voice '{}' from {}", id, path.display());
        self.get(&id)
    }

    /// Add or replace a voice after validating it.
    pub fn insert(&mut self, voice: SpeakerVoice) -> Result<(), PoinoError> {
        voice.validate()?;
        self.voices.insert(voice.id.clone(), voice);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&SpeakerVoice, PoinoError> {
        self.voices
            .get(id)
            .ok_or_else(|| PoinoError::VoiceNotFound(id.to_string()))
    }

    /// List all voice ids in sorted order.
    pub fn list_voices(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.voices.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_voice_is_valid() {
        let voice = SpeakerVoice::laychie().unwrap();
        assert_eq!(voice.fs, 24000);
        assert_eq!(voice.seg_len, 960);
        assert_eq!(voice.hop_len, 480);
        assert_eq!(voice.base_freq, 400);
        assert_eq!(voice.envelopes.len(), 21);
        assert_eq!(voice.kanas.len(), Kana::ALL.len());
    }

    #[test]
    fn bundled_voice_allocations_end_open() {
        let voice = SpeakerVoice::laychie().unwrap();
        let ka = &voice.kanas[&Kana::Ka];
        assert_eq!(ka[0].env_key, EnvKey::K);
        assert_eq!(ka[0].len, Some(0.05));
        assert_eq!(ka[1].env_key, EnvKey::A);
        assert_eq!(ka[1].len, None);
        assert_eq!(voice.kanas[&Kana::Pau][0].env_key, EnvKey::Q);
    }

    #[test]
    fn rejects_out_of_range_voices() {
        let base = SpeakerVoice::laychie().unwrap();

        let mut v = base.clone();
        v.fs = 8000;
        assert!(matches!(v.validate(), Err(PoinoError::Validation(_))));

        let mut v = base.clone();
        v.seg_len = 961;
        assert!(v.validate().is_err());

        let mut v = base.clone();
        v.hop_len = 10;
        assert!(v.validate().is_err());

        let mut v = base.clone();
        v.base_freq = 50;
        assert!(v.validate().is_err());

        let mut v = base;
        v.envelopes.insert(EnvKey::A, vec![(100.0, 1.5)]);
        assert!(v.validate().is_err());
    }

    #[test]
    fn rejects_unknown_env_keys() {
        let json = LAYCHIE_JSON.replacen("\"q\":", "\"x\":", 1);
        assert!(matches!(
            SpeakerVoice::from_json(&json),
            Err(PoinoError::Json(_))
        ));
    }

    #[test]
    fn store_lists_and_finds_voices() {
        let mut store = VoiceStore::builtin().unwrap();
        let mut other = SpeakerVoice::laychie().unwrap();
        other.id = "alto".to_string();
        store.insert(other).unwrap();

        assert_eq!(store.list_voices(), vec!["alto", "laychie"]);
        assert!(store.get(DEFAULT_VOICE).is_ok());
        assert!(matches!(
            store.get("missing"),
            Err(PoinoError::VoiceNotFound(_))
        ));
    }
}
