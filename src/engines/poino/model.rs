use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum PoinoError {
    #[error("Not initialized: {0}")]
    NotInitialized(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Malformed label: {0}")]
    MalformedLabel(String),
    #[error(
        "Mora {index} carries {actual} durations but decomposes into {expected} phonemes"
    )]
    InconsistentDuration {
        index: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Unsupported environment: {0}")]
    UnsupportedEnvironment(String),
    #[error("Unknown kana {0:?}")]
    UnknownKana(String),
    #[error("Voice '{0}' not found. Call speakers() to see available voices.")]
    VoiceNotFound(String),
    #[error(
        "openjlabel not found. Install it on PATH or point \
         OpenJLabelConfig::bin_path at the binary"
    )]
    AnalyzerNotFound,
    #[error("Text analysis failed: {0}")]
    AnalyzerFailed(String),
    #[error("Prosody prediction failed: {0}")]
    Predictor(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[cfg(feature = "onnx")]
    #[error("ONNX runtime error: {0}")]
    Ort(#[from] ort::Error),
}

impl From<derive_builder::UninitializedFieldError> for PoinoError {
    fn from(e: derive_builder::UninitializedFieldError) -> Self {
        PoinoError::Validation(e.to_string())
    }
}

/// Settings the prosody models were trained with.
///
/// Must be known before any analysis or synthesis call; they usually ship
/// as `options.json` next to the model files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MlModelOptions {
    /// Width of the sliding feature window (phonemes per model input row).
    pub sliding_win_len: usize,
    /// Fundamental frequency the pitch model was trained around, in Hz.
    pub f0_model_base_freq: f64,
    /// Scale turning normalized pitch predictions back into Hz.
    pub f0_norm_max: f64,
}

impl MlModelOptions {
    pub fn validate(&self) -> Result<(), PoinoError> {
        if self.sliding_win_len == 0 {
            return Err(PoinoError::Validation(
                "slidingWinLen must be a positive integer".to_string(),
            ));
        }
        if !(100.0..=1000.0).contains(&self.f0_model_base_freq) {
            return Err(PoinoError::Validation(format!(
                "f0ModelBaseFreq must be within 100..=1000, got {}",
                self.f0_model_base_freq
            )));
        }
        if !(self.f0_norm_max > 0.0) {
            return Err(PoinoError::Validation(format!(
                "f0NormMax must be positive, got {}",
                self.f0_norm_max
            )));
        }
        Ok(())
    }

    /// Read and validate `options.json`.
    pub fn load(path: &Path) -> Result<Self, PoinoError> {
        let content = std::fs::read_to_string(path)?;
        let options: MlModelOptions = serde_json::from_str(&content)?;
        options.validate()?;
        Ok(options)
    }
}

/// Duration and pitch predictor.
///
/// Both inputs are sliding-window feature matrices with one row per phoneme
/// (see `prosody::phoneme_windows`).
pub trait ProsodyPredictor: Send + Sync {
    /// Predicted length in seconds of every phoneme.
    fn predict_duration(&self, phonemes: &Array2<f32>) -> Result<Vec<f32>, PoinoError>;

    /// Normalized pitch curve of every phoneme, one row each, values in
    /// `[0, 1]` where exact zero means unvoiced.
    fn predict_pitch(
        &self,
        phonemes: &Array2<f32>,
        accents: &Array2<f32>,
    ) -> Result<Array2<f32>, PoinoError>;
}
