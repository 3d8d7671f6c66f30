//! # poino-tts
//!
//! A Rust library for Japanese text-to-speech with pitch accent.
//!
//! ## Features
//!
//! - **Pitch-accent prosody**: full-context labels become moras with high/low accents
//! - **Dictionaries**: literal text overrides with system and user tables
//! - **Parametric vocoder**: voices described by spectral envelopes, no neural vocoder
//! - **ONNX prosody models**: duration and pitch prediction with the `onnx` feature
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! poino-tts = { version = "2026.10", features = ["onnx"] }
//! ```
//!
//! ```ignore
//! use std::path::PathBuf;
//! use poino_tts::{engines::poino::PoinoEngine, SynthesisEngine};
//!
//! let mut engine = PoinoEngine::new()?;
//! engine.load_model(&PathBuf::from("models/poino"))?;
//!
//! let result = engine.synthesize("こんにちは", None)?;
//! result.write_wav(&PathBuf::from("output.wav"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod engines;

use std::path::Path;

use engines::poino::wav::{encode_wav, f32_to_pcm16};

/// The result of a synthesis (text-to-speech) operation.
///
/// Contains raw f32 audio samples and the sample rate of the output audio.
#[derive(Debug)]
pub struct SynthesisResult {
    /// Raw mono audio samples as f32 values
    pub samples: Vec<f32>,
    /// Sample rate of the audio (the voice's `fs`)
    pub sample_rate: u32,
}

impl SynthesisResult {
    /// Write the audio to a 32-bit float WAV file.
    pub fn write_wav(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        std::fs::write(path, self.to_wav_bytes()?)?;
        Ok(())
    }

    /// The audio as an in-memory 32-bit float WAV file.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        Ok(encode_wav(&self.samples, self.sample_rate, 1)?)
    }

    /// The audio as an in-memory 16-bit PCM WAV file.
    pub fn to_pcm16_wav_bytes(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        Ok(encode_wav(&f32_to_pcm16(&self.samples), self.sample_rate, 1)?)
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Common interface for text-to-speech synthesis engines.
///
/// This trait defines the standard operations that all synthesis engines must support.
/// Each engine may have different parameter types for model loading and inference configuration.
pub trait SynthesisEngine {
    /// Parameters for configuring inference behavior (voice, speed, etc.)
    type SynthesisParams;
    /// Parameters for configuring model loading (threads, etc.)
    type ModelParams: Default;

    /// Load a model from the specified path using default parameters.
    fn load_model(&mut self, model_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        self.load_model_with_params(model_path, Self::ModelParams::default())
    }

    /// Load a model from the specified path with custom parameters.
    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: Self::ModelParams,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Unload the currently loaded model and free associated resources.
    fn unload_model(&mut self);

    /// Synthesize speech from the given text.
    fn synthesize(
        &mut self,
        text: &str,
        params: Option<Self::SynthesisParams>,
    ) -> Result<SynthesisResult, Box<dyn std::error::Error>>;

    /// Synthesize speech from the given text and write to a WAV file.
    ///
    /// Default implementation calls `synthesize()` then `SynthesisResult::write_wav()`.
    fn synthesize_to_file(
        &mut self,
        text: &str,
        wav_path: &Path,
        params: Option<Self::SynthesisParams>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.synthesize(text, params)?.write_wav(wav_path)
    }
}
