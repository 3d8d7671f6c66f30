//! Japanese pitch-accent text-to-speech engine.
//!
//! Text is split by a literal dictionary overlay, the remaining spans are
//! analyzed into full-context labels, and the labels become moras with a
//! high/low accent each. A prosody predictor supplies phoneme durations and
//! pitch curves, which are distributed over a voice's articulatory classes
//! and rendered by a pitch-synchronous source-filter vocoder.
//!
//! # System Requirements
//!
//! **openjlabel** and its dictionary are needed for text that no dictionary
//! entry covers. Point [`OpenJLabelConfig`] at a bundled copy, or inject any
//! [`TextAnalyzer`] with [`PoinoEngine::with_analyzer`].
//!
//! # Model Directory Layout
//!
//! ```text
//! models/poino/
//! ├── duration.onnx   # phoneme windows -> seconds per phoneme
//! ├── f0.onnx         # phoneme + accent windows -> normalized pitch curves
//! └── options.json    # {"slidingWinLen", "f0ModelBaseFreq", "f0NormMax"}
//! ```
//!
//! Loading ONNX models needs the `onnx` feature. Without it, install a
//! predictor with [`PoinoEngine::set_predictor`].
//!
//! # Voices
//!
//! | Id | Sample rate | Segment | Base frequency |
//! |---|---|---|---|
//! | `laychie` | 24 kHz | 960 samples | 400 Hz |
//!
//! More voices load from JSON with [`PoinoEngine::load_voice`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use poino_tts::{SynthesisEngine, engines::poino::{PoinoEngine, PoinoInferenceParams, SynthConfigBuilder}};
//! use std::path::PathBuf;
//!
//! let mut engine = PoinoEngine::new()?;
//! engine.load_model(&PathBuf::from("models/poino"))?;
//!
//! let params = PoinoInferenceParams {
//!     config: SynthConfigBuilder::default().speed(0.9).pitch(1.1).build()?,
//!     ..Default::default()
//! };
//!
//! engine.synthesize_to_file("こんにちは", &PathBuf::from("out.wav"), Some(params))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod analyzer;
pub mod codec;
pub mod dict;
pub mod dsp;
pub mod engine;
pub mod label;
pub mod model;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod prosody;
pub mod synth;
pub mod tables;
pub mod voices;
pub mod wav;

pub use analyzer::{OpenJLabelAnalyzer, OpenJLabelConfig, TextAnalyzer};
pub use codec::{MoraUnit, PhoneticUnit};
pub use dict::{DictEntry, DictKind, DictionaryStore, OptiDict};
pub use engine::{
    PoinoEngine, PoinoInferenceParams, PoinoModelParams, SynthConfig, SynthConfigBuilder,
};
pub use model::{MlModelOptions, PoinoError, ProsodyPredictor};
#[cfg(feature = "onnx")]
pub use onnx::OnnxPredictor;
pub use tables::{Accent, EnvKey, Kana, Phoneme};
pub use voices::SpeakerVoice;
