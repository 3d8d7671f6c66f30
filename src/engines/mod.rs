//! Speech synthesis engines.
//!
//! This module contains implementations of text-to-speech engines.
//!
//! # Available Engines
//!
//! - `poino` - Japanese pitch-accent TTS with a parametric vocoder
//!   (ONNX prosody models behind the `onnx` feature)

pub mod poino;
