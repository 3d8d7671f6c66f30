use std::path::{Path, PathBuf};

use ndarray::{Array2, Ix2};
use ort::execution_providers::CPUExecutionProvider;
use ort::inputs;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;
use parking_lot::Mutex;

use super::model::{PoinoError, ProsodyPredictor};

/// File name of the duration model inside a model directory.
pub const DURATION_MODEL_FILE: &str = "duration.onnx";

/// File name of the pitch model inside a model directory.
pub const PITCH_MODEL_FILE: &str = "f0.onnx";

/// Duration and pitch models running on ONNX Runtime.
///
/// Sessions need exclusive access to run, so each one sits behind a mutex;
/// concurrent requests queue per model.
pub struct OnnxPredictor {
    duration: Mutex<Session>,
    pitch: Mutex<Session>,
    duration_input: String,
    pitch_inputs: (String, String),
}

impl OnnxPredictor {
    /// Load `duration.onnx` and `f0.onnx` from `model_dir`.
    ///
    /// When `optimized_cache_dir` is given, each optimized graph is written
    /// there on first load and read back on later loads.
    pub fn load(
        model_dir: &Path,
        num_threads: Option<usize>,
        optimized_cache_dir: Option<&Path>,
    ) -> Result<Self, PoinoError> {
        let duration_path = require_file(model_dir, DURATION_MODEL_FILE)?;
        let pitch_path = require_file(model_dir, PITCH_MODEL_FILE)?;

        log::info!("Loading duration model from {}", duration_path.display());
        let duration = init_session(
            &duration_path,
            num_threads,
            optimized_cache_dir.map(|d| d.join(DURATION_MODEL_FILE)).as_deref(),
        )?;

        log::info!("Loading pitch model from {}", pitch_path.display());
        let pitch = init_session(
            &pitch_path,
            num_threads,
            optimized_cache_dir.map(|d| d.join(PITCH_MODEL_FILE)).as_deref(),
        )?;

        let duration_input = input_names(&duration)
            .into_iter()
            .next()
            .ok_or_else(|| PoinoError::Predictor("duration model has no inputs".to_string()))?;

        let mut names = input_names(&pitch).into_iter();
        let pitch_inputs = match (names.next(), names.next()) {
            (Some(phonemes), Some(accents)) => (phonemes, accents),
            _ => {
                return Err(PoinoError::Predictor(
                    "pitch model must take phoneme and accent inputs".to_string(),
                ))
            }
        };

        log::info!(
            "Detected: duration_input='{}', pitch_inputs=('{}', '{}')",
            duration_input,
            pitch_inputs.0,
            pitch_inputs.1
        );

        Ok(Self {
            duration: Mutex::new(duration),
            pitch: Mutex::new(pitch),
            duration_input,
            pitch_inputs,
        })
    }
}

impl ProsodyPredictor for OnnxPredictor {
    fn predict_duration(&self, phonemes: &Array2<f32>) -> Result<Vec<f32>, PoinoError> {
        let mut session = self.duration.lock();
        let outputs = session.run(inputs![
            self.duration_input.as_str() => TensorRef::from_array_view(phonemes.view())?,
        ])?;

        let first_output = outputs
            .iter()
            .next()
            .ok_or_else(|| PoinoError::Predictor("No output from duration model".to_string()))?;
        let lengths = first_output.1.try_extract_array::<f32>()?;

        Ok(lengths.iter().copied().collect())
    }

    fn predict_pitch(
        &self,
        phonemes: &Array2<f32>,
        accents: &Array2<f32>,
    ) -> Result<Array2<f32>, PoinoError> {
        let mut session = self.pitch.lock();
        let outputs = session.run(inputs![
            self.pitch_inputs.0.as_str() => TensorRef::from_array_view(phonemes.view())?,
            self.pitch_inputs.1.as_str() => TensorRef::from_array_view(accents.view())?,
        ])?;

        let first_output = outputs
            .iter()
            .next()
            .ok_or_else(|| PoinoError::Predictor("No output from pitch model".to_string()))?;
        let curves = first_output.1.try_extract_array::<f32>()?;

        Ok(curves.to_owned().into_dimensionality::<Ix2>()?)
    }
}

fn require_file(model_dir: &Path, name: &str) -> Result<PathBuf, PoinoError> {
    let path = model_dir.join(name);
    if !path.exists() {
        return Err(PoinoError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Model file not found at {}", path.display()),
        )));
    }
    Ok(path)
}

/// Initialize an ONNX session with optional on-disk graph caching.
///
/// The first load runs Level3 graph optimization and serialises the result
/// to `optimized_cache_path`; later loads read that file at `Disable`.
fn init_session(
    onnx_path: &Path,
    num_threads: Option<usize>,
    optimized_cache_path: Option<&Path>,
) -> Result<Session, PoinoError> {
    let providers = vec![CPUExecutionProvider::default().build()];

    let (load_path, opt_level, write_cache) = match optimized_cache_path {
        Some(cache) if cache.exists() => {
            log::info!("Loading pre-optimized graph from {:?}, skipping Level3", cache);
            (cache, GraphOptimizationLevel::Disable, None)
        }
        Some(cache) => {
            log::info!(
                "First load: running Level3 optimization; saving graph to {:?}",
                cache
            );
            (onnx_path, GraphOptimizationLevel::Level3, Some(cache))
        }
        None => (onnx_path, GraphOptimizationLevel::Level3, None),
    };

    let mut builder = Session::builder()?
        .with_optimization_level(opt_level)?
        .with_execution_providers(providers)?;

    if let Some(cache) = write_cache {
        if let Some(parent) = cache.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::warn!("Cannot create graph cache directory {:?}: {e}", parent);
            }
        }
        builder = builder.with_optimized_model_path(cache)?;
    }

    if let Some(threads) = num_threads {
        builder = builder.with_intra_threads(threads)?;
    }

    Ok(builder.commit_from_file(load_path)?)
}

fn input_names(session: &Session) -> Vec<String> {
    session
        .inputs()
        .iter()
        .map(|input| input.name().to_string())
        .collect()
}
