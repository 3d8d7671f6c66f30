use std::path::{Path, PathBuf};
use std::sync::Arc;

use derive_builder::Builder;

use crate::{SynthesisEngine, SynthesisResult};

use super::analyzer::{OpenJLabelAnalyzer, OpenJLabelConfig, TextAnalyzer};
use super::codec::{
    clamp_length, moras_to_phonemes, moras_to_timed_phonemes, phonemes_to_moras, MoraUnit,
};
use super::dict::{DictKind, DictionaryStore, Fragment, OptiDict};
use super::label::parse_labels;
use super::model::{MlModelOptions, PoinoError, ProsodyPredictor};
use super::prosody::{accent_windows, denormalize_pitch, phoneme_windows, plan_moras, PitchScale};
use super::synth;
use super::tables::Kana;
use super::voices::{SpeakerVoice, VoiceStore, DEFAULT_VOICE};

/// File holding [`MlModelOptions`] inside a model directory.
pub const OPTIONS_FILE: &str = "options.json";

/// Per-request synthesis settings.
///
/// ```rust
/// use poino_tts::engines::poino::SynthConfigBuilder;
///
/// let config = SynthConfigBuilder::default().speed(1.2).whisper(true).build()?;
/// assert_eq!(config.pitch, 1.0);
/// # Ok::<(), poino_tts::engines::poino::PoinoError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(build_fn(validate = "Self::validate", error = "PoinoError"))]
pub struct SynthConfig {
    /// Speech speed multiplier. Range: 0.5–2.0, default 1.0.
    #[builder(default = "1.0")]
    pub speed: f64,
    /// Peak amplitude of the output. Range: 0.0–1.0, default 1.0.
    #[builder(default = "1.0")]
    pub volume: f64,
    /// Pitch multiplier. Range: 0.5–2.0, default 1.0.
    #[builder(default = "1.0")]
    pub pitch: f64,
    /// Render every class with noise excitation.
    #[builder(default)]
    pub whisper: bool,
    /// Excitation RNG seed. `None` draws from OS entropy.
    #[builder(default, setter(strip_option))]
    pub seed: Option<u64>,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            volume: 1.0,
            pitch: 1.0,
            whisper: false,
            seed: None,
        }
    }
}

impl SynthConfig {
    /// Validated config without a seed.
    pub fn new(speed: f64, volume: f64, pitch: f64, whisper: bool) -> Result<Self, PoinoError> {
        let config = Self {
            speed,
            volume,
            pitch,
            whisper,
            seed: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PoinoError> {
        check_range("speed", self.speed, 0.5, 2.0)?;
        check_range("volume", self.volume, 0.0, 1.0)?;
        check_range("pitch", self.pitch, 0.5, 2.0)
    }
}

impl SynthConfigBuilder {
    fn validate(&self) -> Result<(), PoinoError> {
        if let Some(speed) = self.speed {
            check_range("speed", speed, 0.5, 2.0)?;
        }
        if let Some(volume) = self.volume {
            check_range("volume", volume, 0.0, 1.0)?;
        }
        if let Some(pitch) = self.pitch {
            check_range("pitch", pitch, 0.5, 2.0)?;
        }
        Ok(())
    }
}

fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<(), PoinoError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(PoinoError::Validation(format!(
            "{name} must be within {min}..={max}, got {value}"
        )))
    }
}

/// Parameters for configuring prosody model loading.
#[derive(Debug, Clone, Default)]
pub struct PoinoModelParams {
    /// Number of CPU threads per ONNX session.
    /// `None` uses the ORT default.
    pub num_threads: Option<usize>,
    /// Directory for caching the optimized ONNX graphs.
    ///
    /// The first load writes the Level3-optimized graphs here; later loads
    /// read them back without re-optimizing. Must be writable.
    pub optimized_model_cache_path: Option<PathBuf>,
    /// Model options. `None` reads `options.json` from the model directory.
    pub options: Option<MlModelOptions>,
}

/// Parameters for one text-to-speech request.
#[derive(Debug, Clone)]
pub struct PoinoInferenceParams {
    /// Voice id (e.g. `"laychie"`).
    pub voice: String,
    pub config: SynthConfig,
}

impl Default for PoinoInferenceParams {
    fn default() -> Self {
        Self {
            voice: DEFAULT_VOICE.to_string(),
            config: SynthConfig::default(),
        }
    }
}

/// Japanese pitch-accent text-to-speech engine.
///
/// Text goes through the dictionary overlay and the label analyzer into
/// moras, a prosody predictor supplies durations and pitch, and a
/// parametric vocoder renders the result with one of the registered voices.
///
/// # Quick Start
///
/// ```rust,no_run
/// use poino_tts::{SynthesisEngine, engines::poino::PoinoEngine};
/// use std::path::PathBuf;
///
/// // Uses openjlabel from PATH
/// let mut engine = PoinoEngine::new()?;
/// engine.load_model(&PathBuf::from("models/poino"))?;
/// let result = engine.synthesize("こんにちは", None)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// # Two-phase use
///
/// ```rust,no_run
/// use poino_tts::engines::poino::{PoinoEngine, SynthConfig};
///
/// # fn run(engine: &PoinoEngine) -> Result<(), poino_tts::engines::poino::PoinoError> {
/// let mut moras = engine.analyze_text("こんにちは")?;
/// moras[0].durations[0] *= 1.5;
/// let samples = engine.synthesize_voice(&moras, "laychie", &SynthConfig::default())?;
/// # Ok(())
/// # }
/// ```
pub struct PoinoEngine {
    dictionary: Arc<DictionaryStore>,
    analyzer: Box<dyn TextAnalyzer>,
    predictor: Option<Box<dyn ProsodyPredictor>>,
    options: Option<MlModelOptions>,
    voices: VoiceStore,
    model_path: Option<PathBuf>,
}

impl PoinoEngine {
    /// Create an engine that runs `openjlabel` from PATH.
    pub fn new() -> Result<Self, PoinoError> {
        Self::with_openjlabel(OpenJLabelConfig::default())
    }

    /// Create an engine with explicit `openjlabel` binary and dictionary
    /// paths, e.g. when bundling them with an application.
    pub fn with_openjlabel(config: OpenJLabelConfig) -> Result<Self, PoinoError> {
        Self::with_analyzer(OpenJLabelAnalyzer::new(config))
    }

    /// Create an engine around any text analyzer.
    pub fn with_analyzer(analyzer: impl TextAnalyzer + 'static) -> Result<Self, PoinoError> {
        Ok(Self {
            dictionary: Arc::new(DictionaryStore::with_system_dict()?),
            analyzer: Box::new(analyzer),
            predictor: None,
            options: None,
            voices: VoiceStore::builtin()?,
            model_path: None,
        })
    }

    /// Install a prosody predictor together with the options it was trained with.
    pub fn set_predictor(
        &mut self,
        predictor: Box<dyn ProsodyPredictor>,
        options: MlModelOptions,
    ) -> Result<(), PoinoError> {
        self.set_model_options(options)?;
        self.predictor = Some(predictor);
        Ok(())
    }

    pub fn set_model_options(&mut self, options: MlModelOptions) -> Result<(), PoinoError> {
        options.validate()?;
        self.options = Some(options);
        Ok(())
    }

    pub fn model_options(&self) -> Option<&MlModelOptions> {
        self.options.as_ref()
    }

    /// Directory the current models were loaded from.
    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }

    /// The shared dictionary store.
    pub fn dictionary(&self) -> Arc<DictionaryStore> {
        Arc::clone(&self.dictionary)
    }

    pub fn load_user_dict(&self, dict: OptiDict) -> Result<(), PoinoError> {
        self.dictionary.load(DictKind::User, dict)
    }

    pub fn load_user_dict_json(&self, json: &str) -> Result<(), PoinoError> {
        self.dictionary.load_json(DictKind::User, json)
    }

    pub fn clear_user_dict(&self) {
        self.dictionary.clear_user();
    }

    /// List all voice ids.
    pub fn speakers(&self) -> Vec<&str> {
        self.voices.list_voices()
    }

    pub fn voice(&self, id: &str) -> Result<&SpeakerVoice, PoinoError> {
        self.voices.get(id)
    }

    pub fn register_voice(&mut self, voice: SpeakerVoice) -> Result<(), PoinoError> {
        self.voices.insert(voice)
    }

    /// Load a voice JSON file and register it.
    pub fn load_voice(&mut self, path: &Path) -> Result<&SpeakerVoice, PoinoError> {
        self.voices.load(path)
    }

    fn options(&self) -> Result<&MlModelOptions, PoinoError> {
        self.options.as_ref().ok_or_else(|| {
            PoinoError::NotInitialized(
                "model options are not set; call set_model_options or load_model first"
                    .to_string(),
            )
        })
    }

    fn models(&self) -> Result<(&dyn ProsodyPredictor, &MlModelOptions), PoinoError> {
        let predictor = self.predictor.as_deref().ok_or_else(|| {
            PoinoError::NotInitialized(
                "prosody predictor is not loaded; call load_model or set_predictor first"
                    .to_string(),
            )
        })?;
        Ok((predictor, self.options()?))
    }

    /// Turn text into moras with predicted durations.
    ///
    /// Dictionary hits are spliced in directly; the rest of the text goes
    /// through the analyzer. A trailing pause is dropped.
    pub fn analyze_text(&self, text: &str) -> Result<Vec<MoraUnit>, PoinoError> {
        let (predictor, options) = self.models()?;

        let mut moras = Vec::new();
        for fragment in self.dictionary.resolve(text) {
            match fragment {
                Fragment::Moras(spliced) => moras.extend(spliced),
                Fragment::Text(text) if text.trim().is_empty() => {}
                Fragment::Text(text) => {
                    let lines = self.analyzer.analyze(&text)?;
                    let units = parse_labels(&lines.join("\n"))?;
                    let parsed = phonemes_to_moras(&units);
                    if parsed.is_empty() {
                        log::warn!("Analyzer produced no moras for {:?}", text);
                    }
                    moras.extend(parsed);
                }
            }
        }

        if moras.last().is_some_and(|m| m.kana == Kana::Pau) {
            moras.pop();
        }
        if moras.is_empty() {
            return Ok(moras);
        }

        let units = moras_to_phonemes(&moras);
        let windows = phoneme_windows(&units, options.sliding_win_len)?;
        let lengths = predictor.predict_duration(&windows)?;
        if lengths.len() != units.len() {
            return Err(PoinoError::Predictor(format!(
                "duration model returned {} values for {} phonemes",
                lengths.len(),
                units.len()
            )));
        }
        log::debug!("Analyzed {} moras / {} phonemes", moras.len(), units.len());

        let mut lengths = lengths.into_iter().map(|l| clamp_length(l as f64));
        for mora in &mut moras {
            let count = mora.kana.phonemes().len();
            mora.durations = lengths.by_ref().take(count).collect();
        }

        Ok(moras)
    }

    /// Render moras with predicted pitch.
    ///
    /// Moras without any duration render to an empty buffer without touching
    /// the models.
    pub fn synthesize_voice(
        &self,
        moras: &[MoraUnit],
        voice_id: &str,
        config: &SynthConfig,
    ) -> Result<Vec<f32>, PoinoError> {
        config.validate()?;
        let voice = self.voices.get(voice_id)?;

        let units = moras_to_timed_phonemes(moras)?;
        if units.iter().filter_map(|u| u.length).sum::<f64>() <= 0.0 {
            return Ok(Vec::new());
        }
        let (predictor, options) = self.models()?;

        let phonemes = phoneme_windows(&units, options.sliding_win_len)?;
        let accents = accent_windows(&units, options.sliding_win_len)?;
        let curves = predictor.predict_pitch(&phonemes, &accents)?;
        if curves.nrows() != units.len() {
            return Err(PoinoError::Predictor(format!(
                "pitch model returned {} curves for {} phonemes",
                curves.nrows(),
                units.len()
            )));
        }

        let scale = PitchScale {
            norm_max: options.f0_norm_max,
            pitch: config.pitch,
            base_ratio: voice.base_freq as f64 / options.f0_model_base_freq,
        };
        let pitch = denormalize_pitch(&curves, scale);

        render(moras, &pitch, voice, config)
    }

    /// Render moras with caller-supplied pitch curves in Hz, one per phoneme.
    ///
    /// The curves are only rescaled from the model's base frequency to the
    /// voice's.
    pub fn synthesize_voice_with_pitch(
        &self,
        moras: &[MoraUnit],
        voice_id: &str,
        config: &SynthConfig,
        pitch_curves: &[Vec<f64>],
    ) -> Result<Vec<f32>, PoinoError> {
        config.validate()?;
        let voice = self.voices.get(voice_id)?;

        let units = moras_to_timed_phonemes(moras)?;
        if units.iter().filter_map(|u| u.length).sum::<f64>() <= 0.0 {
            return Ok(Vec::new());
        }
        let options = self.options()?;

        let ratio = voice.base_freq as f64 / options.f0_model_base_freq;
        let pitch: Vec<Vec<f64>> = pitch_curves
            .iter()
            .map(|curve| curve.iter().map(|hz| hz * ratio).collect())
            .collect();

        render(moras, &pitch, voice, config)
    }
}

fn render(
    moras: &[MoraUnit],
    pitch: &[Vec<f64>],
    voice: &SpeakerVoice,
    config: &SynthConfig,
) -> Result<Vec<f32>, PoinoError> {
    let plans = plan_moras(moras, pitch, voice, config.speed)?;
    synth::synthesize(&plans, voice, config)
}

impl Drop for PoinoEngine {
    fn drop(&mut self) {
        self.unload_model();
    }
}

impl SynthesisEngine for PoinoEngine {
    type SynthesisParams = PoinoInferenceParams;
    type ModelParams = PoinoModelParams;

    #[cfg(feature = "onnx")]
    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: Self::ModelParams,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let options = match params.options {
            Some(options) => options,
            None => {
                let path = model_path.join(OPTIONS_FILE);
                if path.exists() {
                    MlModelOptions::load(&path)?
                } else {
                    log::warn!(
                        "No {} in {}, keeping current model options",
                        OPTIONS_FILE,
                        model_path.display()
                    );
                    self.options()?.clone()
                }
            }
        };

        let predictor = super::onnx::OnnxPredictor::load(
            model_path,
            params.num_threads,
            params.optimized_model_cache_path.as_deref(),
        )?;
        self.set_predictor(Box::new(predictor), options)?;
        self.model_path = Some(model_path.to_path_buf());
        Ok(())
    }

    #[cfg(not(feature = "onnx"))]
    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        _params: Self::ModelParams,
    ) -> Result<(), Box<dyn std::error::Error>> {
        Err(Box::new(PoinoError::UnsupportedEnvironment(format!(
            "cannot load {}: built without the `onnx` feature; \
             enable it or install a predictor with set_predictor",
            model_path.display()
        ))))
    }

    fn unload_model(&mut self) {
        self.predictor = None;
        self.model_path = None;
    }

    fn synthesize(
        &mut self,
        text: &str,
        params: Option<Self::SynthesisParams>,
    ) -> Result<SynthesisResult, Box<dyn std::error::Error>> {
        let p = params.unwrap_or_default();
        let moras = self.analyze_text(text)?;
        let samples = self.synthesize_voice(&moras, &p.voice, &p.config)?;

        Ok(SynthesisResult {
            samples,
            sample_rate: self.voices.get(&p.voice)?.fs,
        })
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::*;
    use crate::engines::poino::tables::Accent;

    struct FlatPredictor {
        length: f32,
        pitch: f32,
    }

    impl ProsodyPredictor for FlatPredictor {
        fn predict_duration(&self, phonemes: &Array2<f32>) -> Result<Vec<f32>, PoinoError> {
            Ok(vec![self.length; phonemes.nrows()])
        }

        fn predict_pitch(
            &self,
            phonemes: &Array2<f32>,
            _accents: &Array2<f32>,
        ) -> Result<Array2<f32>, PoinoError> {
            Ok(Array2::from_elem((phonemes.nrows(), 8), self.pitch))
        }
    }

    fn options() -> MlModelOptions {
        MlModelOptions {
            sliding_win_len: 3,
            f0_model_base_freq: 400.0,
            f0_norm_max: 500.0,
        }
    }

    fn label(symbol: &str, fields: &str) -> String {
        format!("xx^xx-{symbol}+xx=xx/A:{fields}/B:xx-xx_xx")
    }

    /// Analyzer that reads every input as a single "a".
    fn vowel_analyzer(_text: &str) -> Result<Vec<String>, PoinoError> {
        Ok(vec![
            label("sil", "xx+xx+xx"),
            label("a", "0+1+1"),
            label("sil", "xx+xx+xx"),
        ])
    }

    fn engine() -> PoinoEngine {
        let mut engine = PoinoEngine::with_analyzer(vowel_analyzer).unwrap();
        engine
            .set_predictor(
                Box::new(FlatPredictor {
                    length: 0.3,
                    pitch: 0.5,
                }),
                options(),
            )
            .unwrap();
        engine
    }

    fn seeded() -> SynthConfig {
        SynthConfigBuilder::default().seed(11).build().unwrap()
    }

    #[test]
    fn single_vowel_end_to_end() {
        let engine = engine();
        let moras = engine.analyze_text("あ").unwrap();
        assert_eq!(moras.len(), 1);
        assert_eq!(moras[0].kana, Kana::A);
        assert_eq!(moras[0].accent, Accent::High);
        assert!((moras[0].durations[0] - 0.3).abs() < 1e-6);

        let samples = engine.synthesize_voice(&moras, "laychie", &seeded()).unwrap();
        let expected = 24000.0 * 0.3;
        assert!((samples.len() as f64 - expected).abs() <= 960.0 + 1.0);
        assert!(samples.iter().all(|s| s.is_finite()));
        let peak = samples.iter().fold(0.0f32, |m, v| m.max(v.abs()));
        assert!(peak > 0.0 && peak <= 1.0 + 1e-6);
    }

    #[test]
    fn trait_synthesis_reports_voice_rate() {
        let mut engine = engine();
        let params = PoinoInferenceParams {
            config: SynthConfig {
                volume: 0.4,
                ..seeded()
            },
            ..Default::default()
        };
        let result = engine.synthesize("あ", Some(params)).unwrap();
        assert_eq!(result.sample_rate, 24000);
        let peak = result.samples.iter().fold(0.0f32, |m, v| m.max(v.abs()));
        assert!(peak <= 0.4 + 1e-6);
    }

    #[test]
    fn trailing_pause_is_dropped() {
        let moras = engine().analyze_text("あ、").unwrap();
        assert_eq!(moras.len(), 1);

        let moras = engine().analyze_text("あ、あ").unwrap();
        assert_eq!(
            moras.iter().map(|m| m.kana).collect::<Vec<_>>(),
            vec![Kana::A, Kana::Pau, Kana::A]
        );
        assert!(moras.iter().all(|m| m.durations.len() == 1));
    }

    #[test]
    fn dictionary_hits_skip_the_analyzer() {
        let failing = |_: &str| -> Result<Vec<String>, PoinoError> {
            Err(PoinoError::AnalyzerFailed("should not run".to_string()))
        };
        let mut engine = PoinoEngine::with_analyzer(failing).unwrap();
        engine
            .set_predictor(
                Box::new(FlatPredictor {
                    length: 0.1,
                    pitch: 0.5,
                }),
                options(),
            )
            .unwrap();

        let moras = engine.analyze_text("poino").unwrap();
        assert_eq!(
            moras.iter().map(|m| m.kana).collect::<Vec<_>>(),
            vec![Kana::Po, Kana::I, Kana::No]
        );
        assert_eq!(moras[0].durations.len(), 2);

        engine
            .load_user_dict_json(r#"{"テスト": [{"kana": "て", "accent": "high"}]}"#)
            .unwrap();
        assert_eq!(engine.analyze_text("テスト").unwrap()[0].kana, Kana::Te);
        engine.clear_user_dict();
        assert!(engine.analyze_text("テスト").is_err());
    }

    #[test]
    fn requires_a_predictor() {
        let engine = PoinoEngine::with_analyzer(vowel_analyzer).unwrap();
        assert!(matches!(
            engine.analyze_text("あ"),
            Err(PoinoError::NotInitialized(_))
        ));
        let moras = vec![MoraUnit {
            kana: Kana::A,
            accent: Accent::High,
            durations: vec![0.2],
        }];
        assert!(matches!(
            engine.synthesize_voice(&moras, DEFAULT_VOICE, &SynthConfig::default()),
            Err(PoinoError::NotInitialized(_))
        ));
        assert!(matches!(
            engine.synthesize_voice_with_pitch(
                &moras,
                DEFAULT_VOICE,
                &SynthConfig::default(),
                &[vec![200.0; 4]]
            ),
            Err(PoinoError::NotInitialized(_))
        ));
    }

    #[test]
    fn zero_duration_renders_nothing() {
        let moras = vec![MoraUnit {
            kana: Kana::Ka,
            accent: Accent::Low,
            durations: vec![0.0, 0.0],
        }];
        let samples = engine()
            .synthesize_voice(&moras, DEFAULT_VOICE, &seeded())
            .unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn zero_duration_needs_no_models() {
        let engine = PoinoEngine::with_analyzer(vowel_analyzer).unwrap();
        let moras = vec![MoraUnit {
            kana: Kana::A,
            accent: Accent::High,
            durations: vec![0.0],
        }];
        let samples = engine
            .synthesize_voice(&moras, DEFAULT_VOICE, &seeded())
            .unwrap();
        assert!(samples.is_empty());
        let samples = engine
            .synthesize_voice_with_pitch(&moras, DEFAULT_VOICE, &seeded(), &[])
            .unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn invalid_durations_are_rejected() {
        let engine = engine();
        for bad in [f64::NAN, f64::INFINITY, -0.05, 10.5] {
            let moras = vec![MoraUnit {
                kana: Kana::Ka,
                accent: Accent::Low,
                durations: vec![bad, 0.3],
            }];
            assert!(matches!(
                engine.synthesize_voice(&moras, DEFAULT_VOICE, &seeded()),
                Err(PoinoError::Validation(_))
            ));
            assert!(matches!(
                engine.synthesize_voice_with_pitch(
                    &moras,
                    DEFAULT_VOICE,
                    &seeded(),
                    &[vec![220.0; 4], vec![220.0; 4]]
                ),
                Err(PoinoError::Validation(_))
            ));
        }
    }

    #[test]
    fn predicted_durations_stay_in_range() {
        let mut engine = PoinoEngine::with_analyzer(vowel_analyzer).unwrap();
        engine
            .set_predictor(
                Box::new(FlatPredictor {
                    length: 50.0,
                    pitch: 0.5,
                }),
                options(),
            )
            .unwrap();
        assert_eq!(engine.analyze_text("あ").unwrap()[0].durations, vec![10.0]);

        engine
            .set_predictor(
                Box::new(FlatPredictor {
                    length: f32::NAN,
                    pitch: 0.5,
                }),
                options(),
            )
            .unwrap();
        assert_eq!(engine.analyze_text("あ").unwrap()[0].durations, vec![0.0]);
    }

    #[test]
    fn inconsistent_durations_are_rejected() {
        let moras = vec![MoraUnit {
            kana: Kana::Ka,
            accent: Accent::Low,
            durations: vec![0.2],
        }];
        assert!(matches!(
            engine().synthesize_voice(&moras, DEFAULT_VOICE, &seeded()),
            Err(PoinoError::InconsistentDuration {
                index: 0,
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn caller_pitch_is_used() {
        let engine = engine();
        let moras = vec![MoraUnit {
            kana: Kana::Ka,
            accent: Accent::High,
            durations: vec![0.05, 0.15],
        }];
        let samples = engine
            .synthesize_voice_with_pitch(
                &moras,
                DEFAULT_VOICE,
                &seeded(),
                &[vec![220.0; 4], vec![220.0, 240.0, 260.0]],
            )
            .unwrap();
        assert!((samples.len() as i64 - (4800 + 960)).abs() <= 1);

        assert!(matches!(
            engine.synthesize_voice_with_pitch(&moras, DEFAULT_VOICE, &seeded(), &[vec![220.0]]),
            Err(PoinoError::Validation(_))
        ));
    }

    #[test]
    fn unknown_voice_is_reported() {
        let moras = engine().analyze_text("あ").unwrap();
        assert!(matches!(
            engine().synthesize_voice(&moras, "nobody", &seeded()),
            Err(PoinoError::VoiceNotFound(_))
        ));
    }

    #[test]
    fn config_ranges_are_enforced() {
        assert!(matches!(
            SynthConfigBuilder::default().speed(3.0).build(),
            Err(PoinoError::Validation(_))
        ));
        assert!(SynthConfigBuilder::default().volume(-0.1).build().is_err());
        assert!(SynthConfig::new(1.0, 1.0, 0.4, false).is_err());

        let config = SynthConfigBuilder::default().build().unwrap();
        assert_eq!(config, SynthConfig::default());
    }

    #[test]
    fn registers_voices() {
        let mut engine = engine();
        let mut voice = SpeakerVoice::laychie().unwrap();
        voice.id = "low".to_string();
        voice.base_freq = 200;
        engine.register_voice(voice).unwrap();
        assert_eq!(engine.speakers(), vec!["laychie", "low"]);
        assert_eq!(engine.voice("low").unwrap().base_freq, 200);
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn loading_models_needs_onnx() {
        let mut engine = engine();
        let err = engine.load_model(Path::new("models/poino")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PoinoError>(),
            Some(PoinoError::UnsupportedEnvironment(_))
        ));
    }
}
