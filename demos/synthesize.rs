use std::path::PathBuf;
use std::time::Instant;

use poino_tts::{
    engines::poino::{PoinoEngine, PoinoInferenceParams, PoinoModelParams, SynthConfigBuilder},
    SynthesisEngine,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut engine = PoinoEngine::new()?;
    let model_path = PathBuf::from("models/poino");

    let load_start = Instant::now();
    engine.load_model_with_params(&model_path, PoinoModelParams::default())?;
    println!("Models loaded in {:.2?}", load_start.elapsed());

    println!("Available voices: {:?}", engine.speakers());

    engine.load_user_dict_json(r#"{"Rust": [{"kana": "ら", "accent": "high"}, {"kana": "す", "accent": "low"}, {"kana": "と", "accent": "low"}]}"#)?;

    let text = "こんにちは、PoinoTalkです。Rustで音声を合成しています。";

    let moras = engine.analyze_text(text)?;
    let spoken: String = moras.iter().map(|m| m.kana.as_str()).collect();
    println!("Moras: {spoken}");

    let params = PoinoInferenceParams {
        config: SynthConfigBuilder::default().speed(1.0).seed(7).build()?,
        ..Default::default()
    };

    let synth_start = Instant::now();
    let result = engine.synthesize(text, Some(params.clone()))?;
    let synth_dur = synth_start.elapsed();

    let audio_duration = result.duration_secs();
    let speedup = audio_duration / synth_dur.as_secs_f64();
    println!(
        "Synthesized {:.2}s audio in {:.2?} ({:.1}x real-time)",
        audio_duration, synth_dur, speedup
    );

    let whisper = PoinoInferenceParams {
        config: SynthConfigBuilder::default().whisper(true).volume(0.6).build()?,
        ..params
    };
    engine.synthesize_to_file(text, &PathBuf::from("output.wav"), Some(whisper))?;
    println!("Saved whispered version to output.wav");

    engine.unload_model();
    Ok(())
}
