//! Pitch-synchronous source-filter vocoder.
//!
//! Every frame is one inverse FFT of an articulatory-class envelope with
//! partly random phase. Frames are overlap-added one local pitch period
//! apart, then the whole utterance is shaped by a per-class volume envelope.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use super::dsp::{equalizer, hamming, interp, linspace, normalize_peak, smooth, voiced_aperiodicity};
use super::engine::SynthConfig;
use super::model::PoinoError;
use super::prosody::MoraPlan;
use super::tables::EnvKey;
use super::voices::SpeakerVoice;

/// Backward widening of a leading consonant's volume span, in seconds.
const CONSONANT_LEAD_SECS: f64 = 0.01;
/// Width of the volume smoothing window, in seconds.
const VOLUME_SMOOTHING_SECS: f64 = 0.05;

/// Per-voice synthesis state: envelopes, aperiodicity curves, window and
/// FFT plan. Built once per request.
pub struct Vocoder {
    fs: u32,
    seg_len: usize,
    base_freq: f64,
    envelopes: HashMap<EnvKey, Vec<f64>>,
    voiced_ap: Vec<f64>,
    noise_ap: Vec<f64>,
    window: Vec<f64>,
    ifft: Arc<dyn Fft<f64>>,
}

impl Vocoder {
    pub fn new(voice: &SpeakerVoice) -> Result<Self, PoinoError> {
        let seg_len = voice.seg_len;
        let spec_len = seg_len / 2 + 1;
        let grid = linspace(0.0, voice.fs as f64 / 2.0, spec_len);
        let eq = equalizer(spec_len, voice.fs);

        let mut envelopes = HashMap::with_capacity(EnvKey::ALL.len());
        for key in EnvKey::ALL {
            let mut points = voice.envelopes.get(&key).cloned().unwrap_or_default();
            points.sort_by(|a, b| a.0.total_cmp(&b.0));
            let (x, y): (Vec<f64>, Vec<f64>) = points.into_iter().unzip();

            let magnitude = interp(&x, &y, &grid)?
                .into_iter()
                .zip(&eq)
                .map(|(v, e)| 10f64.powf(v * e) - 1.0)
                .collect();
            envelopes.insert(key, magnitude);
        }

        let ifft = FftPlanner::<f64>::new().plan_fft_inverse(seg_len);

        Ok(Self {
            fs: voice.fs,
            seg_len,
            base_freq: voice.base_freq as f64,
            envelopes,
            voiced_ap: voiced_aperiodicity(spec_len, voice.fs),
            noise_ap: vec![1.0; spec_len],
            window: hamming(seg_len),
            ifft,
        })
    }

    /// Linear magnitude of `key` on `seg_len / 2 + 1` bins up to Nyquist.
    pub fn envelope(&self, key: EnvKey) -> &[f64] {
        self.envelopes.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Excitation aperiodicity for `key`; all ones means pure noise.
    pub fn aperiodicity(&self, key: EnvKey, whisper: bool) -> &[f64] {
        if whisper || key.is_unvoiced() {
            &self.noise_ap
        } else {
            &self.voiced_ap
        }
    }

    /// One windowed, peak-normalized frame of `seg_len` samples.
    fn frame<R: Rng>(&self, key: EnvKey, whisper: bool, rng: &mut R) -> Vec<f64> {
        let n = self.seg_len;
        let envelope = self.envelope(key);
        let ap = self.aperiodicity(key, whisper);

        let mut spectrum = vec![Complex::new(0.0, 0.0); n];
        for (k, (&mag, &a)) in envelope.iter().zip(ap).enumerate() {
            let phase = a * rng.gen_range(0.0..2.0 * PI);
            spectrum[k] = Complex::from_polar(mag, phase);
        }
        for k in 1..n / 2 {
            spectrum[n - k] = spectrum[k].conj();
        }

        self.ifft.process(&mut spectrum);

        let mut frame: Vec<f64> = spectrum.iter().map(|c| c.re / n as f64).collect();
        frame.rotate_right(n / 2);
        for (s, w) in frame.iter_mut().zip(&self.window) {
            *s *= w;
        }
        normalize_peak(&mut frame, 1.0);
        frame
    }

    /// Samples between two frames at `hz`: one pitch period, clamped to
    /// `1..=fs`. Pitches at or below 1 Hz count as 1 Hz.
    fn hop(&self, hz: f64) -> usize {
        ((self.fs as f64 / hz.max(1.0)).floor() as usize).clamp(1, self.fs as usize)
    }

    /// Start and class of every frame of one mora whose buffer holds
    /// `mora_samples + seg_len` samples.
    fn schedule(&self, plan: &MoraPlan, mora_samples: usize) -> Vec<(usize, EnvKey)> {
        let mut frames = Vec::new();
        if mora_samples == 0 || plan.duration() <= 0.0 {
            return frames;
        }

        let timings = timing_ratios(plan);
        let f0: Vec<f64> = plan.spans.iter().flat_map(|s| s.f0.iter().copied()).collect();
        let buf_len = mora_samples + self.seg_len;

        let mut pos = 0;
        while pos + self.seg_len <= buf_len {
            let ratio = pos as f64 / mora_samples as f64;
            let Some(key) = timings
                .iter()
                .take_while(|(start, _)| *start <= ratio)
                .last()
                .or_else(|| timings.first())
                .map(|&(_, key)| key)
            else {
                break;
            };
            frames.push((pos, key));

            let hz = f0
                .get(pos.min(f0.len().saturating_sub(1)))
                .copied()
                .unwrap_or(self.base_freq);
            pos += self.hop(hz);
        }

        frames
    }

    /// Overlap-add frames for one mora into a buffer of
    /// `mora_samples + seg_len` samples.
    fn render_mora<R: Rng>(
        &self,
        plan: &MoraPlan,
        mora_samples: usize,
        whisper: bool,
        rng: &mut R,
    ) -> Vec<f64> {
        let mut buf = vec![0.0; mora_samples + self.seg_len];
        for (pos, key) in self.schedule(plan, mora_samples) {
            let frame = self.frame(key, whisper, rng);
            for (b, s) in buf[pos..pos + self.seg_len].iter_mut().zip(&frame) {
                *b += s;
            }
        }
        buf
    }
}

/// Start of every non-empty span as a fraction of the mora's duration.
fn timing_ratios(plan: &MoraPlan) -> Vec<(f64, EnvKey)> {
    let duration = plan.duration();
    let mut elapsed = 0.0;
    let mut timings = Vec::with_capacity(plan.spans.len());
    for span in &plan.spans {
        if span.length > 0.0 {
            timings.push((elapsed / duration, span.env_key));
        }
        elapsed += span.length;
    }
    timings
}

/// Unsmoothed volume envelope: each span's class weight over its samples,
/// delayed by `half` to line up with frame centers. A mora's leading
/// consonant starts `CONSONANT_LEAD_SECS` early.
fn volume_steps(plans: &[MoraPlan], fs: u32, half: usize, out_len: usize) -> Vec<f64> {
    let fs = fs as f64;
    let lead = (fs * CONSONANT_LEAD_SECS) as usize;
    let mut volume = vec![0.0; out_len];
    let mut start = 0.0;

    for plan in plans {
        let offset = (fs * start).floor() as usize;
        let mut cursor = 0.0;
        for (i, span) in plan.spans.iter().enumerate() {
            let mut begin = offset + half + (fs * cursor).floor() as usize;
            cursor += span.length;
            let stop = (offset + half + (fs * cursor).floor() as usize).min(out_len);
            if i == 0 && !span.env_key.is_vowel() {
                begin = begin.saturating_sub(lead);
            }
            if begin < stop {
                volume[begin..stop].fill(span.env_key.volume());
            }
        }
        start += plan.duration();
    }

    volume
}

/// Render planned moras to mono samples at `voice.fs`.
///
/// Returns an empty buffer when the plan has no duration.
pub fn synthesize(
    plans: &[MoraPlan],
    voice: &SpeakerVoice,
    config: &SynthConfig,
) -> Result<Vec<f32>, PoinoError> {
    let total: f64 = plans.iter().map(MoraPlan::duration).sum();
    if total <= 0.0 {
        return Ok(Vec::new());
    }

    let vocoder = Vocoder::new(voice)?;
    let fs = voice.fs as f64;
    let half = vocoder.seg_len / 2;
    let out_len = (fs * total).floor() as usize + vocoder.seg_len;

    let mut rng = match config.seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_entropy(),
    };

    log::debug!(
        "Synthesizing {} moras, {:.3}s at {} Hz",
        plans.len(),
        total,
        voice.fs
    );

    let mut wave = vec![0.0; out_len];
    let mut start = 0.0;
    for plan in plans {
        let end = start + plan.duration();
        let offset = (fs * start).floor() as usize;
        let mora_samples = ((fs * end).floor() as usize).saturating_sub(offset);

        let buf = vocoder.render_mora(plan, mora_samples, config.whisper, &mut rng);
        for (w, s) in wave[offset..].iter_mut().zip(&buf) {
            *w += s;
        }
        start = end;
    }

    let volume = volume_steps(plans, voice.fs, half, out_len);
    let envelope = smooth(&volume, (fs * VOLUME_SMOOTHING_SECS) as usize);
    for (w, v) in wave.iter_mut().zip(&envelope) {
        *w *= v;
    }
    normalize_peak(&mut wave, config.volume);

    Ok(wave.into_iter().map(|s| s as f32).collect())
}
