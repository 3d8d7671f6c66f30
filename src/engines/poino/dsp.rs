//! Small numeric helpers shared by prosody assembly and the vocoder.

use std::f64::consts::PI;

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use super::model::PoinoError;

/// Low-shelf equalizer boost applied below the shelf corner.
const EQ_GAIN: f64 = 0.5;
/// Transition width of the equalizer shelf, as a fraction of Nyquist.
const EQ_SLOPE: f64 = 0.05;
/// Shelf corner in Hz, expressed against the sample rate.
const EQ_CORNER_HZ: f64 = 2400.0;
/// Transition width of the voiced/noisy split, as a fraction of Nyquist.
const APERIODICITY_SLOPE: f64 = 0.05;
/// Frequency in Hz at which voiced excitation turns noisy, expressed against the sample rate.
const APERIODICITY_CORNER_HZ: f64 = 12000.0;

/// `num` evenly spaced values from `begin` to `end` inclusive.
///
/// A single point sits at the midpoint.
pub fn linspace(begin: f64, end: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![(begin + end) / 2.0],
        _ => (0..num)
            .map(|i| begin + (end - begin) * (i as f64 / (num - 1) as f64))
            .collect(),
    }
}

/// Piecewise-linear interpolation of `(x, y)` at every query in `z`.
///
/// `x` must be ascending. Queries outside `[x[0], x[last]]` are left at zero,
/// and a query equal to the last control point takes its value exactly.
pub fn interp(x: &[f64], y: &[f64], z: &[f64]) -> Result<Vec<f64>, PoinoError> {
    if x.len() != y.len() {
        return Err(PoinoError::Validation(format!(
            "interp: {} x values but {} y values",
            x.len(),
            y.len()
        )));
    }

    let last = x.len().saturating_sub(1);
    let mut out = vec![0.0; z.len()];

    for (o, &q) in out.iter_mut().zip(z) {
        for j in 0..x.len() {
            if j < last && q >= x[j] && q < x[j + 1] {
                *o = y[j] + (y[j + 1] - y[j]) * (q - x[j]) / (x[j + 1] - x[j]);
                break;
            }
            if j == last && q == x[j] {
                *o = y[j];
                break;
            }
        }
    }

    Ok(out)
}

/// Resample `data` to exactly `num` points on a shared `[0, 1]` axis.
pub fn resample(data: &[f64], num: usize) -> Vec<f64> {
    if num == 0 {
        return Vec::new();
    }
    let x = linspace(0.0, 1.0, data.len());
    let z = linspace(0.0, 1.0, num);
    // x and y always have the same length here.
    interp(&x, data, &z).unwrap_or_else(|_| vec![0.0; num])
}

/// Fill runs of exact zeros by linear interpolation between their non-zero
/// neighbours. Leading and trailing runs hold the nearest non-zero value.
/// An all-zero curve is returned unchanged.
pub fn interp_zeros(data: &[f64]) -> Vec<f64> {
    let mut out = data.to_vec();
    let non_zero: Vec<usize> = data
        .iter()
        .enumerate()
        .filter(|(_, &v)| v != 0.0)
        .map(|(i, _)| i)
        .collect();

    let (Some(&first), Some(&last)) = (non_zero.first(), non_zero.last()) else {
        return out;
    };

    for v in &mut out[..first] {
        *v = data[first];
    }
    for v in &mut out[last + 1..] {
        *v = data[last];
    }

    for pair in non_zero.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        let gap = next - prev - 1;
        if gap == 0 {
            continue;
        }
        let filled = linspace(data[prev], data[next], gap);
        out[prev + 1..next].copy_from_slice(&filled);
    }

    out
}

/// Symmetric Hamming window.
pub fn hamming(len: usize) -> Vec<f64> {
    match len {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => (0..len)
            .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / (len - 1) as f64).cos())
            .collect(),
    }
}

/// Position of each of `spec_len` bins as a fraction of Nyquist.
fn bin_ratios(spec_len: usize) -> Vec<f64> {
    linspace(0.0, 1.0, spec_len)
}

/// Exponent curve used to tilt every spectral envelope: a smooth low-shelf
/// that is `1 + EQ_GAIN` at DC and settles to `1` above the corner.
pub fn equalizer(spec_len: usize, fs: u32) -> Vec<f64> {
    let corner = EQ_CORNER_HZ / fs as f64;
    bin_ratios(spec_len)
        .into_iter()
        .map(|r| 1.0 + EQ_GAIN * 0.5 * (1.0 - ((r - corner) / EQ_SLOPE).tanh()))
        .collect()
}

/// Aperiodicity of voiced excitation per bin: near 0 (periodic) at low
/// frequencies, rising to 1 (noise) above the corner.
pub fn voiced_aperiodicity(spec_len: usize, fs: u32) -> Vec<f64> {
    let corner = APERIODICITY_CORNER_HZ / fs as f64;
    bin_ratios(spec_len)
        .into_iter()
        .map(|r| 0.5 * (1.0 + ((r - corner) / APERIODICITY_SLOPE).tanh()))
        .collect()
}

/// Scale `samples` so that the largest magnitude equals `target`.
/// Silent buffers are left as they are.
pub fn normalize_peak(samples: &mut [f64], target: f64) {
    let peak = samples.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    if peak > 0.0 {
        let gain = target / peak;
        for s in samples.iter_mut() {
            *s *= gain;
        }
    }
}

/// Centered moving average weighted by a Hamming window of `width` taps.
/// Taps falling outside the signal are dropped and the remaining weights
/// renormalized.
///
/// Runs as one FFT convolution: the signal rides in the real part and a
/// coverage mask in the imaginary part, so both sums come out of a single pass.
pub fn smooth(data: &[f64], width: usize) -> Vec<f64> {
    if width <= 1 || data.is_empty() {
        return data.to_vec();
    }

    let weights = hamming(width);
    let half = width / 2;
    let fft_len = (data.len() + width - 1).next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(fft_len);
    let inverse = planner.plan_fft_inverse(fft_len);

    let mut signal = vec![Complex::new(0.0, 0.0); fft_len];
    for (c, &d) in signal.iter_mut().zip(data) {
        *c = Complex::new(d, 1.0);
    }
    let mut kernel = vec![Complex::new(0.0, 0.0); fft_len];
    for (c, &w) in kernel.iter_mut().zip(&weights) {
        *c = Complex::new(w, 0.0);
    }

    forward.process(&mut signal);
    forward.process(&mut kernel);
    for (s, k) in signal.iter_mut().zip(&kernel) {
        *s *= *k;
    }
    inverse.process(&mut signal);

    // The window is symmetric, so the convolution at `i + width - 1 - half`
    // is the centered sum for sample `i`.
    let scale = fft_len as f64;
    signal[width - 1 - half..]
        .iter()
        .take(data.len())
        .map(|c| {
            let norm = c.im / scale;
            if norm > 0.0 {
                (c.re / scale) / norm
            } else {
                0.0
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn linspace_endpoints_and_midpoint() {
        assert_eq!(linspace(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
        assert_eq!(linspace(2.0, 4.0, 1), vec![3.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn interp_is_exact_at_control_points() {
        let x = [0.0, 100.0, 250.0, 400.0];
        let y = [0.0, 1.0, 0.25, 0.5];
        let out = interp(&x, &y, &x).unwrap();
        for (o, e) in out.iter().zip(&y) {
            assert!(close(*o, *e));
        }
    }

    #[test]
    fn interp_is_linear_between_points() {
        let x = [0.0, 10.0, 20.0];
        let y = [0.0, 1.0, 3.0];
        let out = interp(&x, &y, &[5.0, 15.0, 17.5]).unwrap();
        assert!(close(out[0], 0.5));
        assert!(close(out[1], 2.0));
        assert!(close(out[2], 2.5));
    }

    #[test]
    fn interp_leaves_out_of_range_queries_at_zero() {
        let x = [100.0, 200.0];
        let y = [0.7, 0.9];
        let out = interp(&x, &y, &[50.0, 200.0, 250.0]).unwrap();
        assert_eq!(out[0], 0.0);
        assert!(close(out[1], 0.9));
        assert_eq!(out[2], 0.0);
    }

    #[test]
    fn interp_rejects_mismatched_inputs() {
        assert!(matches!(
            interp(&[0.0, 1.0], &[0.0], &[0.5]),
            Err(PoinoError::Validation(_))
        ));
    }

    #[test]
    fn resample_is_length_exact() {
        let data = [1.0, 2.0, 3.0, 4.0];
        for n in [0, 1, 3, 4, 17] {
            assert_eq!(resample(&data, n).len(), n);
        }
    }

    #[test]
    fn resample_to_same_length_keeps_endpoints() {
        let data = [0.3, 0.9, 0.1, 0.6];
        let out = resample(&data, data.len());
        assert!(close(out[0], 0.3));
        assert!(close(out[3], 0.6));
    }

    #[test]
    fn interp_zeros_fills_gaps_and_edges() {
        let out = interp_zeros(&[0.0, 2.0, 0.0, 0.0, 0.0, 4.0, 0.0]);
        assert_eq!(out[0], 2.0);
        assert_eq!(out[6], 4.0);
        assert!(close(out[2], 2.0));
        assert!(close(out[3], 3.0));
        assert!(close(out[4], 4.0));
        assert!(out.iter().all(|&v| v != 0.0));
    }

    #[test]
    fn interp_zeros_single_gap_takes_midpoint() {
        assert_eq!(interp_zeros(&[1.0, 0.0, 3.0]), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn interp_zeros_keeps_silent_curve() {
        assert_eq!(interp_zeros(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn hamming_is_symmetric() {
        let w = hamming(9);
        for i in 0..9 {
            assert!(close(w[i], w[8 - i]));
        }
        assert!(close(w[4], 1.0));
        assert!(close(w[0], 0.08));
    }

    #[test]
    fn curves_have_expected_shape() {
        let eq = equalizer(481, 24000);
        assert!(eq[0] > 1.4);
        assert!(close(*eq.last().unwrap(), 1.0));

        let ap = voiced_aperiodicity(481, 24000);
        assert!(ap[0] < 1e-6);
        assert!(*ap.last().unwrap() > 0.99);
        assert!(ap.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn smooth_keeps_constant_signal() {
        let out = smooth(&[0.5; 64], 9);
        assert!(out.iter().all(|&v| close(v, 0.5)));
    }

    fn smooth_direct(data: &[f64], width: usize) -> Vec<f64> {
        let weights = hamming(width);
        let half = width as isize / 2;
        (0..data.len() as isize)
            .map(|i| {
                let (mut acc, mut norm) = (0.0, 0.0);
                for (j, w) in weights.iter().enumerate() {
                    let idx = i + j as isize - half;
                    if idx >= 0 && idx < data.len() as isize {
                        acc += w * data[idx as usize];
                        norm += w;
                    }
                }
                acc / norm
            })
            .collect()
    }

    #[test]
    fn smooth_matches_direct_weighted_average() {
        let mut data = vec![0.0; 300];
        data[40..120].fill(1.0);
        data[120..200].fill(0.3);
        data[250..].fill(0.05);

        for width in [2, 9, 50, 401] {
            let fast = smooth(&data, width);
            let direct = smooth_direct(&data, width);
            assert_eq!(fast.len(), data.len());
            for (a, b) in fast.iter().zip(&direct) {
                assert!((a - b).abs() < 1e-9, "width {width}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn normalize_peak_hits_target() {
        let mut s = vec![0.2, -0.8, 0.4];
        normalize_peak(&mut s, 0.5);
        assert!(close(s[1], -0.5));

        let mut silent = vec![0.0; 4];
        normalize_peak(&mut silent, 1.0);
        assert!(silent.iter().all(|&v| v == 0.0));
    }
}
