//! Shared helpers for the integration tests
#![allow(dead_code)]

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Seeded Gaussian white noise (Box-Muller over a ChaCha stream).
pub fn gaussian_noise(len: usize, sigma: f32, seed: u64) -> Vec<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..len)
        .map(|_| {
            let u1: f32 = rng.gen::<f32>().max(1e-12);
            let u2: f32 = rng.gen();
            sigma * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
        })
        .collect()
}

/// Pure sine tone.
pub fn tone(len: usize, rate: u32, freq: f32, amp: f32) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let t = i as f32 / rate as f32;
            amp * (2.0 * std::f32::consts::PI * freq * t).sin()
        })
        .collect()
}

/// Element-wise sum of two signals of equal length.
pub fn mix(a: &[f32], b: &[f32]) -> Vec<f32> {
    a.iter().zip(b).map(|(&x, &y)| x + y).collect()
}

/// Root-mean-square level.
pub fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>() / samples.len() as f64).sqrt()
}

/// Slice with `margin` samples dropped from both ends, past any
/// cold-start or tail effects.
pub fn interior(samples: &[f32], margin: usize) -> &[f32] {
    &samples[margin..samples.len() - margin]
}

/// Hann-weighted DFT magnitude at a single frequency.
pub fn tone_magnitude(samples: &[f32], rate: u32, freq: f64) -> f64 {
    let n = samples.len();
    let mut re = 0.0f64;
    let mut im = 0.0f64;
    for (i, &s) in samples.iter().enumerate() {
        let w = 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / n as f64).cos());
        let phase = 2.0 * std::f64::consts::PI * freq * i as f64 / rate as f64;
        re += s as f64 * w * phase.cos();
        im -= s as f64 * w * phase.sin();
    }
    (re * re + im * im).sqrt()
}
