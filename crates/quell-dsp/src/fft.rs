//! Real FFT plan pair

use std::sync::Arc;

use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;

use crate::error::{DenoiseError, DenoiseResult};

/// Planned forward and inverse real FFT for one window size
///
/// Wraps the `realfft` planner output. The forward transform consumes a
/// time-domain buffer of `size` samples (the buffer is used as scratch and
/// clobbered) and produces `size / 2 + 1` complex bins. The inverse is
/// normalized by `1 / size`, so a forward/inverse round trip reproduces the
/// input to floating-point tolerance.
pub struct FftPair {
    forward: Arc<dyn RealToComplex<f32>>,
    inverse: Arc<dyn ComplexToReal<f32>>,
    size: usize,
}

impl FftPair {
    /// Plan both directions for `size` points.
    pub fn new(size: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        Self {
            forward: planner.plan_fft_forward(size),
            inverse: planner.plan_fft_inverse(size),
            size,
        }
    }

    /// Transform size in samples.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of complex bins produced by the forward transform.
    #[inline]
    pub fn bins(&self) -> usize {
        self.size / 2 + 1
    }

    /// Forward transform. `time` is clobbered.
    pub fn forward(&self, time: &mut [f32], spectrum: &mut [Complex<f32>]) -> DenoiseResult<()> {
        self.forward
            .process(time, spectrum)
            .map_err(|e| DenoiseError::Internal(format!("forward fft: {e}")))
    }

    /// Inverse transform with `1 / size` normalization applied to `time`.
    ///
    /// The imaginary parts of the DC and Nyquist bins are forced to zero
    /// first; `realfft` rejects spectra where they are not.
    pub fn inverse(&self, spectrum: &mut [Complex<f32>], time: &mut [f32]) -> DenoiseResult<()> {
        if let Some(first) = spectrum.first_mut() {
            first.im = 0.0;
        }
        if let Some(last) = spectrum.last_mut() {
            last.im = 0.0;
        }
        self.inverse
            .process(spectrum, time)
            .map_err(|e| DenoiseError::Internal(format!("inverse fft: {e}")))?;

        let norm = 1.0 / self.size as f32;
        for sample in time.iter_mut() {
            *sample *= norm;
        }
        Ok(())
    }
}

impl std::fmt::Debug for FftPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FftPair").field("size", &self.size).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_signal(len: usize) -> Vec<f32> {
        // Deterministic multi-tone signal
        (0..len)
            .map(|i| {
                let t = i as f32 / len as f32;
                (2.0 * std::f32::consts::PI * 5.0 * t).sin() * 0.5
                    + (2.0 * std::f32::consts::PI * 37.0 * t).cos() * 0.25
            })
            .collect()
    }

    #[test]
    fn round_trip_identity() {
        for size in [256usize, 1024, 4096] {
            let fft = FftPair::new(size);
            let original = test_signal(size);

            let mut time = original.clone();
            let mut spectrum = vec![Complex::new(0.0, 0.0); fft.bins()];
            fft.forward(&mut time, &mut spectrum).unwrap();

            let mut back = vec![0.0f32; size];
            fft.inverse(&mut spectrum, &mut back).unwrap();

            let rms: f32 = original.iter().map(|s| s * s).sum::<f32>().sqrt();
            let err: f32 = original
                .iter()
                .zip(&back)
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f32>()
                .sqrt();
            assert!(err / rms < 1e-5, "size {size}: relative error {}", err / rms);
        }
    }

    #[test]
    fn parseval_holds() {
        let size = 2048;
        let fft = FftPair::new(size);
        let original = test_signal(size);

        let mut time = original.clone();
        let mut spectrum = vec![Complex::new(0.0, 0.0); fft.bins()];
        fft.forward(&mut time, &mut spectrum).unwrap();

        let energy_time: f64 = original.iter().map(|&s| (s as f64) * (s as f64)).sum();

        let mut energy_freq = spectrum[0].norm_sqr() as f64;
        energy_freq += spectrum[size / 2].norm_sqr() as f64;
        for bin in &spectrum[1..size / 2] {
            energy_freq += 2.0 * bin.norm_sqr() as f64;
        }
        energy_freq /= size as f64;

        let rel = (energy_time - energy_freq).abs() / energy_time;
        assert!(rel < 1e-5, "relative energy mismatch {rel}");
    }

    #[test]
    fn bins_count() {
        let fft = FftPair::new(2048);
        assert_eq!(fft.bins(), 1025);
    }
}
