//! Analysis and synthesis windows for the overlap-add pipeline

use std::f64::consts::PI;

/// Precomputed window pair for one FFT size
///
/// Analysis is a periodic Hann window. The synthesis window is the same
/// shape divided by the per-phase overlap energy, so that across hops of
/// `window_size / 4` the product `analysis * synthesis` sums to exactly 1
/// at every interior sample.
#[derive(Debug, Clone)]
pub struct WindowBank {
    analysis: Vec<f32>,
    synthesis: Vec<f32>,
    window_size: usize,
    step_size: usize,
}

impl WindowBank {
    /// Build the window pair for `window_size` (power of two) with a hop of
    /// `window_size / 4`.
    pub fn new(window_size: usize) -> Self {
        let step_size = window_size / 4;

        let analysis: Vec<f64> = (0..window_size)
            .map(|n| 0.5 * (1.0 - (2.0 * PI * n as f64 / window_size as f64).cos()))
            .collect();

        // Overlap energy per hop phase. For a periodic Hann at 75% overlap
        // this is the constant 3/2, but it is computed rather than assumed.
        let mut ola_sum = vec![0.0_f64; step_size];
        for (n, &w) in analysis.iter().enumerate() {
            ola_sum[n % step_size] += w * w;
        }

        let synthesis: Vec<f32> = analysis
            .iter()
            .enumerate()
            .map(|(n, &w)| (w / ola_sum[n % step_size]) as f32)
            .collect();

        Self {
            analysis: analysis.into_iter().map(|w| w as f32).collect(),
            synthesis,
            window_size,
            step_size,
        }
    }

    /// Analysis window coefficients.
    #[inline]
    pub fn analysis(&self) -> &[f32] {
        &self.analysis
    }

    /// Synthesis window coefficients.
    #[inline]
    pub fn synthesis(&self) -> &[f32] {
        &self.synthesis
    }

    /// Window length in samples.
    #[inline]
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Hop length in samples.
    #[inline]
    pub fn step_size(&self) -> usize {
        self.step_size
    }

    /// Multiply `samples` by the analysis window into `out`.
    pub fn apply_analysis(&self, samples: &[f32], out: &mut [f32]) {
        for ((o, &s), &w) in out.iter_mut().zip(samples).zip(&self.analysis) {
            *o = s * w;
        }
    }
}
