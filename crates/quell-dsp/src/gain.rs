//! Gain application and overlap-add resynthesis

use rustfft::num_complex::Complex;

use crate::error::DenoiseResult;
use crate::fft::FftPair;
use crate::frame::Frame;
use crate::window::WindowBank;

/// Sliding overlap-add accumulator
///
/// Consumes decided frames in stream order. Each render scales the frame's
/// spectrum by its per-bin gains, inverse-transforms, applies the synthesis
/// window and adds the result at the head of the accumulator; the leading
/// `step` samples are then final (no later window reaches them), so they
/// are handed out and the accumulator slides.
#[derive(Debug)]
pub struct OverlapAdd {
    accumulator: Vec<f32>,
    time_scratch: Vec<f32>,
    spec_scratch: Vec<Complex<f32>>,
    step: usize,
}

impl OverlapAdd {
    /// Accumulator for `window_size`-sample frames at a hop of
    /// `window_size / 4`.
    pub fn new(window_size: usize) -> Self {
        Self {
            accumulator: vec![0.0; window_size],
            time_scratch: vec![0.0; window_size],
            spec_scratch: vec![Complex::new(0.0, 0.0); window_size / 2 + 1],
            step: window_size / 4,
        }
    }

    /// Samples emitted per rendered frame.
    #[inline]
    pub fn step(&self) -> usize {
        self.step
    }

    /// Zero all accumulated state.
    pub fn reset(&mut self) {
        self.accumulator.fill(0.0);
    }

    /// Render one decided frame; `out` receives the `step` finalized
    /// samples starting at `frame.start`.
    pub fn render(
        &mut self,
        frame: &Frame,
        fft: &FftPair,
        bank: &WindowBank,
        out: &mut [f32],
    ) -> DenoiseResult<()> {
        debug_assert_eq!(out.len(), self.step);

        for ((dst, &bin), &gain) in self
            .spec_scratch
            .iter_mut()
            .zip(&frame.spectrum)
            .zip(&frame.output_gain)
        {
            *dst = bin * gain;
        }

        fft.inverse(&mut self.spec_scratch, &mut self.time_scratch)?;

        for ((acc, &sample), &w) in self
            .accumulator
            .iter_mut()
            .zip(&self.time_scratch)
            .zip(bank.synthesis())
        {
            *acc += sample * w;
        }

        out.copy_from_slice(&self.accumulator[..self.step]);
        self.accumulator.copy_within(self.step.., 0);
        let tail = self.accumulator.len() - self.step;
        self.accumulator[tail..].fill(0.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drive the full analysis/resynthesis chain at unity gain and check
    /// the emitted stream reproduces the interior of the input.
    #[test]
    fn unity_gain_reconstructs_interior() {
        let window = 256usize;
        let step = window / 4;
        let bank = WindowBank::new(window);
        let fft = FftPair::new(window);
        let mut ola = OverlapAdd::new(window);

        let len = window * 8;
        let input: Vec<f32> = (0..len)
            .map(|i| {
                let t = i as f32 / 44100.0;
                (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.4
                    + (2.0 * std::f32::consts::PI * 3313.0 * t).sin() * 0.2
            })
            .collect();

        let mut output = Vec::with_capacity(len);
        let mut chunk = vec![0.0f32; step];
        let mut windowed = vec![0.0f32; window];

        for start in (0..len).step_by(step) {
            let mut frame = Frame::new(fft.bins(), start as u64);
            let mut raw = vec![0.0f32; window];
            let take = window.min(len - start);
            raw[..take].copy_from_slice(&input[start..start + take]);

            bank.apply_analysis(&raw, &mut windowed);
            fft.forward(&mut windowed, &mut frame.spectrum).unwrap();
            frame.output_gain.fill(1.0);

            ola.render(&frame, &fft, &bank, &mut chunk).unwrap();
            output.extend_from_slice(&chunk);
        }

        assert_eq!(output.len(), len);
        let interior = window..len - window;
        let rms: f64 = input[interior.clone()]
            .iter()
            .map(|&s| (s as f64).powi(2))
            .sum::<f64>()
            .sqrt();
        let err: f64 = input[interior.clone()]
            .iter()
            .zip(&output[interior])
            .map(|(&a, &b)| ((a - b) as f64).powi(2))
            .sum::<f64>()
            .sqrt();
        assert!(err / rms < 1e-5, "relative reconstruction error {}", err / rms);
    }

    #[test]
    fn zero_gain_silences_output() {
        let window = 256usize;
        let bank = WindowBank::new(window);
        let fft = FftPair::new(window);
        let mut ola = OverlapAdd::new(window);

        let mut frame = Frame::new(fft.bins(), 0);
        let mut windowed = vec![0.5f32; window];
        fft.forward(&mut windowed, &mut frame.spectrum).unwrap();
        // output_gain stays all zero
        let mut chunk = vec![0.0f32; window / 4];
        ola.render(&frame, &fft, &bank, &mut chunk).unwrap();
        assert!(chunk.iter().all(|&s| s == 0.0));
    }
}
