//! Per-bin noise/signal classification

use crate::error::{DenoiseError, DenoiseResult};
use crate::frame::{Frame, FrameRing, CLASS_NOISE, CLASS_SIGNAL};
use crate::params::ReduceParams;
use crate::stats::{NoiseProfile, LOG_EPSILON};

/// Per-bin gating decisions for one reduction pass
///
/// Built once per pass from the sealed profile and the parameter bundle.
/// Classification runs in two stages: each frame is classified on entry to
/// the ring (instantaneous threshold compare, then frequency-axis dilation
/// of the signal mask), and the final gain of the middle frame is the
/// maximum of the base gains across its temporal neighborhood, so nearby
/// signal frames open the gate early and hold it open.
#[derive(Debug)]
pub struct Classifier {
    thresholds: Vec<f64>,
    dilate_bins: usize,
    g_reduce: f32,
    attack: usize,
    decay: usize,
    mask_scratch: Vec<u8>,
    open_scratch: Vec<bool>,
}

impl Classifier {
    /// Precompute thresholds and constants for one pass.
    pub fn new(profile: &NoiseProfile, params: &ReduceParams, sample_rate: u32) -> Self {
        let thresholds: Vec<f64> = (0..profile.bins())
            .map(|k| profile.threshold(k, params.sensitivity_db))
            .collect();
        let dilate_bins = (params.smoothing_hz * profile.window_size() as f64
            / sample_rate as f64)
            .round() as usize;

        Self {
            thresholds,
            dilate_bins,
            g_reduce: params.reduction_gain(),
            attack: params.attack_frames as usize,
            decay: params.decay_frames as usize,
            mask_scratch: vec![CLASS_NOISE; profile.bins()],
            open_scratch: vec![false; profile.bins()],
        }
    }

    /// Frequency-axis dilation radius in bins.
    #[inline]
    pub fn dilate_bins(&self) -> usize {
        self.dilate_bins
    }

    /// Linear gain applied to noise bins.
    #[inline]
    pub fn reduction_gain(&self) -> f32 {
        self.g_reduce
    }

    /// Stage one: fill `frame.classification`.
    ///
    /// A bin is signal when its log power reaches the profile threshold;
    /// the signal mask is then spread `dilate_bins` bins along the
    /// frequency axis in both directions. Bin 0 and Nyquist receive no
    /// special treatment.
    pub fn classify(&mut self, frame: &mut Frame) {
        debug_assert_eq!(frame.bins(), self.thresholds.len());

        for (k, flag) in frame.classification.iter_mut().enumerate() {
            let log = (frame.magnitude_squared[k] as f64 + LOG_EPSILON).ln();
            *flag = if log < self.thresholds[k] {
                CLASS_NOISE
            } else {
                CLASS_SIGNAL
            };
        }

        let radius = self.dilate_bins;
        if radius == 0 {
            return;
        }

        self.mask_scratch.copy_from_slice(&frame.classification);
        let mut since_signal = radius + 1;
        for (flag, &raw) in frame.classification.iter_mut().zip(&self.mask_scratch) {
            since_signal = if raw == CLASS_SIGNAL {
                0
            } else {
                since_signal.saturating_add(1)
            };
            if since_signal <= radius {
                *flag = CLASS_SIGNAL;
            }
        }
        let mut since_signal = radius + 1;
        for (flag, &raw) in frame
            .classification
            .iter_mut()
            .rev()
            .zip(self.mask_scratch.iter().rev())
        {
            since_signal = if raw == CLASS_SIGNAL {
                0
            } else {
                since_signal.saturating_add(1)
            };
            if since_signal <= radius {
                *flag = CLASS_SIGNAL;
            }
        }
    }

    /// Stage two: write the final per-bin gains of the middle frame.
    ///
    /// For each bin the applied gain is the maximum of the base gains of
    /// the frames at offsets `-attack ..= decay` around the middle (the
    /// middle counts on both sides); neighbors that do not exist at the
    /// stream edges count as noise. Returns the middle index.
    pub fn decide(&mut self, ring: &mut FrameRing) -> DenoiseResult<usize> {
        let middle = ring
            .middle_index(self.decay)
            .ok_or_else(|| DenoiseError::Internal("gain decision before ring warm-up".into()))?;

        let lo = middle.saturating_sub(self.attack);
        let hi = (middle + self.decay).min(ring.len() - 1);

        self.open_scratch.fill(false);
        for i in lo..=hi {
            let frame = ring
                .get(i)
                .ok_or_else(|| DenoiseError::Internal(format!("ring slot {i} missing")))?;
            for (open, &flag) in self.open_scratch.iter_mut().zip(&frame.classification) {
                *open |= flag == CLASS_SIGNAL;
            }
        }

        let g_reduce = self.g_reduce;
        let frame = ring
            .get_mut(middle)
            .ok_or_else(|| DenoiseError::Internal("middle slot missing".into()))?;
        for (gain, &open) in frame.output_gain.iter_mut().zip(&self.open_scratch) {
            *gain = if open { 1.0 } else { g_reduce };
        }
        Ok(middle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::NoiseStats;

    const WINDOW: usize = 256;
    const BINS: usize = WINDOW / 2 + 1;

    /// Profile whose every bin has mean log power of `power` and a small
    /// spread, from two alternating profiling frames.
    fn profile_around(power: f32) -> NoiseProfile {
        let mut stats = NoiseStats::new(WINDOW);
        for scale in [0.5f32, 2.0] {
            let mut frame = Frame::new(BINS, 0);
            frame.magnitude_squared.fill(power * scale);
            stats.accumulate(&frame);
        }
        stats.seal().unwrap()
    }

    fn params_no_smoothing() -> ReduceParams {
        ReduceParams {
            smoothing_hz: 0.0,
            sensitivity_db: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn instantaneous_split_around_threshold() {
        let profile = profile_around(0.01);
        let mut classifier = Classifier::new(&profile, &params_no_smoothing(), 44100);

        let mut frame = Frame::new(BINS, 0);
        frame.magnitude_squared.fill(1.0); // far above the profile
        classifier.classify(&mut frame);
        assert!(frame.classification.iter().all(|&c| c == CLASS_SIGNAL));

        frame.magnitude_squared.fill(1e-5); // far below
        classifier.classify(&mut frame);
        assert!(frame.classification.iter().all(|&c| c == CLASS_NOISE));
    }

    #[test]
    fn dilation_spreads_signal_mask() {
        let profile = profile_around(0.01);
        let params = ReduceParams {
            // radius = round(smoothing_hz * window / rate) = 4 bins
            smoothing_hz: 4.0 * 44100.0 / WINDOW as f64,
            sensitivity_db: 0.0,
            ..Default::default()
        };
        let mut classifier = Classifier::new(&profile, &params, 44100);
        assert_eq!(classifier.dilate_bins(), 4);

        let mut frame = Frame::new(BINS, 0);
        frame.magnitude_squared.fill(1e-5);
        frame.magnitude_squared[60] = 1.0;
        classifier.classify(&mut frame);

        for k in 0..BINS {
            let expected = (56..=64).contains(&k);
            assert_eq!(
                frame.classification[k] == CLASS_SIGNAL,
                expected,
                "bin {k}"
            );
        }
    }

    #[test]
    fn dilation_clamps_at_spectrum_edges() {
        let profile = profile_around(0.01);
        let params = ReduceParams {
            smoothing_hz: 4.0 * 44100.0 / WINDOW as f64,
            sensitivity_db: 0.0,
            ..Default::default()
        };
        let mut classifier = Classifier::new(&profile, &params, 44100);

        let mut frame = Frame::new(BINS, 0);
        frame.magnitude_squared.fill(1e-5);
        frame.magnitude_squared[0] = 1.0;
        frame.magnitude_squared[BINS - 1] = 1.0;
        classifier.classify(&mut frame);

        for k in 0..BINS {
            let expected = k <= 4 || k >= BINS - 5;
            assert_eq!(frame.classification[k] == CLASS_SIGNAL, expected, "bin {k}");
        }
    }

    #[test]
    fn noise_bin_count_monotone_in_sensitivity() {
        let profile = profile_around(0.01);

        // Mixed frame: a spread of powers across bins.
        let mut frame = Frame::new(BINS, 0);
        for k in 0..BINS {
            frame.magnitude_squared[k] = 0.001 * 1.1f32.powi((k % 64) as i32);
        }

        let mut last_count = 0usize;
        for sens in [0.0, 3.0, 6.0, 12.0, 24.0, 48.0] {
            let params = ReduceParams {
                sensitivity_db: sens,
                smoothing_hz: 0.0,
                ..Default::default()
            };
            let mut classifier = Classifier::new(&profile, &params, 44100);
            classifier.classify(&mut frame);
            let count = frame
                .classification
                .iter()
                .filter(|&&c| c == CLASS_NOISE)
                .count();
            assert!(
                count >= last_count,
                "noise count fell from {last_count} to {count} at {sens} dB"
            );
            last_count = count;
        }
    }

    #[test]
    fn neighbor_signal_holds_gate_open() {
        let profile = profile_around(0.01);
        let params = ReduceParams {
            smoothing_hz: 0.0,
            sensitivity_db: 0.0,
            attack_frames: 1,
            decay_frames: 1,
            noise_gain_db: 20.0,
        };
        let mut classifier = Classifier::new(&profile, &params, 44100);
        let g_reduce = classifier.reduction_gain();

        // Three frames: loud, quiet, quiet. Deciding the middle (quiet)
        // frame must keep bins open because of the loud look-back neighbor.
        let mut ring = FrameRing::new(3);
        for power in [1.0f32, 1e-5, 1e-5] {
            let mut frame = Frame::new(BINS, 0);
            frame.magnitude_squared.fill(power);
            classifier.classify(&mut frame);
            ring.push(frame);
        }

        let middle = classifier.decide(&mut ring).unwrap();
        assert_eq!(middle, 1);
        let decided = ring.get(middle).unwrap();
        assert!(decided.output_gain.iter().all(|&g| g == 1.0));

        // A further quiet frame pushes the loud one out of reach.
        let mut frame = Frame::new(BINS, 0);
        frame.magnitude_squared.fill(1e-5);
        classifier.classify(&mut frame);
        ring.push(frame);

        let middle = classifier.decide(&mut ring).unwrap();
        let decided = ring.get(middle).unwrap();
        assert!(decided.output_gain.iter().all(|&g| g == g_reduce));
    }

    #[test]
    fn missing_neighbors_count_as_noise() {
        let profile = profile_around(0.01);
        let params = ReduceParams {
            smoothing_hz: 0.0,
            sensitivity_db: 0.0,
            attack_frames: 2,
            decay_frames: 0,
            noise_gain_db: 12.0,
        };
        let mut classifier = Classifier::new(&profile, &params, 44100);
        let g_reduce = classifier.reduction_gain();

        let mut ring = FrameRing::new(3);
        let mut frame = Frame::new(BINS, 0);
        frame.magnitude_squared.fill(1e-5);
        classifier.classify(&mut frame);
        ring.push(frame);

        // Only one quiet frame live: both attack neighbors are missing and
        // the gate stays closed.
        let middle = classifier.decide(&mut ring).unwrap();
        assert_eq!(middle, 0);
        let decided = ring.get(middle).unwrap();
        assert!(decided.output_gain.iter().all(|&g| g == g_reduce));
    }
}
