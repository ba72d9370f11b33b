//! Reduction parameter bundle

use serde::{Deserialize, Serialize};

use crate::error::{DenoiseError, DenoiseResult};

/// Noise-reduction parameters
///
/// The full set of knobs recognized by both passes. All fields have the
/// defaults a first-time caller would want; `validate` is invoked by the
/// engine at the top of every pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReduceParams {
    /// Attenuation applied to bins classified as noise (dB, >= 0).
    /// Applied as `10^(-noise_gain_db / 20)`; 0 dB is pass-through.
    pub noise_gain_db: f64,
    /// Threshold offset (dB). Higher values raise the per-bin thresholds
    /// and classify more content as noise.
    pub sensitivity_db: f64,
    /// Frequency-axis smoothing radius for the signal mask (Hz, >= 0)
    pub smoothing_hz: f64,
    /// Look-back window for temporal smoothing (frames)
    pub attack_frames: u32,
    /// Look-ahead window for temporal smoothing (frames)
    pub decay_frames: u32,
}

impl Default for ReduceParams {
    fn default() -> Self {
        Self {
            noise_gain_db: 12.0,
            sensitivity_db: 6.0,
            smoothing_hz: 150.0,
            attack_frames: 3,
            decay_frames: 3,
        }
    }
}

impl ReduceParams {
    /// Check every field against its documented range.
    pub fn validate(&self) -> DenoiseResult<()> {
        if !self.noise_gain_db.is_finite() || self.noise_gain_db < 0.0 {
            return Err(DenoiseError::InvalidParam(format!(
                "noise_gain_db must be finite and >= 0, got {}",
                self.noise_gain_db
            )));
        }
        if !self.sensitivity_db.is_finite() {
            return Err(DenoiseError::InvalidParam(format!(
                "sensitivity_db must be finite, got {}",
                self.sensitivity_db
            )));
        }
        if !self.smoothing_hz.is_finite() || self.smoothing_hz < 0.0 {
            return Err(DenoiseError::InvalidParam(format!(
                "smoothing_hz must be finite and >= 0, got {}",
                self.smoothing_hz
            )));
        }
        Ok(())
    }

    /// Linear gain applied to noise bins.
    pub fn reduction_gain(&self) -> f32 {
        10.0_f32.powf(-(self.noise_gain_db as f32) / 20.0)
    }

    /// Threshold offset as a multiplier of the per-bin deviation.
    pub fn sigma_multiplier(&self) -> f64 {
        self.sensitivity_db / 10.0
    }
}
