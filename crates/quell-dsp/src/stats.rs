//! Per-bin noise statistics and the sealed profile

use crate::error::{DenoiseError, DenoiseResult};
use crate::frame::Frame;

/// Floor added before taking logs, preventing `ln 0`.
pub const LOG_EPSILON: f64 = 1e-6;

/// Magic bytes of a serialized profile blob.
const PROFILE_MAGIC: &[u8; 4] = b"NRPF";
/// Current blob format version.
const PROFILE_VERSION: u16 = 1;

/// Accumulator for per-bin magnitude statistics during profiling
///
/// Collects, for each bin, the running sum of `ln(|X|^2 + eps)` and of its
/// square, in f64 for stability across long profile segments. Sealing
/// derives the mean and deviation without consuming the accumulator, so
/// sealing twice yields identical profiles.
#[derive(Debug, Clone)]
pub struct NoiseStats {
    sum_log: Vec<f64>,
    sum_log_sq: Vec<f64>,
    frames: u64,
    window_size: usize,
}

impl NoiseStats {
    /// Empty accumulator for `window_size / 2 + 1` bins.
    pub fn new(window_size: usize) -> Self {
        let bins = window_size / 2 + 1;
        Self {
            sum_log: vec![0.0; bins],
            sum_log_sq: vec![0.0; bins],
            frames: 0,
            window_size,
        }
    }

    /// Fold one profiling frame into the accumulator.
    pub fn accumulate(&mut self, frame: &Frame) {
        debug_assert_eq!(frame.bins(), self.sum_log.len());
        for (k, &msq) in frame.magnitude_squared.iter().enumerate() {
            let log = (msq as f64 + LOG_EPSILON).ln();
            self.sum_log[k] += log;
            self.sum_log_sq[k] += log * log;
        }
        self.frames += 1;
    }

    /// Frames accumulated so far.
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Derive the immutable profile. Pure: the accumulator is untouched and
    /// a second call returns the same profile.
    pub fn seal(&self) -> DenoiseResult<NoiseProfile> {
        if self.frames == 0 {
            return Err(DenoiseError::NoProfileData);
        }
        let n = self.frames as f64;
        let mean_log: Vec<f64> = self.sum_log.iter().map(|&s| s / n).collect();
        let stdev_log: Vec<f64> = self
            .sum_log_sq
            .iter()
            .zip(&mean_log)
            .map(|(&sq, &mean)| (sq / n - mean * mean).max(0.0).sqrt())
            .collect();

        Ok(NoiseProfile {
            mean_log,
            stdev_log,
            frames: self.frames,
            window_size: self.window_size,
        })
    }
}

/// Sealed per-bin noise statistics
///
/// Immutable once built. Thresholds are derived on demand; they are
/// monotone in the sensitivity parameter because `stdev_log` is
/// non-negative.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseProfile {
    mean_log: Vec<f64>,
    stdev_log: Vec<f64>,
    frames: u64,
    window_size: usize,
}

impl NoiseProfile {
    /// Mean of `ln(|X|^2 + eps)` per bin.
    #[inline]
    pub fn mean_log(&self) -> &[f64] {
        &self.mean_log
    }

    /// Deviation of `ln(|X|^2 + eps)` per bin.
    #[inline]
    pub fn stdev_log(&self) -> &[f64] {
        &self.stdev_log
    }

    /// Number of spectral bins.
    #[inline]
    pub fn bins(&self) -> usize {
        self.mean_log.len()
    }

    /// Analysis window size the profile was built with.
    #[inline]
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Frames that contributed to the profile.
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Classification threshold for bin `k` in the log-power domain.
    #[inline]
    pub fn threshold(&self, k: usize, sensitivity_db: f64) -> f64 {
        self.mean_log[k] + (sensitivity_db / 10.0) * self.stdev_log[k]
    }

    /// Serialize to the versioned binary blob format.
    ///
    /// Layout, all little-endian: magic `"NRPF"`, `u16` version, `u32`
    /// window size, `u32` bin count, then the mean and deviation arrays as
    /// `f64` each.
    pub fn to_bytes(&self) -> Vec<u8> {
        let bins = self.bins();
        let mut out = Vec::with_capacity(4 + 2 + 4 + 4 + bins * 16);
        out.extend_from_slice(PROFILE_MAGIC);
        out.extend_from_slice(&PROFILE_VERSION.to_le_bytes());
        out.extend_from_slice(&(self.window_size as u32).to_le_bytes());
        out.extend_from_slice(&(bins as u32).to_le_bytes());
        for &v in &self.mean_log {
            out.extend_from_slice(&v.to_le_bytes());
        }
        for &v in &self.stdev_log {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    /// Decode a blob produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> DenoiseResult<Self> {
        let header_len = 4 + 2 + 4 + 4;
        if bytes.len() < header_len {
            return Err(DenoiseError::ProfileFormat("truncated header".into()));
        }
        if &bytes[0..4] != PROFILE_MAGIC {
            return Err(DenoiseError::ProfileFormat("bad magic".into()));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != PROFILE_VERSION {
            return Err(DenoiseError::ProfileFormat(format!(
                "unsupported version {version}"
            )));
        }
        let window_size = u32::from_le_bytes(bytes[6..10].try_into().unwrap()) as usize;
        let bins = u32::from_le_bytes(bytes[10..14].try_into().unwrap()) as usize;
        if bins != window_size / 2 + 1 {
            return Err(DenoiseError::ProfileFormat(format!(
                "bin count {bins} does not match window size {window_size}"
            )));
        }
        let expected = header_len + bins * 16;
        if bytes.len() != expected {
            return Err(DenoiseError::ProfileFormat(format!(
                "expected {expected} bytes, got {}",
                bytes.len()
            )));
        }

        let read_f64s = |offset: usize| -> Vec<f64> {
            (0..bins)
                .map(|i| {
                    let at = offset + i * 8;
                    f64::from_le_bytes(bytes[at..at + 8].try_into().unwrap())
                })
                .collect()
        };
        let mean_log = read_f64s(header_len);
        let stdev_log = read_f64s(header_len + bins * 8);

        Ok(Self {
            mean_log,
            stdev_log,
            frames: 0,
            window_size,
        })
    }
}
