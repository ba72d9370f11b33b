//! STFT frames and the fixed-capacity frame history ring

use std::collections::VecDeque;

use rustfft::num_complex::Complex;

use crate::error::{DenoiseError, DenoiseResult};

/// Per-bin flag: the bin is noise.
pub const CLASS_NOISE: u8 = 0;
/// Per-bin flag: the bin is signal.
pub const CLASS_SIGNAL: u8 = 1;

/// One analysis window of the stream in the frequency domain
///
/// `classification` is filled when the frame enters the ring;
/// `output_gain` only once the frame reaches the middle slot and its
/// temporal neighborhood has been consulted.
#[derive(Debug, Clone)]
pub struct Frame {
    /// First sample position this window covers
    pub start: u64,
    /// Complex spectrum, `window_size / 2 + 1` bins
    pub spectrum: Vec<Complex<f32>>,
    /// `|X_k|^2` per bin
    pub magnitude_squared: Vec<f32>,
    /// Per-bin noise/signal flag
    pub classification: Vec<u8>,
    /// Final per-bin gain, set by the classifier
    pub output_gain: Vec<f32>,
}

impl Frame {
    /// Allocate an all-zero frame with `bins` spectral bins.
    pub fn new(bins: usize, start: u64) -> Self {
        Self {
            start,
            spectrum: vec![Complex::new(0.0, 0.0); bins],
            magnitude_squared: vec![0.0; bins],
            classification: vec![CLASS_NOISE; bins],
            output_gain: vec![0.0; bins],
        }
    }

    /// Number of spectral bins.
    #[inline]
    pub fn bins(&self) -> usize {
        self.spectrum.len()
    }

    /// Recompute `magnitude_squared` from `spectrum`.
    pub fn update_magnitudes(&mut self) {
        for (msq, bin) in self.magnitude_squared.iter_mut().zip(&self.spectrum) {
            *msq = bin.norm_sqr();
        }
    }
}

/// Fixed-capacity FIFO of recent frames
///
/// Holds the `attack + 1 + decay` frames the classifier may consult. The
/// producer pushes at the back; `push` silently drops the oldest frame when
/// full, `try_push` refuses instead. Index 0 is the oldest frame.
#[derive(Debug)]
pub struct FrameRing {
    slots: VecDeque<Frame>,
    capacity: usize,
}

impl FrameRing {
    /// Create a ring holding at most `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "frame ring capacity must be nonzero");
        Self {
            slots: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a frame, evicting the oldest when full. Returns the evicted
    /// frame so callers can recycle its buffers.
    pub fn push(&mut self, frame: Frame) -> Option<Frame> {
        let evicted = if self.slots.len() == self.capacity {
            self.slots.pop_front()
        } else {
            None
        };
        self.slots.push_back(frame);
        evicted
    }

    /// Append a frame only if there is room.
    pub fn try_push(&mut self, frame: Frame) -> DenoiseResult<()> {
        if self.slots.len() == self.capacity {
            return Err(DenoiseError::BufferFull);
        }
        self.slots.push_back(frame);
        Ok(())
    }

    /// Remove and return the oldest frame.
    pub fn pop_front(&mut self) -> Option<Frame> {
        self.slots.pop_front()
    }

    /// Frame `i` counted from the oldest.
    #[inline]
    pub fn get(&self, i: usize) -> Option<&Frame> {
        self.slots.get(i)
    }

    /// Mutable access to frame `i`.
    #[inline]
    pub fn get_mut(&mut self, i: usize) -> Option<&mut Frame> {
        self.slots.get_mut(i)
    }

    /// Number of live frames.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when the ring holds no frames.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Maximum number of live frames.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Index of the frame being decided: the newest frame minus
    /// `decay` look-ahead slots. `None` until enough frames have arrived.
    pub fn middle_index(&self, decay: usize) -> Option<usize> {
        self.slots.len().checked_sub(decay + 1)
    }
}
