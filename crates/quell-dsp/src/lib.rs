//! Quell spectral noise reduction
//!
//! Two-phase broadband noise removal for mono PCM streams:
//!
//! ## Profiling
//! - Per-bin log-power statistics over a noise-only reference segment
//! - Sealed, immutable profiles with derived classification thresholds
//! - Optional versioned binary persistence
//!
//! ## Reduction
//! - 75%-overlap STFT with exact-reconstruction window pair
//! - Per-bin gating against the profile with adjustable sensitivity
//! - Frequency-axis smoothing of the signal mask
//! - Attack/decay temporal smoothing over a frame history ring
//! - Overlap-add resynthesis preserving stream length exactly
//!
//! The engine reads from a [`SampleSource`] and appends to a
//! [`SampleSink`]; decode, encode and storage live behind those traits
//! (see the `quell-store` crate for a block-backed implementation).
//! Multi-channel material is handled as one pass per channel, typically
//! sharing the profile built from the reference's first channel.
//!
//! ```no_run
//! use quell_dsp::{CancelToken, Engine, MemorySink, MemorySource, ReduceParams};
//!
//! # fn main() -> Result<(), quell_dsp::DenoiseError> {
//! let mut engine = Engine::new(2048)?;
//! let params = ReduceParams::default();
//! let cancel = CancelToken::new();
//!
//! let mut reference = MemorySource::new(vec![0.0; 44100], 44100);
//! engine.get_profile(&mut reference, 0.0, 1.0, &params, &cancel)?;
//!
//! let mut noisy = MemorySource::new(vec![0.0; 88200], 44100);
//! let mut cleaned = MemorySink::new();
//! engine.reduce_noise(&mut noisy, &mut cleaned, &params, &cancel)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod classify;
pub mod engine;
pub mod fft;
pub mod frame;
pub mod gain;
pub mod params;
pub mod stats;
pub mod stream;
pub mod window;

mod error;

pub use classify::Classifier;
pub use engine::{Engine, MAX_WINDOW_SIZE, MIN_WINDOW_SIZE};
pub use error::{DenoiseError, DenoiseResult, StreamError};
pub use fft::FftPair;
pub use frame::{Frame, FrameRing, CLASS_NOISE, CLASS_SIGNAL};
pub use gain::OverlapAdd;
pub use params::ReduceParams;
pub use stats::{NoiseProfile, NoiseStats};
pub use stream::{
    CancelToken, InterleavedSource, MemorySink, MemorySource, SampleSink, SampleSource,
    StreamResult,
};
pub use window::WindowBank;
