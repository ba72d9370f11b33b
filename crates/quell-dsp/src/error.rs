//! Error types for the noise-reduction core

use thiserror::Error;

/// Boxed error produced by a sample source or sink collaborator.
pub type StreamError = Box<dyn std::error::Error + Send + Sync>;

/// Noise-reduction error types
///
/// Every failure the core can report. The engine never logs or retries;
/// each variant is surfaced to the immediate caller and the engine is left
/// in the state documented on the operation that failed.
#[derive(Error, Debug)]
pub enum DenoiseError {
    /// Window size is not a power of two, or outside [256, 65536]
    #[error("invalid window size: {0} (must be a power of two in 256..=65536)")]
    InvalidWindowSize(usize),

    /// Profiling interval holds fewer samples than one analysis window
    #[error("profile interval too short: {have} samples, need at least {need}")]
    ProfileTooShort {
        /// Samples in the requested interval
        have: u64,
        /// Samples required for one window
        need: usize,
    },

    /// Statistics were sealed with zero accumulated frames
    #[error("no profile data accumulated")]
    NoProfileData,

    /// Reduction was requested before a profile was sealed
    #[error("no noise profile: call get_profile first")]
    NoProfile,

    /// A parameter is out of range
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// The sample source failed
    #[error("source read failed: {0}")]
    Source(#[source] StreamError),

    /// The sample sink failed
    #[error("sink write failed: {0}")]
    Sink(#[source] StreamError),

    /// The pass was cancelled via its `CancelToken`
    #[error("cancelled")]
    Cancelled,

    /// Bounded push into a full frame ring
    #[error("frame ring full")]
    BufferFull,

    /// A serialized profile blob could not be decoded
    #[error("malformed profile blob: {0}")]
    ProfileFormat(String),

    /// Unexpected internal state; indicates a bug
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

/// Result type for noise-reduction operations
pub type DenoiseResult<T> = Result<T, DenoiseError>;
