//! Error types for the sample store

use thiserror::Error;

/// Sample store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying file I/O failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A block read was asked for samples the block does not hold
    #[error("read of {len} samples at offset {offset} exceeds block of {block_len}")]
    ReadBeyondBlock {
        /// Requested offset within the block
        offset: usize,
        /// Requested sample count
        len: usize,
        /// Samples the block holds
        block_len: usize,
    },

    /// A block file on disk does not match its recorded length
    #[error("block file {path} holds {actual} bytes, expected {expected}")]
    BlockFileMismatch {
        /// Offending file
        path: String,
        /// Bytes expected from the block length
        expected: u64,
        /// Bytes found on disk
        actual: u64,
    },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
