//! Block-backed sample storage for the quell engine
//!
//! A sample sequence is a growable, randomly readable, append-at-end mono
//! stream assembled from immutable, reference-counted blocks:
//!
//! - `Silent` runs that cost no storage
//! - `Mem` blocks sealed from the append staging buffer
//! - `File` blocks spilled to a raw f32 store directory
//!
//! Sequences implement `quell_dsp::SampleSource` and `SampleSink`, so a
//! reduction pass can read from one sequence and append to another without
//! materializing either as a flat buffer.

pub mod block;
pub mod sequence;

mod error;

pub use block::{Block, BlockStore, FileBlock, MAX_BLOCK_LEN};
pub use error::{StoreError, StoreResult};
pub use sequence::SampleSequence;
