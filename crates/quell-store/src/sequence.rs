//! Growable sample sequences over shared blocks

use quell_dsp::{SampleSink, SampleSource, StreamResult};

use crate::block::{Block, BlockStore, MAX_BLOCK_LEN};
use crate::error::StoreResult;

/// A block positioned within a sequence.
#[derive(Debug, Clone)]
struct SeqBlock {
    /// Sequence position of the block's first sample
    start: u64,
    block: Block,
}

/// A growable, randomly readable, append-at-end mono sample stream
///
/// Samples live in immutable shared blocks plus a small staging buffer for
/// the append edge. Appends seal a block whenever the staging buffer
/// reaches [`MAX_BLOCK_LEN`]; `spill` moves sealed in-memory blocks into a
/// [`BlockStore`] without changing what readers observe.
///
/// Implements the engine's source and sink traits, so a sequence can feed
/// a reduction pass directly and another can collect its output.
#[derive(Debug)]
pub struct SampleSequence {
    blocks: Vec<SeqBlock>,
    staged: Vec<f32>,
    sealed_len: u64,
    max_block_len: usize,
    rate: u32,
}

impl SampleSequence {
    /// Empty sequence at `rate` Hz.
    pub fn new(rate: u32) -> Self {
        Self::with_max_block(rate, MAX_BLOCK_LEN)
    }

    /// Empty sequence with a custom maximum block length.
    pub fn with_max_block(rate: u32, max_block_len: usize) -> Self {
        assert!(max_block_len > 0, "block length must be nonzero");
        Self {
            blocks: Vec::new(),
            staged: Vec::new(),
            sealed_len: 0,
            max_block_len,
            rate,
        }
    }

    /// Sample rate in Hz.
    #[inline]
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Total samples, staged appends included.
    pub fn num_samples(&self) -> u64 {
        self.sealed_len + self.staged.len() as u64
    }

    /// Sealed blocks currently backing the sequence.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Append samples at the end.
    pub fn append(&mut self, samples: &[f32]) {
        self.staged.extend_from_slice(samples);
        while self.staged.len() >= self.max_block_len {
            let rest = self.staged.split_off(self.max_block_len);
            let sealed = std::mem::replace(&mut self.staged, rest);
            self.push_block(Block::Mem(sealed.into()));
        }
    }

    /// Append `len` samples of silence as zero-cost blocks.
    pub fn append_silence(&mut self, len: u64) {
        self.seal_staged();
        let mut remaining = len;
        while remaining > 0 {
            let run = remaining.min(self.max_block_len as u64) as usize;
            self.push_block(Block::Silent { len: run });
            remaining -= run as u64;
        }
    }

    /// Move every sealed in-memory block into `store`.
    pub fn spill(&mut self, store: &BlockStore) -> StoreResult<()> {
        for entry in &mut self.blocks {
            if let Block::Mem(samples) = &entry.block {
                entry.block = store.write_block(samples)?;
            }
        }
        Ok(())
    }

    /// Read samples starting at `start`; positions past the end read as
    /// zeros and flip the returned flag.
    pub fn get(&self, start: u64, out: &mut [f32]) -> StoreResult<bool> {
        let total = self.num_samples();
        out.fill(0.0);
        let past_end = start + out.len() as u64 > total;
        if start >= total {
            return Ok(past_end);
        }

        let mut pos = start;
        let mut filled = 0usize;
        let stop = total.min(start + out.len() as u64);
        while pos < stop {
            let take;
            if pos >= self.sealed_len {
                let at = (pos - self.sealed_len) as usize;
                take = ((stop - pos) as usize).min(self.staged.len() - at);
                out[filled..filled + take].copy_from_slice(&self.staged[at..at + take]);
            } else {
                let entry = &self.blocks[self.find_block(pos)];
                let offset = (pos - entry.start) as usize;
                take = ((stop - pos) as usize).min(entry.block.len() - offset);
                entry
                    .block
                    .read(offset, &mut out[filled..filled + take])?;
            }
            pos += take as u64;
            filled += take;
        }
        Ok(past_end)
    }

    fn push_block(&mut self, block: Block) {
        if block.is_empty() {
            return;
        }
        let start = self.sealed_len;
        self.sealed_len += block.len() as u64;
        self.blocks.push(SeqBlock { start, block });
    }

    fn seal_staged(&mut self) {
        if !self.staged.is_empty() {
            let sealed = std::mem::take(&mut self.staged);
            self.push_block(Block::Mem(sealed.into()));
        }
    }

    /// Index of the sealed block containing `pos`. `pos` must be below
    /// `sealed_len`.
    fn find_block(&self, pos: u64) -> usize {
        debug_assert!(pos < self.sealed_len);
        self.blocks.partition_point(|b| b.start <= pos) - 1
    }
}

impl SampleSource for SampleSequence {
    fn read(&mut self, start: u64, out: &mut [f32]) -> StreamResult<bool> {
        self.get(start, out).map_err(|e| Box::new(e) as _)
    }

    fn rate(&self) -> u32 {
        self.rate
    }

    fn len(&self) -> u64 {
        self.num_samples()
    }
}

impl SampleSink for SampleSequence {
    fn write(&mut self, samples: &[f32]) -> StreamResult<()> {
        self.append(samples);
        Ok(())
    }
}
