//! Sample stream collaborators and cancellation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::StreamError;

/// Result type for stream collaborators.
pub type StreamResult<T> = Result<T, StreamError>;

/// Random-access mono sample stream consumed by the engine
///
/// Reads must fill the whole buffer: positions past the end of the stream
/// are zero-filled and flagged by the `true` return. Implementations are
/// synchronous; the engine performs bounded work between calls.
pub trait SampleSource {
    /// Fill `out` with samples starting at `start`. Returns `true` when the
    /// read extended past the end of the stream.
    fn read(&mut self, start: u64, out: &mut [f32]) -> StreamResult<bool>;

    /// Sample rate in Hz.
    fn rate(&self) -> u32;

    /// Stream length in samples.
    fn len(&self) -> u64;

    /// True when the stream holds no samples.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Channel count of the underlying material. The engine processes one
    /// channel per pass and rejects sources reporting more than one.
    fn channels(&self) -> u32 {
        1
    }
}

/// Append-only sample sink fed by the engine
pub trait SampleSink {
    /// Append `samples` at the end of the stream.
    fn write(&mut self, samples: &[f32]) -> StreamResult<()>;
}

/// Cooperative cancellation flag
///
/// Cheap to clone; the engine polls it once per input frame. A token never
/// un-cancels.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, untripped token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the token; every pass holding a clone observes it.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether the token has been tripped.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Contiguous in-memory mono source
#[derive(Debug, Clone)]
pub struct MemorySource {
    samples: Vec<f32>,
    rate: u32,
}

impl MemorySource {
    /// Wrap `samples` at `rate` Hz.
    pub fn new(samples: Vec<f32>, rate: u32) -> Self {
        Self { samples, rate }
    }

    /// Borrow the backing samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
}

impl SampleSource for MemorySource {
    fn read(&mut self, start: u64, out: &mut [f32]) -> StreamResult<bool> {
        read_from_slice(&self.samples, start, out)
    }

    fn rate(&self) -> u32 {
        self.rate
    }

    fn len(&self) -> u64 {
        self.samples.len() as u64
    }
}

/// Growable in-memory sink
#[derive(Debug, Default)]
pub struct MemorySink {
    samples: Vec<f32>,
}

impl MemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow everything written so far.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Consume the sink, returning the written samples.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

impl SampleSink for MemorySink {
    fn write(&mut self, samples: &[f32]) -> StreamResult<()> {
        self.samples.extend_from_slice(samples);
        Ok(())
    }
}

/// One channel of an interleaved multi-channel buffer
///
/// The thin bridge for material stored interleaved: positions are in
/// per-channel frames, and each read de-interleaves on the fly.
#[derive(Debug, Clone)]
pub struct InterleavedSource {
    data: Arc<Vec<f32>>,
    channels: u32,
    channel: u32,
    rate: u32,
}

impl InterleavedSource {
    /// View `channel` of interleaved `data` with `channels` channels.
    /// `data.len()` must be a multiple of `channels`.
    pub fn new(data: Arc<Vec<f32>>, channels: u32, channel: u32, rate: u32) -> Self {
        assert!(channels > 0 && channel < channels);
        assert_eq!(data.len() % channels as usize, 0);
        Self {
            data,
            channels,
            channel,
            rate,
        }
    }
}

impl SampleSource for InterleavedSource {
    fn read(&mut self, start: u64, out: &mut [f32]) -> StreamResult<bool> {
        let frames = self.len();
        let mut past_end = false;
        for (i, slot) in out.iter_mut().enumerate() {
            let frame = start + i as u64;
            if frame < frames {
                let at = frame as usize * self.channels as usize + self.channel as usize;
                *slot = self.data[at];
            } else {
                *slot = 0.0;
                past_end = true;
            }
        }
        Ok(past_end)
    }

    fn rate(&self) -> u32 {
        self.rate
    }

    fn len(&self) -> u64 {
        (self.data.len() / self.channels as usize) as u64
    }
}

/// Shared zero-fill read out of a contiguous slice.
pub(crate) fn read_from_slice(samples: &[f32], start: u64, out: &mut [f32]) -> StreamResult<bool> {
    let len = samples.len() as u64;
    let mut past_end = false;
    for (i, slot) in out.iter_mut().enumerate() {
        let pos = start + i as u64;
        if pos < len {
            *slot = samples[pos as usize];
        } else {
            *slot = 0.0;
            past_end = true;
        }
    }
    Ok(past_end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_zero_fills_past_end() {
        let mut source = MemorySource::new(vec![1.0, 2.0, 3.0], 44100);
        let mut buf = [0.0f32; 5];

        let eof = source.read(1, &mut buf).unwrap();
        assert!(eof);
        assert_eq!(buf, [2.0, 3.0, 0.0, 0.0, 0.0]);

        let eof = source.read(0, &mut buf[..2]).unwrap();
        assert!(!eof);
        assert_eq!(&buf[..2], &[1.0, 2.0]);
    }

    #[test]
    fn memory_sink_appends() {
        let mut sink = MemorySink::new();
        sink.write(&[1.0, 2.0]).unwrap();
        sink.write(&[3.0]).unwrap();
        assert_eq!(sink.samples(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn interleaved_source_picks_channel() {
        // Two channels: L = 1,3,5  R = 2,4,6
        let data = Arc::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let mut right = InterleavedSource::new(data, 2, 1, 48000);
        assert_eq!(right.len(), 3);

        let mut buf = [0.0f32; 4];
        let eof = right.read(0, &mut buf).unwrap();
        assert!(eof);
        assert_eq!(buf, [2.0, 4.0, 6.0, 0.0]);
    }

    #[test]
    fn cancel_token_propagates() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
