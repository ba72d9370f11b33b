//! Profiling and reduction passes over one channel

use crate::classify::Classifier;
use crate::error::{DenoiseError, DenoiseResult};
use crate::fft::FftPair;
use crate::frame::{Frame, FrameRing};
use crate::gain::OverlapAdd;
use crate::params::ReduceParams;
use crate::stats::{NoiseProfile, NoiseStats};
use crate::stream::{CancelToken, SampleSink, SampleSource};
use crate::window::WindowBank;

/// Smallest supported analysis window.
pub const MIN_WINDOW_SIZE: usize = 256;
/// Largest supported analysis window.
pub const MAX_WINDOW_SIZE: usize = 65536;

/// Profile installed by a successful profiling pass.
#[derive(Debug, Clone)]
struct SealedProfile {
    profile: NoiseProfile,
    rate: u32,
}

/// Two-phase noise-reduction engine for one channel
///
/// Create it once per window size, point `get_profile` at a noise-only
/// segment of reference audio, then run `reduce_noise` over any number of
/// sources recorded at the same rate. An engine owns all of its working
/// state; instances operating on disjoint data need no coordination, but a
/// single instance's methods are not re-entrant.
pub struct Engine {
    window_size: usize,
    step_size: usize,
    bank: WindowBank,
    fft: FftPair,
    profile: Option<SealedProfile>,
}

impl Engine {
    /// Build an engine for `window_size` (a power of two in
    /// `[MIN_WINDOW_SIZE, MAX_WINDOW_SIZE]`).
    pub fn new(window_size: usize) -> DenoiseResult<Self> {
        if !window_size.is_power_of_two()
            || !(MIN_WINDOW_SIZE..=MAX_WINDOW_SIZE).contains(&window_size)
        {
            return Err(DenoiseError::InvalidWindowSize(window_size));
        }
        Ok(Self {
            window_size,
            step_size: window_size / 4,
            bank: WindowBank::new(window_size),
            fft: FftPair::new(window_size),
            profile: None,
        })
    }

    /// Analysis window length in samples.
    #[inline]
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Hop length in samples (75% overlap).
    #[inline]
    pub fn step_size(&self) -> usize {
        self.step_size
    }

    /// Whether a sealed profile is installed.
    #[inline]
    pub fn is_profiled(&self) -> bool {
        self.profile.is_some()
    }

    /// The sealed profile, when one is installed.
    pub fn profile(&self) -> Option<&NoiseProfile> {
        self.profile.as_ref().map(|s| &s.profile)
    }

    /// Install a profile obtained elsewhere (e.g. deserialized from a
    /// blob). The profile's window size must match the engine's.
    pub fn import_profile(&mut self, profile: NoiseProfile, rate: u32) -> DenoiseResult<()> {
        if profile.window_size() != self.window_size {
            return Err(DenoiseError::InvalidParam(format!(
                "profile window size {} does not match engine window size {}",
                profile.window_size(),
                self.window_size
            )));
        }
        if rate == 0 {
            return Err(DenoiseError::InvalidParam("sample rate must be nonzero".into()));
        }
        self.profile = Some(SealedProfile { profile, rate });
        Ok(())
    }

    /// Profiling pass: derive per-bin noise statistics from
    /// `[t_start, t_end]` seconds of `source` and seal them.
    ///
    /// On success the engine holds the new profile. On failure any prior
    /// profile is dropped, except on `Cancelled`, which restores the state
    /// the engine had before the call.
    pub fn get_profile(
        &mut self,
        source: &mut dyn SampleSource,
        t_start: f64,
        t_end: f64,
        params: &ReduceParams,
        cancel: &CancelToken,
    ) -> DenoiseResult<()> {
        params.validate()?;
        let rate = check_source(source)?;

        let total = source.len();
        let s0 = time_to_sample(t_start, rate).min(total);
        let s1 = time_to_sample(t_end, rate).min(total);
        let have = s1.saturating_sub(s0);
        if have < self.window_size as u64 {
            self.profile = None;
            return Err(DenoiseError::ProfileTooShort {
                have,
                need: self.window_size,
            });
        }

        let prior = self.profile.take();
        match self.profile_pass(source, s0, s1, cancel) {
            Ok(stats) => {
                self.profile = Some(SealedProfile {
                    profile: stats.seal()?,
                    rate,
                });
                Ok(())
            }
            Err(DenoiseError::Cancelled) => {
                self.profile = prior;
                Err(DenoiseError::Cancelled)
            }
            Err(e) => Err(e),
        }
    }

    fn profile_pass(
        &mut self,
        source: &mut dyn SampleSource,
        s0: u64,
        s1: u64,
        cancel: &CancelToken,
    ) -> DenoiseResult<NoiseStats> {
        let mut stats = NoiseStats::new(self.window_size);
        let mut raw = vec![0.0f32; self.window_size];
        let mut windowed = vec![0.0f32; self.window_size];
        let mut frame = Frame::new(self.fft.bins(), s0);

        let mut pos = s0;
        while pos + self.window_size as u64 <= s1 {
            if cancel.is_cancelled() {
                return Err(DenoiseError::Cancelled);
            }
            source.read(pos, &mut raw).map_err(DenoiseError::Source)?;
            self.bank.apply_analysis(&raw, &mut windowed);
            self.fft.forward(&mut windowed, &mut frame.spectrum)?;
            frame.update_magnitudes();
            frame.start = pos;
            stats.accumulate(&frame);
            pos += self.step_size as u64;
        }
        Ok(stats)
    }

    /// Reduction pass: stream `source` through the gate and append the
    /// result to `sink`. Output length equals input length exactly.
    ///
    /// Requires a sealed profile recorded at the source's rate. Reduction
    /// failures leave the profile untouched; on `Cancelled` or a sink
    /// failure the sink may hold a prefix of the output.
    pub fn reduce_noise(
        &mut self,
        source: &mut dyn SampleSource,
        sink: &mut dyn SampleSink,
        params: &ReduceParams,
        cancel: &CancelToken,
    ) -> DenoiseResult<()> {
        params.validate()?;
        let sealed = self.profile.as_ref().ok_or(DenoiseError::NoProfile)?;
        let rate = check_source(source)?;
        if rate != sealed.rate {
            return Err(DenoiseError::InvalidParam(format!(
                "source rate {} does not match profile rate {}",
                rate, sealed.rate
            )));
        }

        let attack = params.attack_frames as usize;
        let decay = params.decay_frames as usize;
        let step = self.step_size as u64;
        let total = source.len();
        let total_windows = (total.div_ceil(step)) as usize;

        let mut classifier = Classifier::new(&sealed.profile, params, rate);
        let mut ring = FrameRing::new(attack + 1 + decay);
        let mut ola = OverlapAdd::new(self.window_size);
        let mut raw = vec![0.0f32; self.window_size];
        let mut windowed = vec![0.0f32; self.window_size];
        let mut chunk = vec![0.0f32; self.step_size];

        let mut rendered = 0usize;
        let mut emitted = 0u64;

        // One push per input window, then zero frames to drain the tail.
        for i in 0..total_windows + attack + decay {
            if rendered == total_windows {
                break;
            }
            if cancel.is_cancelled() {
                return Err(DenoiseError::Cancelled);
            }

            let start = i as u64 * step;
            let mut frame = Frame::new(self.fft.bins(), start);
            if i < total_windows {
                source.read(start, &mut raw).map_err(DenoiseError::Source)?;
            } else {
                raw.fill(0.0);
            }
            self.bank.apply_analysis(&raw, &mut windowed);
            self.fft.forward(&mut windowed, &mut frame.spectrum)?;
            frame.update_magnitudes();
            classifier.classify(&mut frame);

            if i < total_windows {
                ring.push(frame);
            } else {
                // Draining: the slot ahead of every remaining middle has
                // already been decided, so bounded pushes must succeed.
                if ring.len() == ring.capacity() {
                    ring.pop_front();
                }
                ring.try_push(frame)?;
            }

            if ring.middle_index(decay).is_some() && rendered < total_windows {
                let middle = classifier.decide(&mut ring)?;
                let decided = ring
                    .get(middle)
                    .ok_or_else(|| DenoiseError::Internal("decided frame missing".into()))?;
                ola.render(decided, &self.fft, &self.bank, &mut chunk)?;

                let take = (total - emitted).min(step) as usize;
                sink.write(&chunk[..take]).map_err(DenoiseError::Sink)?;
                emitted += take as u64;
                rendered += 1;
            }
        }

        if rendered != total_windows || emitted != total {
            return Err(DenoiseError::Internal(format!(
                "rendered {rendered}/{total_windows} windows, emitted {emitted}/{total} samples"
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("window_size", &self.window_size)
            .field("step_size", &self.step_size)
            .field("profiled", &self.profile.is_some())
            .finish()
    }
}

/// Nearest sample index to `t` seconds at `rate`.
fn time_to_sample(t: f64, rate: u32) -> u64 {
    let sample = (t * rate as f64 + 0.5).floor();
    if sample <= 0.0 {
        0
    } else {
        sample as u64
    }
}

fn check_source(source: &dyn SampleSource) -> DenoiseResult<u32> {
    if source.channels() != 1 {
        return Err(DenoiseError::InvalidParam(format!(
            "engine processes one channel per pass, source has {}",
            source.channels()
        )));
    }
    let rate = source.rate();
    if rate == 0 {
        return Err(DenoiseError::InvalidParam("sample rate must be nonzero".into()));
    }
    Ok(rate)
}
