//! Traffic synthesizer
//!
//! The `Synthesizer` turns a message into a complete capture for one
//! channel. A capture is built in three passes that share one
//! `EncodeContext`:
//!
//! - the signal stream, encoded at the configured start time
//! - a decoy stream one second later, carrying a fake flag with the
//!   channel's decoy parameters; generation fails if either decoder picks
//!   up the other stream
//! - cover traffic from the channel's own noise model
//!
//! The combined frames are then ordered according to [`TrafficOrdering`].

use covertcap_capture::{write_capture, CaptureStats, PcapConfig};
use covertcap_core::{
    sort_by_timestamp, CovertChannel, EncodeContext, Error, Frame, FrameKind, Result,
    DEFAULT_START_US,
};
use rand::seq::SliceRandom;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Message carried by every decoy stream
pub const DECOY_FLAG: &str = "TDHCTF{this_is_a_decoy_flag_do_not_submit}";

/// Delay between the start of the signal and the start of the decoy
pub const DECOY_OFFSET_US: u64 = 1_000_000;

/// Upper bound of the jitter added to non-signal frames
pub const MAX_JITTER_US: u64 = 2_000;

/// Default number of cover frames
pub const DEFAULT_NOISE_FRAMES: usize = 2000;

/// Default generator seed
pub const DEFAULT_SEED: u64 = 1337;

/// How the combined frames are laid out in the capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrafficOrdering {
    /// Sorted by timestamp, with up to 2 ms jitter on decoy and noise frames
    Jittered,
    /// Stream order randomly permuted, timestamps untouched
    #[default]
    Shuffled,
}

impl fmt::Display for TrafficOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrafficOrdering::Jittered => write!(f, "jittered"),
            TrafficOrdering::Shuffled => write!(f, "shuffled"),
        }
    }
}

impl FromStr for TrafficOrdering {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "jittered" => Ok(TrafficOrdering::Jittered),
            "shuffled" => Ok(TrafficOrdering::Shuffled),
            _ => Err(Error::invalid_parameter(
                "ordering".to_string(),
                format!("unknown ordering '{}' (expected jittered or shuffled)", s),
            )),
        }
    }
}

/// Synthesizer settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthConfig {
    /// Seed of the generator driving every random choice
    pub seed: u64,
    /// Timestamp of the first signal frame, in microseconds
    pub start_us: u64,
    /// Number of cover frames
    pub noise_frames: usize,
    /// Whether a decoy stream is added
    pub decoy: bool,
    pub ordering: TrafficOrdering,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            start_us: DEFAULT_START_US,
            noise_frames: DEFAULT_NOISE_FRAMES,
            decoy: true,
            ordering: TrafficOrdering::default(),
        }
    }
}

impl SynthConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_start_us(mut self, start_us: u64) -> Self {
        self.start_us = start_us;
        self
    }

    pub fn with_noise_frames(mut self, noise_frames: usize) -> Self {
        self.noise_frames = noise_frames;
        self
    }

    pub fn with_decoy(mut self, decoy: bool) -> Self {
        self.decoy = decoy;
        self
    }

    pub fn with_ordering(mut self, ordering: TrafficOrdering) -> Self {
        self.ordering = ordering;
        self
    }
}

/// Builds signal, decoy and noise frames for a channel
#[derive(Debug, Clone, Default)]
pub struct Synthesizer {
    config: SynthConfig,
}

impl Synthesizer {
    pub fn new(config: SynthConfig) -> Self {
        debug!(seed = config.seed, ordering = %config.ordering, "Creating new Synthesizer");
        Self { config }
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Generate the full frame set carrying `message` over `channel`
    ///
    /// # Arguments
    ///
    /// * `channel` - The codec that carries the message
    /// * `message` - Raw message bytes, usually built with `Message::compose`
    ///
    /// # Returns
    ///
    /// Frames in capture order. Identical configurations produce identical output.
    pub fn generate(&self, channel: &dyn CovertChannel, message: &[u8]) -> Result<Vec<Frame>> {
        let config = &self.config;
        let mut ctx = EncodeContext::seeded(config.seed, config.start_us);

        info!(
            channel = channel.shortname(),
            message_len = message.len(),
            seed = config.seed,
            "encoding signal"
        );
        let mut frames = channel.encode(message, &mut ctx)?;
        let signal_end = ctx.now();

        if config.decoy {
            ctx.set_clock(config.start_us + DECOY_OFFSET_US);
            let decoy = channel.decoy();
            let decoy_frames = decoy.encode(DECOY_FLAG.as_bytes(), &mut ctx)?;
            if !channel.decode(&decoy_frames).is_empty() || !decoy.decode(&frames).is_empty() {
                warn!(
                    channel = channel.shortname(),
                    signal = %channel.descriptor(),
                    decoy = %decoy.descriptor(),
                    "decoy stream overlaps the signal"
                );
                return Err(Error::invalid_parameter(
                    "decoy".to_string(),
                    format!(
                        "decoy {} cannot be told apart from signal {}",
                        decoy.descriptor(),
                        channel.descriptor()
                    ),
                ));
            }
            debug!(
                channel = channel.shortname(),
                descriptor = %decoy.descriptor(),
                frames = decoy_frames.len(),
                "encoded decoy stream"
            );
            frames.extend(decoy_frames.into_iter().map(|f| f.with_kind(FrameKind::Decoy)));
        }

        ctx.set_clock(signal_end.max(ctx.now()));
        frames.extend(channel.noise(config.noise_frames, &mut ctx)?);

        apply_ordering(&mut frames, config.ordering, &mut ctx);

        let stats = CaptureStats::from_frames(&frames);
        info!(
            channel = channel.shortname(),
            frames = stats.frames,
            signal = stats.signal_frames,
            decoy = stats.decoy_frames,
            noise = stats.noise_frames,
            ordering = %config.ordering,
            "synthesized capture"
        );
        Ok(frames)
    }

    /// Generate frames and write them to a PCAP file at `path`
    pub fn generate_to_file<P: AsRef<Path>>(
        &self,
        channel: &dyn CovertChannel,
        message: &[u8],
        path: P,
    ) -> Result<CaptureStats> {
        let frames = self.generate(channel, message)?;
        write_capture(path.as_ref(), &frames, PcapConfig::default())?;
        info!(path = %path.as_ref().display(), frames = frames.len(), "wrote capture");
        Ok(CaptureStats::from_frames(&frames))
    }
}

fn apply_ordering(frames: &mut [Frame], ordering: TrafficOrdering, ctx: &mut EncodeContext) {
    match ordering {
        TrafficOrdering::Jittered => {
            sort_by_timestamp(frames);
            for frame in frames.iter_mut().filter(|f| f.kind != FrameKind::Signal) {
                frame.timestamp_us += ctx.gen_range(0..=MAX_JITTER_US);
            }
        }
        TrafficOrdering::Shuffled => frames.shuffle(ctx.rng()),
    }
}
