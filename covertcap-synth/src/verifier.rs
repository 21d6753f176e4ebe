//! Capture verification
//!
//! Reads a capture back from disk and runs a channel's decoder over it,
//! the same way a solver would.

use covertcap_capture::{read_capture, CaptureStats};
use covertcap_core::{sort_by_timestamp, CovertChannel, Frame, RecoveredMessage, Result};
use std::path::Path;
use tracing::{info, warn};

/// Outcome of decoding a capture
#[derive(Debug, Clone)]
pub struct Verification {
    pub recovered: RecoveredMessage,
    pub stats: CaptureStats,
}

impl Verification {
    /// True when the recovered bytes equal `expected`
    pub fn matches(&self, expected: &[u8]) -> bool {
        self.recovered.bytes == expected
    }
}

/// Decodes captures with a given channel
pub struct Verifier;

impl Verifier {
    /// Read the PCAP at `path`, sort it by timestamp and decode it
    pub fn verify_file<P: AsRef<Path>>(path: P, channel: &dyn CovertChannel) -> Result<Verification> {
        let path = path.as_ref();
        let frames = read_capture(path)?;
        info!(path = %path.display(), frames = frames.len(), "read capture");
        Ok(Self::verify_frames(frames, channel))
    }

    /// Decode an in-memory frame set
    pub fn verify_frames(mut frames: Vec<Frame>, channel: &dyn CovertChannel) -> Verification {
        sort_by_timestamp(&mut frames);
        let stats = CaptureStats::from_frames(&frames);
        let recovered = channel.decode(&frames);

        if recovered.is_empty() {
            warn!(channel = channel.shortname(), frames = frames.len(), "no signal recovered");
        } else {
            info!(
                channel = channel.shortname(),
                matched = recovered.matched_frames,
                bytes = recovered.bytes.len(),
                "recovered message"
            );
        }
        Verification { recovered, stats }
    }
}
