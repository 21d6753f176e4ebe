//! Covert channel trait

use crate::{ChannelDescriptor, EncodeContext, Frame, RecoveredMessage, Result};

/// Main trait that all covert channel codecs implement
///
/// `decode(&encode(m))` must return `m` for every message the channel can
/// carry, regardless of the order the frames are handed back in.
pub trait CovertChannel {
    /// Full name of the channel (e.g., "DNS label chunking")
    fn name(&self) -> &'static str;

    /// Short name used in CLI (e.g., "dns")
    fn shortname(&self) -> &'static str;

    /// Pre-shared parameters identifying signal frames
    fn descriptor(&self) -> &ChannelDescriptor;

    /// Turn a message into signal frames
    ///
    /// Timestamps are taken from `ctx`'s clock, which starts at the
    /// context's capture start.
    fn encode(&self, message: &[u8], ctx: &mut EncodeContext) -> Result<Vec<Frame>>;

    /// Recover a message from an arbitrary, possibly shuffled frame set
    fn decode(&self, frames: &[Frame]) -> RecoveredMessage;

    /// Produce `count` cover-traffic frames that look like this channel's protocol
    fn noise(&self, count: usize, ctx: &mut EncodeContext) -> Result<Vec<Frame>>;

    /// A second channel with the same grammar and disjoint parameters
    fn decoy(&self) -> Box<dyn CovertChannel>;
}
