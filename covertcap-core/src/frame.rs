//! Frame types

/// Where a frame came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Carries part of the covert message
    Signal,
    /// Uses the channel grammar with different parameters
    Decoy,
    /// Cover traffic
    Noise,
    /// Read back from a capture file; origin unknown
    Captured,
}

/// A single link-layer frame with its capture timestamp
///
/// Built once and not modified afterwards; the synthesizer only reorders
/// frames or moves their timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Capture time in microseconds since the Unix epoch
    pub timestamp_us: u64,
    /// Frame bytes starting at the Ethernet header
    pub data: Vec<u8>,
    /// Origin of the frame
    pub kind: FrameKind,
}

impl Frame {
    /// Create a new frame
    pub fn new(timestamp_us: u64, data: Vec<u8>, kind: FrameKind) -> Self {
        Self {
            timestamp_us,
            data,
            kind,
        }
    }

    /// Create a signal frame
    pub fn signal(timestamp_us: u64, data: Vec<u8>) -> Self {
        Self::new(timestamp_us, data, FrameKind::Signal)
    }

    /// Create a noise frame
    pub fn noise(timestamp_us: u64, data: Vec<u8>) -> Self {
        Self::new(timestamp_us, data, FrameKind::Noise)
    }

    /// Create a frame read from a capture file
    pub fn captured(timestamp_us: u64, data: Vec<u8>) -> Self {
        Self::new(timestamp_us, data, FrameKind::Captured)
    }

    /// Same frame relabelled
    pub fn with_kind(mut self, kind: FrameKind) -> Self {
        self.kind = kind;
        self
    }

    /// Get frame data as slice
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get frame length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if frame is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Timestamp split into whole seconds and the microsecond remainder
    pub fn ts_parts(&self) -> (u32, u32) {
        (
            (self.timestamp_us / 1_000_000) as u32,
            (self.timestamp_us % 1_000_000) as u32,
        )
    }
}

/// Sort frames by capture time, keeping stream order for equal timestamps
pub fn sort_by_timestamp(frames: &mut [Frame]) {
    frames.sort_by_key(|f| f.timestamp_us);
}
