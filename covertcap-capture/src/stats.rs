//! Capture statistics

use covertcap_core::{Frame, FrameKind};
use std::time::Duration;

/// Summary of a set of frames
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Number of frames
    pub frames: u64,
    /// Total frame bytes, excluding record headers
    pub bytes: u64,
    /// Earliest timestamp in microseconds
    pub first_timestamp_us: Option<u64>,
    /// Latest timestamp in microseconds
    pub last_timestamp_us: Option<u64>,
    pub signal_frames: u64,
    pub decoy_frames: u64,
    pub noise_frames: u64,
    pub captured_frames: u64,
    /// Frames whose timestamp is lower than the one before them
    pub out_of_order: u64,
    previous: Option<u64>,
}

impl CaptureStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_frames(frames: &[Frame]) -> Self {
        let mut stats = Self::new();
        for frame in frames {
            stats.record(frame);
        }
        stats
    }

    /// Account for one more frame
    pub fn record(&mut self, frame: &Frame) {
        if let Some(last) = self.previous {
            if frame.timestamp_us < last {
                self.out_of_order += 1;
            }
        }

        self.frames += 1;
        self.bytes += frame.len() as u64;
        self.first_timestamp_us = Some(
            self.first_timestamp_us
                .map_or(frame.timestamp_us, |t| t.min(frame.timestamp_us)),
        );
        self.last_timestamp_us = Some(
            self.last_timestamp_us
                .map_or(frame.timestamp_us, |t| t.max(frame.timestamp_us)),
        );
        self.previous = Some(frame.timestamp_us);

        match frame.kind {
            FrameKind::Signal => self.signal_frames += 1,
            FrameKind::Decoy => self.decoy_frames += 1,
            FrameKind::Noise => self.noise_frames += 1,
            FrameKind::Captured => self.captured_frames += 1,
        }
    }

    /// Span between the first and last timestamp
    pub fn duration(&self) -> Duration {
        match (self.first_timestamp_us, self.last_timestamp_us) {
            (Some(first), Some(last)) => Duration::from_micros(last - first),
            _ => Duration::ZERO,
        }
    }

    pub fn average_frame_size(&self) -> f64 {
        if self.frames == 0 {
            return 0.0;
        }
        self.bytes as f64 / self.frames as f64
    }

    /// Format statistics as human-readable string
    pub fn format(&self) -> String {
        let mut out = format!(
            "Frames: {} ({} bytes, avg {:.1})\n\
             Duration: {:.3}s",
            self.frames,
            self.bytes,
            self.average_frame_size(),
            self.duration().as_secs_f64(),
        );

        if let (Some(first), Some(last)) = (self.first_timestamp_us, self.last_timestamp_us) {
            out.push_str(&format!(
                "\nFirst: {}.{:06}\nLast: {}.{:06}",
                first / 1_000_000,
                first % 1_000_000,
                last / 1_000_000,
                last % 1_000_000
            ));
        }
        if self.out_of_order > 0 {
            out.push_str(&format!("\nOut of order: {}", self.out_of_order));
        }

        let kinds = [
            ("signal", self.signal_frames),
            ("decoy", self.decoy_frames),
            ("noise", self.noise_frames),
            ("captured", self.captured_frames),
        ];
        for (name, count) in kinds.iter().filter(|(_, c)| *c > 0) {
            out.push_str(&format!("\n  {}: {}", name, count));
        }
        out
    }
}
