//! Capture file support for covertcap
//!
//! Reads and writes classic PCAP 2.4 files with microsecond timestamps and
//! Ethernet link type, and summarises frame sets.
//!
//! ## Features
//!
//! - **Writer**: streams frames in the order given, rejecting frames larger
//!   than the snapshot length instead of truncating them
//! - **Reader**: accepts native and byte-swapped files and reports the byte
//!   offset of a truncated record
//! - **Statistics**: frame counts, byte totals and time span
//!
//! ## Example
//!
//! ```no_run
//! use covertcap_capture::{read_capture, write_capture, CaptureStats, PcapConfig};
//! use covertcap_core::Frame;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let frames = vec![Frame::signal(1_700_000_000_000_000, vec![0u8; 60])];
//! write_capture("out.pcap", &frames, PcapConfig::default())?;
//!
//! let back = read_capture("out.pcap")?;
//! println!("{}", CaptureStats::from_frames(&back).format());
//! # Ok(())
//! # }
//! ```

pub mod pcap;
pub mod stats;

// Re-export main types
pub use pcap::{
    read_capture, write_capture, PcapConfig, PcapReader, PcapWriter, DEFAULT_SNAPLEN,
    LINKTYPE_ETHERNET,
};
pub use stats::CaptureStats;
