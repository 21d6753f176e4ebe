//! Print a summary of a capture file
//!
//! Usage: cargo run --example capture_summary -- <file.pcap>

use covertcap_capture::{PcapReader, CaptureStats};
use std::fs::File;
use std::io::BufReader;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .ok_or("usage: capture_summary <file.pcap>")?;

    let reader = PcapReader::new(BufReader::new(File::open(&path)?))?;
    println!("{} (snaplen {})", path, reader.snaplen());

    let mut stats = CaptureStats::new();
    for frame in reader {
        let frame = frame?;
        stats.record(&frame);
    }

    println!("{}", stats.format());
    Ok(())
}
