//! Capture synthesis and verification for covertcap
//!
//! This crate ties the channels to the capture format. It includes:
//!
//! - `Synthesizer`: Builds signal, decoy and noise frames for a channel
//! - `SynthConfig`: Seed, start time, noise volume, decoy and ordering settings
//! - `Verifier`: Reads a capture back and decodes it with a channel
//!
//! # Example
//!
//! ```no_run
//! use covertcap_channels::DnsLabelChannel;
//! use covertcap_core::Message;
//! use covertcap_synth::{SynthConfig, Synthesizer, Verifier};
//!
//! fn main() -> covertcap_core::Result<()> {
//!     let channel = DnsLabelChannel::default();
//!     let message = Message::compose("demo123", "TDHCTF{example}");
//!
//!     let synth = Synthesizer::new(SynthConfig::default());
//!     synth.generate_to_file(&channel, &message, "challenge.pcap")?;
//!
//!     let result = Verifier::verify_file("challenge.pcap", &channel)?;
//!     assert!(result.matches(&message));
//!     Ok(())
//! }
//! ```

pub mod synthesizer;
pub mod verifier;

pub use synthesizer::{SynthConfig, Synthesizer, TrafficOrdering, DECOY_FLAG};
pub use verifier::{Verification, Verifier};
