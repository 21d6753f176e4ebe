//! Subcommand handlers
//!
//! Each handler writes its report to the given writer so the binary can
//! hand it stdout while tests capture the output.

use crate::args::Commands;
use covertcap_capture::{read_capture, CaptureStats};
use covertcap_channels::ChannelRegistry;
use covertcap_core::{Message, Result};
use covertcap_synth::{SynthConfig, Synthesizer, Verifier};
use std::io::Write;
use tracing::info;

/// How a command finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// `verify` found nothing on the channel
    NoSignal,
}

/// Run a subcommand against the built-in channels
pub fn run<W: Write>(command: &Commands, out: &mut W) -> Result<Outcome> {
    let registry = ChannelRegistry::with_defaults();

    match command {
        Commands::Generate {
            channel,
            key,
            flag,
            output,
            seed,
            noise,
            start,
            no_decoy,
            order,
        } => {
            let channel = registry.get(channel)?;
            let config = SynthConfig::default()
                .with_seed(*seed)
                .with_start_us(start.saturating_mul(1_000_000))
                .with_noise_frames(*noise)
                .with_decoy(!no_decoy)
                .with_ordering(*order);

            let message = Message::compose(key, flag);
            let stats = Synthesizer::new(config).generate_to_file(channel, &message, output)?;
            info!(path = %output.display(), channel = channel.shortname(), "generation complete");

            writeln!(out, "Wrote {} ({})", output.display(), channel.name())?;
            writeln!(out, "{}", stats.format())?;
            Ok(Outcome::Success)
        }

        Commands::Verify {
            channel,
            input,
            fields,
        } => {
            let channel = registry.get(channel)?;
            let result = Verifier::verify_file(input, channel)?;
            if result.recovered.is_empty() {
                return Ok(Outcome::NoSignal);
            }

            let parsed = result.recovered.fields();
            if let Some(flag) = &parsed.flag {
                info!(channel = channel.shortname(), flag = %flag, "flag recovered");
            }
            if *fields {
                writeln!(out, "key: {}", parsed.key.as_deref().unwrap_or("-"))?;
                writeln!(out, "flag: {}", parsed.flag.as_deref().unwrap_or("-"))?;
                return Ok(Outcome::Success);
            }

            let text = result.recovered.text();
            write!(out, "{}", text)?;
            if !text.ends_with('\n') {
                writeln!(out)?;
            }
            Ok(Outcome::Success)
        }

        Commands::Channels => {
            for channel in registry.list() {
                writeln!(out, "{:<6} {:<28} {}", channel.shortname, channel.name, channel.descriptor)?;
            }
            Ok(Outcome::Success)
        }

        Commands::Inspect { input } => {
            let frames = read_capture(input)?;
            let stats = CaptureStats::from_frames(&frames);
            writeln!(out, "{}", input.display())?;
            writeln!(out, "{}", stats.format())?;

            for name in registry.shortnames() {
                let recovered = registry.get(name)?.decode(&frames);
                writeln!(out, "{:<6} {} matching frames", name, recovered.matched_frames)?;
            }
            Ok(Outcome::Success)
        }
    }
}
