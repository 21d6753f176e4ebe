//! CLI argument parsing

use clap::{Parser, Subcommand};
use covertcap_synth::TrafficOrdering;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "covertcap")]
#[command(version, about = "Covert channel capture generator and verifier", long_about = None)]
pub struct Cli {
    /// Verbose output (-v, -vv, -vvv for increasing verbosity)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a capture carrying KEY and FLAG over a covert channel
    Generate {
        /// Channel short name (dns, http, ipid, tls)
        #[arg(short, long, default_value = "dns")]
        channel: String,

        /// Challenge key
        #[arg(short, long, env = "CHALLENGE_KEY")]
        key: String,

        /// Flag to hide
        #[arg(short, long)]
        flag: String,

        /// Output PCAP path
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Generator seed
        #[arg(short, long, default_value_t = 1337)]
        seed: u64,

        /// Number of cover frames
        #[arg(short, long, default_value_t = 2000)]
        noise: usize,

        /// Capture start time in seconds since the Unix epoch
        #[arg(long, value_name = "SECONDS", default_value_t = 1_700_000_000)]
        start: u64,

        /// Leave out the decoy stream
        #[arg(long)]
        no_decoy: bool,

        /// Frame ordering (jittered, shuffled)
        #[arg(long, default_value = "shuffled")]
        order: TrafficOrdering,
    },

    /// Decode a capture with a channel and print the recovered message
    Verify {
        /// Channel short name (dns, http, ipid, tls)
        #[arg(short, long, default_value = "dns")]
        channel: String,

        /// Input PCAP path
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print only the parsed key and flag
        #[arg(long)]
        fields: bool,
    },

    /// List available channels and their parameters
    Channels,

    /// Print capture statistics and per-channel matches
    Inspect {
        /// Input PCAP path
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Default log filter for the verbosity count
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate() {
        let cli = Cli::try_parse_from([
            "covertcap", "-vv", "generate", "--channel", "tls", "--key", "k1", "--flag",
            "TDHCTF{x}", "-o", "out.pcap", "--noise", "10", "--no-decoy", "--order", "jittered",
        ])
        .unwrap();
        assert_eq!(cli.log_level(), "debug");
        match cli.command {
            Commands::Generate {
                channel,
                key,
                noise,
                no_decoy,
                order,
                seed,
                ..
            } => {
                assert_eq!(channel, "tls");
                assert_eq!(key, "k1");
                assert_eq!(noise, 10);
                assert!(no_decoy);
                assert_eq!(order, TrafficOrdering::Jittered);
                assert_eq!(seed, 1337);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_order() {
        let result = Cli::try_parse_from([
            "covertcap", "generate", "--key", "k", "--flag", "f", "-o", "o.pcap", "--order",
            "sorted",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_verify_and_inspect() {
        let cli = Cli::try_parse_from(["covertcap", "verify", "-c", "ipid", "in.pcap"]).unwrap();
        assert_eq!(cli.log_level(), "warn");
        assert!(matches!(
            cli.command,
            Commands::Verify { ref channel, fields: false, .. } if channel == "ipid"
        ));

        let cli = Cli::try_parse_from(["covertcap", "verify", "--fields", "in.pcap"]).unwrap();
        assert!(matches!(cli.command, Commands::Verify { fields: true, .. }));

        let cli = Cli::try_parse_from(["covertcap", "inspect", "in.pcap", "-vvvv"]).unwrap();
        assert_eq!(cli.log_level(), "trace");
        assert!(matches!(cli.command, Commands::Inspect { .. }));
    }
}
