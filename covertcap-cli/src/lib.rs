//! CLI interface for covertcap
//!
//! This crate provides the command-line interface for covertcap:
//! argument parsing, help text and the subcommand handlers behind the
//! `covertcap` binary.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};
pub use commands::{run, Outcome};
