//! DNS label chunking
//!
//! The message travels as URL-safe Base64 in the leftmost label of DNS
//! query names, one UDP query per chunk:
//!
//! ```text
//! 10.0.5.42:54321 -> 10.0.5.53:53   A? S0VZOmRlbW.blueprint.professor.royalmint.local
//! 10.0.5.42:54321 -> 10.0.5.53:53   A? 8xMjMKRkxB.blueprint.professor.royalmint.local
//! ...
//! ```
//!
//! ## Signal
//!
//! - Exact client/server address and port pair from the descriptor
//! - Query name `<chunk>.<suffix>`, chunk case preserved
//! - Queries 200 ms apart plus up to 100 ms jitter; IPv4 identification
//!   counts up from 1000
//!
//! ## Cover traffic
//!
//! Corporate lookups between random hosts, `<random>.draft.<base>` queries
//! to the same resolver, and an HTTP beacon flow from the signal client.
//!
//! ## Decoy
//!
//! Host `.99` of the client subnet on the next port, under
//! `backup.<base>`.

pub mod channel;
pub mod noise;
pub mod packet;

#[cfg(test)]
mod tests;

pub use channel::DnsLabelChannel;
pub use packet::{CHUNK_SIZE, DEFAULT_SUFFIX};
