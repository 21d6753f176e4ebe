//! Covert channel codecs for covertcap
//!
//! Each channel hides a byte message in ordinary-looking frames and gets it
//! back from an arbitrary, possibly shuffled, frame set. Each channel module
//! includes:
//! - Frame construction and field extraction
//! - The codec itself, implementing [`CovertChannel`]
//! - Cover traffic and a decoy stream with the same grammar
//!
//! ## Available Channels
//!
//! ### DNS label chunking (`dns`)
//! URL-safe Base64 chunks in the leftmost label of DNS query names.
//! See [`dns_label`] module for details.
//!
//! ### HTTP header chunking (`http`)
//! URL-safe Base64 chunks after a marker in the `User-Agent` of keep-alive
//! HTTP requests.
//! See [`http_header`] module for details.
//!
//! ### IP-ID / TCP timestamp XOR (`ipid`)
//! One masked byte per GRE-tunnelled TCP segment, split between the outer
//! IPv4 identification and the TCP timestamp option.
//! See [`ipid_timestamp`] module for details.
//!
//! ### TLS record length (`tls`)
//! One Base32 symbol per application-data record length.
//! See [`tls_length`] module for details.
//!
//! [`CovertChannel`]: covertcap_core::CovertChannel

pub mod chunking;
pub mod dns_label;
pub mod flow;
pub mod hosts;
pub mod http_header;
pub mod ipid_timestamp;
pub mod registry;
pub mod tls_length;

pub use dns_label::DnsLabelChannel;
pub use http_header::HttpHeaderChannel;
pub use ipid_timestamp::IpidTimestampChannel;
pub use registry::{ChannelInfo, ChannelRegistry};
pub use tls_length::{RecordSeries, TlsLengthChannel};
