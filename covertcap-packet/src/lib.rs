//! Packet construction and parsing library for covertcap
//!
//! This crate builds and parses the frames covertcap hides data in, from
//! layer 2 (Ethernet) up to the application records carried over UDP and
//! TCP. It includes support for:
//!
//! - **Ethernet II frames** padded to the 60-byte minimum
//! - **802.1Q VLAN** tags
//! - **IPv4** and **IPv6** packets, with header checksums and length checks
//! - **GRE** tunnels carrying IPv6
//! - **UDP** and **TCP** with pseudo-header checksums and TCP options
//! - **DNS** queries with compression-aware name parsing
//! - **HTTP/1.1** request/response text and **TLS** record framing
//!
//! # Architecture
//!
//! - [`builder`] - High-level fluent API for frame construction
//! - [`dissect`] - Layer-by-layer parsing of captured frames
//! - [`checksum`] - Internet checksum calculation utilities
//! - [`ethernet`], [`vlan`], [`ip`], [`ipv6`], [`gre`], [`udp`], [`tcp`] -
//!   individual headers
//! - [`dns`], [`http`], [`tls`] - application payloads
//!
//! # Quick Start
//!
//! ## Building a DNS query frame
//!
//! ```rust
//! use std::net::Ipv4Addr;
//! use covertcap_core::MacAddr;
//! use covertcap_packet::{DnsQuery, PacketBuilder};
//!
//! let query = DnsQuery::new(0x1234, "www.example.org").to_bytes().unwrap();
//!
//! let frame = PacketBuilder::new()
//!     .ethernet(MacAddr([0x02, 0x42, 0xac, 0x11, 0x00, 0x10]), MacAddr([0x02, 0x42, 0xac, 0x11, 0x00, 0x11]))
//!     .ipv4(Ipv4Addr::new(10, 0, 5, 42), Ipv4Addr::new(10, 0, 5, 53))
//!     .udp(54321, 53)
//!     .payload(query)
//!     .build()
//!     .unwrap();
//! ```
//!
//! ## Reading it back
//!
//! ```rust
//! # use std::net::Ipv4Addr;
//! # use covertcap_core::MacAddr;
//! # use covertcap_packet::{DnsQuery, PacketBuilder};
//! # let query = DnsQuery::new(0x1234, "www.example.org").to_bytes().unwrap();
//! # let frame = PacketBuilder::new()
//! #     .ethernet(MacAddr::zero(), MacAddr::zero())
//! #     .ipv4(Ipv4Addr::new(10, 0, 5, 42), Ipv4Addr::new(10, 0, 5, 53))
//! #     .udp(54321, 53)
//! #     .payload(query)
//! #     .build()
//! #     .unwrap();
//! use covertcap_packet::Dissection;
//!
//! let d = Dissection::from_frame(&frame).unwrap();
//! assert_eq!(d.ports(), Some((54321, 53)));
//! let parsed = DnsQuery::from_bytes(d.payload()).unwrap();
//! assert_eq!(parsed.qname, "www.example.org");
//! ```

pub mod builder;
pub mod checksum;
pub mod dissect;
pub mod dns;
pub mod ethernet;
pub mod gre;
pub mod http;
pub mod ip;
pub mod ipv6;
pub mod tcp;
pub mod tls;
pub mod udp;
pub mod vlan;

// Re-export commonly used types for convenience
pub use builder::PacketBuilder;
pub use checksum::{checksum16, internet_checksum, pseudo_header_checksum};
pub use dissect::{Dissection, Ipv4Info, Ipv6Info, Transport};
pub use dns::DnsQuery;
pub use ethernet::{EtherType, EthernetFrame};
pub use gre::GrePacket;
pub use http::{HttpRequest, HttpResponse};
pub use ip::{IpProtocol, Ipv4Packet};
pub use ipv6::Ipv6Packet;
pub use tcp::{TcpFlags, TcpOption, TcpPort, TcpSegment};
pub use tls::TlsRecord;
pub use udp::{UdpDatagram, UdpPort};
pub use vlan::{VlanFrame, VlanTag};
