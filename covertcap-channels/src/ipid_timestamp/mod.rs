//! IP-ID / TCP timestamp XOR side channel
//!
//! One GRE-tunnelled TCP segment per message byte. The byte is masked
//! with a key taken from the transport ports and the byte's position,
//! then split between two header fields that look random on their own:
//!
//! | field                          | content                    |
//! |--------------------------------|----------------------------|
//! | outer IPv4 identification, low | `c ^ ts_low`               |
//! | TCP timestamp value, low       | `ts_low` (random)          |
//! | inner IPv6 flow label, low 12  | byte index                 |
//!
//! with `c = p ^ ((sport ^ dport) & 0xFF) ^ (i & 0xFF)`. Anyone who finds
//! the flow can derive the key from the ports.
//!
//! Decoding needs the exact VLAN, both outer and inner address pairs and
//! the port pair. Records are placed by index, so any arrival order works
//! and a corrupted record damages only its own byte.

pub mod channel;
pub mod noise;
pub mod packet;


pub use channel::IpidTimestampChannel;
pub use packet::{xor_key, MAX_MESSAGE_LEN};
