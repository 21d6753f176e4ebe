//! Common types used throughout covertcap

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

/// MAC Address (6 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// Create a new MAC address
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Broadcast MAC address (ff:ff:ff:ff:ff:ff)
    pub const fn broadcast() -> Self {
        Self([0xff, 0xff, 0xff, 0xff, 0xff, 0xff])
    }

    /// Zero MAC address (00:00:00:00:00:00)
    pub const fn zero() -> Self {
        Self([0x00, 0x00, 0x00, 0x00, 0x00, 0x00])
    }

    /// Create a MAC address from a slice of exactly six bytes
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; 6] = slice.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Get bytes as slice
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to array
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Check if this is a multicast address (bit 0 of first octet is 1)
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 == 0x01
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 {
            return Err(crate::Error::invalid_parameter(
                "mac",
                "expected six colon-separated octets",
            ));
        }

        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            bytes[i] = u8::from_str_radix(part, 16)
                .map_err(|_| crate::Error::invalid_parameter("mac", "invalid hex octet"))?;
        }

        Ok(MacAddr(bytes))
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(bytes: [u8; 6]) -> Self {
        MacAddr(bytes)
    }
}

/// One side of a flow: link address, network address and transport port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub mac: MacAddr,
    pub ip: IpAddr,
    pub port: u16,
}

impl Endpoint {
    pub fn new(mac: MacAddr, ip: impl Into<IpAddr>, port: u16) -> Self {
        Self {
            mac,
            ip: ip.into(),
            port,
        }
    }

    /// Same endpoint with a different port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ip {
            IpAddr::V4(ip) => write!(f, "{}:{}", ip, self.port),
            IpAddr::V6(ip) => write!(f, "[{}]:{}", ip, self.port),
        }
    }
}

/// The pattern that separates signal frames from noise on a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalPattern {
    /// Query names must be `<chunk>.<suffix>`
    DomainSuffix(String),
    /// A header value must contain `<marker><chunk>`
    HeaderMarker(String),
    /// Records ride Ethernet/VLAN/IPv4/GRE/IPv6 with this outer pair
    Tunnel {
        outer_client: Ipv4Addr,
        outer_server: Ipv4Addr,
        vlan_id: u16,
    },
    /// Application-data record lengths follow `base + symbol * step`
    RecordLength { base: u16, step: u16 },
}

impl fmt::Display for SignalPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalPattern::DomainSuffix(suffix) => write!(f, "suffix .{}", suffix),
            SignalPattern::HeaderMarker(marker) => write!(f, "marker {}", marker),
            SignalPattern::Tunnel {
                outer_client,
                outer_server,
                vlan_id,
            } => write!(
                f,
                "vlan {} gre {} -> {}",
                vlan_id, outer_client, outer_server
            ),
            SignalPattern::RecordLength { base, step } => {
                write!(f, "record length {} + n*{}", base, step)
            }
        }
    }
}

/// Pre-shared parameters identifying signal frames on one channel
///
/// Encoder and decoder must agree on every field; there is no negotiation.
/// Two streams generated with identical descriptors are indistinguishable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDescriptor {
    /// Sender of the covert data
    pub client: Endpoint,
    /// Receiver of the covert data
    pub server: Endpoint,
    /// Channel-specific matching pattern
    pub pattern: SignalPattern,
}

impl ChannelDescriptor {
    pub fn new(client: Endpoint, server: Endpoint, pattern: SignalPattern) -> Self {
        Self {
            client,
            server,
            pattern,
        }
    }

    /// Exact client-to-server four-tuple match
    pub fn matches_flow(&self, src: IpAddr, dst: IpAddr, sport: u16, dport: u16) -> bool {
        src == self.client.ip
            && dst == self.server.ip
            && sport == self.client.port
            && dport == self.server.port
    }
}

impl fmt::Display for ChannelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.client, self.server, self.pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    #[test]
    fn test_mac_parse_and_display() {
        let mac: MacAddr = "02:42:ac:11:00:02".parse().unwrap();
        assert_eq!(mac.octets(), [0x02, 0x42, 0xac, 0x11, 0x00, 0x02]);
        assert_eq!(mac.to_string(), "02:42:ac:11:00:02");
        assert!("02:42:ac".parse::<MacAddr>().is_err());
        assert!("zz:42:ac:11:00:02".parse::<MacAddr>().is_err());
    }

    #[test]
    fn test_mac_from_slice() {
        assert!(MacAddr::from_slice(&[1, 2, 3, 4, 5, 6]).is_some());
        assert!(MacAddr::from_slice(&[1, 2, 3]).is_none());
        assert!(MacAddr::broadcast().is_multicast());
    }

    #[test]
    fn test_descriptor_matches_flow() {
        let client = Endpoint::new(MacAddr::zero(), Ipv4Addr::new(10, 0, 5, 42), 54321);
        let server = Endpoint::new(MacAddr::zero(), Ipv4Addr::new(10, 0, 5, 53), 53);
        let desc = ChannelDescriptor::new(
            client,
            server,
            SignalPattern::DomainSuffix("blueprint.example.org".into()),
        );

        let c: IpAddr = Ipv4Addr::new(10, 0, 5, 42).into();
        let s: IpAddr = Ipv4Addr::new(10, 0, 5, 53).into();
        assert!(desc.matches_flow(c, s, 54321, 53));
        assert!(!desc.matches_flow(s, c, 53, 54321));
        assert!(!desc.matches_flow(c, s, 54322, 53));
    }

    #[test]
    fn test_endpoint_display() {
        let v4 = Endpoint::new(MacAddr::zero(), Ipv4Addr::new(10, 0, 0, 1), 80);
        assert_eq!(v4.to_string(), "10.0.0.1:80");
        let v6 = Endpoint::new(MacAddr::zero(), Ipv6Addr::LOCALHOST, 443);
        assert_eq!(v6.to_string(), "[::1]:443");
    }
}
