//! IPv4 packet construction and parsing
//!
//! This module provides functionality for building and parsing IPv4 packets,
//! including header construction and checksum calculation. Options are not
//! emitted; the header length is always five words on the build side.

use crate::checksum::checksum16;
use bytes::{BufMut, BytesMut};
use covertcap_core::{Error, Result};
use std::net::Ipv4Addr;

/// IP Protocol numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpProtocol {
    /// ICMP (1)
    ICMP,
    /// TCP (6)
    TCP,
    /// UDP (17)
    UDP,
    /// GRE (47)
    GRE,
    /// Custom protocol number
    Custom(u8),
}

impl IpProtocol {
    pub fn to_u8(self) -> u8 {
        match self {
            IpProtocol::ICMP => 1,
            IpProtocol::TCP => 6,
            IpProtocol::UDP => 17,
            IpProtocol::GRE => 47,
            IpProtocol::Custom(val) => val,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => IpProtocol::ICMP,
            6 => IpProtocol::TCP,
            17 => IpProtocol::UDP,
            47 => IpProtocol::GRE,
            val => IpProtocol::Custom(val),
        }
    }
}

/// IP Flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IpFlags {
    /// Don't Fragment flag
    pub dont_fragment: bool,
    /// More Fragments flag
    pub more_fragments: bool,
}

impl IpFlags {
    /// No flags set
    pub const NONE: IpFlags = IpFlags {
        dont_fragment: false,
        more_fragments: false,
    };

    /// Don't Fragment flag set
    pub const DONT_FRAGMENT: IpFlags = IpFlags {
        dont_fragment: true,
        more_fragments: false,
    };

    /// Convert to 3-bit value (reserved bit always clear)
    pub fn to_u8(self) -> u8 {
        let mut flags = 0u8;
        if self.dont_fragment {
            flags |= 0b010;
        }
        if self.more_fragments {
            flags |= 0b001;
        }
        flags
    }

    /// Parse from 3-bit value
    pub fn from_u8(value: u8) -> Self {
        IpFlags {
            dont_fragment: (value & 0b010) != 0,
            more_fragments: (value & 0b001) != 0,
        }
    }
}

/// IPv4 packet
#[derive(Debug, Clone)]
pub struct Ipv4Packet {
    /// Type of Service / DSCP byte
    pub tos: u8,
    /// Identification
    pub identification: u16,
    /// Flags
    pub flags: IpFlags,
    /// Time to Live
    pub ttl: u8,
    /// Protocol
    pub protocol: IpProtocol,
    /// Header checksum as parsed; recomputed on every `to_bytes`
    pub checksum: u16,
    /// Source IP address
    pub source: Ipv4Addr,
    /// Destination IP address
    pub destination: Ipv4Addr,
    /// Payload data
    pub payload: Vec<u8>,
}

impl Ipv4Packet {
    /// IPv4 header size without options
    pub const MIN_HEADER_SIZE: usize = 20;

    /// Maximum IPv4 packet size
    pub const MAX_PACKET_SIZE: usize = 65535;

    /// Create a new IPv4 packet
    pub fn new(source: Ipv4Addr, destination: Ipv4Addr, protocol: IpProtocol, payload: Vec<u8>) -> Self {
        Ipv4Packet {
            tos: 0,
            identification: 0,
            flags: IpFlags::NONE,
            ttl: 64,
            protocol,
            checksum: 0,
            source,
            destination,
            payload,
        }
    }

    /// Set the Time to Live
    pub fn with_ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the identification field
    pub fn with_identification(mut self, id: u16) -> Self {
        self.identification = id;
        self
    }

    /// Set the flags
    pub fn with_flags(mut self, flags: IpFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Total length (header + payload) in bytes
    pub fn total_length(&self) -> usize {
        Self::MIN_HEADER_SIZE + self.payload.len()
    }

    fn header_bytes(&self, checksum: u16) -> BytesMut {
        let mut buffer = BytesMut::with_capacity(Self::MIN_HEADER_SIZE);

        // Version 4, IHL 5
        buffer.put_u8(0x45);
        buffer.put_u8(self.tos);
        buffer.put_u16(self.total_length() as u16);
        buffer.put_u16(self.identification);
        buffer.put_u16((self.flags.to_u8() as u16) << 13);
        buffer.put_u8(self.ttl);
        buffer.put_u8(self.protocol.to_u8());
        buffer.put_u16(checksum);
        buffer.put_slice(&self.source.octets());
        buffer.put_slice(&self.destination.octets());

        buffer
    }

    /// Calculate the header checksum over the current field values
    pub fn calculate_checksum(&self) -> u16 {
        checksum16(&self.header_bytes(0))
    }

    /// Convert the packet to bytes
    ///
    /// Fails if the payload is empty or the datagram would exceed 65535
    /// bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.payload.is_empty() {
            return Err(Error::construction("IPv4 payload must not be empty"));
        }
        if self.total_length() > Self::MAX_PACKET_SIZE {
            return Err(Error::construction(format!(
                "IPv4 total length {} exceeds {}",
                self.total_length(),
                Self::MAX_PACKET_SIZE
            )));
        }

        let mut buffer = self.header_bytes(self.calculate_checksum());
        buffer.put_slice(&self.payload);

        Ok(buffer.to_vec())
    }

    /// Parse an IPv4 packet from bytes
    ///
    /// Link-layer padding past the total length field is dropped. Returns
    /// `None` for anything that is not a well-formed IPv4 header.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < Self::MIN_HEADER_SIZE {
            return None;
        }

        let version = data[0] >> 4;
        let header_len = ((data[0] & 0x0F) as usize) * 4;
        if version != 4 || header_len < Self::MIN_HEADER_SIZE {
            return None;
        }

        let total_length = u16::from_be_bytes([data[2], data[3]]) as usize;
        if total_length < header_len || data.len() < total_length {
            return None;
        }

        let flags_and_offset = u16::from_be_bytes([data[6], data[7]]);

        Some(Ipv4Packet {
            tos: data[1],
            identification: u16::from_be_bytes([data[4], data[5]]),
            flags: IpFlags::from_u8((flags_and_offset >> 13) as u8),
            ttl: data[8],
            protocol: IpProtocol::from_u8(data[9]),
            checksum: u16::from_be_bytes([data[10], data[11]]),
            source: Ipv4Addr::new(data[12], data[13], data[14], data[15]),
            destination: Ipv4Addr::new(data[16], data[17], data[18], data[19]),
            payload: data[header_len..total_length].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::validate_checksum;

    fn sample() -> Ipv4Packet {
        Ipv4Packet::new(
            Ipv4Addr::new(192, 168, 1, 1),
            Ipv4Addr::new(192, 168, 1, 2),
            IpProtocol::UDP,
            vec![0x01, 0x02, 0x03, 0x04],
        )
    }

    #[test]
    fn test_ip_protocol_conversion() {
        assert_eq!(IpProtocol::TCP.to_u8(), 6);
        assert_eq!(IpProtocol::GRE.to_u8(), 47);
        assert_eq!(IpProtocol::from_u8(17), IpProtocol::UDP);
        assert_eq!(IpProtocol::from_u8(99), IpProtocol::Custom(99));
    }

    #[test]
    fn test_ip_flags() {
        let flags = IpFlags::DONT_FRAGMENT;
        assert_eq!(flags.to_u8(), 0b010);
        assert_eq!(IpFlags::from_u8(0b010), flags);
    }

    #[test]
    fn test_ipv4_packet_to_bytes() {
        let bytes = sample().with_identification(1000).to_bytes().unwrap();

        assert_eq!(bytes[0], 0x45);
        assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]), 24);
        assert_eq!(u16::from_be_bytes([bytes[4], bytes[5]]), 1000);
        assert_eq!(bytes[9], 17);
        assert_eq!(&bytes[12..16], &[192, 168, 1, 1]);
        assert_eq!(&bytes[16..20], &[192, 168, 1, 2]);
        assert_eq!(&bytes[20..24], &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_ipv4_header_checksum_verifies() {
        let bytes = sample().with_ttl(128).to_bytes().unwrap();
        assert!(validate_checksum(&bytes[..20]));
    }

    #[test]
    fn test_ipv4_rejects_empty_and_oversized_payload() {
        let mut packet = sample();
        packet.payload.clear();
        assert!(matches!(packet.to_bytes(), Err(Error::PacketConstruction(_))));

        packet.payload = vec![0; Ipv4Packet::MAX_PACKET_SIZE];
        assert!(packet.to_bytes().is_err());

        packet.payload = vec![0; Ipv4Packet::MAX_PACKET_SIZE - Ipv4Packet::MIN_HEADER_SIZE];
        assert!(packet.to_bytes().is_ok());
    }

    #[test]
    fn test_ipv4_packet_parse_trims_padding() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes.extend_from_slice(&[0u8; 12]);

        let packet = Ipv4Packet::from_bytes(&bytes).unwrap();
        assert_eq!(packet.source, Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(packet.protocol, IpProtocol::UDP);
        assert_eq!(packet.payload, vec![0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_ipv4_parse_not_applicable() {
        assert!(Ipv4Packet::from_bytes(&[0x45; 10]).is_none());

        let mut bytes = sample().to_bytes().unwrap();
        bytes[0] = 0x65;
        assert!(Ipv4Packet::from_bytes(&bytes).is_none());

        let mut bytes = sample().to_bytes().unwrap();
        bytes[3] = 0xFF;
        assert!(Ipv4Packet::from_bytes(&bytes).is_none());
    }
}
