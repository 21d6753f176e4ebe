//! IPv6 packet construction and parsing (fixed header, no extension headers)

use bytes::{BufMut, BytesMut};
use covertcap_core::{Error, Result};
use std::net::Ipv6Addr;

/// Largest value the 20-bit flow label can hold
pub const FLOW_LABEL_MAX: u32 = 0xF_FFFF;

/// IPv6 packet
#[derive(Debug, Clone)]
pub struct Ipv6Packet {
    pub traffic_class: u8,
    /// 20-bit flow label
    pub flow_label: u32,
    pub next_header: u8,
    pub hop_limit: u8,
    pub source: Ipv6Addr,
    pub destination: Ipv6Addr,
    pub payload: Vec<u8>,
}

impl Ipv6Packet {
    pub const HEADER_SIZE: usize = 40;

    pub fn new(source: Ipv6Addr, destination: Ipv6Addr, next_header: u8, payload: Vec<u8>) -> Self {
        Self {
            traffic_class: 0,
            flow_label: 0,
            next_header,
            hop_limit: 64,
            source,
            destination,
            payload,
        }
    }

    pub fn with_flow_label(mut self, flow_label: u32) -> Self {
        self.flow_label = flow_label;
        self
    }

    pub fn with_hop_limit(mut self, hop_limit: u8) -> Self {
        self.hop_limit = hop_limit;
        self
    }

    /// Serialize; fails on a flow label wider than 20 bits or an oversized payload
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.flow_label > FLOW_LABEL_MAX {
            return Err(Error::construction(format!(
                "IPv6 flow label {:#x} does not fit in 20 bits",
                self.flow_label
            )));
        }
        let payload_len = u16::try_from(self.payload.len()).map_err(|_| {
            Error::construction(format!("IPv6 payload length {} exceeds 65535", self.payload.len()))
        })?;

        let mut buffer = BytesMut::with_capacity(Self::HEADER_SIZE + self.payload.len());
        buffer.put_u32((6 << 28) | ((self.traffic_class as u32) << 20) | self.flow_label);
        buffer.put_u16(payload_len);
        buffer.put_u8(self.next_header);
        buffer.put_u8(self.hop_limit);
        buffer.put_slice(&self.source.octets());
        buffer.put_slice(&self.destination.octets());
        buffer.put_slice(&self.payload);

        Ok(buffer.to_vec())
    }

    /// Parse the fixed header, trimming anything past the payload length
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < Self::HEADER_SIZE {
            return None;
        }

        let first = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        if first >> 28 != 6 {
            return None;
        }

        let payload_len = u16::from_be_bytes([data[4], data[5]]) as usize;
        let end = Self::HEADER_SIZE + payload_len;
        if data.len() < end {
            return None;
        }

        let mut src = [0u8; 16];
        let mut dst = [0u8; 16];
        src.copy_from_slice(&data[8..24]);
        dst.copy_from_slice(&data[24..40]);

        Some(Self {
            traffic_class: ((first >> 20) & 0xFF) as u8,
            flow_label: first & FLOW_LABEL_MAX,
            next_header: data[6],
            hop_limit: data[7],
            source: Ipv6Addr::from(src),
            destination: Ipv6Addr::from(dst),
            payload: data[Self::HEADER_SIZE..end].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Ipv6Addr {
        s.parse().unwrap()
    }

    #[test]
    fn test_ipv6_header_layout() {
        let packet = Ipv6Packet::new(addr("fd00:133::10"), addr("fd00:133::1"), 6, vec![1, 2, 3])
            .with_flow_label(0xA_B123);
        let bytes = packet.to_bytes().unwrap();

        assert_eq!(bytes.len(), 43);
        assert_eq!(bytes[0] >> 4, 6);
        assert_eq!(
            u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) & FLOW_LABEL_MAX,
            0xA_B123
        );
        assert_eq!(u16::from_be_bytes([bytes[4], bytes[5]]), 3);
        assert_eq!(bytes[6], 6);
        assert_eq!(bytes[7], 64);
    }

    #[test]
    fn test_ipv6_parse() {
        let mut bytes = Ipv6Packet::new(addr("fd00::1"), addr("fd00::2"), 17, vec![9; 4])
            .with_flow_label(0x123)
            .to_bytes()
            .unwrap();
        bytes.extend_from_slice(&[0; 5]);

        let packet = Ipv6Packet::from_bytes(&bytes).unwrap();
        assert_eq!(packet.source, addr("fd00::1"));
        assert_eq!(packet.destination, addr("fd00::2"));
        assert_eq!(packet.flow_label, 0x123);
        assert_eq!(packet.next_header, 17);
        assert_eq!(packet.payload, vec![9; 4]);
    }

    #[test]
    fn test_ipv6_rejects() {
        let packet = Ipv6Packet::new(addr("::1"), addr("::2"), 6, vec![]).with_flow_label(0x10_0000);
        assert!(packet.to_bytes().is_err());

        let mut bytes = Ipv6Packet::new(addr("::1"), addr("::2"), 6, vec![0; 8]).to_bytes().unwrap();
        bytes.truncate(45);
        assert!(Ipv6Packet::from_bytes(&bytes).is_none());

        bytes[0] = 0x45;
        assert!(Ipv6Packet::from_bytes(&bytes).is_none());
    }
}
