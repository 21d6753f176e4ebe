//! UDP datagram construction and parsing

use crate::checksum::pseudo_header_checksum;
use bytes::{BufMut, BytesMut};
use covertcap_core::{Error, Result};
use std::net::IpAddr;

/// UDP port number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UdpPort(pub u16);

impl UdpPort {
    /// DNS (53)
    pub const DNS: UdpPort = UdpPort(53);

    pub fn new(port: u16) -> Self {
        UdpPort(port)
    }

    pub fn to_u16(self) -> u16 {
        self.0
    }
}

impl From<u16> for UdpPort {
    fn from(port: u16) -> Self {
        UdpPort(port)
    }
}

/// UDP datagram
#[derive(Debug, Clone)]
pub struct UdpDatagram {
    /// Source port
    pub source_port: UdpPort,
    /// Destination port
    pub destination_port: UdpPort,
    /// Checksum as parsed; recomputed on every `to_bytes`
    pub checksum: u16,
    /// Payload data
    pub payload: Vec<u8>,
}

impl UdpDatagram {
    /// UDP header size in bytes
    pub const HEADER_SIZE: usize = 8;

    /// Create a new UDP datagram
    pub fn new(source_port: UdpPort, destination_port: UdpPort, payload: Vec<u8>) -> Self {
        UdpDatagram {
            source_port,
            destination_port,
            checksum: 0,
            payload,
        }
    }

    /// Length field value (header + data)
    pub fn length(&self) -> usize {
        Self::HEADER_SIZE + self.payload.len()
    }

    fn build(&self, checksum: u16) -> Result<BytesMut> {
        let length = u16::try_from(self.length())
            .map_err(|_| Error::construction(format!("UDP length {} exceeds 65535", self.length())))?;

        let mut buffer = BytesMut::with_capacity(self.length());
        buffer.put_u16(self.source_port.to_u16());
        buffer.put_u16(self.destination_port.to_u16());
        buffer.put_u16(length);
        buffer.put_u16(checksum);
        buffer.put_slice(&self.payload);
        Ok(buffer)
    }

    /// Calculate the UDP checksum, including the pseudo-header
    ///
    /// A computed value of zero is sent as `0xFFFF`, since zero means "no
    /// checksum" on the wire.
    pub fn calculate_checksum(&self, src_ip: IpAddr, dst_ip: IpAddr) -> Result<u16> {
        let checksum = pseudo_header_checksum(src_ip, dst_ip, 17, &self.build(0)?);
        Ok(if checksum == 0 { 0xFFFF } else { checksum })
    }

    /// Convert the UDP datagram to bytes with a fresh checksum
    pub fn to_bytes(&self, src_ip: IpAddr, dst_ip: IpAddr) -> Result<Vec<u8>> {
        let checksum = self.calculate_checksum(src_ip, dst_ip)?;
        Ok(self.build(checksum)?.to_vec())
    }

    /// Parse a UDP datagram from bytes
    ///
    /// Bytes past the length field are ignored.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < Self::HEADER_SIZE {
            return None;
        }

        let length = u16::from_be_bytes([data[4], data[5]]) as usize;
        if length < Self::HEADER_SIZE || data.len() < length {
            return None;
        }

        Some(UdpDatagram {
            source_port: UdpPort::new(u16::from_be_bytes([data[0], data[1]])),
            destination_port: UdpPort::new(u16::from_be_bytes([data[2], data[3]])),
            checksum: u16::from_be_bytes([data[6], data[7]]),
            payload: data[Self::HEADER_SIZE..length].to_vec(),
        })
    }

    /// Check the parsed checksum against the pseudo-header
    pub fn verify_checksum(&self, src_ip: IpAddr, dst_ip: IpAddr) -> bool {
        if self.checksum == 0 {
            return true;
        }
        // Summing over a correct checksum field complements to zero
        self.build(self.checksum)
            .map(|bytes| pseudo_header_checksum(src_ip, dst_ip, 17, &bytes) == 0)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn addrs() -> (IpAddr, IpAddr) {
        (
            Ipv4Addr::new(10, 0, 5, 42).into(),
            Ipv4Addr::new(10, 0, 5, 53).into(),
        )
    }

    #[test]
    fn test_udp_datagram_to_bytes() {
        let (src, dst) = addrs();
        let datagram = UdpDatagram::new(UdpPort::new(54321), UdpPort::DNS, vec![1, 2, 3, 4]);
        let bytes = datagram.to_bytes(src, dst).unwrap();

        assert_eq!(bytes.len(), 12);
        assert_eq!(u16::from_be_bytes([bytes[0], bytes[1]]), 54321);
        assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]), 53);
        assert_eq!(u16::from_be_bytes([bytes[4], bytes[5]]), 12);
        assert_ne!(u16::from_be_bytes([bytes[6], bytes[7]]), 0);
        assert_eq!(&bytes[8..], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_udp_checksum_verifies() {
        let (src, dst) = addrs();
        let bytes = UdpDatagram::new(UdpPort::new(54321), UdpPort::DNS, b"abc".to_vec())
            .to_bytes(src, dst)
            .unwrap();
        let parsed = UdpDatagram::from_bytes(&bytes).unwrap();
        assert!(parsed.verify_checksum(src, dst));

        let mut tampered = parsed.clone();
        tampered.payload[0] ^= 0x01;
        assert!(!tampered.verify_checksum(src, dst));
    }

    #[test]
    fn test_udp_parse_ignores_trailing_padding() {
        let (src, dst) = addrs();
        let mut bytes = UdpDatagram::new(UdpPort::new(1), UdpPort::new(2), vec![9; 3])
            .to_bytes(src, dst)
            .unwrap();
        bytes.extend_from_slice(&[0; 6]);

        let parsed = UdpDatagram::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.payload, vec![9, 9, 9]);
        assert_eq!(parsed.length(), 11);
    }

    #[test]
    fn test_udp_parse_rejects_bad_length() {
        assert!(UdpDatagram::from_bytes(&[0; 7]).is_none());
        let data = [0, 1, 0, 2, 0, 4, 0, 0];
        assert!(UdpDatagram::from_bytes(&data).is_none());
        let data = [0, 1, 0, 2, 0, 20, 0, 0];
        assert!(UdpDatagram::from_bytes(&data).is_none());
    }

    #[test]
    fn test_udp_rejects_oversized_payload() {
        let (src, dst) = addrs();
        let datagram = UdpDatagram::new(UdpPort::new(1), UdpPort::new(2), vec![0; 65530]);
        assert!(datagram.to_bytes(src, dst).is_err());
    }
}
