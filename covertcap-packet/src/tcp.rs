//! TCP segment construction and parsing
//!
//! This module provides functionality for building and parsing TCP segments,
//! including header construction, flags, options, and checksum calculation.

use crate::checksum::pseudo_header_checksum;
use bytes::{BufMut, BytesMut};
use covertcap_core::{Error, Result};
use std::net::IpAddr;

/// TCP port number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TcpPort(pub u16);

impl TcpPort {
    /// HTTP (80)
    pub const HTTP: TcpPort = TcpPort(80);

    /// HTTPS (443)
    pub const HTTPS: TcpPort = TcpPort(443);

    pub fn new(port: u16) -> Self {
        TcpPort(port)
    }

    pub fn to_u16(self) -> u16 {
        self.0
    }
}

impl From<u16> for TcpPort {
    fn from(port: u16) -> Self {
        TcpPort(port)
    }
}

/// TCP flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcpFlags {
    pub fin: bool,
    pub syn: bool,
    pub rst: bool,
    pub psh: bool,
    pub ack: bool,
    pub urg: bool,
}

impl TcpFlags {
    pub const NONE: TcpFlags = TcpFlags::from_u8(0x00);
    pub const SYN: TcpFlags = TcpFlags::from_u8(0x02);
    pub const SYN_ACK: TcpFlags = TcpFlags::from_u8(0x12);
    pub const ACK: TcpFlags = TcpFlags::from_u8(0x10);
    pub const PSH_ACK: TcpFlags = TcpFlags::from_u8(0x18);
    pub const FIN_ACK: TcpFlags = TcpFlags::from_u8(0x11);
    pub const RST: TcpFlags = TcpFlags::from_u8(0x04);

    /// Convert flags to the header byte
    pub fn to_u8(self) -> u8 {
        (self.fin as u8)
            | (self.syn as u8) << 1
            | (self.rst as u8) << 2
            | (self.psh as u8) << 3
            | (self.ack as u8) << 4
            | (self.urg as u8) << 5
    }

    /// Parse flags from the header byte (ECE/CWR are ignored)
    pub const fn from_u8(value: u8) -> Self {
        TcpFlags {
            fin: value & 0x01 != 0,
            syn: value & 0x02 != 0,
            rst: value & 0x04 != 0,
            psh: value & 0x08 != 0,
            ack: value & 0x10 != 0,
            urg: value & 0x20 != 0,
        }
    }
}

/// A single TCP option
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TcpOption {
    /// No-operation padding (kind 1)
    Nop,
    /// Timestamp option (kind 8, length 10)
    Timestamp { value: u32, echo: u32 },
    /// Any other option, emitted as kind, length, data
    Raw { kind: u8, data: Vec<u8> },
}

impl TcpOption {
    pub const KIND_EOL: u8 = 0;
    pub const KIND_NOP: u8 = 1;
    pub const KIND_TIMESTAMP: u8 = 8;

    fn encode(&self, buffer: &mut BytesMut) {
        match self {
            TcpOption::Nop => buffer.put_u8(Self::KIND_NOP),
            TcpOption::Timestamp { value, echo } => {
                buffer.put_u8(Self::KIND_TIMESTAMP);
                buffer.put_u8(10);
                buffer.put_u32(*value);
                buffer.put_u32(*echo);
            }
            TcpOption::Raw { kind, data } => {
                buffer.put_u8(*kind);
                buffer.put_u8((data.len() + 2) as u8);
                buffer.put_slice(data);
            }
        }
    }

    fn encoded_len(&self) -> usize {
        match self {
            TcpOption::Nop => 1,
            TcpOption::Timestamp { .. } => 10,
            TcpOption::Raw { data, .. } => data.len() + 2,
        }
    }

    /// Walk an options area
    ///
    /// Stops at end-of-list or at the first option whose length does not
    /// fit, keeping everything parsed before it.
    pub fn parse_all(mut data: &[u8]) -> Vec<TcpOption> {
        let mut options = Vec::new();

        while let Some(&kind) = data.first() {
            match kind {
                Self::KIND_EOL => break,
                Self::KIND_NOP => {
                    options.push(TcpOption::Nop);
                    data = &data[1..];
                }
                _ => {
                    let len = match data.get(1) {
                        Some(&len) if len >= 2 && (len as usize) <= data.len() => len as usize,
                        _ => break,
                    };
                    let body = &data[2..len];
                    if kind == Self::KIND_TIMESTAMP && len == 10 {
                        options.push(TcpOption::Timestamp {
                            value: u32::from_be_bytes([body[0], body[1], body[2], body[3]]),
                            echo: u32::from_be_bytes([body[4], body[5], body[6], body[7]]),
                        });
                    } else {
                        options.push(TcpOption::Raw {
                            kind,
                            data: body.to_vec(),
                        });
                    }
                    data = &data[len..];
                }
            }
        }

        options
    }
}

/// TCP segment
#[derive(Debug, Clone)]
pub struct TcpSegment {
    /// Source port
    pub source_port: TcpPort,
    /// Destination port
    pub destination_port: TcpPort,
    /// Sequence number
    pub sequence_number: u32,
    /// Acknowledgment number
    pub acknowledgment_number: u32,
    /// TCP flags
    pub flags: TcpFlags,
    /// Window size
    pub window_size: u16,
    /// Checksum as parsed; recomputed on every `to_bytes`
    pub checksum: u16,
    /// Urgent pointer
    pub urgent_pointer: u16,
    /// Options
    pub options: Vec<TcpOption>,
    /// Payload data
    pub payload: Vec<u8>,
}

impl TcpSegment {
    /// Minimum TCP header size (without options)
    pub const MIN_HEADER_SIZE: usize = 20;

    /// Largest options area the 4-bit data offset can describe
    pub const MAX_OPTIONS_SIZE: usize = 40;

    /// Create a new TCP segment without options
    pub fn new(
        source_port: TcpPort,
        destination_port: TcpPort,
        sequence_number: u32,
        acknowledgment_number: u32,
        flags: TcpFlags,
        window_size: u16,
        payload: Vec<u8>,
    ) -> Self {
        TcpSegment {
            source_port,
            destination_port,
            sequence_number,
            acknowledgment_number,
            flags,
            window_size,
            checksum: 0,
            urgent_pointer: 0,
            options: Vec::new(),
            payload,
        }
    }

    /// Set TCP options
    pub fn with_options(mut self, options: Vec<TcpOption>) -> Self {
        self.options = options;
        self
    }

    /// Options area length after padding to a 4-byte boundary
    pub fn options_len(&self) -> usize {
        let raw: usize = self.options.iter().map(TcpOption::encoded_len).sum();
        (raw + 3) & !3
    }

    /// Header size in bytes, as written to the data offset field
    pub fn header_len(&self) -> usize {
        Self::MIN_HEADER_SIZE + self.options_len()
    }

    /// Header plus payload, in bytes
    pub fn wire_len(&self) -> usize {
        self.header_len() + self.payload.len()
    }

    /// The first timestamp option as `(value, echo)`
    pub fn timestamp(&self) -> Option<(u32, u32)> {
        self.options.iter().find_map(|opt| match opt {
            TcpOption::Timestamp { value, echo } => Some((*value, *echo)),
            _ => None,
        })
    }

    fn build(&self, checksum: u16) -> Result<BytesMut> {
        let options_len = self.options_len();
        if options_len > Self::MAX_OPTIONS_SIZE {
            return Err(Error::construction(format!(
                "TCP options take {} bytes, at most {} fit",
                options_len,
                Self::MAX_OPTIONS_SIZE
            )));
        }
        if let Some(TcpOption::Raw { data, .. }) = self
            .options
            .iter()
            .find(|opt| matches!(opt, TcpOption::Raw { data, .. } if data.len() > 253))
        {
            return Err(Error::construction(format!(
                "TCP option body of {} bytes does not fit a length byte",
                data.len()
            )));
        }

        let header_len = self.header_len();
        let mut buffer = BytesMut::with_capacity(self.wire_len());

        buffer.put_u16(self.source_port.to_u16());
        buffer.put_u16(self.destination_port.to_u16());
        buffer.put_u32(self.sequence_number);
        buffer.put_u32(self.acknowledgment_number);
        buffer.put_u8(((header_len / 4) as u8) << 4);
        buffer.put_u8(self.flags.to_u8());
        buffer.put_u16(self.window_size);
        buffer.put_u16(checksum);
        buffer.put_u16(self.urgent_pointer);

        for option in &self.options {
            option.encode(&mut buffer);
        }
        // Pad with end-of-list
        buffer.resize(header_len, TcpOption::KIND_EOL);

        buffer.put_slice(&self.payload);
        Ok(buffer)
    }

    /// Calculate the TCP checksum, including the pseudo-header
    pub fn calculate_checksum(&self, src_ip: IpAddr, dst_ip: IpAddr) -> Result<u16> {
        let unsummed = self.build(0)?;
        Ok(pseudo_header_checksum(src_ip, dst_ip, 6, &unsummed))
    }

    /// Convert the TCP segment to bytes with a fresh checksum
    pub fn to_bytes(&self, src_ip: IpAddr, dst_ip: IpAddr) -> Result<Vec<u8>> {
        let checksum = self.calculate_checksum(src_ip, dst_ip)?;
        let mut buffer = self.build(0)?;
        buffer[16..18].copy_from_slice(&checksum.to_be_bytes());
        Ok(buffer.to_vec())
    }

    /// Parse a TCP segment from bytes
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < Self::MIN_HEADER_SIZE {
            return None;
        }

        let header_len = ((data[12] >> 4) as usize) * 4;
        if header_len < Self::MIN_HEADER_SIZE || data.len() < header_len {
            return None;
        }

        Some(TcpSegment {
            source_port: TcpPort::new(u16::from_be_bytes([data[0], data[1]])),
            destination_port: TcpPort::new(u16::from_be_bytes([data[2], data[3]])),
            sequence_number: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            acknowledgment_number: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
            flags: TcpFlags::from_u8(data[13]),
            window_size: u16::from_be_bytes([data[14], data[15]]),
            checksum: u16::from_be_bytes([data[16], data[17]]),
            urgent_pointer: u16::from_be_bytes([data[18], data[19]]),
            options: TcpOption::parse_all(&data[Self::MIN_HEADER_SIZE..header_len]),
            payload: data[header_len..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::validate_checksum;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn v4(last: u8) -> IpAddr {
        Ipv4Addr::new(192, 168, 1, last).into()
    }

    fn syn(payload: Vec<u8>) -> TcpSegment {
        TcpSegment::new(
            TcpPort::new(12345),
            TcpPort::HTTP,
            1000,
            2000,
            TcpFlags::SYN,
            65535,
            payload,
        )
    }

    #[test]
    fn test_tcp_flags() {
        assert!(TcpFlags::SYN.syn);
        assert!(!TcpFlags::SYN.ack);
        assert_eq!(TcpFlags::SYN.to_u8(), 0b00000010);
        assert_eq!(TcpFlags::SYN_ACK.to_u8(), 0b00010010);
        assert_eq!(TcpFlags::PSH_ACK.to_u8(), 0x18);
        assert_eq!(TcpFlags::from_u8(0x11), TcpFlags::FIN_ACK);
    }

    #[test]
    fn test_tcp_segment_to_bytes() {
        let bytes = syn(vec![0x01, 0x02, 0x03, 0x04]).to_bytes(v4(1), v4(2)).unwrap();

        assert_eq!(u16::from_be_bytes([bytes[0], bytes[1]]), 12345);
        assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]), 80);
        assert_eq!(u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), 1000);
        assert_eq!(u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]), 2000);
        assert_eq!(bytes[12] >> 4, 5);
        assert_eq!(bytes[13], TcpFlags::SYN.to_u8());
        assert_eq!(&bytes[20..24], &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_tcp_checksum_verifies_with_pseudo_header() {
        let bytes = syn(b"hello".to_vec()).to_bytes(v4(1), v4(2)).unwrap();

        let mut pseudo = vec![192, 168, 1, 1, 192, 168, 1, 2, 0, 6];
        pseudo.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
        pseudo.extend_from_slice(&bytes);
        assert!(validate_checksum(&pseudo));
    }

    #[test]
    fn test_tcp_checksum_over_ipv6() {
        let src: IpAddr = "fd00:133::10".parse::<Ipv6Addr>().unwrap().into();
        let dst: IpAddr = "fd00:133::1".parse::<Ipv6Addr>().unwrap().into();
        let segment = syn(vec![]);
        let bytes = segment.to_bytes(src, dst).unwrap();
        let parsed = TcpSegment::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.checksum, segment.calculate_checksum(src, dst).unwrap());
    }

    #[test]
    fn test_tcp_timestamp_option() {
        let segment = syn(vec![]).with_options(vec![
            TcpOption::Nop,
            TcpOption::Nop,
            TcpOption::Timestamp {
                value: 0x1234_5678,
                echo: 0,
            },
        ]);
        let bytes = segment.to_bytes(v4(1), v4(2)).unwrap();

        assert_eq!(bytes[12] >> 4, 8);
        assert_eq!(&bytes[20..24], &[1, 1, 8, 10]);
        assert_eq!(&bytes[24..28], &[0x12, 0x34, 0x56, 0x78]);

        let parsed = TcpSegment::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.timestamp(), Some((0x1234_5678, 0)));
        assert_eq!(parsed.options.len(), 3);
    }

    #[test]
    fn test_tcp_options_padded() {
        let segment = syn(vec![]).with_options(vec![TcpOption::Raw {
            kind: 2,
            data: vec![0x05],
        }]);
        assert_eq!(segment.header_len(), 24);
        let bytes = segment.to_bytes(v4(1), v4(2)).unwrap();
        assert_eq!(&bytes[20..24], &[2, 3, 5, 0]);
        assert_eq!(segment.wire_len(), bytes.len());

        let with_payload = syn(b"hello".to_vec());
        assert_eq!(with_payload.wire_len(), 25);
        assert_eq!(with_payload.to_bytes(v4(1), v4(2)).unwrap().len(), 25);
    }

    #[test]
    fn test_tcp_rejects_oversized_options() {
        let segment = syn(vec![]).with_options(vec![TcpOption::Raw {
            kind: 254,
            data: vec![0; 39],
        }]);
        assert!(matches!(
            segment.to_bytes(v4(1), v4(2)),
            Err(Error::PacketConstruction(_))
        ));
    }

    #[test]
    fn test_tcp_segment_from_bytes() {
        let data = vec![
            0x30, 0x39, // Source port (12345)
            0x00, 0x50, // Dest port (80)
            0x00, 0x00, 0x03, 0xE8, // Sequence (1000)
            0x00, 0x00, 0x07, 0xD0, // Ack (2000)
            0x50, // Data offset (5)
            0x02, // Flags (SYN)
            0xFF, 0xFF, // Window (65535)
            0x00, 0x00, // Checksum
            0x00, 0x00, // Urgent pointer
            0x01, 0x02, 0x03, 0x04, // Payload
        ];

        let segment = TcpSegment::from_bytes(&data).unwrap();

        assert_eq!(segment.source_port.0, 12345);
        assert_eq!(segment.destination_port, TcpPort::HTTP);
        assert_eq!(segment.sequence_number, 1000);
        assert_eq!(segment.acknowledgment_number, 2000);
        assert!(segment.flags.syn);
        assert!(segment.options.is_empty());
        assert_eq!(segment.payload, vec![0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_tcp_parse_rejects_bad_offset() {
        let mut bytes = syn(vec![]).to_bytes(v4(1), v4(2)).unwrap();
        bytes[12] = 0x40;
        assert!(TcpSegment::from_bytes(&bytes).is_none());
        bytes[12] = 0xF0;
        assert!(TcpSegment::from_bytes(&bytes).is_none());
    }
}
