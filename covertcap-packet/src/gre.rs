//! GRE encapsulation (RFC 2784 base header only)

use bytes::{BufMut, BytesMut};

/// IP protocol number carrying GRE
pub const GRE_PROTOCOL: u8 = 47;

/// GRE header with no checksum, key or sequence fields
#[derive(Debug, Clone)]
pub struct GrePacket {
    pub flags: u16,
    /// EtherType of the encapsulated packet
    pub protocol_type: u16,
    pub payload: Vec<u8>,
}

impl GrePacket {
    pub const HEADER_SIZE: usize = 4;

    pub fn new(protocol_type: u16, payload: Vec<u8>) -> Self {
        Self {
            flags: 0,
            protocol_type,
            payload,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = BytesMut::with_capacity(Self::HEADER_SIZE + self.payload.len());
        bytes.put_u16(self.flags);
        bytes.put_u16(self.protocol_type);
        bytes.put_slice(&self.payload);
        bytes.to_vec()
    }

    /// Parse a base GRE header
    ///
    /// Headers announcing optional fields (C, K or S bits) or a non-zero
    /// version are not applicable.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < Self::HEADER_SIZE {
            return None;
        }

        let flags = u16::from_be_bytes([data[0], data[1]]);
        if flags & 0xB007 != 0 {
            return None;
        }

        Some(Self {
            flags,
            protocol_type: u16::from_be_bytes([data[2], data[3]]),
            payload: data[Self::HEADER_SIZE..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gre_header() {
        let packet = GrePacket::new(0x86DD, vec![0x60, 0x00]);
        assert_eq!(packet.to_bytes(), vec![0x00, 0x00, 0x86, 0xDD, 0x60, 0x00]);

        let parsed = GrePacket::from_bytes(&packet.to_bytes()).unwrap();
        assert_eq!(parsed.protocol_type, 0x86DD);
        assert_eq!(parsed.payload, vec![0x60, 0x00]);
    }

    #[test]
    fn test_gre_rejects_optional_fields() {
        // Key present
        assert!(GrePacket::from_bytes(&[0x20, 0x00, 0x86, 0xDD]).is_none());
        // Version 1 (PPTP)
        assert!(GrePacket::from_bytes(&[0x00, 0x01, 0x88, 0x0B]).is_none());
        assert!(GrePacket::from_bytes(&[0x00, 0x00, 0x86]).is_none());
    }
}
