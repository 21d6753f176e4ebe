//! DNS query construction and name parsing
//!
//! Only the pieces a query needs are built: the 12-byte header, one
//! question, no resource records. The name parser understands compression
//! pointers so it can also walk names inside responses.

use bytes::{BufMut, BytesMut};
use covertcap_core::{Error, Result};

/// Longest single label
pub const MAX_LABEL_LEN: usize = 63;

/// Longest encoded name, length octets included
pub const MAX_NAME_LEN: usize = 255;

/// Compression pointers followed before a name is declared corrupt
pub const MAX_POINTER_JUMPS: usize = 10;

/// Standard query with recursion desired
pub const FLAGS_STANDARD_QUERY: u16 = 0x0100;

const FLAG_QR: u16 = 0x8000;

/// Query type A
pub const QTYPE_A: u16 = 1;

/// Class IN
pub const QCLASS_IN: u16 = 1;

/// Encode a dotted name into length-prefixed labels plus the root label
///
/// A single trailing dot is accepted. Empty labels, labels over 63 bytes,
/// non-ASCII text and names over 255 encoded bytes are rejected.
pub fn encode_name(name: &str) -> Result<Vec<u8>> {
    let trimmed = name.strip_suffix('.').unwrap_or(name);
    let mut out = Vec::with_capacity(trimmed.len() + 2);

    if !trimmed.is_empty() {
        for label in trimmed.split('.') {
            if label.is_empty() {
                return Err(Error::construction(format!("empty label in DNS name {:?}", name)));
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(Error::construction(format!(
                    "DNS label {:?} is {} bytes, at most {} allowed",
                    label,
                    label.len(),
                    MAX_LABEL_LEN
                )));
            }
            if !label.is_ascii() {
                return Err(Error::construction(format!("non-ASCII DNS label {:?}", label)));
            }
            out.push(label.len() as u8);
            out.extend_from_slice(label.as_bytes());
        }
    }
    out.push(0);

    if out.len() > MAX_NAME_LEN {
        return Err(Error::construction(format!(
            "DNS name encodes to {} bytes, at most {} allowed",
            out.len(),
            MAX_NAME_LEN
        )));
    }

    Ok(out)
}

/// Decode the name starting at `offset` inside a whole DNS message
///
/// Returns the dotted name and the offset just past the name as it appears
/// at `offset`: after the terminating zero, or after the first two-byte
/// compression pointer. More than [`MAX_POINTER_JUMPS`] pointers, a
/// reserved label type or a read past the buffer yields `None`.
pub fn parse_name(message: &[u8], offset: usize) -> Option<(String, usize)> {
    let mut labels: Vec<String> = Vec::new();
    let mut pos = offset;
    let mut end = None;
    let mut jumps = 0;

    loop {
        let len = *message.get(pos)?;
        match len & 0xC0 {
            0x00 if len == 0 => {
                let end = end.unwrap_or(pos + 1);
                return Some((labels.join("."), end));
            }
            0x00 => {
                let start = pos + 1;
                let label = message.get(start..start + len as usize)?;
                labels.push(String::from_utf8_lossy(label).into_owned());
                pos = start + len as usize;
            }
            0xC0 => {
                let low = *message.get(pos + 1)?;
                jumps += 1;
                if jumps > MAX_POINTER_JUMPS {
                    return None;
                }
                end.get_or_insert(pos + 2);
                pos = (((len & 0x3F) as usize) << 8) | low as usize;
            }
            _ => return None,
        }
    }
}

/// A single-question DNS query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQuery {
    pub transaction_id: u16,
    pub flags: u16,
    pub qname: String,
    pub qtype: u16,
    pub qclass: u16,
}

impl DnsQuery {
    pub const HEADER_SIZE: usize = 12;

    /// A recursive `A IN` query
    pub fn new(transaction_id: u16, qname: impl Into<String>) -> Self {
        Self {
            transaction_id,
            flags: FLAGS_STANDARD_QUERY,
            qname: qname.into(),
            qtype: QTYPE_A,
            qclass: QCLASS_IN,
        }
    }

    pub fn with_qtype(mut self, qtype: u16) -> Self {
        self.qtype = qtype;
        self
    }

    /// QR bit set
    pub fn is_response(&self) -> bool {
        self.flags & FLAG_QR != 0
    }

    /// Leftmost label of the question name
    pub fn first_label(&self) -> &str {
        self.qname.split('.').next().unwrap_or("")
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let name = encode_name(&self.qname)?;

        let mut buffer = BytesMut::with_capacity(Self::HEADER_SIZE + name.len() + 4);
        buffer.put_u16(self.transaction_id);
        buffer.put_u16(self.flags);
        buffer.put_u16(1); // questions
        buffer.put_u16(0); // answers
        buffer.put_u16(0); // authority
        buffer.put_u16(0); // additional
        buffer.put_slice(&name);
        buffer.put_u16(self.qtype);
        buffer.put_u16(self.qclass);

        Ok(buffer.to_vec())
    }

    /// Parse the header and first question of a DNS message
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < Self::HEADER_SIZE {
            return None;
        }

        let qdcount = u16::from_be_bytes([data[4], data[5]]);
        if qdcount == 0 {
            return None;
        }

        let (qname, end) = parse_name(data, Self::HEADER_SIZE)?;
        let tail = data.get(end..end + 4)?;

        Some(Self {
            transaction_id: u16::from_be_bytes([data[0], data[1]]),
            flags: u16::from_be_bytes([data[2], data[3]]),
            qname,
            qtype: u16::from_be_bytes([tail[0], tail[1]]),
            qclass: u16::from_be_bytes([tail[2], tail[3]]),
        })
    }
}
