//! TLS record layer framing
//!
//! Records are built and walked at the record layer only; nothing is
//! encrypted and handshake contents are plausible filler.

use bytes::{BufMut, BytesMut};
use covertcap_core::{Error, Result};

pub const CONTENT_CHANGE_CIPHER_SPEC: u8 = 20;
pub const CONTENT_ALERT: u8 = 21;
pub const CONTENT_HANDSHAKE: u8 = 22;
pub const CONTENT_APPLICATION_DATA: u8 = 23;

/// TLS 1.2 record version, also used by TLS 1.3 application data
pub const VERSION_TLS12: u16 = 0x0303;

/// TLS 1.0 version carried by the initial ClientHello record
pub const VERSION_TLS10: u16 = 0x0301;

/// Largest fragment a record may carry (2^14 plus expansion allowance)
pub const MAX_FRAGMENT_LEN: usize = 16384 + 2048;

/// One TLS record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsRecord {
    pub content_type: u8,
    pub version: u16,
    pub fragment: Vec<u8>,
}

impl TlsRecord {
    pub const HEADER_SIZE: usize = 5;

    pub fn new(content_type: u8, version: u16, fragment: Vec<u8>) -> Self {
        Self {
            content_type,
            version,
            fragment,
        }
    }

    /// An application-data record whose length field equals `fragment.len()`
    pub fn application_data(fragment: Vec<u8>) -> Self {
        Self::new(CONTENT_APPLICATION_DATA, VERSION_TLS12, fragment)
    }

    /// A handshake record holding a minimal ClientHello
    ///
    /// `random` fills the 32-byte random field; the body offers two
    /// AES-GCM suites and null compression.
    pub fn client_hello(random: [u8; 32]) -> Self {
        let mut body = BytesMut::new();
        body.put_u16(VERSION_TLS12);
        body.put_slice(&random);
        body.put_u8(0); // session id
        body.put_u16(4);
        body.put_u16(0xC02F); // ECDHE-RSA-AES128-GCM-SHA256
        body.put_u16(0xC030); // ECDHE-RSA-AES256-GCM-SHA384
        body.put_u8(1);
        body.put_u8(0); // null compression

        let mut handshake = BytesMut::with_capacity(4 + body.len());
        handshake.put_u8(1); // client_hello
        handshake.put_uint(body.len() as u64, 3);
        handshake.put_slice(&body);

        Self::new(CONTENT_HANDSHAKE, VERSION_TLS10, handshake.to_vec())
    }

    /// Value of the record length field
    pub fn length(&self) -> usize {
        self.fragment.len()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.fragment.len() > MAX_FRAGMENT_LEN {
            return Err(Error::construction(format!(
                "TLS fragment of {} bytes exceeds {}",
                self.fragment.len(),
                MAX_FRAGMENT_LEN
            )));
        }

        let mut buffer = BytesMut::with_capacity(Self::HEADER_SIZE + self.fragment.len());
        buffer.put_u8(self.content_type);
        buffer.put_u16(self.version);
        buffer.put_u16(self.fragment.len() as u16);
        buffer.put_slice(&self.fragment);
        Ok(buffer.to_vec())
    }

    /// Parse one record from the front of `data`, returning it and the bytes consumed
    pub fn from_bytes(data: &[u8]) -> Option<(Self, usize)> {
        if data.len() < Self::HEADER_SIZE {
            return None;
        }

        let content_type = data[0];
        let version = u16::from_be_bytes([data[1], data[2]]);
        if !(CONTENT_CHANGE_CIPHER_SPEC..=24).contains(&content_type) || version >> 8 != 3 {
            return None;
        }

        let length = u16::from_be_bytes([data[3], data[4]]) as usize;
        let end = Self::HEADER_SIZE + length;
        let fragment = data.get(Self::HEADER_SIZE..end)?;

        Some((Self::new(content_type, version, fragment.to_vec()), end))
    }
}

/// Walk every complete record in a TCP payload
///
/// Stops at the first byte that does not start a well-formed record or at
/// a record cut short by the end of the payload.
pub fn parse_records(mut payload: &[u8]) -> Vec<TlsRecord> {
    let mut records = Vec::new();
    while let Some((record, used)) = TlsRecord::from_bytes(payload) {
        records.push(record);
        payload = &payload[used..];
    }
    records
}
