//! Text encodings shared by the chunking channels
//!
//! The DNS and HTTP channels carry URL-safe Base64 without padding, split
//! into fixed-size chunks. The TLS channel carries standard Base32, one
//! symbol at a time. Decoding is best effort: whatever survives is
//! returned and the losses are logged.

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use tracing::warn;

/// Standard Base32 alphabet, symbol value = position
pub const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// True when every character is in the URL-safe Base64 alphabet
pub fn is_base64url(chunk: &str) -> bool {
    !chunk.is_empty()
        && chunk
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Encode `message` as unpadded URL-safe Base64 split into `size`-char chunks
///
/// The last chunk may be shorter. An empty message yields no chunks.
pub fn encode_chunks(message: &[u8], size: usize) -> Vec<String> {
    let encoded = URL_SAFE_NO_PAD.encode(message);
    encoded
        .as_bytes()
        .chunks(size.max(1))
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect()
}

/// Concatenate chunks in the given order and decode them
///
/// Chunks with characters outside the alphabet are skipped. A dangling
/// single symbol at the end cannot carry a byte and is dropped.
pub fn decode_chunks<I, S>(chunks: I) -> Vec<u8>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut joined = String::new();
    for chunk in chunks {
        let chunk = chunk.as_ref();
        if is_base64url(chunk) {
            joined.push_str(chunk);
        } else {
            warn!(chunk = %chunk, "skipping chunk with non-alphabet characters");
        }
    }

    if joined.len() % 4 == 1 {
        warn!(len = joined.len(), "dropping dangling trailing Base64 symbol");
        joined.pop();
    }

    let pad = (4 - joined.len() % 4) % 4;
    joined.extend(std::iter::repeat('=').take(pad));

    match URL_SAFE.decode(&joined) {
        Ok(bytes) => bytes,
        Err(e) => {
            // Fall back to the longest prefix made of whole quads
            warn!(error = %e, "Base64 decode failed, keeping the whole-quad prefix");
            let whole = (joined.trim_end_matches('=').len() / 4) * 4;
            URL_SAFE.decode(&joined[..whole]).unwrap_or_default()
        }
    }
}

/// Standard Base32 symbol values for `message`, without padding
pub fn base32_symbols(message: &[u8]) -> Vec<u8> {
    base32::encode(base32::Alphabet::Rfc4648 { padding: false }, message)
        .bytes()
        .filter_map(base32_value)
        .collect()
}

/// Value of one Base32 character, `None` for anything else
pub fn base32_value(symbol: u8) -> Option<u8> {
    BASE32_ALPHABET
        .iter()
        .position(|&c| c == symbol)
        .map(|v| v as u8)
}

/// Decode a sequence of Base32 symbol values
///
/// Unpadded lengths of 1, 3 or 6 (mod 8) cannot occur in valid Base32;
/// trailing symbols are dropped until the length is decodable, then
/// padding is restored.
pub fn decode_base32_symbols(values: &[u8]) -> Vec<u8> {
    let mut text: String = values
        .iter()
        .filter(|&&v| v < 32)
        .map(|&v| BASE32_ALPHABET[v as usize] as char)
        .collect();

    let mut dropped = 0;
    while matches!(text.len() % 8, 1 | 3 | 6) {
        text.pop();
        dropped += 1;
    }
    if dropped > 0 {
        warn!(dropped, "dropping trailing Base32 symbols with no complete byte");
    }

    let pad = (8 - text.len() % 8) % 8;
    text.extend(std::iter::repeat('=').take(pad));

    base32::decode(base32::Alphabet::Rfc4648 { padding: true }, &text).unwrap_or_default()
}
