//! Plaintext message format and best-effort recovery results

use regex::Regex;
use std::borrow::Cow;

/// Builder for the `KEY:<key>\nFLAG:<flag>\n` plaintext
pub struct Message;

impl Message {
    /// Compose the wire plaintext from a challenge key and a flag
    pub fn compose(key: &str, flag: &str) -> Vec<u8> {
        format!("KEY:{}\nFLAG:{}\n", key, flag).into_bytes()
    }
}

/// Values parsed out of a recovered plaintext
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageFields {
    pub key: Option<String>,
    pub flag: Option<String>,
}

/// What a decoder managed to reconstruct
///
/// Decoding never fails; an empty result means no signal frames matched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecoveredMessage {
    /// Recovered plaintext bytes
    pub bytes: Vec<u8>,
    /// Number of frames that matched the channel pattern
    pub matched_frames: usize,
}

impl RecoveredMessage {
    pub fn new(bytes: Vec<u8>, matched_frames: usize) -> Self {
        Self {
            bytes,
            matched_frames,
        }
    }

    /// No matching frames were found
    pub fn no_signal() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Plaintext with invalid UTF-8 sequences replaced
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Pull the `KEY:` and `FLAG:` lines out of the plaintext
    ///
    /// When no `FLAG:` line survived, the first `TDHCTF{...}` token anywhere
    /// in the text is used instead.
    pub fn fields(&self) -> MessageFields {
        let text = self.text();
        let mut fields = MessageFields::default();

        for line in text.lines() {
            let line = line.trim();
            if let Some(key) = line.strip_prefix("KEY:") {
                fields.key.get_or_insert_with(|| key.to_string());
            } else if let Some(flag) = line.strip_prefix("FLAG:") {
                fields.flag.get_or_insert_with(|| flag.to_string());
            }
        }

        if fields.flag.is_none() {
            if let Ok(re) = Regex::new(r"TDHCTF\{[^}]+\}") {
                fields.flag = re.find(&text).map(|m| m.as_str().to_string());
            }
        }

        fields
    }
}
