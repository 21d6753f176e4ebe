//! Error types for covertcap

use thiserror::Error;

/// Result type alias for covertcap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for covertcap
///
/// Protocol-layer parse failures are not represented here: parsers return
/// `None` so a mixed stream can be filtered layer by layer. Only construction
/// failures and capture-container failures surface as errors.
#[derive(Error, Debug)]
pub enum Error {
    /// File or stream I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A builder was given input it cannot encode
    #[error("Packet construction error: {0}")]
    PacketConstruction(String),

    /// Invalid parameter error
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// The capture file header is not something we can read
    #[error("Capture format error: {0}")]
    CaptureFormat(String),

    /// The capture file ends in the middle of a record
    #[error("Truncated capture at byte {offset}: {reason}")]
    TruncatedCapture { offset: u64, reason: String },

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Resource already exists
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),
}

impl Error {
    /// Create a packet construction error with a custom message
    pub fn construction<S: Into<String>>(msg: S) -> Self {
        Error::PacketConstruction(msg.into())
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        Error::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a truncated capture error
    pub fn truncated<S: Into<String>>(offset: u64, reason: S) -> Self {
        Error::TruncatedCapture {
            offset,
            reason: reason.into(),
        }
    }

    /// True for errors that come from the capture container itself
    pub fn is_capture_error(&self) -> bool {
        matches!(
            self,
            Error::CaptureFormat(_) | Error::TruncatedCapture { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::construction("DNS label longer than 63 bytes");
        assert_eq!(
            err.to_string(),
            "Packet construction error: DNS label longer than 63 bytes"
        );

        let err = Error::invalid_parameter("vlan_id", "must be between 1 and 4094");
        assert_eq!(
            err.to_string(),
            "Invalid parameter 'vlan_id': must be between 1 and 4094"
        );
    }

    #[test]
    fn test_capture_error_classification() {
        assert!(Error::truncated(24, "short record header").is_capture_error());
        assert!(Error::CaptureFormat("bad magic".into()).is_capture_error());
        assert!(!Error::construction("oversized").is_capture_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
