//! Core error types for mcwire

/// Errors produced while encoding, decoding, framing or transporting packets.
///
/// Every variant carries enough context (offsets, expected vs. actual lengths)
/// for the caller to log the failure or abort the connection.
#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    /// Buffer exhausted before the requested read completed.
    #[error("Insufficient data at offset {offset}: requested {requested} bytes, {available} available")]
    InsufficientData {
        offset: usize,
        requested: usize,
        available: usize,
    },

    /// Structurally invalid encoding (bad varint, bad discriminant, bad length).
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Corrupt compressed payload.
    #[error("Decompression error: {0}")]
    Decompression(String),

    /// Decompressed data would exceed the allowed size.
    #[error("Size limit exceeded: {actual} bytes exceeds limit of {limit}")]
    SizeLimitExceeded { limit: usize, actual: usize },

    /// Transport reached end-of-stream in the middle of a read.
    #[error("Connection closed: received {received} of {expected} bytes")]
    ConnectionClosed { received: usize, expected: usize },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Field-level invariant violations reported by `Serializable::validate`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} out of range: {value} not within {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: i128,
        min: i128,
        max: i128,
    },

    #[error("{field} too long: {length} exceeds maximum of {max}")]
    TooLong {
        field: &'static str,
        length: usize,
        max: usize,
    },

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, CodecError>;

impl CodecError {
    /// Whether the error leaves the connection's framing untrustworthy.
    ///
    /// Decompression failures and transport closure end the session; the
    /// remaining kinds only invalidate the packet being processed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Decompression(_)
                | Self::SizeLimitExceeded { .. }
                | Self::ConnectionClosed { .. }
                | Self::Io(_)
        )
    }
}
