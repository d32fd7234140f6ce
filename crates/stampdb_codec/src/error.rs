//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding or decoding keys and values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A logical address violates the identifier preconditions.
    #[error("invalid address: {message}")]
    InvalidAddress {
        /// Description of the violated precondition.
        message: String,
    },

    /// A stored value has no `.` between stamp and payload.
    #[error("stamped value has no stamp separator")]
    MissingSeparator,

    /// The stamp field is not a non-negative decimal integer.
    #[error("invalid stamp: {text:?}")]
    InvalidStamp {
        /// The offending stamp text.
        text: String,
    },

    /// A `[`-prefixed payload is not a valid array.
    #[error("invalid array payload: {message}")]
    InvalidArray {
        /// Parser diagnostics.
        message: String,
    },

    /// A stored value is not valid UTF-8.
    #[error("stored value is not valid UTF-8")]
    InvalidUtf8,

    /// A raw key cannot be mapped back to a logical address.
    #[error("undecodable key {key:?}: {message}")]
    UnknownKey {
        /// The raw key.
        key: String,
        /// Why it could not be decoded.
        message: String,
    },
}

impl CodecError {
    /// Creates an invalid address error.
    pub fn invalid_address(message: impl Into<String>) -> Self {
        Self::InvalidAddress {
            message: message.into(),
        }
    }

    /// Creates an undecodable key error.
    pub fn unknown_key(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnknownKey {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Returns true if the error describes a caller mistake rather than
    /// stored data that failed to decode.
    #[must_use]
    pub fn is_invalid_address(&self) -> bool {
        matches!(self, Self::InvalidAddress { .. })
    }
}
