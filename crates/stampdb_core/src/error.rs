//! Error types for stampdb core.

use stampdb_codec::CodecError;
use stampdb_storage::StorageError;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Coarse failure classes reported to callers.
///
/// An absent record is not a failure; point reads return `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A stored value failed to decode.
    CorruptRecord,
    /// The store failed while streaming a scan.
    ScanError,
    /// A point or batch write failed.
    WriteFailure,
    /// A caller-supplied address was rejected before any I/O.
    InvalidAddress,
    /// Opening, reading or closing a store failed.
    Storage,
}

/// Errors that can occur in stampdb core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A stored value does not follow the record encoding.
    #[error("corrupt record at {key:?}: {reason}")]
    CorruptRecord {
        /// Raw key of the record.
        key: String,
        /// Decoding failure.
        #[source]
        reason: CodecError,
    },

    /// The store reported an error in the middle of a scan.
    #[error("scan failed: {source}")]
    Scan {
        /// Store error.
        #[source]
        source: StorageError,
    },

    /// A write was not acknowledged.
    #[error("write failed at {key:?}: {source}")]
    WriteFailure {
        /// Raw key of the (first) record written.
        key: String,
        /// Store error.
        #[source]
        source: StorageError,
    },

    /// An address violates the identifier preconditions.
    #[error("invalid address: {message}")]
    InvalidAddress {
        /// Description of the violation.
        message: String,
    },

    /// Store error outside of scans and writes.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O error on the storage root.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CoreError {
    /// Creates a corrupt record error.
    pub fn corrupt_record(key: impl Into<String>, reason: CodecError) -> Self {
        Self::CorruptRecord {
            key: key.into(),
            reason,
        }
    }

    /// Creates a write failure error.
    pub fn write_failure(key: impl Into<String>, source: StorageError) -> Self {
        Self::WriteFailure {
            key: key.into(),
            source,
        }
    }

    /// Creates an invalid address error.
    pub fn invalid_address(message: impl Into<String>) -> Self {
        Self::InvalidAddress {
            message: message.into(),
        }
    }

    /// Returns the failure class.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CorruptRecord { .. } => ErrorKind::CorruptRecord,
            Self::Scan { .. } => ErrorKind::ScanError,
            Self::WriteFailure { .. } => ErrorKind::WriteFailure,
            Self::InvalidAddress { .. } => ErrorKind::InvalidAddress,
            Self::Storage(_) | Self::Io(_) => ErrorKind::Storage,
        }
    }

    /// Returns the offending raw key, when one is known.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::CorruptRecord { key, .. } | Self::WriteFailure { key, .. } => Some(key),
            _ => None,
        }
    }
}

impl From<CodecError> for CoreError {
    /// Address validation failures become `InvalidAddress`. Anything else
    /// came from stored data and becomes `CorruptRecord`.
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::InvalidAddress { message } => Self::InvalidAddress { message },
            CodecError::UnknownKey { key, message } => {
                let reason = CodecError::UnknownKey {
                    key: key.clone(),
                    message,
                };
                Self::corrupt_record(key, reason)
            }
            other => Self::corrupt_record(String::new(), other),
        }
    }
}
