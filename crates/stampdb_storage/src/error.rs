//! Error types for store engine operations.

use std::io;
use thiserror::Error;

/// Result type for store engine operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur inside a store engine.
///
/// A missing key is never an error: point reads return `Ok(None)`.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The on-disk log is corrupted.
    #[error("store corrupted: {0}")]
    Corrupted(String),

    /// Another handle holds the store's directory lock.
    #[error("store locked: another handle has exclusive access to {0}")]
    Locked(String),

    /// The store has been closed.
    #[error("store is closed")]
    Closed,

    /// A fault injected by a test harness.
    #[error("injected fault: {0}")]
    Injected(String),
}

impl StorageError {
    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }

    /// Creates an injected-fault error.
    pub fn injected(message: impl Into<String>) -> Self {
        Self::Injected(message.into())
    }
}
