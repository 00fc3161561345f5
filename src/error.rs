//! Error types for StrataKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using StrataError
pub type Result<T> = std::result::Result<T, StrataError>;

/// Unified error type for StrataKV operations
#[derive(Debug, Error)]
pub enum StrataError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Read Errors
    // -------------------------------------------------------------------------
    /// Key absent, or tombstoned as of the read view.
    #[error("Key not found")]
    NotFound,

    // -------------------------------------------------------------------------
    // Data Integrity Errors
    // -------------------------------------------------------------------------
    /// Checksum mismatch, malformed batch or edit, missing manifest field.
    #[error("Corruption: {0}")]
    Corruption(String),

    // -------------------------------------------------------------------------
    // Usage Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A memtable rotation was needed while the previous immutable memtable
    /// was still pending.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),
}

impl StrataError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StrataError::NotFound)
    }

    pub fn is_corruption(&self) -> bool {
        matches!(self, StrataError::Corruption(_))
    }

    pub(crate) fn corruption(msg: impl Into<String>) -> Self {
        StrataError::Corruption(msg.into())
    }
}

impl From<bincode::Error> for StrataError {
    fn from(e: bincode::Error) -> Self {
        StrataError::Corruption(format!("bincode: {}", e))
    }
}
