//! Error types for the ropcheck gadget scanner.
//!
//! Errors are split by the unit of work they abort: configuration errors
//! stop a scan before it starts, binary errors abort one binary, extraction
//! errors abort one section. Decoder failures never show up here as scan
//! failures; they live in [`crate::disasm::DecodeError`] and only exclude a
//! single candidate window.

use thiserror::Error;

use crate::disasm::DecodeError;

/// Main error type for ropcheck operations.
#[derive(Debug, Error)]
pub enum RopCheckError {
    /// Invalid scan or tool configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The binary could not be read or its format is not recognized
    #[error("Cannot read binary {path}: {reason}")]
    BinaryRead { path: String, reason: String },

    /// Byte extraction for a section failed
    #[error("Extraction failed for section {section}: {reason}")]
    Extraction { section: String, reason: String },

    /// Extracted byte count differs from the declared section size
    #[error("Section {section}: declared size {expected} bytes, extracted {found} bytes")]
    SizeMismatch {
        section: String,
        expected: u64,
        found: u64,
    },

    /// Decoder error surfaced outside of a scan (e.g. backend construction)
    #[error("Decoder error: {0}")]
    Decode(#[from] DecodeError),

    /// Operation timeout
    #[error("Operation timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// Scan stopped by a cancellation request or an exhausted time budget
    #[error("Scan cancelled after {anchors} anchors")]
    Cancelled { anchors: usize },

    /// A required external tool is not installed
    #[error("External tool not found: {0}")]
    MissingTool(String),

    /// External tool exited unsuccessfully
    #[error("{tool} exited with status {status}")]
    ToolFailed { tool: String, status: i32 },

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RopCheckError {
    /// True for errors that abort a single section rather than the binary.
    pub fn is_extraction(&self) -> bool {
        matches!(
            self,
            RopCheckError::Extraction { .. } | RopCheckError::SizeMismatch { .. }
        )
    }
}

impl From<crate::io::error::IoError> for RopCheckError {
    fn from(err: crate::io::error::IoError) -> Self {
        match err {
            crate::io::error::IoError::StdIo(e) => RopCheckError::Io(e),
            other => RopCheckError::Internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for RopCheckError {
    fn from(err: serde_json::Error) -> Self {
        RopCheckError::Serialization(err.to_string())
    }
}

/// Result type alias for ropcheck operations
pub type Result<T> = std::result::Result<T, RopCheckError>;
