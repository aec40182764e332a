//! Custom error types for the binary reader.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IoError {
    #[error("Binary of {found} bytes exceeds the maximum allowed size of {limit} bytes.")]
    FileTooLarge { limit: u64, found: u64 },

    #[error(
        "Reading {requested} more bytes would exceed the read budget of {limit} bytes (already read: {current})"
    )]
    ReadLimitExceeded {
        limit: u64,
        current: u64,
        requested: u64,
    },

    #[error("I/O error: {0}")]
    StdIo(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IoError>;
