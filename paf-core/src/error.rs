//! Error types for PAF parsing, validation, and transformation.

use thiserror::Error;

/// Errors that can occur while reading, validating, or transforming PAF records.
#[derive(Debug, Error)]
pub enum PafError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid integer field: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    #[error("malformed PAF record: {0}")]
    ReadRecord(String),

    #[error("invalid PAF record: {0}")]
    InvalidRecord(String),

    #[error("sequence not found: {0}")]
    MissingSequence(String),
}

pub type Result<T> = std::result::Result<T, PafError>;
