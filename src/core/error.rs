//! Error types for XML binding operations
//!
//! This module defines all error types used throughout the encoder, decoder
//! and descriptor cache.

use thiserror::Error;

/// Error types for XML binding operations
#[derive(Debug, Error)]
pub enum XmlError {
    /// A function, channel or map value reached serialization
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// Output would not be well-formed (bad names, unbalanced tags, bad markers)
    #[error("Malformed structure: {0}")]
    Malformed(String),

    /// Input is not well-formed XML
    #[error("Syntax error on line {line}: {message}")]
    Syntax {
        /// What went wrong
        message: String,
        /// 1-based line of the offending input
        line: usize,
    },

    /// Invalid field metadata in a schema declaration
    #[error("Bad schema: {0}")]
    BadSchema(String),

    /// Text that cannot be converted into the target value
    #[error("Bad value: {0}")]
    BadValue(String),

    /// Input larger than the configured limit
    #[error("Input exceeds the limit of {0} bytes")]
    LimitExceeded(usize),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (should not occur in normal operation)
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl XmlError {
    /// Line number carried by a syntax error
    pub fn line(&self) -> Option<usize> {
        match self {
            XmlError::Syntax { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// Result type alias for XML binding operations
pub type XmlResult<T> = Result<T, XmlError>;
