//! Error types for the quill search engine.

use thiserror::Error;

/// Errors that can occur in quill operations.
#[derive(Error, Debug)]
pub enum QuillError {
    /// A Boolean query could not be parsed (mismatched parentheses,
    /// unknown token, malformed phrase).
    #[error("Parse error: {0}")]
    Parse(String),

    /// An RPN expression was structurally invalid at evaluation time
    /// (operator with insufficient operands, leftover operands).
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// A bit stream was truncated or otherwise corrupt during decode,
    /// or an unencodable value was passed to an encoder.
    #[error("Codec error: {0}")]
    Codec(String),

    /// A data-structure invariant was violated. This always indicates an
    /// upstream bug (e.g. unsorted postings reaching the compressor) and
    /// must halt the operation rather than truncate data.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// A requested index or file does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An unsupported combination of index configuration selectors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A storage backend failed (serialization, database, encoding).
    #[error("Storage error: {0}")]
    Storage(String),

    /// An I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl QuillError {
    /// Create a parse error.
    pub fn parse<S: Into<String>>(message: S) -> Self {
        QuillError::Parse(message.into())
    }

    /// Create an evaluation error.
    pub fn evaluation<S: Into<String>>(message: S) -> Self {
        QuillError::Evaluation(message.into())
    }

    /// Create a codec error.
    pub fn codec<S: Into<String>>(message: S) -> Self {
        QuillError::Codec(message.into())
    }

    /// Create an invariant-violation error.
    pub fn invariant<S: Into<String>>(message: S) -> Self {
        QuillError::InvariantViolation(message.into())
    }

    /// Create a not-found error.
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        QuillError::NotFound(message.into())
    }

    /// Create a configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        QuillError::Config(message.into())
    }

    /// Create a storage error.
    pub fn storage<S: Into<String>>(message: S) -> Self {
        QuillError::Storage(message.into())
    }
}

impl From<serde_json::Error> for QuillError {
    fn from(err: serde_json::Error) -> Self {
        QuillError::Storage(format!("serialization failed: {err}"))
    }
}

impl From<rusqlite::Error> for QuillError {
    fn from(err: rusqlite::Error) -> Self {
        QuillError::Storage(format!("sqlite error: {err}"))
    }
}

/// Result type alias for quill operations.
pub type Result<T> = std::result::Result<T, QuillError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QuillError::parse("mismatched parentheses");
        assert_eq!(err.to_string(), "Parse error: mismatched parentheses");

        let err = QuillError::codec("unexpected end of bit stream");
        assert!(err.to_string().starts_with("Codec error:"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: QuillError = io_err.into();
        assert!(matches!(err, QuillError::Io(_)));
    }
}
