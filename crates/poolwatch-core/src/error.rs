//! Error types shared across the poolwatch pipeline.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during log-line extraction.
#[derive(Error, Debug)]
pub enum Error {
    /// A line matched a pattern but a captured field failed numeric conversion.
    #[error("invalid field '{field}' in matched log line: {reason}")]
    InvalidField {
        /// The name of the capture group that failed to convert.
        field: &'static str,
        /// Description of what's wrong.
        reason: String,
    },

    /// A line matched a pattern but the captured timestamp failed to parse.
    #[error("timestamp parse error: {0}")]
    Timestamp(#[from] chrono::ParseError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_field_display() {
        let err = Error::InvalidField {
            field: "peer_num",
            reason: "number too large to fit in target type".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("peer_num"));
        assert!(msg.contains("too large"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }
}
