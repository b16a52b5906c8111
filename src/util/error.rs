//! Error types for the skymesh library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for skymesh operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// First header card is not `SIMPLE = T`
    #[error("Not a FITS file: expected SIMPLE = T in the primary header")]
    NotFits,

    /// File is truncated or corrupted
    #[error("Unexpected end of file at position {0}")]
    UnexpectedEof(u64),

    /// Malformed header card or value
    #[error("Invalid FITS header: {0}")]
    InvalidHeader(String),

    /// Required header keyword is absent
    #[error("Missing header keyword: {0}")]
    MissingKeyword(String),

    /// Table column not found by name or index
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Column type or layout this reader does not decode
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Resolution parameter outside `1..=2^29`
    #[error("Invalid nside: {0}")]
    InvalidNside(u64),

    /// Operation needs a power-of-two nside (NESTED indexing, resampling)
    #[error("nside {0} is not a power of two")]
    NotPowerOfTwo(u64),

    /// Pixel index out of bounds
    #[error("Pixel index {index} out of range (npix: {npix})")]
    PixelOutOfRange { index: u64, npix: u64 },

    /// Array length does not match the expected pixel count
    #[error("Length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Mesh violates face arity or index bounds
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// Malformed line in a text input
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Job configuration is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid header error.
    pub fn header(msg: impl Into<String>) -> Self {
        Self::InvalidHeader(msg.into())
    }

    /// Create a parse error for a 1-based line number.
    pub fn parse(line: usize, msg: impl Into<String>) -> Self {
        Self::Parse { line, message: msg.into() }
    }
}

/// Result type alias for skymesh operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::NotFits;
        assert!(e.to_string().contains("SIMPLE"));

        let e = Error::PixelOutOfRange { index: 12, npix: 12 };
        assert!(e.to_string().contains("12"));

        let e = Error::parse(7, "bad vertex");
        assert_eq!(e.to_string(), "Parse error at line 7: bad vertex");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
