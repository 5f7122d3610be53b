//! Error types for OxiLZ operations.
//!
//! Three failure classes cross the public API:
//!
//! - configuration errors ([`OxiLzError::InvalidParameter`]), raised before any
//!   stream is touched,
//! - data validity errors ([`OxiLzError::DataError`]), raised by a decoder that
//!   rejects its compressed input,
//! - I/O errors of the caller's own streams.
//!
//! A truncated container header is deliberately *not* an error; see
//! `oxilz::DecompressStatus`.

use crate::props::PropertyId;
use std::io;
use thiserror::Error;

/// The main error type for OxiLZ operations.
#[derive(Debug, Error)]
pub enum OxiLzError {
    /// I/O error from the underlying reader/writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A property identifier/value pairing was rejected.
    #[error("Invalid parameter{}: {message}", fmt_property(.property))]
    InvalidParameter {
        /// The offending property, when the failure is tied to one.
        property: Option<PropertyId>,
        /// Description of the problem.
        message: String,
    },

    /// The compressed input does not decode to a valid stream.
    #[error("Data error at output offset {offset}: {message}")]
    DataError {
        /// Number of uncompressed bytes produced before the failure.
        offset: u64,
        /// Description of the inconsistency.
        message: String,
    },

    /// A configuration document could not be parsed.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the parse failure.
        message: String,
    },
}

fn fmt_property(property: &Option<PropertyId>) -> String {
    match property {
        Some(id) => format!(" for {}", id.name()),
        None => String::new(),
    }
}

/// Result type alias for OxiLZ operations.
pub type Result<T> = std::result::Result<T, OxiLzError>;

impl OxiLzError {
    /// Create an invalid parameter error tied to a property.
    pub fn invalid_parameter(property: PropertyId, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            property: Some(property),
            message: message.into(),
        }
    }

    /// Create an invalid parameter error not tied to a single property.
    pub fn invalid_usage(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            property: None,
            message: message.into(),
        }
    }

    /// Create a data error.
    pub fn data_error(offset: u64, message: impl Into<String>) -> Self {
        Self::DataError {
            offset,
            message: message.into(),
        }
    }

    /// Create a configuration document error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error is a configuration error.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, Self::InvalidParameter { .. })
    }

    /// Whether this error reports malformed compressed data.
    pub fn is_data_error(&self) -> bool {
        matches!(self, Self::DataError { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OxiLzError::invalid_parameter(PropertyId::PosStateBits, "5 exceeds 4");
        assert_eq!(
            err.to_string(),
            "Invalid parameter for PosStateBits: 5 exceeds 4"
        );

        let err = OxiLzError::invalid_usage("length mismatch");
        assert_eq!(err.to_string(), "Invalid parameter: length mismatch");

        let err = OxiLzError::data_error(42, "distance out of range");
        assert!(err.to_string().contains("offset 42"));
    }

    #[test]
    fn test_classification() {
        assert!(OxiLzError::invalid_usage("x").is_invalid_parameter());
        assert!(OxiLzError::data_error(0, "x").is_data_error());
        assert!(!OxiLzError::config("x").is_data_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: OxiLzError = io_err.into();
        assert!(matches!(err, OxiLzError::Io(_)));
    }
}
