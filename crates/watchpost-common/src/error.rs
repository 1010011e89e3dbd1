// ============================================
// File: crates/watchpost-common/src/error.rs
// ============================================
//! # Common Error Types
//!
//! ## Creation Reason
//! Base error enum shared by the Watchpost crates. Higher layers wrap it
//! with `#[from]` so identifier parsing and lifecycle failures propagate
//! with `?`.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Never put payload bytes or key material into error messages
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

/// Common result type for operations that may fail.
pub type Result<T> = std::result::Result<T, CommonError>;

/// Common error types shared across Watchpost crates.
#[derive(Error, Debug)]
pub enum CommonError {
    /// Invalid input data provided.
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput {
        /// Name of the field or parameter
        field: String,
        /// Description of what's wrong
        reason: String,
    },

    /// Data length doesn't match expected size.
    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length in bytes
        expected: usize,
        /// Actual length received
        actual: usize,
    },

    /// Text could not be decoded into the expected representation.
    #[error("Decoding error in {context}: {details}")]
    Decoding {
        /// What was being decoded
        context: String,
        /// Decoder message
        details: String,
    },

    /// Could not install a process signal handler.
    #[error("Failed to install signal handler: {reason}")]
    SignalHandler {
        /// Why installation failed
        reason: String,
    },
}

impl CommonError {
    /// Creates an `InvalidInput` error.
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidLength` error.
    #[must_use]
    pub const fn invalid_length(expected: usize, actual: usize) -> Self {
        Self::InvalidLength { expected, actual }
    }
}

impl From<hex::FromHexError> for CommonError {
    fn from(err: hex::FromHexError) -> Self {
        Self::Decoding {
            context: "hex decode".into(),
            details: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CommonError::invalid_input("client_id", "must be 32 bytes");
        assert!(err.to_string().contains("client_id"));
        assert!(err.to_string().contains("32 bytes"));
    }

    #[test]
    fn test_hex_error_conversion() {
        let err: CommonError = hex::decode("zz").unwrap_err().into();
        assert!(matches!(err, CommonError::Decoding { .. }));
    }
}
