// ============================================
// File: crates/watchpost-collector/src/error.rs
// ============================================
//! # Collector Error Types
//!
//! ## Creation Reason
//! Errors raised by the collector: configuration, startup, per-datagram
//! rejection and sink delivery.
//!
//! ## Error Categories
//! 1. **Configuration Errors**: unreadable or invalid `collector.toml`
//! 2. **Startup Errors**: key or bind failures, fatal
//! 3. **Datagram Errors**: one datagram rejected, the listener continues
//! 4. **Sink Errors**: one record not persisted, the listener continues
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::net::SocketAddr;

use thiserror::Error;

use watchpost_common::error::CommonError;
use watchpost_core::error::CoreError;
use watchpost_transport::error::TransportError;

/// Result type for collector operations.
pub type Result<T> = std::result::Result<T, CollectorError>;

/// Collector error types.
#[derive(Error, Debug)]
pub enum CollectorError {
    /// Configuration file could not be read or parsed.
    #[error("Failed to load configuration from '{path}': {reason}")]
    ConfigLoad {
        /// Path of the configuration file
        path: String,
        /// Reader or parser message
        reason: String,
    },

    /// Configuration parsed but a value is unacceptable.
    #[error("Invalid configuration: {field} - {reason}")]
    ConfigInvalid {
        /// Failing field
        field: String,
        /// Why it's invalid
        reason: String,
    },

    /// Collector failed before reaching `Running`.
    #[error("Collector failed to start: {reason}")]
    StartupFailed {
        /// What went wrong
        reason: String,
    },

    /// Datagram was opened and decoded but is not accepted.
    #[error("Rejected datagram from {from_addr}: {reason}")]
    Rejected {
        /// Sender address
        from_addr: String,
        /// Why it was rejected
        reason: String,
    },

    /// Record could not be persisted.
    #[error("Sink '{sink}' failed: {reason}")]
    Sink {
        /// Sink name
        sink: &'static str,
        /// Underlying failure
        reason: String,
    },

    /// A task ended in an unexpected way.
    #[error("Internal error: {message}")]
    Internal {
        /// Description
        message: String,
    },

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),

    /// Error from core crate.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Error from transport crate.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CollectorError {
    /// Creates a `ConfigLoad` error.
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `ConfigInvalid` error.
    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `StartupFailed` error.
    pub fn startup_failed(reason: impl Into<String>) -> Self {
        Self::StartupFailed {
            reason: reason.into(),
        }
    }

    /// Creates a `Rejected` error.
    pub fn rejected(source: SocketAddr, reason: impl Into<String>) -> Self {
        Self::Rejected {
            from_addr: source.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a `Sink` error.
    pub fn sink(sink: &'static str, reason: impl Into<String>) -> Self {
        Self::Sink {
            sink,
            reason: reason.into(),
        }
    }

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` for configuration problems.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigLoad { .. } | Self::ConfigInvalid { .. })
    }

    /// Returns `true` if this error only affects one datagram.
    #[must_use]
    pub fn is_per_datagram(&self) -> bool {
        match self {
            Self::Rejected { .. } | Self::Sink { .. } => true,
            Self::Core(e) => e.is_crypto_error() || e.is_protocol_error(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CollectorError::rejected("10.0.0.7:40000".parse().unwrap(), "unknown client");
        assert!(err.to_string().contains("10.0.0.7:40000"));
        assert!(err.to_string().contains("unknown client"));

        let err = CollectorError::sink("json_lines", "disk full");
        assert_eq!(err.to_string(), "Sink 'json_lines' failed: disk full");
    }

    #[test]
    fn test_error_classification() {
        assert!(CollectorError::config_invalid("sink.path", "required").is_config_error());
        assert!(CollectorError::sink("log", "x").is_per_datagram());
        assert!(CollectorError::from(CoreError::Decryption).is_per_datagram());
        assert!(!CollectorError::startup_failed("bind").is_per_datagram());
    }
}
