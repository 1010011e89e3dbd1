// ============================================
// File: crates/watchpost-transport/src/error.rs
// ============================================
//! # Transport Error Types
//!
//! ## Creation Reason
//! Defines error types for UDP socket setup and datagram I/O.
//!
//! ## Main Functionality
//! - `TransportError`: Primary error enum for transport operations
//! - Error conversion from system errors
//! - Categorization of retryable vs fatal errors
//!
//! ## Error Categories
//! 1. **Network Errors**: bind, resolve, send/receive failures
//! 2. **Configuration Errors**: unparseable addresses
//! 3. **Lifecycle Errors**: operations after shutdown
//!
//! ## ⚠️ Important Note for Next Developer
//! - `ShuttingDown` is the normal way a receive loop ends; do not log
//!   it as a failure
//! - Send errors are per-datagram and never fatal for the agent
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use watchpost_common::error::CommonError;

// ============================================
// Result Type Alias
// ============================================

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

// ============================================
// TransportError
// ============================================

/// Transport layer error types.
#[derive(Error, Debug)]
pub enum TransportError {
    // ========================================
    // Network Errors
    // ========================================

    /// Failed to bind to address.
    #[error("Failed to bind to {addr}: {reason}")]
    BindFailed {
        /// Address we tried to bind to
        addr: SocketAddr,
        /// Why binding failed
        reason: String,
    },

    /// Address already in use.
    #[error("Address {addr} already in use")]
    AddressInUse {
        /// The address that's in use
        addr: SocketAddr,
    },

    /// Failed to resolve or connect to the remote endpoint.
    #[error("Failed to connect to {remote}: {reason}")]
    ConnectFailed {
        /// Remote endpoint as configured
        remote: String,
        /// Why it failed
        reason: String,
    },

    /// Send operation failed.
    #[error("Failed to send to {dest}: {reason}")]
    SendFailed {
        /// Destination address
        dest: SocketAddr,
        /// Why send failed
        reason: String,
    },

    /// Receive operation failed.
    #[error("Failed to receive: {reason}")]
    ReceiveFailed {
        /// Why receive failed
        reason: String,
    },

    /// Socket has no default peer.
    #[error("Socket not connected")]
    NotConnected,

    // ========================================
    // Configuration Errors
    // ========================================

    /// Invalid socket address.
    #[error("Invalid address: {addr}")]
    InvalidAddress {
        /// The invalid address string
        addr: String,
    },

    // ========================================
    // Lifecycle Errors
    // ========================================

    /// Transport has been shut down.
    #[error("Transport is shutting down")]
    ShuttingDown,

    // ========================================
    // Wrapped Errors
    // ========================================

    /// I/O error from the system.
    #[error("I/O error: {context}")]
    Io {
        /// What was happening when the error occurred
        context: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl TransportError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates a `BindFailed` error.
    pub fn bind_failed(addr: SocketAddr, reason: impl Into<String>) -> Self {
        Self::BindFailed {
            addr,
            reason: reason.into(),
        }
    }

    /// Creates a `ConnectFailed` error.
    pub fn connect_failed(remote: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConnectFailed {
            remote: remote.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `Io` error with context.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if the transport was closed on purpose.
    #[must_use]
    pub const fn is_shutdown(&self) -> bool {
        matches!(self, Self::ShuttingDown)
    }
}

// ============================================
// Error Conversions
// ============================================

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            context: "unspecified I/O operation".into(),
            source: err,
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::bind_failed("127.0.0.1:7000".parse().unwrap(), "permission denied");
        assert!(err.to_string().contains("127.0.0.1:7000"));
        assert!(err.to_string().contains("permission denied"));

        let err = TransportError::connect_failed("collector.invalid:7000", "no such host");
        assert!(err.to_string().contains("collector.invalid:7000"));
    }

    #[test]
    fn test_error_classification() {
        let send_err = TransportError::SendFailed {
            dest: "127.0.0.1:7000".parse().unwrap(),
            reason: "connection refused".into(),
        };
        assert!(!send_err.is_shutdown());
        assert!(TransportError::ShuttingDown.is_shutdown());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::Interrupted, "interrupted");
        let transport_err: TransportError = io_err.into();
        assert!(matches!(transport_err, TransportError::Io { .. }));
        assert!(!transport_err.is_shutdown());
    }
}
