// ============================================
// File: crates/watchpost-core/src/error.rs
// ============================================
//! # Core Error Types
//!
//! ## Creation Reason
//! Error types for packet framing, key handling and the transport
//! cipher.
//!
//! ## Error Categories
//! 1. **Crypto Errors**: key parsing/generation, seal/open failures
//! 2. **Protocol Errors**: short or inconsistent packets
//! 3. **State Errors**: an operation the key half cannot perform
//!
//! ## ⚠️ Important Note for Next Developer
//! - `Decryption` is deliberately detail-free: it must not tell a caller
//!   whether padding or the key was wrong
//! - NEVER include key material or payload bytes in error messages
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use watchpost_common::error::CommonError;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error types for framing and cryptographic operations.
#[derive(Error, Debug)]
pub enum CoreError {
    // ========================================
    // Cryptographic Errors
    // ========================================

    /// Failed to generate a key pair.
    #[error("Key generation failed: {context}")]
    KeyGeneration {
        /// What went wrong
        context: String,
    },

    /// Key material could not be parsed.
    #[error("Invalid {kind} key: {reason}")]
    KeyParse {
        /// "public" or "private"
        kind: &'static str,
        /// Parser message
        reason: String,
    },

    /// Key modulus too small to carry any payload.
    #[error("Key too small: {bits} bits, minimum {min} bits")]
    KeyTooSmall {
        /// Modulus size of the rejected key
        bits: usize,
        /// Minimum accepted modulus size
        min: usize,
    },

    /// Encryption operation failed.
    #[error("Encryption failed: {context}")]
    Encryption {
        /// What was being encrypted
        context: String,
    },

    /// Decryption failed (corrupt, truncated or foreign-key ciphertext).
    #[error("Decryption failed")]
    Decryption,

    // ========================================
    // Protocol Errors
    // ========================================

    /// Packet is inconsistent with the configured layout.
    #[error("Malformed packet: {reason}")]
    MalformedMessage {
        /// What's wrong with the packet
        reason: String,
    },

    /// Packet is too short to be valid.
    #[error("Packet too short: expected at least {expected} bytes, got {actual}")]
    MessageTooShort {
        /// Minimum expected length
        expected: usize,
        /// Actual length received
        actual: usize,
    },

    /// Packet exceeds the capacity of the key.
    #[error("Packet too large: max {max} bytes, got {actual}")]
    MessageTooLarge {
        /// Maximum allowed size
        max: usize,
        /// Actual size
        actual: usize,
    },

    // ========================================
    // State Errors
    // ========================================

    /// Operation not valid for this key half.
    #[error("Invalid state for operation: {operation} requires {required_state}")]
    InvalidState {
        /// What operation was attempted
        operation: String,
        /// What was required
        required_state: String,
    },

    // ========================================
    // Wrapped Errors
    // ========================================

    /// Key file could not be read or written.
    #[error("I/O error: {context}")]
    Io {
        /// What was happening
        context: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl CoreError {
    /// Creates a `KeyGeneration` error.
    pub fn key_generation(context: impl Into<String>) -> Self {
        Self::KeyGeneration {
            context: context.into(),
        }
    }

    /// Creates a `KeyParse` error.
    pub fn key_parse(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::KeyParse {
            kind,
            reason: reason.into(),
        }
    }

    /// Creates an `Encryption` error.
    pub fn encryption(context: impl Into<String>) -> Self {
        Self::Encryption {
            context: context.into(),
        }
    }

    /// Creates a `MalformedMessage` error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedMessage {
            reason: reason.into(),
        }
    }

    /// Creates a `MessageTooShort` error.
    #[must_use]
    pub const fn too_short(expected: usize, actual: usize) -> Self {
        Self::MessageTooShort { expected, actual }
    }

    /// Creates a `MessageTooLarge` error.
    #[must_use]
    pub const fn too_large(max: usize, actual: usize) -> Self {
        Self::MessageTooLarge { max, actual }
    }

    /// Creates an `InvalidState` error.
    pub fn invalid_state(operation: impl Into<String>, required_state: impl Into<String>) -> Self {
        Self::InvalidState {
            operation: operation.into(),
            required_state: required_state.into(),
        }
    }

    /// Creates an `Io` error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns `true` if this is a cryptographic error.
    #[must_use]
    pub const fn is_crypto_error(&self) -> bool {
        matches!(
            self,
            Self::KeyGeneration { .. }
                | Self::KeyParse { .. }
                | Self::KeyTooSmall { .. }
                | Self::Encryption { .. }
                | Self::Decryption
        )
    }

    /// Returns `true` if this is a framing error.
    #[must_use]
    pub const fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedMessage { .. } | Self::MessageTooShort { .. } | Self::MessageTooLarge { .. }
        )
    }
}
