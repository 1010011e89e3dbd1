// ============================================
// File: crates/watchpost-common/src/types.rs
// ============================================
//! # Identifier Types
//!
//! ## Creation Reason
//! Every telemetry packet names the service that produced it and,
//! optionally, the client it came from. Both identifiers are fixed-width
//! on the wire, so they get dedicated newtypes instead of bare integers
//! and byte vectors.
//!
//! ## Main Functionality
//! - `ServiceId`: index of a service in the agent configuration (u16, LE on the wire)
//! - `ClientId`: 32-byte client identifier, SHA-256 of the client name
//!
//! ## Wire Format
//! ```text
//! ┌──────────────────┬────────────────────────────┐
//! │ ServiceId (2 B)  │ ClientId (32 B, optional)  │
//! └──────────────────┴────────────────────────────┘
//! ```
//!
//! ## Last Modified
//! v0.1.0 - Initial identifier types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CommonError;

/// Size of a `ClientId` in bytes (SHA-256 digest size).
pub const CLIENT_ID_SIZE: usize = 32;

/// Size of a `ServiceId` on the wire.
pub const SERVICE_ID_SIZE: usize = 2;

// ============================================
// ServiceId
// ============================================

/// Index of a configured service within one agent.
///
/// Assigned in configuration order, so the first `[[services]]` entry
/// is `ServiceId(0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(u16);

impl ServiceId {
    /// Creates a service id from its raw value.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Creates a service id from a configuration index.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the index does not fit in 16 bits.
    pub fn from_index(index: usize) -> Result<Self, CommonError> {
        u16::try_from(index).map(Self).map_err(|_| {
            CommonError::invalid_input("service index", format!("{index} exceeds {}", u16::MAX))
        })
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(&self) -> u16 {
        self.0
    }

    /// Returns the little-endian wire representation.
    #[must_use]
    pub const fn to_le_bytes(&self) -> [u8; SERVICE_ID_SIZE] {
        self.0.to_le_bytes()
    }

    /// Reads a service id from its little-endian wire representation.
    #[must_use]
    pub const fn from_le_bytes(bytes: [u8; SERVICE_ID_SIZE]) -> Self {
        Self(u16::from_le_bytes(bytes))
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for ServiceId {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

// ============================================
// ClientId
// ============================================

/// Identifier of a sending agent.
///
/// Derived from the configured client name with SHA-256 so that both
/// sides can compute it from configuration alone.
///
/// # Example
/// ```
/// use watchpost_common::ClientId;
///
/// let id = ClientId::from_name("web-01");
/// let parsed: ClientId = id.to_string().parse().unwrap();
/// assert_eq!(id, parsed);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId([u8; CLIENT_ID_SIZE]);

impl ClientId {
    /// Derives the identifier for a client name.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let digest = Sha256::digest(name.as_bytes());
        let mut bytes = [0u8; CLIENT_ID_SIZE];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Creates an identifier from raw bytes.
    ///
    /// # Errors
    /// Returns `InvalidLength` unless exactly 32 bytes are given.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CommonError> {
        let array: [u8; CLIENT_ID_SIZE] = bytes
            .try_into()
            .map_err(|_| CommonError::invalid_length(CLIENT_ID_SIZE, bytes.len()))?;
        Ok(Self(array))
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; CLIENT_ID_SIZE] {
        &self.0
    }

    /// Returns the lowercase hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short prefix keeps log lines readable.
        write!(f, "ClientId({}..)", &self.to_hex()[..8])
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ClientId {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim())?;
        Self::from_bytes(&bytes)
    }
}

impl AsRef<[u8]> for ClientId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for ClientId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ClientId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
