// ============================================
// File: crates/watchpost-core/src/protocol/packet.rs
// ============================================
//! # Telemetry Packet
//!
//! ## Creation Reason
//! Defines the unit of telemetry carried in one datagram and the
//! arithmetic that bounds its size by the RSA modulus.
//!
//! ## Capacity Arithmetic
//! ```text
//! max_packet_size    = modulus_bits / 8
//! max_plaintext_size = max_packet_size - (2 * 32 + 2)      // OAEP, SHA-256
//! max_payload_size   = max_plaintext_size - header_len
//!
//! header_len = 2        (Anonymous)
//!            = 2 + 32   (WithClientId)
//!
//! 1024-bit key: 128 / 62 / 28 (WithClientId) or 60 (Anonymous)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - OAEP_OVERHEAD is fixed by the padding scheme: changing the hash
//!   without changing it makes near-limit payloads fail to seal
//! - The layout must be identical on agent and collector
//!
//! ## Last Modified
//! v0.1.0 - Initial packet definition

use bytes::Bytes;

use watchpost_common::types::SERVICE_ID_SIZE;
use watchpost_common::{ClientId, ServiceId, CLIENT_ID_SIZE};

// ============================================
// Constants
// ============================================

/// SHA-256 digest size, used by OAEP for both hash and MGF1.
pub const HASH_SIZE: usize = 32;

/// Bytes consumed by OAEP padding: two digests plus two marker bytes.
pub const OAEP_OVERHEAD: usize = 2 * HASH_SIZE + 2;

/// Total ciphertext capacity for a modulus of `modulus_bits`.
#[must_use]
pub const fn max_packet_size(modulus_bits: usize) -> usize {
    modulus_bits / 8
}

/// Largest plaintext OAEP can seal under a modulus of `modulus_bits`.
#[must_use]
pub const fn max_plaintext_size(modulus_bits: usize) -> usize {
    max_packet_size(modulus_bits).saturating_sub(OAEP_OVERHEAD)
}

/// Largest payload a packet with `layout` can carry.
#[must_use]
pub const fn max_payload_size(modulus_bits: usize, layout: PacketLayout) -> usize {
    max_plaintext_size(modulus_bits).saturating_sub(layout.header_len())
}

// ============================================
// PacketLayout
// ============================================

/// Which fixed fields precede the payload on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PacketLayout {
    /// `[service id][payload]`
    Anonymous,
    /// `[service id][client id][payload]`
    #[default]
    WithClientId,
}

impl PacketLayout {
    /// Selects the layout from the `packet.client_id` configuration flag.
    #[must_use]
    pub const fn from_client_id_flag(enabled: bool) -> Self {
        if enabled {
            Self::WithClientId
        } else {
            Self::Anonymous
        }
    }

    /// Length of the fixed prefix before the payload.
    #[must_use]
    pub const fn header_len(&self) -> usize {
        match self {
            Self::Anonymous => SERVICE_ID_SIZE,
            Self::WithClientId => SERVICE_ID_SIZE + CLIENT_ID_SIZE,
        }
    }

    /// Returns `true` if the client id is on the wire.
    #[must_use]
    pub const fn carries_client_id(&self) -> bool {
        matches!(self, Self::WithClientId)
    }
}

// ============================================
// Packet
// ============================================

/// One unit of telemetry: which service produced it, optionally which
/// client, and the captured output.
///
/// # Example
/// ```
/// use watchpost_core::protocol::{Packet, PacketLayout};
/// use watchpost_common::{ClientId, ServiceId};
///
/// let packet = Packet::new(ServiceId::new(3), &b"load 0.42"[..])
///     .with_client_id(ClientId::from_name("web-01"));
/// assert_eq!(packet.layout(), PacketLayout::WithClientId);
/// assert_eq!(packet.encoded_len(), 2 + 32 + 9);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Originating service.
    pub service_id: ServiceId,
    /// Sending client, when the deployment identifies clients.
    pub client_id: Option<ClientId>,
    /// Captured command output.
    pub payload: Bytes,
}

impl Packet {
    /// Creates an anonymous packet.
    pub fn new(service_id: ServiceId, payload: impl Into<Bytes>) -> Self {
        Self {
            service_id,
            client_id: None,
            payload: payload.into(),
        }
    }

    /// Attaches the client id.
    #[must_use]
    pub fn with_client_id(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    /// Layout implied by the fields that are set.
    #[must_use]
    pub const fn layout(&self) -> PacketLayout {
        if self.client_id.is_some() {
            PacketLayout::WithClientId
        } else {
            PacketLayout::Anonymous
        }
    }

    /// Number of bytes `encode` produces for this packet.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.layout().header_len() + self.payload.len()
    }
}
