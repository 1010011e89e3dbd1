// ============================================
// File: crates/watchpost-core/src/lib.rs
// ============================================
//! # Watchpost Core - Packet Codec & Transport Cipher
//!
//! ## Creation Reason
//! Provides the wire format and the encryption shared by the agent and
//! the collector. Both sides must agree on everything in this crate.
//!
//! ## Main Functionality
//!
//! ### Protocol Module ([`protocol`])
//! - `Packet` and `PacketLayout`
//! - `PacketCodec` for the byte encoding
//! - Capacity arithmetic bounded by the RSA modulus
//!
//! ### Crypto Module ([`crypto`])
//! - `PublicKeyMaterial` / `PrivateKeyMaterial` (PKCS#1 PEM)
//! - `TransportCipher` with `OaepSealer` and `OaepOpener`
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │      watchpost-agent        watchpost-collector     │
//! │             │                       │               │
//! │             └──────────┬────────────┘               │
//! │         ┌──────────────┴──────────┐                 │
//! │         ▼                         ▼                 │
//! │   watchpost-core  ◄──     watchpost-transport       │
//! │   You are here                    │                 │
//! │         │                         │                 │
//! │         └──────────┬──────────────┘                 │
//! │                    ▼                                │
//! │             watchpost-common                        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Wire format changes MUST be made on both sides at once
//! - ALL cryptographic code uses audited RustCrypto implementations
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod crypto;
pub mod error;
pub mod protocol;

// Re-export commonly used items
pub use crypto::{
    KeyCapacity, OaepOpener, OaepSealer, PrivateKeyMaterial, PublicKeyMaterial, TransportCipher,
};
pub use error::{CoreError, Result};
pub use protocol::{Packet, PacketCodec, PacketLayout};
