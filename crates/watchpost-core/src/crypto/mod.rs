// ============================================
// File: crates/watchpost-core/src/crypto/mod.rs
// ============================================
//! # Cryptography Module
//!
//! ## Creation Reason
//! Centralizes key handling and datagram encryption, using the audited
//! RustCrypto `rsa` implementation.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`keys`]: PEM key material, generation, capacity limits
//! - [`transport`]: RSA-OAEP (SHA-256) seal/open
//!
//! ## Cryptographic Design
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Agent                                       Collector      │
//! │    │                                              │         │
//! │    │  Packet ─► encode ─► OAEP seal (public key)  │         │
//! │    │ ─────────────────── datagram ──────────────► │         │
//! │    │              OAEP open (private key) ─► decode         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - NEVER roll your own padding
//! - The ciphertext size is the datagram size; size receive buffers from
//!   `KeyCapacity::max_packet_size`
//!
//! ## Last Modified
//! v0.1.0 - Initial crypto implementation

pub mod keys;
pub mod transport;

pub use keys::{
    KeyCapacity, PrivateKeyMaterial, PublicKeyMaterial, DEFAULT_KEY_BITS, MIN_KEY_BITS,
};
pub use transport::{OaepOpener, OaepSealer, TransportCipher};
