// ============================================
// File: crates/watchpost-core/src/crypto/transport.rs
// ============================================
//! # Transport Cipher
//!
//! ## Creation Reason
//! Seals encoded packets for the wire and opens received datagrams,
//! using RSA-OAEP with SHA-256 for both the hash and MGF1.
//!
//! ## Main Functionality
//! - `TransportCipher`: trait for seal/open with capacity queries
//! - `OaepSealer`: agent side, public key only
//! - `OaepOpener`: collector side, private key (can also seal)
//!
//! ## Datagram Format
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │ OAEP ciphertext, exactly modulus_bits / 8 bytes    │
//! │   └─ plaintext = encoded Packet (≤ max_plaintext)  │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Properties
//! - **Confidentiality**: only the private key holder can open
//! - **Randomized**: identical plaintexts give different ciphertexts
//! - **No authentication**: anyone holding the public key can seal
//!
//! ## ⚠️ Important Note for Next Developer
//! - Every open failure maps to the single `Decryption` error
//! - Decryption uses blinding; keep it that way
//!
//! ## Last Modified
//! v0.1.0 - Initial transport cipher implementation

use rand::rngs::OsRng;
use rsa::Oaep;
use sha2::Sha256;

use crate::crypto::keys::{KeyCapacity, PrivateKeyMaterial, PublicKeyMaterial};
use crate::error::{CoreError, Result};

// ============================================
// TransportCipher Trait
// ============================================

/// Trait for sealing and opening telemetry datagrams.
///
/// # Purpose
/// Abstracts the cipher so the aggregator and listener can be tested
/// without generating RSA keys.
pub trait TransportCipher: Send + Sync {
    /// Encrypts an encoded packet.
    ///
    /// # Errors
    /// - `Encryption`: plaintext longer than [`Self::max_plaintext_size`],
    ///   or the cipher failed
    /// - `InvalidState`: this side cannot seal
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypts a received datagram.
    ///
    /// # Errors
    /// - `Decryption`: corrupt, truncated or foreign-key ciphertext
    /// - `InvalidState`: this side cannot open
    fn open(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Largest plaintext accepted by [`Self::seal`].
    fn max_plaintext_size(&self) -> usize;

    /// Size of every ciphertext; receive buffers must be at least this.
    fn max_ciphertext_size(&self) -> usize;
}

fn padding() -> Oaep {
    Oaep::new::<Sha256>()
}

fn seal_with(key: &PublicKeyMaterial, plaintext: &[u8]) -> Result<Vec<u8>> {
    let max = key.max_plaintext_size();
    if plaintext.len() > max {
        return Err(CoreError::encryption(format!(
            "plaintext of {} bytes exceeds capacity of {max} bytes",
            plaintext.len()
        )));
    }

    key.as_rsa()
        .encrypt(&mut OsRng, padding(), plaintext)
        .map_err(|e| CoreError::encryption(e.to_string()))
}

// ============================================
// OaepSealer
// ============================================

/// Agent-side cipher holding only the collector's public key.
#[derive(Debug, Clone)]
pub struct OaepSealer {
    key: PublicKeyMaterial,
}

impl OaepSealer {
    /// Creates a sealer for `key`.
    #[must_use]
    pub const fn new(key: PublicKeyMaterial) -> Self {
        Self { key }
    }

    /// Key this sealer encrypts to.
    #[must_use]
    pub const fn public_key(&self) -> &PublicKeyMaterial {
        &self.key
    }
}

impl TransportCipher for OaepSealer {
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        seal_with(&self.key, plaintext)
    }

    fn open(&self, _ciphertext: &[u8]) -> Result<Vec<u8>> {
        Err(CoreError::invalid_state("open", "a private key"))
    }

    fn max_plaintext_size(&self) -> usize {
        self.key.max_plaintext_size()
    }

    fn max_ciphertext_size(&self) -> usize {
        self.key.max_packet_size()
    }
}

// ============================================
// OaepOpener
// ============================================

/// Collector-side cipher holding the private key.
#[derive(Debug, Clone)]
pub struct OaepOpener {
    key: PrivateKeyMaterial,
    public: PublicKeyMaterial,
}

impl OaepOpener {
    /// Creates an opener for `key`.
    #[must_use]
    pub fn new(key: PrivateKeyMaterial) -> Self {
        let public = key.public_key();
        Self { key, public }
    }
}

impl TransportCipher for OaepOpener {
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        seal_with(&self.public, plaintext)
    }

    fn open(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.key
            .as_rsa()
            .decrypt_blinded(&mut OsRng, padding(), ciphertext)
            .map_err(|_| CoreError::Decryption)
    }

    fn max_plaintext_size(&self) -> usize {
        self.key.max_plaintext_size()
    }

    fn max_ciphertext_size(&self) -> usize {
        self.key.max_packet_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::tests::{other_key, test_key};

    fn pair() -> (OaepSealer, OaepOpener) {
        let key = test_key().clone();
        (OaepSealer::new(key.public_key()), OaepOpener::new(key))
    }

    #[test]
    fn test_seal_open() {
        let (sealer, opener) = pair();
        let plaintext = b"disk /var 71% used";

        let sealed = sealer.seal(plaintext).unwrap();
        assert_eq!(sealed.len(), 128);
        assert_eq!(sealed.len(), sealer.max_ciphertext_size());

        let opened = opener.open(&sealed).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_seal_is_randomized() {
        let (sealer, _) = pair();
        let a = sealer.seal(b"same").unwrap();
        let b = sealer.seal(b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_capacity_boundary() {
        let (sealer, opener) = pair();
        assert_eq!(sealer.max_plaintext_size(), 62);

        let at_limit = vec![7u8; 62];
        let sealed = sealer.seal(&at_limit).unwrap();
        assert_eq!(opener.open(&sealed).unwrap(), at_limit);

        let over = vec![7u8; 63];
        assert!(matches!(sealer.seal(&over), Err(CoreError::Encryption { .. })));
    }

    #[test]
    fn test_empty_plaintext() {
        let (sealer, opener) = pair();
        let sealed = sealer.seal(&[]).unwrap();
        assert!(opener.open(&sealed).unwrap().is_empty());
    }

    #[test]
    fn test_open_with_foreign_key_fails() {
        let sealer = OaepSealer::new(other_key().public_key());
        let (_, opener) = pair();

        let sealed = sealer.seal(b"hello").unwrap();
        assert!(matches!(opener.open(&sealed), Err(CoreError::Decryption)));
    }

    #[test]
    fn test_open_corrupted_fails() {
        let (sealer, opener) = pair();
        let mut sealed = sealer.seal(b"hello").unwrap();

        let truncated = &sealed[..sealed.len() - 1];
        assert!(matches!(opener.open(truncated), Err(CoreError::Decryption)));

        sealed[10] ^= 0xFF;
        assert!(matches!(opener.open(&sealed), Err(CoreError::Decryption)));

        assert!(matches!(opener.open(&[]), Err(CoreError::Decryption)));
    }

    #[test]
    fn test_sealer_cannot_open() {
        let (sealer, opener) = pair();
        let sealed = opener.seal(b"from collector").unwrap();
        assert!(matches!(
            sealer.open(&sealed),
            Err(CoreError::InvalidState { .. })
        ));
        assert_eq!(opener.open(&sealed).unwrap(), b"from collector");
    }
}
