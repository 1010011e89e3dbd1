// ============================================
// File: crates/watchpost-core/src/protocol/codec.rs
// ============================================
//! # Packet Codec
//!
//! ## Creation Reason
//! Deterministic byte encoding of a [`Packet`] before it is sealed, and
//! the inverse after a datagram is opened.
//!
//! ## Wire Format
//! ```text
//! ┌──────────────────┬─────────────────────────┬──────────────────────┐
//! │ service id (u16) │ client id (32 B)        │ payload (remaining)  │
//! │ little-endian    │ WithClientId layout only│ no length prefix     │
//! └──────────────────┴─────────────────────────┴──────────────────────┘
//! ```
//!
//! ## Parsing Strategy
//! 1. Check the buffer covers the fixed prefix of the layout
//! 2. Read the service id, then the client id if the layout has one
//! 3. Everything left is payload
//!
//! ## ⚠️ Important Note for Next Developer
//! - Payload length is implied by the datagram length; never add padding
//!
//! ## Last Modified
//! v0.1.0 - Initial codec implementation

use bytes::{Buf, BufMut, Bytes, BytesMut};

use watchpost_common::types::SERVICE_ID_SIZE;
use watchpost_common::{ClientId, ServiceId, CLIENT_ID_SIZE};

use crate::error::{CoreError, Result};
use crate::protocol::packet::{Packet, PacketLayout};

// ============================================
// Codec Trait
// ============================================

/// Trait for encoding and decoding wire messages.
pub trait Codec<T> {
    /// Encodes a message into a byte buffer.
    ///
    /// # Errors
    /// Returns an error if the message cannot be represented.
    fn encode(&self, msg: &T, buf: &mut BytesMut) -> Result<()>;

    /// Decodes a message, consuming `buf`.
    ///
    /// # Errors
    /// Returns an error if the bytes are not a valid message.
    fn decode(&self, buf: &mut Bytes) -> Result<T>;
}

// ============================================
// PacketCodec
// ============================================

/// Codec for telemetry packets in one fixed layout.
#[derive(Debug, Default, Clone, Copy)]
pub struct PacketCodec {
    layout: PacketLayout,
}

impl PacketCodec {
    /// Creates a codec for `layout`.
    #[must_use]
    pub const fn new(layout: PacketLayout) -> Self {
        Self { layout }
    }

    /// Returns the layout this codec reads and writes.
    #[must_use]
    pub const fn layout(&self) -> PacketLayout {
        self.layout
    }

    /// Encodes a packet into a fresh buffer.
    ///
    /// # Errors
    /// `MalformedMessage` if the packet does not match the layout.
    pub fn encode_packet(&self, packet: &Packet) -> Result<BytesMut> {
        let mut buf = BytesMut::with_capacity(packet.encoded_len());
        self.encode(packet, &mut buf)?;
        Ok(buf)
    }

    /// Decodes a packet from a byte slice.
    ///
    /// # Errors
    /// `MessageTooShort` if the slice is shorter than the fixed prefix.
    pub fn decode_packet(&self, buf: &[u8]) -> Result<Packet> {
        let mut bytes = Bytes::copy_from_slice(buf);
        self.decode(&mut bytes)
    }
}

impl Codec<Packet> for PacketCodec {
    fn encode(&self, msg: &Packet, buf: &mut BytesMut) -> Result<()> {
        if msg.layout() != self.layout {
            return Err(CoreError::malformed(format!(
                "packet layout {:?} does not match codec layout {:?}",
                msg.layout(),
                self.layout
            )));
        }

        buf.reserve(msg.encoded_len());
        buf.put_slice(&msg.service_id.to_le_bytes());
        if let Some(client_id) = &msg.client_id {
            buf.put_slice(client_id.as_bytes());
        }
        buf.put_slice(&msg.payload);
        Ok(())
    }

    fn decode(&self, buf: &mut Bytes) -> Result<Packet> {
        let header_len = self.layout.header_len();
        if buf.len() < header_len {
            return Err(CoreError::too_short(header_len, buf.len()));
        }

        let mut raw_service = [0u8; SERVICE_ID_SIZE];
        buf.copy_to_slice(&mut raw_service);
        let service_id = ServiceId::from_le_bytes(raw_service);

        let client_id = if self.layout.carries_client_id() {
            let mut raw = [0u8; CLIENT_ID_SIZE];
            buf.copy_to_slice(&mut raw);
            Some(ClientId::from_bytes(&raw)?)
        } else {
            None
        };

        let payload = buf.split_to(buf.len());

        Ok(Packet {
            service_id,
            client_id,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(with_client: bool) -> Packet {
        let packet = Packet::new(ServiceId::new(123), &b"cpu=3% mem=41%"[..]);
        if with_client {
            packet.with_client_id(ClientId::from_name("web-01"))
        } else {
            packet
        }
    }

    #[test]
    fn test_roundtrip_with_client_id() {
        let codec = PacketCodec::new(PacketLayout::WithClientId);
        let original = sample(true);

        let encoded = codec.encode_packet(&original).unwrap();
        assert_eq!(encoded.len(), 2 + 32 + original.payload.len());

        let decoded = codec.decode_packet(&encoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_roundtrip_anonymous() {
        let codec = PacketCodec::new(PacketLayout::Anonymous);
        let original = sample(false);

        let encoded = codec.encode_packet(&original).unwrap();
        assert_eq!(encoded.len(), 2 + original.payload.len());
        assert_eq!(codec.decode_packet(&encoded).unwrap(), original);
    }

    #[test]
    fn test_service_id_is_little_endian_first() {
        let codec = PacketCodec::new(PacketLayout::Anonymous);
        let packet = Packet::new(ServiceId::new(0x0A0B), &b"x"[..]);
        let encoded = codec.encode_packet(&packet).unwrap();
        assert_eq!(&encoded[..], &[0x0B, 0x0A, b'x']);
    }

    #[test]
    fn test_empty_payload_roundtrip() {
        let codec = PacketCodec::new(PacketLayout::WithClientId);
        let packet = Packet::new(ServiceId::new(1), Bytes::new())
            .with_client_id(ClientId::from_name("idle"));
        let encoded = codec.encode_packet(&packet).unwrap();
        assert_eq!(encoded.len(), 34);
        assert_eq!(codec.decode_packet(&encoded).unwrap(), packet);
    }

    #[test]
    fn test_decode_too_short() {
        let codec = PacketCodec::new(PacketLayout::WithClientId);
        let result = codec.decode_packet(&[0u8; 20]);
        assert!(matches!(
            result,
            Err(CoreError::MessageTooShort { expected: 34, actual: 20 })
        ));

        let anonymous = PacketCodec::new(PacketLayout::Anonymous);
        assert!(anonymous.decode_packet(&[0u8; 1]).is_err());
    }

    #[test]
    fn test_encode_rejects_layout_mismatch() {
        let codec = PacketCodec::new(PacketLayout::WithClientId);
        let result = codec.encode_packet(&sample(false));
        assert!(matches!(result, Err(CoreError::MalformedMessage { .. })));

        let anonymous = PacketCodec::new(PacketLayout::Anonymous);
        assert!(anonymous.encode_packet(&sample(true)).is_err());
    }
}
