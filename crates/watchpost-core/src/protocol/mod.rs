// ============================================
// File: crates/watchpost-core/src/protocol/mod.rs
// ============================================
//! # Protocol Module
//!
//! ## Creation Reason
//! Defines what a telemetry datagram contains before encryption and how
//! large it may be.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`packet`]: `Packet`, `PacketLayout`, capacity arithmetic
//! - [`codec`]: byte encoding and decoding
//!
//! ## Protocol Overview
//! ```text
//! Agent                                                Collector
//!   │                                                      │
//!   │  RSA-OAEP( [service id][client id?][payload] )       │
//!   │ ───────────────────── one UDP datagram ────────────► │
//!   │                                                      │
//! ```
//! There is no handshake, acknowledgement or retransmission.
//!
//! ## ⚠️ Important Note for Next Developer
//! - ANY change to the prefix layout breaks every deployed agent
//!
//! ## Last Modified
//! v0.1.0 - Initial protocol definitions

pub mod codec;
pub mod packet;

pub use codec::{Codec, PacketCodec};
pub use packet::{
    max_packet_size, max_payload_size, max_plaintext_size, Packet, PacketLayout, HASH_SIZE,
    OAEP_OVERHEAD,
};
