// ============================================
// File: crates/watchpost-transport/src/lib.rs
// ============================================
//! # Watchpost Transport - Datagram I/O Layer
//!
//! ## Creation Reason
//! Provides the UDP transport used by agents to send sealed telemetry
//! and by the collector to receive it.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`traits`]: Transport trait definitions for abstraction
//! - [`udp`]: UDP socket implementation
//! - [`mock`]: In-memory transport (tests and `mock` feature)
//! - [`error`]: Transport-specific error types
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │      watchpost-agent        watchpost-collector     │
//! │             │                       │               │
//! │         ┌───┴───────────────────────┴───┐           │
//! │         ▼                               ▼           │
//! │   watchpost-core            watchpost-transport     │
//! │                             You are here ◄──        │
//! │         │                               │           │
//! │         └───────────────┬───────────────┘           │
//! │                         ▼                           │
//! │                  watchpost-common                   │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Always use the `Transport` trait for testability
//! - Mock implementation available with `mock` feature
//!
//! ## Last Modified
//! v0.1.0 - Initial transport layer implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod traits;
pub mod udp;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export primary types
pub use error::{Result, TransportError};
pub use traits::{PacketSource, Transport};
pub use udp::UdpTransport;
