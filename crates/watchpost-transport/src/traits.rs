// ============================================
// File: crates/watchpost-transport/src/traits.rs
// ============================================
//! # Transport Traits
//!
//! ## Creation Reason
//! Defines the datagram interface shared by the agent's sender and the
//! collector's listener so both can run against an in-memory mock.
//!
//! ## Main Functionality
//! - `Transport`: datagram send/receive with explicit shutdown
//! - `PacketSource`: where and when a datagram arrived
//!
//! ## ⚠️ Important Note for Next Developer
//! - Implementations must be Send + Sync for use in async contexts
//! - `shutdown` must wake a pending `recv`, which then returns
//!   `TransportError::ShuttingDown`
//! - Buffer management is caller's responsibility
//!
//! ## Last Modified
//! v0.1.0 - Initial trait definitions

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::error::Result;

// ============================================
// PacketSource
// ============================================

/// Metadata about the source of a received datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketSource {
    /// Source address (IP and port).
    pub addr: SocketAddr,
    /// When the datagram was received.
    pub timestamp: Instant,
}

impl PacketSource {
    /// Creates a new `PacketSource` stamped now.
    #[must_use]
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            timestamp: Instant::now(),
        }
    }

    /// Returns the time since the datagram was received.
    #[must_use]
    pub fn age(&self) -> std::time::Duration {
        self.timestamp.elapsed()
    }
}

// ============================================
// Transport Trait
// ============================================

/// Abstract interface for datagram-based transport.
///
/// # Example
/// ```ignore
/// async fn drain<T: Transport>(transport: &T) -> Result<()> {
///     let mut buf = [0u8; 256];
///     loop {
///         match transport.recv(&mut buf).await {
///             Ok((len, source)) => handle(&buf[..len], source),
///             Err(e) if e.is_shutdown() => return Ok(()),
///             Err(e) => warn!("receive failed: {e}"),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Receives one datagram.
    ///
    /// # Returns
    /// Tuple of (bytes received, datagram source)
    ///
    /// # Errors
    /// `ShuttingDown` once the transport is shut down, otherwise the
    /// receive failure.
    async fn recv(&self, buf: &mut [u8]) -> Result<(usize, PacketSource)>;

    /// Sends one datagram to `dest`.
    ///
    /// # Errors
    /// Returns error if send fails.
    async fn send(&self, buf: &[u8], dest: &SocketAddr) -> Result<usize>;

    /// Sends one datagram to the connected peer.
    ///
    /// # Errors
    /// `NotConnected` if the transport has no peer, otherwise as
    /// [`Transport::send`].
    async fn send_to_peer(&self, buf: &[u8]) -> Result<usize>;

    /// Returns the local address this transport is bound to.
    ///
    /// # Errors
    /// Returns error if address cannot be determined.
    fn local_addr(&self) -> Result<SocketAddr>;

    /// Returns the connected peer, if any.
    fn peer_addr(&self) -> Option<SocketAddr>;

    /// Shuts the transport down and wakes any pending receive.
    ///
    /// # Errors
    /// Returns error if shutdown fails.
    async fn shutdown(&self) -> Result<()>;

    /// Returns `true` until the transport is shut down.
    fn is_active(&self) -> bool;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn recv(&self, buf: &mut [u8]) -> Result<(usize, PacketSource)> {
        (**self).recv(buf).await
    }

    async fn send(&self, buf: &[u8], dest: &SocketAddr) -> Result<usize> {
        (**self).send(buf, dest).await
    }

    async fn send_to_peer(&self, buf: &[u8]) -> Result<usize> {
        (**self).send_to_peer(buf).await
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        (**self).local_addr()
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        (**self).peer_addr()
    }

    async fn shutdown(&self) -> Result<()> {
        (**self).shutdown().await
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }
}

// ============================================
// Tests
// ============================================
