// ============================================
// File: crates/watchpost-transport/src/udp.rs
// ============================================
//! # UDP Transport Implementation
//!
//! ## Creation Reason
//! Provides the UDP socket used on both ends: a bound socket for the
//! collector's listener and a connected socket for the agent's sender.
//!
//! ## Main Functionality
//! - `UdpTransport::bind`: listening socket (collector)
//! - `UdpTransport::connect`: ephemeral socket with a default peer (agent)
//! - Async send/receive operations
//! - Shutdown that interrupts a blocked receive
//!
//! ## Design Choices
//! - Uses SO_REUSEADDR for quick rebinding after restart
//! - Atomic shutdown flag plus `Notify` to wake a pending `recv`
//!
//! ## ⚠️ Important Note for Next Developer
//! - UDP is connectionless - no guaranteed delivery
//! - A connected UDP socket only receives from its peer; agents never
//!   receive anyway
//! - The OS socket is closed when the transport is dropped
//!
//! ## Last Modified
//! v0.1.0 - Initial UDP transport implementation

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::Notify;
use tracing::{debug, info, trace};

use crate::error::{Result, TransportError};
use crate::traits::{PacketSource, Transport};

// ============================================
// UdpTransport
// ============================================

/// UDP-based transport implementation.
///
/// # Example
/// ```ignore
/// use watchpost_transport::{Transport, UdpTransport};
///
/// let collector = UdpTransport::bind("0.0.0.0:7000").await?;
/// let agent = UdpTransport::connect("collector.lan:7000").await?;
///
/// agent.send_to_peer(&sealed).await?;
///
/// let mut buf = [0u8; 256];
/// let (len, source) = collector.recv(&mut buf).await?;
/// ```
pub struct UdpTransport {
    /// Underlying UDP socket
    socket: UdpSocket,
    /// Local address we're bound to
    local_addr: SocketAddr,
    /// Default destination, set by `connect`
    peer: Option<SocketAddr>,
    /// Shutdown flag
    shutdown: AtomicBool,
    /// Wakes receivers on shutdown
    closed: Notify,
}

impl UdpTransport {
    /// Creates a new UDP transport bound to the specified address.
    ///
    /// # Arguments
    /// * `addr` - Address to bind to (e.g., "0.0.0.0:7000")
    ///
    /// # Errors
    /// - `InvalidAddress`: If `addr` is not a socket address
    /// - `BindFailed` / `AddressInUse`: If binding fails
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self> {
        let addr_str = addr.as_ref();
        let socket_addr: SocketAddr =
            addr_str
                .parse()
                .map_err(|_| TransportError::InvalidAddress {
                    addr: addr_str.to_string(),
                })?;

        Self::bind_addr(socket_addr).await
    }

    /// Creates a new UDP transport bound to the specified socket address.
    ///
    /// # Socket Options
    /// - `SO_REUSEADDR`: Enabled for quick rebinding
    /// - Non-blocking: Required for async operations
    ///
    /// # Errors
    /// Returns error if binding fails.
    pub async fn bind_addr(addr: SocketAddr) -> Result<Self> {
        debug!("Binding UDP transport to {}", addr);

        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))
            .map_err(|e| TransportError::io("creating UDP socket", e))?;

        socket
            .set_reuse_address(true)
            .map_err(|e| TransportError::io("setting SO_REUSEADDR", e))?;

        socket
            .set_nonblocking(true)
            .map_err(|e| TransportError::io("setting non-blocking", e))?;

        socket.bind(&addr.into()).map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                TransportError::AddressInUse { addr }
            } else {
                TransportError::bind_failed(addr, e.to_string())
            }
        })?;

        let std_socket: std::net::UdpSocket = socket.into();
        let tokio_socket = UdpSocket::from_std(std_socket)
            .map_err(|e| TransportError::io("converting to Tokio socket", e))?;

        let local_addr = tokio_socket
            .local_addr()
            .map_err(|e| TransportError::io("getting local address", e))?;

        info!("UDP transport bound to {}", local_addr);

        Ok(Self {
            socket: tokio_socket,
            local_addr,
            peer: None,
            shutdown: AtomicBool::new(false),
            closed: Notify::new(),
        })
    }

    /// Resolves `remote` ("host:port"), binds an ephemeral local port of
    /// the same address family and connects to the first address found.
    ///
    /// # Errors
    /// `ConnectFailed` if resolution or connect fails, otherwise as
    /// [`Self::bind_addr`].
    pub async fn connect(remote: impl AsRef<str>) -> Result<Self> {
        let remote = remote.as_ref();

        let peer = tokio::net::lookup_host(remote)
            .await
            .map_err(|e| TransportError::connect_failed(remote, e.to_string()))?
            .next()
            .ok_or_else(|| TransportError::connect_failed(remote, "no addresses resolved"))?;

        let local: SocketAddr = if peer.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let mut transport = Self::bind_addr(local).await?;
        transport
            .socket
            .connect(peer)
            .await
            .map_err(|e| TransportError::connect_failed(remote, e.to_string()))?;
        transport.peer = Some(peer);
        // Connecting fixes the source address; report it instead of the wildcard.
        transport.local_addr = transport
            .socket
            .local_addr()
            .map_err(|e| TransportError::io("getting local address", e))?;

        info!("UDP transport {} connected to {}", transport.local_addr, peer);
        Ok(transport)
    }

    /// Checks if the transport has been shut down.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn recv(&self, buf: &mut [u8]) -> Result<(usize, PacketSource)> {
        let closed = self.closed.notified();
        tokio::pin!(closed);
        closed.as_mut().enable();

        if self.is_shutdown() {
            return Err(TransportError::ShuttingDown);
        }

        let (len, addr) = tokio::select! {
            () = &mut closed => return Err(TransportError::ShuttingDown),
            result = self.socket.recv_from(buf) => {
                result.map_err(|e| TransportError::ReceiveFailed {
                    reason: e.to_string(),
                })?
            }
        };

        trace!("Received {} bytes from {}", len, addr);

        Ok((len, PacketSource::new(addr)))
    }

    async fn send(&self, buf: &[u8], dest: &SocketAddr) -> Result<usize> {
        if self.is_shutdown() {
            return Err(TransportError::ShuttingDown);
        }

        let len = self
            .socket
            .send_to(buf, dest)
            .await
            .map_err(|e| TransportError::SendFailed {
                dest: *dest,
                reason: e.to_string(),
            })?;

        trace!("Sent {} bytes to {}", len, dest);

        Ok(len)
    }

    async fn send_to_peer(&self, buf: &[u8]) -> Result<usize> {
        let peer = self.peer.ok_or(TransportError::NotConnected)?;
        if self.is_shutdown() {
            return Err(TransportError::ShuttingDown);
        }

        let len = self
            .socket
            .send(buf)
            .await
            .map_err(|e| TransportError::SendFailed {
                dest: peer,
                reason: e.to_string(),
            })?;

        trace!("Sent {} bytes to {}", len, peer);

        Ok(len)
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.local_addr)
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    async fn shutdown(&self) -> Result<()> {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.closed.notify_waiters();

        info!("UDP transport {} shut down", self.local_addr);
        Ok(())
    }

    fn is_active(&self) -> bool {
        !self.is_shutdown()
    }
}

impl std::fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpTransport")
            .field("local_addr", &self.local_addr)
            .field("peer", &self.peer)
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

// ============================================
// Tests
// ============================================
