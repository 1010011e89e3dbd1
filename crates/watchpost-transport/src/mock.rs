// ============================================
// File: crates/watchpost-transport/src/mock.rs
// ============================================
//! # Mock Transport Implementation
//!
//! ## Creation Reason
//! Provides an in-memory datagram transport so the aggregator and
//! listener can be tested without sockets.
//!
//! ## Main Functionality
//! - Injected datagrams returned by `recv`
//! - Sent datagrams captured for verification
//! - Switchable send failures
//! - Shutdown that wakes a pending `recv`
//!
//! ## Usage in Tests
//! ```ignore
//! use watchpost_transport::mock::MockTransport;
//! use watchpost_transport::Transport;
//!
//! let transport = MockTransport::new();
//! transport.send_to_peer(b"sealed").await?;
//! assert_eq!(transport.take_sent(), vec![b"sealed".to_vec()]);
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This is for testing only - do not use in production
//!
//! ## Last Modified
//! v0.1.0 - Initial mock implementation

use std::collections::VecDeque;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::{Result, TransportError};
use crate::traits::{PacketSource, Transport};

// ============================================
// Constants
// ============================================

/// Maximum number of datagrams to queue.
const MAX_QUEUE_SIZE: usize = 1000;

// ============================================
// MockTransport
// ============================================

/// In-memory transport for testing.
pub struct MockTransport {
    /// Address reported by `local_addr`
    local_addr: SocketAddr,
    /// Address reported by `peer_addr`
    peer: SocketAddr,
    /// Datagrams waiting to be received, with their source
    inbound: Mutex<VecDeque<(Vec<u8>, SocketAddr)>>,
    /// Datagrams that have been sent
    sent: Mutex<Vec<Vec<u8>>>,
    /// When set, every send fails
    fail_sends: AtomicBool,
    /// Shutdown flag
    shutdown: AtomicBool,
    /// Wakes receivers on inject or shutdown
    notify: Notify,
}

impl MockTransport {
    /// Creates a new mock transport.
    #[must_use]
    pub fn new() -> Self {
        Self {
            local_addr: (Ipv4Addr::LOCALHOST, 40000).into(),
            peer: (Ipv4Addr::LOCALHOST, 7000).into(),
            inbound: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Queues a datagram to be returned by `recv`.
    ///
    /// # Panics
    /// Panics if the queue is full (> `MAX_QUEUE_SIZE` datagrams).
    pub fn inject(&self, datagram: Vec<u8>, from: SocketAddr) {
        let mut queue = self.inbound.lock();
        assert!(queue.len() < MAX_QUEUE_SIZE, "Mock transport inbound queue overflow");
        queue.push_back((datagram, from));
        drop(queue);
        self.notify.notify_one();
    }

    /// Takes all datagrams sent so far.
    #[must_use]
    pub fn take_sent(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Number of datagrams sent so far.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Makes subsequent sends fail (or succeed again).
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::Release);
    }

    /// Number of datagrams not yet received.
    #[must_use]
    pub fn pending_inbound(&self) -> usize {
        self.inbound.lock().len()
    }

    fn record_send(&self, buf: &[u8], dest: SocketAddr) -> Result<usize> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(TransportError::ShuttingDown);
        }
        if self.fail_sends.load(Ordering::Acquire) {
            return Err(TransportError::SendFailed {
                dest,
                reason: "mock send failure".into(),
            });
        }
        self.sent.lock().push(buf.to_vec());
        Ok(buf.len())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn recv(&self, buf: &mut [u8]) -> Result<(usize, PacketSource)> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.shutdown.load(Ordering::Acquire) {
                return Err(TransportError::ShuttingDown);
            }

            let next = self.inbound.lock().pop_front();
            if let Some((datagram, from)) = next {
                let len = datagram.len().min(buf.len());
                buf[..len].copy_from_slice(&datagram[..len]);
                return Ok((len, PacketSource::new(from)));
            }

            notified.await;
        }
    }

    async fn send(&self, buf: &[u8], dest: &SocketAddr) -> Result<usize> {
        self.record_send(buf, *dest)
    }

    async fn send_to_peer(&self, buf: &[u8]) -> Result<usize> {
        self.record_send(buf, self.peer)
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.local_addr)
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.peer)
    }

    async fn shutdown(&self) -> Result<()> {
        self.shutdown.store(true, Ordering::Release);
        self.notify.notify_waiters();
        Ok(())
    }

    fn is_active(&self) -> bool {
        !self.shutdown.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("pending_inbound", &self.pending_inbound())
            .field("sent", &self.sent_count())
            .field("active", &self.is_active())
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    fn source() -> SocketAddr {
        "10.0.0.5:5555".parse().unwrap()
    }

    #[tokio::test]
    async fn test_inject_and_recv_in_order() {
        let transport = MockTransport::new();
        transport.inject(b"one".to_vec(), source());
        transport.inject(b"two".to_vec(), source());

        let mut buf = [0u8; 16];
        let (len, from) = transport.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"one");
        assert_eq!(from.addr, source());

        let (len, _) = transport.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"two");
        assert_eq!(transport.pending_inbound(), 0);
    }

    #[tokio::test]
    async fn test_send_capture_and_failure() {
        let transport = MockTransport::new();
        transport.send_to_peer(b"a").await.unwrap();

        transport.set_fail_sends(true);
        assert!(matches!(
            transport.send_to_peer(b"b").await,
            Err(TransportError::SendFailed { .. })
        ));

        assert_eq!(transport.take_sent(), vec![b"a".to_vec()]);
        assert_eq!(transport.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_wakes_recv() {
        let transport = Arc::new(MockTransport::new());
        let receiver = {
            let transport = Arc::clone(&transport);
            tokio::spawn(async move {
                let mut buf = [0u8; 16];
                transport.recv(&mut buf).await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        transport.shutdown().await.unwrap();

        let result = receiver.await.unwrap();
        assert!(matches!(result, Err(TransportError::ShuttingDown)));
    }
}
