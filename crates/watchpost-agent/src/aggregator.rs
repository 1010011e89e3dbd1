// ============================================
// File: crates/watchpost-agent/src/aggregator.rs
// ============================================
//! # Aggregator
//!
//! ## Creation Reason
//! Serializes packets from every scheduler onto the single outbound
//! socket: encode, seal, send, one datagram per packet.
//!
//! ## Main Functionality
//! - `Aggregator`: consumer of the bounded intake queue
//! - `AggregatorStats`: counts returned when the intake is drained
//!
//! ## Data Flow
//! ```text
//! scheduler ─┐
//! scheduler ─┼─► mpsc intake ─► encode ─► seal ─► UDP send ─► collector
//! scheduler ─┘     (bounded)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Send order is dequeue order; nothing is retried
//! - The aggregator is the only writer on the socket and shuts it down
//!   after the intake is closed and drained
//!
//! ## Last Modified
//! v0.1.0 - Initial aggregator implementation

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use watchpost_core::protocol::PacketCodec;
use watchpost_core::{CoreError, Packet, TransportCipher};
use watchpost_transport::Transport;

// ============================================
// AggregatorStats
// ============================================

/// Counters reported when the aggregator exits.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorStats {
    /// Datagrams handed to the socket.
    pub sent: u64,
    /// Packets dropped before sending (encode, capacity or seal failure).
    pub seal_failures: u64,
    /// Datagrams the socket refused.
    pub send_failures: u64,
}

// ============================================
// Aggregator
// ============================================

/// Single consumer that seals and sends packets.
pub struct Aggregator<T: Transport, C: TransportCipher + ?Sized> {
    intake: mpsc::Receiver<Packet>,
    codec: PacketCodec,
    cipher: Arc<C>,
    transport: T,
    stats: AggregatorStats,
}

impl<T: Transport, C: TransportCipher + ?Sized> Aggregator<T, C> {
    /// Creates an aggregator reading from `intake` and writing to
    /// `transport`'s connected peer.
    pub fn new(
        intake: mpsc::Receiver<Packet>,
        codec: PacketCodec,
        cipher: Arc<C>,
        transport: T,
    ) -> Self {
        Self {
            intake,
            codec,
            cipher,
            transport,
            stats: AggregatorStats::default(),
        }
    }

    /// Forwards packets until every intake sender is dropped and the
    /// queue is empty, then shuts the transport down.
    pub async fn run(mut self) -> AggregatorStats {
        debug!("Aggregator started");

        while let Some(packet) = self.intake.recv().await {
            self.forward(&packet).await;
        }

        if let Err(e) = self.transport.shutdown().await {
            warn!("Transport shutdown error: {}", e);
        }

        info!(
            sent = self.stats.sent,
            seal_failures = self.stats.seal_failures,
            send_failures = self.stats.send_failures,
            "Aggregator drained"
        );
        self.stats
    }

    async fn forward(&mut self, packet: &Packet) {
        let service = packet.service_id;

        let encoded = match self.codec.encode_packet(packet) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(%service, error = %e, "Packet encode failed, dropped");
                self.stats.seal_failures += 1;
                return;
            }
        };

        let max = self.cipher.max_plaintext_size();
        if encoded.len() > max {
            let e = CoreError::too_large(max, encoded.len());
            warn!(%service, error = %e, "Packet exceeds key capacity, dropped");
            self.stats.seal_failures += 1;
            return;
        }

        let sealed = match self.cipher.seal(&encoded) {
            Ok(sealed) => sealed,
            Err(e) => {
                warn!(%service, error = %e, "Packet seal failed, dropped");
                self.stats.seal_failures += 1;
                return;
            }
        };

        match self.transport.send_to_peer(&sealed).await {
            Ok(len) => {
                trace!(%service, len, "Datagram sent");
                self.stats.sent += 1;
            }
            Err(e) => {
                warn!(%service, error = %e, "Datagram send failed");
                self.stats.send_failures += 1;
            }
        }
    }
}

impl<T: Transport, C: TransportCipher + ?Sized> std::fmt::Debug for Aggregator<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("layout", &self.codec.layout())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================
