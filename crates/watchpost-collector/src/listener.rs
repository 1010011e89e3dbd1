// ============================================
// File: crates/watchpost-collector/src/listener.rs
// ============================================
//! # Listener
//!
//! ## Creation Reason
//! Receives sealed datagrams on the collector socket, opens and decodes
//! them, and hands the resulting records to the sink.
//!
//! ## Main Functionality
//! - `Listener`: receive loop, runs until the socket is shut down
//! - `ListenerStats`: counters returned when the loop ends
//!
//! ## Processing Flow
//! ```text
//! ┌──────────────┐   ┌──────┐   ┌────────┐   ┌────────────┐   ┌──────┐
//! │ UDP datagram │──►│ open │──►│ decode │──►│ allow-list │──►│ sink │
//! └──────────────┘   └──────┘   └────────┘   └────────────┘   └──────┘
//!                       │           │              │              │
//!                       └───────────┴──── rejected ┘   sink failure
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - No datagram, however malformed, may stop the loop
//! - Only `TransportError::ShuttingDown` ends it
//! - Rejections are logged at `debug`: anyone can send garbage to the
//!   port and the log must not be flooded
//!
//! ## Last Modified
//! v0.1.0 - Initial listener implementation

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use watchpost_common::ClientId;
use watchpost_core::{PacketCodec, TransportCipher};
use watchpost_transport::Transport;

use crate::error::{CollectorError, Result};
use crate::sink::{TelemetryRecord, TelemetrySink};

// ============================================
// ListenerStats
// ============================================

/// Counters reported when the listener exits.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ListenerStats {
    /// Datagrams received.
    pub received: u64,
    /// Records accepted by the sink.
    pub delivered: u64,
    /// Datagrams that failed to open, decode or pass the allow-list.
    pub rejected: u64,
    /// Records the sink refused.
    pub sink_failures: u64,
}

// ============================================
// Listener
// ============================================

/// Collector receive loop.
pub struct Listener<T: Transport> {
    transport: T,
    cipher: Arc<dyn TransportCipher>,
    codec: PacketCodec,
    allow_list: Option<HashMap<ClientId, String>>,
    sink: Arc<dyn TelemetrySink>,
    stats: ListenerStats,
}

impl<T: Transport> Listener<T> {
    /// Creates a listener that accepts every client.
    pub fn new(
        transport: T,
        cipher: Arc<dyn TransportCipher>,
        codec: PacketCodec,
        sink: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            transport,
            cipher,
            codec,
            allow_list: None,
            sink,
            stats: ListenerStats::default(),
        }
    }

    /// Restricts accepted packets to the given client ids.
    #[must_use]
    pub fn with_allow_list(mut self, allow_list: Option<HashMap<ClientId, String>>) -> Self {
        self.allow_list = allow_list;
        self
    }

    /// Receives until the transport is shut down.
    pub async fn run(mut self) -> ListenerStats {
        let mut buf = vec![0u8; self.cipher.max_ciphertext_size()];
        info!(
            buffer = buf.len(),
            layout = ?self.codec.layout(),
            sink = self.sink.name(),
            "Listener started"
        );

        loop {
            let (len, source) = match self.transport.recv(&mut buf).await {
                Ok(received) => received,
                Err(e) if e.is_shutdown() => {
                    debug!("Listener socket closed");
                    break;
                }
                Err(e) => {
                    warn!("UDP receive error: {}", e);
                    continue;
                }
            };

            self.stats.received += 1;
            let record = match self.accept(&buf[..len], source.addr) {
                Ok(record) => record,
                Err(e) if e.is_per_datagram() => {
                    debug!(from = %source.addr, len, "Datagram rejected: {}", e);
                    self.stats.rejected += 1;
                    continue;
                }
                Err(e) => {
                    warn!(from = %source.addr, len, "Datagram dropped: {}", e);
                    self.stats.rejected += 1;
                    continue;
                }
            };

            match self.sink.deliver(&record).await {
                Ok(()) => {
                    trace!(
                        from = %source.addr,
                        service = %record.service_id,
                        latency = ?source.age(),
                        "Record delivered"
                    );
                    self.stats.delivered += 1;
                }
                Err(e) => {
                    warn!(from = %source.addr, "Record lost: {}", e);
                    self.stats.sink_failures += 1;
                }
            }
        }

        info!(
            received = self.stats.received,
            delivered = self.stats.delivered,
            rejected = self.stats.rejected,
            sink_failures = self.stats.sink_failures,
            "Listener stopped"
        );
        self.stats
    }

    /// Opens, decodes and admits one datagram.
    fn accept(&self, datagram: &[u8], source: SocketAddr) -> Result<TelemetryRecord> {
        let plaintext = self.cipher.open(datagram)?;
        let packet = self.codec.decode_packet(&plaintext)?;

        let client_name = match &self.allow_list {
            None => None,
            Some(allowed) => {
                let name = packet
                    .client_id
                    .and_then(|id| allowed.get(&id))
                    .ok_or_else(|| CollectorError::rejected(source, "client not allowed"))?;
                Some(name.clone())
            }
        };

        Ok(TelemetryRecord::from_packet(&packet, source, client_name))
    }
}

impl<T: Transport> std::fmt::Debug for Listener<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("layout", &self.codec.layout())
            .field("allow_list", &self.allow_list.as_ref().map(HashMap::len))
            .field("sink", &self.sink.name())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;
    use std::time::Duration;

    use watchpost_common::ServiceId;
    use watchpost_core::{OaepOpener, OaepSealer, Packet, PacketLayout, PrivateKeyMaterial};
    use watchpost_transport::mock::MockTransport;

    use super::*;
    use crate::sink::memory::MemorySink;

    fn key() -> &'static PrivateKeyMaterial {
        static KEY: OnceLock<PrivateKeyMaterial> = OnceLock::new();
        KEY.get_or_init(|| PrivateKeyMaterial::generate(1024).unwrap())
    }

    fn seal(packet: &Packet, layout: PacketLayout) -> Vec<u8> {
        let sealer = OaepSealer::new(key().public_key());
        let plaintext = PacketCodec::new(layout).encode_packet(packet).unwrap();
        sealer.seal(&plaintext).unwrap()
    }

    fn from() -> SocketAddr {
        "192.0.2.10:41000".parse().unwrap()
    }

    fn listener(
        transport: Arc<MockTransport>,
        sink: Arc<MemorySink>,
        layout: PacketLayout,
    ) -> Listener<Arc<MockTransport>> {
        Listener::new(
            transport,
            Arc::new(OaepOpener::new(key().clone())),
            PacketCodec::new(layout),
            sink,
        )
    }

    /// Waits until `transport` has no queued datagrams, then a little more
    /// for the last one to reach the sink, then closes it.
    async fn drain_and_close(transport: &MockTransport) {
        for _ in 0..200 {
            if transport.pending_inbound() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        transport.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_sealed_datagram_reaches_sink() {
        let transport = Arc::new(MockTransport::new());
        let sink = Arc::new(MemorySink::default());
        let client = ClientId::from_name("web-01");

        let packet = Packet::new(ServiceId::new(4), &b"disk 71%"[..]).with_client_id(client);
        transport.inject(seal(&packet, PacketLayout::WithClientId), from());

        let task = tokio::spawn(
            listener(Arc::clone(&transport), Arc::clone(&sink), PacketLayout::WithClientId).run(),
        );
        drain_and_close(&transport).await;
        let stats = task.await.unwrap();

        assert_eq!(stats.received, 1);
        assert_eq!(stats.delivered, 1);
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].service_id, ServiceId::new(4));
        assert_eq!(records[0].client_id, Some(client));
        assert_eq!(records[0].payload, "disk 71%");
        assert_eq!(records[0].source, from());
        assert_eq!(records[0].client_name, None);
    }

    #[tokio::test]
    async fn test_garbage_does_not_stop_listener() {
        let transport = Arc::new(MockTransport::new());
        let sink = Arc::new(MemorySink::default());

        transport.inject(vec![0xde, 0xad, 0xbe, 0xef], from());
        transport.inject(vec![0u8; 128], from());
        let packet = Packet::new(ServiceId::new(0), &b"after garbage"[..]);
        transport.inject(seal(&packet, PacketLayout::Anonymous), from());

        let task = tokio::spawn(
            listener(Arc::clone(&transport), Arc::clone(&sink), PacketLayout::Anonymous).run(),
        );
        drain_and_close(&transport).await;
        let stats = task.await.unwrap();

        assert_eq!(stats.received, 3);
        assert_eq!(stats.rejected, 2);
        assert_eq!(stats.delivered, 1);
        assert_eq!(sink.records()[0].payload, "after garbage");
    }

    #[tokio::test]
    async fn test_foreign_key_rejected() {
        let transport = Arc::new(MockTransport::new());
        let sink = Arc::new(MemorySink::default());

        let foreign = PrivateKeyMaterial::generate(1024).unwrap();
        let plaintext = PacketCodec::new(PacketLayout::Anonymous)
            .encode_packet(&Packet::new(ServiceId::new(0), &b"x"[..]))
            .unwrap();
        let sealed = OaepSealer::new(foreign.public_key()).seal(&plaintext).unwrap();
        transport.inject(sealed, from());

        let task = tokio::spawn(
            listener(Arc::clone(&transport), Arc::clone(&sink), PacketLayout::Anonymous).run(),
        );
        drain_and_close(&transport).await;
        let stats = task.await.unwrap();

        assert_eq!(stats.rejected, 1);
        assert!(sink.records().is_empty());
    }

    #[tokio::test]
    async fn test_allow_list() {
        let transport = Arc::new(MockTransport::new());
        let sink = Arc::new(MemorySink::default());

        let allowed = ClientId::from_name("web-01");
        let stranger = ClientId::from_name("intruder");
        for client in [stranger, allowed] {
            let packet = Packet::new(ServiceId::new(1), &b"ok"[..]).with_client_id(client);
            transport.inject(seal(&packet, PacketLayout::WithClientId), from());
        }

        let allow_list = HashMap::from([(allowed, "web-01".to_string())]);
        let task = tokio::spawn(
            listener(Arc::clone(&transport), Arc::clone(&sink), PacketLayout::WithClientId)
                .with_allow_list(Some(allow_list))
                .run(),
        );
        drain_and_close(&transport).await;
        let stats = task.await.unwrap();

        assert_eq!(stats.rejected, 1);
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].client_name.as_deref(), Some("web-01"));
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_stop_listener() {
        let transport = Arc::new(MockTransport::new());
        let sink = Arc::new(MemorySink::default());
        sink.set_fail(true);

        let packet = Packet::new(ServiceId::new(2), &b"lost"[..]);
        transport.inject(seal(&packet, PacketLayout::Anonymous), from());

        let task = tokio::spawn(
            listener(Arc::clone(&transport), Arc::clone(&sink), PacketLayout::Anonymous).run(),
        );
        drain_and_close(&transport).await;
        let stats = task.await.unwrap();

        assert_eq!(stats.sink_failures, 1);
        assert_eq!(stats.delivered, 0);
    }

    #[tokio::test]
    async fn test_shutdown_ends_idle_listener() {
        let transport = Arc::new(MockTransport::new());
        let sink = Arc::new(MemorySink::default());
        let task = tokio::spawn(
            listener(Arc::clone(&transport), sink, PacketLayout::WithClientId).run(),
        );

        tokio::time::sleep(Duration::from_millis(20)).await;
        transport.shutdown().await.unwrap();

        let stats = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("listener did not exit")
            .unwrap();
        assert_eq!(stats, ListenerStats::default());
    }
}
