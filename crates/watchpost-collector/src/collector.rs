// ============================================
// File: crates/watchpost-collector/src/collector.rs
// ============================================
//! # Collector Lifecycle Controller
//!
//! ## Creation Reason
//! Binds the collector socket, runs the listener and drives the
//! collector through `Starting → Running → Draining → Stopped`.
//!
//! ## Main Functionality
//! - `Collector::run`: bind the configured address and serve
//! - `Collector::run_with_transport`: same over an already-bound transport
//! - `CollectorOutcome` / `StopReason`: what ended the run
//!
//! ## Shutdown Order
//! 1. Shut the socket down (wakes the pending receive)
//! 2. Await the listener, which finishes the datagram in hand first
//!
//! ## ⚠️ Important Note for Next Developer
//! - A bind failure is fatal; there is no retry
//! - The listener never exits on bad input, so `ListenerExited` means
//!   the socket went away underneath us
//!
//! ## Last Modified
//! v0.1.0 - Initial collector controller

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};

use watchpost_common::lifecycle::{os_signal_or_pending, ShutdownHandle};
use watchpost_common::{Lifecycle, LifecycleState};
use watchpost_core::{KeyCapacity, OaepOpener, PacketCodec, PrivateKeyMaterial};
use watchpost_transport::{Transport, UdpTransport};

use crate::config::CollectorConfig;
use crate::error::{CollectorError, Result};
use crate::listener::{Listener, ListenerStats};
use crate::sink::{self, TelemetrySink};

// ============================================
// CollectorOutcome
// ============================================

/// What moved the collector out of `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// An OS signal arrived (name of the signal).
    Signal(&'static str),
    /// `ShutdownHandle::trigger` was called.
    Requested,
    /// The listener stopped on its own.
    ListenerExited,
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorOutcome {
    /// Why draining started.
    pub reason: StopReason,
    /// Listener counters.
    pub stats: ListenerStats,
}

impl CollectorOutcome {
    /// Process exit code for this outcome.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self.reason {
            StopReason::ListenerExited => 1,
            StopReason::Signal(_) | StopReason::Requested => 0,
        }
    }
}

// ============================================
// Collector
// ============================================

/// Telemetry collector.
pub struct Collector {
    config: CollectorConfig,
    key: PrivateKeyMaterial,
    sink: Arc<dyn TelemetrySink>,
    lifecycle: Lifecycle,
}

impl Collector {
    /// Creates a collector with the sink named in `config`.
    ///
    /// # Errors
    /// `ConfigInvalid` if the sink section is incomplete.
    pub fn new(config: CollectorConfig, key: PrivateKeyMaterial) -> Result<Self> {
        let sink = sink::from_config(&config.sink)?;
        Ok(Self {
            config,
            key,
            sink,
            lifecycle: Lifecycle::new(),
        })
    }

    /// Replaces the sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the lifecycle state holder.
    #[must_use]
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Subscribes to lifecycle transitions.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<LifecycleState> {
        self.lifecycle.watch()
    }

    /// Returns a handle that stops the collector when triggered.
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.lifecycle.shutdown_handle()
    }

    /// Binds the configured address and serves until stopped.
    ///
    /// # Errors
    /// `StartupFailed` if the address cannot be bound.
    pub async fn run(self) -> Result<CollectorOutcome> {
        let addr = self.config.listen_addr();
        let udp = match UdpTransport::bind_addr(addr).await {
            Ok(udp) => udp,
            Err(e) => {
                self.lifecycle.transition(LifecycleState::Stopped);
                return Err(CollectorError::startup_failed(format!(
                    "UDP bind failed: {e}"
                )));
            }
        };

        info!("UDP transport listening on {}", udp.local_addr()?);
        self.run_with_transport(Arc::new(udp)).await
    }

    /// Serves on an already-bound transport.
    ///
    /// # Errors
    /// `Internal` if the listener task panicked.
    pub async fn run_with_transport<T>(self, transport: Arc<T>) -> Result<CollectorOutcome>
    where
        T: Transport + 'static,
    {
        let layout = self.config.layout();
        let allow_list = self.config.clients.allow_list();

        info!(
            key_bits = self.key.modulus_bits(),
            ?layout,
            allowed_clients = allow_list.as_ref().map_or(0, |a| a.len()),
            sink = self.sink.name(),
            "Collector starting"
        );

        let listener = Listener::new(
            Arc::clone(&transport),
            Arc::new(OaepOpener::new(self.key.clone())),
            PacketCodec::new(layout),
            Arc::clone(&self.sink),
        )
        .with_allow_list(allow_list);
        let mut listener_handle = tokio::spawn(listener.run());

        self.lifecycle.transition(LifecycleState::Running);

        // ======== Running ========
        let mut shutdown = self.lifecycle.shutdown_signal();
        let mut finished = None;

        let reason = tokio::select! {
            biased;
            name = os_signal_or_pending() => {
                info!(signal = name, "Received shutdown signal");
                StopReason::Signal(name)
            }
            () = shutdown.recv() => {
                info!("Shutdown requested");
                StopReason::Requested
            }
            result = &mut listener_handle => {
                error!("Listener exited unexpectedly");
                finished = Some(result);
                StopReason::ListenerExited
            }
        };

        // ======== Draining ========
        self.lifecycle.transition(LifecycleState::Draining);
        self.lifecycle.trigger_shutdown();

        if let Err(e) = transport.shutdown().await {
            error!("UDP shutdown error: {}", e);
        }

        let joined = match finished {
            Some(result) => result,
            None => listener_handle.await,
        };
        let stats = joined.map_err(|e| CollectorError::internal(format!("listener task: {e}")))?;

        self.lifecycle.transition(LifecycleState::Stopped);
        info!("Collector shutdown complete");

        Ok(CollectorOutcome { reason, stats })
    }
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("listen_addr", &self.config.listen_addr())
            .field("sink", &self.sink.name())
            .field("state", &self.lifecycle.state())
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

    use watchpost_common::{ClientId, ServiceId};
    use watchpost_core::{OaepSealer, Packet, PacketLayout, TransportCipher};
    use watchpost_transport::mock::MockTransport;

    use super::*;
    use crate::sink::memory::MemorySink;

    fn key() -> &'static PrivateKeyMaterial {
        static KEY: OnceLock<PrivateKeyMaterial> = OnceLock::new();
        KEY.get_or_init(|| PrivateKeyMaterial::generate(1024).unwrap())
    }

    async fn wait_for_records(sink: &MemorySink, count: usize) {
        for _ in 0..200 {
            if sink.records().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("sink never reached {count} records");
    }

    #[tokio::test]
    async fn test_end_to_end_over_udp() {
        let sink = Arc::new(MemorySink::default());
        let collector = Collector::new(CollectorConfig::default(), key().clone())
            .unwrap()
            .with_sink(sink.clone());
        let handle = collector.shutdown_handle();
        let mut watch = collector.watch();

        let server = Arc::new(UdpTransport::bind("127.0.0.1:0").await.unwrap());
        let server_addr = server.local_addr().unwrap();
        let task = tokio::spawn(collector.run_with_transport(server));

        watch.changed().await.unwrap();
        assert_eq!(*watch.borrow(), LifecycleState::Running);

        let agent = UdpTransport::connect(server_addr.to_string()).await.unwrap();
        let sealer = OaepSealer::new(key().public_key());
        let packet = Packet::new(ServiceId::new(9), &b"mem 512M free"[..])
            .with_client_id(ClientId::from_name("web-01"));
        let plaintext = PacketCodec::new(PacketLayout::WithClientId)
            .encode_packet(&packet)
            .unwrap();
        agent.send_to_peer(&sealer.seal(&plaintext).unwrap()).await.unwrap();

        wait_for_records(&sink, 1).await;
        handle.trigger();

        let outcome = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("collector did not drain")
            .unwrap()
            .unwrap();
        assert_eq!(outcome.reason, StopReason::Requested);
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(outcome.stats.delivered, 1);
        assert_eq!(*watch.borrow(), LifecycleState::Stopped);

        let record = &sink.records()[0];
        assert_eq!(record.service_id, ServiceId::new(9));
        assert_eq!(record.payload, "mem 512M free");
        assert_eq!(record.source, agent.local_addr().unwrap());
    }

    #[tokio::test]
    async fn test_listener_exit_stops_collector() {
        let transport = Arc::new(MockTransport::new());
        let collector = Collector::new(CollectorConfig::default(), key().clone())
            .unwrap()
            .with_sink(Arc::new(MemorySink::default()));
        let task = tokio::spawn(collector.run_with_transport(Arc::clone(&transport)));

        tokio::time::sleep(Duration::from_millis(20)).await;
        transport.shutdown().await.unwrap();

        let outcome = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("collector did not notice listener exit")
            .unwrap()
            .unwrap();
        assert_eq!(outcome.reason, StopReason::ListenerExited);
        assert_eq!(outcome.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_bind_failure_is_fatal() {
        let occupied = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut config = CollectorConfig::default();
        config.network.listen_addr = occupied.local_addr().unwrap();

        let collector = Collector::new(config, key().clone()).unwrap();
        let watch = collector.watch();
        let err = collector.run().await.unwrap_err();

        assert!(matches!(err, CollectorError::StartupFailed { .. }));
        assert_eq!(*watch.borrow(), LifecycleState::Stopped);
    }

    #[test]
    fn test_json_lines_without_path_rejected() {
        let mut config = CollectorConfig::default();
        config.sink.kind = crate::config::SinkKind::JsonLines;
        let err = Collector::new(config, key().clone()).unwrap_err();
        assert!(err.is_config_error());
    }
}
