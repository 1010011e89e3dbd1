// ============================================
// File: crates/watchpost-agent/src/agent.rs
// ============================================
//! # Agent Lifecycle Controller
//!
//! ## Creation Reason
//! Wires the schedulers, the aggregator and the UDP socket together and
//! drives them through `Starting → Running → Draining → Stopped`.
//!
//! ## Main Functionality
//! - `Agent::run`: full startup against the configured collector
//! - `Agent::run_with_transport`: same pipeline over any `Transport`
//! - `RunOutcome` / `StopReason`: what ended the run, for the exit code
//!
//! ## Task Layout
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ Agent (controller)                                   │
//! │   ├── ServiceScheduler × N ──► mpsc intake ─┐        │
//! │   │        │ TaskReport                     ▼        │
//! │   │        └──────────────► controller   Aggregator  │
//! │   └── OS signal / ShutdownHandle            │        │
//! │                                      UdpTransport    │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Shutdown Order
//! 1. Trigger the shared stop signal
//! 2. Await every scheduler (in-flight commands finish and queue)
//! 3. Last intake sender dropped; aggregator drains and closes the socket
//! 4. Await the aggregator
//!
//! ## ⚠️ Important Note for Next Developer
//! - An empty service list is refused before any socket is opened
//! - The controller must not keep an intake sender or report sender
//!   alive, or draining never completes
//!
//! ## Last Modified
//! v0.1.0 - Initial agent controller

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use watchpost_common::lifecycle::{os_signal_or_pending, ShutdownHandle};
use watchpost_common::{ClientId, Lifecycle, LifecycleState, ServiceId};
use watchpost_core::{KeyCapacity, OaepSealer, PacketCodec, PublicKeyMaterial};
use watchpost_transport::{Transport, UdpTransport};

use crate::aggregator::{Aggregator, AggregatorStats};
use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::runner::{CommandRunner, ProcessRunner};
use crate::scheduler::{SchedulerContext, SchedulerExit, ServiceScheduler, TaskReport};

// ============================================
// RunOutcome
// ============================================

/// What moved the agent out of `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// An OS signal arrived (name of the signal).
    Signal(&'static str),
    /// `ShutdownHandle::trigger` was called.
    Requested,
    /// Every scheduler had already finished on its own.
    ServicesFinished,
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Why draining started.
    pub reason: StopReason,
    /// Aggregator counters.
    pub stats: AggregatorStats,
    /// Services that ended with `SchedulerExit::Failed`.
    pub failed_services: usize,
}

impl RunOutcome {
    /// Process exit code for this outcome.
    ///
    /// A run that ended because nothing was left to run exits with 1 so
    /// supervisors restart or alert.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self.reason {
            StopReason::ServicesFinished => 1,
            StopReason::Signal(_) | StopReason::Requested => 0,
        }
    }
}

// ============================================
// Agent
// ============================================

/// Telemetry agent.
pub struct Agent {
    config: AgentConfig,
    public_key: PublicKeyMaterial,
    runner: Arc<dyn CommandRunner>,
    lifecycle: Lifecycle,
}

impl Agent {
    /// Creates an agent that runs service commands as child processes.
    #[must_use]
    pub fn new(config: AgentConfig, public_key: PublicKeyMaterial) -> Self {
        Self {
            config,
            public_key,
            runner: Arc::new(ProcessRunner::new()),
            lifecycle: Lifecycle::new(),
        }
    }

    /// Replaces the command runner.
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
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

    /// Returns a handle that stops the agent when triggered.
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.lifecycle.shutdown_handle()
    }

    /// Connects to the configured collector and runs until stopped.
    ///
    /// # Errors
    /// - `NoServices` if the configuration lists no services
    /// - `StartupFailed` if the collector address cannot be connected
    pub async fn run(self) -> Result<RunOutcome> {
        self.ensure_services()?;

        let address = self.config.collector.address.clone();
        let transport = match UdpTransport::connect(&address).await {
            Ok(transport) => transport,
            Err(e) => {
                self.lifecycle.transition(LifecycleState::Stopped);
                return Err(AgentError::startup_failed(format!(
                    "cannot reach collector {address}: {e}"
                )));
            }
        };

        info!(
            local = %transport.local_addr()?,
            collector = %address,
            "Agent socket connected"
        );

        self.run_with_transport(transport).await
    }

    /// Runs the pipeline over `transport`, which must already be
    /// connected to the collector.
    ///
    /// # Errors
    /// - `NoServices` if the configuration lists no services
    /// - `Internal` if the aggregator task panicked
    pub async fn run_with_transport<T>(self, transport: T) -> Result<RunOutcome>
    where
        T: Transport + 'static,
    {
        self.ensure_services()?;

        let layout = self.config.packet.layout();
        let client_id = layout
            .carries_client_id()
            .then(|| ClientId::from_name(&self.config.client.name));
        let max_payload = self.public_key.max_payload_size(layout);

        info!(
            services = self.config.services.len(),
            key_bits = self.public_key.modulus_bits(),
            ?layout,
            max_payload,
            "Agent starting"
        );

        // ======== Aggregator ========
        let (intake_tx, intake_rx) = mpsc::channel(self.config.limits.queue_capacity);
        let sealer = Arc::new(OaepSealer::new(self.public_key.clone()));
        let aggregator = Aggregator::new(intake_rx, PacketCodec::new(layout), sealer, transport);
        let aggregator_handle = tokio::spawn(aggregator.run());

        // ======== Schedulers ========
        let (report_tx, mut report_rx) = mpsc::unbounded_channel();
        let context = SchedulerContext {
            client_id,
            max_payload,
            runner: Arc::clone(&self.runner),
            intake: intake_tx,
            reports: report_tx,
        };

        let mut schedulers: Vec<JoinHandle<SchedulerExit>> =
            Vec::with_capacity(self.config.services.len());
        for (index, service) in self.config.services.iter().enumerate() {
            let id = ServiceId::from_index(index)?;
            let scheduler = ServiceScheduler::new(
                id,
                service.clone(),
                context.clone(),
                self.lifecycle.shutdown_signal(),
            );
            schedulers.push(tokio::spawn(scheduler.run()));
        }
        drop(context);

        self.lifecycle.transition(LifecycleState::Running);

        // ======== Running ========
        let total = schedulers.len();
        let mut reports = Vec::with_capacity(total);
        let mut shutdown = self.lifecycle.shutdown_signal();

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
            () = collect_reports(&mut report_rx, total, &mut reports) => {
                warn!("No services left running");
                StopReason::ServicesFinished
            }
        };

        // ======== Draining ========
        self.lifecycle.transition(LifecycleState::Draining);
        self.lifecycle.trigger_shutdown();

        for handle in schedulers {
            if let Err(e) = handle.await {
                error!("Scheduler task panicked: {}", e);
            }
        }
        debug!("All schedulers finished");

        while let Some(report) = report_rx.recv().await {
            reports.push(report);
        }
        let failed_services = reports
            .iter()
            .filter(|r| r.exit == SchedulerExit::Failed)
            .count();

        let joined = aggregator_handle.await;
        self.lifecycle.transition(LifecycleState::Stopped);
        let stats = joined.map_err(|e| AgentError::internal(format!("aggregator task: {e}")))?;

        info!(sent = stats.sent, failed_services, "Agent stopped");

        Ok(RunOutcome {
            reason,
            stats,
            failed_services,
        })
    }

    fn ensure_services(&self) -> Result<()> {
        if self.config.services.is_empty() {
            self.lifecycle.transition(LifecycleState::Stopped);
            return Err(AgentError::NoServices);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("collector", &self.config.collector.address)
            .field("services", &self.config.services.len())
            .field("state", &self.lifecycle.state())
            .finish_non_exhaustive()
    }
}

// ============================================
// Helpers
// ============================================

/// Resolves once `total` reports have arrived.
async fn collect_reports(
    rx: &mut mpsc::UnboundedReceiver<TaskReport>,
    total: usize,
    reports: &mut Vec<TaskReport>,
) {
    while reports.len() < total {
        match rx.recv().await {
            Some(report) => {
                debug!(service = %report.name, exit = ?report.exit, "Service finished");
                reports.push(report);
            }
            None => return,
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;
    use std::time::Duration;

    use watchpost_core::{OaepOpener, PacketLayout, PrivateKeyMaterial, TransportCipher};
    use watchpost_transport::mock::MockTransport;
    use watchpost_transport::PacketSource;

    use super::*;
    use crate::config::{ServiceConfig, ServiceKind};
    use crate::runner::mock::MockRunner;

    fn key() -> &'static PrivateKeyMaterial {
        static KEY: OnceLock<PrivateKeyMaterial> = OnceLock::new();
        KEY.get_or_init(|| PrivateKeyMaterial::generate(1024).unwrap())
    }

    fn config(services: usize, ignore_errors: bool) -> AgentConfig {
        let mut config = AgentConfig::default();
        config.client.name = "web-01".into();
        config.services = (0..services)
            .map(|i| ServiceConfig {
                name: format!("svc-{i}"),
                kind: ServiceKind::Command,
                exec: "uptime".into(),
                args: vec![],
                period_secs: 1,
                ignore_errors,
            })
            .collect();
        config
    }

    #[tokio::test]
    async fn test_zero_services_refused_before_socket() {
        let mut config = config(0, false);
        // Unresolvable on purpose: the check must happen first.
        config.collector.address = "collector.invalid:9090".into();

        let agent = Agent::new(config, key().public_key());
        let watch = agent.watch();
        let err = agent.run().await.unwrap_err();

        assert!(matches!(err, AgentError::NoServices));
        assert_eq!(*watch.borrow(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn test_programmatic_shutdown_drains() {
        let runner = Arc::new(MockRunner::always_ok(b"up 3 days"));
        let transport = Arc::new(MockTransport::new());

        let agent = Agent::new(config(2, false), key().public_key()).with_runner(runner.clone());
        let handle = agent.shutdown_handle();
        let mut watch = agent.watch();
        let task = tokio::spawn(agent.run_with_transport(Arc::clone(&transport)));

        watch.changed().await.unwrap();
        assert_eq!(*watch.borrow(), LifecycleState::Running);

        // Period is one second; wait for the first cycle of both services.
        tokio::time::sleep(Duration::from_millis(1300)).await;
        handle.trigger();

        let outcome = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("agent did not drain")
            .unwrap()
            .unwrap();

        assert_eq!(outcome.reason, StopReason::Requested);
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(outcome.failed_services, 0);
        assert!(outcome.stats.sent >= 2);
        assert!(runner.calls() >= 2);
        assert!(!transport.is_active());
        assert_eq!(*watch.borrow(), LifecycleState::Stopped);

        let opener = OaepOpener::new(key().clone());
        let codec = PacketCodec::new(PacketLayout::WithClientId);
        for datagram in transport.take_sent() {
            let packet = codec.decode_packet(&opener.open(&datagram).unwrap()).unwrap();
            assert_eq!(packet.client_id, Some(ClientId::from_name("web-01")));
            assert_eq!(packet.payload, &b"up 3 days"[..]);
            assert!(packet.service_id.value() < 2);
        }
    }

    #[tokio::test]
    async fn test_all_services_failed_stops_agent() {
        let runner = Arc::new(MockRunner::always_fail());
        let transport = Arc::new(MockTransport::new());

        let agent = Agent::new(config(3, false), key().public_key()).with_runner(runner);
        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            agent.run_with_transport(Arc::clone(&transport)),
        )
        .await
        .expect("agent did not stop on its own")
        .unwrap();

        assert_eq!(outcome.reason, StopReason::ServicesFinished);
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(outcome.failed_services, 3);
        assert_eq!(outcome.stats.sent, 0);
        assert_eq!(transport.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_anonymous_layout_has_no_client_id() {
        let runner = Arc::new(MockRunner::always_ok(b"ok"));
        let transport = Arc::new(MockTransport::new());
        let mut config = config(1, false);
        config.packet.client_id = false;

        let agent = Agent::new(config, key().public_key()).with_runner(runner);
        let handle = agent.shutdown_handle();
        let task = tokio::spawn(agent.run_with_transport(Arc::clone(&transport)));

        tokio::time::sleep(Duration::from_millis(1300)).await;
        handle.trigger();
        task.await.unwrap().unwrap();

        let opener = OaepOpener::new(key().clone());
        let codec = PacketCodec::new(PacketLayout::Anonymous);
        let sent = transport.take_sent();
        assert!(!sent.is_empty());
        let packet = codec.decode_packet(&opener.open(&sent[0]).unwrap()).unwrap();
        assert_eq!(packet.client_id, None);
        assert_eq!(packet.payload, &b"ok"[..]);
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_in_flight_command() {
        let runner = Arc::new(MockRunner::held(b"late sample"));
        let transport = Arc::new(MockTransport::new());

        let agent = Agent::new(config(1, false), key().public_key()).with_runner(runner.clone());
        let handle = agent.shutdown_handle();
        let mut watch = agent.watch();
        let task = tokio::spawn(agent.run_with_transport(Arc::clone(&transport)));

        tokio::time::timeout(Duration::from_secs(3), runner.wait_started())
            .await
            .expect("command never started");
        handle.trigger();

        watch
            .wait_for(|state| *state == LifecycleState::Draining)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!task.is_finished());
        assert_eq!(transport.sent_count(), 0);

        runner.release();
        let outcome = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("agent did not drain")
            .unwrap()
            .unwrap();

        assert_eq!(outcome.reason, StopReason::Requested);
        assert_eq!(runner.calls(), 1);
        assert_eq!(outcome.stats.sent, 1);
        assert_eq!(*watch.borrow(), LifecycleState::Stopped);

        let sent = transport.take_sent();
        assert_eq!(sent.len(), 1);
        let opener = OaepOpener::new(key().clone());
        let packet = PacketCodec::new(PacketLayout::WithClientId)
            .decode_packet(&opener.open(&sent[0]).unwrap())
            .unwrap();
        assert_eq!(packet.payload, &b"late sample"[..]);
    }

    /// Transport whose teardown panics, taking the aggregator task down.
    struct BrokenTeardown(MockTransport);

    #[async_trait::async_trait]
    impl Transport for BrokenTeardown {
        async fn recv(&self, buf: &mut [u8]) -> watchpost_transport::Result<(usize, PacketSource)> {
            self.0.recv(buf).await
        }

        async fn send(
            &self,
            buf: &[u8],
            dest: &std::net::SocketAddr,
        ) -> watchpost_transport::Result<usize> {
            self.0.send(buf, dest).await
        }

        async fn send_to_peer(&self, buf: &[u8]) -> watchpost_transport::Result<usize> {
            self.0.send_to_peer(buf).await
        }

        fn local_addr(&self) -> watchpost_transport::Result<std::net::SocketAddr> {
            self.0.local_addr()
        }

        fn peer_addr(&self) -> Option<std::net::SocketAddr> {
            self.0.peer_addr()
        }

        async fn shutdown(&self) -> watchpost_transport::Result<()> {
            panic!("socket teardown failed");
        }

        fn is_active(&self) -> bool {
            self.0.is_active()
        }
    }

    #[tokio::test]
    async fn test_aggregator_panic_still_reaches_stopped() {
        let runner = Arc::new(MockRunner::always_fail());
        let agent = Agent::new(config(1, false), key().public_key()).with_runner(runner);
        let watch = agent.watch();

        let err = tokio::time::timeout(
            Duration::from_secs(5),
            agent.run_with_transport(BrokenTeardown(MockTransport::new())),
        )
        .await
        .expect("agent did not stop")
        .unwrap_err();

        assert!(matches!(err, AgentError::Internal { .. }));
        assert_eq!(*watch.borrow(), LifecycleState::Stopped);
    }
}
