// ============================================
// File: crates/watchpost-agent/src/scheduler.rs
// ============================================
//! # Service Scheduler
//!
//! ## Creation Reason
//! Runs one configured service periodically and turns each successful
//! output into a packet for the aggregator.
//!
//! ## Main Functionality
//! - `ServiceScheduler`: one task per service
//! - `SchedulerContext`: wiring shared by every scheduler of an agent
//! - `TaskReport` / `SchedulerExit`: how a scheduler tells the lifecycle
//!   controller it has finished
//!
//! ## Cycle
//! ```text
//!          ┌──────────┐  tick   ┌───────────┐
//!  start ─►│ Waiting  │────────►│ Executing │
//!          └──────────┘         └─────┬─────┘
//!               ▲   ▲ produced        │
//!               │   └─────────────────┤ output fits: push packet
//!               │ failed, ignored     │ output too large: drop
//!               └─────────────────────┤
//!                                     │ failed, not ignored
//!                                     ▼
//!                                finished(Failed)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Ticks are fixed-rate from start; a slow command delays the next tick
//!   instead of piling up missed ones
//! - Shutdown is only observed while waiting; a running command always
//!   completes and its packet is still queued
//! - Every scheduler sends exactly one `TaskReport`
//!
//! ## Last Modified
//! v0.1.0 - Initial scheduler implementation

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, info_span, trace, warn, Instrument};

use watchpost_common::time::as_millis;
use watchpost_common::{ClientId, ServiceId, ShutdownSignal};
use watchpost_core::Packet;

use crate::config::ServiceConfig;
use crate::runner::CommandRunner;

// ============================================
// TaskReport
// ============================================

/// Why a scheduler stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerExit {
    /// Shutdown was requested or the intake closed.
    Stopped,
    /// A command failed and the service does not ignore errors.
    Failed,
}

/// Final message from a scheduler to the lifecycle controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    /// Service that finished.
    pub service_id: ServiceId,
    /// Its configured name.
    pub name: String,
    /// How it finished.
    pub exit: SchedulerExit,
}

impl TaskReport {
    /// Creates the report for a finished scheduler.
    pub fn finished(service_id: ServiceId, name: impl Into<String>, exit: SchedulerExit) -> Self {
        Self {
            service_id,
            name: name.into(),
            exit,
        }
    }
}

// ============================================
// SchedulerContext
// ============================================

/// Everything a scheduler needs besides its own service.
#[derive(Clone)]
pub struct SchedulerContext {
    /// Client id stamped into packets, if the layout carries one.
    pub client_id: Option<ClientId>,
    /// Largest payload the key can carry in this layout.
    pub max_payload: usize,
    /// Command executor.
    pub runner: Arc<dyn CommandRunner>,
    /// Aggregator intake.
    pub intake: mpsc::Sender<Packet>,
    /// Where the final `TaskReport` goes.
    pub reports: mpsc::UnboundedSender<TaskReport>,
}

impl std::fmt::Debug for SchedulerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerContext")
            .field("client_id", &self.client_id)
            .field("max_payload", &self.max_payload)
            .finish_non_exhaustive()
    }
}

// ============================================
// ServiceScheduler
// ============================================

/// Outcome of a single execution.
enum Cycle {
    Continue,
    Failed,
    IntakeClosed,
}

/// Periodic loop for one service.
pub struct ServiceScheduler {
    id: ServiceId,
    service: ServiceConfig,
    period: Duration,
    context: SchedulerContext,
    shutdown: ShutdownSignal,
}

impl ServiceScheduler {
    /// Creates a scheduler for `service` with id `id`.
    #[must_use]
    pub fn new(
        id: ServiceId,
        service: ServiceConfig,
        context: SchedulerContext,
        shutdown: ShutdownSignal,
    ) -> Self {
        let period = service.period();
        Self {
            id,
            service,
            period,
            context,
            shutdown,
        }
    }

    /// Overrides the configured period.
    #[cfg(test)]
    #[must_use]
    pub(crate) fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Runs until shutdown, intake closure or a terminal failure, then
    /// sends the `TaskReport`.
    pub async fn run(mut self) -> SchedulerExit {
        let span = info_span!("service", name = %self.service.name, id = %self.id);

        let exit = self.run_loop().instrument(span).await;

        let report = TaskReport::finished(self.id, self.service.name.clone(), exit);
        if self.context.reports.send(report).is_err() {
            debug!(service = %self.service.name, "Lifecycle controller gone, report dropped");
        }
        exit
    }

    async fn run_loop(&mut self) -> SchedulerExit {
        info!(period = ?self.period, "Service scheduled");

        let Some(first_run) = Instant::now().checked_add(self.period) else {
            error!(period = ?self.period, "Period out of range, service not started");
            return SchedulerExit::Failed;
        };
        let mut ticker = interval_at(first_run, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = self.shutdown.recv() => {
                    debug!("Scheduler received shutdown signal");
                    return SchedulerExit::Stopped;
                }
                _ = ticker.tick() => {}
            }

            match self.execute_once().await {
                Cycle::Continue => {}
                Cycle::Failed => return SchedulerExit::Failed,
                Cycle::IntakeClosed => {
                    debug!("Intake closed, scheduler exiting");
                    return SchedulerExit::Stopped;
                }
            }
        }
    }

    async fn execute_once(&self) -> Cycle {
        let started = Instant::now();
        let result = self
            .context
            .runner
            .run(&self.service.exec, &self.service.args)
            .await;
        let elapsed_ms = as_millis(started.elapsed());

        let output = match result {
            Ok(output) => {
                trace!(elapsed_ms, "Command finished");
                output
            }
            Err(e) if self.service.ignore_errors => {
                warn!(error = %e, elapsed_ms, "Command failed, ignoring");
                return Cycle::Continue;
            }
            Err(e) => {
                error!(error = %e, elapsed_ms, "Command failed, stopping service");
                return Cycle::Failed;
            }
        };

        if output.len() > self.context.max_payload {
            warn!(
                size = output.len(),
                max = self.context.max_payload,
                "Output exceeds packet capacity, dropped"
            );
            return Cycle::Continue;
        }

        let mut packet = Packet::new(self.id, output);
        if let Some(client_id) = self.context.client_id {
            packet = packet.with_client_id(client_id);
        }

        debug!(size = packet.payload.len(), "Packet produced");
        if self.context.intake.send(packet).await.is_err() {
            return Cycle::IntakeClosed;
        }
        Cycle::Continue
    }
}

impl std::fmt::Debug for ServiceScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceScheduler")
            .field("id", &self.id)
            .field("name", &self.service.name)
            .field("period", &self.period)
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================
