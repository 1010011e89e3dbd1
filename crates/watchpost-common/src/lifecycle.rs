// ============================================
// File: crates/watchpost-common/src/lifecycle.rs
// ============================================
//! # Process Lifecycle Primitives
//!
//! ## Creation Reason
//! The agent and the collector share the same startup/shutdown shape:
//! start tasks, block until something asks them to stop, tell every task
//! to stop, then wait for all of them. This module holds the pieces that
//! shape is built from.
//!
//! ## Main Functionality
//! - `LifecycleState`: `Starting → Running → Draining → Stopped`
//! - `Lifecycle`: owns the state (observable through a `watch` channel)
//!   and the shutdown broadcast
//! - `ShutdownSignal`: per-task receiver that is safe to create late
//! - `ShutdownHandle`: cloneable trigger for programmatic shutdown
//! - `wait_for_os_signal`: SIGINT / SIGTERM / Ctrl+C watcher
//! - `os_signal_or_pending`: same, for controllers that must keep running
//!   without signal handlers
//!
//! ## State Machine
//! ```text
//!  Starting ──► Running ──► Draining ──► Stopped
//!      │                                   ▲
//!      └───────────── startup failure ─────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Transitions only move forward; a backwards transition is ignored
//! - The shutdown flag is set before the broadcast is sent, so a signal
//!   created after the trigger still observes it
//!
//! ## Last Modified
//! v0.1.0 - Initial lifecycle primitives

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

use crate::error::{CommonError, Result};

// ============================================
// LifecycleState
// ============================================

/// Phase of a Watchpost process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    /// Loading configuration, opening sockets, spawning tasks.
    Starting,
    /// All tasks spawned; waiting for a stop trigger.
    Running,
    /// Stop triggered; no new work starts, in-flight work finishes.
    Draining,
    /// Every task has reported finished.
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

// ============================================
// ShutdownHandle / ShutdownSignal
// ============================================

/// Cloneable trigger for the shared stop indicator.
#[derive(Clone)]
pub struct ShutdownHandle {
    triggered: Arc<AtomicBool>,
    tx: broadcast::Sender<()>,
}

impl ShutdownHandle {
    /// Fires the stop indicator. Repeated calls are no-ops.
    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            // No receivers is fine: late subscribers read the flag.
            let _ = self.tx.send(());
        }
    }

    /// Returns `true` once the stop indicator has fired.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Creates a new receiver for this stop indicator.
    #[must_use]
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            triggered: Arc::clone(&self.triggered),
            rx: self.tx.subscribe(),
        }
    }
}

impl fmt::Debug for ShutdownHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownHandle")
            .field("triggered", &self.is_triggered())
            .finish()
    }
}

/// Per-task view of the stop indicator.
///
/// # Example
/// ```
/// use watchpost_common::Lifecycle;
///
/// # #[tokio::main]
/// # async fn main() {
/// let lifecycle = Lifecycle::new();
/// let mut signal = lifecycle.shutdown_signal();
/// lifecycle.trigger_shutdown();
/// signal.recv().await;
/// assert!(signal.is_triggered());
/// # }
/// ```
pub struct ShutdownSignal {
    triggered: Arc<AtomicBool>,
    rx: broadcast::Receiver<()>,
}

impl ShutdownSignal {
    /// Returns `true` once the stop indicator has fired.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Waits until the stop indicator fires.
    ///
    /// Also returns when every trigger handle has been dropped, since
    /// nobody is left to keep the task alive.
    pub async fn recv(&mut self) {
        if self.is_triggered() {
            return;
        }
        // Closed or Lagged both mean the owner moved on.
        let _ = self.rx.recv().await;
    }
}

impl fmt::Debug for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownSignal")
            .field("triggered", &self.is_triggered())
            .finish()
    }
}

// ============================================
// Lifecycle
// ============================================

/// Lifecycle controller state shared by the agent and the collector.
pub struct Lifecycle {
    state: watch::Sender<LifecycleState>,
    shutdown: ShutdownHandle,
}

impl Lifecycle {
    /// Creates a lifecycle in the `Starting` state.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(LifecycleState::Starting);
        let (tx, _) = broadcast::channel(1);
        Self {
            state,
            shutdown: ShutdownHandle {
                triggered: Arc::new(AtomicBool::new(false)),
                tx,
            },
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Subscribes to state transitions.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Moves to `next` if it is later than the current state.
    ///
    /// Returns `true` if the state changed.
    pub fn transition(&self, next: LifecycleState) -> bool {
        let current = self.state();
        if next <= current {
            warn!(from = %current, to = %next, "Ignoring backwards lifecycle transition");
            return false;
        }
        self.state.send_replace(next);
        info!(from = %current, to = %next, "Lifecycle transition");
        true
    }

    /// Returns a receiver for the shared stop indicator.
    #[must_use]
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.subscribe()
    }

    /// Returns a cloneable trigger for the shared stop indicator.
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Fires the shared stop indicator.
    pub fn trigger_shutdown(&self) {
        debug!("Shutdown triggered");
        self.shutdown.trigger();
    }

    /// Returns `true` once shutdown has been triggered.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_triggered()
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("state", &self.state())
            .field("shutting_down", &self.is_shutting_down())
            .finish()
    }
}

// ============================================
// OS Signals
// ============================================

/// Waits for an interrupt or terminate request from the OS.
///
/// Returns the name of the signal that arrived. Every signal is treated
/// the same way by callers: begin draining.
///
/// # Errors
/// Returns `SignalHandler` if the handlers cannot be installed.
pub async fn wait_for_os_signal() -> Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate()).map_err(|e| {
            CommonError::SignalHandler {
                reason: e.to_string(),
            }
        })?;

        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res.map_err(|e| CommonError::SignalHandler { reason: e.to_string() })?;
                Ok("SIGINT")
            }
            _ = terminate.recv() => Ok("SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| CommonError::SignalHandler {
                reason: e.to_string(),
            })?;
        Ok("Ctrl+C")
    }
}

/// Like [`wait_for_os_signal`], but never resolves when the handlers
/// cannot be installed, leaving programmatic shutdown as the only trigger.
pub async fn os_signal_or_pending() -> &'static str {
    match wait_for_os_signal().await {
        Ok(name) => name,
        Err(e) => {
            error!("Signal handler unavailable: {}", e);
            std::future::pending().await
        }
    }
}
