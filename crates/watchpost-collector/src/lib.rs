// ============================================
// File: crates/watchpost-collector/src/lib.rs
// ============================================
//! # Watchpost Collector Library
//!
//! ## Creation Reason
//! Central receiver for Watchpost telemetry: one UDP socket, one private
//! key, one sink.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`config`]: `collector.toml` loading and validation
//! - [`listener`]: receive / open / decode loop
//! - [`sink`]: record destinations
//! - [`collector`]: lifecycle controller
//! - [`error`]: collector error types
//!
//! ## Data Flow
//! ```text
//! agent → UDP → open (RSA-OAEP) → decode → allow-list → sink
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `packet.client_id` must match every agent's setting
//! - Configuration changes require restart
//!
//! ## Last Modified
//! v0.1.0 - Initial collector library

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod collector;
pub mod config;
pub mod error;
pub mod listener;
pub mod sink;

// Re-export primary types
pub use collector::{Collector, CollectorOutcome, StopReason};
pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use sink::{TelemetryRecord, TelemetrySink};
