// ============================================
// File: crates/watchpost-agent/src/lib.rs
// ============================================
//! # Watchpost Agent Library
//!
//! ## Creation Reason
//! Runs the configured services on every monitored host and ships their
//! output to the collector as sealed UDP datagrams.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`config`]: `agent.toml` loading and validation
//! - [`runner`]: command execution
//! - [`scheduler`]: one periodic task per service
//! - [`aggregator`]: single sender of sealed datagrams
//! - [`agent`]: lifecycle controller
//! - [`error`]: agent error types
//!
//! ## Data Flow
//! ```text
//! command stdout → Packet → intake → encode → seal → UDP → collector
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The collector's public key fixes the payload capacity; outputs that
//!   do not fit are dropped, never split
//! - Configuration changes require restart
//!
//! ## Last Modified
//! v0.1.0 - Initial agent library

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod aggregator;
pub mod config;
pub mod error;
pub mod runner;
pub mod scheduler;

// Re-export primary types
pub use agent::{Agent, RunOutcome, StopReason};
pub use config::AgentConfig;
pub use error::{AgentError, Result};
