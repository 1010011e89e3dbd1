// ============================================
// File: crates/watchpost-common/src/lib.rs
// ============================================
//! # Watchpost Common - Shared Foundations
//!
//! ## Creation Reason
//! Holds the small set of types every Watchpost crate agrees on: how a
//! service and a client are identified on the wire, the common error
//! enum, and the lifecycle primitives the agent and the collector use to
//! start and drain their tasks.
//!
//! ## Main Functionality
//! - [`types`]: `ServiceId`, `ClientId`
//! - [`time`]: Unix timestamps for telemetry records
//! - [`lifecycle`]: `Lifecycle` state machine, `ShutdownSignal`, OS signal watcher
//! - [`error`]: `CommonError` and result alias
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │      watchpost-agent        watchpost-collector     │
//! │            │                       │                │
//! │            └──────────┬────────────┘                │
//! │         ┌─────────────┴─────────────┐               │
//! │         ▼                           ▼               │
//! │   watchpost-core           watchpost-transport      │
//! │         │                           │               │
//! │         └─────────────┬─────────────┘               │
//! │                       ▼                             │
//! │              watchpost-common  ◄── You are here     │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Leaf crate: no internal dependencies
//! - `ClientId` width is tied to the SHA-256 digest size used by the cipher
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod lifecycle;
pub mod time;
pub mod types;

pub use error::{CommonError, Result};
pub use lifecycle::{Lifecycle, LifecycleState, ShutdownSignal};
pub use types::{ClientId, ServiceId, CLIENT_ID_SIZE};
