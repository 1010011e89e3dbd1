// ============================================
// File: crates/watchpost-agent/src/error.rs
// ============================================
//! # Agent Error Types
//!
//! ## Creation Reason
//! Errors raised while loading the agent configuration, starting the
//! pipeline and running service commands.
//!
//! ## Error Categories
//! 1. **Configuration Errors**: unreadable or invalid `agent.toml`
//! 2. **Startup Errors**: no services, key or socket failures
//! 3. **Command Errors**: one service cycle failed (`CommandError`)
//!
//! ## ⚠️ Important Note for Next Developer
//! - `CommandError` never leaves the scheduler task; the lifecycle
//!   controller only sees `TaskReport`s
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use watchpost_common::error::CommonError;
use watchpost_core::error::CoreError;
use watchpost_transport::error::TransportError;

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Configuration file could not be read or parsed.
    #[error("Failed to load configuration from '{path}': {reason}")]
    ConfigLoad {
        /// Path of the configuration file
        path: String,
        /// Reader or parser message
        reason: String,
    },

    /// Configuration parsed but a value is unacceptable.
    #[error("Invalid configuration: {field} - {reason}")]
    ConfigInvalid {
        /// Failing field, e.g. `services[1].period_secs`
        field: String,
        /// Why it's invalid
        reason: String,
    },

    /// Refused to start with an empty service list.
    #[error("No services configured")]
    NoServices,

    /// Agent failed before reaching `Running`.
    #[error("Agent failed to start: {reason}")]
    StartupFailed {
        /// What went wrong
        reason: String,
    },

    /// A task ended in an unexpected way.
    #[error("Internal error: {message}")]
    Internal {
        /// Description
        message: String,
    },

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),

    /// Error from core crate.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Error from transport crate.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl AgentError {
    /// Creates a `ConfigLoad` error.
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `ConfigInvalid` error.
    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `StartupFailed` error.
    pub fn startup_failed(reason: impl Into<String>) -> Self {
        Self::StartupFailed {
            reason: reason.into(),
        }
    }

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` for configuration problems.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigLoad { .. } | Self::ConfigInvalid { .. })
    }
}

// ============================================
// CommandError
// ============================================

/// Failure of a single service command execution.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The process could not be started.
    #[error("failed to start '{exec}': {source}")]
    Spawn {
        /// Program that was run
        exec: String,
        /// OS error
        #[source]
        source: std::io::Error,
    },

    /// The process ran but reported failure.
    #[error("'{exec}' exited with {status}: {stderr}")]
    Failed {
        /// Program that was run
        exec: String,
        /// Exit status as reported by the OS
        status: String,
        /// Leading part of standard error
        stderr: String,
    },
}

impl CommandError {
    /// Creates a `Failed` error.
    pub fn failed(
        exec: impl Into<String>,
        status: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::Failed {
            exec: exec.into(),
            status: status.into(),
            stderr: stderr.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AgentError::config_load("/etc/watchpost/agent.toml", "file not found");
        assert!(err.to_string().contains("/etc/watchpost/agent.toml"));

        let err = CommandError::failed("df", "exit status: 1", "df: /nope: No such file");
        assert!(err.to_string().contains("exit status: 1"));
        assert!(err.to_string().contains("No such file"));
    }

    #[test]
    fn test_error_classification() {
        let config_err = AgentError::config_invalid("services[0].exec", "cannot be empty");
        assert!(config_err.is_config_error());
        assert!(!AgentError::NoServices.is_config_error());
        assert!(!AgentError::internal("join").is_config_error());
    }
}
