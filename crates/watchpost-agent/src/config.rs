// ============================================
// File: crates/watchpost-agent/src/config.rs
// ============================================
//! # Agent Configuration
//!
//! ## Creation Reason
//! Loads and validates `agent.toml`: where the collector is, which key
//! to seal with, how the client identifies itself and which services to
//! run.
//!
//! ## Configuration Sections
//! - `collector`: collector address and public key file
//! - `client`: client name (hashed into the client id)
//! - `packet`: wire layout switch, must match the collector
//! - `limits`: intake queue capacity
//! - `logging`: log level
//! - `services`: one table per periodic command
//!
//! ## Example Configuration
//! ```toml
//! [collector]
//! address = "collector.lan:9090"
//! public_key = "/etc/watchpost/collector_public.pem"
//!
//! [client]
//! name = "web-01"
//!
//! [[services]]
//! name = "uptime"
//! exec = "uptime"
//! period_secs = 30
//! ignore_errors = true
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Service ids are positions in the `services` list; reordering the
//!   list changes what the collector sees
//! - An empty service list parses and validates so `validate` can report
//!   it; startup refuses it
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration implementation

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use watchpost_core::protocol::PacketLayout;

use crate::error::{AgentError, Result};

/// Upper bound on the number of services: ids are 16 bits.
pub const MAX_SERVICES: usize = u16::MAX as usize + 1;

/// Longest accepted service period (one year).
pub const MAX_PERIOD_SECS: u64 = 365 * 24 * 60 * 60;

// ============================================
// AgentConfig
// ============================================

/// Main agent configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Collector endpoint and key.
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Client identity.
    #[serde(default)]
    pub client: ClientConfig,

    /// Wire layout.
    #[serde(default)]
    pub packet: PacketConfig,

    /// Resource limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Periodic services, in id order.
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

impl AgentConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns error if file cannot be read, parsed or validated.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        info!("Loading configuration from: {}", path_str);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AgentError::config_load(&path_str, e.to_string()))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| AgentError::config_load(&path_str, e.to_string()))?;

        config.validate()?;

        info!(services = config.services.len(), "Configuration loaded successfully");
        Ok(config)
    }

    /// Loads configuration from a string (useful for testing).
    ///
    /// # Errors
    /// Returns error if parsing or validation fails.
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AgentError::config_load("<string>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// `ConfigInvalid` naming the first failing field.
    pub fn validate(&self) -> Result<()> {
        self.collector.validate()?;
        self.client.validate()?;
        self.limits.validate()?;

        if self.services.len() > MAX_SERVICES {
            return Err(AgentError::config_invalid(
                "services",
                format!("at most {MAX_SERVICES} services are supported"),
            ));
        }

        let mut names = HashSet::with_capacity(self.services.len());
        for (index, service) in self.services.iter().enumerate() {
            service.validate(index)?;
            if !names.insert(service.name.as_str()) {
                return Err(AgentError::config_invalid(
                    format!("services[{index}].name"),
                    format!("duplicate service name '{}'", service.name),
                ));
            }
        }

        Ok(())
    }
}

// ============================================
// CollectorConfig
// ============================================

/// Where telemetry is sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Collector `host:port`, resolved once at startup.
    #[serde(default = "default_collector_address")]
    pub address: String,

    /// PEM file with the collector's public key.
    #[serde(default = "default_public_key")]
    pub public_key: PathBuf,
}

fn default_collector_address() -> String {
    "127.0.0.1:9090".to_string()
}

fn default_public_key() -> PathBuf {
    PathBuf::from("/etc/watchpost/collector_public.pem")
}

impl CollectorConfig {
    fn validate(&self) -> Result<()> {
        let Some((host, port)) = self.address.rsplit_once(':') else {
            return Err(AgentError::config_invalid(
                "collector.address",
                "must be host:port",
            ));
        };

        if host.is_empty() {
            return Err(AgentError::config_invalid(
                "collector.address",
                "host cannot be empty",
            ));
        }

        match port.parse::<u16>() {
            Ok(0) | Err(_) => Err(AgentError::config_invalid(
                "collector.address",
                format!("invalid port '{port}'"),
            )),
            Ok(_) => Ok(()),
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            address: default_collector_address(),
            public_key: default_public_key(),
        }
    }
}

// ============================================
// ClientConfig
// ============================================

/// How this agent identifies itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Client name; its SHA-256 digest is the client id.
    #[serde(default = "default_client_name")]
    pub name: String,
}

fn default_client_name() -> String {
    "watchpost-agent".to_string()
}

impl ClientConfig {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AgentError::config_invalid("client.name", "cannot be empty"));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: default_client_name(),
        }
    }
}

// ============================================
// PacketConfig
// ============================================

/// Wire layout selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketConfig {
    /// Carry the client id in every packet.
    #[serde(default = "default_client_id")]
    pub client_id: bool,
}

fn default_client_id() -> bool {
    true
}

impl PacketConfig {
    /// Layout implied by this section.
    #[must_use]
    pub const fn layout(&self) -> PacketLayout {
        PacketLayout::from_client_id_flag(self.client_id)
    }
}

impl Default for PacketConfig {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
        }
    }
}

// ============================================
// LimitsConfig
// ============================================

/// Resource limits configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Capacity of the aggregator intake queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    64
}

impl LimitsConfig {
    fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(AgentError::config_invalid(
                "limits.queue_capacity",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

// ============================================
// LoggingConfig
// ============================================

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ============================================
// ServiceConfig
// ============================================

/// What a service runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// Run an executable and capture its standard output.
    #[default]
    Command,
}

/// One periodic job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Unique name, used in logs.
    pub name: String,

    /// Service kind.
    #[serde(default)]
    pub kind: ServiceKind,

    /// Program to run.
    pub exec: String,

    /// Arguments passed to `exec`.
    #[serde(default)]
    pub args: Vec<String>,

    /// Seconds between runs; the first run is one period after start.
    pub period_secs: u64,

    /// Keep running after a failed command instead of stopping.
    #[serde(default)]
    pub ignore_errors: bool,
}

impl ServiceConfig {
    /// Period between runs.
    #[must_use]
    pub const fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    fn validate(&self, index: usize) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AgentError::config_invalid(
                format!("services[{index}].name"),
                "cannot be empty",
            ));
        }

        if self.exec.trim().is_empty() {
            return Err(AgentError::config_invalid(
                format!("services[{index}].exec"),
                "cannot be empty",
            ));
        }

        if self.period_secs == 0 {
            return Err(AgentError::config_invalid(
                format!("services[{index}].period_secs"),
                "must be greater than 0",
            ));
        }

        if self.period_secs > MAX_PERIOD_SECS {
            return Err(AgentError::config_invalid(
                format!("services[{index}].period_secs"),
                format!("must be at most {MAX_PERIOD_SECS}"),
            ));
        }

        Ok(())
    }
}

// ============================================
// Tests
// ============================================
