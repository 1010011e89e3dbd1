// ============================================
// File: crates/watchpost-collector/src/config.rs
// ============================================
//! # Collector Configuration
//!
//! ## Creation Reason
//! Loads and validates `collector.toml`.
//!
//! ## Configuration Sections
//! - `network`: UDP listen address
//! - `server_key`: private key file
//! - `packet`: wire layout switch, must match every agent
//! - `clients`: optional allow-list of client names
//! - `sink`: where records go
//! - `logging`: log level
//!
//! ## Example Configuration
//! ```toml
//! [network]
//! listen_addr = "0.0.0.0:9090"
//!
//! [server_key]
//! private_key = "/etc/watchpost/collector_private.pem"
//!
//! [clients]
//! allowed = ["web-01", "db-01"]
//!
//! [sink]
//! kind = "json_lines"
//! path = "/var/lib/watchpost/telemetry.jsonl"
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The allow-list matches on client ids, so it needs `packet.client_id`
//! - All config changes require restart
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration implementation

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use watchpost_common::ClientId;
use watchpost_core::PacketLayout;

use crate::error::{CollectorError, Result};

// ============================================
// CollectorConfig
// ============================================

/// Main collector configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Network configuration.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Private key configuration.
    #[serde(default)]
    pub server_key: ServerKeyConfig,

    /// Wire layout.
    #[serde(default)]
    pub packet: PacketConfig,

    /// Accepted clients.
    #[serde(default)]
    pub clients: ClientsConfig,

    /// Record destination.
    #[serde(default)]
    pub sink: SinkConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CollectorConfig {
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
            .map_err(|e| CollectorError::config_load(&path_str, e.to_string()))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| CollectorError::config_load(&path_str, e.to_string()))?;

        config.validate()?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Loads configuration from a string (useful for testing).
    ///
    /// # Errors
    /// Returns error if parsing or validation fails.
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| CollectorError::config_load("<string>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// `ConfigInvalid` naming the first failing field.
    pub fn validate(&self) -> Result<()> {
        if self.network.listen_addr.port() == 0 {
            return Err(CollectorError::config_invalid(
                "network.listen_addr",
                "port must be non-zero",
            ));
        }

        if self.clients.allowed.is_some() && !self.packet.client_id {
            return Err(CollectorError::config_invalid(
                "clients.allowed",
                "requires packet.client_id = true",
            ));
        }

        if let Some(allowed) = &self.clients.allowed {
            if let Some(pos) = allowed.iter().position(|n| n.trim().is_empty()) {
                return Err(CollectorError::config_invalid(
                    format!("clients.allowed[{pos}]"),
                    "cannot be empty",
                ));
            }
        }

        if self.sink.kind == SinkKind::JsonLines && self.sink.path.is_none() {
            return Err(CollectorError::config_invalid(
                "sink.path",
                "required when sink.kind = \"json_lines\"",
            ));
        }

        Ok(())
    }

    /// Returns the UDP listen address.
    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        self.network.listen_addr
    }

    /// Returns the wire layout.
    #[must_use]
    pub const fn layout(&self) -> PacketLayout {
        PacketLayout::from_client_id_flag(self.packet.client_id)
    }
}

// ============================================
// NetworkConfig
// ============================================

/// Network configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// UDP listen address.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9090))
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

// ============================================
// ServerKeyConfig
// ============================================

/// Private key configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerKeyConfig {
    /// PKCS#1 PEM private key file.
    #[serde(default = "default_private_key")]
    pub private_key: PathBuf,
}

fn default_private_key() -> PathBuf {
    PathBuf::from("/etc/watchpost/collector_private.pem")
}

impl Default for ServerKeyConfig {
    fn default() -> Self {
        Self {
            private_key: default_private_key(),
        }
    }
}

// ============================================
// PacketConfig
// ============================================

/// Wire layout selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketConfig {
    /// Packets carry a client id.
    #[serde(default = "default_client_id")]
    pub client_id: bool,
}

fn default_client_id() -> bool {
    true
}

impl Default for PacketConfig {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
        }
    }
}

// ============================================
// ClientsConfig
// ============================================

/// Client allow-list section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientsConfig {
    /// Accepted client names. `None` accepts every client.
    #[serde(default)]
    pub allowed: Option<Vec<String>>,
}

impl ClientsConfig {
    /// Builds the id → name table used by the listener.
    #[must_use]
    pub fn allow_list(&self) -> Option<HashMap<ClientId, String>> {
        self.allowed.as_ref().map(|names| {
            names
                .iter()
                .map(|name| (ClientId::from_name(name), name.clone()))
                .collect()
        })
    }
}

// ============================================
// SinkConfig
// ============================================

/// Kind of record sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Log each record.
    #[default]
    Log,
    /// Append each record as a JSON line.
    JsonLines,
}

/// Sink configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink kind.
    #[serde(default)]
    pub kind: SinkKind,

    /// Output file for `json_lines`.
    #[serde(default)]
    pub path: Option<PathBuf>,
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
// Tests
// ============================================
