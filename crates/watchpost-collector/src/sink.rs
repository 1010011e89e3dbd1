// ============================================
// File: crates/watchpost-collector/src/sink.rs
// ============================================
//! # Telemetry Sinks
//!
//! ## Creation Reason
//! Destination for accepted telemetry. The listener hands every record
//! to one `TelemetrySink` it was given at construction.
//!
//! ## Main Functionality
//! - `TelemetryRecord`: one accepted packet plus receive metadata
//! - `TelemetrySink`: async delivery trait
//! - `LogSink`: records as `info` log lines
//! - `JsonLinesSink`: one JSON document per line, appended to a file
//!
//! ## ⚠️ Important Note for Next Developer
//! - A failed delivery loses that record only; the listener keeps going
//! - `JsonLinesSink` opens its file on first delivery, so a bad path
//!   surfaces as per-record errors, not at startup
//!
//! ## Last Modified
//! v0.1.0 - Initial sink implementation

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use watchpost_common::time::Timestamp;
use watchpost_common::{ClientId, ServiceId};
use watchpost_core::Packet;

use crate::config::{SinkConfig, SinkKind};
use crate::error::{CollectorError, Result};

// ============================================
// TelemetryRecord
// ============================================

/// One accepted telemetry packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Receive time, Unix seconds.
    pub received_at: Timestamp,
    /// Datagram source address.
    pub source: SocketAddr,
    /// Index of the service on the sending agent.
    pub service_id: ServiceId,
    /// Sender id, hex encoded; absent in the anonymous layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
    /// Sender name from the allow-list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    /// Command output as text (invalid UTF-8 replaced).
    pub payload: String,
}

impl TelemetryRecord {
    /// Builds a record for `packet` received now from `source`.
    #[must_use]
    pub fn from_packet(packet: &Packet, source: SocketAddr, client_name: Option<String>) -> Self {
        Self {
            received_at: Timestamp::now(),
            source,
            service_id: packet.service_id,
            client_id: packet.client_id,
            client_name,
            payload: String::from_utf8_lossy(&packet.payload).into_owned(),
        }
    }
}

// ============================================
// TelemetrySink Trait
// ============================================

/// Persists telemetry records.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Delivers one record.
    ///
    /// # Errors
    /// `CollectorError::Sink` if the record could not be persisted.
    async fn deliver(&self, record: &TelemetryRecord) -> Result<()>;
}

/// Builds the sink selected by `config`.
///
/// # Errors
/// `ConfigInvalid` if `json_lines` has no path.
pub fn from_config(config: &SinkConfig) -> Result<Arc<dyn TelemetrySink>> {
    match config.kind {
        SinkKind::Log => Ok(Arc::new(LogSink)),
        SinkKind::JsonLines => {
            let path = config.path.as_ref().ok_or_else(|| {
                CollectorError::config_invalid("sink.path", "required for json_lines")
            })?;
            Ok(Arc::new(JsonLinesSink::new(path)))
        }
    }
}

// ============================================
// LogSink
// ============================================

/// Writes every record to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl TelemetrySink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, record: &TelemetryRecord) -> Result<()> {
        info!(
            target: "watchpost::telemetry",
            source = %record.source,
            service = %record.service_id,
            client = record.client_name.as_deref().unwrap_or("-"),
            payload = %record.payload.trim_end(),
            "Telemetry"
        );
        Ok(())
    }
}

// ============================================
// JsonLinesSink
// ============================================

/// Appends records to a file, one JSON document per line.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    file: Mutex<Option<tokio::fs::File>>,
}

impl JsonLinesSink {
    /// Creates a sink writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    /// Returns the output path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open(&self) -> std::io::Result<tokio::fs::File> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        debug!(path = %self.path.display(), "Opened telemetry file");
        Ok(file)
    }
}

#[async_trait]
impl TelemetrySink for JsonLinesSink {
    fn name(&self) -> &'static str {
        "json_lines"
    }

    async fn deliver(&self, record: &TelemetryRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)
            .map_err(|e| CollectorError::sink(self.name(), e.to_string()))?;
        line.push('\n');

        let mut guard = self.file.lock().await;
        if guard.is_none() {
            let file = self.open().await.map_err(|e| {
                CollectorError::sink(
                    self.name(),
                    format!("cannot open {}: {e}", self.path.display()),
                )
            })?;
            *guard = Some(file);
        }

        let Some(file) = guard.as_mut() else {
            return Err(CollectorError::internal("telemetry file missing after open"));
        };

        let written = async {
            file.write_all(line.as_bytes()).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = written {
            // Reopen on next delivery.
            *guard = None;
            return Err(CollectorError::sink(self.name(), e.to_string()));
        }
        Ok(())
    }
}

// ============================================
// MemorySink
// ============================================

#[cfg(test)]
pub(crate) mod memory {
    use std::sync::atomic::{AtomicBool, Ordering};

    use parking_lot::Mutex;

    use super::*;

    /// Keeps records in memory; can be told to fail.
    #[derive(Default)]
    pub(crate) struct MemorySink {
        records: Mutex<Vec<TelemetryRecord>>,
        fail: AtomicBool,
    }

    impl MemorySink {
        pub(crate) fn records(&self) -> Vec<TelemetryRecord> {
            self.records.lock().clone()
        }

        pub(crate) fn set_fail(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl TelemetrySink for MemorySink {
        fn name(&self) -> &'static str {
            "memory"
        }

        async fn deliver(&self, record: &TelemetryRecord) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(CollectorError::sink(self.name(), "refused"));
            }
            self.records.lock().push(record.clone());
            Ok(())
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(payload: &str) -> TelemetryRecord {
        let packet = Packet::new(ServiceId::new(3), payload.as_bytes().to_vec())
            .with_client_id(ClientId::from_name("web-01"));
        TelemetryRecord::from_packet(
            &packet,
            "10.1.2.3:50000".parse().unwrap(),
            Some("web-01".into()),
        )
    }

    #[test]
    fn test_record_from_packet() {
        let packet = Packet::new(ServiceId::new(1), vec![b'o', b'k', 0xff]);
        let record = TelemetryRecord::from_packet(&packet, "10.0.0.1:1".parse().unwrap(), None);
        assert_eq!(record.service_id, ServiceId::new(1));
        assert_eq!(record.client_id, None);
        assert_eq!(record.payload, "ok\u{fffd}");
    }

    #[test]
    fn test_record_json_shape() {
        let record = record("load 0.42");
        let value: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["service_id"], 3);
        assert_eq!(value["client_name"], "web-01");
        assert_eq!(value["client_id"], ClientId::from_name("web-01").to_hex());
        assert_eq!(value["source"], "10.1.2.3:50000");

        let anonymous = TelemetryRecord {
            client_id: None,
            client_name: None,
            ..record
        };
        let value = serde_json::to_value(&anonymous).unwrap();
        assert!(value.get("client_id").is_none());
    }

    #[test]
    fn test_from_config() {
        let sink = from_config(&SinkConfig::default()).unwrap();
        assert_eq!(sink.name(), "log");

        let config = SinkConfig {
            kind: SinkKind::JsonLines,
            path: None,
        };
        assert!(from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_json_lines_appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("telemetry.jsonl");
        let sink = JsonLinesSink::new(&path);

        sink.deliver(&record("first")).await.unwrap();
        sink.deliver(&record("second\nline")).await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let second: TelemetryRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.payload, "second\nline");
        assert_eq!(second.client_id, Some(ClientId::from_name("web-01")));
    }

    #[tokio::test]
    async fn test_json_lines_keeps_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry.jsonl");
        tokio::fs::write(&path, "{\"earlier\":true}\n").await.unwrap();

        JsonLinesSink::new(&path)
            .deliver(&record("later"))
            .await
            .unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.starts_with("{\"earlier\":true}"));
    }

    #[tokio::test]
    async fn test_json_lines_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where a directory is expected.
        let blocker = dir.path().join("blocker");
        tokio::fs::write(&blocker, b"").await.unwrap();

        let sink = JsonLinesSink::new(blocker.join("telemetry.jsonl"));
        let err = sink.deliver(&record("x")).await.unwrap_err();
        assert!(matches!(err, CollectorError::Sink { sink: "json_lines", .. }));
    }

    #[tokio::test]
    async fn test_log_sink_accepts_everything() {
        assert!(LogSink.deliver(&record("anything")).await.is_ok());
    }
}
