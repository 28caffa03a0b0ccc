#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Structured JSON-lines logging shared by the pruning engine and its collaborators.

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Log severity level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Per-round detail.
    Debug,
    /// Run lifecycle.
    Info,
    /// Suspicious but non-fatal input.
    Warn,
    /// Aborted runs.
    Error,
}

/// Structured log record, serialized as one JSON object per line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Timestamp in ISO8601.
    pub timestamp: DateTime<Utc>,
    /// Module emitting the log.
    pub module: String,
    /// Severity.
    pub level: LogLevel,
    /// Short machine-friendly message (e.g. `pruning.round`).
    pub message: String,
    /// Arbitrary JSON fields.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl LogRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(module: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            module: module.into(),
            level,
            message: message.into(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Attaches the fields of a JSON object; non-object values are ignored.
    #[must_use]
    pub fn with_metadata(mut self, metadata: &serde_json::Value) -> Self {
        if let Some(fields) = metadata.as_object() {
            self.metadata = fields.clone();
        }
        self
    }
}

/// Destination for structured records.
pub trait LogSink: Send + Sync {
    /// Persists a single record.
    fn write(&self, record: &LogRecord) -> Result<()>;
}

/// Thread-safe JSON-lines file logger with append-only semantics.
#[derive(Debug)]
pub struct JsonLogger {
    path: PathBuf,
    min_level: LogLevel,
    writer: Mutex<File>,
}

impl JsonLogger {
    /// Creates or opens a logger at the desired path, accepting every level.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_min_level(path, LogLevel::Debug)
    }

    /// Creates a logger that drops records below `min_level`.
    pub fn with_min_level(path: impl AsRef<Path>, min_level: LogLevel) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating log directory {}", parent.display()))?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        Ok(Self {
            path,
            min_level,
            writer: Mutex::new(file),
        })
    }

    /// Writes a log record as a JSON line.
    pub fn log(&self, record: &LogRecord) -> Result<()> {
        if record.level < self.min_level {
            return Ok(());
        }
        let mut writer = self.writer.lock();
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Returns the underlying file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for JsonLogger {
    fn write(&self, record: &LogRecord) -> Result<()> {
        self.log(record)
    }
}

/// In-memory sink retaining every record, handy for assertions.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLogger {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies the records written so far.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Messages of the retained records, in write order.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|record| record.message.clone())
            .collect()
    }
}

impl LogSink for MemoryLogger {
    fn write(&self, record: &LogRecord) -> Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn writes_json_lines() {
        let dir = tempdir().unwrap();
        let logger = JsonLogger::new(dir.path().join("runs/prune.log")).unwrap();
        logger
            .log(
                &LogRecord::new("pruning", LogLevel::Info, "pruning.start")
                    .with_metadata(&json!({ "pool": 16 })),
            )
            .unwrap();
        let content = fs::read_to_string(logger.path()).unwrap();
        assert!(content.contains("\"message\":\"pruning.start\""));
        assert!(content.contains("\"pool\":16"));
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn min_level_filters_records() {
        let dir = tempdir().unwrap();
        let logger = JsonLogger::with_min_level(dir.path().join("prune.log"), LogLevel::Info)
            .unwrap();
        logger
            .log(&LogRecord::new("pruning", LogLevel::Debug, "pruning.round"))
            .unwrap();
        logger
            .log(&LogRecord::new("pruning", LogLevel::Error, "pruning.failed"))
            .unwrap();
        let content = fs::read_to_string(logger.path()).unwrap();
        assert!(!content.contains("pruning.round"));
        assert!(content.contains("pruning.failed"));
    }

    #[test]
    fn memory_logger_keeps_order() {
        let sink = MemoryLogger::new();
        sink.write(&LogRecord::new("pruning", LogLevel::Info, "a"))
            .unwrap();
        sink.write(&LogRecord::new("pruning", LogLevel::Info, "b"))
            .unwrap();
        assert_eq!(sink.messages(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn non_object_metadata_is_ignored() {
        let record =
            LogRecord::new("pruning", LogLevel::Warn, "odd").with_metadata(&json!([1, 2, 3]));
        assert!(record.metadata.is_empty());
    }
}
