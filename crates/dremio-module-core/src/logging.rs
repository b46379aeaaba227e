// crates/dremio-module-core/src/logging.rs
// ============================================================================
// Module: Structured Logging
// Description: JSON-line log events and pluggable sinks.
// Purpose: Emit module progress and failures in the platform log format.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every crate in the module logs through a [`LogSink`]. Events carry the
//! dataset they concern and whether the message is meant for the end user, so
//! platform tooling can surface failures next to the right asset. The stderr
//! sink renders one JSON object per line.
//! Invariants:
//! - Secrets (tokens, keys, passwords) must never be placed in log fields.
//! - Sinks never fail the caller; write errors are dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::dataset::DatasetId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Component name stamped on every record.
pub const LOG_CALLER: &str = "dremio-module";

// ============================================================================
// SECTION: Levels
// ============================================================================

/// Log severity, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Fine-grained tracing.
    Trace,
    /// Debug detail.
    Debug,
    /// Normal progress.
    #[default]
    Info,
    /// Recoverable anomalies.
    #[serde(alias = "warning")]
    Warn,
    /// Failures.
    Error,
}

impl LogLevel {
    /// Returns a stable label for the level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

// ============================================================================
// SECTION: Events
// ============================================================================

/// A single log event.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    /// Severity.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: String,
    /// Dataset the event concerns, when known.
    pub dataset_id: Option<String>,
    /// True when the message should be surfaced to the end user.
    pub for_user: bool,
    /// Error detail, when the event reports a failure.
    pub error: Option<String>,
    /// Additional structured fields.
    pub fields: BTreeMap<String, Value>,
}

impl LogEvent {
    /// Builds an event with the given level and message.
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            dataset_id: None,
            for_user: false,
            error: None,
            fields: BTreeMap::new(),
        }
    }

    /// Builds a trace event.
    #[must_use]
    pub fn trace(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Trace, message)
    }

    /// Builds a debug event.
    #[must_use]
    pub fn debug(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Debug, message)
    }

    /// Builds an info event.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    /// Builds a warning event.
    #[must_use]
    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warn, message)
    }

    /// Builds an error event.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    /// Attaches the dataset identifier.
    #[must_use]
    pub fn dataset(mut self, dataset: &DatasetId) -> Self {
        self.dataset_id = Some(dataset.to_string());
        self
    }

    /// Marks the event as user-facing.
    #[must_use]
    pub const fn for_user(mut self) -> Self {
        self.for_user = true;
        self
    }

    /// Attaches error detail.
    #[must_use]
    pub fn with_error(mut self, error: impl fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// Attaches a structured field.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Serialized form of an event.
#[derive(Serialize)]
struct LogRecord<'a> {
    /// Severity label.
    level: LogLevel,
    /// Unix time in milliseconds.
    time: u64,
    /// Emitting component.
    caller: &'static str,
    /// Application instance identifier.
    #[serde(rename = "app.fybrik.io/app-uuid")]
    app_uuid: &'a str,
    /// Message text.
    message: &'a str,
    /// Dataset identifier.
    #[serde(rename = "DataSetID", skip_serializing_if = "Option::is_none")]
    dataset_id: Option<&'a str>,
    /// User-facing flag.
    #[serde(rename = "ForUser", skip_serializing_if = "std::ops::Not::not")]
    for_user: bool,
    /// Error detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    /// Extra fields.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    fields: &'a BTreeMap<String, Value>,
}

/// Renders an event as a single JSON line (without the trailing newline).
#[must_use]
pub fn render_json_line(event: &LogEvent, app_uuid: &str, time_ms: u64) -> Option<String> {
    let record = LogRecord {
        level: event.level,
        time: time_ms,
        caller: LOG_CALLER,
        app_uuid,
        message: &event.message,
        dataset_id: event.dataset_id.as_deref(),
        for_user: event.for_user,
        error: event.error.as_deref(),
        fields: &event.fields,
    };
    serde_json::to_string(&record).ok()
}

// ============================================================================
// SECTION: Sink Trait
// ============================================================================

/// Destination for log events.
pub trait LogSink: Send + Sync {
    /// Records a log event.
    fn record(&self, event: &LogEvent);
}

// ============================================================================
// SECTION: Implementations
// ============================================================================

/// Sink that logs JSON lines to stderr.
///
/// # Invariants
/// - Events below `min_level` are discarded.
pub struct StderrLogSink {
    /// Minimum level written.
    min_level: LogLevel,
    /// Application instance identifier stamped on every record.
    app_uuid: String,
}

impl StderrLogSink {
    /// Creates a stderr sink.
    #[must_use]
    pub fn new(min_level: LogLevel, app_uuid: impl Into<String>) -> Self {
        Self {
            min_level,
            app_uuid: app_uuid.into(),
        }
    }
}

impl LogSink for StderrLogSink {
    fn record(&self, event: &LogEvent) {
        if event.level < self.min_level {
            return;
        }
        let time_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        if let Some(line) = render_json_line(event, &self.app_uuid, time_ms) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{line}");
        }
    }
}

/// No-op sink.
pub struct NoopLogSink;

impl LogSink for NoopLogSink {
    fn record(&self, _event: &LogEvent) {}
}

/// Sink that keeps events in memory, for tests and dry runs.
#[derive(Default)]
pub struct MemoryLogSink {
    /// Recorded events.
    events: Mutex<Vec<LogEvent>>,
}

impl MemoryLogSink {
    /// Creates an empty memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns true when any event carries the given message.
    #[must_use]
    pub fn contains_message(&self, message: &str) -> bool {
        self.events().iter().any(|event| event.message == message)
    }
}

impl LogSink for MemoryLogSink {
    fn record(&self, event: &LogEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests;
