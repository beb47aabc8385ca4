//! Log record type
//!
//! One `LogRecord` is built per accepted log call. Its serde form is the
//! structured encoding used both for `logs.json` and for live subscribers, so
//! field order here is the wire order.

use super::Level;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A single log event (serializable for the structured sink and broadcast)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: String, // ISO-8601, UTC, millisecond precision
    pub level: Level,
    #[serde(default)]
    pub module: String, // empty = untagged
    pub message: String,
    pub pid: u32,
}

impl LogRecord {
    /// Build a record for the current process
    pub fn new(
        at: DateTime<Utc>,
        level: Level,
        module: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: iso_timestamp(at),
            level,
            module: module.into(),
            message: message.into(),
            pid: std::process::id(),
        }
    }

    /// Canonical structured encoding (single line, no trailing newline)
    pub fn to_json(&self) -> String {
        // Every field is a plain string or integer; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse one line of the structured sink
    pub fn from_json(line: &str) -> Option<Self> {
        serde_json::from_str(line).ok()
    }
}

/// `2026-10-18T09:15:02.123Z`
#[inline]
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
