//! Logger collaborator handed to a connection manager.

use chrono::{DateTime, Utc};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Mutex;

/// What a manager reports: a plain message or an error value
pub enum LogEntry<'a> {
    Message(&'a str),
    Error(&'a (dyn StdError + 'a)),
}

impl fmt::Display for LogEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogEntry::Message(m) => f.write_str(m),
            LogEntry::Error(e) => write!(f, "{}", e),
        }
    }
}

pub trait Logger: Send + Sync {
    fn log(&self, entry: LogEntry<'_>);
}

/// Forwards entries to `tracing` at error level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, entry: LogEntry<'_>) {
        match entry {
            LogEntry::Message(m) => tracing::error!(target: "slotdb", "{}", m),
            LogEntry::Error(e) => tracing::error!(target: "slotdb", error = %e, "database error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub at: DateTime<Utc>,
    pub is_error: bool,
    pub text: String,
}

/// Keeps every entry in memory
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.text).collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Logger for MemoryLogger {
    fn log(&self, entry: LogEntry<'_>) {
        let record = LogRecord {
            at: Utc::now(),
            is_error: matches!(entry, LogEntry::Error(_)),
            text: entry.to_string(),
        };
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}
