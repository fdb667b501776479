//! Slot-keyed SQLite connection manager.
//!
//! A [`ConnectionRegistry`] holds at most one [`ConnectionManager`] per slot.
//! A manager connects lazily (creating the database if it is missing) and
//! exposes a single `query` entry point whose result shape follows the
//! statement's leading verb.

pub mod config;
pub mod db;
mod error;
pub mod logger;
mod models;
#[cfg(feature = "node")]
pub mod node;

pub use config::{Driver, Settings};
pub use db::{Bindings, ColumnInfo, ConnectionManager, ConnectionRegistry, Table, DEFAULT_SLOT};
pub use error::{DbError, Result};
pub use logger::{LogEntry, LogRecord, Logger, MemoryLogger, TracingLogger};
pub use models::{FetchMode, QueryOutput};

/// Version of the bundled SQLite library
pub fn sqlite_version() -> &'static str {
    rusqlite::version()
}
