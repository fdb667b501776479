use rusqlite::Error as SqliteError;
use thiserror::Error;

/// Errors produced by the connection manager and registry.
#[derive(Error, Debug)]
pub enum DbError {
    /// Settings name a driver other than sqlite
    #[error("Unsupported driver '{0}'")]
    UnsupportedDriver(String),

    /// Settings are present but unusable
    #[error("Invalid settings: {reason}")]
    InvalidSettings { reason: String },

    /// Both the direct and the create-then-use connect attempts failed
    #[error("Could not connect to the database {database}: {source}")]
    ConnectionFailed {
        database: String,
        #[source]
        source: SqliteError,
    },

    #[error("Failed to prepare '{sql}': {source}")]
    Prepare {
        sql: String,
        #[source]
        source: SqliteError,
    },

    #[error("query failed: {source}")]
    Execute {
        sql: String,
        #[source]
        source: SqliteError,
    },

    #[error("Slot {0} already holds a connection")]
    SlotInUse(u32),

    #[error("Slot {0} is not open")]
    UnknownSlot(u32),

    #[error("DB Lock failed")]
    LockPoisoned,

    #[error("SQLite Error: {0}")]
    Sqlite(#[from] SqliteError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl DbError {
    pub fn invalid_settings(reason: impl Into<String>) -> Self {
        Self::InvalidSettings {
            reason: reason.into(),
        }
    }

    /// Underlying SQLite error, when there is one
    pub fn sqlite_error(&self) -> Option<&SqliteError> {
        match self {
            Self::ConnectionFailed { source, .. }
            | Self::Prepare { source, .. }
            | Self::Execute { source, .. } => Some(source),
            Self::Sqlite(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(feature = "node")]
pub fn to_napi_error(err: DbError) -> napi::Error {
    napi::Error::from_reason(err.to_string())
}
