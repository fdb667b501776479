//! Connection settings and their mapping onto SQLite.

use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

use crate::error::{DbError, Result};

/// Name that opens a private in-memory database instead of a file
pub const MEMORY_DATABASE: &str = ":memory:";

/// Supported drivers. Only SQLite is linked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    Sqlite,
}

impl Driver {
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Driver::Sqlite),
            _ => Err(DbError::UnsupportedDriver(name.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::Sqlite => "sqlite",
        }
    }
}

/// Connection settings, consumed once when a manager connects.
///
/// `host` is the data directory holding database files; `port`, `username`
/// and `password` are carried into the DSN but SQLite has no use for them.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub driver: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    pub dbname: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub charset: Option<String>,
}

impl Settings {
    /// SQLite settings for database `dbname` stored under directory `dir`
    pub fn sqlite(dir: impl Into<String>, dbname: impl Into<String>) -> Self {
        Settings {
            driver: Driver::Sqlite.as_str().to_string(),
            host: dir.into(),
            port: None,
            dbname: dbname.into(),
            username: String::new(),
            password: String::new(),
            charset: Some("utf8".to_string()),
        }
    }

    /// In-memory SQLite settings
    pub fn memory() -> Self {
        Self::sqlite("", MEMORY_DATABASE)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        Driver::parse(&self.driver)?;
        if self.dbname.trim().is_empty() {
            return Err(DbError::invalid_settings("dbname is empty"));
        }
        if self.dbname != MEMORY_DATABASE && self.dbname.contains(['/', '\\', '\0']) {
            return Err(DbError::invalid_settings(format!(
                "dbname '{}' must not contain path separators",
                self.dbname
            )));
        }
        self.encoding()?;
        Ok(())
    }

    pub fn driver(&self) -> Result<Driver> {
        Driver::parse(&self.driver)
    }

    pub fn is_memory(&self) -> bool {
        self.dbname == MEMORY_DATABASE
    }

    /// File backing the database
    pub fn database_path(&self) -> PathBuf {
        let dir = if self.host.is_empty() { "." } else { self.host.as_str() };
        let file = if self.dbname.contains('.') {
            self.dbname.clone()
        } else {
            format!("{}.db", self.dbname)
        };
        PathBuf::from(dir).join(file)
    }

    /// SQLite text encoding for the configured charset
    pub fn encoding(&self) -> Result<Option<&'static str>> {
        let Some(charset) = self.charset.as_deref() else {
            return Ok(None);
        };
        let encoding = match charset.trim().to_ascii_lowercase().as_str() {
            "" => return Ok(None),
            "utf8" | "utf8mb4" | "utf-8" => "UTF-8",
            "utf16" | "utf-16" => "UTF-16",
            "utf16le" | "utf-16le" => "UTF-16le",
            "utf16be" | "utf-16be" => "UTF-16be",
            other => {
                return Err(DbError::invalid_settings(format!(
                    "unsupported charset '{}'",
                    other
                )))
            }
        };
        Ok(Some(encoding))
    }

    /// Connection string naming the database
    pub fn dsn(&self) -> String {
        format!("{};dbname={}{}", self.dsn_prefix(), self.dbname, self.charset_suffix())
    }

    /// Connection string for the server, no database selected
    pub fn server_dsn(&self) -> String {
        format!("{}{}", self.dsn_prefix(), self.charset_suffix())
    }

    fn dsn_prefix(&self) -> String {
        let mut dsn = format!("{}:host={}", self.driver, self.host);
        if let Some(port) = self.port {
            dsn.push_str(&format!(";port={}", port));
        }
        dsn
    }

    fn charset_suffix(&self) -> String {
        match &self.charset {
            Some(c) if !c.is_empty() => format!(";charset={}", c),
            _ => String::new(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("charset", &self.charset)
            .finish()
    }
}
