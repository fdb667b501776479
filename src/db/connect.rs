//! Opening the driver connection, creating the database when it is missing.

use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::{DbError, Result};
use crate::logger::{LogEntry, Logger};

/// Opens the database named by `settings`.
///
/// The first attempt opens the existing file without creating it. When that
/// fails a server-level session is opened, the database is created from it,
/// and the new file is then opened. Failure of the second path is logged and
/// returned as `ConnectionFailed`.
pub(crate) fn connect(settings: &Settings, logger: Option<&dyn Logger>) -> Result<Connection> {
    settings.validate()?;

    if settings.is_memory() {
        debug!(dsn = %settings.dsn(), "opening in-memory database");
        let conn = Connection::open_in_memory().map_err(|e| connect_failed(settings, logger, e))?;
        return configure(conn, settings);
    }

    let path = settings.database_path();
    debug!(dsn = %settings.dsn(), path = %path.display(), "connecting");
    match open_existing(&path) {
        Ok(conn) => configure(conn, settings),
        Err(e) => {
            warn!(database = %settings.dbname, error = %e, "database not reachable, creating it");
            let conn = create_and_use(settings, &path).map_err(|e| connect_failed(settings, logger, e))?;
            info!(database = %settings.dbname, path = %path.display(), "database created");
            configure(conn, settings)
        }
    }
}

fn open_existing(path: &Path) -> rusqlite::Result<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
}

fn create_and_use(settings: &Settings, path: &Path) -> rusqlite::Result<Connection> {
    debug!(dsn = %settings.server_dsn(), "opening server session");
    let server = Connection::open_in_memory()?;
    server.execute_batch(&create_database_batch(&path.to_string_lossy(), &settings.dbname))?;
    drop(server);

    let conn = open_existing(path)?;
    // Only takes effect while the database is still empty
    if let Ok(Some(encoding)) = settings.encoding() {
        conn.execute_batch(&encoding_pragma(encoding))?;
    }
    Ok(conn)
}

/// Batch that creates database `name` at `path` from a server session
pub fn create_database_batch(path: &str, name: &str) -> String {
    let path = path.replace('\'', "''");
    let name = quote_ident(name);
    format!("ATTACH DATABASE '{path}' AS {name};\nDETACH DATABASE {name};")
}

fn encoding_pragma(encoding: &str) -> String {
    format!("PRAGMA encoding = '{}'", encoding)
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Session settings applied to every fresh connection
fn configure(conn: Connection, settings: &Settings) -> Result<Connection> {
    conn.execute_batch("PRAGMA foreign_keys = ON")?;
    if settings.is_memory() {
        if let Some(encoding) = settings.encoding()? {
            conn.execute_batch(&encoding_pragma(encoding))?;
        }
    }
    Ok(conn)
}

fn connect_failed(settings: &Settings, logger: Option<&dyn Logger>, source: rusqlite::Error) -> DbError {
    if let Some(logger) = logger {
        logger.log(LogEntry::Message(&format!(
            "Could not connect to the database {}",
            settings.dbname
        )));
        logger.log(LogEntry::Error(&source));
    }
    DbError::ConnectionFailed {
        database: settings.dbname.clone(),
        source,
    }
}
