//! Manager module - the ConnectionManager owning one SQLite connection

use rusqlite::Connection;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use super::connect::connect;
use super::params::Bindings;
use super::row::shape_row;
use super::table::Table;
use super::verb::{classify, Verb};
use crate::config::Settings;
use crate::error::{DbError, Result};
use crate::logger::{LogEntry, Logger};
use crate::models::{FetchMode, QueryOutput};

struct Session {
    conn: Connection,
    last_statement: Option<String>,
}

/// Owns one driver connection and is the entry point for issuing SQL
pub struct ConnectionManager {
    session: Mutex<Session>,
    settings: Settings,
    logger: Option<Arc<dyn Logger>>,
}

impl ConnectionManager {
    /// Connect with `settings`, creating the database if it does not exist
    pub fn connect(settings: Settings, logger: Option<Arc<dyn Logger>>) -> Result<Self> {
        let conn = connect(&settings, logger.as_deref())?;
        Ok(ConnectionManager {
            session: Mutex::new(Session {
                conn,
                last_statement: None,
            }),
            settings,
            logger,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Prepare and execute `sql`, shaping the result by its leading verb.
    ///
    /// SELECT/SHOW yield rows, INSERT/UPDATE/DELETE yield the affected row
    /// count, anything else runs and yields `Nothing`.
    pub fn query(
        &self,
        sql: &str,
        bindings: &Bindings,
        fetch_mode: FetchMode,
        debug: bool,
    ) -> Result<QueryOutput> {
        let sql = sql.trim();
        match classify(sql) {
            Verb::Fetch => self.run(sql, bindings, debug, |_, stmt| fetch_rows(stmt, fetch_mode)).map(QueryOutput::Rows),
            Verb::Modify => self.run(sql, bindings, debug, step_all).map(QueryOutput::Affected),
            Verb::Other => self.run(sql, bindings, debug, step_all).map(|_| QueryOutput::Nothing),
        }
    }

    /// Rows of a row-returning statement, whatever its leading token
    pub fn select(&self, sql: &str, bindings: &Bindings, fetch_mode: FetchMode) -> Result<Vec<serde_json::Value>> {
        self.run(sql.trim(), bindings, false, |_, stmt| fetch_rows(stmt, fetch_mode))
    }

    /// Affected row count of a statement, whatever its leading token
    pub fn execute(&self, sql: &str, bindings: &Bindings) -> Result<u64> {
        self.run(sql.trim(), bindings, false, step_all)
    }

    /// Id of the most recent successful insert on this connection
    pub fn last_insert_id(&self) -> Result<Option<i64>> {
        let session = self.lock()?;
        match session.conn.last_insert_rowid() {
            0 => Ok(None),
            id => Ok(Some(id)),
        }
    }

    /// SQL of the most recently prepared statement
    pub fn last_statement(&self) -> Result<Option<String>> {
        Ok(self.lock()?.last_statement.clone())
    }

    pub fn table(&self) -> Table<'_> {
        Table::new(self)
    }

    /// Parameter dump for `sql` with `bindings`, without executing anything
    pub fn debug_dump_params(&self, sql: &str, bindings: &Bindings) -> Result<String> {
        let session = self.lock()?;
        let stmt = session.conn.prepare(sql.trim()).map_err(|e| self.prepare_failed(sql, e))?;
        Ok(dump_params(sql.trim(), stmt.parameter_count(), bindings))
    }

    fn run<T>(
        &self,
        sql: &str,
        bindings: &Bindings,
        debug: bool,
        consume: impl FnOnce(&Connection, &mut rusqlite::Statement<'_>) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let mut session = self.lock()?;
        session.last_statement = Some(sql.to_string());
        let Session { conn, .. } = &*session;

        let mut stmt = conn.prepare(sql).map_err(|e| self.prepare_failed(sql, e))?;
        debug!(sql, params = bindings.len(), "prepared");
        if debug {
            let dump = dump_params(sql, stmt.parameter_count(), bindings);
            debug!(target: "slotdb::params", "{}", dump);
        }

        bindings
            .bind(&mut stmt)
            .and_then(|_| consume(conn, &mut stmt))
            .map_err(|e| self.execute_failed(sql, e))
    }

    fn prepare_failed(&self, sql: &str, source: rusqlite::Error) -> DbError {
        self.log(LogEntry::Error(&source));
        self.log(LogEntry::Message(sql));
        DbError::Prepare {
            sql: sql.to_string(),
            source,
        }
    }

    fn execute_failed(&self, sql: &str, source: rusqlite::Error) -> DbError {
        self.log(LogEntry::Message(&format!("query failed: {}", source)));
        DbError::Execute {
            sql: sql.to_string(),
            source,
        }
    }

    fn log(&self, entry: LogEntry<'_>) {
        if let Some(logger) = &self.logger {
            logger.log(entry);
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Session>> {
        self.session.lock().map_err(|_| DbError::LockPoisoned)
    }

    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let session = self.lock()?;
        f(&session.conn)
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("settings", &self.settings)
            .field("logger", &self.logger.is_some())
            .finish_non_exhaustive()
    }
}

fn fetch_rows(stmt: &mut rusqlite::Statement<'_>, mode: FetchMode) -> rusqlite::Result<Vec<serde_json::Value>> {
    let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    let mut rows = stmt.raw_query();
    let mut results = Vec::new();
    while let Some(row) = rows.next()? {
        results.push(shape_row(row, &columns, mode)?);
    }
    Ok(results)
}

/// Steps the statement to completion and reports the rows it changed.
///
/// Statements that touch no rows (DDL, PRAGMA, SELECT) report 0 rather than
/// the connection's count for an earlier statement.
fn step_all(conn: &Connection, stmt: &mut rusqlite::Statement<'_>) -> rusqlite::Result<u64> {
    let before = total_changes(conn)?;
    let mut rows = stmt.raw_query();
    while rows.next()?.is_some() {}
    drop(rows);
    if total_changes(conn)? == before {
        Ok(0)
    } else {
        Ok(conn.changes() as u64)
    }
}

fn total_changes(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT total_changes()", [], |row| row.get(0))
}

fn dump_params(sql: &str, expected: usize, bindings: &Bindings) -> String {
    let mut out = format!("SQL: [{}] {}\nParams:  {}\n", sql.len(), sql, expected);
    for (name, value) in bindings.describe() {
        out.push_str(&format!("Key: Name: [{}] {}\nValue: {}\n", name.len(), name, value));
    }
    out
}
