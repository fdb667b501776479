//! Table helper - schema introspection over a manager's connection

use serde::Serialize;

use super::connect::quote_ident;
use super::manager::ConnectionManager;
use crate::error::Result;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub cid: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub col_type: String,
    pub notnull: bool,
    pub dflt_value: Option<String>,
    pub pk: i64,
}

/// Table helper shared by every caller of one manager
pub struct Table<'a> {
    manager: &'a ConnectionManager,
}

impl<'a> Table<'a> {
    pub(crate) fn new(manager: &'a ConnectionManager) -> Self {
        Table { manager }
    }

    /// User tables, sorted by name
    pub fn names(&self) -> Result<Vec<String>> {
        self.manager.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )?;
            let tables = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(tables)
        })
    }

    pub fn exists(&self, name: &str) -> Result<bool> {
        self.manager.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
                [name],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    /// Column information for a table; empty when the table does not exist
    pub fn columns(&self, name: &str) -> Result<Vec<ColumnInfo>> {
        self.manager.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(name)))?;
            let columns = stmt
                .query_map([], |row| {
                    Ok(ColumnInfo {
                        cid: row.get(0)?,
                        name: row.get(1)?,
                        col_type: row.get(2)?,
                        notnull: row.get::<_, i64>(3)? == 1,
                        dflt_value: row.get(4)?,
                        pk: row.get(5)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(columns)
        })
    }

    /// The CREATE statement for a table
    pub fn create_sql(&self, name: &str) -> Result<Option<String>> {
        self.manager.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?")?;
            let mut rows = stmt.query([name])?;
            match rows.next()? {
                Some(row) => Ok(row.get(0)?),
                None => Ok(None),
            }
        })
    }
}
