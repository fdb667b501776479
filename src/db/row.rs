//! Row module - utilities for converting SQLite rows to JSON values

use rusqlite::types::ValueRef;
use rusqlite::Row;
use serde_json::{Map, Number, Value};

use crate::models::FetchMode;

/// Convert one SQLite column to JSON; BLOBs become base64 strings
pub fn sqlite_to_json(row: &Row, i: usize) -> rusqlite::Result<Value> {
    Ok(match row.get_ref(i)? {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            b,
        )),
    })
}

/// Shape a full row according to `mode`
pub fn shape_row(row: &Row, columns: &[String], mode: FetchMode) -> rusqlite::Result<Value> {
    match mode {
        FetchMode::Assoc => {
            let mut map = Map::with_capacity(columns.len());
            for (i, name) in columns.iter().enumerate() {
                map.insert(name.clone(), sqlite_to_json(row, i)?);
            }
            Ok(Value::Object(map))
        }
        FetchMode::Num => {
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                values.push(sqlite_to_json(row, i)?);
            }
            Ok(Value::Array(values))
        }
        FetchMode::Both => {
            let mut map = Map::with_capacity(columns.len() * 2);
            for (i, name) in columns.iter().enumerate() {
                let val = sqlite_to_json(row, i)?;
                map.insert(name.clone(), val.clone());
                map.insert(i.to_string(), val);
            }
            Ok(Value::Object(map))
        }
        FetchMode::Column => {
            if columns.is_empty() {
                Ok(Value::Null)
            } else {
                sqlite_to_json(row, 0)
            }
        }
    }
}
