//! Params module - converts JSON bindings to SQLite parameters

use rusqlite::types::{Null, ToSql};
use rusqlite::Statement;
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::error::{DbError, Result};

/// Values bound to a prepared statement
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Bindings {
    #[default]
    None,
    /// `?` / `?N` placeholders, in order
    Positional(Vec<Value>),
    /// `:name`, `@name` or `$name` placeholders; keys may omit the prefix
    Named(Map<String, Value>),
}

impl Bindings {
    /// Accepts an array, an object or null
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Bindings::None),
            Value::Array(values) => Ok(Bindings::Positional(values)),
            Value::Object(map) => Ok(Bindings::Named(map)),
            other => Err(DbError::invalid_settings(format!(
                "bindings must be an array or an object, got {}",
                other
            ))),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Bindings::None => 0,
            Bindings::Positional(v) => v.len(),
            Bindings::Named(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Binds every value onto `stmt`.
    ///
    /// Every placeholder must receive exactly one value; an unbound
    /// placeholder or a surplus positional value is an error.
    pub(crate) fn bind(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<()> {
        let expected = stmt.parameter_count();
        match self {
            Bindings::None => {
                if expected > 0 {
                    return Err(rusqlite::Error::InvalidParameterCount(0, expected));
                }
                Ok(())
            }
            Bindings::Positional(values) => {
                if values.len() != expected {
                    return Err(rusqlite::Error::InvalidParameterCount(values.len(), expected));
                }
                for (i, v) in values.iter().enumerate() {
                    stmt.raw_bind_parameter(i + 1, convert_single_param(v))?;
                }
                Ok(())
            }
            Bindings::Named(map) => {
                let mut bound = HashSet::with_capacity(map.len());
                for (key, v) in map {
                    let idx = resolve_named(stmt, key)?;
                    stmt.raw_bind_parameter(idx, convert_single_param(v))?;
                    bound.insert(idx);
                }
                match (1..=expected).find(|idx| !bound.contains(idx)) {
                    Some(idx) => Err(match stmt.parameter_name(idx) {
                        Some(name) => rusqlite::Error::InvalidParameterName(name.to_string()),
                        None => rusqlite::Error::InvalidParameterCount(bound.len(), expected),
                    }),
                    None => Ok(()),
                }
            }
        }
    }

    /// `(placeholder, value)` pairs for debug dumps
    pub(crate) fn describe(&self) -> Vec<(String, String)> {
        match self {
            Bindings::None => Vec::new(),
            Bindings::Positional(values) => values
                .iter()
                .enumerate()
                .map(|(i, v)| (format!("?{}", i + 1), v.to_string()))
                .collect(),
            Bindings::Named(map) => map.iter().map(|(k, v)| (k.clone(), v.to_string())).collect(),
        }
    }
}

impl From<Vec<Value>> for Bindings {
    fn from(values: Vec<Value>) -> Self {
        Bindings::Positional(values)
    }
}

impl From<Map<String, Value>> for Bindings {
    fn from(map: Map<String, Value>) -> Self {
        Bindings::Named(map)
    }
}

fn resolve_named(stmt: &Statement<'_>, key: &str) -> rusqlite::Result<usize> {
    if key.starts_with([':', '@', '$']) {
        if let Some(idx) = stmt.parameter_index(key)? {
            return Ok(idx);
        }
    } else {
        for prefix in [':', '@', '$'] {
            if let Some(idx) = stmt.parameter_index(&format!("{}{}", prefix, key))? {
                return Ok(idx);
            }
        }
    }
    Err(rusqlite::Error::InvalidParameterName(key.to_string()))
}

/// Convert a single JSON value to a SQLite parameter
pub fn convert_single_param(v: &Value) -> Box<dyn ToSql + Send> {
    match v {
        Value::Null => Box::new(Null),
        Value::Bool(b) => Box::new(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Box::new(i)
            } else {
                Box::new(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => Box::new(s.clone()),
        // Arrays and objects are stored as JSON text
        Value::Array(_) | Value::Object(_) => Box::new(v.to_string()),
    }
}
