use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a row-returning query shapes each row
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Column name -> value, in column order
    #[default]
    Assoc,
    /// Positional array of values
    Num,
    /// Column name and positional index keys in one object
    Both,
    /// Value of the first column only
    Column,
}

/// Result of `ConnectionManager::query`, shaped by the statement verb
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum QueryOutput {
    Rows(Vec<Value>),
    Affected(u64),
    Nothing,
}

impl QueryOutput {
    pub fn rows(&self) -> Option<&[Value]> {
        match self {
            QueryOutput::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn into_rows(self) -> Option<Vec<Value>> {
        match self {
            QueryOutput::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn affected(&self) -> Option<u64> {
        match self {
            QueryOutput::Affected(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, QueryOutput::Nothing)
    }

    /// JSON form handed to embedders: array, number or null
    pub fn into_json(self) -> Value {
        match self {
            QueryOutput::Rows(rows) => Value::Array(rows),
            QueryOutput::Affected(n) => Value::from(n),
            QueryOutput::Nothing => Value::Null,
        }
    }
}
