//! Leading-verb classification used by `ConnectionManager::query`.
//!
//! Only the first whitespace-delimited token is looked at. A leading comment,
//! parenthesis or `WITH` clause classifies as `Other`.

use once_cell::sync::Lazy;
use regex::Regex;

static LEADING_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\S+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// SELECT, SHOW
    Fetch,
    /// INSERT, UPDATE, DELETE
    Modify,
    Other,
}

pub fn classify(sql: &str) -> Verb {
    let token = LEADING_TOKEN
        .find(sql.trim())
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_default();
    match token.as_str() {
        "select" | "show" => Verb::Fetch,
        "insert" | "update" | "delete" => Verb::Modify,
        _ => Verb::Other,
    }
}
