//! Query-related data models.
//!
//! This module defines the bind values accepted by `execute_query` and the
//! row shape handed back to clients.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Schema searched when a tool call names none.
pub const DEFAULT_SCHEMA: &str = "public";

/// Characters of query text repeated back in progress notices.
pub const QUERY_PREVIEW_CHARS: usize = 100;

/// One materialized row: column name to decoded value, in column order.
pub type JsonRow = serde_json::Map<String, JsonValue>;

/// A positional bind value for `$1`, `$2`, ...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum QueryParam {
    /// NULL value
    Null,
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    Float(f64),
    String(String),
    /// Arrays and objects, bound as `jsonb`
    Json(JsonValue),
}

impl QueryParam {
    /// Check if this parameter is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this parameter for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Json(_) => "json",
        }
    }
}

impl From<&str> for QueryParam {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i64> for QueryParam {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// First [`QUERY_PREVIEW_CHARS`] characters of `sql`, cut on a char boundary.
pub fn query_preview(sql: &str) -> String {
    sql.chars().take(QUERY_PREVIEW_CHARS).collect()
}

pub(crate) fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}
