//! Schema-related data models.
//!
//! This module defines the catalog descriptors returned by
//! `get_table_schema` and `list_tables`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The table a foreign-key column points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ForeignKeyRef {
    pub table_schema: String,
    pub table_name: String,
    pub column_name: String,
    pub constraint_name: String,
}

/// One column of a described table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnDescriptor {
    pub column_name: String,
    /// Catalog data type; the underlying type name for user-defined types
    pub data_type: String,
    pub is_nullable: bool,
    pub column_default: Option<String>,
    /// 1-based
    pub ordinal_position: i32,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
    pub is_unique: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKeyRef>,
}

impl ColumnDescriptor {
    /// Create a descriptor with no constraints and no size information.
    pub fn new(
        column_name: impl Into<String>,
        data_type: impl Into<String>,
        ordinal_position: i32,
    ) -> Self {
        Self {
            column_name: column_name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            column_default: None,
            ordinal_position,
            is_primary_key: false,
            is_foreign_key: false,
            is_unique: false,
            max_length: None,
            precision: None,
            scale: None,
            foreign_key: None,
        }
    }

    /// Attach a size attribute only when the catalog reports a non-zero value.
    pub fn reported(value: Option<i32>) -> Option<i32> {
        value.filter(|v| *v != 0)
    }
}

/// A table or view in a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TableSummary {
    pub name: String,
    /// `BASE TABLE`, `VIEW`, `FOREIGN`, ...
    #[serde(rename = "type")]
    pub table_type: String,
}

impl TableSummary {
    pub fn new(name: impl Into<String>, table_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_type: table_type.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_optional_attributes_omitted() {
        let col = ColumnDescriptor::new("id", "integer", 1);
        let value = serde_json::to_value(&col).unwrap();
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("max_length"));
        assert!(!obj.contains_key("precision"));
        assert!(!obj.contains_key("scale"));
        assert!(!obj.contains_key("foreign_key"));
        // column_default is always present, null when unset
        assert_eq!(obj.get("column_default"), Some(&json!(null)));
    }

    #[test]
    fn test_reported_drops_zero() {
        assert_eq!(ColumnDescriptor::reported(Some(0)), None);
        assert_eq!(ColumnDescriptor::reported(None), None);
        assert_eq!(ColumnDescriptor::reported(Some(255)), Some(255));
    }

    #[test]
    fn test_table_summary_uses_type_key() {
        let value = serde_json::to_value(TableSummary::new("users", "BASE TABLE")).unwrap();
        assert_eq!(value, json!({"name": "users", "type": "BASE TABLE"}));
    }
}
