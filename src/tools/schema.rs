//! Schema introspection tools.
//!
//! This module implements the `get_table_schema` and `list_tables` MCP tools.

use crate::db::{ConnectionPool, SchemaInspector};
use crate::error::{DbError, DbResult};
use crate::models::query::default_schema;
use crate::models::{ColumnDescriptor, TableSummary};
use crate::tools::log_failure;
use crate::tools::observer::{NoticeLevel, ToolObserver, emit};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Input for the get_table_schema tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetTableSchemaInput {
    /// Name of the table to describe
    pub table_name: String,
    /// Schema containing the table. Default: "public"
    #[serde(default = "default_schema")]
    pub schema_name: String,
}

/// Output from the get_table_schema tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct GetTableSchemaOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    /// Columns ordered by ordinal position (success only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<ColumnDescriptor>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Always empty; present on failure only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Vec<ColumnDescriptor>>,
}

impl GetTableSchemaOutput {
    pub fn success(
        table_name: impl Into<String>,
        schema_name: impl Into<String>,
        columns: Vec<ColumnDescriptor>,
    ) -> Self {
        Self {
            success: true,
            table_name: Some(table_name.into()),
            schema_name: Some(schema_name.into()),
            columns: Some(columns),
            error: None,
            schema: None,
        }
    }

    pub fn failure(err: &DbError) -> Self {
        Self {
            success: false,
            table_name: None,
            schema_name: None,
            columns: None,
            error: Some(err.to_string()),
            schema: Some(Vec::new()),
        }
    }
}

/// Input for the list_tables tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListTablesInput {
    /// Schema to list. Default: "public"
    #[serde(default = "default_schema")]
    pub schema_name: String,
}

/// Output from the list_tables tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListTablesOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Tables and views ordered by name; empty on failure
    pub tables: Vec<TableSummary>,
}

impl ListTablesOutput {
    pub fn success(schema_name: impl Into<String>, tables: Vec<TableSummary>) -> Self {
        Self {
            success: true,
            schema_name: Some(schema_name.into()),
            error: None,
            tables,
        }
    }

    pub fn failure(err: &DbError) -> Self {
        Self {
            success: false,
            schema_name: None,
            error: Some(err.to_string()),
            tables: Vec::new(),
        }
    }
}

/// Handler for schema introspection tools.
pub struct SchemaToolHandler {
    pool: Arc<ConnectionPool>,
}

impl SchemaToolHandler {
    /// Create a new schema tool handler.
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    /// Handle the get_table_schema tool call.
    pub async fn get_table_schema(
        &self,
        input: GetTableSchemaInput,
        observer: Option<&dyn ToolObserver>,
    ) -> GetTableSchemaOutput {
        let qualified = format!("{}.{}", input.schema_name, input.table_name);
        emit(
            observer,
            NoticeLevel::Info,
            format!("Getting schema for table: {}", qualified),
        )
        .await;

        let result: DbResult<Vec<ColumnDescriptor>> =
            SchemaInspector::describe_table(&self.pool, &input.schema_name, &input.table_name)
                .await;

        match result {
            Ok(columns) => {
                info!(table = %qualified, columns = columns.len(), "Table described");
                emit(
                    observer,
                    NoticeLevel::Info,
                    format!("Retrieved schema for {} columns", columns.len()),
                )
                .await;
                GetTableSchemaOutput::success(input.table_name, input.schema_name, columns)
            }
            Err(e) => {
                log_failure("get_table_schema", &e);
                emit(
                    observer,
                    NoticeLevel::Error,
                    format!("Failed to get schema: {}", e),
                )
                .await;
                GetTableSchemaOutput::failure(&e)
            }
        }
    }

    /// Handle the list_tables tool call.
    pub async fn list_tables(
        &self,
        input: ListTablesInput,
        observer: Option<&dyn ToolObserver>,
    ) -> ListTablesOutput {
        emit(
            observer,
            NoticeLevel::Info,
            format!("Listing tables in schema: {}", input.schema_name),
        )
        .await;

        match SchemaInspector::list_tables(&self.pool, &input.schema_name).await {
            Ok(tables) => {
                info!(schema = %input.schema_name, count = tables.len(), "Tables listed");
                emit(
                    observer,
                    NoticeLevel::Info,
                    format!("Found {} tables", tables.len()),
                )
                .await;
                ListTablesOutput::success(input.schema_name, tables)
            }
            Err(e) => {
                log_failure("list_tables", &e);
                emit(
                    observer,
                    NoticeLevel::Error,
                    format!("Failed to list tables: {}", e),
                )
                .await;
                ListTablesOutput::failure(&e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_name_defaults_to_public() {
        let input: GetTableSchemaInput =
            serde_json::from_value(json!({"table_name": "users"})).unwrap();
        assert_eq!(input.schema_name, "public");

        let input: ListTablesInput = serde_json::from_value(json!({})).unwrap();
        assert_eq!(input.schema_name, "public");
    }

    #[test]
    fn test_not_found_failure_shape() {
        let err = DbError::table_not_found("public", "missing");
        let value = serde_json::to_value(GetTableSchemaOutput::failure(&err)).unwrap();
        assert_eq!(
            value,
            json!({"success": false, "error": "Table public.missing not found", "schema": []})
        );
    }

    #[test]
    fn test_describe_success_shape() {
        let mut id = ColumnDescriptor::new("id", "integer", 1);
        id.is_nullable = false;
        id.is_primary_key = true;
        id.precision = Some(32);
        let value =
            serde_json::to_value(GetTableSchemaOutput::success("users", "public", vec![id]))
                .unwrap();
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["table_name"], json!("users"));
        assert_eq!(value["schema_name"], json!("public"));
        assert_eq!(value["columns"][0]["is_primary_key"], json!(true));
        assert_eq!(value["columns"][0]["precision"], json!(32));
        assert!(value.get("schema").is_none());
    }

    #[test]
    fn test_list_tables_shapes() {
        let value = serde_json::to_value(ListTablesOutput::success(
            "public",
            vec![TableSummary::new("users", "BASE TABLE")],
        ))
        .unwrap();
        assert_eq!(
            value,
            json!({
                "success": true,
                "schema_name": "public",
                "tables": [{"name": "users", "type": "BASE TABLE"}]
            })
        );

        let value =
            serde_json::to_value(ListTablesOutput::failure(&DbError::PoolNotInitialized)).unwrap();
        assert_eq!(
            value,
            json!({"success": false, "error": "Database pool not initialized", "tables": []})
        );
    }
}
