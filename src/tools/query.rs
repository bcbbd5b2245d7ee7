//! Query execution tool.
//!
//! This module implements the `execute_query` MCP tool. Only single SELECT
//! statements are accepted; anything else is rejected before the pool is
//! touched.

use crate::db::types::RowToJson;
use crate::db::{ConnectionPool, fetch_read_only};
use crate::error::{DbError, DbResult};
use crate::models::{JsonRow, QueryParam, query_preview};
use crate::tools::observer::{NoticeLevel, ToolObserver, emit};
use crate::tools::{log_failure, sql_guard};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Input for the execute_query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExecuteQueryInput {
    /// SQL SELECT query to execute. Use $1, $2, ... placeholders for parameters.
    pub query: String,
    /// Query parameters for prepared statements, in placeholder order
    #[serde(default)]
    pub params: Vec<QueryParam>,
}

/// Output from the execute_query tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ExecuteQueryOutput {
    pub success: bool,
    /// Number of rows returned (success only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
    /// Error message (failure only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Result rows as column-to-value objects; empty on failure
    pub data: Vec<JsonRow>,
}

impl ExecuteQueryOutput {
    pub fn success(data: Vec<JsonRow>) -> Self {
        Self {
            success: true,
            row_count: Some(data.len()),
            error: None,
            data,
        }
    }

    pub fn failure(err: &DbError) -> Self {
        Self {
            success: false,
            row_count: None,
            error: Some(err.to_string()),
            data: Vec::new(),
        }
    }
}

impl From<DbResult<Vec<JsonRow>>> for ExecuteQueryOutput {
    fn from(result: DbResult<Vec<JsonRow>>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(e) => Self::failure(&e),
        }
    }
}

/// Handler for query execution.
pub struct QueryToolHandler {
    pool: Arc<ConnectionPool>,
}

impl QueryToolHandler {
    /// Create a new query tool handler.
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    /// Handle the execute_query tool call. Never fails; errors are folded
    /// into the output.
    pub async fn execute_query(
        &self,
        input: ExecuteQueryInput,
        observer: Option<&dyn ToolObserver>,
    ) -> ExecuteQueryOutput {
        emit(
            observer,
            NoticeLevel::Info,
            format!("Executing query: {}...", query_preview(&input.query)),
        )
        .await;

        let result = self.run(&input).await;

        match &result {
            Ok(rows) => {
                emit(
                    observer,
                    NoticeLevel::Info,
                    format!("Query returned {} rows", rows.len()),
                )
                .await;
            }
            Err(e) => {
                log_failure("execute_query", e);
                emit(observer, NoticeLevel::Error, format!("Query failed: {}", e)).await;
            }
        }

        result.into()
    }

    async fn run(&self, input: &ExecuteQueryInput) -> DbResult<Vec<JsonRow>> {
        sql_guard::validate_select(&input.query)?;

        let start = Instant::now();
        let rows = fetch_read_only(&self.pool, &input.query, &input.params).await?;
        let data: Vec<JsonRow> = rows.iter().map(|row| row.to_json_map()).collect();

        info!(
            row_count = data.len(),
            params = input.params.len(),
            execution_time_ms = start.elapsed().as_millis() as u64,
            "Query executed"
        );
        Ok(data)
    }
}
