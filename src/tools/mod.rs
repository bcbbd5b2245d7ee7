//! MCP tool implementations.
//!
//! This module contains the database tool handlers:
//! - `query`: Execute SELECT queries
//! - `schema`: Describe a table and list tables in a schema
//! - `sql_guard`: SELECT-only statement validation
//! - `observer`: Best-effort progress notices

pub mod observer;
pub mod query;
pub mod schema;
pub mod sql_guard;

use crate::error::DbError;
use tracing::{error, warn};

pub use observer::{NoticeLevel, PeerObserver, ToolObserver};
pub use query::{ExecuteQueryInput, ExecuteQueryOutput, QueryToolHandler};
pub use schema::{
    GetTableSchemaInput, GetTableSchemaOutput, ListTablesInput, ListTablesOutput,
    SchemaToolHandler,
};

/// Log a failed tool call. A missing pool means the server accepted a call
/// outside the pool's `Ready` window.
pub(crate) fn log_failure(tool: &str, err: &DbError) {
    match err {
        DbError::PoolNotInitialized => {
            error!(tool, "Tool invoked while the database pool is not ready")
        }
        other => warn!(tool, error = %other, sql_state = ?other.sql_state(), "Tool call failed"),
    }
}
