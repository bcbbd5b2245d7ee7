//! MCP service implementation using rmcp.
//!
//! This module defines the PgService struct with the three read-only
//! PostgreSQL tools exposed via the MCP protocol using the rmcp framework's
//! macros. Every tool answers with a `success` flag; failures are reported
//! in the tool result, never as protocol errors.

use crate::db::ConnectionPool;
use crate::tools::observer::PeerObserver;
use crate::tools::query::{ExecuteQueryInput, ExecuteQueryOutput, QueryToolHandler};
use crate::tools::schema::{
    GetTableSchemaInput, GetTableSchemaOutput, ListTablesInput, ListTablesOutput,
    SchemaToolHandler,
};
use rmcp::Json;
use rmcp::{
    RoleServer, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

/// Name reported in the MCP handshake.
pub const SERVER_NAME: &str = "pg-mcp-server";

#[derive(Clone)]
pub struct PgService {
    /// Pool shared by every session and every tool call
    pool: Arc<ConnectionPool>,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl PgService {
    /// Create a new PgService bound to the shared pool.
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self {
            pool,
            tool_router: Self::tool_router(),
        }
    }

    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }
}

#[tool_router]
impl PgService {
    #[tool(
        description = "Execute a SELECT query and return results.\nUse this for data retrieval operations only.\nSupports parameterized queries ($1, $2, ...) via `params`."
    )]
    async fn execute_query(
        &self,
        Parameters(input): Parameters<ExecuteQueryInput>,
        context: RequestContext<RoleServer>,
    ) -> Json<ExecuteQueryOutput> {
        let observer = PeerObserver::new(context.peer, "execute_query");
        let handler = QueryToolHandler::new(self.pool.clone());
        Json(handler.execute_query(input, Some(&observer)).await)
    }

    #[tool(
        description = "Get detailed schema information for a table.\nReturns columns with data types, nullability, defaults, and primary key, foreign key and unique flags."
    )]
    async fn get_table_schema(
        &self,
        Parameters(input): Parameters<GetTableSchemaInput>,
        context: RequestContext<RoleServer>,
    ) -> Json<GetTableSchemaOutput> {
        let observer = PeerObserver::new(context.peer, "get_table_schema");
        let handler = SchemaToolHandler::new(self.pool.clone());
        Json(handler.get_table_schema(input, Some(&observer)).await)
    }

    #[tool(description = "List all tables in a schema.\nReturns table names and types ordered by name.")]
    async fn list_tables(
        &self,
        Parameters(input): Parameters<ListTablesInput>,
        context: RequestContext<RoleServer>,
    ) -> Json<ListTablesOutput> {
        let observer = PeerObserver::new(context.peer, "list_tables");
        let handler = SchemaToolHandler::new(self.pool.clone());
        Json(handler.list_tables(input, Some(&observer)).await)
    }
}

#[tool_handler]
impl ServerHandler for PgService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_logging()
                .build(),
            server_info: Implementation {
                name: SERVER_NAME.to_owned(),
                title: Some("PostgreSQL MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Read-only tools for a single PostgreSQL database.\n\
                \n\
                ## Tools\n\
                - `list_tables`: tables and views in a schema (default `public`)\n\
                - `get_table_schema`: columns, types and key constraints of one table\n\
                - `execute_query`: run one SELECT statement, optionally with `$1`-style `params`\n\
                \n\
                ## Notes\n\
                - Every statement runs in a READ ONLY transaction; writes are rejected.\n\
                - Results carry `success`; on failure read the `error` field.\n\
                - Progress is reported through logging notifications."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolOptions;

    fn create_test_service() -> PgService {
        let pool = Arc::new(ConnectionPool::new(
            "postgres://u:p@127.0.0.1/db",
            PoolOptions::default(),
        ));
        PgService::new(pool)
    }

    #[test]
    fn test_server_info() {
        let service = create_test_service();
        let info = service.get_info();
        assert_eq!(info.server_info.name, SERVER_NAME);
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.logging.is_some());
    }

    #[test]
    fn test_all_tools_registered() {
        let service = create_test_service();
        let mut names: Vec<String> = service
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["execute_query", "get_table_schema", "list_tables"]);
    }

    #[test]
    fn test_sessions_share_one_pool() {
        let service = create_test_service();
        let session = service.clone();
        assert!(Arc::ptr_eq(service.pool(), session.pool()));
    }
}
