//! PostgreSQL MCP Server Library
//!
//! This library provides MCP (Model Context Protocol) tools that give AI
//! assistants read-only access to a single PostgreSQL database: listing
//! tables, describing a table and running SELECT queries.

pub mod config;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;
pub mod validation;

pub use config::Config;
pub use db::ConnectionPool;
pub use error::DbError;
pub use mcp::PgService;
