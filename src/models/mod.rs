//! Data models for the PostgreSQL MCP Server.
//!
//! This module re-exports all model types used throughout the application.

pub mod query;
pub mod schema;

pub use query::{
    DEFAULT_SCHEMA, JsonRow, QUERY_PREVIEW_CHARS, QueryParam, query_preview,
};
pub use schema::{ColumnDescriptor, ForeignKeyRef, TableSummary};
