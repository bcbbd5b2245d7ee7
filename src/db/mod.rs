//! Database access layer.
//!
//! This module provides database access functionality:
//! - Connection pool lifecycle
//! - Read-only statement execution
//! - Schema introspection
//! - Type mappings

pub mod executor;
pub mod params;
pub mod pool;
pub mod schema;
pub mod types;

pub use executor::fetch_read_only;
pub use pool::{ConnectionPool, PoolState, PoolStats, ScopedConnection};
pub use schema::SchemaInspector;
pub use types::RowToJson;
