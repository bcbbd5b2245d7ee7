//! Transport layer for the MCP server.
//!
//! Only Streamable HTTP is served: MCP messages over HTTP with SSE responses.

pub mod http;

pub use http::{GRACEFUL_TIMEOUT, HttpTransport, wait_for_signal};
