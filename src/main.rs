//! PostgreSQL MCP Server - Main entry point.
//!
//! This server provides read-only MCP (Model Context Protocol) tools for AI
//! assistants to inspect and query a PostgreSQL database over HTTP.

use clap::Parser;
use clap::error::ErrorKind;
use pg_mcp_server::config::Config;
use pg_mcp_server::db::ConnectionPool;
use pg_mcp_server::transport::HttpTransport;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse configuration from command line and environment
    let config = match Config::try_parse() {
        Ok(config) => config,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    init_tracing(&config);

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    let bind_addr = match config.bind_addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        database = %config.redacted_database_url(),
        addr = %bind_addr,
        endpoint = %config.endpoint,
        "Starting PostgreSQL MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let pool = Arc::new(ConnectionPool::new(
        config.database_url.clone(),
        config.pool_options(),
    ));
    let transport = HttpTransport::new(pool, bind_addr, config.endpoint.clone());

    if let Err(e) = transport.run().await {
        if e.is_fatal() {
            error!(error = %e, "Fatal error, server not started");
        } else {
            error!(error = %e, "Server error");
        }
        if let Some(suggestion) = e.suggestion() {
            error!(suggestion, "Hint");
        }
        return ExitCode::FAILURE;
    }

    info!("Server shutdown complete");
    ExitCode::SUCCESS
}
