//! HTTP transport with Streamable HTTP support for the MCP server.
//!
//! This transport uses HTTP with SSE streaming responses,
//! which is suitable for web-based MCP integrations.

use crate::db::ConnectionPool;
use crate::error::{DbError, DbResult};
use crate::lifecycle::ServerLifecycle;
use crate::mcp::PgService;
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

/// Grace period for open SSE streams once shutdown starts.
pub const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP transport implementation with Streamable HTTP support.
///
/// This transport provides:
/// - HTTP endpoints for MCP protocol messages
/// - Server-Sent Events for streaming responses
/// - Session management for stateful connections
pub struct HttpTransport {
    pool: Arc<ConnectionPool>,
    bind_addr: SocketAddr,
    /// MCP endpoint path
    endpoint: String,
}

impl HttpTransport {
    /// Create a new HTTP transport.
    ///
    /// # Arguments
    ///
    /// * `pool` - The process-wide pool, opened and closed by [`run`](Self::run)
    /// * `bind_addr` - Address to listen on
    /// * `endpoint` - MCP endpoint path (e.g., "/mcp")
    pub fn new(
        pool: Arc<ConnectionPool>,
        bind_addr: SocketAddr,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            bind_addr,
            endpoint: endpoint.into(),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Get the MCP endpoint path.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Open the pool, serve until SIGINT/SIGTERM, then close the pool.
    pub async fn run(&self) -> DbResult<()> {
        self.run_until(wait_for_signal()).await
    }

    /// Like [`run`](Self::run), with a caller-supplied shutdown trigger.
    pub async fn run_until<S>(&self, shutdown: S) -> DbResult<()>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        ServerLifecycle::new(self.pool.clone())
            .run(|| async move {
                let listener = TcpListener::bind(self.bind_addr).await.map_err(|e| {
                    DbError::internal(format!("Failed to bind to {}: {}", self.bind_addr, e))
                })?;
                self.serve(listener, shutdown).await
            })
            .await
    }

    fn router(&self) -> axum::Router {
        let pool = self.pool.clone();

        // One PgService per MCP session, all sharing the same pool
        let service = StreamableHttpService::new(
            move || Ok(PgService::new(pool.clone())),
            LocalSessionManager::default().into(),
            Default::default(),
        );

        // nest_service doesn't support root path "/", use fallback_service instead
        if self.endpoint == "/" {
            axum::Router::new().fallback_service(service)
        } else {
            axum::Router::new().nest_service(&self.endpoint, service)
        }
    }

    /// Serve MCP on an already-bound listener until `shutdown` resolves.
    pub async fn serve<S>(&self, listener: TcpListener, shutdown: S) -> DbResult<()>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let local_addr = listener.local_addr().unwrap_or(self.bind_addr);
        info!(addr = %local_addr, endpoint = %self.endpoint, "MCP endpoint ready");

        // SSE connections may keep the server alive indefinitely, so we force
        // exit after a timeout once shutdown has been requested
        let shutdown_notify = Arc::new(tokio::sync::Notify::new());
        let shutdown_notify_clone = shutdown_notify.clone();
        let shutdown_signal = async move {
            shutdown.await;
            shutdown_notify_clone.notify_one();
        };

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal);

        tokio::select! {
            result = server => {
                match result {
                    Ok(()) => info!("HTTP server stopped"),
                    Err(e) => {
                        error!(error = %e, "HTTP server error");
                        return Err(DbError::internal(format!("HTTP server error: {}", e)));
                    }
                }
            }
            _ = async {
                shutdown_notify.notified().await;
                info!(
                    timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                    "Waiting for connections to close (send signal again to force exit)..."
                );

                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                        warn!("Graceful shutdown timeout, forcing exit");
                    }
                    _ = wait_for_signal() => {
                        warn!("Received second signal, forcing immediate exit");
                    }
                }
            } => {
                // Timeout or second signal reached - server will be dropped
            }
        }

        Ok(())
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
pub async fn wait_for_signal() {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
