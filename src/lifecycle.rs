//! Server lifecycle hooks.
//!
//! The pool is opened before the listener binds and closed after the server
//! stops, whether it stopped cleanly or with an error. A failed startup is
//! fatal; a failed close is only logged.

use crate::db::ConnectionPool;
use crate::error::DbResult;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info};

pub struct ServerLifecycle {
    pool: Arc<ConnectionPool>,
}

impl ServerLifecycle {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    /// Initialize the pool. Errors here must abort the process.
    pub async fn startup(&self) -> DbResult<()> {
        match self.pool.initialize().await {
            Ok(()) => {
                info!("Startup complete");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Startup failed");
                Err(e)
            }
        }
    }

    /// Close the pool, logging instead of propagating any failure.
    pub async fn shutdown(&self) {
        if let Err(e) = self.pool.close().await {
            error!(error = %e, "Database pool did not close cleanly");
        }
    }

    /// Run `serve` between [`startup`](Self::startup) and
    /// [`shutdown`](Self::shutdown). `serve` is never called if startup fails.
    pub async fn run<F, Fut>(&self, serve: F) -> DbResult<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DbResult<()>>,
    {
        self.startup().await?;
        let result = serve().await;
        self.shutdown().await;
        result
    }
}
