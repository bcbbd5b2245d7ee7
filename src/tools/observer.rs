//! Per-invocation progress notices.
//!
//! Tool handlers accept an optional [`ToolObserver`] and emit short notices
//! ("Executing query: ...", "Found 3 tables") while they work. Notices are
//! best-effort: delivery failures are swallowed and never change a tool's
//! result.

use futures_util::future::BoxFuture;
use rmcp::model::{LoggingLevel, LoggingMessageNotificationParam};
use rmcp::{Peer, RoleServer};
use serde_json::Value as JsonValue;
use tracing::debug;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

impl From<NoticeLevel> for LoggingLevel {
    fn from(level: NoticeLevel) -> Self {
        match level {
            NoticeLevel::Info => LoggingLevel::Info,
            NoticeLevel::Error => LoggingLevel::Error,
        }
    }
}

/// Sink for progress notices.
pub trait ToolObserver: Send + Sync {
    fn notify(&self, level: NoticeLevel, message: String) -> BoxFuture<'_, ()>;
}

/// Emit a notice if an observer is attached.
pub async fn emit(observer: Option<&dyn ToolObserver>, level: NoticeLevel, message: String) {
    if let Some(observer) = observer {
        observer.notify(level, message).await;
    }
}

/// Forwards notices to the calling MCP client as `notifications/message`.
pub struct PeerObserver {
    peer: Peer<RoleServer>,
    logger: &'static str,
}

impl PeerObserver {
    /// `logger` names the tool in the client's log view.
    pub fn new(peer: Peer<RoleServer>, logger: &'static str) -> Self {
        Self { peer, logger }
    }
}

impl ToolObserver for PeerObserver {
    fn notify(&self, level: NoticeLevel, message: String) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let param = LoggingMessageNotificationParam {
                level: level.into(),
                logger: Some(self.logger.to_string()),
                data: JsonValue::String(message),
            };
            if let Err(e) = self.peer.notify_logging_message(param).await {
                debug!(logger = self.logger, error = %e, "Notice not delivered");
            }
        })
    }
}
