//! Graceful shutdown for the relay's background tasks.

use std::time::Duration;

use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long to wait for the server and dispatcher before aborting them.
const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Owns the cancellation token observed by the HTTP server, the dispatcher
/// and every WebSocket session.
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a coordinator with a fresh token.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Get a clone of the cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Signal every holder of the token. Repeated calls are no-ops.
    pub fn shutdown(&self) {
        if !self.token.is_cancelled() {
            info!("relay shutdown requested");
        }
        self.token.cancel();
    }

    /// Whether shutdown has been signalled.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Signal shutdown and wait for `tasks` to finish.
    ///
    /// Tasks still running after `timeout` are aborted. Returns `true` when
    /// every task finished on its own.
    pub async fn graceful_shutdown(&self, tasks: Vec<JoinHandle<()>>, timeout: Option<Duration>) -> bool {
        let timeout = timeout.unwrap_or(DEFAULT_DRAIN_TIMEOUT);
        let stragglers: Vec<AbortHandle> = tasks.iter().map(JoinHandle::abort_handle).collect();

        self.shutdown();
        info!(tasks = tasks.len(), timeout_ms = timeout.as_millis() as u64, "draining relay tasks");

        match tokio::time::timeout(timeout, futures::future::join_all(tasks)).await {
            Ok(results) => {
                let panicked = results
                    .iter()
                    .filter(|r| r.as_ref().is_err_and(|e| e.is_panic()))
                    .count();
                if panicked > 0 {
                    warn!(panicked, "relay task panicked before shutdown");
                }
                true
            }
            Err(_) => {
                warn!(?timeout, "shutdown timed out, aborting remaining tasks");
                for task in stragglers {
                    task.abort();
                }
                false
            }
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
