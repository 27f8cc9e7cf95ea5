//! Server lifetime: a stop signal plus the background tasks that must wind
//! down with it.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Owns the stop token and the tasks that observe it.
///
/// Tasks registered with [`track`](Self::track) are joined by
/// [`drain`](Self::drain); whatever is still running when the deadline passes
/// is aborted.
#[derive(Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ShutdownCoordinator {
    /// A coordinator with no tracked tasks.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that fires when the server stops.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Signal every holder of [`token`](Self::token) to stop.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether a stop has been signalled.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Hand a background task to the coordinator so `drain` waits for it.
    pub fn track(&self, task: JoinHandle<()>) {
        self.tasks.lock().push(task);
    }

    /// Number of tasks not yet drained.
    pub fn tracked(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Signal stop, then join every tracked task within `timeout`.
    ///
    /// Returns `true` if all tasks finished in time. Tasks still running at
    /// the deadline are aborted.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.shutdown();
        let tasks = std::mem::take(&mut *self.tasks.lock());
        if tasks.is_empty() {
            return true;
        }
        info!(tasks = tasks.len(), ?timeout, "draining background tasks");

        let aborts: Vec<_> = tasks.iter().map(JoinHandle::abort_handle).collect();
        let joined = tokio::time::timeout(timeout, futures::future::join_all(tasks)).await;
        match joined {
            Ok(results) => {
                for panic in results.into_iter().filter_map(Result::err) {
                    warn!(error = %panic, "background task failed during shutdown");
                }
                true
            }
            Err(_) => {
                let stuck = aborts.iter().filter(|a| !a.is_finished()).count();
                warn!(stuck, "shutdown deadline passed, aborting remaining tasks");
                for abort in &aborts {
                    abort.abort();
                }
                false
            }
        }
    }
}

/// Resolve on Ctrl-C, or SIGTERM on Unix.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                let _ = sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received ctrl-c"),
        () = terminate => info!("received SIGTERM"),
    }
}
