//! Periodic liveness sweep over every connection.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::hub::Hub;

/// Why the liveness monitor stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorExit {
    /// The shutdown token was cancelled.
    Cancelled,
}

/// Run [`Hub::sweep_liveness`] every `interval` until `cancel` fires.
///
/// The first sweep happens one full interval after start, so a connection that
/// never answers is closed between one and two intervals after its last pong.
pub async fn run_liveness_monitor(
    hub: Arc<Hub>,
    interval: Duration,
    cancel: CancellationToken,
) -> MonitorExit {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    let _ = ticker.tick().await;
    info!(interval_ms = interval.as_millis(), "liveness monitor started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = hub.sweep_liveness();
                if report.terminated > 0 {
                    info!(terminated = report.terminated, probed = report.probed, "liveness sweep closed silent peers");
                }
            }
            () = cancel.cancelled() => {
                debug!("liveness monitor cancelled");
                return MonitorExit::Cancelled;
            }
        }
    }
}
