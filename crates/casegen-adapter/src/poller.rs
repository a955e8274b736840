/*
[INPUT]:  Shared TaskBoard + poll interval + session state
[OUTPUT]: Periodic board refreshes until cancelled, dropped, or signed out
[POS]:    Domain layer - background refresh worker
[UPDATE]: When changing poll cadence, failure policy, or shutdown semantics
*/

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::SessionState;
use crate::board::TaskBoard;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Lower bound applied to any requested interval
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Spawns the refresh loop for a board.
///
/// Prefer [`TaskBoard::start_polling`], which also cancels a previous poller.
pub struct TaskPoller;

impl TaskPoller {
    /// Refresh immediately, then every `interval`. A slow refresh makes the
    /// next tick skip rather than queue up. Failed refreshes are logged and
    /// the loop keeps going.
    pub fn spawn(board: &Arc<TaskBoard>, interval: Duration) -> PollerHandle {
        let interval = interval.max(MIN_POLL_INTERVAL);
        let shutdown = CancellationToken::new();
        let weak = Arc::downgrade(board);
        let worker_shutdown = shutdown.clone();

        let handle = tokio::spawn(async move {
            run(weak, interval, worker_shutdown).await;
        });

        PollerHandle {
            shutdown,
            handle: Some(handle),
        }
    }
}

async fn run(board: Weak<TaskBoard>, interval: Duration, shutdown: CancellationToken) {
    let Some(mut session_rx) = board.upgrade().map(|b| b.client().session().subscribe()) else {
        return;
    };
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    debug!(interval_ms = interval.as_millis() as u64, "task poller started");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = session_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = session_rx.borrow_and_update().clone();
                if let SessionState::SignedOut { reason } = state {
                    info!(?reason, "session ended, stopping task poller");
                    break;
                }
            }
            _ = ticker.tick() => {
                // the board owns no handle to us; stop once the last user drops it
                let Some(board) = board.upgrade() else {
                    break;
                };
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    result = board.refresh() => match result {
                        Ok(true) => {}
                        Ok(false) => debug!("poll result superseded"),
                        Err(err) => warn!(error = %err, retryable = err.is_retryable(), "task poll failed"),
                    }
                }
            }
        }
    }

    debug!("task poller stopped");
}

/// Owner of a running poller; dropping it cancels the loop
#[derive(Debug)]
pub struct PollerHandle {
    shutdown: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub(crate) fn token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Request cancellation without waiting
    pub fn cancel(&self) {
        self.shutdown.cancel();
    }

    /// Cancel and wait for the loop (including any in-flight poll) to end
    pub async fn stop(mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "task poller ended abnormally");
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
