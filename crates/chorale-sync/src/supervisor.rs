//! Reconnection supervision.
//!
//! After an unintended close the supervisor waits a fixed delay and
//! then emits one reconnect tick; the client run loop turns ticks into
//! `open` calls. The supervisor never dials the socket itself, which
//! keeps the timer logic testable without a network.
//!
//! Invariants: at most one pending timer at a time; a successful open
//! cancels the pending timer; there is no retry cap — the supervisor
//! keeps trying until the owner tears the channel down. Cancellation
//! is defined at timer granularity only; an `open` already in flight
//! is not interrupted.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Schedules reconnect ticks after unintended closes.
#[derive(Debug)]
pub struct ReconnectSupervisor {
    delay: Duration,
    tick_tx: mpsc::Sender<()>,
    pending: Option<(JoinHandle<()>, CancellationToken)>,
}

impl ReconnectSupervisor {
    /// Create a supervisor and the tick stream the run loop consumes.
    pub fn new(delay: Duration) -> (Self, mpsc::Receiver<()>) {
        let (tick_tx, tick_rx) = mpsc::channel(1);
        (
            Self {
                delay,
                tick_tx,
                pending: None,
            },
            tick_rx,
        )
    }

    /// Whether a reconnect timer is currently pending.
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|(handle, _)| !handle.is_finished())
    }

    /// React to an unintended close: schedule exactly one reconnect
    /// tick after the fixed delay. A second close while a timer is
    /// pending does not create a duplicate.
    pub fn on_unintended_close(&mut self) {
        if self.is_pending() {
            debug!("reconnect timer already pending");
            return;
        }
        let delay = self.delay;
        let tx = self.tick_tx.clone();
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                () = task_cancel.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    debug!("reconnect timer fired");
                    let _ = tx.send(()).await;
                }
            }
        });
        self.pending = Some((handle, cancel));
    }

    /// A connection opened; cancel any pending timer.
    pub fn on_open(&mut self) {
        self.clear_pending();
    }

    /// Teardown: cancel any pending timer.
    pub fn cancel(&mut self) {
        self.clear_pending();
    }

    fn clear_pending(&mut self) {
        if let Some((handle, cancel)) = self.pending.take() {
            cancel.cancel();
            handle.abort();
        }
    }
}

impl Drop for ReconnectSupervisor {
    fn drop(&mut self) {
        self.clear_pending();
    }
}
