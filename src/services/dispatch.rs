//! The dispatch loop: the only consumer of the action queue.
//!
//! Actions are performed strictly one at a time, in sequence order, against
//! a single exclusively-owned [`PlaybackControl`]. A failed action is logged
//! and dropped; the loop keeps going.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::commands::RoutedAction;
use crate::queue::ActionReceiver;
use crate::traits::PlaybackControl;

/// Counters kept by the dispatch loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Actions performed successfully.
    pub performed: u64,
    /// Actions that failed and were dropped.
    pub failed: u64,
}

/// Owns the control client while the engine runs.
pub struct Dispatcher<C> {
    control: C,
    stats: DispatchStats,
}

impl<C: PlaybackControl> Dispatcher<C> {
    /// Wrap `control`.
    pub fn new(control: C) -> Self {
        Self {
            control,
            stats: DispatchStats::default(),
        }
    }

    /// Counters so far.
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Perform one routed action.
    pub async fn dispatch(&mut self, routed: RoutedAction) {
        debug!(
            seq = routed.seq,
            input = %routed.input,
            action = %routed.action,
            "dispatching"
        );
        match self.control.perform(routed.action).await {
            Ok(()) => self.stats.performed += 1,
            Err(e) => {
                self.stats.failed += 1;
                warn!(
                    seq = routed.seq,
                    input = %routed.input,
                    action = %routed.action,
                    error = %e,
                    "action dropped"
                );
            }
        }
    }

    /// Consume `queue` until `cancel` fires or every sender is gone, then
    /// give the control back.
    ///
    /// An action already being performed when cancellation arrives is
    /// finished first. Actions still queued are discarded.
    pub async fn run(mut self, mut queue: ActionReceiver, cancel: CancellationToken) -> (C, DispatchStats) {
        info!("dispatch loop started");
        loop {
            let routed = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = queue.recv() => match next {
                    Some(routed) => routed,
                    None => break,
                },
            };
            self.dispatch(routed).await;
        }

        queue.close();
        let discarded = std::iter::from_fn(|| queue.try_recv()).count();
        info!(
            performed = self.stats.performed,
            failed = self.stats.failed,
            discarded,
            "dispatch loop stopped"
        );
        (self.control, self.stats)
    }
}
