//! The single ordered action queue between watchers and the dispatch loop.
//!
//! Every watcher holds a cloned [`ActionSender`]; the dispatch loop owns the
//! only [`ActionReceiver`]. Pushing never waits: when the queue is full the
//! action is refused and the caller logs and drops it.
//!
//! Sequence numbers are assigned under the same lock that enqueues, so the
//! order of `seq` is exactly the order the receiver sees. Numbers are only
//! consumed by successful pushes. `seq` is the total order; `accepted_ms`
//! never decreases along it. Watchers read the clock before taking the
//! lock, so a timestamp older than the last enqueued one is raised to it.
//!
//! ```rust
//! use rs_gpio_mpdc::queue::action_queue;
//! use rs_gpio_mpdc::{Action, InputId};
//!
//! # tokio_test_block(async {
//! let (tx, mut rx) = action_queue(8);
//! tx.push(Action::NextTrack, InputId::Button(0), 10).unwrap();
//! tx.push(Action::VolumeUp, InputId::Encoder(0), 11).unwrap();
//!
//! let first = rx.recv().await.unwrap();
//! let second = rx.recv().await.unwrap();
//! assert_eq!((first.seq, first.action), (0, Action::NextTrack));
//! assert_eq!((second.seq, second.action), (1, Action::VolumeUp));
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::commands::{Action, InputId, RoutedAction};

/// Why an action could not be enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// The queue is at capacity.
    #[error("action queue full, dropped {0}")]
    Full(Action),
    /// The dispatch loop has stopped.
    #[error("action queue closed")]
    Closed,
}

/// Create a bounded queue with the given capacity (at least 1).
pub fn action_queue(capacity: usize) -> (ActionSender, ActionReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        ActionSender {
            inner: Arc::new(Mutex::new(SenderState {
                tx,
                next_seq: 0,
                last_ms: 0,
            })),
        },
        ActionReceiver { rx },
    )
}

struct SenderState {
    tx: mpsc::Sender<RoutedAction>,
    next_seq: u64,
    /// `accepted_ms` of the last successful push.
    last_ms: u64,
}

/// Producer side, shared by all watchers.
#[derive(Clone)]
pub struct ActionSender {
    inner: Arc<Mutex<SenderState>>,
}

impl ActionSender {
    /// Stamp `action` with the next sequence number and enqueue it.
    pub fn push(
        &self,
        action: Action,
        input: InputId,
        accepted_ms: u64,
    ) -> Result<RoutedAction, QueueError> {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let routed = RoutedAction {
            action,
            input,
            seq: state.next_seq,
            accepted_ms: accepted_ms.max(state.last_ms),
        };

        match state.tx.try_send(routed) {
            Ok(()) => {
                state.next_seq += 1;
                state.last_ms = routed.accepted_ms;
                Ok(routed)
            }
            Err(TrySendError::Full(_)) => Err(QueueError::Full(action)),
            Err(TrySendError::Closed(_)) => Err(QueueError::Closed),
        }
    }

    /// True once the receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tx
            .is_closed()
    }
}

/// Consumer side, owned by the dispatch loop.
pub struct ActionReceiver {
    rx: mpsc::Receiver<RoutedAction>,
}

impl ActionReceiver {
    /// Wait for the next action. `None` once every sender is gone and the
    /// queue is drained.
    pub async fn recv(&mut self) -> Option<RoutedAction> {
        self.rx.recv().await
    }

    /// Take the next action without waiting.
    pub fn try_recv(&mut self) -> Option<RoutedAction> {
        self.rx.try_recv().ok()
    }

    /// Stop accepting new actions; already-queued ones can still be read.
    pub fn close(&mut self) {
        self.rx.close();
    }

    /// Number of queued actions.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
