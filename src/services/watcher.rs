//! Input watchers: one polling task per button or encoder.
//!
//! A watcher samples its pins every poll interval, runs the debounce or
//! quadrature bookkeeping, routes the resulting event and pushes the action
//! onto the shared queue. It never waits on the dispatch loop: a full queue
//! drops the action with a warning.
//!
//! ```text
//!   pins --poll--> EventSource --event--> EventRouter --action--> ActionSender
//! ```

use std::sync::Arc;
use std::time::Duration;

use embedded_hal::digital::InputPin;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::commands::{InputId, RoutedAction};
use crate::debounce::DebouncedInput;
use crate::quadrature::RotaryEncoder;
use crate::queue::{ActionSender, QueueError};
use crate::router::{EventRouter, InputEvent};
use crate::traits::{Clock, PinError};

/// Something a watcher can poll for input events.
pub trait EventSource {
    /// Sample the hardware at `now_ms` and return an event, if one completed.
    fn poll_event(&mut self, now_ms: u64) -> Result<Option<InputEvent>, PinError>;
}

impl<P: InputPin> EventSource for DebouncedInput<P> {
    fn poll_event(&mut self, now_ms: u64) -> Result<Option<InputEvent>, PinError> {
        Ok(self.poll(now_ms)?.map(InputEvent::Button))
    }
}

impl<A: InputPin, B: InputPin> EventSource for RotaryEncoder<A, B> {
    fn poll_event(&mut self, now_ms: u64) -> Result<Option<InputEvent>, PinError> {
        Ok(self.poll(now_ms)?.map(InputEvent::Encoder))
    }
}

// ============================================================================
// Input Watcher
// ============================================================================

/// Drives one [`EventSource`] and feeds the action queue.
///
/// The watcher owns its source, and through it the pin handles; when the
/// watcher is dropped its pins are released.
pub struct InputWatcher<S, C> {
    id: InputId,
    source: S,
    router: Arc<EventRouter>,
    queue: ActionSender,
    clock: C,
    read_failing: bool,
}

impl<S: EventSource, C: Clock> InputWatcher<S, C> {
    /// Create a watcher for input `id`.
    pub fn new(id: InputId, source: S, router: Arc<EventRouter>, queue: ActionSender, clock: C) -> Self {
        Self {
            id,
            source,
            router,
            queue,
            clock,
            read_failing: false,
        }
    }

    /// Input this watcher serves.
    pub fn id(&self) -> InputId {
        self.id
    }

    /// Poll once. Returns the action if one was enqueued.
    ///
    /// The queue may raise the timestamp so that it never runs behind one
    /// already enqueued by another watcher.
    pub fn poll(&mut self) -> Option<RoutedAction> {
        let now_ms = self.clock.now_ms();
        let event = match self.source.poll_event(now_ms) {
            Ok(event) => {
                if self.read_failing {
                    self.read_failing = false;
                    debug!(input = %self.id, "pin reads recovered");
                }
                event?
            }
            Err(e) => {
                // log once per failure streak, not every poll
                if !self.read_failing {
                    self.read_failing = true;
                    warn!(input = %self.id, error = %e, "pin read failed");
                }
                return None;
            }
        };

        debug!(input = %self.id, ?event, now_ms, "input event");
        let action = self.router.route(self.id, event)?;

        match self.queue.push(action, self.id, now_ms) {
            Ok(routed) => {
                debug!(input = %self.id, %action, seq = routed.seq, "action queued");
                Some(routed)
            }
            Err(QueueError::Full(action)) => {
                warn!(input = %self.id, %action, "action queue full, dropping action");
                None
            }
            Err(QueueError::Closed) => None,
        }
    }

    /// Poll every `interval` until `cancel` fires, then drop the source.
    pub async fn run(mut self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.poll();
                }
            }
        }
        debug!(input = %self.id, "watcher stopped");
    }
}
