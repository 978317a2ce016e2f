//! Timestamp-based debouncing of a single digital input.
//!
//! A raw edge is accepted only if at least `interval` milliseconds have
//! passed since the last *accepted* edge. Nothing ever sleeps: the
//! refractory period is a timestamp comparison, so one watcher can service
//! many pins without blocking.
//!
//! ```text
//!  raw:      ‾‾‾|_|‾|___________|‾‾‾‾‾‾‾‾‾‾‾
//!  t (ms):      0 3 5           80
//!  accepted:    ^               ^
//!  emitted:     Activated       Released      (active-low input)
//! ```
//!
//! Levels are normalized on the way out: pull-up wiring is active-low,
//! pull-down wiring active-high, and callers only ever see
//! [`Transition::Activated`] / [`Transition::Released`].

use embedded_hal::digital::InputPin;
use tracing::trace;

use crate::config::PinSpec;
use crate::traits::{read_level, PinError};

/// Normalized logical transition of an input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Transition {
    /// The input became active (button pressed, encoder contact closed).
    Activated,
    /// The input became inactive.
    Released,
}

impl Transition {
    /// Transition into the given normalized level.
    #[inline]
    pub const fn into_level(active: bool) -> Self {
        if active {
            Transition::Activated
        } else {
            Transition::Released
        }
    }

    /// True for [`Transition::Activated`].
    #[inline]
    pub const fn is_active(&self) -> bool {
        matches!(self, Transition::Activated)
    }
}

// ============================================================================
// Debouncer
// ============================================================================

/// Refractory-period filter for edge timestamps.
///
/// Two states: idle (no accepted edge yet, or the interval has elapsed) and
/// refractory. The first edge is always accepted.
///
/// ```
/// use rs_gpio_mpdc::debounce::Debouncer;
///
/// let mut d = Debouncer::new(50);
/// assert!(d.accept(1000));
/// assert!(!d.accept(1010));   // bounce
/// assert!(!d.accept(1049));
/// assert!(d.accept(1050));
/// ```
#[derive(Clone, Debug)]
pub struct Debouncer {
    interval_ms: u64,
    last_accepted_ms: Option<u64>,
}

impl Debouncer {
    /// Create a debouncer with the given interval.
    pub fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms: u64::from(interval_ms),
            last_accepted_ms: None,
        }
    }

    /// Offer an edge observed at `now_ms`. Returns true if it is accepted.
    pub fn accept(&mut self, now_ms: u64) -> bool {
        if self.is_refractory(now_ms) {
            return false;
        }
        self.last_accepted_ms = Some(now_ms);
        true
    }

    /// True while edges at `now_ms` would be discarded.
    pub fn is_refractory(&self, now_ms: u64) -> bool {
        match self.last_accepted_ms {
            Some(last) => now_ms.saturating_sub(last) < self.interval_ms,
            None => false,
        }
    }

    /// Timestamp of the last accepted edge.
    pub fn last_accepted_ms(&self) -> Option<u64> {
        self.last_accepted_ms
    }

    /// Configured interval.
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }
}

// ============================================================================
// Debounced Input
// ============================================================================

/// A pin wrapped with polarity normalization and debouncing.
///
/// Raw edges are found by sampling: every [`poll`](Self::poll) reads the
/// level and compares it with the previous sample. Each accepted edge emits
/// the normalized level it changed *to*, so a discarded release followed by
/// an accepted press yields two `Activated` transitions in a row.
pub struct DebouncedInput<P> {
    pin: P,
    number: u8,
    active_low: bool,
    debouncer: Debouncer,
    last_raw: bool,
    active: bool,
}

impl<P: InputPin> DebouncedInput<P> {
    /// Wrap `pin`, sampling its current level as the starting state.
    pub fn new(mut pin: P, spec: PinSpec, interval_ms: u32) -> Result<Self, PinError> {
        let raw = read_level(&mut pin, spec.number())?;
        let active_low = spec.pull().active_low();
        Ok(Self {
            pin,
            number: spec.number(),
            active_low,
            debouncer: Debouncer::new(interval_ms),
            last_raw: raw,
            active: raw != active_low,
        })
    }

    /// Sample the pin and return a transition if an edge was accepted.
    pub fn poll(&mut self, now_ms: u64) -> Result<Option<Transition>, PinError> {
        let raw = read_level(&mut self.pin, self.number)?;
        Ok(self.on_level(raw, now_ms))
    }

    /// Feed a raw level observed at `now_ms`.
    ///
    /// Returns `None` when the level did not change or the edge fell inside
    /// the refractory period.
    pub fn on_level(&mut self, raw_high: bool, now_ms: u64) -> Option<Transition> {
        if raw_high == self.last_raw {
            return None;
        }
        self.last_raw = raw_high;

        if !self.debouncer.accept(now_ms) {
            trace!(pin = self.number, now_ms, "edge discarded");
            return None;
        }

        self.active = raw_high != self.active_low;
        Some(Transition::into_level(self.active))
    }

    /// Normalized level of the last accepted edge (or the initial sample).
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// BCM pin number.
    #[inline]
    pub fn pin_number(&self) -> u8 {
        self.number
    }

    /// The debouncer, for inspection.
    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    /// Give back the wrapped pin.
    pub fn into_inner(self) -> P {
        self.pin
    }
}

// ============================================================================
// Tests
// ============================================================================
