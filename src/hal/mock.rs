//! Mock implementations for testing without hardware.
//!
//! All mocks are cheap to clone and clones share state, so a test can keep
//! one copy while the engine owns another.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockPin`] | [`InputPin`] | Level set from the test |
//! | [`MockGpio`] | [`GpioProvider`] | Hands out [`MockPin`]s, can refuse pins |
//! | [`MockClock`] | [`Clock`] | Controllable time source |
//! | [`MockControl`] | [`PlaybackControl`] | Records actions, injects failures |
//!
//! # Example
//!
//! ```rust
//! use rs_gpio_mpdc::config::{PinSpec, PullMode};
//! use rs_gpio_mpdc::debounce::{DebouncedInput, Transition};
//! use rs_gpio_mpdc::hal::{MockClock, MockGpio};
//! use rs_gpio_mpdc::traits::{Clock, GpioProvider};
//!
//! let mut gpio = MockGpio::new();
//! let clock = MockClock::new();
//! let spec = PinSpec::new(23, PullMode::Up).unwrap();
//!
//! let mut button = DebouncedInput::new(gpio.claim(spec).unwrap(), spec, 50).unwrap();
//!
//! // press: pull-up input goes low
//! gpio.pin(23).unwrap().set_high(false);
//! clock.advance(5);
//! assert_eq!(button.poll(clock.now_ms()).unwrap(), Some(Transition::Activated));
//! ```
//!
//! [`InputPin`]: embedded_hal::digital::InputPin

use core::convert::Infallible;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use embedded_hal::digital::{ErrorType, InputPin};

use crate::commands::Action;
use crate::config::PinSpec;
use crate::traits::{Clock, GpioProvider, PinError, PlaybackControl};

// ============================================================================
// Pins
// ============================================================================

/// An input pin whose level is set by the test.
#[derive(Clone, Debug)]
pub struct MockPin {
    level: Arc<AtomicBool>,
}

impl MockPin {
    /// Create a pin at the given level (`true` = high).
    pub fn new(high: bool) -> Self {
        Self {
            level: Arc::new(AtomicBool::new(high)),
        }
    }

    /// Drive the pin level.
    pub fn set_high(&self, high: bool) {
        self.level.store(high, Ordering::SeqCst);
    }

    /// Current level.
    pub fn level(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl InputPin for MockPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.level())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.level())
    }
}

#[derive(Debug, Default)]
struct GpioState {
    pins: HashMap<u8, MockPin>,
    unavailable: HashSet<u8>,
    claim_counts: HashMap<u8, usize>,
}

/// A GPIO bank of [`MockPin`]s.
///
/// A claimed pin starts at the idle level of its pull mode (high for
/// pull-up, low for pull-down) and keeps its level across re-claims.
#[derive(Clone, Debug, Default)]
pub struct MockGpio {
    state: Arc<Mutex<GpioState>>,
}

impl MockGpio {
    /// Create a bank where every pin is available.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `pin` refuse to be claimed, as if another process held it.
    pub fn with_unavailable(self, pin: u8) -> Self {
        self.lock().unavailable.insert(pin);
        self
    }

    /// The pin handed out for `number`, once it has been claimed.
    pub fn pin(&self, number: u8) -> Option<MockPin> {
        self.lock().pins.get(&number).cloned()
    }

    /// How many times `number` has been claimed.
    pub fn claim_count(&self, number: u8) -> usize {
        self.lock().claim_counts.get(&number).copied().unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GpioState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl GpioProvider for MockGpio {
    type Pin = MockPin;

    fn claim(&mut self, spec: PinSpec) -> Result<MockPin, PinError> {
        let mut state = self.lock();
        let number = spec.number();
        if state.unavailable.contains(&number) {
            return Err(PinError::Unavailable {
                pin: number,
                reason: "held by another process".into(),
            });
        }
        *state.claim_counts.entry(number).or_insert(0) += 1;
        let pin = state
            .pins
            .entry(number)
            .or_insert_with(|| MockPin::new(spec.pull().active_low()))
            .clone();
        Ok(pin)
    }
}

// ============================================================================
// Clock
// ============================================================================

/// Mock clock for testing time-dependent behavior.
#[derive(Clone, Debug, Default)]
pub struct MockClock {
    now_ms: Arc<AtomicU64>,
}

impl MockClock {
    /// Create a clock at 0 ms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current time.
    pub fn set(&self, ms: u64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }

    /// Advance time by `ms`.
    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Playback Control
// ============================================================================

/// Failure injected into [`MockControl`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("injected failure for {0}")]
pub struct MockControlError(pub Action);

#[derive(Debug, Default)]
struct ControlState {
    attempts: Vec<Action>,
    performed: Vec<Action>,
    fail_next: usize,
    failing: HashSet<Action>,
    shutdowns: usize,
}

/// Records every action it is asked to perform.
#[derive(Clone, Debug, Default)]
pub struct MockControl {
    state: Arc<Mutex<ControlState>>,
}

impl MockControl {
    /// Create a control that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` actions.
    pub fn fail_next(&self, n: usize) {
        self.lock().fail_next = n;
    }

    /// Always fail `action`.
    pub fn fail_action(&self, action: Action) {
        self.lock().failing.insert(action);
    }

    /// Actions that succeeded, in order.
    pub fn performed(&self) -> Vec<Action> {
        self.lock().performed.clone()
    }

    /// Every action attempted, including failures.
    pub fn attempts(&self) -> Vec<Action> {
        self.lock().attempts.clone()
    }

    /// Number of `shutdown` calls.
    pub fn shutdown_count(&self) -> usize {
        self.lock().shutdowns
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ControlState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl PlaybackControl for MockControl {
    type Error = MockControlError;

    async fn perform(&mut self, action: Action) -> Result<(), MockControlError> {
        let mut state = self.lock();
        state.attempts.push(action);
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(MockControlError(action));
        }
        if state.failing.contains(&action) {
            return Err(MockControlError(action));
        }
        state.performed.push(action);
        Ok(())
    }

    async fn shutdown(&mut self) {
        self.lock().shutdowns += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PullMode;

    #[test]
    fn mock_pin_levels() {
        let mut pin = MockPin::new(true);
        assert!(pin.is_high().unwrap());
        pin.set_high(false);
        assert!(pin.is_low().unwrap());
    }

    #[test]
    fn mock_gpio_idle_levels_follow_pull() {
        let mut gpio = MockGpio::new();
        let up = gpio.claim(PinSpec::new(1, PullMode::ExternalUp).unwrap()).unwrap();
        let down = gpio.claim(PinSpec::new(2, PullMode::Down).unwrap()).unwrap();
        assert!(up.level());
        assert!(!down.level());
        assert_eq!(gpio.claim_count(1), 1);
        assert_eq!(gpio.claim_count(3), 0);
    }

    #[test]
    fn mock_gpio_refuses_unavailable() {
        let mut gpio = MockGpio::new().with_unavailable(4);
        assert!(gpio.claim(PinSpec::new(4, PullMode::Up).unwrap()).is_err());
        assert!(gpio.pin(4).is_none());
    }

    #[test]
    fn mock_clock() {
        let clock = MockClock::new();
        let view = clock.clone();
        clock.advance(30);
        clock.advance(20);
        assert_eq!(view.now_ms(), 50);
        clock.set(5);
        assert_eq!(view.now_ms(), 5);
    }

    #[tokio::test]
    async fn mock_control_records_and_fails() {
        let mut control = MockControl::new();
        let view = control.clone();

        control.fail_next(1);
        control.fail_action(Action::ToggleMute);

        assert!(control.perform(Action::NextTrack).await.is_err());
        assert!(control.perform(Action::NextTrack).await.is_ok());
        assert!(control.perform(Action::ToggleMute).await.is_err());
        control.shutdown().await;

        assert_eq!(view.performed(), vec![Action::NextTrack]);
        assert_eq!(view.attempts().len(), 3);
        assert_eq!(view.shutdown_count(), 1);
    }
}
