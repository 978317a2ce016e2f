//! Process-wide pin ownership.
//!
//! Every configured pin is claimed exactly once through the [`PinTable`].
//! The returned [`PinHandle`] is the only way to read the pin; dropping it
//! releases the claim, so a watcher that has finished has also given its pins
//! back.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use embedded_hal::digital::{ErrorType, InputPin};
use tracing::debug;

use crate::config::PinSpec;
use crate::traits::{GpioProvider, PinError};

type Claims = Arc<Mutex<BTreeSet<u8>>>;

/// Table of claimed pin numbers.
///
/// ```
/// use rs_gpio_mpdc::config::{PinSpec, PullMode};
/// use rs_gpio_mpdc::hal::MockGpio;
/// use rs_gpio_mpdc::pins::PinTable;
/// use rs_gpio_mpdc::traits::PinError;
///
/// let table = PinTable::new();
/// let mut gpio = MockGpio::new();
/// let spec = PinSpec::new(23, PullMode::Up).unwrap();
///
/// let handle = table.claim(&mut gpio, spec).unwrap();
/// assert!(matches!(table.claim(&mut gpio, spec), Err(PinError::AlreadyClaimed(23))));
///
/// drop(handle);
/// assert!(table.claimed().is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct PinTable {
    claims: Claims,
}

impl PinTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `spec` through `gpio`.
    ///
    /// Fails if the pin is already held in this table or the provider
    /// refuses it. A refused pin is not left marked as claimed.
    pub fn claim<G: GpioProvider>(
        &self,
        gpio: &mut G,
        spec: PinSpec,
    ) -> Result<PinHandle<G::Pin>, PinError> {
        let number = spec.number();
        if !self.lock().insert(number) {
            return Err(PinError::AlreadyClaimed(number));
        }

        match gpio.claim(spec) {
            Ok(pin) => {
                debug!(pin = number, pull = spec.pull().as_str(), "pin claimed");
                Ok(PinHandle {
                    pin,
                    spec,
                    claims: Arc::clone(&self.claims),
                })
            }
            Err(e) => {
                self.lock().remove(&number);
                Err(e)
            }
        }
    }

    /// Currently claimed pin numbers, ascending.
    pub fn claimed(&self) -> Vec<u8> {
        self.lock().iter().copied().collect()
    }

    /// True if `number` is currently claimed.
    pub fn is_claimed(&self, number: u8) -> bool {
        self.lock().contains(&number)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeSet<u8>> {
        self.claims.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive handle to a claimed pin. Releases the claim on drop.
#[derive(Debug)]
pub struct PinHandle<P> {
    pin: P,
    spec: PinSpec,
    claims: Claims,
}

impl<P> PinHandle<P> {
    /// The pin's configuration.
    pub fn spec(&self) -> PinSpec {
        self.spec
    }
}

impl<P> Drop for PinHandle<P> {
    fn drop(&mut self) {
        let number = self.spec.number();
        self.claims
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&number);
        debug!(pin = number, "pin released");
    }
}

impl<P: ErrorType> ErrorType for PinHandle<P> {
    type Error = P::Error;
}

impl<P: InputPin> InputPin for PinHandle<P> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.pin.is_high()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.pin.is_low()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PullMode;
    use crate::hal::MockGpio;

    fn spec(n: u32) -> PinSpec {
        PinSpec::new(n, PullMode::Down).unwrap()
    }

    #[test]
    fn claims_are_exclusive_until_dropped() {
        let table = PinTable::new();
        let mut gpio = MockGpio::new();

        let a = table.claim(&mut gpio, spec(5)).unwrap();
        let b = table.claim(&mut gpio, spec(6)).unwrap();
        assert_eq!(table.claimed(), vec![5, 6]);
        assert!(matches!(
            table.claim(&mut gpio, spec(5)),
            Err(PinError::AlreadyClaimed(5))
        ));

        drop(a);
        assert!(!table.is_claimed(5));
        assert!(table.is_claimed(6));
        assert_eq!(b.spec().number(), 6);

        drop(b);
        assert!(table.claimed().is_empty());
    }

    #[test]
    fn refused_pin_is_not_left_claimed() {
        let table = PinTable::new();
        let mut gpio = MockGpio::new().with_unavailable(12);

        assert!(matches!(
            table.claim(&mut gpio, spec(12)),
            Err(PinError::Unavailable { pin: 12, .. })
        ));
        assert!(!table.is_claimed(12));
    }

    #[test]
    fn handle_reads_through_to_pin() {
        let table = PinTable::new();
        let mut gpio = MockGpio::new();
        let mut handle = table.claim(&mut gpio, spec(7)).unwrap();

        // pull-down idles low
        assert!(handle.is_low().unwrap());
        gpio.pin(7).unwrap().set_high(true);
        assert!(handle.is_high().unwrap());
    }

    #[test]
    fn clones_share_the_table() {
        let table = PinTable::new();
        let view = table.clone();
        let mut gpio = MockGpio::new();
        let _h = table.claim(&mut gpio, spec(3)).unwrap();
        assert!(view.is_claimed(3));
    }
}
