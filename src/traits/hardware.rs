//! Hardware abstraction traits for pin acquisition and time.
//!
//! Individual pins are read through [`embedded_hal::digital::InputPin`]. This
//! module adds the pieces embedded-hal leaves to the platform: claiming a pin
//! with the right bias, and a millisecond clock for debounce bookkeeping.
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`GpioProvider`] | Claims input pins configured per [`PinSpec`] |
//! | [`Clock`] | Monotonic millisecond time source |
//!
//! # Implementation
//!
//! Tests use the mock implementations from [`crate::hal::mock`]. On a
//! Raspberry Pi, use `hal::rpi::RpiGpio` (requires the `rpi` feature).
//!
//! # Example
//!
//! ```rust
//! use embedded_hal::digital::InputPin;
//! use rs_gpio_mpdc::config::{PinSpec, PullMode};
//! use rs_gpio_mpdc::hal::MockGpio;
//! use rs_gpio_mpdc::traits::GpioProvider;
//!
//! let mut gpio = MockGpio::new();
//! let mut pin = gpio.claim(PinSpec::new(23, PullMode::Up).unwrap()).unwrap();
//!
//! // Internal pull-up idles high
//! assert!(pin.is_high().unwrap());
//! ```

use embedded_hal::digital::{Error as _, InputPin};

use crate::config::PinSpec;

/// Pin acquisition or read failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PinError {
    /// The pin is already owned by another input in this process.
    #[error("GPIO {0} is already claimed")]
    AlreadyClaimed(u8),

    /// The platform refused the pin (in use elsewhere, no permission, ...).
    #[error("GPIO {pin} is unavailable: {reason}")]
    Unavailable {
        /// BCM pin number.
        pin: u8,
        /// Platform error text.
        reason: String,
    },

    /// Reading the level of a claimed pin failed.
    #[error("failed to read GPIO {pin}: {reason}")]
    Read {
        /// BCM pin number.
        pin: u8,
        /// Error kind reported by the driver.
        reason: String,
    },
}

/// Source of input pins.
///
/// Implementations configure the pin's internal resistor from
/// [`PinSpec::pull`] and hand out a readable pin. Exclusivity within the
/// process is enforced by [`PinTable`](crate::pins::PinTable) on top of this;
/// providers only report pins the platform itself refuses.
pub trait GpioProvider {
    /// Pin type handed out.
    type Pin: InputPin + Send + 'static;

    /// Claim and configure a pin as an input.
    fn claim(&mut self, spec: PinSpec) -> Result<Self::Pin, PinError>;
}

/// Read the raw electrical level of `pin` (`true` = high).
pub fn read_level<P: InputPin>(pin: &mut P, number: u8) -> Result<bool, PinError> {
    pin.is_high().map_err(|e| PinError::Read {
        pin: number,
        reason: format!("{:?}", e.kind()),
    })
}

/// Time source trait.
///
/// Provides monotonic time in milliseconds for debounce timing.
///
/// # Example
///
/// ```rust
/// use rs_gpio_mpdc::traits::Clock;
/// use rs_gpio_mpdc::hal::MockClock;
///
/// let clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.advance(100);
/// assert_eq!(clock.now_ms(), 100);
/// ```
pub trait Clock {
    /// Returns current time in milliseconds since an arbitrary epoch.
    ///
    /// Must be monotonically increasing.
    fn now_ms(&self) -> u64;
}
