//! Raspberry Pi GPIO backend.
//!
//! Pins are opened through `rppal` with the bias requested by their
//! [`PullMode`](crate::config::PullMode): internal pull-up for `up`,
//! internal pull-down for `dn`, and no internal resistor for `upex`/`dnex`.
//! `rppal` resets each pin to its previous mode when the pin is dropped.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin};
use rppal::gpio::Gpio;

use crate::config::{Bias, PinSpec};
use crate::traits::{GpioProvider, PinError};

/// The SoC's GPIO bank.
pub struct RpiGpio {
    gpio: Gpio,
}

impl RpiGpio {
    /// Open `/dev/gpiomem`.
    pub fn new() -> Result<Self, PinError> {
        let gpio = Gpio::new().map_err(|e| PinError::Unavailable {
            pin: 0,
            reason: format!("cannot open GPIO: {}", e),
        })?;
        Ok(Self { gpio })
    }
}

impl GpioProvider for RpiGpio {
    type Pin = RpiInputPin;

    fn claim(&mut self, spec: PinSpec) -> Result<RpiInputPin, PinError> {
        let number = spec.number();
        let pin = self.gpio.get(number).map_err(|e| PinError::Unavailable {
            pin: number,
            reason: e.to_string(),
        })?;

        let input = match spec.pull().bias() {
            Bias::PullUp => pin.into_input_pullup(),
            Bias::PullDown => pin.into_input_pulldown(),
            Bias::Floating => pin.into_input(),
        };
        Ok(RpiInputPin { pin: input })
    }
}

/// An `rppal` input pin exposed through embedded-hal.
pub struct RpiInputPin {
    pin: rppal::gpio::InputPin,
}

impl ErrorType for RpiInputPin {
    type Error = Infallible;
}

impl InputPin for RpiInputPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.pin.is_high())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(self.pin.is_low())
    }
}
