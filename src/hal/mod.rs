//! Hardware Abstraction Layer implementations.
//!
//! This module contains concrete implementations of the traits
//! defined in [`crate::traits`] for various platforms.
//!
//! # Available Implementations
//!
//! - `mock`: Test implementations for desktop development
//! - `rpi`: Raspberry Pi GPIO through `rppal` (requires `rpi` feature)
//! - [`MonotonicClock`]: the runtime clock used by the service

pub mod mock;

#[cfg(feature = "rpi")]
pub mod rpi;

pub use mock::*;

#[cfg(feature = "rpi")]
pub use rpi::*;

use tokio::time::Instant;

use crate::traits::Clock;

/// Milliseconds since construction, on tokio's clock.
///
/// Follows tokio's paused time in tests, so watchers driven by
/// `tokio::time::interval` see consistent timestamps.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    /// Start counting from now.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}
