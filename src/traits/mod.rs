//! Trait definitions for hardware abstraction and playback control.
//!
//! # Submodules
//!
//! - `hardware`: Pin acquisition, pin reads, clock
//! - `control`: The playback-control seam used by the dispatch loop
//!
//! Pins themselves are `embedded_hal::digital::InputPin`s, so any
//! embedded-hal 1.0 driver can be plugged in behind a [`GpioProvider`].

pub mod control;
pub mod hardware;

pub use control::*;
pub use hardware::*;
