//! # rs-gpio-mpdc
//!
//! Push-buttons and rotary encoders on a single-board computer's GPIO
//! header, turned into playback controls for an MPD server.
//!
//! ## Features
//!
//! - **Debouncing**: timestamp-based refractory period per pin, no sleeping
//! - **Quadrature decoding**: one tick per detent, noise and reversals ignored
//! - **Ordered dispatch**: all inputs feed one queue, one consumer
//! - **Resilient client**: liveness check, one reconnect and one resend per action
//! - **Hardware abstraction**: embedded-hal pins, mock backend for tests
//!
//! ## Architecture
//!
//! - `config` - Static configuration and the INI loader
//! - `commands` - The fixed action set and the routed-action envelope
//! - `debounce` - Debounced digital input
//! - `quadrature` - Rotary encoder decoding
//! - `router` - (input, event) to action mapping
//! - `queue` - The ordered action queue
//! - `pins` - Pin ownership table
//! - `mpd` - MPD protocol and resilient client
//! - `services` - Watchers, dispatch loop and the engine
//! - `hal` - Concrete implementations (mock for testing, rpi for hardware)
//!
//! ## Example
//!
//! ```rust
//! use rs_gpio_mpdc::config::parse_config_str;
//! use rs_gpio_mpdc::router::{EventRouter, InputEvent};
//! use rs_gpio_mpdc::quadrature::Rotation;
//! use rs_gpio_mpdc::{Action, InputId};
//!
//! let config = parse_config_str(
//!     "[GPIO]\nButton0 = 23,upex,press,play_pause,50\nRotEnc0 = 17,27,upex,vol_dn,vol_up,20\n",
//! )
//! .unwrap();
//!
//! let router = EventRouter::from_config(&config);
//! assert_eq!(
//!     router.route(InputId::Encoder(0), InputEvent::Encoder(Rotation::Clockwise)),
//!     Some(Action::VolumeUp)
//! );
//! ```

#![warn(missing_docs)]

/// Playback actions and input identities.
pub mod commands;
/// Static configuration and file loading.
pub mod config;
/// Debounced digital inputs.
pub mod debounce;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// MPD protocol and client.
pub mod mpd;
/// Pin ownership table.
pub mod pins;
/// Quadrature decoding for rotary encoders.
pub mod quadrature;
/// The ordered action queue.
pub mod queue;
/// Event-to-action routing.
pub mod router;
/// Watchers, dispatch loop and engine.
pub mod services;
/// Core traits for hardware abstraction and playback control.
pub mod traits;

pub use commands::{Action, InputId, RoutedAction};
pub use config::{Config, ConfigError};
pub use mpd::{ClientError, MpdClient};
pub use services::{Engine, RunError};
