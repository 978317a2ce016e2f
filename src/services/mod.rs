//! Long-running services: input watchers, the dispatch loop and the engine
//! that wires them together.
//!
//! ```text
//!  InputWatcher (Button0) ─┐
//!  InputWatcher (Button1) ─┼─> ActionQueue ──> Dispatcher ──> PlaybackControl
//!  InputWatcher (RotEnc0) ─┘
//! ```
//!
//! Watchers run as independent tasks and only share the queue sender. The
//! dispatcher is the single consumer and the exclusive owner of the control
//! client, so server commands go out in queue order.
//!
//! # Example
//!
//! ```rust
//! use rs_gpio_mpdc::config::{ButtonConfig, Config, PinSpec, PullMode, TriggerEdge};
//! use rs_gpio_mpdc::hal::{MockControl, MockGpio, MonotonicClock};
//! use rs_gpio_mpdc::services::Engine;
//! use rs_gpio_mpdc::Action;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let config = Config::default().with_button(ButtonConfig::new(
//!     0,
//!     PinSpec::new(23, PullMode::Up).unwrap(),
//!     TriggerEdge::Activate,
//!     Action::TogglePlayPause,
//! ));
//!
//! let engine = Engine::new(config);
//! let cancel = CancellationToken::new();
//! cancel.cancel(); // stop straight away for the example
//!
//! let (control, _stats) = engine
//!     .run(&mut MockGpio::new(), MockControl::new(), MonotonicClock::new(), cancel)
//!     .await
//!     .unwrap();
//! assert_eq!(control.shutdown_count(), 1);
//! # }
//! ```

pub mod dispatch;
pub mod runner;
pub mod watcher;

pub use dispatch::{DispatchStats, Dispatcher};
pub use runner::{Engine, RunError};
pub use watcher::{EventSource, InputWatcher};
