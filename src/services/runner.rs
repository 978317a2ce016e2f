//! Engine wiring and ordered shutdown.
//!
//! # Startup
//!
//! 1. Validate the configuration
//! 2. Claim every pin (all or nothing)
//! 3. Build the router and the action queue
//! 4. Spawn one watcher per input
//! 5. Run the dispatch loop
//!
//! Steps 1 and 2 are the only fatal failures, and both happen before any
//! watcher starts.
//!
//! # Shutdown
//!
//! When the cancellation token fires the dispatch loop stops taking actions,
//! every watcher stops and drops its pins, and only then is the control
//! client shut down.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::dispatch::{DispatchStats, Dispatcher};
use super::watcher::InputWatcher;
use crate::commands::InputId;
use crate::config::{Config, ConfigError};
use crate::debounce::DebouncedInput;
use crate::pins::{PinHandle, PinTable};
use crate::quadrature::RotaryEncoder;
use crate::queue::action_queue;
use crate::router::EventRouter;
use crate::traits::{Clock, GpioProvider, PinError, PlaybackControl};

/// Fatal startup failure.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// A pin could not be claimed.
    #[error("pin error: {0}")]
    Pin(#[from] PinError),
}

type Button<P> = DebouncedInput<PinHandle<P>>;
type Encoder<P> = RotaryEncoder<PinHandle<P>, PinHandle<P>>;

/// The configured engine.
pub struct Engine {
    config: Config,
    pins: PinTable,
}

impl Engine {
    /// Create an engine for `config`. Nothing is claimed until [`run`](Self::run).
    pub fn new(config: Config) -> Self {
        Self {
            config,
            pins: PinTable::new(),
        }
    }

    /// The configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// A view of the pin table (shared with the engine).
    pub fn pins(&self) -> PinTable {
        self.pins.clone()
    }

    /// Run until `cancel` fires. Returns the control client after it has
    /// been shut down, with the dispatch counters.
    pub async fn run<G, C, K>(
        &self,
        gpio: &mut G,
        control: C,
        clock: K,
        cancel: CancellationToken,
    ) -> Result<(C, DispatchStats), RunError>
    where
        G: GpioProvider,
        C: PlaybackControl,
        K: Clock + Clone + Send + 'static,
    {
        self.config.validate()?;
        let (buttons, encoders) = self.claim_inputs(gpio)?;

        let router = Arc::new(EventRouter::from_config(&self.config));
        let (queue, receiver) = action_queue(self.config.queue_capacity);
        let interval = Duration::from_millis(u64::from(self.config.poll_interval_ms.max(1)));

        let mut watchers = JoinSet::new();
        for (n, input) in buttons {
            let watcher =
                InputWatcher::new(InputId::Button(n), input, Arc::clone(&router), queue.clone(), clock.clone());
            watchers.spawn(watcher.run(interval, cancel.clone()));
        }
        for (n, encoder) in encoders {
            let watcher =
                InputWatcher::new(InputId::Encoder(n), encoder, Arc::clone(&router), queue.clone(), clock.clone());
            watchers.spawn(watcher.run(interval, cancel.clone()));
        }
        drop(queue);

        info!(
            buttons = self.config.buttons.len(),
            encoders = self.config.encoders.len(),
            pins = ?self.pins.claimed(),
            "engine started"
        );

        let (mut control, stats) = Dispatcher::new(control).run(receiver, cancel.clone()).await;

        // dispatch only ends early if every watcher is gone
        cancel.cancel();
        while let Some(joined) = watchers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "watcher task failed");
            }
        }
        info!(claimed = ?self.pins.claimed(), "watchers stopped, pins released");

        control.shutdown().await;
        info!("engine stopped");
        Ok((control, stats))
    }

    #[allow(clippy::type_complexity)]
    fn claim_inputs<G: GpioProvider>(
        &self,
        gpio: &mut G,
    ) -> Result<(Vec<(u32, Button<G::Pin>)>, Vec<(u32, Encoder<G::Pin>)>), PinError> {
        let mut buttons = Vec::with_capacity(self.config.buttons.len());
        for b in &self.config.buttons {
            let handle = self.pins.claim(gpio, b.pin)?;
            buttons.push((b.id, DebouncedInput::new(handle, b.pin, b.debounce_ms)?));
        }

        let mut encoders = Vec::with_capacity(self.config.encoders.len());
        for e in &self.config.encoders {
            let a = self.pins.claim(gpio, e.pin_a)?;
            let b = self.pins.claim(gpio, e.pin_b)?;
            let a = DebouncedInput::new(a, e.pin_a, e.debounce_ms)?;
            let b = DebouncedInput::new(b, e.pin_b, e.debounce_ms)?;
            encoders.push((e.id, RotaryEncoder::new(a, b)));
        }
        Ok((buttons, encoders))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Action;
    use crate::config::{ButtonConfig, PinSpec, PullMode, TriggerEdge};
    use crate::hal::{MockClock, MockControl, MockGpio};

    fn button(id: u32, pin: u32) -> ButtonConfig {
        ButtonConfig::new(
            id,
            PinSpec::new(pin, PullMode::Up).unwrap(),
            TriggerEdge::Activate,
            Action::NextTrack,
        )
    }

    #[tokio::test]
    async fn invalid_config_fails_before_claiming() {
        let config = Config::default().with_button(button(0, 5)).with_button(button(1, 5));
        let engine = Engine::new(config);
        let mut gpio = MockGpio::new();

        let result = engine
            .run(&mut gpio, MockControl::new(), MockClock::new(), CancellationToken::new())
            .await;
        assert!(matches!(result, Err(RunError::Config(ConfigError::DuplicatePin { .. }))));
        assert_eq!(gpio.claim_count(5), 0);
    }

    #[tokio::test]
    async fn unavailable_pin_is_fatal_and_releases_earlier_claims() {
        let config = Config::default().with_button(button(0, 5)).with_button(button(1, 6));
        let engine = Engine::new(config);
        let mut gpio = MockGpio::new().with_unavailable(6);
        let control = MockControl::new();

        let result = engine
            .run(&mut gpio, control.clone(), MockClock::new(), CancellationToken::new())
            .await;
        assert!(matches!(result, Err(RunError::Pin(PinError::Unavailable { pin: 6, .. }))));
        assert!(engine.pins().claimed().is_empty());
        assert_eq!(control.shutdown_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_engine_releases_pins_then_shuts_down_control() {
        let config = Config::default().with_button(button(0, 5));
        let engine = Engine::new(config);
        let pins = engine.pins();
        let mut gpio = MockGpio::new();
        let control = MockControl::new();
        let cancel = CancellationToken::new();

        let stopper = {
            let cancel = cancel.clone();
            let pins = pins.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                let claimed = pins.claimed();
                cancel.cancel();
                claimed
            })
        };

        let (returned, stats) = engine
            .run(&mut gpio, control.clone(), MockClock::new(), cancel)
            .await
            .unwrap();

        assert_eq!(stopper.await.unwrap(), vec![5]);
        assert!(pins.claimed().is_empty());
        assert_eq!(returned.shutdown_count(), 1);
        assert_eq!(stats, DispatchStats::default());
    }
}
