//! GPIO to MPD control service for the Raspberry Pi.
//!
//! Reads the configuration file, claims the configured pins and forwards
//! button presses and encoder detents to the MPD server until SIGTERM or
//! Ctrl+C.
//!
//! # Usage
//!
//! ```bash
//! gpio-mpdc [CONFIG]
//! ```
//!
//! The configuration path is taken from the first argument, then
//! `GPIO_MPDC_CONFIG`, then `/etc/raspi-gpio-mpdc.conf`. Log output is
//! controlled with `RUST_LOG` (default `rs_gpio_mpdc=info`).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use rs_gpio_mpdc::config::load_config;
use rs_gpio_mpdc::hal::{MonotonicClock, RpiGpio};
use rs_gpio_mpdc::{Engine, MpdClient};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_CONFIG_PATH: &str = "/etc/raspi-gpio-mpdc.conf";

/// Upper bound for the connection check before the engine starts
const STARTUP_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rs_gpio_mpdc=info,gpio_mpdc=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting gpio-mpdc v{}", env!("CARGO_PKG_VERSION"));

    let path = config_path();
    let config = load_config(&path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        buttons = config.buttons.len(),
        encoders = config.encoders.len(),
        "configuration loaded"
    );

    let mut gpio = RpiGpio::new().context("failed to open GPIO")?;

    let mut client = MpdClient::new(config.connection());
    if let Err(e) = client.connect_within(STARTUP_CONNECT_TIMEOUT).await {
        tracing::warn!(error = %e, "MPD not reachable yet, will connect on first action");
    }
    let engine = Engine::new(config);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            cancel.cancel();
        }
    });

    let (_client, stats) = engine
        .run(&mut gpio, client, MonotonicClock::new(), cancel)
        .await?;

    tracing::info!(
        performed = stats.performed,
        failed = stats.failed,
        "Shutdown complete"
    );
    Ok(())
}

fn config_path() -> PathBuf {
    std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os("GPIO_MPDC_CONFIG"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
