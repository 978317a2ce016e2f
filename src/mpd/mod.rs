//! Client for the MPD control protocol.
//!
//! [`MpdClient`] owns one connection (TCP or Unix socket) and exposes one
//! method per [`Action`](crate::Action) plus `connect` / `disconnect` /
//! `is_connected`. Connectivity failures are retried once after a
//! reconnect; server rejections are not.
//!
//! | Action | Reads | Sends |
//! |--------|-------|-------|
//! | `play_pause` | `status` | `pause 1` / `pause 0` / `play` |
//! | `play_stop` | `status` | `stop` / `play` |
//! | `prev_track` / `next_track` | | `previous` / `next` |
//! | `mute` | `outputs` | `disableoutput N` / `enableoutput N` |
//! | `vol_up` / `vol_dn` | `status` | `setvol V` |
//! | `prev_src` / `next_src` | `listplaylists` | `clear`, `load`, `play` as one command list |
//!
//! # Example
//!
//! ```rust,no_run
//! use rs_gpio_mpdc::config::ConnectionConfig;
//! use rs_gpio_mpdc::mpd::MpdClient;
//!
//! # async fn demo() -> Result<(), rs_gpio_mpdc::mpd::ClientError> {
//! let mut client = MpdClient::new(ConnectionConfig::default().with_host("music.local"));
//! client.connect().await?;
//! client.toggle_play_pause().await?;
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

mod client;
mod connection;
mod error;
pub mod protocol;

pub use client::MpdClient;
pub use error::{Ack, ClientError};
