use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::connection::Connection;
use super::error::ClientError;
use super::protocol::{command, PlayState, Response};
use crate::commands::Action;
use crate::config::ConnectionConfig;
use crate::traits::PlaybackControl;

/// Resilient client for one MPD server.
///
/// Holds at most one connection, opened lazily by the first action (or
/// eagerly with [`connect`](Self::connect)). Every action first pings the
/// connection; a dead or missing connection is replaced before the action
/// runs, and a connectivity failure during the action triggers one reconnect
/// and one resend. No invocation ever makes more than one reconnect attempt.
///
/// Toggles read the server state on every call. The only thing remembered
/// between calls is the name of the playlist last loaded by a source action.
pub struct MpdClient {
    config: ConnectionConfig,
    conn: Option<Connection>,
    current_source: Option<String>,
}

impl MpdClient {
    /// Create a disconnected client.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            conn: None,
            current_source: None,
        }
    }

    /// Connection settings.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// True while a connection is held. Says nothing about whether the
    /// server is still there; that is checked on the next action.
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Playlist loaded by the last source action, if any.
    pub fn current_source(&self) -> Option<&str> {
        self.current_source.as_deref()
    }

    /// Open a connection unless one is already held.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        if self.conn.is_some() {
            return Ok(());
        }
        let conn = Connection::open(&self.config).await?;
        info!(
            endpoint = %self.config.endpoint(),
            version = conn.version(),
            "connected to MPD"
        );
        self.conn = Some(conn);
        Ok(())
    }

    /// Connect, giving up after `limit` even when the configured connect
    /// timeout is longer. Used for the non-fatal startup check.
    pub async fn connect_within(&mut self, limit: Duration) -> Result<(), ClientError> {
        let limit = limit.min(self.config.connect_timeout);
        let result = timeout(limit, self.connect()).await;
        match result {
            Ok(connected) => connected,
            Err(_) => Err(ClientError::ConnectTimeout {
                endpoint: self.config.endpoint().to_string(),
                timeout: limit,
            }),
        }
    }

    /// Close the connection politely, if one is held.
    pub async fn disconnect(&mut self) {
        if let Some(conn) = self.conn.take() {
            conn.close().await;
            info!(endpoint = %self.config.endpoint(), "disconnected from MPD");
        }
    }

    /// Drop a connection that is known to be broken.
    fn mark_disconnected(&mut self) {
        if self.conn.take().is_some() {
            warn!(endpoint = %self.config.endpoint(), "MPD connection lost");
        }
    }

    /// Make sure a live connection is held. Returns true if a new connection
    /// had to be opened.
    async fn ensure_live(&mut self) -> Result<bool, ClientError> {
        if let Some(conn) = self.conn.as_mut() {
            match conn.execute("ping").await {
                Ok(_) => return Ok(false),
                Err(e) => {
                    debug!(error = %e, "liveness check failed");
                    self.mark_disconnected();
                }
            }
        }
        self.connect().await?;
        Ok(true)
    }

    /// Perform `action`, reconnecting and resending at most once.
    pub async fn execute(&mut self, action: Action) -> Result<(), ClientError> {
        let mut reconnected = self.ensure_live().await?;

        loop {
            let conn = self.conn.as_mut().ok_or(ClientError::NotConnected)?;
            let result = apply(conn, action, &self.config, &mut self.current_source).await;
            match result {
                Ok(()) => {
                    debug!(%action, "action performed");
                    return Ok(());
                }
                Err(e) if e.is_transient() && !reconnected => {
                    warn!(%action, error = %e, "action failed, reconnecting");
                    self.mark_disconnected();
                    self.connect().await?;
                    reconnected = true;
                }
                Err(e) => {
                    if e.is_transient() {
                        self.mark_disconnected();
                    }
                    return Err(e);
                }
            }
        }
    }

    // =========================================================================
    // One method per action
    // =========================================================================

    /// Pause when playing, resume when paused, start when stopped.
    pub async fn toggle_play_pause(&mut self) -> Result<(), ClientError> {
        self.execute(Action::TogglePlayPause).await
    }

    /// Stop when playing, otherwise start.
    pub async fn toggle_play_stop(&mut self) -> Result<(), ClientError> {
        self.execute(Action::TogglePlayStop).await
    }

    /// Previous track.
    pub async fn previous_track(&mut self) -> Result<(), ClientError> {
        self.execute(Action::PreviousTrack).await
    }

    /// Next track.
    pub async fn next_track(&mut self) -> Result<(), ClientError> {
        self.execute(Action::NextTrack).await
    }

    /// Flip the configured mute output.
    pub async fn toggle_mute(&mut self) -> Result<(), ClientError> {
        self.execute(Action::ToggleMute).await
    }

    /// Volume up one step.
    pub async fn volume_up(&mut self) -> Result<(), ClientError> {
        self.execute(Action::VolumeUp).await
    }

    /// Volume down one step.
    pub async fn volume_down(&mut self) -> Result<(), ClientError> {
        self.execute(Action::VolumeDown).await
    }

    /// Load the previous stored playlist and play it.
    pub async fn previous_source(&mut self) -> Result<(), ClientError> {
        self.execute(Action::PreviousSource).await
    }

    /// Load the next stored playlist and play it.
    pub async fn next_source(&mut self) -> Result<(), ClientError> {
        self.execute(Action::NextSource).await
    }
}

impl PlaybackControl for MpdClient {
    type Error = ClientError;

    async fn perform(&mut self, action: Action) -> Result<(), ClientError> {
        self.execute(action).await
    }

    async fn shutdown(&mut self) {
        self.disconnect().await;
    }
}

// ============================================================================
// Action -> commands
// ============================================================================

async fn apply(
    conn: &mut Connection,
    action: Action,
    config: &ConnectionConfig,
    current_source: &mut Option<String>,
) -> Result<(), ClientError> {
    match action {
        Action::TogglePlayPause => {
            let status = conn.execute("status").await?;
            let line = match PlayState::from_status(&status)? {
                PlayState::Play => command("pause", &["1"]),
                PlayState::Pause => command("pause", &["0"]),
                PlayState::Stop => command("play", &[]),
            };
            conn.execute(&line).await?;
        }
        Action::TogglePlayStop => {
            let status = conn.execute("status").await?;
            let line = match PlayState::from_status(&status)? {
                PlayState::Play => "stop",
                PlayState::Pause | PlayState::Stop => "play",
            };
            conn.execute(line).await?;
        }
        Action::PreviousTrack => {
            conn.execute("previous").await?;
        }
        Action::NextTrack => {
            conn.execute("next").await?;
        }
        Action::ToggleMute => {
            let outputs = conn.execute("outputs").await?;
            let id = config.mute_output.to_string();
            let enabled = output_enabled(&outputs, &id).ok_or_else(|| ClientError::Unsupported {
                action,
                reason: format!("no output with id {}", id),
            })?;
            let name = if enabled { "disableoutput" } else { "enableoutput" };
            conn.execute(&command(name, &[id.as_str()])).await?;
        }
        Action::VolumeUp | Action::VolumeDown => {
            let status = conn.execute("status").await?;
            let current = volume(&status, action)?;
            let step = i32::from(config.volume_step);
            let target = if action == Action::VolumeUp {
                current + step
            } else {
                current - step
            }
            .clamp(0, 100);

            if target == current {
                debug!(volume = current, "volume already at limit");
            } else {
                let target = target.to_string();
                conn.execute(&command("setvol", &[target.as_str()])).await?;
            }
        }
        Action::PreviousSource | Action::NextSource => {
            let listing = conn.execute("listplaylists").await?;
            let playlists: Vec<&str> = listing.get_all("playlist").collect();
            let name = pick_source(&playlists, current_source.as_deref(), action == Action::NextSource)
                .ok_or_else(|| ClientError::Unsupported {
                    action,
                    reason: "no stored playlists".into(),
                })?
                .to_string();

            let batch = [
                command("clear", &[]),
                command("load", &[name.as_str()]),
                command("play", &[]),
            ];
            conn.execute_list(&batch).await?;
            info!(playlist = %name, "source loaded");
            *current_source = Some(name);
        }
    }
    Ok(())
}

fn output_enabled(outputs: &Response, id: &str) -> Option<bool> {
    outputs
        .records("outputid")
        .into_iter()
        .find(|o| o.get("outputid") == Some(id))
        .map(|o| o.get("outputenabled") == Some("1"))
}

fn volume(status: &Response, action: Action) -> Result<i32, ClientError> {
    let raw = status.get("volume").ok_or_else(|| ClientError::Unsupported {
        action,
        reason: "server reports no volume".into(),
    })?;
    let volume: i32 = raw
        .parse()
        .map_err(|_| ClientError::Protocol(format!("invalid volume '{}'", raw)))?;
    if volume < 0 {
        return Err(ClientError::Unsupported {
            action,
            reason: "no mixer".into(),
        });
    }
    Ok(volume)
}

/// Choose the playlist after (or before) `current`, wrapping around.
///
/// Without a known current playlist, forward starts at the first entry and
/// backward at the last.
fn pick_source<'a>(playlists: &[&'a str], current: Option<&str>, forward: bool) -> Option<&'a str> {
    let len = playlists.len();
    if len == 0 {
        return None;
    }
    let position = current.and_then(|c| playlists.iter().position(|p| *p == c));
    let index = match (position, forward) {
        (Some(i), true) => (i + 1) % len,
        (Some(i), false) => (i + len - 1) % len,
        (None, true) => 0,
        (None, false) => len - 1,
    };
    Some(playlists[index])
}
