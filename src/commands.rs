//! Playback actions and the routed-action envelope.
//!
//! Every physical input ends up as one [`Action`] drawn from a fixed, closed
//! set. Actions carry no parameters; how each one is carried out against the
//! server is decided by the client (see [`crate::mpd::MpdClient`]).
//!
//! # Action Flow
//!
//! 1. A watcher accepts a debounced transition or an encoder tick
//! 2. The [`EventRouter`](crate::router::EventRouter) maps it to an [`Action`]
//! 3. The watcher wraps it in a [`RoutedAction`] and enqueues it
//! 4. The dispatch loop performs the actions in sequence order
//!
//! # Configuration Tokens
//!
//! ```rust
//! use rs_gpio_mpdc::Action;
//!
//! assert_eq!(Action::from_token("vol_up"), Some(Action::VolumeUp));
//! assert_eq!(Action::VolumeUp.as_str(), "vol_up");
//! assert_eq!(Action::from_token("louder"), None);
//! ```

use core::fmt;

// ============================================================================
// Action
// ============================================================================

/// A playback or source control action.
///
/// The set is closed: configuration tokens that do not name one of these
/// variants are rejected at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// Pause when playing, resume when paused, start when stopped.
    TogglePlayPause,
    /// Stop when playing, otherwise start playback.
    TogglePlayStop,
    /// Go to the previous track in the queue.
    PreviousTrack,
    /// Go to the next track in the queue.
    NextTrack,
    /// Flip the enabled state of the mute output.
    ToggleMute,
    /// Raise the volume by one step.
    VolumeUp,
    /// Lower the volume by one step.
    VolumeDown,
    /// Load the previous stored playlist.
    PreviousSource,
    /// Load the next stored playlist.
    NextSource,
}

impl Action {
    /// All actions, in configuration-token order.
    pub const ALL: [Action; 9] = [
        Action::TogglePlayPause,
        Action::TogglePlayStop,
        Action::PreviousTrack,
        Action::NextTrack,
        Action::ToggleMute,
        Action::VolumeUp,
        Action::VolumeDown,
        Action::PreviousSource,
        Action::NextSource,
    ];

    /// Returns the configuration token for this action.
    ///
    /// # Examples
    ///
    /// ```
    /// use rs_gpio_mpdc::Action;
    ///
    /// assert_eq!(Action::TogglePlayPause.as_str(), "play_pause");
    /// assert_eq!(Action::VolumeDown.as_str(), "vol_dn");
    /// assert_eq!(Action::NextSource.as_str(), "next_src");
    /// ```
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Action::TogglePlayPause => "play_pause",
            Action::TogglePlayStop => "play_stop",
            Action::PreviousTrack => "prev_track",
            Action::NextTrack => "next_track",
            Action::ToggleMute => "mute",
            Action::VolumeUp => "vol_up",
            Action::VolumeDown => "vol_dn",
            Action::PreviousSource => "prev_src",
            Action::NextSource => "next_src",
        }
    }

    /// Parse an action from its configuration token.
    ///
    /// Input is trimmed and case-insensitive.
    ///
    /// # Examples
    ///
    /// ```
    /// use rs_gpio_mpdc::Action;
    ///
    /// assert_eq!(Action::from_token("play_pause"), Some(Action::TogglePlayPause));
    /// assert_eq!(Action::from_token("  MUTE "), Some(Action::ToggleMute));
    /// assert_eq!(Action::from_token("next"), None);
    /// ```
    pub fn from_token(s: &str) -> Option<Self> {
        let token = s.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|a| a.as_str() == token)
    }

    /// Returns true for actions that read server state before acting.
    pub const fn is_toggle(&self) -> bool {
        matches!(
            self,
            Action::TogglePlayPause | Action::TogglePlayStop | Action::ToggleMute
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Input Identity
// ============================================================================

/// Identity of a configured input.
///
/// Buttons and encoders are numbered independently (`Button0`, `RotEnc0`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InputId {
    /// A push-button, by its configured number.
    Button(u32),
    /// A rotary encoder, by its configured number.
    Encoder(u32),
}

impl fmt::Display for InputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputId::Button(n) => write!(f, "Button{}", n),
            InputId::Encoder(n) => write!(f, "RotEnc{}", n),
        }
    }
}

// ============================================================================
// Routed Action
// ============================================================================

/// An action on its way from a watcher to the dispatch loop.
///
/// `seq` is assigned when the action enters the queue and is strictly
/// increasing across all inputs; it is the dispatch order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoutedAction {
    /// The action to perform.
    pub action: Action,
    /// The input that produced it.
    pub input: InputId,
    /// Global sequence number.
    pub seq: u64,
    /// Timestamp of the accepted transition (milliseconds).
    pub accepted_ms: u64,
}
