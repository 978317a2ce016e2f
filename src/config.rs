//! Static configuration: inputs, pins and the server connection.
//!
//! Everything here is built once at startup, validated, and never mutated
//! afterwards. The structures can be assembled in code with the builder
//! methods or loaded from the INI file the service reads (see
//! [`load_config`]).
//!
//! # Example
//!
//! ```rust
//! use rs_gpio_mpdc::config::{ButtonConfig, Config, EncoderConfig, PinSpec, PullMode, TriggerEdge};
//! use rs_gpio_mpdc::Action;
//!
//! let config = Config::default()
//!     .with_button(ButtonConfig::new(
//!         0,
//!         PinSpec::new(23, PullMode::ExternalUp).unwrap(),
//!         TriggerEdge::Activate,
//!         Action::TogglePlayPause,
//!     ))
//!     .with_encoder(EncoderConfig::new(
//!         0,
//!         PinSpec::new(17, PullMode::ExternalUp).unwrap(),
//!         PinSpec::new(27, PullMode::ExternalUp).unwrap(),
//!         Action::VolumeDown,
//!         Action::VolumeUp,
//!     ));
//!
//! assert!(config.validate().is_ok());
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::commands::{Action, InputId};

mod load;
mod parse;

pub use load::{load_config, parse_config_str};
pub use parse::{parse_button, parse_encoder, parse_input_key};

/// Highest usable BCM GPIO number on the 40-pin header.
pub const MAX_PIN: u8 = 27;

/// Default debounce interval for buttons.
pub const DEFAULT_BUTTON_DEBOUNCE_MS: u32 = 50;

/// Default debounce interval for each encoder channel.
pub const DEFAULT_ENCODER_DEBOUNCE_MS: u32 = 20;

// ============================================================================
// Errors
// ============================================================================

/// Startup configuration error. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Pin number outside 0-27.
    #[error("invalid pin number {0} (expected 0-27)")]
    InvalidPin(u32),

    /// Two inputs (or both channels of one encoder) share a pin.
    #[error("pin {pin} is claimed by both {first} and {second}")]
    DuplicatePin {
        /// The contested pin.
        pin: u8,
        /// Input that declared it first.
        first: InputId,
        /// Input that declared it again.
        second: InputId,
    },

    /// The same input identifier appears twice.
    #[error("{0} is declared more than once")]
    DuplicateInput(InputId),

    /// Action token outside the fixed set.
    #[error("unknown action '{0}'")]
    UnknownAction(String),

    /// Pull-mode token other than up/dn/upex/dnex.
    #[error("unknown pull mode '{0}' (expected up, dn, upex or dnex)")]
    UnknownPull(String),

    /// Trigger token other than press/release.
    #[error("unknown trigger edge '{0}' (expected press or release)")]
    UnknownEdge(String),

    /// An input entry that does not have the expected shape.
    #[error("malformed entry '{key} = {value}': {reason}")]
    Malformed {
        /// Config key.
        key: String,
        /// Raw value.
        value: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A key in `[GPIO]` that names neither a button nor an encoder.
    #[error("unknown key '{0}' in [GPIO] section")]
    UnknownKey(String),

    /// The file has no `[GPIO]` section.
    #[error("configuration has no [GPIO] section")]
    MissingGpioSection,

    /// A bad `[MPD]` setting.
    #[error("invalid [MPD] setting '{key}': {reason}")]
    InvalidSetting {
        /// Config key.
        key: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The file could not be read or is not valid INI.
    #[error("failed to read configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

// ============================================================================
// Pins
// ============================================================================

/// Pull resistor arrangement of an input pin.
///
/// Pull-up wiring makes the input active-low, pull-down wiring active-high.
/// The external variants leave the SoC's internal resistor disabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PullMode {
    /// Internal pull-up (`up`).
    Up,
    /// Internal pull-down (`dn`).
    Down,
    /// External pull-up (`upex`).
    ExternalUp,
    /// External pull-down (`dnex`).
    ExternalDown,
}

/// Internal bias to configure when claiming a pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bias {
    /// Enable the internal pull-up.
    PullUp,
    /// Enable the internal pull-down.
    PullDown,
    /// Leave the input floating (external resistor present).
    Floating,
}

impl PullMode {
    /// Returns the configuration token.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PullMode::Up => "up",
            PullMode::Down => "dn",
            PullMode::ExternalUp => "upex",
            PullMode::ExternalDown => "dnex",
        }
    }

    /// Parse a pull-mode token (trimmed, case-insensitive).
    ///
    /// ```
    /// use rs_gpio_mpdc::config::PullMode;
    ///
    /// assert_eq!(PullMode::from_token("UPEX"), Some(PullMode::ExternalUp));
    /// assert_eq!(PullMode::from_token("down"), None);
    /// ```
    pub fn from_token(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Some(PullMode::Up),
            "dn" => Some(PullMode::Down),
            "upex" => Some(PullMode::ExternalUp),
            "dnex" => Some(PullMode::ExternalDown),
            _ => None,
        }
    }

    /// True when a low level means "activated".
    pub const fn active_low(&self) -> bool {
        matches!(self, PullMode::Up | PullMode::ExternalUp)
    }

    /// Internal resistor setting for this mode.
    pub const fn bias(&self) -> Bias {
        match self {
            PullMode::Up => Bias::PullUp,
            PullMode::Down => Bias::PullDown,
            PullMode::ExternalUp | PullMode::ExternalDown => Bias::Floating,
        }
    }
}

/// A physical pin and its pull arrangement.
///
/// Construction rejects pin numbers above [`MAX_PIN`]. Uniqueness across
/// inputs is checked by [`Config::validate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PinSpec {
    number: u8,
    pull: PullMode,
}

impl PinSpec {
    /// Create a pin spec, validating the pin number.
    pub fn new(number: u32, pull: PullMode) -> Result<Self, ConfigError> {
        match u8::try_from(number) {
            Ok(n) if n <= MAX_PIN => Ok(Self { number: n, pull }),
            _ => Err(ConfigError::InvalidPin(number)),
        }
    }

    /// BCM GPIO number.
    #[inline]
    pub fn number(&self) -> u8 {
        self.number
    }

    /// Pull arrangement.
    #[inline]
    pub fn pull(&self) -> PullMode {
        self.pull
    }
}

// ============================================================================
// Inputs
// ============================================================================

/// Which button transition triggers the action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TriggerEdge {
    /// Fire when the button becomes activated (`press`).
    Activate,
    /// Fire when the button is released (`release`).
    Release,
}

impl TriggerEdge {
    /// Parse `press` / `release` (trimmed, case-insensitive).
    pub fn from_token(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "press" => Some(TriggerEdge::Activate),
            "release" => Some(TriggerEdge::Release),
            _ => None,
        }
    }

    /// Returns the configuration token.
    pub const fn as_str(&self) -> &'static str {
        match self {
            TriggerEdge::Activate => "press",
            TriggerEdge::Release => "release",
        }
    }
}

/// A push-button input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ButtonConfig {
    /// Number from the `ButtonN` key.
    pub id: u32,
    /// Input pin.
    pub pin: PinSpec,
    /// Transition that fires the action.
    pub edge: TriggerEdge,
    /// Action to perform.
    pub action: Action,
    /// Minimum quiet interval between accepted edges.
    pub debounce_ms: u32,
}

impl ButtonConfig {
    /// Create a button with the default 50 ms debounce.
    pub fn new(id: u32, pin: PinSpec, edge: TriggerEdge, action: Action) -> Self {
        Self {
            id,
            pin,
            edge,
            action,
            debounce_ms: DEFAULT_BUTTON_DEBOUNCE_MS,
        }
    }

    /// Set the debounce interval
    pub fn with_debounce_ms(mut self, ms: u32) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Identity used for routing and logs.
    pub fn input_id(&self) -> InputId {
        InputId::Button(self.id)
    }
}

/// A two-channel rotary encoder input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Number from the `RotEncN` key.
    pub id: u32,
    /// Channel A pin.
    pub pin_a: PinSpec,
    /// Channel B pin.
    pub pin_b: PinSpec,
    /// Action for a counter-clockwise detent.
    pub ccw_action: Action,
    /// Action for a clockwise detent.
    pub cw_action: Action,
    /// Per-channel debounce interval.
    pub debounce_ms: u32,
}

impl EncoderConfig {
    /// Create an encoder with the default 20 ms debounce.
    pub fn new(
        id: u32,
        pin_a: PinSpec,
        pin_b: PinSpec,
        ccw_action: Action,
        cw_action: Action,
    ) -> Self {
        Self {
            id,
            pin_a,
            pin_b,
            ccw_action,
            cw_action,
            debounce_ms: DEFAULT_ENCODER_DEBOUNCE_MS,
        }
    }

    /// Set the debounce interval
    pub fn with_debounce_ms(mut self, ms: u32) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Identity used for routing and logs.
    pub fn input_id(&self) -> InputId {
        InputId::Encoder(self.id)
    }
}

// ============================================================================
// Connection
// ============================================================================

/// Where the control server listens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
    /// TCP host and port.
    Tcp {
        /// Hostname or address.
        host: String,
        /// Port number.
        port: u16,
    },
    /// Unix-domain socket path.
    Unix(PathBuf),
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Tcp { host, port } => write!(f, "{}:{}", host, port),
            Endpoint::Unix(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Control-server connection settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Hostname, address, or a socket path starting with `/`
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Upper bound for establishing a connection (including the greeting)
    pub connect_timeout: Duration,
    /// Upper bound for a single command round trip
    pub response_timeout: Duration,
    /// Password sent after connecting, if any
    pub password: Option<String>,
    /// Volume change per step (percent)
    pub volume_step: u8,
    /// Output toggled by the mute action
    pub mute_output: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 6600,
            connect_timeout: Duration::from_secs(60),
            response_timeout: Duration::from_secs(10),
            password: None,
            volume_step: 5,
            mute_output: 0,
        }
    }
}

impl ConnectionConfig {
    /// Set the host
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the response timeout
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Set the password
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the volume step, clamped to 1-100
    pub fn with_volume_step(mut self, step: u8) -> Self {
        self.volume_step = step.clamp(1, 100);
        self
    }

    /// Set the output toggled by mute
    pub fn with_mute_output(mut self, output: u32) -> Self {
        self.mute_output = output;
        self
    }

    /// Resolve host/port into an endpoint.
    ///
    /// ```
    /// use rs_gpio_mpdc::config::{ConnectionConfig, Endpoint};
    ///
    /// let unix = ConnectionConfig::default().with_host("/run/mpd/socket");
    /// assert!(matches!(unix.endpoint(), Endpoint::Unix(_)));
    ///
    /// let tcp = ConnectionConfig::default();
    /// assert_eq!(tcp.endpoint().to_string(), "localhost:6600");
    /// ```
    pub fn endpoint(&self) -> Endpoint {
        if self.host.starts_with('/') {
            Endpoint::Unix(PathBuf::from(&self.host))
        } else {
            Endpoint::Tcp {
                host: self.host.clone(),
                port: self.port,
            }
        }
    }
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete engine configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Push-button inputs
    pub buttons: Vec<ButtonConfig>,
    /// Rotary encoder inputs
    pub encoders: Vec<EncoderConfig>,
    /// Control-server settings (defaults when absent)
    pub connection: Option<ConnectionConfig>,
    /// How often watchers sample their pins
    pub poll_interval_ms: u32,
    /// Capacity of the action queue
    pub queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buttons: Vec::new(),
            encoders: Vec::new(),
            connection: None,
            poll_interval_ms: 1,
            queue_capacity: 64,
        }
    }
}

impl Config {
    /// Add a button
    pub fn with_button(mut self, button: ButtonConfig) -> Self {
        self.buttons.push(button);
        self
    }

    /// Add an encoder
    pub fn with_encoder(mut self, encoder: EncoderConfig) -> Self {
        self.encoders.push(encoder);
        self
    }

    /// Set connection configuration
    pub fn with_connection(mut self, connection: ConnectionConfig) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Set the pin poll interval, at least 1 ms
    pub fn with_poll_interval_ms(mut self, ms: u32) -> Self {
        self.poll_interval_ms = ms.max(1);
        self
    }

    /// Set the action queue capacity, at least 1
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Connection settings, falling back to defaults.
    pub fn connection(&self) -> ConnectionConfig {
        self.connection.clone().unwrap_or_default()
    }

    /// Every pin in declaration order, paired with the input that uses it.
    pub fn pins(&self) -> impl Iterator<Item = (InputId, PinSpec)> + '_ {
        let buttons = self.buttons.iter().map(|b| (b.input_id(), b.pin));
        let encoders = self
            .encoders
            .iter()
            .flat_map(|e| [(e.input_id(), e.pin_a), (e.input_id(), e.pin_b)]);
        buttons.chain(encoders)
    }

    /// Check that input ids and pin numbers are unique across entries.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen_inputs = std::collections::HashSet::new();
        let ids = self
            .buttons
            .iter()
            .map(ButtonConfig::input_id)
            .chain(self.encoders.iter().map(EncoderConfig::input_id));
        for id in ids {
            if !seen_inputs.insert(id) {
                return Err(ConfigError::DuplicateInput(id));
            }
        }

        let mut owners: BTreeMap<u8, InputId> = BTreeMap::new();
        for (input, pin) in self.pins() {
            if let Some(first) = owners.insert(pin.number(), input) {
                return Err(ConfigError::DuplicatePin {
                    pin: pin.number(),
                    first,
                    second: input,
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
