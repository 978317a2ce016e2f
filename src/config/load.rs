//! Loading the INI configuration file.
//!
//! ```ini
//! [GPIO]
//! Button0 = 23,upex,press,play_pause,50
//! RotEnc0 = 17,27,upex,vol_dn,vol_up,20
//!
//! [MPD]
//! host = localhost
//! port = 6600
//! ```
//!
//! Section names and keys are case-insensitive. `[MPD]` is optional; a
//! missing `[GPIO]` section or an unknown key is an error.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use ::config::{File, FileFormat};
use tracing::debug;

use super::{parse, Config, ConfigError, ConnectionConfig};
use crate::commands::InputId;

type Sections = BTreeMap<String, BTreeMap<String, String>>;

/// Load and validate the configuration file at `path`.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let sections: Sections = ::config::Config::builder()
        .add_source(File::new(&path.to_string_lossy(), FileFormat::Ini).required(true))
        .build()?
        .try_deserialize()?;

    debug!(path = %path.display(), "configuration file read");
    from_sections(sections)
}

/// Parse and validate configuration from INI text.
///
/// ```
/// use rs_gpio_mpdc::config::parse_config_str;
///
/// let config = parse_config_str("[GPIO]\nButton0 = 23,upex,press,play_pause\n").unwrap();
/// assert_eq!(config.buttons.len(), 1);
/// assert!(config.connection.is_none());
/// ```
pub fn parse_config_str(ini: &str) -> Result<Config, ConfigError> {
    let sections: Sections = ::config::Config::builder()
        .add_source(File::from_str(ini, FileFormat::Ini))
        .build()?
        .try_deserialize()?;
    from_sections(sections)
}

fn find_section<'a>(sections: &'a Sections, name: &str) -> Option<&'a BTreeMap<String, String>> {
    sections
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v)
}

fn from_sections(sections: Sections) -> Result<Config, ConfigError> {
    let gpio = find_section(&sections, "gpio").ok_or(ConfigError::MissingGpioSection)?;

    let mut config = Config::default();
    for (key, value) in gpio {
        match parse::parse_input_key(key) {
            Some(InputId::Button(id)) => {
                config = config.with_button(parse::parse_button(key, id, value)?);
            }
            Some(InputId::Encoder(id)) => {
                config = config.with_encoder(parse::parse_encoder(key, id, value)?);
            }
            None => return Err(ConfigError::UnknownKey(key.clone())),
        }
    }

    if let Some(mpd) = find_section(&sections, "mpd") {
        config = config.with_connection(connection_from_section(mpd)?);
    }

    config.validate()?;
    Ok(config)
}

fn connection_from_section(section: &BTreeMap<String, String>) -> Result<ConnectionConfig, ConfigError> {
    let mut connection = ConnectionConfig::default();

    for (key, value) in section {
        let value = value.trim();
        match key.to_ascii_lowercase().as_str() {
            "host" | "mpdhost" => connection = connection.with_host(value),
            "port" | "mpdport" => connection = connection.with_port(number(key, value)?),
            "timeout" => {
                connection = connection.with_connect_timeout(Duration::from_secs(number(key, value)?))
            }
            "response_timeout" => {
                connection =
                    connection.with_response_timeout(Duration::from_secs(number(key, value)?))
            }
            "password" => {
                if !value.is_empty() {
                    connection = connection.with_password(value);
                }
            }
            "volume_step" => connection = connection.with_volume_step(number(key, value)?),
            "mute_output" => connection = connection.with_mute_output(number(key, value)?),
            _ => {
                return Err(ConfigError::InvalidSetting {
                    key: key.clone(),
                    reason: "unknown key".into(),
                })
            }
        }
    }
    Ok(connection)
}

fn number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidSetting {
        key: key.to_string(),
        reason: format!("'{}' is not a valid number", value),
    })
}
