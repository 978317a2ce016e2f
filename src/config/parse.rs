//! Parsing of `[GPIO]` input entries.
//!
//! ```text
//! ButtonN = pin,pull,press|release,action[,debounce_ms]
//! RotEncN = pinA,pinB,pull,ccw_action,cw_action[,debounce_ms]
//! ```

use super::{ButtonConfig, ConfigError, EncoderConfig, PinSpec, PullMode, TriggerEdge};
use crate::commands::{Action, InputId};

/// Identify an input from its key (`Button3`, `rotenc0`, ...).
///
/// Returns `None` for keys that name neither kind or carry no number.
///
/// ```
/// use rs_gpio_mpdc::config::parse_input_key;
/// use rs_gpio_mpdc::InputId;
///
/// assert_eq!(parse_input_key("Button3"), Some(InputId::Button(3)));
/// assert_eq!(parse_input_key("ROTENC0"), Some(InputId::Encoder(0)));
/// assert_eq!(parse_input_key("Button"), None);
/// assert_eq!(parse_input_key("Switch1"), None);
/// ```
pub fn parse_input_key(key: &str) -> Option<InputId> {
    let key = key.trim().to_ascii_lowercase();
    if let Some(n) = key.strip_prefix("button") {
        return parse_index(n).map(InputId::Button);
    }
    if let Some(n) = key.strip_prefix("rotenc") {
        return parse_index(n).map(InputId::Encoder);
    }
    None
}

fn parse_index(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Parse the value of a `ButtonN` entry.
pub fn parse_button(key: &str, id: u32, value: &str) -> Result<ButtonConfig, ConfigError> {
    let fields = split_fields(value);
    if fields.len() != 4 && fields.len() != 5 {
        return Err(malformed(key, value, "expected pin,pull,press|release,action[,debounce]"));
    }

    let pull = parse_pull(fields[1])?;
    let pin = PinSpec::new(parse_number(key, value, fields[0], "pin")?, pull)?;
    let edge = TriggerEdge::from_token(fields[2])
        .ok_or_else(|| ConfigError::UnknownEdge(fields[2].to_string()))?;
    let action = parse_action(fields[3])?;

    let mut button = ButtonConfig::new(id, pin, edge, action);
    if let Some(ms) = fields.get(4) {
        button = button.with_debounce_ms(parse_number(key, value, ms, "debounce")?);
    }
    Ok(button)
}

/// Parse the value of a `RotEncN` entry.
pub fn parse_encoder(key: &str, id: u32, value: &str) -> Result<EncoderConfig, ConfigError> {
    let fields = split_fields(value);
    if fields.len() != 5 && fields.len() != 6 {
        return Err(malformed(
            key,
            value,
            "expected pinA,pinB,pull,ccw_action,cw_action[,debounce]",
        ));
    }

    let pull = parse_pull(fields[2])?;
    let pin_a = PinSpec::new(parse_number(key, value, fields[0], "pin A")?, pull)?;
    let pin_b = PinSpec::new(parse_number(key, value, fields[1], "pin B")?, pull)?;
    let ccw = parse_action(fields[3])?;
    let cw = parse_action(fields[4])?;

    let mut encoder = EncoderConfig::new(id, pin_a, pin_b, ccw, cw);
    if let Some(ms) = fields.get(5) {
        encoder = encoder.with_debounce_ms(parse_number(key, value, ms, "debounce")?);
    }
    Ok(encoder)
}

fn split_fields(value: &str) -> Vec<&str> {
    value.split(',').map(str::trim).collect()
}

fn parse_pull(token: &str) -> Result<PullMode, ConfigError> {
    PullMode::from_token(token).ok_or_else(|| ConfigError::UnknownPull(token.to_string()))
}

fn parse_action(token: &str) -> Result<Action, ConfigError> {
    Action::from_token(token).ok_or_else(|| ConfigError::UnknownAction(token.to_string()))
}

fn parse_number(key: &str, value: &str, field: &str, what: &str) -> Result<u32, ConfigError> {
    field
        .parse::<u32>()
        .map_err(|_| malformed(key, value, &format!("{} '{}' is not a number", what, field)))
}

fn malformed(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Malformed {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
