//! MPD line protocol: command encoding and response decoding.
//!
//! ```text
//! C: status
//! S: volume: 40
//! S: state: play
//! S: OK
//!
//! C: load "Morning Mix"
//! S: ACK [50@0] {load} No such playlist
//! ```
//!
//! Arguments are always sent quoted, with `"` and `\` escaped.

use super::error::{Ack, ClientError};

/// Quote a command argument.
///
/// ```
/// use rs_gpio_mpdc::mpd::protocol::quote;
///
/// assert_eq!(quote("Jazz"), "\"Jazz\"");
/// assert_eq!(quote(r#"say "hi" \o/"#), r#""say \"hi\" \\o/""#);
/// ```
pub fn quote(arg: &str) -> String {
    let mut out = String::with_capacity(arg.len() + 2);
    out.push('"');
    for c in arg.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Build a command line (without the trailing newline).
///
/// ```
/// use rs_gpio_mpdc::mpd::protocol::command;
///
/// assert_eq!(command("play", &[]), "play");
/// assert_eq!(command("setvol", &["45"]), "setvol \"45\"");
/// ```
pub fn command(name: &str, args: &[&str]) -> String {
    let mut line = String::from(name);
    for arg in args {
        line.push(' ');
        line.push_str(&quote(arg));
    }
    line
}

/// Split a command line into its name and unquoted arguments.
///
/// Returns `None` for an empty line or an unterminated quote.
///
/// ```
/// use rs_gpio_mpdc::mpd::protocol::parse_command_line;
///
/// let (name, args) = parse_command_line(r#"load "Morning \"Mix\"""#).unwrap();
/// assert_eq!(name, "load");
/// assert_eq!(args, vec![r#"Morning "Mix""#.to_string()]);
/// ```
pub fn parse_command_line(line: &str) -> Option<(String, Vec<String>)> {
    let mut tokens = Vec::new();
    let mut chars = line.trim().chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut token = String::new();
        if c == '"' {
            chars.next();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => token.push(chars.next()?),
                    '"' => {
                        closed = true;
                        break;
                    }
                    _ => token.push(c),
                }
            }
            if !closed {
                return None;
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                token.push(c);
                chars.next();
            }
        }
        tokens.push(token);
    }

    let mut tokens = tokens.into_iter();
    let name = tokens.next()?;
    Some((name, tokens.collect()))
}

/// Parse the server greeting, returning the protocol version.
pub fn parse_greeting(line: &str) -> Result<String, ClientError> {
    line.trim_end()
        .strip_prefix("OK MPD ")
        .map(str::to_string)
        .ok_or_else(|| ClientError::Protocol(format!("unexpected greeting '{}'", line.trim_end())))
}

/// One line of a server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// `OK`: end of a successful reply.
    Ok,
    /// `list_OK`: end of one command inside a command list.
    ListOk,
    /// `ACK ...`: the command failed.
    Ack(Ack),
    /// `key: value`.
    Pair(String, String),
}

/// Decode a single reply line.
pub fn parse_line(line: &str) -> Result<Line, ClientError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line == "OK" {
        return Ok(Line::Ok);
    }
    if line == "list_OK" {
        return Ok(Line::ListOk);
    }
    if let Some(rest) = line.strip_prefix("ACK ") {
        return parse_ack(rest).map(Line::Ack);
    }
    match line.split_once(": ") {
        Some((key, value)) if !key.is_empty() => Ok(Line::Pair(key.to_string(), value.to_string())),
        _ => Err(ClientError::Protocol(format!("malformed line '{}'", line))),
    }
}

/// `[code@index] {command} message`
fn parse_ack(rest: &str) -> Result<Ack, ClientError> {
    let malformed = || ClientError::Protocol(format!("malformed ACK '{}'", rest));

    let rest = rest.strip_prefix('[').ok_or_else(malformed)?;
    let (numbers, rest) = rest.split_once(']').ok_or_else(malformed)?;
    let (code, index) = numbers.split_once('@').ok_or_else(malformed)?;
    let code = code.parse().map_err(|_| malformed())?;
    let index = index.parse().map_err(|_| malformed())?;

    let rest = rest.trim_start().strip_prefix('{').ok_or_else(malformed)?;
    let (command, message) = rest.split_once('}').ok_or_else(malformed)?;

    Ok(Ack {
        code,
        index,
        command: command.to_string(),
        message: message.trim_start().to_string(),
    })
}

/// The `key: value` pairs of a successful reply, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pairs: Vec<(String, String)>,
}

impl Response {
    /// Wrap decoded pairs.
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `key`, in order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Split into records, each starting at a `key` pair.
    ///
    /// Pairs before the first `key` are dropped.
    pub fn records(&self, key: &str) -> Vec<Response> {
        let mut records: Vec<Response> = Vec::new();
        for (k, v) in &self.pairs {
            if k == key {
                records.push(Response::default());
            }
            if let Some(current) = records.last_mut() {
                current.pairs.push((k.clone(), v.clone()));
            }
        }
        records
    }

    /// True if the reply carried no pairs.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Player state from `status`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayState {
    /// Playing.
    Play,
    /// Paused.
    Pause,
    /// Stopped.
    Stop,
}

impl PlayState {
    /// Read `state` from a `status` reply.
    pub fn from_status(status: &Response) -> Result<Self, ClientError> {
        match status.get("state") {
            Some("play") => Ok(PlayState::Play),
            Some("pause") => Ok(PlayState::Pause),
            Some("stop") => Ok(PlayState::Stop),
            Some(other) => Err(ClientError::Protocol(format!("unknown player state '{}'", other))),
            None => Err(ClientError::Protocol("status reply without state".into())),
        }
    }
}
