use std::io;
use std::time::Duration;

use crate::commands::Action;

/// An `ACK` reply from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// Numeric error code (`ACK_ERROR_*` in the protocol docs).
    pub code: u32,
    /// Position of the failing command in a command list.
    pub index: u32,
    /// Name of the failing command.
    pub command: String,
    /// Human-readable message.
    pub message: String,
}

impl std::fmt::Display for Ack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}@{}] {{{}}} {}",
            self.code, self.index, self.command, self.message
        )
    }
}

/// Failure of a client operation.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Establishing the connection took longer than the connect timeout.
    #[error("connecting to {endpoint} timed out after {timeout:?}")]
    ConnectTimeout {
        /// Target endpoint.
        endpoint: String,
        /// Configured connect timeout.
        timeout: Duration,
    },

    /// The endpoint refused or could not be reached.
    #[error("cannot connect to {endpoint}: {source}")]
    Connect {
        /// Target endpoint.
        endpoint: String,
        /// Socket error.
        #[source]
        source: io::Error,
    },

    /// No reply within the response timeout.
    #[error("no response within {0:?}")]
    ResponseTimeout(Duration),

    /// The server closed the connection.
    #[error("connection closed by server")]
    Closed,

    /// Socket read or write failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The server sent something that is not valid protocol.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server rejected a command.
    #[error("server rejected command: {0}")]
    Command(Ack),

    /// The server cannot carry out the action in its current setup.
    #[error("{action} unsupported: {reason}")]
    Unsupported {
        /// The action attempted.
        action: Action,
        /// What is missing.
        reason: String,
    },

    /// No connection is open.
    #[error("not connected")]
    NotConnected,
}

impl ClientError {
    /// True for failures that a reconnect might fix.
    ///
    /// Server rejections and unsupported actions are answers from a healthy
    /// connection and are not retried.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            ClientError::Command(_) | ClientError::Unsupported { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(ClientError::Closed.is_transient());
        assert!(ClientError::ResponseTimeout(Duration::from_secs(1)).is_transient());
        assert!(ClientError::Protocol("garbage".into()).is_transient());
        assert!(ClientError::NotConnected.is_transient());
        assert!(ClientError::Io(io::Error::from(io::ErrorKind::BrokenPipe)).is_transient());

        let ack = Ack {
            code: 50,
            index: 0,
            command: "load".into(),
            message: "No such playlist".into(),
        };
        assert!(!ClientError::Command(ack).is_transient());
        assert!(!ClientError::Unsupported {
            action: Action::VolumeUp,
            reason: "no mixer".into()
        }
        .is_transient());
    }

    #[test]
    fn ack_display_matches_wire_format() {
        let ack = Ack {
            code: 2,
            index: 1,
            command: "setvol".into(),
            message: "Bad volume".into(),
        };
        assert_eq!(ack.to_string(), "[2@1] {setvol} Bad volume");
    }
}
