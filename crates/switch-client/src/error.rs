//! Switch client errors

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while driving a switch CLI session
#[derive(Debug, Error)]
pub enum SwitchError {
    /// TCP connect or SSH handshake did not complete in time
    #[error("Timeout connecting to switch: {0}")]
    ConnectTimeout(String),

    /// Login or privileged-mode authentication was rejected
    #[error("Authentication failed for switch: {0}")]
    Authentication(String),

    /// Switch unreachable or the handshake failed
    #[error("Failed to connect to switch: {0}")]
    Connection(String),

    /// The device rejected a command
    #[error("Command '{command}' failed: {output}")]
    Command {
        /// The command that failed
        command: String,
        /// Device output explaining the failure
        output: String,
    },

    /// No prompt was seen within the read timeout
    #[error("Timed out waiting for switch output: {0}")]
    Timeout(String),

    /// Socket level error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// libssh2 error
    #[error("SSH error: {0}")]
    Ssh(#[from] ssh2::Error),

    /// Every VLAN id in the search range is taken
    #[error("No available VLAN ID between {start} and 4094")]
    NoAvailableVlan {
        /// First id scanned
        start: u16,
    },

    /// VLAN identifier is not usable
    #[error("Invalid VLAN: {0}")]
    InvalidVlan(String),

    /// Value cannot be placed on a CLI line
    #[error("Invalid CLI argument: {0}")]
    InvalidArgument(String),

    /// Session is closed or its worker failed
    #[error("Session error: {0}")]
    Session(String),

    /// The whole workflow exceeded its hard deadline
    #[error("Switch operation exceeded deadline of {0:?}")]
    DeadlineExceeded(Duration),

    /// Device type string is not a known CLI dialect
    #[error("Unsupported device type: {0}")]
    UnsupportedDeviceType(String),
}

impl SwitchError {
    /// Creates a command error.
    pub fn command(command: impl Into<String>, output: impl Into<String>) -> Self {
        Self::Command {
            command: command.into(),
            output: output.into(),
        }
    }

    /// Whether the error happened while establishing the session
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            SwitchError::ConnectTimeout(_)
                | SwitchError::Authentication(_)
                | SwitchError::Connection(_)
        )
    }
}
