//! Controller-specific error types.
//!
//! Errors that stop the webhook service from starting or serving, plus the
//! per-event resolution failures reported back to the caller.

use thiserror::Error;
use webhook_reporter::ReporterError;

/// Errors that can occur in the switch port webhook service.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reporting sink setup error
    #[error("Reporter error: {0}")]
    Reporter(#[from] ReporterError),

    /// HTTP server failed to bind or serve
    #[error("Server error: {0}")]
    Server(String),
}

/// Why a switch target could not be derived from an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// `vlan_name` absent, empty, or custom parameters undecodable
    #[error("No VLAN name provided in custom parameters for switch port '{0}'")]
    MissingVlan(String),

    /// Resource name does not map to an interface
    #[error("Could not derive an interface from resource name '{0}'")]
    InvalidInterface(String),
}
