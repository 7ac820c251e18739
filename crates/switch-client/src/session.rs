//! Session traits
//!
//! [`SwitchSession`] is one open CLI session; [`SessionFactory`] opens them.
//! The SSH implementation lives in [`crate::client`], and tests use the
//! in-memory switch from `mock` (feature `test-util`).

use crate::error::SwitchError;

/// An open command-line session on the switch
///
/// All methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait SwitchSession: Send {
    /// Enter privileged mode; a no-op if already privileged
    async fn enable(&mut self) -> Result<(), SwitchError>;

    /// Run one exec-mode command and return its output
    async fn send_command(&mut self, command: &str) -> Result<String, SwitchError>;

    /// Run commands inside configuration mode as one transaction
    async fn send_config_set(&mut self, commands: &[String]) -> Result<String, SwitchError>;

    /// Write the running configuration to the durable store
    async fn save_config(&mut self) -> Result<String, SwitchError>;

    /// Close the session
    async fn disconnect(&mut self) -> Result<(), SwitchError>;
}

/// Opens sessions against one switch with fixed connection settings
#[async_trait::async_trait]
pub trait SessionFactory: Send + Sync {
    /// Management address of the switch
    fn host(&self) -> &str;

    /// Open and authenticate a new session
    async fn connect(&self) -> Result<Box<dyn SwitchSession>, SwitchError>;
}
