//! Switch CLI Client
//!
//! Drives a managed Ethernet switch over an interactive SSH command-line
//! session to place access ports into VLANs.
//!
//! The crate is split along the seams of one device workflow:
//! - [`commands`] builds the vendor CLI command sequences
//! - [`listing`] parses `show vlan` tables
//! - [`session`] defines the session and session-factory traits
//! - [`client`] implements them over SSH
//! - [`manager`] runs the connect, VLAN, port, persist, disconnect sequence
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use switch_client::{
//!     ConnectionSettings, DeviceProfile, ManagerSettings, SshSessionFactory, SwitchPortManager,
//! };
//!
//! # async fn example() {
//! let factory = SshSessionFactory::new(ConnectionSettings {
//!     host: "10.0.0.2".to_string(),
//!     port: 22,
//!     username: "admin".to_string(),
//!     password: "secret".to_string(),
//!     enable_secret: None,
//!     profile: DeviceProfile::CiscoIos,
//!     timeout: Duration::from_secs(30),
//! });
//!
//! let manager = SwitchPortManager::new(Arc::new(factory), ManagerSettings::default());
//! let result = manager.configure_switch_port("Gi1/0/10", "120", "alice").await;
//! println!("{}", result.message);
//! # }
//! ```

pub mod client;
pub mod commands;
pub mod error;
pub mod listing;
pub mod manager;
pub mod profile;
pub mod session;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;


pub use client::{ConnectionSettings, SshSessionFactory};
pub use error::SwitchError;
pub use listing::{VlanEntry, find_available_vlan_id, interfaces_for_vlan, parse_vlan_brief, vlan_id_by_name};
pub use manager::{ManagerSettings, PortOperationResult, SessionState, SwitchPortManager, VlanMode};
pub use profile::DeviceProfile;
pub use session::{SessionFactory, SwitchSession};
#[cfg(any(test, feature = "test-util"))]
pub use mock::{FailurePoint, MockSessionFactory, MockSwitch};
