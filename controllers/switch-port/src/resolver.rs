//! Port/VLAN resolution
//!
//! Derives the interface and requested VLAN for a switch port event. The
//! interface strategy is fixed per deployment: either the resource name is
//! the CLI interface name, or resources follow the `switch-port-<N>` naming
//! convention and `N` is substituted into an interface template.

use crate::error::ResolutionError;
use webhook_core::{ReservationEvent, get_vlan_name_from_custom_params};

/// Resource name prefix of the numbered-port convention
pub const PORT_RESOURCE_PREFIX: &str = "switch-port-";

/// Placeholder replaced by the port number in an interface template
pub const PORT_PLACEHOLDER: &str = "{port}";

/// How a resource name maps to a CLI interface name
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InterfaceStrategy {
    /// The resource name is the interface name
    #[default]
    Verbatim,
    /// `switch-port-<N>` mapped through a template such as `Twe1/0/{port}`
    PortTemplate(String),
}

/// Resolved execution unit for one configure action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchTarget {
    pub interface: String,
    /// VLAN id or name, depending on the switch manager's VLAN mode
    pub vlan: String,
    pub username: String,
}

#[derive(Debug, Clone, Default)]
pub struct Resolver {
    strategy: InterfaceStrategy,
}

impl Resolver {
    pub fn new(strategy: InterfaceStrategy) -> Self {
        Self { strategy }
    }

    /// Interface and VLAN for a configure action
    pub fn resolve_target(&self, event: &ReservationEvent) -> Result<SwitchTarget, ResolutionError> {
        let vlan = get_vlan_name_from_custom_params(event.custom_parameters.as_deref())
            .ok_or_else(|| ResolutionError::MissingVlan(event.resource_name.clone()))?;

        Ok(SwitchTarget {
            interface: self.resolve_interface(&event.resource_name)?,
            vlan,
            username: event.acting_username().to_string(),
        })
    }

    /// Interface name for a resource, used by restore actions as well
    pub fn resolve_interface(&self, resource_name: &str) -> Result<String, ResolutionError> {
        let resource_name = resource_name.trim();
        match &self.strategy {
            InterfaceStrategy::Verbatim if resource_name.is_empty() => {
                Err(ResolutionError::InvalidInterface(resource_name.to_string()))
            }
            InterfaceStrategy::Verbatim => Ok(resource_name.to_string()),
            InterfaceStrategy::PortTemplate(template) => extract_port_number(resource_name)
                .map(|port| template.replace(PORT_PLACEHOLDER, &port.to_string()))
                .ok_or_else(|| ResolutionError::InvalidInterface(resource_name.to_string())),
        }
    }
}

/// Port number of a `switch-port-<N>` resource name
pub fn extract_port_number(resource_name: &str) -> Option<u32> {
    let digits = resource_name
        .trim()
        .to_ascii_lowercase()
        .strip_prefix(PORT_RESOURCE_PREFIX)?
        .to_string();

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
