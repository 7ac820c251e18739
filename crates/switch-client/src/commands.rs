//! CLI command builders for VLAN and access-port operations

use crate::error::SwitchError;

/// Brief VLAN table listing
pub const SHOW_VLAN_BRIEF: &str = "show vlan brief";

/// Enter global configuration mode
pub const CONFIGURE_TERMINAL: &str = "configure terminal";

/// Leave configuration mode
pub const END: &str = "end";

/// Leave the current configuration sub-mode
pub const EXIT: &str = "exit";

/// Enter privileged mode
pub const ENABLE: &str = "enable";

/// Lowest usable VLAN id
pub const MIN_VLAN_ID: u16 = 1;

/// Highest usable VLAN id
pub const MAX_VLAN_ID: u16 = 4094;

/// Longest VLAN name accepted by the supported dialects
pub const MAX_VLAN_NAME_LEN: usize = 32;

/// Output of `show vlan id` for a VLAN that does not exist
pub const VLAN_NOT_FOUND_MARKER: &str = "not found in current VLAN database";

/// Build the single-VLAN listing command
pub fn show_vlan_id(vlan_id: u16) -> String {
    format!("show vlan id {}", vlan_id)
}

/// Build the conventional name of an auto-created VLAN
///
/// The result is `<prefix>-<username>-<identifier>`, with characters the CLI
/// would reject replaced by `_` and the whole name cut to 32 characters.
pub fn vlan_name(prefix: &str, username: &str, identifier: &str) -> String {
    let raw = format!("{}-{}-{}", prefix, username, identifier);
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_VLAN_NAME_LEN)
        .collect()
}

/// Build the commands that create a VLAN and name it
pub fn vlan_create_commands(vlan_id: u16, name: &str) -> Vec<String> {
    vec![
        format!("vlan {}", vlan_id),
        format!("name {}", name),
        EXIT.to_string(),
    ]
}

/// Build the commands that put an interface into access mode on a VLAN
///
/// `no shutdown` is part of the same transaction so a port that was
/// administratively down comes up with its new VLAN.
pub fn access_port_commands(interface: &str, vlan_id: u16) -> Vec<String> {
    vec![
        format!("interface {}", interface),
        "switchport mode access".to_string(),
        format!("switchport access vlan {}", vlan_id),
        "no shutdown".to_string(),
        EXIT.to_string(),
    ]
}

/// Parse a numeric VLAN id and check it is in 1..=4094
pub fn parse_vlan_id(value: &str) -> Result<u16, SwitchError> {
    let trimmed = value.trim();
    let id: u16 = trimmed
        .parse()
        .map_err(|_| SwitchError::InvalidVlan(format!("'{}' is not a numeric VLAN id", trimmed)))?;

    if !(MIN_VLAN_ID..=MAX_VLAN_ID).contains(&id) {
        return Err(SwitchError::InvalidVlan(format!(
            "VLAN id {} is outside {}..={}",
            id, MIN_VLAN_ID, MAX_VLAN_ID
        )));
    }

    Ok(id)
}

/// Check that a value can be placed on one CLI line as a single token
///
/// Rejects empty values, whitespace, control characters and `?` (which
/// triggers inline help on the supported dialects).
pub fn validate_cli_token<'a>(value: &'a str, what: &str) -> Result<&'a str, SwitchError> {
    if value.is_empty() {
        return Err(SwitchError::InvalidArgument(format!("{} is empty", what)));
    }

    if let Some(bad) = value
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || *c == '?')
    {
        return Err(SwitchError::InvalidArgument(format!(
            "{} '{}' contains forbidden character {:?}",
            what, value, bad
        )));
    }

    Ok(value)
}
