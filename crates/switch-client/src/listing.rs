//! Parsers for `show vlan brief` / `show vlan id` tables
//!
//! The table looks like:
//!
//! ```text
//! VLAN Name                             Status    Ports
//! ---- -------------------------------- --------- -------------------------------
//! 1    default                          active    Gi1/0/1, Gi1/0/2, Gi1/0/3
//!                                                 Gi1/0/4, Gi1/0/5
//! 100  prognose-alice-100               active    Gi1/0/10
//! ```
//!
//! The port list starts at the character offset of the `Ports` header label.
//! Wrapped port lists continue on rows that have no VLAN id; those rows are
//! recognized by their leading interface-name prefix.

use crate::commands::{MAX_VLAN_ID, VLAN_NOT_FOUND_MARKER};
use crate::error::SwitchError;
use std::collections::BTreeSet;
use tracing::debug;

/// Short interface-name prefixes that begin a continuation row
const CONTINUATION_PREFIXES: &[&str] = &["gi", "fa", "eth", "et", "te", "tw", "fo", "hu", "po"];

/// One row of the VLAN table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlanEntry {
    pub id: u16,
    pub name: String,
    pub status: String,
    pub ports: Vec<String>,
}

/// Column layout learned from the header row
struct Header {
    ports_col: usize,
}

fn parse_header(line: &str) -> Option<Header> {
    let trimmed = line.trim_start();
    if !trimmed.starts_with("VLAN") {
        return None;
    }
    if !(line.contains("Name") && line.contains("Status")) {
        return None;
    }
    line.find("Ports").map(|ports_col| Header { ports_col })
}

fn is_continuation_row(line: &str) -> bool {
    let lowered = line.trim_start().to_ascii_lowercase();
    CONTINUATION_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
}

fn split_ports(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(',')
        .map(str::trim)
        .filter(|port| !port.is_empty())
        .map(str::to_string)
}

/// Parse a VLAN table into entries, in listing order
///
/// Output without a recognizable header yields an empty list. Parsing stops at
/// the next `VLAN ...` header, so the extended tables that follow the brief one
/// in `show vlan id` output are ignored.
pub fn parse_vlan_brief(output: &str) -> Vec<VlanEntry> {
    let mut lines = output.lines();
    let Some(header) = lines.by_ref().find_map(parse_header) else {
        debug!("No VLAN table header in device output");
        return Vec::new();
    };

    let mut entries: Vec<VlanEntry> = Vec::new();
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("----") {
            continue;
        }
        if trimmed.starts_with("VLAN") {
            break;
        }

        let mut tokens = trimmed.split_whitespace();
        let first = tokens.next().unwrap_or_default();
        if let Ok(id) = first.parse::<u16>() {
            let name = tokens.next().unwrap_or_default().to_string();
            let status = tokens.next().unwrap_or_default().to_string();
            let ports = match line.get(header.ports_col..) {
                Some(column) => split_ports(column).collect(),
                None => Vec::new(),
            };
            entries.push(VlanEntry { id, name, status, ports });
        } else if is_continuation_row(line) {
            if let Some(last) = entries.last_mut() {
                last.ports.extend(split_ports(trimmed));
            }
        }
    }

    entries
}

/// Find the id of a VLAN by its name column
pub fn vlan_id_by_name(entries: &[VlanEntry], name: &str) -> Option<u16> {
    entries
        .iter()
        .find(|entry| entry.name == name)
        .map(|entry| entry.id)
}

/// First VLAN id from `start` up to 4094 that is not in the listing
///
/// Ids are compared against the parsed id column, so a VLAN named after a
/// number or a port such as `Gi1/0/100` never hides id 100.
pub fn find_available_vlan_id(entries: &[VlanEntry], start: u16) -> Result<u16, SwitchError> {
    let taken: BTreeSet<u16> = entries.iter().map(|entry| entry.id).collect();
    (start.max(1)..=MAX_VLAN_ID)
        .find(|id| !taken.contains(id))
        .ok_or(SwitchError::NoAvailableVlan { start })
}

/// Interfaces that are members of `vlan_id`
///
/// Returns an empty list when the VLAN does not exist.
pub fn interfaces_for_vlan(output: &str, vlan_id: u16) -> Vec<String> {
    if output.contains(VLAN_NOT_FOUND_MARKER) {
        debug!("VLAN ID '{}' does not exist on switch", vlan_id);
        return Vec::new();
    }

    parse_vlan_brief(output)
        .into_iter()
        .find(|entry| entry.id == vlan_id)
        .map(|entry| entry.ports)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BRIEF: &str = "\
VLAN Name                             Status    Ports
---- -------------------------------- --------- -------------------------------
1    default                          active    Gi1/0/1, Gi1/0/2, Gi1/0/3
                                                Gi1/0/4, Gi1/0/5
100  prognose-alice-100               active    Gi1/0/10, Gi1/0/11
                                                Te1/1/1
101  lab                              active
1002 fddi-default                     act/unsup
";

    #[test]
    fn test_parse_brief() {
        let entries = parse_vlan_brief(BRIEF);
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].ports.len(), 5);
        assert_eq!(entries[1].name, "prognose-alice-100");
        assert_eq!(entries[1].status, "active");
        assert!(entries[2].ports.is_empty());
        assert_eq!(entries[3].status, "act/unsup");
    }

    #[test]
    fn test_interfaces_include_continuation_rows() {
        assert_eq!(
            interfaces_for_vlan(BRIEF, 100),
            vec!["Gi1/0/10", "Gi1/0/11", "Te1/1/1"]
        );
    }

    #[test]
    fn test_absent_vlan_is_empty() {
        assert!(interfaces_for_vlan(BRIEF, 200).is_empty());
        assert!(interfaces_for_vlan("VLAN id 200 not found in current VLAN database", 200).is_empty());
        assert!(interfaces_for_vlan("", 1).is_empty());
    }

    #[test]
    fn test_show_vlan_id_stops_at_extended_table() {
        let output = "\
VLAN Name                             Status    Ports
---- -------------------------------- --------- -------------------------------
100  prognose-alice-100               active    Twe1/0/3

VLAN Type  SAID       MTU   Parent RingNo BridgeNo Stp  BrdgMode Trans1 Trans2
---- ----- ---------- ----- ------ ------ -------- ---- -------- ------ ------
100  enet  100100     1500  -      -      -        -    -        0      0
";
        assert_eq!(interfaces_for_vlan(output, 100), vec!["Twe1/0/3"]);
        assert_eq!(parse_vlan_brief(output).len(), 1);
    }

    #[test]
    fn test_vlan_id_by_name() {
        let entries = parse_vlan_brief(BRIEF);
        assert_eq!(vlan_id_by_name(&entries, "lab"), Some(101));
        assert_eq!(vlan_id_by_name(&entries, "la"), None);
    }

    #[test]
    fn test_find_available_vlan_id() {
        let entries = parse_vlan_brief(BRIEF);
        assert_eq!(find_available_vlan_id(&entries, 100).unwrap(), 102);
        assert_eq!(find_available_vlan_id(&entries, 2).unwrap(), 2);
    }

    #[test]
    fn test_find_available_vlan_id_exhausted() {
        let entries: Vec<VlanEntry> = (4090..=4094)
            .map(|id| VlanEntry {
                id,
                name: format!("v{}", id),
                status: "active".to_string(),
                ports: Vec::new(),
            })
            .collect();
        assert!(matches!(
            find_available_vlan_id(&entries, 4090),
            Err(SwitchError::NoAvailableVlan { start: 4090 })
        ));
    }
}
