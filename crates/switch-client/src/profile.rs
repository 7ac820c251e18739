//! Device CLI dialects

use crate::error::SwitchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output fragments that mark a rejected command
const COMMON_ERROR_MARKERS: &[&str] = &[
    "% Invalid input",
    "% Incomplete command",
    "% Ambiguous command",
    "% Unrecognized command",
    "% Bad ",
    "% Error",
];

/// CLI dialect of the managed switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceProfile {
    CiscoIos,
    CiscoXe,
    CiscoNxos,
    AristaEos,
}

impl DeviceProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceProfile::CiscoIos => "cisco_ios",
            DeviceProfile::CiscoXe => "cisco_xe",
            DeviceProfile::CiscoNxos => "cisco_nxos",
            DeviceProfile::AristaEos => "arista_eos",
        }
    }

    /// Command that writes the running configuration to startup
    pub fn save_command(&self) -> &'static str {
        match self {
            DeviceProfile::CiscoIos | DeviceProfile::CiscoXe | DeviceProfile::AristaEos => {
                "write memory"
            }
            DeviceProfile::CiscoNxos => "copy running-config startup-config",
        }
    }

    /// Commands run once after login so output is never paged or wrapped
    pub fn session_preparation(&self) -> &'static [&'static str] {
        match self {
            DeviceProfile::CiscoIos | DeviceProfile::CiscoXe => {
                &["terminal length 0", "terminal width 511"]
            }
            DeviceProfile::CiscoNxos => &["terminal length 0", "terminal width 511"],
            DeviceProfile::AristaEos => &["terminal length 0", "terminal width 32767"],
        }
    }

    /// Whether privileged mode must be entered explicitly with `enable`
    pub fn requires_enable(&self) -> bool {
        !matches!(self, DeviceProfile::CiscoNxos)
    }

    /// Whether device output reports a rejected command
    pub fn is_error_output(&self, output: &str) -> bool {
        COMMON_ERROR_MARKERS.iter().any(|marker| output.contains(marker))
            || (matches!(self, DeviceProfile::CiscoNxos) && output.contains("% Invalid command"))
    }
}

impl FromStr for DeviceProfile {
    type Err = SwitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cisco_ios" => Ok(DeviceProfile::CiscoIos),
            "cisco_xe" => Ok(DeviceProfile::CiscoXe),
            "cisco_nxos" => Ok(DeviceProfile::CiscoNxos),
            "arista_eos" => Ok(DeviceProfile::AristaEos),
            other => Err(SwitchError::UnsupportedDeviceType(other.to_string())),
        }
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
