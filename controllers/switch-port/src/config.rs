//! Service configuration
//!
//! All settings come from environment variables and are read once at
//! startup. Empty values count as unset.

use crate::error::ControllerError;
use crate::resolver::{InterfaceStrategy, PORT_PLACEHOLDER};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use switch_client::commands;
use switch_client::{ConnectionSettings, DeviceProfile, ManagerSettings, VlanMode};
use tracing::{info, warn};
use webhook_reporter::{ReporterConfig, SinkEndpoint};

pub const DEFAULT_SERVICE_NAME: &str = "switch-port-webhook";

/// Immutable service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub connection: ConnectionSettings,
    pub manager: ManagerSettings,
    pub interface_strategy: InterfaceStrategy,
    pub reporter: ReporterConfig,
    /// Secret for inbound signature checks and outbound signing
    pub webhook_secret: Option<String>,
    pub log_level: String,
    pub disable_healthz_logs: bool,
    pub port: u16,
    pub service_name: String,
}

impl AppConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| {
                ControllerError::InvalidConfig(format!("{} environment variable is required", key))
            })
        };

        let profile = match get("SWITCH_DEVICE_TYPE") {
            Some(raw) => raw
                .parse::<DeviceProfile>()
                .map_err(|e| ControllerError::InvalidConfig(format!("SWITCH_DEVICE_TYPE: {}", e)))?,
            None => DeviceProfile::CiscoIos,
        };

        let connection = ConnectionSettings {
            host: required("SWITCH_HOST")?,
            port: parse_or(&get, "SWITCH_PORT", 22)?,
            username: required("SWITCH_USERNAME")?,
            password: required("SWITCH_PASSWORD")?,
            enable_secret: get("SWITCH_ENABLE_SECRET"),
            profile,
            timeout: Duration::from_secs(parse_or(&get, "SWITCH_TIMEOUT", 30)?),
        };

        let vlan_mode = match get("VLAN_MODE") {
            Some(raw) => raw
                .parse::<VlanMode>()
                .map_err(|e| ControllerError::InvalidConfig(format!("VLAN_MODE: {}", e)))?,
            None => VlanMode::default(),
        };

        let defaults = ManagerSettings::default();
        let manager = ManagerSettings {
            default_vlan_id: parse_vlan_id(&get, "DEFAULT_VLAN_ID", defaults.default_vlan_id)?,
            vlan_name_prefix: get("VLAN_NAME_PREFIX").unwrap_or(defaults.vlan_name_prefix),
            vlan_mode,
            vlan_search_start: parse_vlan_id(&get, "VLAN_SEARCH_START", defaults.vlan_search_start)?,
            operation_deadline: Duration::from_secs(parse_or(
                &get,
                "SWITCH_OPERATION_DEADLINE",
                defaults.operation_deadline.as_secs(),
            )?),
        };

        let interface_strategy = match get("INTERFACE_TEMPLATE") {
            Some(template) if template.contains(PORT_PLACEHOLDER) => {
                InterfaceStrategy::PortTemplate(template)
            }
            Some(template) => {
                return Err(ControllerError::InvalidConfig(format!(
                    "INTERFACE_TEMPLATE '{}' must contain {}",
                    template, PORT_PLACEHOLDER
                )));
            }
            None => InterfaceStrategy::Verbatim,
        };

        let webhook_secret = get("WEBHOOK_SECRET");
        let reporter = ReporterConfig {
            notification: sink(&get, "NOTIFICATION_ENDPOINT", "NOTIFICATION_TIMEOUT")?,
            webhook_log: sink(&get, "WEBHOOK_LOG_ENDPOINT", "WEBHOOK_LOG_TIMEOUT")?,
            secret: webhook_secret.clone(),
        };

        Ok(Self {
            connection,
            manager,
            interface_strategy,
            reporter,
            webhook_secret,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            disable_healthz_logs: parse_bool(&get, "DISABLE_HEALTHZ_LOGS", true)?,
            port: parse_or(&get, "PORT", 8080)?,
            service_name: get("SERVICE_NAME").unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
        })
    }

    /// Log the effective configuration, without secrets
    pub fn log_summary(&self) {
        info!("Configuration:");
        info!("  Switch: {}:{} ({})", self.connection.host, self.connection.port, self.connection.profile.as_str());
        info!("  Switch username: {}", self.connection.username);
        info!("  Switch timeout: {:?}", self.connection.timeout);
        info!("  Operation deadline: {:?}", self.manager.operation_deadline);
        info!("  Default VLAN: {}", self.manager.default_vlan_id);
        info!("  VLAN mode: {:?}", self.manager.vlan_mode);
        info!("  VLAN name prefix: {}", self.manager.vlan_name_prefix);
        info!("  Interface strategy: {:?}", self.interface_strategy);
        info!("  Listen port: {}", self.port);

        if self.webhook_secret.is_none() {
            warn!("WEBHOOK_SECRET not configured, webhook signatures will not be verified");
        }
        if self.reporter.notification.is_none() {
            warn!("NOTIFICATION_ENDPOINT not configured, notifications will not be sent");
        }
        if self.reporter.webhook_log.is_none() {
            warn!("WEBHOOK_LOG_ENDPOINT not configured, webhook logs will not be sent");
        }
    }
}

fn parse_or<G, T>(get: &G, key: &str, default: T) -> Result<T, ControllerError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e| {
            ControllerError::InvalidConfig(format!("{}='{}' is invalid: {}", key, raw, e))
        }),
        None => Ok(default),
    }
}

fn parse_vlan_id<G>(get: &G, key: &str, default: u16) -> Result<u16, ControllerError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => commands::parse_vlan_id(&raw)
            .map_err(|e| ControllerError::InvalidConfig(format!("{}: {}", key, e))),
        None => Ok(default),
    }
}

fn parse_bool<G>(get: &G, key: &str, default: bool) -> Result<bool, ControllerError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|raw| raw.trim().to_ascii_lowercase()) {
        Some(raw) => match raw.as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ControllerError::InvalidConfig(format!("{}='{}' is not a boolean", key, raw))),
        },
        None => Ok(default),
    }
}

fn sink<G>(get: &G, url_key: &str, timeout_key: &str) -> Result<Option<SinkEndpoint>, ControllerError>
where
    G: Fn(&str) -> Option<String>,
{
    let timeout = Duration::from_secs(parse_or(get, timeout_key, 30)?);
    Ok(get(url_key).map(|url| SinkEndpoint { url, timeout }))
}
