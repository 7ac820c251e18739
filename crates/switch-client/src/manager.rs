//! Switch port manager
//!
//! Runs the device workflow for one switch port:
//!
//! `Disconnected -> Connected -> Privileged -> VlanReady -> PortAssigned -> Persisted`
//!
//! Steps run strictly in order with no retries. The first failing step aborts
//! the rest, and the session is disconnected on every exit path. Workflows
//! against the device are serialized by a per-device lock and bounded by a
//! hard deadline. When the deadline fires the workflow stops after the step in
//! flight and closes the session before the lock is released.
//!
//! Failures never propagate as errors: every workflow ends in a
//! [`PortOperationResult`].

use crate::commands::{
    SHOW_VLAN_BRIEF, access_port_commands, parse_vlan_id, show_vlan_id, validate_cli_token,
    vlan_create_commands, vlan_name,
};
use crate::error::SwitchError;
use crate::listing::{find_available_vlan_id, interfaces_for_vlan, parse_vlan_brief, vlan_id_by_name};
use crate::session::{SessionFactory, SwitchSession};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::pin;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// How the requested VLAN value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VlanMode {
    /// The value is a numeric VLAN id, assigned directly
    #[default]
    Id,
    /// The value is a VLAN name, looked up on the device and allocated if absent
    Name,
}

impl FromStr for VlanMode {
    type Err = SwitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" => Ok(VlanMode::Id),
            "name" => Ok(VlanMode::Name),
            other => Err(SwitchError::InvalidVlan(format!(
                "unknown VLAN mode '{}', expected 'id' or 'name'",
                other
            ))),
        }
    }
}

/// Workflow settings, fixed for the life of the process
#[derive(Debug, Clone)]
pub struct ManagerSettings {
    /// VLAN that ports are restored to
    pub default_vlan_id: u16,
    /// Prefix of auto-created VLAN names
    pub vlan_name_prefix: String,
    pub vlan_mode: VlanMode,
    /// First id scanned when allocating a VLAN in name mode
    pub vlan_search_start: u16,
    /// Hard deadline for one whole workflow
    pub operation_deadline: Duration,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            default_vlan_id: 1,
            vlan_name_prefix: "prognose".to_string(),
            vlan_mode: VlanMode::Id,
            vlan_search_start: 100,
            operation_deadline: Duration::from_secs(120),
        }
    }
}

/// Progress of one device workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum SessionState {
    Disconnected,
    Connected,
    Privileged,
    VlanReady,
    PortAssigned,
    Persisted,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "DISCONNECTED",
            SessionState::Connected => "CONNECTED",
            SessionState::Privileged => "PRIVILEGED",
            SessionState::VlanReady => "VLAN_READY",
            SessionState::PortAssigned => "PORT_ASSIGNED",
            SessionState::Persisted => "PERSISTED",
        };
        f.write_str(name)
    }
}

/// Outcome of one configure or restore workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortOperationResult {
    pub success: bool,
    pub message: String,
    /// Last state reached before teardown
    pub reached: SessionState,
    /// VLAN the port was (or was to be) assigned to, once known
    pub vlan_id: Option<u16>,
}

/// What the workflow does once privileged
enum Plan<'a> {
    Configure { vlan: &'a str, username: &'a str },
    Restore,
}

#[derive(Debug)]
struct Progress {
    state: SessionState,
    vlan_id: Option<u16>,
}

/// Assigns switch ports to VLANs on one device
pub struct SwitchPortManager {
    factory: Arc<dyn SessionFactory>,
    settings: ManagerSettings,
    device_lock: Mutex<()>,
}

impl fmt::Debug for SwitchPortManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwitchPortManager")
            .field("host", &self.factory.host())
            .field("settings", &self.settings)
            .finish()
    }
}

impl SwitchPortManager {
    /// Create a manager for the switch reached through `factory`
    pub fn new(factory: Arc<dyn SessionFactory>, settings: ManagerSettings) -> Self {
        Self {
            factory,
            settings,
            device_lock: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    /// Place `interface` into the requested VLAN, creating the VLAN if needed
    ///
    /// # Arguments
    /// * `interface` - CLI interface name, e.g. `Gi1/0/10`
    /// * `vlan` - Requested VLAN, an id or a name depending on [`VlanMode`]
    /// * `username` - Acting user, used to name auto-created VLANs
    pub async fn configure_switch_port(
        &self,
        interface: &str,
        vlan: &str,
        username: &str,
    ) -> PortOperationResult {
        if interface.is_empty() || vlan.trim().is_empty() {
            error!("Interface name and VLAN are required");
            return failure(
                SessionState::Disconnected,
                None,
                "Interface name and VLAN are required".to_string(),
            );
        }

        let result = self
            .run_workflow(interface, Plan::Configure { vlan: vlan.trim(), username })
            .await;
        if result.success {
            info!(
                "Successfully configured switch port {} with VLAN {}",
                interface, vlan
            );
        }
        result
    }

    /// Put `interface` back into the default VLAN
    pub async fn restore_port_to_default_vlan(&self, interface: &str) -> PortOperationResult {
        let result = self.run_workflow(interface, Plan::Restore).await;
        if result.success {
            info!(
                "Successfully restored switch port {} to default VLAN {}",
                interface, self.settings.default_vlan_id
            );
        }
        result
    }

    /// Interfaces currently in `vlan_id`
    ///
    /// Returns an empty list when the VLAN does not exist or the switch could
    /// not be queried.
    pub async fn list_interfaces_for_vlan(&self, vlan_id: u16) -> Vec<String> {
        let _guard = self.device_lock.lock().await;
        let cancelled = AtomicBool::new(false);

        let query = async {
            let mut session = self.factory.connect().await?;
            let output = session.send_command(&show_vlan_id(vlan_id)).await;
            if let Err(e) = session.disconnect().await {
                warn!("Error disconnecting from switch: {}", e);
            }
            output
        };

        match self.bounded(&cancelled, query).await {
            Ok(output) => interfaces_for_vlan(&output, vlan_id),
            Err(SwitchError::DeadlineExceeded(deadline)) => {
                error!("Listing interfaces for VLAN {} exceeded {:?}", vlan_id, deadline);
                Vec::new()
            }
            Err(e) => {
                let text = e.to_string().to_lowercase();
                if text.contains("invalid") || text.contains("not found") {
                    debug!("VLAN ID '{}' does not exist on switch", vlan_id);
                } else {
                    error!("Error getting interfaces using VLAN ID '{}': {}", vlan_id, e);
                }
                Vec::new()
            }
        }
    }

    /// Make sure the requested VLAN exists and return its id
    ///
    /// Idempotent: an existing VLAN is reused without issuing create commands.
    pub async fn ensure_vlan(
        &self,
        session: &mut dyn SwitchSession,
        vlan: &str,
        username: &str,
    ) -> Result<u16, SwitchError> {
        let listing = session.send_command(SHOW_VLAN_BRIEF).await?;
        let entries = parse_vlan_brief(&listing);

        let (vlan_id, name) = match self.settings.vlan_mode {
            VlanMode::Id => {
                let vlan_id = parse_vlan_id(vlan)?;
                if entries.iter().any(|entry| entry.id == vlan_id) {
                    info!("VLAN {} already exists on switch", vlan_id);
                    return Ok(vlan_id);
                }
                (vlan_id, vlan_name(&self.settings.vlan_name_prefix, username, vlan))
            }
            VlanMode::Name => {
                let name = vlan_name(&self.settings.vlan_name_prefix, username, vlan);
                let existing = vlan_id_by_name(&entries, vlan).or_else(|| vlan_id_by_name(&entries, &name));
                if let Some(vlan_id) = existing {
                    info!("VLAN '{}' already exists on switch with ID {}", vlan, vlan_id);
                    return Ok(vlan_id);
                }
                let vlan_id = find_available_vlan_id(&entries, self.settings.vlan_search_start)?;
                (vlan_id, name)
            }
        };

        let output = session
            .send_config_set(&vlan_create_commands(vlan_id, &name))
            .await?;
        debug!("VLAN creation output: {}", output);
        info!("Created VLAN {} ('{}') on switch", vlan_id, name);
        Ok(vlan_id)
    }

    /// Put `interface` into access mode on `vlan_id` and enable it
    pub async fn assign_port(
        &self,
        session: &mut dyn SwitchSession,
        interface: &str,
        vlan_id: u16,
    ) -> Result<(), SwitchError> {
        match session
            .send_config_set(&access_port_commands(interface, vlan_id))
            .await
        {
            Ok(output) => {
                debug!("Port assignment output: {}", output);
                info!("Assigned interface {} to VLAN {}", interface, vlan_id);
                Ok(())
            }
            Err(e) => {
                error!(
                    "Failed to assign interface {} to VLAN {}; the port may be partially configured: {}",
                    interface, vlan_id, e
                );
                Err(e)
            }
        }
    }

    /// Write the running configuration to the durable store
    pub async fn persist(&self, session: &mut dyn SwitchSession) -> Result<(), SwitchError> {
        let output = session.save_config().await?;
        debug!("Save output: {}", output);
        Ok(())
    }

    async fn run_workflow(&self, interface: &str, plan: Plan<'_>) -> PortOperationResult {
        if let Err(e) = validate_cli_token(interface, "interface") {
            error!("Refusing to configure switch port: {}", e);
            return failure(SessionState::Disconnected, None, e.to_string());
        }

        let _guard = self.device_lock.lock().await;
        let cancelled = AtomicBool::new(false);
        let mut progress = Progress {
            state: SessionState::Disconnected,
            vlan_id: None,
        };

        let outcome = self
            .bounded(&cancelled, self.execute(&mut progress, interface, &plan, &cancelled))
            .await;

        match outcome {
            Ok(()) => PortOperationResult {
                success: true,
                message: format!(
                    "Interface {} assigned to VLAN {}",
                    interface,
                    progress.vlan_id.unwrap_or(self.settings.default_vlan_id)
                ),
                reached: progress.state,
                vlan_id: progress.vlan_id,
            },
            Err(e) => {
                if e.is_connection_failure() {
                    error!("Switch connection failed for {}: {}", interface, e);
                } else {
                    error!(
                        "Switch workflow for {} failed after {}: {}",
                        interface, progress.state, e
                    );
                }
                failure(
                    progress.state,
                    progress.vlan_id,
                    format!("Switch configuration error: {}", e),
                )
            }
        }
    }

    /// Run `work` under the operation deadline
    ///
    /// On expiry `cancelled` is raised and `work` is still awaited: the step in
    /// flight finishes, the remaining steps are skipped and the session is
    /// closed before the device lock held by the caller is released. Blocking
    /// session I/O cannot be interrupted, so dropping `work` instead would let
    /// the next workflow reach the device while this one is still talking to
    /// it.
    async fn bounded<T, F>(&self, cancelled: &AtomicBool, work: F) -> Result<T, SwitchError>
    where
        F: Future<Output = Result<T, SwitchError>>,
    {
        let deadline = self.settings.operation_deadline;
        let mut work = pin!(work);

        match tokio::time::timeout(deadline, work.as_mut()).await {
            Ok(result) => result,
            Err(_) => {
                cancelled.store(true, Ordering::SeqCst);
                warn!(
                    "Switch operation exceeded {:?}, waiting for the command in flight to finish",
                    deadline
                );
                if let Err(e) = work.await {
                    debug!("Switch operation ended after the deadline with: {}", e);
                }
                Err(SwitchError::DeadlineExceeded(deadline))
            }
        }
    }

    async fn execute(
        &self,
        progress: &mut Progress,
        interface: &str,
        plan: &Plan<'_>,
        cancelled: &AtomicBool,
    ) -> Result<(), SwitchError> {
        let mut session = self.factory.connect().await?;
        progress.state = SessionState::Connected;

        let result = self
            .drive(session.as_mut(), progress, interface, plan, cancelled)
            .await;

        if let Err(e) = session.disconnect().await {
            warn!("Error disconnecting from switch: {}", e);
        }
        result
    }

    async fn drive(
        &self,
        session: &mut dyn SwitchSession,
        progress: &mut Progress,
        interface: &str,
        plan: &Plan<'_>,
        cancelled: &AtomicBool,
    ) -> Result<(), SwitchError> {
        let checkpoint = || {
            if cancelled.load(Ordering::SeqCst) {
                Err(SwitchError::DeadlineExceeded(self.settings.operation_deadline))
            } else {
                Ok(())
            }
        };

        checkpoint()?;
        session.enable().await?;
        progress.state = SessionState::Privileged;

        checkpoint()?;
        let vlan_id = match plan {
            Plan::Configure { vlan, username } => self.ensure_vlan(session, vlan, username).await?,
            Plan::Restore => self.settings.default_vlan_id,
        };
        progress.vlan_id = Some(vlan_id);
        progress.state = SessionState::VlanReady;

        checkpoint()?;
        self.assign_port(session, interface, vlan_id).await?;
        progress.state = SessionState::PortAssigned;

        checkpoint()?;
        if let Err(e) = self.persist(session).await {
            warn!(
                "Interface {} is assigned to VLAN {} but the configuration was not saved",
                interface, vlan_id
            );
            return Err(e);
        }
        progress.state = SessionState::Persisted;
        Ok(())
    }
}

fn failure(reached: SessionState, vlan_id: Option<u16>, message: String) -> PortOperationResult {
    PortOperationResult {
        success: false,
        message,
        reached,
        vlan_id,
    }
}
