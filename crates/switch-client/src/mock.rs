//! In-memory switch for unit testing
//!
//! [`MockSwitch`] keeps a VLAN table and port memberships, interprets the CLI
//! commands this crate sends, and renders `show vlan` output in the Cisco
//! layout (including wrapped port lists). Individual workflow steps can be made
//! to fail, and every connect, command and save is counted.

use crate::commands::{MAX_VLAN_NAME_LEN, SHOW_VLAN_BRIEF, VLAN_NOT_FOUND_MARKER};
use crate::error::SwitchError;
use crate::session::{SessionFactory, SwitchSession};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Ports shown per row before the list wraps
const PORTS_PER_ROW: usize = 3;

/// Offset of the `Ports` column
const PORTS_COLUMN: usize = 48;

/// Step at which the mock switch fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    /// TCP connect times out
    ConnectTimeout,
    /// Login is rejected
    Authentication,
    /// `enable` is rejected
    Enable,
    /// `show vlan ...` fails
    ShowVlan,
    /// A `vlan <id>` configuration set fails
    CreateVlan,
    /// An `interface <name>` configuration set fails
    AssignPort,
    /// `write memory` fails
    Save,
    /// Closing the session fails
    Disconnect,
}

#[derive(Debug, Clone)]
struct MockVlan {
    name: String,
    ports: Vec<String>,
}

#[derive(Debug, Default)]
struct MockState {
    vlans: BTreeMap<u16, MockVlan>,
    failures: HashSet<FailurePoint>,
    connects: usize,
    disconnects: usize,
    saves: usize,
    commands: Vec<String>,
    config_delay: Option<Duration>,
}

/// Mock switch shared between a test and its sessions
#[derive(Debug, Clone)]
pub struct MockSwitch {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockSwitch {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSwitch {
    /// Create a switch with only VLAN 1 (`default`)
    pub fn new() -> Self {
        let switch = Self {
            state: Arc::new(Mutex::new(MockState::default())),
        };
        switch.add_vlan(1, "default", &[]);
        switch
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A panicking test must not hide the state from the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a VLAN with member ports (for test setup)
    pub fn add_vlan(&self, id: u16, name: &str, ports: &[&str]) {
        let mut state = self.lock();
        for vlan in state.vlans.values_mut() {
            vlan.ports.retain(|port| !ports.contains(&port.as_str()));
        }
        state.vlans.insert(
            id,
            MockVlan {
                name: name.to_string(),
                ports: ports.iter().map(|port| port.to_string()).collect(),
            },
        );
    }

    /// Make a step fail (for test setup)
    pub fn fail_at(&self, point: FailurePoint) {
        self.lock().failures.insert(point);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Delay every configuration set, to exercise deadlines
    pub fn set_config_delay(&self, delay: Duration) {
        self.lock().config_delay = Some(delay);
    }

    /// Number of connection attempts
    pub fn connect_count(&self) -> usize {
        self.lock().connects
    }

    pub fn disconnect_count(&self) -> usize {
        self.lock().disconnects
    }

    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    /// Every command received, in order
    pub fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    pub fn vlan_name(&self, id: u16) -> Option<String> {
        self.lock().vlans.get(&id).map(|vlan| vlan.name.clone())
    }

    /// VLAN an interface currently belongs to
    pub fn port_vlan(&self, interface: &str) -> Option<u16> {
        self.lock()
            .vlans
            .iter()
            .find(|(_, vlan)| vlan.ports.iter().any(|port| port == interface))
            .map(|(id, _)| *id)
    }

    /// Render the VLAN table as `show vlan brief` prints it
    pub fn render_brief(&self) -> String {
        let state = self.lock();
        render_table(state.vlans.iter())
    }

    fn render_vlan(&self, id: u16) -> String {
        let state = self.lock();
        match state.vlans.get_key_value(&id) {
            Some(entry) => render_table(std::iter::once(entry)),
            None => format!("VLAN id {} {}.", id, VLAN_NOT_FOUND_MARKER),
        }
    }

    fn fails(&self, point: FailurePoint) -> bool {
        self.lock().failures.contains(&point)
    }

    fn record(&self, command: &str) {
        self.lock().commands.push(command.to_string());
    }

    fn apply_config(&self, commands: &[String]) -> Result<(), SwitchError> {
        let mut state = self.lock();
        let mut current_vlan: Option<u16> = None;
        let mut current_interface: Option<String> = None;

        for command in commands {
            state.commands.push(command.clone());
            let mut words = command.split_whitespace();
            match (words.next(), words.next(), words.next(), words.next()) {
                (Some("vlan"), Some(id), None, None) => {
                    let id: u16 = id
                        .parse()
                        .map_err(|_| SwitchError::command(command, "% Invalid input detected"))?;
                    state.vlans.entry(id).or_insert_with(|| MockVlan {
                        name: format!("VLAN{:04}", id),
                        ports: Vec::new(),
                    });
                    current_vlan = Some(id);
                }
                (Some("name"), Some(name), None, None) => {
                    let id = current_vlan
                        .ok_or_else(|| SwitchError::command(command, "% Invalid input detected"))?;
                    if name.len() > MAX_VLAN_NAME_LEN {
                        return Err(SwitchError::command(command, "% Invalid input detected"));
                    }
                    if let Some(vlan) = state.vlans.get_mut(&id) {
                        vlan.name = name.to_string();
                    }
                }
                (Some("interface"), Some(name), None, None) => {
                    current_interface = Some(name.to_string());
                }
                (Some("switchport"), Some("access"), Some("vlan"), Some(id)) => {
                    let interface = current_interface
                        .clone()
                        .ok_or_else(|| SwitchError::command(command, "% Invalid input detected"))?;
                    let id: u16 = id
                        .parse()
                        .map_err(|_| SwitchError::command(command, "% Invalid input detected"))?;
                    for vlan in state.vlans.values_mut() {
                        vlan.ports.retain(|port| *port != interface);
                    }
                    // Access assignment creates a missing VLAN, as IOS does
                    state
                        .vlans
                        .entry(id)
                        .or_insert_with(|| MockVlan {
                            name: format!("VLAN{:04}", id),
                            ports: Vec::new(),
                        })
                        .ports
                        .push(interface);
                }
                (Some("exit"), None, None, None) => {
                    current_vlan = None;
                    current_interface = None;
                }
                _ => {}
            }
        }

        Ok(())
    }
}

fn render_table<'a>(vlans: impl Iterator<Item = (&'a u16, &'a MockVlan)>) -> String {
    let mut out = String::from("VLAN Name                             Status    Ports\n");
    out.push_str("---- -------------------------------- --------- -------------------------------\n");

    for (id, vlan) in vlans {
        let mut rows = vlan.ports.chunks(PORTS_PER_ROW);
        let first = rows.next().map(|chunk| chunk.join(", ")).unwrap_or_default();
        out.push_str(format!("{:<4} {:<32} {:<9} {}", id, vlan.name, "active", first).trim_end());
        out.push('\n');
        for chunk in rows {
            out.push_str(&" ".repeat(PORTS_COLUMN));
            out.push_str(&chunk.join(", "));
            out.push('\n');
        }
    }

    out
}

/// Session factory handing out sessions on a [`MockSwitch`]
#[derive(Debug, Clone)]
pub struct MockSessionFactory {
    host: String,
    switch: MockSwitch,
}

impl MockSessionFactory {
    pub fn new(switch: MockSwitch) -> Self {
        Self {
            host: "mock-switch".to_string(),
            switch,
        }
    }

    pub fn switch(&self) -> &MockSwitch {
        &self.switch
    }
}

#[async_trait::async_trait]
impl SessionFactory for MockSessionFactory {
    fn host(&self) -> &str {
        &self.host
    }

    async fn connect(&self) -> Result<Box<dyn SwitchSession>, SwitchError> {
        self.switch.lock().connects += 1;

        if self.switch.fails(FailurePoint::ConnectTimeout) {
            return Err(SwitchError::ConnectTimeout(format!("{}:22", self.host)));
        }
        if self.switch.fails(FailurePoint::Authentication) {
            return Err(SwitchError::Authentication(format!("admin@{}:22", self.host)));
        }

        Ok(Box::new(MockSession {
            switch: self.switch.clone(),
            privileged: false,
            open: true,
        }))
    }
}

struct MockSession {
    switch: MockSwitch,
    privileged: bool,
    open: bool,
}

impl MockSession {
    fn ensure_open(&self) -> Result<(), SwitchError> {
        if self.open {
            Ok(())
        } else {
            Err(SwitchError::Session("session is closed".to_string()))
        }
    }
}

#[async_trait::async_trait]
impl SwitchSession for MockSession {
    async fn enable(&mut self) -> Result<(), SwitchError> {
        self.ensure_open()?;
        self.switch.record("enable");
        if self.switch.fails(FailurePoint::Enable) {
            return Err(SwitchError::Authentication("enable secret rejected".to_string()));
        }
        self.privileged = true;
        Ok(())
    }

    async fn send_command(&mut self, command: &str) -> Result<String, SwitchError> {
        self.ensure_open()?;
        self.switch.record(command);

        if command.starts_with("show vlan") && self.switch.fails(FailurePoint::ShowVlan) {
            return Err(SwitchError::Timeout("no prompt within 30s".to_string()));
        }

        if command == SHOW_VLAN_BRIEF {
            return Ok(self.switch.render_brief());
        }
        if let Some(id) = command.strip_prefix("show vlan id ") {
            return match id.trim().parse::<u16>() {
                Ok(id) => Ok(self.switch.render_vlan(id)),
                Err(_) => Err(SwitchError::command(command, "% Invalid input detected")),
            };
        }

        Ok(String::new())
    }

    async fn send_config_set(&mut self, commands: &[String]) -> Result<String, SwitchError> {
        self.ensure_open()?;
        if !self.privileged {
            return Err(SwitchError::command("configure terminal", "% Invalid input detected"));
        }

        let delay = self.switch.lock().config_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let first = commands.first().map(String::as_str).unwrap_or_default();
        if first.starts_with("vlan ") && self.switch.fails(FailurePoint::CreateVlan) {
            return Err(SwitchError::command(first, "% Failed to create VLAN"));
        }
        if first.starts_with("interface ") && self.switch.fails(FailurePoint::AssignPort) {
            return Err(SwitchError::command(first, "% Invalid input detected"));
        }

        self.switch.apply_config(commands)?;
        Ok(commands.join("\n"))
    }

    async fn save_config(&mut self) -> Result<String, SwitchError> {
        self.ensure_open()?;
        self.switch.record("write memory");
        if self.switch.fails(FailurePoint::Save) {
            return Err(SwitchError::command("write memory", "% Error opening nvram:/startup-config"));
        }
        self.switch.lock().saves += 1;
        Ok("Building configuration...\n[OK]".to_string())
    }

    async fn disconnect(&mut self) -> Result<(), SwitchError> {
        self.open = false;
        self.switch.lock().disconnects += 1;
        if self.switch.fails(FailurePoint::Disconnect) {
            return Err(SwitchError::Session("connection reset by peer".to_string()));
        }
        Ok(())
    }
}
