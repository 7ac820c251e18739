//! SSH command-line client
//!
//! libssh2 is blocking, so every interaction with the shell runs on the Tokio
//! blocking pool. The shell is moved into the blocking task and handed back
//! when it finishes; if the caller gives up (for example on a deadline), the
//! task keeps ownership and the shell is closed when it is dropped.

use crate::commands::{CONFIGURE_TERMINAL, ENABLE, END};
use crate::error::SwitchError;
use crate::profile::DeviceProfile;
use crate::session::{SessionFactory, SwitchSession};
use ssh2::{Channel, ErrorCode, Session};
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// libssh2 `LIBSSH2_ERROR_TIMEOUT`
const LIBSSH2_ERROR_TIMEOUT: i32 = -9;

/// Leading characters of the base prompt that identify the device
const PROMPT_MATCH_LEN: usize = 16;

/// Idle wait between reads when the channel has nothing buffered
const READ_BACKOFF: Duration = Duration::from_millis(20);

/// Connection settings for one switch
#[derive(Clone)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Privileged-mode secret; the login password is used when unset
    pub enable_secret: Option<String>,
    pub profile: DeviceProfile,
    /// Connect and per-read timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("enable_secret", &self.enable_secret.as_ref().map(|_| "***"))
            .field("profile", &self.profile)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Opens SSH CLI sessions with immutable connection settings
#[derive(Debug, Clone)]
pub struct SshSessionFactory {
    settings: Arc<ConnectionSettings>,
}

impl SshSessionFactory {
    /// Create a new factory
    pub fn new(settings: ConnectionSettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }
}

#[async_trait::async_trait]
impl SessionFactory for SshSessionFactory {
    fn host(&self) -> &str {
        &self.settings.host
    }

    async fn connect(&self) -> Result<Box<dyn SwitchSession>, SwitchError> {
        let settings = Arc::clone(&self.settings);
        let shell = tokio::task::spawn_blocking(move || CliShell::open(&settings))
            .await
            .map_err(|e| SwitchError::Session(format!("connect task failed: {}", e)))??;

        info!("Successfully connected to switch: {}", self.settings.host);
        Ok(Box::new(SshSession { shell: Some(shell) }))
    }
}

/// Async handle over a blocking [`CliShell`]
struct SshSession {
    shell: Option<CliShell>,
}

impl SshSession {
    async fn run<T, F>(&mut self, op: F) -> Result<T, SwitchError>
    where
        F: FnOnce(&mut CliShell) -> Result<T, SwitchError> + Send + 'static,
        T: Send + 'static,
    {
        let mut shell = self
            .shell
            .take()
            .ok_or_else(|| SwitchError::Session("session is closed".to_string()))?;

        let (shell, result) = tokio::task::spawn_blocking(move || {
            let result = op(&mut shell);
            (shell, result)
        })
        .await
        .map_err(|e| SwitchError::Session(format!("session task failed: {}", e)))?;

        self.shell = Some(shell);
        result
    }
}

#[async_trait::async_trait]
impl SwitchSession for SshSession {
    async fn enable(&mut self) -> Result<(), SwitchError> {
        self.run(|shell| shell.enable()).await
    }

    async fn send_command(&mut self, command: &str) -> Result<String, SwitchError> {
        let command = command.to_string();
        self.run(move |shell| shell.send_command(&command)).await
    }

    async fn send_config_set(&mut self, commands: &[String]) -> Result<String, SwitchError> {
        let commands = commands.to_vec();
        self.run(move |shell| shell.send_config_set(&commands)).await
    }

    async fn save_config(&mut self) -> Result<String, SwitchError> {
        self.run(|shell| {
            let command = shell.profile.save_command();
            shell.send_command(command)
        })
        .await
    }

    async fn disconnect(&mut self) -> Result<(), SwitchError> {
        match self.shell.take() {
            Some(shell) => tokio::task::spawn_blocking(move || shell.close())
                .await
                .map_err(|e| SwitchError::Session(format!("disconnect task failed: {}", e)))?,
            None => Ok(()),
        }
    }
}

/// Interactive shell on an authenticated SSH session
struct CliShell {
    session: Session,
    channel: Channel,
    profile: DeviceProfile,
    timeout: Duration,
    enable_secret: String,
    /// Prompt text without its trailing `>` or `#`
    base_prompt: String,
    privileged: bool,
    closed: bool,
}

impl CliShell {
    fn open(settings: &ConnectionSettings) -> Result<Self, SwitchError> {
        let target = format!("{}:{}", settings.host, settings.port);
        let addr = (settings.host.as_str(), settings.port)
            .to_socket_addrs()
            .map_err(|e| SwitchError::Connection(format!("{}: {}", target, e)))?
            .next()
            .ok_or_else(|| SwitchError::Connection(format!("{}: no address resolved", target)))?;

        let tcp = TcpStream::connect_timeout(&addr, settings.timeout).map_err(|e| {
            if e.kind() == ErrorKind::TimedOut {
                SwitchError::ConnectTimeout(format!("{}: {}", target, e))
            } else {
                SwitchError::Connection(format!("{}: {}", target, e))
            }
        })?;

        let mut session = Session::new()?;
        session.set_tcp_stream(tcp);
        session.set_timeout(u32::try_from(settings.timeout.as_millis()).unwrap_or(u32::MAX));
        session.handshake().map_err(|e| {
            if matches!(e.code(), ErrorCode::Session(LIBSSH2_ERROR_TIMEOUT)) {
                SwitchError::ConnectTimeout(format!("{}: {}", target, e))
            } else {
                SwitchError::Connection(format!("{}: {}", target, e))
            }
        })?;

        session
            .userauth_password(&settings.username, &settings.password)
            .map_err(|e| SwitchError::Authentication(format!("{}@{}: {}", settings.username, target, e)))?;
        if !session.authenticated() {
            return Err(SwitchError::Authentication(format!(
                "{}@{}: credentials rejected",
                settings.username, target
            )));
        }

        let mut channel = session.channel_session()?;
        channel.request_pty("vt100", None, Some((511, 24, 0, 0)))?;
        channel.shell()?;

        let mut shell = CliShell {
            session,
            channel,
            profile: settings.profile,
            timeout: settings.timeout,
            enable_secret: settings
                .enable_secret
                .clone()
                .unwrap_or_else(|| settings.password.clone()),
            base_prompt: String::new(),
            privileged: false,
            closed: false,
        };

        shell.find_prompt()?;
        for command in shell.profile.session_preparation() {
            shell.send_command(command)?;
        }

        Ok(shell)
    }

    /// Learn the base prompt from a bare newline
    fn find_prompt(&mut self) -> Result<(), SwitchError> {
        self.write_line("")?;
        let output = self.read_until(|out| {
            last_line(out).is_some_and(|line| line.ends_with('>') || line.ends_with('#'))
        })?;

        let prompt = last_line(&output).unwrap_or_default();
        self.privileged = prompt.ends_with('#');
        self.base_prompt = prompt.trim_end_matches(['>', '#']).to_string();
        debug!("Detected switch prompt '{}'", prompt);
        Ok(())
    }

    fn enable(&mut self) -> Result<(), SwitchError> {
        if self.privileged || !self.profile.requires_enable() {
            return Ok(());
        }

        let base = self.base_prompt.clone();
        self.write_line(ENABLE)?;
        let mut output = self.read_until(|out| out.contains("assword") || at_prompt(&base, out))?;
        if !at_prompt(&base, &output) {
            let secret = self.enable_secret.clone();
            self.write_line(&secret)?;
            output = self.read_until(|out| at_prompt(&base, out))?;
        }

        if last_line(&output).is_some_and(|line| line.ends_with('#')) {
            self.privileged = true;
            Ok(())
        } else {
            Err(SwitchError::Authentication("enable secret rejected".to_string()))
        }
    }

    fn send_command(&mut self, command: &str) -> Result<String, SwitchError> {
        let base = self.base_prompt.clone();
        self.write_line(command)?;
        let raw = self.read_until(|out| at_prompt(&base, out))?;
        let output = strip_echo_and_prompt(&raw, command);
        debug!("Switch output for '{}': {}", command, output);

        if self.profile.is_error_output(&output) {
            return Err(SwitchError::command(command, output));
        }
        Ok(output)
    }

    fn send_config_set(&mut self, commands: &[String]) -> Result<String, SwitchError> {
        let mut output = self.send_command(CONFIGURE_TERMINAL)?;
        for command in commands {
            match self.send_command(command) {
                Ok(out) => {
                    output.push('\n');
                    output.push_str(&out);
                }
                Err(e) => {
                    if let Err(end_err) = self.send_command(END) {
                        warn!("Failed to leave configuration mode: {}", end_err);
                    }
                    return Err(e);
                }
            }
        }
        output.push('\n');
        output.push_str(&self.send_command(END)?);
        Ok(output)
    }

    fn write_line(&mut self, line: &str) -> Result<(), SwitchError> {
        self.channel.write_all(line.as_bytes())?;
        self.channel.write_all(b"\n")?;
        self.channel.flush()?;
        Ok(())
    }

    fn read_until<F>(&mut self, done: F) -> Result<String, SwitchError>
    where
        F: Fn(&str) -> bool,
    {
        let deadline = Instant::now() + self.timeout;
        let mut output = String::new();
        let mut buf = [0u8; 4096];

        loop {
            if done(&output) {
                return Ok(output);
            }
            if Instant::now() >= deadline {
                return Err(SwitchError::Timeout(format!(
                    "no prompt within {:?}, last output: {}",
                    self.timeout,
                    last_line(&output).unwrap_or_default()
                )));
            }

            match self.channel.read(&mut buf) {
                Ok(0) => {
                    if self.channel.eof() {
                        return Err(SwitchError::Session("channel closed by switch".to_string()));
                    }
                    std::thread::sleep(READ_BACKOFF);
                }
                Ok(n) => output.push_str(&String::from_utf8_lossy(&buf[..n])),
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    std::thread::sleep(READ_BACKOFF);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn close(mut self) -> Result<(), SwitchError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), SwitchError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.channel.send_eof()?;
        self.channel.close()?;
        self.session.disconnect(None, "session closed", None)?;
        Ok(())
    }
}

impl Drop for CliShell {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            debug!("Error closing switch session: {}", e);
        }
    }
}

/// Whether output ends at a prompt of this device, in any CLI mode
///
/// IOS shortens long hostnames in configuration-mode prompts, so only the
/// first [`PROMPT_MATCH_LEN`] characters of the base prompt are compared.
fn at_prompt(base_prompt: &str, output: &str) -> bool {
    let prefix = base_prompt
        .char_indices()
        .nth(PROMPT_MATCH_LEN)
        .map_or(base_prompt, |(end, _)| &base_prompt[..end]);

    last_line(output).is_some_and(|line| {
        line.starts_with(prefix) && (line.ends_with('#') || line.ends_with('>'))
    })
}

fn last_line(output: &str) -> Option<&str> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
}

/// Drop the echoed command line and the trailing prompt
fn strip_echo_and_prompt(raw: &str, command: &str) -> String {
    let normalized = raw.replace('\r', "");
    let mut lines: Vec<&str> = normalized.lines().collect();

    if let Some(pos) = lines.iter().position(|line| !command.is_empty() && line.trim_end().ends_with(command)) {
        lines.drain(..=pos);
    }
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }
    lines.pop();

    lines.join("\n").trim_matches('\n').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_echo_and_prompt() {
        let raw = "switch#show vlan brief\r\nVLAN Name\r\n1    default\r\nswitch#";
        assert_eq!(strip_echo_and_prompt(raw, "show vlan brief"), "VLAN Name\n1    default");
    }

    #[test]
    fn test_strip_config_mode_prompt() {
        let raw = "switch(config)#vlan 120\r\nswitch(config-vlan)#";
        assert_eq!(strip_echo_and_prompt(raw, "vlan 120"), "");
    }

    #[test]
    fn test_at_prompt_across_modes() {
        assert!(at_prompt("switch", "output\r\nswitch#"));
        assert!(at_prompt("switch", "switch(config-if)#"));
        assert!(!at_prompt("switch", "Password:"));
        assert!(!at_prompt("switch", "other#"));
    }

    #[test]
    fn test_at_prompt_with_truncated_hostname() {
        let base = "core-access-switch-bldg4";
        assert!(at_prompt(base, "core-access-switch-bldg4#"));
        assert!(at_prompt(base, "core-access-switch-b(config)#"));
        assert!(at_prompt(base, "core-access-swit(config-if)#"));
        assert!(!at_prompt(base, "core-access-sw(config)#"));
        assert!(!at_prompt(base, "edge-access-switch-b(config)#"));
    }

    #[test]
    fn test_last_line() {
        assert_eq!(last_line("a\nswitch>  \n\n"), Some("switch>"));
        assert_eq!(last_line(""), None);
    }

    #[test]
    fn test_settings_debug_hides_secrets() {
        let settings = ConnectionSettings {
            host: "10.0.0.2".to_string(),
            port: 22,
            username: "admin".to_string(),
            password: "hunter2".to_string(),
            enable_secret: Some("en4ble".to_string()),
            profile: DeviceProfile::CiscoIos,
            timeout: Duration::from_secs(30),
        };
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("en4ble"));
    }
}
