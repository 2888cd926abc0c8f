//! Agent configuration
//!
//! Everything the agent needs before it talks to the coordinator: who it is,
//! where the coordinator lives, and how to run commands and servers locally.

use meshboot_core::codec::DEFAULT_MAX_FRAME_LEN;
use meshboot_core::domain::address::HostPort;
use meshboot_core::domain::task::TaskId;
use std::net::{IpAddr, Ipv4Addr};

/// Default shell for hooks, commands and the server launcher
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Agent configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Identity assigned by the coordinator at submission time
    pub task_id: TaskId,

    /// Coordinator address (e.g. "coordinator:5050")
    pub coordinator: HostPort,

    /// Shell used to interpret hooks, commands and the server launcher
    pub shell: String,

    /// Command that starts the compute server in server mode
    pub server_command: Option<String>,

    /// Interface the ephemeral port is bound on
    pub bind_host: IpAddr,

    /// Host name published instead of the local hostname
    pub advertise_host: Option<String>,

    /// Largest registration response accepted, in bytes
    pub max_frame_bytes: usize,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(task_id: TaskId, coordinator: HostPort) -> Self {
        Self {
            task_id,
            coordinator,
            shell: DEFAULT_SHELL.to_string(),
            server_command: None,
            bind_host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            advertise_host: None,
            max_frame_bytes: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.task_id.is_empty() {
            anyhow::bail!("task_id cannot be empty");
        }

        if self.shell.trim().is_empty() {
            anyhow::bail!("shell cannot be empty");
        }

        if self.max_frame_bytes == 0 {
            anyhow::bail!("max_frame_bytes must be greater than 0");
        }

        if matches!(&self.server_command, Some(cmd) if cmd.trim().is_empty()) {
            anyhow::bail!("server_command cannot be blank");
        }

        if matches!(&self.advertise_host, Some(host) if host.trim().is_empty()) {
            anyhow::bail!("advertise_host cannot be blank");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::new(TaskId::new("task-0"), HostPort::new("coordinator", 5050))
    }

    #[test]
    fn test_default_config() {
        let config = config();
        assert_eq!(config.shell, DEFAULT_SHELL);
        assert_eq!(config.bind_host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.max_frame_bytes, DEFAULT_MAX_FRAME_LEN);
        assert!(config.server_command.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = config();

        // Empty task id should fail
        config.task_id = TaskId::new("");
        assert!(config.validate().is_err());
        config.task_id = TaskId::new("task-0");

        // Empty shell should fail
        config.shell = " ".to_string();
        assert!(config.validate().is_err());
        config.shell = DEFAULT_SHELL.to_string();

        // Zero frame limit should fail
        config.max_frame_bytes = 0;
        assert!(config.validate().is_err());
        config.max_frame_bytes = 1024;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_optional_values_rejected() {
        let blank_server = Config {
            server_command: Some(String::new()),
            ..config()
        };
        assert!(blank_server.validate().is_err());

        let blank_host = Config {
            advertise_host: Some(" ".to_string()),
            ..config()
        };
        assert!(blank_host.validate().is_err());

        let filled = Config {
            server_command: Some("exec ps-server".to_string()),
            advertise_host: Some("node-1".to_string()),
            ..config()
        };
        assert!(filled.validate().is_ok());
    }
}
