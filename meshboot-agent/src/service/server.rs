//! Compute-server service
//!
//! In server mode the task hosts a long-running compute server bound into the
//! cluster topology. The server runtime itself is an external program; this
//! module only knows how to start it with a [`ServerDef`] and wait for it.

use async_trait::async_trait;
use meshboot_core::domain::server::ServerDef;
use std::io;
use thiserror::Error;
use tokio::process::Child;
use tracing::{debug, info};

use crate::service::shell::{CommandStatus, SystemShell};

/// Environment variable carrying the JSON-encoded server definition
pub const SERVER_DEF_ENV: &str = "MESHBOOT_SERVER_DEF";

/// Errors raised by the compute-server runtime
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("no server launch command configured")]
    NotConfigured,

    #[error("failed to encode server definition: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to launch server: {0}")]
    Spawn(#[source] io::Error),

    #[error("failed to wait for server: {0}")]
    Wait(#[source] io::Error),

    #[error("server exited with {0}")]
    Exited(CommandStatus),
}

/// A started compute server
#[async_trait]
pub trait RunningServer: Send {
    /// Blocks until the server stops
    async fn join(self: Box<Self>) -> Result<(), ServerError>;
}

/// Service trait for starting compute servers
#[async_trait]
pub trait ServerRuntime: Send + Sync {
    /// Starts a server for the given definition
    async fn start(&self, def: ServerDef) -> Result<Box<dyn RunningServer>, ServerError>;
}

/// Server runtime that launches an external server program
///
/// The launch command runs through the shell with the server definition in
/// [`SERVER_DEF_ENV`], plus the task's role in `MESHBOOT_JOB_NAME`,
/// `MESHBOOT_TASK_INDEX` and `MESHBOOT_PROTOCOL` for simple launchers.
pub struct ProcessServerRuntime {
    shell: SystemShell,
    launch_command: Option<String>,
}

impl ProcessServerRuntime {
    /// Creates a new process-backed server runtime
    ///
    /// # Arguments
    /// * `shell` - Shell binary used to interpret the launch command
    /// * `launch_command` - Command that starts the server; `None` disables server mode
    pub fn new(shell: impl Into<String>, launch_command: Option<String>) -> Self {
        Self {
            shell: SystemShell::new(shell),
            launch_command,
        }
    }
}

#[async_trait]
impl ServerRuntime for ProcessServerRuntime {
    async fn start(&self, def: ServerDef) -> Result<Box<dyn RunningServer>, ServerError> {
        let launch = self
            .launch_command
            .as_deref()
            .ok_or(ServerError::NotConfigured)?;

        let encoded = serde_json::to_string(&def)?;

        let mut cmd = self.shell.command(launch, None);
        cmd.env(SERVER_DEF_ENV, encoded)
            .env("MESHBOOT_JOB_NAME", &def.job_name)
            .env("MESHBOOT_TASK_INDEX", def.task_index.to_string())
            .env("MESHBOOT_PROTOCOL", &def.protocol)
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(ServerError::Spawn)?;

        info!(
            pid = ?child.id(),
            protocol = %def.protocol,
            "Started compute server for {}",
            def.task_device()
        );

        Ok(Box::new(ProcessServer { child }))
    }
}

/// Server process started by [`ProcessServerRuntime`]
///
/// The process is killed if the handle is dropped before it exits.
struct ProcessServer {
    child: Child,
}

#[async_trait]
impl RunningServer for ProcessServer {
    async fn join(mut self: Box<Self>) -> Result<(), ServerError> {
        let status = CommandStatus::from(self.child.wait().await.map_err(ServerError::Wait)?);
        debug!("Compute server exited with {}", status);

        if status.success() {
            Ok(())
        } else {
            Err(ServerError::Exited(status))
        }
    }
}
