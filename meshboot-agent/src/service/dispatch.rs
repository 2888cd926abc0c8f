//! Role dispatcher
//!
//! Decides, once, what a registered task does with the rest of its life:
//! - no `cmd` in the response: host a compute server and wait for it
//! - `cmd` present: run the command with its hooks, optionally forwarding
//!   stdout to a peer
//!
//! The topology is validated before either branch touches anything.

use meshboot_core::dto::registration::RegistrationResponse;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{AgentError, Hook, Result};
use crate::forward::ForwardingConnection;
use crate::service::shell::OutputSink;
use crate::service::{ServerRuntime, Shell};
use crate::shutdown;
use crate::template::{self, TemplateVars};

/// How a dispatched task finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The compute server stopped (or was interrupted)
    ServerStopped,
    /// The command and its hooks succeeded
    CommandCompleted,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::ServerStopped => write!(f, "server stopped"),
            Outcome::CommandCompleted => write!(f, "command completed"),
        }
    }
}

/// Dispatches a registration response to server mode or command mode
pub struct Dispatcher {
    shell: Arc<dyn Shell>,
    server: Arc<dyn ServerRuntime>,
}

impl Dispatcher {
    /// Creates a new dispatcher
    ///
    /// # Arguments
    /// * `shell` - Runs hooks and the task command
    /// * `server` - Starts the compute server in server mode
    pub fn new(shell: Arc<dyn Shell>, server: Arc<dyn ServerRuntime>) -> Self {
        Self { shell, server }
    }

    /// Runs the task described by `response` to completion
    pub async fn dispatch(&self, response: &RegistrationResponse) -> Result<Outcome> {
        let own_address = response.validate_topology()?;
        info!(
            job_name = %response.job_name,
            task_index = response.task_index,
            address = %own_address,
            "Dispatching task"
        );

        match response.cmd.as_deref() {
            None => self.run_server(response).await,
            Some(cmd) => self.run_command(response, cmd).await,
        }
    }

    /// Server mode: start the server and block until it stops
    ///
    /// Anything that ends the join, including a server error or an interrupt
    /// signal, counts as normal termination.
    async fn run_server(&self, response: &RegistrationResponse) -> Result<Outcome> {
        let server = self
            .server
            .start(response.server_def())
            .await
            .map_err(AgentError::ServerStart)?;

        tokio::select! {
            joined = server.join() => {
                if let Err(e) = joined {
                    warn!("Compute server stopped with error: {}", e);
                } else {
                    info!("Compute server stopped");
                }
            }
            _ = shutdown::wait_for_signal() => {
                info!("Interrupted while joining compute server");
            }
        }

        Ok(Outcome::ServerStopped)
    }

    /// Command mode: initializer, command, finalizer
    ///
    /// The finalizer runs whenever the initializer succeeded, whatever the
    /// command did. A command failure wins over a finalizer failure.
    async fn run_command(&self, response: &RegistrationResponse, cmd: &str) -> Result<Outcome> {
        let vars = TemplateVars::from_cluster(
            &response.cluster_def,
            &response.job_name,
            response.task_index,
        )?;
        let command = template::render(cmd, &vars)?;
        let cwd = response.cwd.as_deref().map(Path::new);

        let forward = ForwardingConnection::open(response).await?;

        if let Some(initializer) = response.extra_config.initializer.as_deref() {
            self.run_hook(Hook::Initializer, initializer).await?;
        }

        info!(cwd = ?cwd, "Running command: {}", command);
        let main = match forward.as_ref().map(ForwardingConnection::stdout).transpose() {
            Ok(sink) => self.run_main(&command, cwd, sink).await,
            Err(source) => Err(AgentError::Io {
                what: "forwarding connection".to_string(),
                source,
            }),
        };

        let finalized = match response.extra_config.finalizer.as_deref() {
            Some(finalizer) => {
                info!("Running clean up command {}", finalizer);
                self.run_hook(Hook::Finalizer, finalizer).await
            }
            None => Ok(()),
        };

        if let Some(conn) = forward {
            conn.close();
        }

        match (main, finalized) {
            (Err(e), Err(cleanup)) => {
                error!("Finalizer also failed: {}", cleanup);
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
            (Ok(()), Err(cleanup)) => Err(cleanup),
            (Ok(()), Ok(())) => Ok(Outcome::CommandCompleted),
        }
    }

    async fn run_main(
        &self,
        command: &str,
        cwd: Option<&Path>,
        sink: Option<OutputSink>,
    ) -> Result<()> {
        let status = self
            .shell
            .run(command, cwd, sink)
            .await
            .map_err(|source| AgentError::Io {
                what: "command".to_string(),
                source,
            })?;

        if status.success() {
            info!("Command finished successfully");
            Ok(())
        } else {
            warn!("Command failed with {}", status);
            Err(AgentError::Command { status })
        }
    }

    async fn run_hook(&self, hook: Hook, command: &str) -> Result<()> {
        let status = self
            .shell
            .run(command, None, None)
            .await
            .map_err(|source| AgentError::Io {
                what: hook.to_string(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(AgentError::Hook { hook, status })
        }
    }
}
