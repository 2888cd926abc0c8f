//! Meshboot Agent
//!
//! Bootstraps one task of a distributed compute cluster.
//!
//! Architecture:
//! - Address: reserve an ephemeral port and name this task's endpoint
//! - Client: register with the coordinator and receive the assignment
//! - Service: run the assigned role (compute server or templated command)
//! - Forward: stream command output to a collector when one is assigned
//!
//! The agent exits with the command's exit code in command mode, 0 when a
//! server stops, and 1 on any bootstrap failure.

mod address;
mod bootstrap;
mod config;
mod error;
mod forward;
mod service;
mod shutdown;
mod template;

use anyhow::Context;
use clap::Parser;
use meshboot_core::codec::DEFAULT_MAX_FRAME_LEN;
use meshboot_core::domain::address::HostPort;
use meshboot_core::domain::task::TaskId;
use std::net::IpAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, DEFAULT_SHELL};
use crate::service::{Dispatcher, ProcessServerRuntime, SystemShell};

#[derive(Parser)]
#[command(name = "meshboot-agent")]
#[command(about = "Registers a cluster task with its coordinator and runs its role", long_about = None)]
#[command(version)]
struct Cli {
    /// Task identity assigned at submission time
    task_id: String,

    /// Coordinator address as host:port
    coordinator: HostPort,

    /// Shell used to run hooks, commands and the server launcher
    #[arg(long, env = "MESHBOOT_SHELL", default_value = DEFAULT_SHELL)]
    shell: String,

    /// Command that starts the compute server in server mode
    #[arg(long, env = "MESHBOOT_SERVER_COMMAND")]
    server_command: Option<String>,

    /// Interface to reserve the ephemeral port on
    #[arg(long, env = "MESHBOOT_BIND_HOST", default_value = "0.0.0.0")]
    bind_host: IpAddr,

    /// Host name to publish instead of the local hostname
    #[arg(long, env = "MESHBOOT_ADVERTISE_HOST")]
    advertise_host: Option<String>,

    /// Largest registration response accepted, in bytes
    #[arg(long, env = "MESHBOOT_MAX_FRAME_BYTES", default_value_t = DEFAULT_MAX_FRAME_LEN)]
    max_frame_bytes: usize,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<Config> {
        let config = Config {
            shell: self.shell,
            server_command: self.server_command,
            bind_host: self.bind_host,
            advertise_host: self.advertise_host,
            max_frame_bytes: self.max_frame_bytes,
            ..Config::new(TaskId::new(self.task_id), self.coordinator)
        };
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging; stdout belongs to the task's command
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meshboot_agent=info,meshboot_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        task_id = %config.task_id,
        coordinator = %config.coordinator,
        "Starting Meshboot Agent"
    );

    let dispatcher = Dispatcher::new(
        Arc::new(SystemShell::new(config.shell.clone())),
        Arc::new(ProcessServerRuntime::new(
            config.shell.clone(),
            config.server_command.clone(),
        )),
    );

    match bootstrap::run(&config, &dispatcher).await {
        Ok(outcome) => {
            info!(task_id = %config.task_id, "Task finished: {}", outcome);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(task_id = %config.task_id, "Task failed: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
