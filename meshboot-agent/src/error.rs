//! Agent error taxonomy
//!
//! Every error is fatal. Nothing here is retried; an external supervisor is
//! expected to restart the whole task if it wants another attempt.

use meshboot_client::ClientError;
use meshboot_core::domain::address::HostPort;
use meshboot_core::domain::cluster::TopologyError;
use std::fmt;
use std::io;
use thiserror::Error;

use crate::service::server::ServerError;
use crate::service::shell::CommandStatus;
use crate::template::TemplateError;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// User-supplied hook commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Initializer,
    Finalizer,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hook::Initializer => write!(f, "initializer"),
            Hook::Finalizer => write!(f, "finalizer"),
        }
    }
}

/// Errors that end the task
#[derive(Debug, Error)]
pub enum AgentError {
    /// No local port could be claimed, or the hostname is unavailable
    #[error("address discovery failed: {0}")]
    AddressDiscovery(#[source] io::Error),

    /// Connecting, sending, receiving or decoding during registration failed
    #[error("registration handshake failed: {0}")]
    Handshake(#[from] ClientError),

    /// The response names a role or index the cluster does not have
    #[error("invalid topology: {0}")]
    Topology(#[from] TopologyError),

    /// The command template cannot be expanded
    #[error("invalid command template: {0}")]
    Template(#[from] TemplateError),

    /// The forwarding target could not be reached
    #[error("failed to open forwarding connection to {address}: {source}")]
    Forwarding {
        address: HostPort,
        #[source]
        source: io::Error,
    },

    /// A hook exited unsuccessfully
    #[error("{hook} failed with {status}")]
    Hook { hook: Hook, status: CommandStatus },

    /// The main command exited unsuccessfully
    #[error("command failed with {status}")]
    Command { status: CommandStatus },

    /// The compute server could not be started
    #[error("failed to start compute server: {0}")]
    ServerStart(#[source] ServerError),

    /// A command could not be run, or its output could not be forwarded
    #[error("failed to run {what}: {source}")]
    Io {
        what: String,
        #[source]
        source: io::Error,
    },
}

impl AgentError {
    /// Process exit code for this error
    ///
    /// A failed main command passes its own exit code through; everything
    /// else (including a command killed by a signal) exits with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            AgentError::Command {
                status: CommandStatus { code: Some(code) },
            } => u8::try_from(*code).ok().filter(|c| *c != 0).unwrap_or(1),
            _ => 1,
        }
    }
}
