//! Forwarding connector
//!
//! The coordinator may ask a task to stream its command output to another
//! member of the cluster. The target is looked up in `forward_addresses`
//! under the task's device name (`/job:<job_name>/task:<task_index>`).

use meshboot_core::domain::address::HostPort;
use meshboot_core::dto::registration::RegistrationResponse;
use std::io;
use std::net::{Shutdown, TcpStream};
use std::os::fd::OwnedFd;
use tracing::{debug, info};

use crate::error::{AgentError, Result};

/// Connection that receives the supervised command's stdout
///
/// The socket is handed to the command as its stdout, so it is kept in
/// blocking mode. [`close`](Self::close) shuts it down for every holder of
/// the descriptor; dropping it on an error path only closes this handle.
#[derive(Debug)]
pub struct ForwardingConnection {
    address: HostPort,
    stream: TcpStream,
}

impl ForwardingConnection {
    /// Opens the forwarding connection requested for this task, if any
    ///
    /// # Returns
    /// `None` when the coordinator did not ask this task to forward output.
    /// A target that cannot be reached is an error; output never silently
    /// falls back to the local stdout.
    pub async fn open(response: &RegistrationResponse) -> Result<Option<Self>> {
        let Some(address) = response.forward_address() else {
            debug!("No forwarding target for {}", response.task_device());
            return Ok(None);
        };

        let forwarding_error = |source| AgentError::Forwarding {
            address: address.clone(),
            source,
        };

        let stream = tokio::net::TcpStream::connect((address.host.as_str(), address.port))
            .await
            .map_err(forwarding_error)?
            .into_std()
            .map_err(forwarding_error)?;
        stream.set_nonblocking(false).map_err(forwarding_error)?;

        info!(target_addr = %address, "Forwarding command output");

        Ok(Some(Self {
            address: address.clone(),
            stream,
        }))
    }

    /// New descriptor for the socket, to become a command's stdout
    pub fn stdout(&self) -> io::Result<OwnedFd> {
        Ok(OwnedFd::from(self.stream.try_clone()?))
    }

    /// Shuts down the sending side and closes the connection
    ///
    /// The peer sees EOF even if a background process of the command still
    /// holds a copy of the descriptor.
    pub fn close(self) {
        if let Err(e) = self.stream.shutdown(Shutdown::Write) {
            debug!(target_addr = %self.address, "Forwarding connection shutdown: {}", e);
        }
        debug!(target_addr = %self.address, "Closed forwarding connection");
    }
}
