//! meshboot Rendezvous Client
//!
//! A small client for the coordinator's registration protocol. A task uses it
//! exactly once: connect, send its identity and address, receive its role in
//! the cluster, acknowledge, and hang up.
//!
//! # Example
//!
//! ```no_run
//! use meshboot_client::CoordinatorClient;
//! use meshboot_core::domain::address::HostPort;
//! use meshboot_core::domain::task::TaskId;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = CoordinatorClient::new("coordinator:5050".parse()?);
//!
//!     let response = client
//!         .register(&TaskId::new("task-0"), &HostPort::new("node-a", 41000))
//!         .await?;
//!
//!     println!("Assigned /job:{}/task:{}", response.job_name, response.task_index);
//!     Ok(())
//! }
//! ```

pub mod error;
mod registration;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use meshboot_core::dto::registration::RegistrationResponse;

use meshboot_core::codec::DEFAULT_MAX_FRAME_LEN;
use meshboot_core::domain::address::HostPort;

/// Client for the coordinator's registration endpoint
///
/// Holds no connection between calls; each [`register`](Self::register)
/// opens and closes its own.
#[derive(Debug, Clone)]
pub struct CoordinatorClient {
    /// Address of the coordinator
    address: HostPort,
    /// Largest response frame accepted
    max_frame_len: usize,
}

impl CoordinatorClient {
    /// Create a new coordinator client
    ///
    /// # Arguments
    /// * `address` - The coordinator's `host:port`
    pub fn new(address: HostPort) -> Self {
        Self {
            address,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Override the largest response frame the client will accept
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    /// Get the coordinator address
    pub fn address(&self) -> &HostPort {
        &self.address
    }

    /// Get the response frame limit
    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }
}
