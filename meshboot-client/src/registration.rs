//! Registration handshake

use meshboot_core::codec;
use meshboot_core::domain::address::SelfAddress;
use meshboot_core::domain::task::TaskId;
use meshboot_core::dto::registration::{
    Acknowledgement, RegistrationRequest, RegistrationResponse,
};
use std::io;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::CoordinatorClient;
use crate::error::{ClientError, Result};

impl CoordinatorClient {
    // =============================================================================
    // Registration
    // =============================================================================

    /// Register this task with the coordinator
    ///
    /// Performs the full round trip over one fresh connection:
    /// connect, send the request, receive the response, send the
    /// acknowledgement, close. The response is only returned once the
    /// acknowledgement has been flushed.
    ///
    /// # Arguments
    /// * `task_id` - Identity assigned to this task at submission time
    /// * `address` - The address this task discovered for itself
    ///
    /// # Returns
    /// The coordinator's registration response, undecorated and unvalidated
    /// beyond its structure
    pub async fn register(
        &self,
        task_id: &TaskId,
        address: &SelfAddress,
    ) -> Result<RegistrationResponse> {
        info!(coordinator = %self.address, task_id = %task_id, "Connecting to coordinator");

        let mut stream = TcpStream::connect((self.address.host.as_str(), self.address.port))
            .await
            .map_err(|source| ClientError::Connect {
                address: self.address.to_string(),
                source,
            })?;

        let request = RegistrationRequest {
            task_id: task_id.clone(),
            address: address.clone(),
        };
        let sent = codec::write_frame(&mut stream, &request).await?;
        debug!(bytes = sent, address = %address, "Sent registration request");

        let response: RegistrationResponse =
            codec::read_frame(&mut stream, self.max_frame_len).await?;
        debug!(
            job_name = %response.job_name,
            task_index = response.task_index,
            "Received registration response"
        );

        codec::write_frame(&mut stream, &Acknowledgement)
            .await
            .map_err(|e| ClientError::Acknowledge(into_io_error(e)))?;

        if let Err(e) = stream.shutdown().await {
            // The ack is already flushed; a peer that hung up first is fine
            debug!("Coordinator connection shutdown: {}", e);
        }

        info!(
            task_id = %task_id,
            "Registered as /job:{}/task:{}",
            response.job_name, response.task_index
        );

        Ok(response)
    }
}

fn into_io_error(err: codec::FrameError) -> io::Error {
    match err {
        codec::FrameError::Io(e) => e,
        other => io::Error::other(other),
    }
}
