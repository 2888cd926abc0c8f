//! Task bootstrap
//!
//! The whole life of a task, in order:
//! 1. claim a port and build the self address
//! 2. register with the coordinator
//! 3. release the port and dispatch the assigned role

use meshboot_client::CoordinatorClient;
use tracing::info;

use crate::address::PortReservation;
use crate::config::Config;
use crate::error::{AgentError, Result};
use crate::service::{Dispatcher, Outcome};

/// Runs the task described by `config` to completion
pub async fn run(config: &Config, dispatcher: &Dispatcher) -> Result<Outcome> {
    let reservation = PortReservation::acquire(config.bind_host, config.advertise_host.as_deref())
        .map_err(AgentError::AddressDiscovery)?;
    info!(address = %reservation.address(), "Discovered self address");

    let client = CoordinatorClient::new(config.coordinator.clone())
        .with_max_frame_len(config.max_frame_bytes);
    let response = client
        .register(&config.task_id, reservation.address())
        .await?;

    reservation.release();

    dispatcher.dispatch(&response).await
}
