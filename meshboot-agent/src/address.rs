//! Self-address discovery
//!
//! Before registering, a task claims a free port by binding a socket to an
//! OS-assigned ephemeral port. The socket never listens; it only keeps the
//! port reserved while the coordinator learns about it.

use meshboot_core::domain::address::{HostPort, SelfAddress};
use std::io;
use std::net::{IpAddr, SocketAddr};
use tokio::net::TcpSocket;
use tracing::debug;

/// An ephemeral port held for this task, together with its public address
#[derive(Debug)]
pub struct PortReservation {
    socket: TcpSocket,
    address: SelfAddress,
}

impl PortReservation {
    /// Binds an ephemeral port and builds the task's self address
    ///
    /// # Arguments
    /// * `bind_host` - Local interface to bind, usually `0.0.0.0`
    /// * `advertise_host` - Host name to publish instead of the local hostname
    pub fn acquire(bind_host: IpAddr, advertise_host: Option<&str>) -> io::Result<Self> {
        let socket = match bind_host {
            IpAddr::V4(_) => TcpSocket::new_v4()?,
            IpAddr::V6(_) => TcpSocket::new_v6()?,
        };
        socket.set_reuseaddr(true)?;
        socket.bind(SocketAddr::new(bind_host, 0))?;

        let port = socket.local_addr()?.port();
        let host = match advertise_host {
            Some(host) => host.to_string(),
            None => local_hostname()?,
        };

        let address = HostPort::new(host, port);
        debug!(bind = %bind_host, address = %address, "Reserved ephemeral port");

        Ok(Self { socket, address })
    }

    pub fn address(&self) -> &SelfAddress {
        &self.address
    }

    /// Gives up the port so another process (e.g. the compute server) can bind it
    pub fn release(self) -> SelfAddress {
        drop(self.socket);
        debug!(address = %self.address, "Released ephemeral port");
        self.address
    }
}

fn local_hostname() -> io::Result<String> {
    hostname::get()?
        .into_string()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "hostname is not valid UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn test_acquire_uses_local_hostname() {
        let reservation = PortReservation::acquire(IpAddr::V4(Ipv4Addr::UNSPECIFIED), None).unwrap();
        let address = reservation.address();

        assert_ne!(address.port, 0);
        assert_eq!(address.host, local_hostname().unwrap());
    }

    #[tokio::test]
    async fn test_acquire_with_advertised_host() {
        let reservation =
            PortReservation::acquire(IpAddr::V4(Ipv4Addr::LOCALHOST), Some("node-7.internal"))
                .unwrap();
        assert_eq!(reservation.address().host, "node-7.internal");
    }

    #[tokio::test]
    async fn test_reservations_get_distinct_ports() {
        let first = PortReservation::acquire(IpAddr::V4(Ipv4Addr::LOCALHOST), Some("a")).unwrap();
        let second = PortReservation::acquire(IpAddr::V4(Ipv4Addr::LOCALHOST), Some("a")).unwrap();
        assert_ne!(first.address().port, second.address().port);
    }

    #[tokio::test]
    async fn test_released_port_can_be_bound() {
        let reservation =
            PortReservation::acquire(IpAddr::V4(Ipv4Addr::LOCALHOST), Some("localhost")).unwrap();
        let address = reservation.release();

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", address.port))
            .await
            .unwrap();
        assert_eq!(listener.local_addr().unwrap().port(), address.port);
    }
}
