//! Network addresses
//!
//! Every address in the protocol travels as a `host:port` string. [`HostPort`]
//! is the parsed form of that string.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a `host:port` string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address '{0}' is missing a ':port' suffix")]
    MissingPort(String),

    #[error("address '{0}' has an empty host")]
    EmptyHost(String),

    #[error("address '{address}' has an invalid port '{port}'")]
    InvalidPort { address: String, port: String },
}

/// A `(host, port)` pair
///
/// Parsing splits on the last `:` so bracketless IPv6 literals such as
/// `::1:8080` still yield the right port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HostPort {
    pub host: String,
    pub port: u16,
}

/// The address a task advertises for itself during registration
pub type SelfAddress = HostPort;

impl HostPort {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for HostPort {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| AddressError::MissingPort(s.to_string()))?;

        if host.is_empty() {
            return Err(AddressError::EmptyHost(s.to_string()));
        }

        let port = port.parse::<u16>().map_err(|_| AddressError::InvalidPort {
            address: s.to_string(),
            port: port.to_string(),
        })?;

        Ok(Self::new(host, port))
    }
}

impl TryFrom<String> for HostPort {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HostPort> for String {
    fn from(value: HostPort) -> Self {
        value.to_string()
    }
}
