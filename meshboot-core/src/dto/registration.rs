//! Registration DTOs
//!
//! The handshake is a single round trip:
//! 1. the task sends a [`RegistrationRequest`]
//! 2. the coordinator answers with a [`RegistrationResponse`]
//! 3. the task confirms receipt with an [`Acknowledgement`]

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;

use crate::domain::address::{HostPort, SelfAddress};
use crate::domain::cluster::{ClusterDef, TopologyError};
use crate::domain::server::{self, ServerDef};
use crate::domain::task::TaskId;

/// Literal value of the acknowledgement frame
pub const ACK_LITERAL: &str = "ok";

/// Transport protocol used when the coordinator does not name one
pub const DEFAULT_PROTOCOL: &str = "grpc";

/// Request sent by a task to register with the coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    /// Identity assigned to the task at submission time
    pub task_id: TaskId,

    /// Address the task discovered for itself
    pub address: SelfAddress,
}

/// Optional setup and cleanup commands, run through the shell
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraConfig {
    /// Runs before the main command; a failure aborts the task
    #[serde(default)]
    pub initializer: Option<String>,

    /// Runs after the main command, whether it succeeded or not
    #[serde(default)]
    pub finalizer: Option<String>,
}

/// Destination for forwarded command output
///
/// Coordinators send either a `[host, port]` pair or a `"host:port"` string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ForwardAddressRepr", into = "ForwardAddressRepr")]
pub struct ForwardAddress(pub HostPort);

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ForwardAddressRepr {
    Pair(String, u16),
    Text(String),
}

impl TryFrom<ForwardAddressRepr> for ForwardAddress {
    type Error = String;

    fn try_from(value: ForwardAddressRepr) -> Result<Self, Self::Error> {
        match value {
            ForwardAddressRepr::Pair(host, port) => Ok(Self(HostPort::new(host, port))),
            ForwardAddressRepr::Text(text) => text
                .parse::<HostPort>()
                .map(Self)
                .map_err(|e| e.to_string()),
        }
    }
}

impl From<ForwardAddress> for ForwardAddressRepr {
    fn from(value: ForwardAddress) -> Self {
        ForwardAddressRepr::Pair(value.0.host, value.0.port)
    }
}

/// Registration response: the task's topology, role and work assignment
///
/// Received once and treated as immutable for the rest of the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationResponse {
    /// Full cluster topology
    pub cluster_def: ClusterDef,

    /// Role assigned to this task
    pub job_name: String,

    /// Position of this task within its role's address list
    pub task_index: usize,

    /// CPU count to bind into the server configuration
    #[serde(deserialize_with = "deserialize_count")]
    pub cpus: u32,

    /// GPU count to bind into the server configuration
    #[serde(deserialize_with = "deserialize_count")]
    pub gpus: u32,

    /// Command template; when absent the task runs a compute server
    #[serde(default)]
    pub cmd: Option<String>,

    /// Working directory of the command
    #[serde(default)]
    pub cwd: Option<String>,

    /// Initializer/finalizer hooks
    #[serde(default, deserialize_with = "null_as_default")]
    pub extra_config: ExtraConfig,

    /// Output forwarding targets keyed by task device name
    #[serde(default)]
    pub forward_addresses: Option<HashMap<String, ForwardAddress>>,

    /// Transport protocol of the compute server
    #[serde(default = "default_protocol", deserialize_with = "protocol_or_default")]
    pub protocol: String,
}

impl RegistrationResponse {
    /// Checks that `job_name`/`task_index` point into `cluster_def`
    pub fn validate_topology(&self) -> Result<&str, TopologyError> {
        self.cluster_def.validate_role(&self.job_name, self.task_index)
    }

    /// Device name of this task, e.g. `/job:worker/task:1`
    ///
    /// This is the key looked up in `forward_addresses`.
    pub fn task_device(&self) -> String {
        server::task_device(&self.job_name, self.task_index)
    }

    /// Forwarding target for this task, if the coordinator asked for one
    pub fn forward_address(&self) -> Option<&HostPort> {
        self.forward_addresses
            .as_ref()?
            .get(&self.task_device())
            .map(|addr| &addr.0)
    }

    /// Whether the task should run a compute server instead of a command
    pub fn is_server_mode(&self) -> bool {
        self.cmd.is_none()
    }

    /// Builds the compute-server configuration for this task
    pub fn server_def(&self) -> ServerDef {
        ServerDef::new(
            self.cluster_def.clone(),
            self.job_name.clone(),
            self.task_index,
            self.protocol.clone(),
            self.cpus,
            self.gpus,
        )
    }
}

/// Acknowledgement sent by the task once the response has been received
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Acknowledgement;

impl Serialize for Acknowledgement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(ACK_LITERAL)
    }
}

impl<'de> Deserialize<'de> for Acknowledgement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        if value == ACK_LITERAL {
            Ok(Acknowledgement)
        } else {
            Err(de::Error::invalid_value(
                de::Unexpected::Str(&value),
                &"the acknowledgement literal \"ok\"",
            ))
        }
    }
}

fn default_protocol() -> String {
    DEFAULT_PROTOCOL.to_string()
}

fn protocol_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_protocol))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts a non-negative integer or float; floats are truncated toward zero
///
/// Resource offers are frequently fractional (`cpus: 1.5`).
fn deserialize_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let number = serde_json::Number::deserialize(deserializer)?;

    let count = if let Some(n) = number.as_u64() {
        n
    } else {
        match number.as_f64() {
            Some(f) if f.is_finite() && f >= 0.0 => f.trunc() as u64,
            _ => {
                return Err(de::Error::custom(format!(
                    "resource count must be a non-negative number, got {}",
                    number
                )));
            }
        }
    };

    u32::try_from(count)
        .map_err(|_| de::Error::custom(format!("resource count {} is too large", count)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_response() -> serde_json::Value {
        json!({
            "cluster_def": {"ps": ["h1:1"], "worker": ["h2:2", "h3:3"]},
            "job_name": "worker",
            "task_index": 1,
            "cpus": 2,
            "gpus": 0,
            "cmd": "python train.py",
            "cwd": "/srv/job",
            "extra_config": {"initializer": "mkdir -p out", "finalizer": "rm -rf out"},
            "forward_addresses": {"/job:worker/task:1": ["h4", 9000]},
            "protocol": "grpc+verbs"
        })
    }

    #[test]
    fn test_decode_full_response() {
        let response: RegistrationResponse = serde_json::from_value(full_response()).unwrap();

        assert_eq!(response.job_name, "worker");
        assert_eq!(response.task_index, 1);
        assert_eq!(response.cpus, 2);
        assert_eq!(response.cmd.as_deref(), Some("python train.py"));
        assert_eq!(response.extra_config.finalizer.as_deref(), Some("rm -rf out"));
        assert_eq!(response.protocol, "grpc+verbs");
        assert_eq!(response.forward_address(), Some(&HostPort::new("h4", 9000)));
        assert_eq!(response.validate_topology().unwrap(), "h3:3");
        assert!(!response.is_server_mode());
    }

    #[test]
    fn test_decode_minimal_response_defaults() {
        let response: RegistrationResponse = serde_json::from_value(json!({
            "cluster_def": {"worker": ["h:1"]},
            "job_name": "worker",
            "task_index": 0,
            "cpus": 1,
            "gpus": 0,
            "cmd": null,
            "extra_config": null,
            "forward_addresses": null,
            "protocol": null
        }))
        .unwrap();

        assert!(response.is_server_mode());
        assert_eq!(response.extra_config, ExtraConfig::default());
        assert_eq!(response.protocol, DEFAULT_PROTOCOL);
        assert_eq!(response.forward_address(), None);
    }

    #[test]
    fn test_fractional_cpus_truncate() {
        let mut value = full_response();
        value["cpus"] = json!(1.9);
        value["gpus"] = json!(1.0);
        let response: RegistrationResponse = serde_json::from_value(value).unwrap();
        assert_eq!(response.cpus, 1);
        assert_eq!(response.gpus, 1);
    }

    #[test]
    fn test_negative_or_textual_counts_rejected() {
        let mut value = full_response();
        value["cpus"] = json!(-1);
        assert!(serde_json::from_value::<RegistrationResponse>(value).is_err());

        let mut value = full_response();
        value["gpus"] = json!("two");
        assert!(serde_json::from_value::<RegistrationResponse>(value).is_err());
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let mut value = full_response();
        value.as_object_mut().unwrap().remove("job_name");
        assert!(serde_json::from_value::<RegistrationResponse>(value).is_err());
    }

    #[test]
    fn test_forward_address_forms() {
        let pair: ForwardAddress = serde_json::from_value(json!(["h4", 9000])).unwrap();
        let text: ForwardAddress = serde_json::from_value(json!("h4:9000")).unwrap();
        assert_eq!(pair, text);
        assert!(serde_json::from_value::<ForwardAddress>(json!("h4")).is_err());
    }

    #[test]
    fn test_forward_address_only_for_own_device() {
        let mut value = full_response();
        value["task_index"] = json!(0);
        let response: RegistrationResponse = serde_json::from_value(value).unwrap();
        assert_eq!(response.task_device(), "/job:worker/task:0");
        assert_eq!(response.forward_address(), None);
    }

    #[test]
    fn test_acknowledgement_literal() {
        assert_eq!(serde_json::to_string(&Acknowledgement).unwrap(), "\"ok\"");
        assert!(serde_json::from_str::<Acknowledgement>("\"ok\"").is_ok());
        assert!(serde_json::from_str::<Acknowledgement>("\"nope\"").is_err());
    }

    #[test]
    fn test_request_wire_shape() {
        let request = RegistrationRequest {
            task_id: TaskId::new("task-7"),
            address: HostPort::new("node-a", 41000),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"task_id": "task-7", "address": "node-a:41000"})
        );
    }
}
