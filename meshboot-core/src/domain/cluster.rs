//! Cluster topology
//!
//! A cluster is described as a mapping from role name (e.g. `ps`, `worker`)
//! to the ordered list of `host:port` addresses of the tasks in that role.
//! A task's position in its role's list is its task index.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Role name used for parameter-server tasks in command templates
pub const PS_ROLE: &str = "ps";

/// Role name used for worker tasks in command templates
pub const WORKER_ROLE: &str = "worker";

/// Errors raised when the topology does not contain what a task needs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// The role is not a key of the cluster definition
    #[error("role '{0}' is not part of the cluster definition")]
    UnknownRole(String),

    /// The index is past the end of the role's address list
    #[error("task index {index} is out of range for role '{role}' ({len} task(s))")]
    IndexOutOfRange {
        role: String,
        index: usize,
        len: usize,
    },
}

/// Full cluster topology: role name to ordered address list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterDef(BTreeMap<String, Vec<String>>);

impl ClusterDef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a role and its addresses
    pub fn with_role<I, S>(mut self, role: impl Into<String>, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .insert(role.into(), hosts.into_iter().map(Into::into).collect());
        self
    }

    /// Returns the addresses of a role, if the role exists
    pub fn hosts(&self, role: &str) -> Option<&[String]> {
        self.0.get(role).map(Vec::as_slice)
    }

    /// Returns the addresses of a role joined with commas
    pub fn joined_hosts(&self, role: &str) -> Result<String, TopologyError> {
        self.hosts(role)
            .map(|hosts| hosts.join(","))
            .ok_or_else(|| TopologyError::UnknownRole(role.to_string()))
    }

    /// Checks that `role` exists and that `index` points into its list
    ///
    /// Returns the address at that position.
    pub fn validate_role(&self, role: &str, index: usize) -> Result<&str, TopologyError> {
        let hosts = self
            .hosts(role)
            .ok_or_else(|| TopologyError::UnknownRole(role.to_string()))?;

        hosts
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| TopologyError::IndexOutOfRange {
                role: role.to_string(),
                index,
                len: hosts.len(),
            })
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
