//! Compute-server definition
//!
//! Configuration handed to the compute-server runtime when a task runs in
//! server mode: the cluster it belongs to, its place in that cluster, the
//! transport protocol and how many devices of each kind it may use.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::cluster::ClusterDef;

/// Device-count key for CPUs
pub const CPU_DEVICE: &str = "CPU";

/// Device-count key for GPUs
pub const GPU_DEVICE: &str = "GPU";

/// Device name of a task, e.g. `/job:worker/task:1`
pub fn task_device(job_name: &str, task_index: usize) -> String {
    format!("/job:{}/task:{}", job_name, task_index)
}

/// Server configuration for one task of the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDef {
    pub cluster: ClusterDef,
    pub job_name: String,
    pub task_index: usize,
    pub protocol: String,
    /// Default session device counts, keyed by device kind
    pub device_count: BTreeMap<String, u32>,
}

impl ServerDef {
    pub fn new(
        cluster: ClusterDef,
        job_name: impl Into<String>,
        task_index: usize,
        protocol: impl Into<String>,
        cpus: u32,
        gpus: u32,
    ) -> Self {
        let mut device_count = BTreeMap::new();
        device_count.insert(CPU_DEVICE.to_string(), cpus);
        device_count.insert(GPU_DEVICE.to_string(), gpus);

        Self {
            cluster,
            job_name: job_name.into(),
            task_index,
            protocol: protocol.into(),
            device_count,
        }
    }

    /// Device name of this task, e.g. `/job:worker/task:1`
    pub fn task_device(&self) -> String {
        task_device(&self.job_name, self.task_index)
    }
}
