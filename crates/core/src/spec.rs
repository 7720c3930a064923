//! Cluster declarations as recorded by the cluster owner.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Master,
    Worker,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Master => "master",
            Role::Worker => "worker",
        }
    }
}

/// One guest node and the capabilities of the VM backing it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub cpus: u32,
    /// Kubernetes quantity, e.g. `4G`.
    pub memory: String,
    pub disk_gb: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub domain: String,
    pub port: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum EtcdStorage {
    #[default]
    HostPath,
    PersistentVolume,
}

/// Immutable snapshot of one managed cluster's declaration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    pub id: String,
    pub customer: String,
    /// Namespace holding the cluster's objects; defaults to the cluster id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub version_bundle_version: String,
    pub masters: Vec<Node>,
    #[serde(default)]
    pub workers: Vec<Node>,
    pub api: Endpoint,
    pub etcd: Endpoint,
    #[serde(default)]
    pub etcd_storage: EtcdStorage,
}

impl ClusterSpec {
    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(&self.id)
    }

    /// All nodes with their role, masters first.
    pub fn nodes(&self) -> impl Iterator<Item = (Role, &Node)> {
        self.masters
            .iter()
            .map(|n| (Role::Master, n))
            .chain(self.workers.iter().map(|n| (Role::Worker, n)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::validation("cluster id must not be empty"));
        }
        if self.customer.is_empty() {
            return Err(Error::validation(format!("cluster {}: customer must not be empty", self.id)));
        }
        if self.version_bundle_version.is_empty() {
            return Err(Error::validation(format!("cluster {}: version bundle version must not be empty", self.id)));
        }
        if self.masters.is_empty() {
            return Err(Error::validation(format!("cluster {}: at least one master is required", self.id)));
        }
        let mut seen = HashSet::new();
        for (role, node) in self.nodes() {
            if node.id.is_empty() {
                return Err(Error::validation(format!("cluster {}: {} node with empty id", self.id, role.as_str())));
            }
            if !seen.insert(node.id.as_str()) {
                return Err(Error::validation(format!("cluster {}: duplicate node id {}", self.id, node.id)));
            }
            if node.cpus == 0 {
                return Err(Error::validation(format!("cluster {}: node {} must have at least one cpu", self.id, node.id)));
            }
            if node.memory.is_empty() {
                return Err(Error::validation(format!("cluster {}: node {} memory must not be empty", self.id, node.id)));
            }
            if !(node.disk_gb > 0.0) {
                return Err(Error::validation(format!("cluster {}: node {} disk must be positive", self.id, node.id)));
            }
        }
        Ok(())
    }
}
