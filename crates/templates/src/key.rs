//! Names, labels and constants shared by the templates.

use std::collections::BTreeMap;

use kvmop_core::{ClusterSpec, Node, Role};

pub const MASTER_ID: &str = "master";
pub const WORKER_ID: &str = "worker";

pub const API_ID: &str = "api";
pub const ETCD_ID: &str = "etcd";

pub const K8S_KVM_CONTAINER: &str = "k8s-kvm";
pub const K8S_KVM_IMAGE: &str = "quay.io/giantswarm/k8s-kvm:0.4.1";

pub const COREOS_IMAGE_DIR: &str = "/home/core/images/";
pub const CLOUD_CONFIG_DIR: &str = "/cloudconfig/";
pub const CLOUD_CONFIG_PATH: &str = "/cloudconfig/user_data";
pub const ETCD_DATA_DIR: &str = "/etc/kubernetes/data/etcd/";

pub const HEALTH_ENDPOINT: &str = "/healthz";
pub const PROBE_HOST: &str = "127.0.0.1";
pub const LIVENESS_PORT: i32 = 23001;
pub const INITIAL_DELAY_SECONDS: i32 = 60;
pub const TIMEOUT_SECONDS: i32 = 3;
pub const PERIOD_SECONDS: i32 = 20;
pub const FAILURE_THRESHOLD: i32 = 2;
pub const SUCCESS_THRESHOLD: i32 = 1;

pub const SSL_PASSTHROUGH_ANNOTATION: &str = "ingress.kubernetes.io/ssl-passthrough";
pub const HOSTNAME_TOPOLOGY_KEY: &str = "kubernetes.io/hostname";

pub const ETCD_STORAGE_SIZE: &str = "15Gi";

pub const WORKER_HTTP_PORT: i32 = 30010;
pub const WORKER_HTTPS_PORT: i32 = 30011;

pub fn deployment_name(role: Role, node: &Node) -> String {
    format!("{}-{}", role.as_str(), node.id)
}

pub fn config_map_name(spec: &ClusterSpec, role: Role, node: &Node) -> String {
    format!("{}-{}-{}", role.as_str(), spec.id, node.id)
}

pub fn volume_claim_name(spec: &ClusterSpec, node: &Node) -> String {
    format!("pvc-{}-etcd-{}-{}", MASTER_ID, spec.id, node.id)
}

pub fn service_account_name(spec: &ClusterSpec) -> String {
    spec.id.clone()
}

pub fn etcd_host_path(spec: &ClusterSpec, node: &Node) -> String {
    format!("/home/core/volumes/{}-{}", spec.id, node.id)
}

pub fn disk(node: &Node) -> String {
    format!("{:.0}G", node.disk_gb)
}

/// Labels carried by every object of the cluster.
pub fn cluster_labels(spec: &ClusterSpec) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("cluster".to_string(), spec.id.clone()),
        ("customer".to_string(), spec.customer.clone()),
    ])
}

pub fn app_labels(spec: &ClusterSpec, app: &str) -> BTreeMap<String, String> {
    let mut labels = cluster_labels(spec);
    labels.insert("app".into(), app.into());
    labels
}

pub fn node_labels(spec: &ClusterSpec, role: Role, node: &Node) -> BTreeMap<String, String> {
    let mut labels = app_labels(spec, role.as_str());
    labels.insert("node".into(), node.id.clone());
    labels
}
