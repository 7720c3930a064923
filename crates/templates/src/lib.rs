//! kvmop templates: desired state of a KVM guest cluster.
//!
//! Every builder is a pure function of the [`ClusterSpec`]; rendering the same
//! spec twice yields equal objects.

#![forbid(unsafe_code)]

pub mod bundle;
pub mod key;
pub mod network;
pub mod storage;
pub mod workload;

use k8s_openapi::{
    api::{
        apps::v1::Deployment,
        core::v1::{ConfigMap, Namespace, PersistentVolumeClaim, Service, ServiceAccount},
        networking::v1::Ingress,
    },
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
};
use kvmop_core::{ClusterSpec, Result};
use kvmop_resource::DesiredStates;

pub use bundle::{version_bundle, BUNDLE_NAME, BUNDLE_VERSION};

#[derive(Debug, Clone, Copy, Default)]
pub struct KvmTemplates;

impl DesiredStates for KvmTemplates {
    fn namespace(&self, spec: &ClusterSpec) -> Result<Namespace> {
        Ok(Namespace {
            metadata: ObjectMeta {
                name: Some(spec.namespace().to_string()),
                labels: Some(key::cluster_labels(spec)),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    fn service_accounts(&self, spec: &ClusterSpec) -> Result<Vec<ServiceAccount>> {
        Ok(vec![ServiceAccount {
            metadata: ObjectMeta {
                name: Some(key::service_account_name(spec)),
                labels: Some(key::cluster_labels(spec)),
                ..Default::default()
            },
            ..Default::default()
        }])
    }

    fn config_maps(&self, spec: &ClusterSpec) -> Result<Vec<ConfigMap>> {
        Ok(spec.nodes().map(|(role, node)| workload::config_map(spec, role, node)).collect())
    }

    fn deployments(&self, spec: &ClusterSpec) -> Result<Vec<Deployment>> {
        Ok(spec.nodes().map(|(role, node)| workload::deployment(spec, role, node)).collect())
    }

    fn ingresses(&self, spec: &ClusterSpec) -> Result<Vec<Ingress>> {
        Ok(network::ingresses(spec))
    }

    fn volume_claims(&self, spec: &ClusterSpec) -> Result<Vec<PersistentVolumeClaim>> {
        Ok(storage::volume_claims(spec))
    }

    fn services(&self, spec: &ClusterSpec) -> Result<Vec<Service>> {
        Ok(network::services(spec))
    }
}
