use k8s_openapi::api::{
    apps::v1::Deployment,
    core::v1::{ConfigMap, Namespace, PersistentVolumeClaim, Service, ServiceAccount},
    networking::v1::Ingress,
};
use kube::api::ObjectMeta;
use kvmop_core::{ClusterSpec, Endpoint, Node, Result};

use crate::desired::DesiredStates;

/// Desired state made of fixed lists, plus a namespace named after the spec.
#[derive(Default)]
pub struct Static {
    pub service_accounts: Vec<ServiceAccount>,
    pub config_maps: Vec<ConfigMap>,
    pub deployments: Vec<Deployment>,
    pub ingresses: Vec<Ingress>,
    pub volume_claims: Vec<PersistentVolumeClaim>,
    pub services: Vec<Service>,
}

impl DesiredStates for Static {
    fn namespace(&self, spec: &ClusterSpec) -> Result<Namespace> {
        Ok(Namespace { metadata: ObjectMeta { name: Some(spec.namespace().to_string()), ..Default::default() }, ..Default::default() })
    }
    fn service_accounts(&self, _spec: &ClusterSpec) -> Result<Vec<ServiceAccount>> {
        Ok(self.service_accounts.clone())
    }
    fn config_maps(&self, _spec: &ClusterSpec) -> Result<Vec<ConfigMap>> {
        Ok(self.config_maps.clone())
    }
    fn deployments(&self, _spec: &ClusterSpec) -> Result<Vec<Deployment>> {
        Ok(self.deployments.clone())
    }
    fn ingresses(&self, _spec: &ClusterSpec) -> Result<Vec<Ingress>> {
        Ok(self.ingresses.clone())
    }
    fn volume_claims(&self, _spec: &ClusterSpec) -> Result<Vec<PersistentVolumeClaim>> {
        Ok(self.volume_claims.clone())
    }
    fn services(&self, _spec: &ClusterSpec) -> Result<Vec<Service>> {
        Ok(self.services.clone())
    }
}

pub fn spec() -> ClusterSpec {
    ClusterSpec {
        id: "c1".into(),
        customer: "acme".into(),
        namespace: None,
        version_bundle_version: "1.0.0".into(),
        masters: vec![Node { id: "m1".into(), cpus: 2, memory: "4G".into(), disk_gb: 20.0 }],
        workers: vec![Node { id: "w1".into(), cpus: 2, memory: "4G".into(), disk_gb: 20.0 }],
        api: Endpoint { domain: "api.c1.example.com".into(), port: 443 },
        etcd: Endpoint { domain: "etcd.c1.example.com".into(), port: 2379 },
        etcd_storage: Default::default(),
    }
}
