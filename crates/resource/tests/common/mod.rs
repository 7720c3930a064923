#![allow(dead_code)]

use std::sync::Arc;

use k8s_openapi::api::{
    apps::v1::{Deployment, DeploymentSpec, DeploymentStatus},
    core::v1::{ConfigMap, Container, Namespace, NamespaceStatus, PersistentVolumeClaim, PodSpec, PodTemplateSpec, Service, ServiceAccount},
    networking::v1::Ingress,
};
use kube::api::ObjectMeta;
use kvmop_core::{ClusterSpec, Component, Endpoint, Node, Result, VersionBundle};
use kvmop_kubehub::MemoryClients;
use kvmop_resource::{DesiredStates, ResourceSet, ResourceSetConfig, RetryConfig, VERSION_ANNOTATION};

pub const VERSION: &str = "3.1.0";
pub const NS: &str = "c1";

/// Desired state made of fixed lists and a namespace named after the spec.
#[derive(Default, Clone)]
pub struct Fixture {
    pub service_accounts: Vec<ServiceAccount>,
    pub config_maps: Vec<ConfigMap>,
    pub deployments: Vec<Deployment>,
    pub ingresses: Vec<Ingress>,
    pub volume_claims: Vec<PersistentVolumeClaim>,
    pub services: Vec<Service>,
}

impl DesiredStates for Fixture {
    fn namespace(&self, spec: &ClusterSpec) -> Result<Namespace> {
        Ok(Namespace { metadata: meta(spec.namespace()), ..Default::default() })
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

pub fn meta(name: &str) -> ObjectMeta {
    ObjectMeta { name: Some(name.into()), ..Default::default() }
}

pub fn spec() -> ClusterSpec {
    ClusterSpec {
        id: NS.into(),
        customer: "acme".into(),
        namespace: None,
        version_bundle_version: VERSION.into(),
        masters: vec![Node { id: "m1".into(), cpus: 2, memory: "4G".into(), disk_gb: 20.0 }],
        workers: vec![Node { id: "w1".into(), cpus: 2, memory: "4G".into(), disk_gb: 20.0 }],
        api: Endpoint { domain: "api.c1.example.com".into(), port: 443 },
        etcd: Endpoint { domain: "etcd.c1.example.com".into(), port: 2379 },
        etcd_storage: Default::default(),
    }
}

pub fn bundle(version: &str) -> VersionBundle {
    VersionBundle {
        name: "kvm-operator".into(),
        version: version.into(),
        components: vec![Component { name: "kubernetes".into(), version: "1.9.2".into() }],
        changelogs: vec![],
    }
}

pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        initial_delay: std::time::Duration::from_millis(1),
        max_delay: std::time::Duration::from_millis(4),
        multiplier: 2.0,
    }
}

pub fn resource_set(mem: &MemoryClients, templates: Fixture, guest_update_enabled: bool) -> ResourceSet {
    resource_set_for(mem, templates, guest_update_enabled, VERSION)
}

pub fn resource_set_for(mem: &MemoryClients, templates: Fixture, guest_update_enabled: bool, version: &str) -> ResourceSet {
    ResourceSet::new(ResourceSetConfig {
        name: format!("kvm-operator-{}", version),
        bundle: bundle(version),
        clients: mem.clients(),
        templates: Arc::new(templates),
        guest_update_enabled,
        retry: fast_retry(),
    })
    .unwrap()
}

pub fn deployment(name: &str, image: &str) -> Deployment {
    Deployment {
        metadata: ObjectMeta {
            name: Some(name.into()),
            annotations: Some([(VERSION_ANNOTATION.to_string(), VERSION.to_string())].into()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            template: PodTemplateSpec {
                spec: Some(PodSpec {
                    containers: vec![Container { name: "k8s-kvm".into(), image: Some(image.into()), ..Default::default() }],
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        }),
        status: None,
    }
}

pub fn with_counts(mut d: Deployment, available: i32, ready: i32, replicas: i32, updated: i32) -> Deployment {
    d.status = Some(DeploymentStatus {
        available_replicas: Some(available),
        ready_replicas: Some(ready),
        replicas: Some(replicas),
        updated_replicas: Some(updated),
        ..Default::default()
    });
    d
}

pub fn stable(d: Deployment) -> Deployment {
    with_counts(d, 1, 1, 1, 1)
}

pub fn namespace(phase: &str) -> Namespace {
    Namespace {
        metadata: meta(NS),
        status: Some(NamespaceStatus { phase: Some(phase.into()), ..Default::default() }),
        ..Default::default()
    }
}

pub fn config_map(name: &str, value: &str) -> ConfigMap {
    ConfigMap { metadata: meta(name), data: Some([("user_data".to_string(), value.to_string())].into()), ..Default::default() }
}

/// Desired objects for every kind.
pub fn full_fixture() -> Fixture {
    Fixture {
        service_accounts: vec![ServiceAccount { metadata: meta(NS), ..Default::default() }],
        config_maps: vec![config_map("master-c1-m1", "m"), config_map("worker-c1-w1", "w")],
        deployments: vec![deployment("master-m1", "kvm:1"), deployment("worker-w1", "kvm:1")],
        ingresses: vec![Ingress { metadata: meta("api"), ..Default::default() }],
        volume_claims: vec![PersistentVolumeClaim { metadata: meta("pvc-master-etcd-c1-m1"), ..Default::default() }],
        services: vec![Service { metadata: meta("master"), ..Default::default() }],
    }
}
