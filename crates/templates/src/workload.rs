//! Per-node VM workloads: the deployment running the VM and the config data it boots from.

use std::collections::BTreeMap;

use k8s_openapi::{
    api::{
        apps::v1::{Deployment, DeploymentSpec, DeploymentStrategy},
        core::v1::{
            Affinity, ConfigMap, ConfigMapVolumeSource, Container, EmptyDirVolumeSource, EnvVar, EnvVarSource, ExecAction,
            HTTPGetAction, HostPathVolumeSource, Lifecycle, LifecycleHandler, ObjectFieldSelector, PersistentVolumeClaimVolumeSource,
            PodAffinityTerm, PodAntiAffinity, PodSpec, PodTemplateSpec, Probe, ResourceRequirements, SecurityContext, Volume,
            VolumeMount,
        },
    },
    apimachinery::pkg::{
        api::resource::Quantity,
        apis::meta::v1::{LabelSelector, LabelSelectorRequirement, ObjectMeta},
        util::intstr::IntOrString,
    },
};
use kvmop_core::{ClusterSpec, EtcdStorage, Node, Role};
use kvmop_resource::VERSION_ANNOTATION;

use crate::key;

pub fn config_map(spec: &ClusterSpec, role: Role, node: &Node) -> ConfigMap {
    let data = BTreeMap::from([
        ("role".to_string(), role.as_str().to_string()),
        ("node".to_string(), node.id.clone()),
        ("cluster".to_string(), spec.id.clone()),
        ("cores".to_string(), node.cpus.to_string()),
        ("memory".to_string(), node.memory.clone()),
        ("disk".to_string(), key::disk(node)),
    ]);
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(key::config_map_name(spec, role, node)),
            labels: Some(key::node_labels(spec, role, node)),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    }
}

/// Keeps guest VMs of one cluster on distinct hosts.
fn anti_affinity(spec: &ClusterSpec) -> Affinity {
    Affinity {
        pod_anti_affinity: Some(PodAntiAffinity {
            required_during_scheduling_ignored_during_execution: Some(vec![PodAffinityTerm {
                label_selector: Some(LabelSelector {
                    match_expressions: Some(vec![LabelSelectorRequirement {
                        key: "app".into(),
                        operator: "In".into(),
                        values: Some(vec![key::MASTER_ID.into(), key::WORKER_ID.into()]),
                    }]),
                    ..Default::default()
                }),
                topology_key: key::HOSTNAME_TOPOLOGY_KEY.into(),
                namespaces: Some(vec![spec.namespace().to_string()]),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn env(name: &str, value: impl Into<String>) -> EnvVar {
    EnvVar { name: name.into(), value: Some(value.into()), ..Default::default() }
}

fn field_env(name: &str, path: &str) -> EnvVar {
    EnvVar {
        name: name.into(),
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector { api_version: Some("v1".into()), field_path: path.into() }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn volumes(spec: &ClusterSpec, role: Role, node: &Node) -> (Vec<Volume>, Vec<VolumeMount>) {
    let mount = |name: &str, path: &str| VolumeMount { name: name.into(), mount_path: path.into(), ..Default::default() };
    let mut volumes = vec![
        Volume {
            name: "cloud-config".into(),
            config_map: Some(ConfigMapVolumeSource { name: Some(key::config_map_name(spec, role, node)), ..Default::default() }),
            ..Default::default()
        },
        Volume {
            name: "images".into(),
            host_path: Some(HostPathVolumeSource { path: key::COREOS_IMAGE_DIR.into(), ..Default::default() }),
            ..Default::default()
        },
        Volume { name: "rootfs".into(), empty_dir: Some(EmptyDirVolumeSource::default()), ..Default::default() },
    ];
    let mut mounts = vec![
        mount("cloud-config", key::CLOUD_CONFIG_DIR),
        mount("images", "/usr/code/images/"),
        mount("rootfs", "/usr/code/rootfs/"),
    ];

    if role == Role::Master {
        let mut etcd = Volume { name: "etcd-data".into(), ..Default::default() };
        match spec.etcd_storage {
            EtcdStorage::HostPath => {
                etcd.host_path = Some(HostPathVolumeSource { path: key::etcd_host_path(spec, node), ..Default::default() });
            }
            EtcdStorage::PersistentVolume => {
                etcd.persistent_volume_claim =
                    Some(PersistentVolumeClaimVolumeSource { claim_name: key::volume_claim_name(spec, node), ..Default::default() });
            }
        }
        volumes.push(etcd);
        mounts.push(mount("etcd-data", key::ETCD_DATA_DIR));
    }
    (volumes, mounts)
}

fn kvm_container(role: Role, node: &Node, mounts: Vec<VolumeMount>) -> Container {
    let resources = BTreeMap::from([
        ("cpu".to_string(), Quantity(node.cpus.to_string())),
        ("memory".to_string(), Quantity(node.memory.clone())),
    ]);
    Container {
        name: key::K8S_KVM_CONTAINER.into(),
        image: Some(key::K8S_KVM_IMAGE.into()),
        image_pull_policy: Some("IfNotPresent".into()),
        args: Some(vec![role.as_str().into()]),
        env: Some(vec![
            env("CORES", node.cpus.to_string()),
            env("DISK", key::disk(node)),
            field_env("HOSTNAME", "metadata.name"),
            env("MEMORY", node.memory.clone()),
            env("ROLE", role.as_str()),
            env("CLOUD_CONFIG_PATH", key::CLOUD_CONFIG_PATH),
        ]),
        security_context: Some(SecurityContext { privileged: Some(true), ..Default::default() }),
        lifecycle: Some(Lifecycle {
            pre_stop: Some(LifecycleHandler {
                exec: Some(ExecAction { command: Some(vec!["/qemu-shutdown".into()]) }),
                ..Default::default()
            }),
            ..Default::default()
        }),
        liveness_probe: Some(Probe {
            initial_delay_seconds: Some(key::INITIAL_DELAY_SECONDS),
            timeout_seconds: Some(key::TIMEOUT_SECONDS),
            period_seconds: Some(key::PERIOD_SECONDS),
            failure_threshold: Some(key::FAILURE_THRESHOLD),
            success_threshold: Some(key::SUCCESS_THRESHOLD),
            http_get: Some(HTTPGetAction {
                path: Some(key::HEALTH_ENDPOINT.into()),
                port: IntOrString::Int(key::LIVENESS_PORT),
                host: Some(key::PROBE_HOST.into()),
                ..Default::default()
            }),
            ..Default::default()
        }),
        resources: Some(ResourceRequirements {
            requests: Some(resources.clone()),
            limits: Some(resources),
            ..Default::default()
        }),
        volume_mounts: Some(mounts),
        ..Default::default()
    }
}

pub fn deployment(spec: &ClusterSpec, role: Role, node: &Node) -> Deployment {
    let labels = key::node_labels(spec, role, node);
    let (volumes, mounts) = volumes(spec, role, node);
    Deployment {
        metadata: ObjectMeta {
            name: Some(key::deployment_name(role, node)),
            labels: Some(labels.clone()),
            annotations: Some(BTreeMap::from([(VERSION_ANNOTATION.to_string(), spec.version_bundle_version.clone())])),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector { match_labels: Some(labels.clone()), ..Default::default() },
            strategy: Some(DeploymentStrategy { type_: Some("Recreate".into()), ..Default::default() }),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta { name: Some(role.as_str().into()), labels: Some(labels), ..Default::default() }),
                spec: Some(PodSpec {
                    affinity: Some(anti_affinity(spec)),
                    host_network: Some(true),
                    node_selector: Some(BTreeMap::from([("role".to_string(), role.as_str().to_string())])),
                    service_account_name: Some(key::service_account_name(spec)),
                    volumes: Some(volumes),
                    containers: vec![kvm_container(role, node, mounts)],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}
