use std::collections::BTreeMap;

use k8s_openapi::{
    api::core::v1::{PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeResourceRequirements},
    apimachinery::pkg::{api::resource::Quantity, apis::meta::v1::ObjectMeta},
};
use kvmop_core::{ClusterSpec, EtcdStorage, Role};

use crate::key;

/// One etcd claim per master, only when etcd lives on persistent volumes.
pub fn volume_claims(spec: &ClusterSpec) -> Vec<PersistentVolumeClaim> {
    if spec.etcd_storage != EtcdStorage::PersistentVolume {
        return Vec::new();
    }
    spec.masters
        .iter()
        .map(|node| PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: Some(key::volume_claim_name(spec, node)),
                labels: Some(key::node_labels(spec, Role::Master, node)),
                ..Default::default()
            },
            spec: Some(PersistentVolumeClaimSpec {
                access_modes: Some(vec!["ReadWriteOnce".into()]),
                resources: Some(VolumeResourceRequirements {
                    requests: Some(BTreeMap::from([("storage".to_string(), Quantity(key::ETCD_STORAGE_SIZE.into()))])),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        })
        .collect()
}
