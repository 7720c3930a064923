use k8s_openapi::api::{
    apps::v1::Deployment,
    core::v1::{ConfigMap, Namespace, PersistentVolumeClaim, Service, ServiceAccount},
    networking::v1::Ingress,
};
use kvmop_core::{ClusterSpec, Result};

/// Desired-state templates of one engine generation.
///
/// Every method is a pure function of the spec: building twice from the same
/// spec must yield equal objects.
pub trait DesiredStates: Send + Sync {
    fn namespace(&self, spec: &ClusterSpec) -> Result<Namespace>;
    fn service_accounts(&self, spec: &ClusterSpec) -> Result<Vec<ServiceAccount>>;
    fn config_maps(&self, spec: &ClusterSpec) -> Result<Vec<ConfigMap>>;
    fn deployments(&self, spec: &ClusterSpec) -> Result<Vec<Deployment>>;
    fn ingresses(&self, spec: &ClusterSpec) -> Result<Vec<Ingress>>;
    fn volume_claims(&self, spec: &ClusterSpec) -> Result<Vec<PersistentVolumeClaim>>;
    fn services(&self, spec: &ClusterSpec) -> Result<Vec<Service>>;
}
