use std::sync::Arc;

use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kvmop_core::{ClusterSpec, Result};
use kvmop_kubehub::ObjectApi;

use crate::{desired::DesiredStates, ops::CrudOps};

/// Claim specs are immutable once bound, so only create and delete apply.
pub struct VolumeClaimResource {
    api: Arc<dyn ObjectApi<PersistentVolumeClaim>>,
    templates: Arc<dyn DesiredStates>,
}

impl VolumeClaimResource {
    pub fn new(api: Arc<dyn ObjectApi<PersistentVolumeClaim>>, templates: Arc<dyn DesiredStates>) -> Self {
        Self { api, templates }
    }
}

#[async_trait::async_trait]
impl CrudOps for VolumeClaimResource {
    type Object = PersistentVolumeClaim;

    fn name(&self) -> &'static str {
        "volume-claim"
    }

    fn api(&self) -> &dyn ObjectApi<PersistentVolumeClaim> {
        &*self.api
    }

    fn desired_state(&self, spec: &ClusterSpec) -> Result<Vec<PersistentVolumeClaim>> {
        self.templates.volume_claims(spec)
    }
}
