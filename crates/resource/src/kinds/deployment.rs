use std::sync::Arc;

use k8s_openapi::api::apps::v1::Deployment;
use kvmop_core::{ClusterSpec, PassContext, Patch, Result};
use kvmop_kubehub::ObjectApi;

use crate::{desired::DesiredStates, gate, ops::CrudOps};

/// Guest node VMs. Updates go through the [`gate`].
pub struct DeploymentResource {
    api: Arc<dyn ObjectApi<Deployment>>,
    templates: Arc<dyn DesiredStates>,
}

impl DeploymentResource {
    pub fn new(api: Arc<dyn ObjectApi<Deployment>>, templates: Arc<dyn DesiredStates>) -> Self {
        Self { api, templates }
    }
}

#[async_trait::async_trait]
impl CrudOps for DeploymentResource {
    type Object = Deployment;

    fn name(&self) -> &'static str {
        "deployment"
    }

    fn api(&self) -> &dyn ObjectApi<Deployment> {
        &*self.api
    }

    fn desired_state(&self, spec: &ClusterSpec) -> Result<Vec<Deployment>> {
        self.templates.deployments(spec)
    }

    fn new_update_patch(&self, cx: &PassContext, _spec: &ClusterSpec, current: &[Deployment], desired: &[Deployment]) -> Result<Patch<Deployment>> {
        Ok(Patch::update(gate::select_update(cx, current, desired).into_iter().collect()))
    }
}
