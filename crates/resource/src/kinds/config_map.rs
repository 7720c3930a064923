use std::sync::Arc;

use k8s_openapi::api::core::v1::ConfigMap;
use kvmop_core::{ClusterSpec, PassContext, Patch, Result};
use kvmop_kubehub::ObjectApi;

use crate::{desired::DesiredStates, diff, ops::CrudOps};

/// Per-node config data referenced by the deployments.
pub struct ConfigMapResource {
    api: Arc<dyn ObjectApi<ConfigMap>>,
    templates: Arc<dyn DesiredStates>,
}

impl ConfigMapResource {
    pub fn new(api: Arc<dyn ObjectApi<ConfigMap>>, templates: Arc<dyn DesiredStates>) -> Self {
        Self { api, templates }
    }
}

fn is_modified(desired: &ConfigMap, current: &ConfigMap) -> bool {
    desired.data != current.data || desired.metadata.labels != current.metadata.labels
}

#[async_trait::async_trait]
impl CrudOps for ConfigMapResource {
    type Object = ConfigMap;

    fn name(&self) -> &'static str {
        "config-data"
    }

    fn api(&self) -> &dyn ObjectApi<ConfigMap> {
        &*self.api
    }

    fn desired_state(&self, spec: &ClusterSpec) -> Result<Vec<ConfigMap>> {
        self.templates.config_maps(spec)
    }

    fn new_update_patch(&self, _cx: &PassContext, _spec: &ClusterSpec, current: &[ConfigMap], desired: &[ConfigMap]) -> Result<Patch<ConfigMap>> {
        Ok(Patch::update(diff::changed(current, desired, is_modified)))
    }
}
