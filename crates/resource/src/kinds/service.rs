use std::sync::Arc;

use k8s_openapi::api::core::v1::Service;
use kvmop_core::{ClusterSpec, PassContext, Patch, Result};
use kvmop_kubehub::ObjectApi;

use crate::{desired::DesiredStates, diff, ops::CrudOps};

pub struct ServiceResource {
    api: Arc<dyn ObjectApi<Service>>,
    templates: Arc<dyn DesiredStates>,
}

impl ServiceResource {
    pub fn new(api: Arc<dyn ObjectApi<Service>>, templates: Arc<dyn DesiredStates>) -> Self {
        Self { api, templates }
    }
}

fn is_modified(desired: &Service, current: &Service) -> bool {
    let (d, c) = (desired.spec.clone().unwrap_or_default(), current.spec.clone().unwrap_or_default());
    d.ports != c.ports || d.selector != c.selector || d.type_ != c.type_ || desired.metadata.labels != current.metadata.labels
}

#[async_trait::async_trait]
impl CrudOps for ServiceResource {
    type Object = Service;

    fn name(&self) -> &'static str {
        "network-service"
    }

    fn api(&self) -> &dyn ObjectApi<Service> {
        &*self.api
    }

    fn desired_state(&self, spec: &ClusterSpec) -> Result<Vec<Service>> {
        self.templates.services(spec)
    }

    /// The allocated cluster IP is immutable, so it is carried over from the live object.
    fn new_update_patch(&self, _cx: &PassContext, _spec: &ClusterSpec, current: &[Service], desired: &[Service]) -> Result<Patch<Service>> {
        let mut updates = diff::changed(current, desired, is_modified);
        for svc in &mut updates {
            let live = diff::find(current, diff::name_of(&*svc)).and_then(|c| c.spec.clone()).unwrap_or_default();
            if let Some(spec) = svc.spec.as_mut() {
                spec.cluster_ip = live.cluster_ip;
                spec.cluster_ips = live.cluster_ips;
            }
        }
        Ok(Patch::update(updates))
    }
}
