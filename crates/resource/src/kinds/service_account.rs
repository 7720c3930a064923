use std::sync::Arc;

use k8s_openapi::api::core::v1::ServiceAccount;
use kvmop_core::{ClusterSpec, Result};
use kvmop_kubehub::ObjectApi;

use crate::{desired::DesiredStates, ops::CrudOps};

/// Service accounts are never updated in place.
pub struct ServiceAccountResource {
    api: Arc<dyn ObjectApi<ServiceAccount>>,
    templates: Arc<dyn DesiredStates>,
}

impl ServiceAccountResource {
    pub fn new(api: Arc<dyn ObjectApi<ServiceAccount>>, templates: Arc<dyn DesiredStates>) -> Self {
        Self { api, templates }
    }
}

#[async_trait::async_trait]
impl CrudOps for ServiceAccountResource {
    type Object = ServiceAccount;

    fn name(&self) -> &'static str {
        "service-account"
    }

    fn api(&self) -> &dyn ObjectApi<ServiceAccount> {
        &*self.api
    }

    fn desired_state(&self, spec: &ClusterSpec) -> Result<Vec<ServiceAccount>> {
        self.templates.service_accounts(spec)
    }
}
