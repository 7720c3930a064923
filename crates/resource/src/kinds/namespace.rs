use std::sync::Arc;

use k8s_openapi::api::core::v1::Namespace;
use kvmop_core::{ClusterSpec, Observed, PassContext, Result};
use kvmop_kubehub::ObjectApi;
use tracing::{debug, info};

use crate::{desired::DesiredStates, ops::CrudOps};

pub const PHASE_TERMINATING: &str = "Terminating";

/// First reconciler of every pass. A terminating namespace cancels the pass.
pub struct NamespaceResource {
    api: Arc<dyn ObjectApi<Namespace>>,
    templates: Arc<dyn DesiredStates>,
}

impl NamespaceResource {
    pub fn new(api: Arc<dyn ObjectApi<Namespace>>, templates: Arc<dyn DesiredStates>) -> Self {
        Self { api, templates }
    }
}

#[async_trait::async_trait]
impl CrudOps for NamespaceResource {
    type Object = Namespace;

    fn name(&self) -> &'static str {
        "namespace"
    }

    fn api(&self) -> &dyn ObjectApi<Namespace> {
        &*self.api
    }

    async fn current_state(&self, _cx: &PassContext, spec: &ClusterSpec) -> Result<Observed<Vec<Namespace>>> {
        let name = spec.namespace();
        debug!(%name, "looking for the namespace");
        let found = match self.api.get(name, name).await {
            Ok(ns) => ns,
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };
        let Some(ns) = found else {
            debug!(%name, "did not find the namespace");
            return Ok(Observed::State(Vec::new()));
        };
        let phase = ns.status.as_ref().and_then(|s| s.phase.as_deref());
        if phase == Some(PHASE_TERMINATING) {
            info!(%name, "namespace is terminating, cancelling reconciliation");
            return Ok(Observed::Cancelled);
        }
        Ok(Observed::State(vec![ns]))
    }

    fn desired_state(&self, spec: &ClusterSpec) -> Result<Vec<Namespace>> {
        Ok(vec![self.templates.namespace(spec)?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{spec, Static};
    use k8s_openapi::api::core::v1::NamespaceStatus;
    use kube::api::ObjectMeta;
    use kvmop_core::Error;
    use kvmop_kubehub::{MemoryApi, Verb};

    fn ns(name: &str, phase: Option<&str>) -> Namespace {
        Namespace {
            metadata: ObjectMeta { name: Some(name.into()), ..Default::default() },
            status: Some(NamespaceStatus { phase: phase.map(|p| p.to_string()), ..Default::default() }),
            ..Default::default()
        }
    }

    fn resource(api: &MemoryApi<Namespace>) -> NamespaceResource {
        NamespaceResource::new(Arc::new(api.clone()), Arc::new(Static::default()))
    }

    #[tokio::test]
    async fn missing_namespace_is_empty_state() {
        let api = MemoryApi::<Namespace>::new();
        let out = resource(&api).current_state(&PassContext::new(true), &spec()).await.unwrap();
        assert_eq!(out, Observed::State(vec![]));
    }

    #[tokio::test]
    async fn not_found_error_is_absorbed() {
        let api = MemoryApi::<Namespace>::new();
        api.fail_next(Verb::Get, Error::NotFound("c1".into())).await;
        let out = resource(&api).current_state(&PassContext::new(true), &spec()).await.unwrap();
        assert_eq!(out, Observed::State(vec![]));
    }

    #[tokio::test]
    async fn terminating_namespace_cancels() {
        let api = MemoryApi::<Namespace>::new();
        api.seed("c1", ns("c1", Some(PHASE_TERMINATING))).await;
        let out = resource(&api).current_state(&PassContext::new(true), &spec()).await.unwrap();
        assert_eq!(out, Observed::Cancelled);
    }

    #[tokio::test]
    async fn active_namespace_is_current() {
        let api = MemoryApi::<Namespace>::new();
        api.seed("c1", ns("c1", Some("Active"))).await;
        let out = resource(&api).current_state(&PassContext::new(true), &spec()).await.unwrap();
        assert!(matches!(out, Observed::State(v) if v.len() == 1));
    }
}
