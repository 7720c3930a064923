use std::sync::Arc;

use k8s_openapi::api::networking::v1::Ingress;
use kvmop_core::{ClusterSpec, PassContext, Patch, Result};
use kvmop_kubehub::ObjectApi;

use crate::{desired::DesiredStates, diff, ops::CrudOps};

pub struct IngressResource {
    api: Arc<dyn ObjectApi<Ingress>>,
    templates: Arc<dyn DesiredStates>,
}

impl IngressResource {
    pub fn new(api: Arc<dyn ObjectApi<Ingress>>, templates: Arc<dyn DesiredStates>) -> Self {
        Self { api, templates }
    }
}

/// Spec and annotations may carry server-set fields, so only what the
/// templates set is compared.
fn is_modified(desired: &Ingress, current: &Ingress) -> bool {
    !diff::covers(&current.spec, &desired.spec)
        || desired.metadata.labels != current.metadata.labels
        || !diff::covers(&current.metadata.annotations, &desired.metadata.annotations)
}

#[async_trait::async_trait]
impl CrudOps for IngressResource {
    type Object = Ingress;

    fn name(&self) -> &'static str {
        "ingress"
    }

    fn api(&self) -> &dyn ObjectApi<Ingress> {
        &*self.api
    }

    fn desired_state(&self, spec: &ClusterSpec) -> Result<Vec<Ingress>> {
        self.templates.ingresses(spec)
    }

    fn new_update_patch(&self, _cx: &PassContext, _spec: &ClusterSpec, current: &[Ingress], desired: &[Ingress]) -> Result<Patch<Ingress>> {
        Ok(Patch::update(diff::changed(current, desired, is_modified)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::networking::v1::{IngressRule, IngressSpec};
    use kube::api::ObjectMeta;

    fn ingress(host: &str) -> Ingress {
        Ingress {
            metadata: ObjectMeta {
                name: Some("api".into()),
                annotations: Some([("ingress.kubernetes.io/ssl-passthrough".to_string(), "true".to_string())].into()),
                ..Default::default()
            },
            spec: Some(IngressSpec {
                rules: Some(vec![IngressRule { host: Some(host.into()), ..Default::default() }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn server_set_fields_do_not_trigger_updates() {
        let mut live = ingress("api.c1.example.com");
        live.spec.as_mut().unwrap().ingress_class_name = Some("nginx".into());
        live.metadata.annotations.as_mut().unwrap().insert("kubectl.kubernetes.io/last-applied-configuration".into(), "{}".into());
        assert!(!is_modified(&ingress("api.c1.example.com"), &live));
        assert!(is_modified(&ingress("api.c2.example.com"), &live));
    }
}
