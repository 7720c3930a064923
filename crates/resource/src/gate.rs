//! Update gate for deployment-like kinds.
//!
//! Updating a running workload restarts the VM behind it, so at most one
//! object crosses the gate per pass and only while every current object has
//! all of its replicas up. A rollout over many objects becomes a sequence of
//! passes, each of which can stop at the stability check.

use k8s_openapi::api::apps::v1::Deployment;
use kube::Resource;
use kvmop_core::PassContext;
use tracing::{debug, info, warn};

use crate::diff;

/// Annotation recording the version bundle an object was rendered for.
pub const VERSION_ANNOTATION: &str = "kvmop.io/version-bundle-version";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplicaCounts {
    pub available: i32,
    pub ready: i32,
    pub desired: i32,
    pub updated: i32,
}

impl ReplicaCounts {
    pub fn settled(&self) -> bool {
        self.available == self.ready && self.ready == self.desired && self.desired == self.updated
    }
}

/// A workload whose updates go through the gate.
pub trait Rollout: Resource + Clone {
    fn replica_counts(&self) -> ReplicaCounts;

    fn version(&self) -> Option<&str> {
        self.meta().annotations.as_ref().and_then(|a| a.get(VERSION_ANNOTATION)).map(|s| s.as_str())
    }

    /// Whether the live object `current` carries this object's pod template.
    /// Server-defaulted fields of the live template are ignored.
    fn same_template(&self, current: &Self) -> bool;
}

impl Rollout for Deployment {
    fn replica_counts(&self) -> ReplicaCounts {
        let status = self.status.clone().unwrap_or_default();
        ReplicaCounts {
            available: status.available_replicas.unwrap_or(0),
            ready: status.ready_replicas.unwrap_or(0),
            desired: status.replicas.unwrap_or(0),
            updated: status.updated_replicas.unwrap_or(0),
        }
    }

    fn same_template(&self, current: &Self) -> bool {
        let template = |d: &Deployment| d.spec.as_ref().and_then(|s| s.template.spec.clone());
        diff::covers(&template(current), &template(self))
    }
}

pub fn is_modified<K: Rollout>(desired: &K, current: &K) -> bool {
    desired.version() != current.version() || !desired.same_template(current)
}

/// Pick the single desired object that may be updated this pass, if any.
pub fn select_update<K: Rollout>(cx: &PassContext, current: &[K], desired: &[K]) -> Option<K> {
    if !cx.updates_allowed {
        info!("not computing updates: updates are not allowed this pass");
        return None;
    }

    for c in current {
        if !c.replica_counts().settled() {
            info!(name = %diff::name_of(c), counts = ?c.replica_counts(), "cannot update any object: not all replicas are up");
            return None;
        }
    }

    for c in current {
        let name = diff::name_of(c);
        let Some(d) = diff::find(desired, name) else {
            warn!(%name, "not updating: no desired object found");
            continue;
        };
        if !is_modified(d, c) {
            debug!(%name, "not updating: no changes found");
            continue;
        }
        debug!(%name, "found object that has to be updated");
        return Some(d.clone());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::{
        apps::v1::{DeploymentSpec, DeploymentStatus},
        core::v1::{Container, PodSpec, PodTemplateSpec},
    };
    use kube::api::ObjectMeta;

    fn deployment(name: &str, image: &str, version: &str) -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                name: Some(name.into()),
                annotations: Some([(VERSION_ANNOTATION.to_string(), version.to_string())].into()),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                template: PodTemplateSpec {
                    spec: Some(PodSpec {
                        containers: vec![Container { name: "k8s-kvm".into(), image: Some(image.into()), ..Default::default() }],
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                ..Default::default()
            }),
            status: None,
        }
    }

    fn with_status(mut d: Deployment, available: i32, ready: i32, replicas: i32, updated: i32) -> Deployment {
        d.status = Some(DeploymentStatus {
            available_replicas: Some(available),
            ready_replicas: Some(ready),
            replicas: Some(replicas),
            updated_replicas: Some(updated),
            ..Default::default()
        });
        d
    }

    fn stable(d: Deployment) -> Deployment {
        with_status(d, 1, 1, 1, 1)
    }

    fn allowed() -> PassContext {
        PassContext::new(true)
    }

    fn name(d: &Option<Deployment>) -> Option<&str> {
        d.as_ref().map(diff::name_of)
    }

    #[test]
    fn one_unstable_object_blocks_every_update() {
        let current = vec![
            stable(deployment("worker-1", "kvm:1", "2.0.1")),
            with_status(deployment("worker-2", "kvm:1", "2.0.1"), 2, 2, 3, 3),
            stable(deployment("worker-3", "kvm:1", "2.0.1")),
        ];
        let desired = vec![
            deployment("worker-1", "kvm:2", "2.0.1"),
            deployment("worker-2", "kvm:1", "2.0.1"),
            deployment("worker-3", "kvm:2", "2.0.1"),
        ];
        assert!(select_update(&allowed(), &current, &desired).is_none());
    }

    #[test]
    fn selects_only_the_diverging_object() {
        let current: Vec<_> = ["worker-1", "worker-2", "worker-3"].iter().map(|n| stable(deployment(n, "kvm:1", "2.0.1"))).collect();
        let desired = vec![
            deployment("worker-1", "kvm:1", "2.0.1"),
            deployment("worker-2", "kvm:2", "2.0.1"),
            deployment("worker-3", "kvm:1", "2.0.1"),
        ];
        let picked = select_update(&allowed(), &current, &desired);
        assert_eq!(name(&picked), Some("worker-2"));
        assert_eq!(picked.unwrap().spec.unwrap().template.spec.unwrap().containers[0].image.as_deref(), Some("kvm:2"));
    }

    #[test]
    fn stops_at_first_divergence_in_listing_order() {
        let current: Vec<_> = ["worker-1", "worker-2", "worker-3"].iter().map(|n| stable(deployment(n, "kvm:1", "2.0.1"))).collect();
        let desired: Vec<_> = ["worker-1", "worker-2", "worker-3"].iter().map(|n| deployment(n, "kvm:2", "2.0.1")).collect();
        assert_eq!(name(&select_update(&allowed(), &current, &desired)), Some("worker-1"));
    }

    #[test]
    fn version_annotation_alone_is_a_divergence() {
        let current = vec![stable(deployment("master-1", "kvm:1", "2.0.0"))];
        let desired = vec![deployment("master-1", "kvm:1", "2.0.1")];
        assert_eq!(name(&select_update(&allowed(), &current, &desired)), Some("master-1"));
    }

    #[test]
    fn missing_desired_object_is_skipped() {
        let current = vec![
            stable(deployment("worker-1", "kvm:1", "2.0.1")),
            stable(deployment("worker-4", "kvm:1", "2.0.1")),
            stable(deployment("worker-5", "kvm:1", "2.0.1")),
        ];
        let desired = vec![deployment("worker-1", "kvm:1", "2.0.1"), deployment("worker-5", "kvm:9", "2.0.1")];
        assert_eq!(name(&select_update(&allowed(), &current, &desired)), Some("worker-5"));
    }

    #[test]
    fn updates_disallowed_yields_nothing() {
        let current = vec![stable(deployment("worker-2", "kvm:1", "2.0.1"))];
        let desired = vec![deployment("worker-2", "kvm:2", "2.0.1")];
        assert!(select_update(&PassContext::new(false), &current, &desired).is_none());
    }

    #[test]
    fn server_defaults_on_the_live_template_are_not_a_divergence() {
        let mut live = stable(deployment("worker-1", "kvm:1", "2.0.1"));
        let pod = live.spec.as_mut().and_then(|s| s.template.spec.as_mut()).unwrap();
        pod.dns_policy = Some("ClusterFirst".into());
        pod.containers[0].termination_message_path = Some("/dev/termination-log".into());
        let current = vec![live, stable(deployment("worker-2", "kvm:1", "2.0.1"))];
        let desired = vec![deployment("worker-1", "kvm:1", "2.0.1"), deployment("worker-2", "kvm:2", "2.0.1")];
        assert_eq!(name(&select_update(&allowed(), &current, &desired)), Some("worker-2"));
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for Captured {
        type Writer = Captured;
        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn disallowed_updates_are_logged_at_info() {
        let out = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(out.clone())
            .finish();
        let current = vec![stable(deployment("worker-2", "kvm:1", "2.0.1"))];
        let desired = vec![deployment("worker-2", "kvm:2", "2.0.1")];
        tracing::subscriber::with_default(subscriber, || {
            assert!(select_update(&PassContext::new(false), &current, &desired).is_none());
        });
        let logs = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("INFO"));
        assert!(logs.contains("updates are not allowed"));
    }

    #[test]
    fn no_status_counts_as_settled() {
        assert!(deployment("x", "kvm:1", "2.0.1").replica_counts().settled());
        assert!(!with_status(deployment("x", "kvm:1", "2.0.1"), 1, 1, 1, 0).replica_counts().settled());
    }
}
