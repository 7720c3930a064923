//! Ordered composition of reconcilers for one engine generation.

use std::{sync::Arc, time::Instant};

use kvmop_core::{ClusterSpec, Error, Flow, PassContext, Result, VersionBundle};
use kvmop_kubehub::Clients;
use metrics::{counter, histogram};
use smallvec::SmallVec;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    crud::{CrudResource, Reconciler},
    desired::DesiredStates,
    kinds::{
        ConfigMapResource, DeploymentResource, IngressResource, NamespaceResource, ServiceAccountResource, ServiceResource,
        VolumeClaimResource,
    },
    metered::Metered,
    ops::CrudOps,
    retry::{Retry, RetryConfig},
};

/// Attempt ceiling for every reconciler call.
pub const RESOURCE_RETRIES: u32 = 3;

pub struct ResourceSetConfig {
    pub name: String,
    pub bundle: VersionBundle,
    pub clients: Clients,
    pub templates: Arc<dyn DesiredStates>,
    /// Static switch copied into every pass as `updates_allowed`.
    pub guest_update_enabled: bool,
    pub retry: RetryConfig,
}

/// Outcome of one pass over a cluster spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub resource_set: String,
    pub pass_id: Uuid,
    /// Reconcilers that ran, in order, including the one that cancelled.
    pub executed: SmallVec<[&'static str; 8]>,
    pub cancelled_by: Option<&'static str>,
}

impl PassReport {
    pub fn cancelled(&self) -> bool {
        self.cancelled_by.is_some()
    }
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Create,
    Delete,
}

pub struct ResourceSet {
    name: String,
    bundle: VersionBundle,
    guest_update_enabled: bool,
    reconcilers: Vec<Box<dyn Reconciler>>,
}

fn wrap<O: CrudOps + 'static>(ops: O, retry: &RetryConfig) -> Box<dyn Reconciler> {
    Box::new(CrudResource::new(Metered::new(Retry::new(ops, retry.clone()))))
}

impl ResourceSet {
    /// Build the standard chain:
    /// namespace, service-account, config-data, deployment, ingress, volume-claim, network-service.
    pub fn new(config: ResourceSetConfig) -> Result<Self> {
        let ResourceSetConfig { name, bundle, clients, templates, guest_update_enabled, retry } = config;
        let reconcilers = vec![
            wrap(NamespaceResource::new(clients.namespaces, templates.clone()), &retry),
            wrap(ServiceAccountResource::new(clients.service_accounts, templates.clone()), &retry),
            wrap(ConfigMapResource::new(clients.config_maps, templates.clone()), &retry),
            wrap(DeploymentResource::new(clients.deployments, templates.clone()), &retry),
            wrap(IngressResource::new(clients.ingresses, templates.clone()), &retry),
            wrap(VolumeClaimResource::new(clients.volume_claims, templates.clone()), &retry),
            wrap(ServiceResource::new(clients.services, templates), &retry),
        ];
        Self::with_reconcilers(name, bundle, guest_update_enabled, reconcilers)
    }

    pub fn with_reconcilers(
        name: impl Into<String>,
        bundle: VersionBundle,
        guest_update_enabled: bool,
        reconcilers: Vec<Box<dyn Reconciler>>,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::invalid_config("resource set name must not be empty"));
        }
        if reconcilers.is_empty() {
            return Err(Error::invalid_config(format!("resource set {} has no reconcilers", name)));
        }
        bundle.validate()?;
        Ok(Self { name, bundle, guest_update_enabled, reconcilers })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bundle(&self) -> &VersionBundle {
        &self.bundle
    }

    pub fn reconciler_names(&self) -> Vec<&'static str> {
        self.reconcilers.iter().map(|r| r.name()).collect()
    }

    /// Whether this generation is responsible for the spec.
    pub fn handles(&self, spec: &ClusterSpec) -> bool {
        self.bundle.matches(&spec.version_bundle_version)
    }

    pub fn init_pass(&self) -> PassContext {
        PassContext::new(self.guest_update_enabled)
    }

    pub async fn reconcile(&self, spec: &ClusterSpec) -> Result<PassReport> {
        self.run(spec, Mode::Create).await
    }

    pub async fn reconcile_deletion(&self, spec: &ClusterSpec) -> Result<PassReport> {
        self.run(spec, Mode::Delete).await
    }

    async fn run(&self, spec: &ClusterSpec, mode: Mode) -> Result<PassReport> {
        spec.validate()?;
        let cx = self.init_pass();
        let t0 = Instant::now();
        info!(
            resource_set = %self.name,
            cluster = %spec.id,
            pass_id = %cx.pass_id,
            updates_allowed = cx.updates_allowed,
            mode = ?mode,
            "pass started"
        );

        let mut report = PassReport { resource_set: self.name.clone(), pass_id: cx.pass_id, executed: SmallVec::new(), cancelled_by: None };
        for r in &self.reconcilers {
            let res = match mode {
                Mode::Create => r.ensure_created(&cx, spec).await,
                Mode::Delete => r.ensure_deleted(&cx, spec).await,
            };
            report.executed.push(r.name());
            match res {
                Ok(Flow::Proceed) => {}
                Ok(Flow::Cancelled) => {
                    report.cancelled_by = Some(r.name());
                    break;
                }
                Err(e) => {
                    error!(resource_set = %self.name, cluster = %spec.id, pass_id = %cx.pass_id, error = %e, "pass failed");
                    self.record(t0, "error");
                    return Err(e);
                }
            }
        }

        let outcome = if report.cancelled() { "cancelled" } else { "ok" };
        self.record(t0, outcome);
        info!(
            resource_set = %self.name,
            cluster = %spec.id,
            pass_id = %cx.pass_id,
            executed = report.executed.len(),
            cancelled_by = ?report.cancelled_by,
            took_ms = %t0.elapsed().as_millis(),
            "pass finished"
        );
        Ok(report)
    }

    fn record(&self, t0: Instant, outcome: &'static str) {
        histogram!("kvmop_pass_ms", t0.elapsed().as_secs_f64() * 1000.0, "resource_set" => self.name.clone());
        counter!("kvmop_pass_total", 1u64, "resource_set" => self.name.clone(), "outcome" => outcome);
    }
}
