//! Version-keyed routing of cluster specs to engine generations.

use std::collections::HashSet;

use kvmop_core::{ClusterSpec, Error, Result, VersionBundle};
use tracing::{debug, warn};

use crate::set::{PassReport, ResourceSet};

pub struct Registry {
    sets: Vec<ResourceSet>,
}

impl Registry {
    /// Each bundle version may be claimed by one resource set only.
    pub fn new(sets: Vec<ResourceSet>) -> Result<Self> {
        let mut seen = HashSet::new();
        for s in &sets {
            if !seen.insert(s.bundle().version.clone()) {
                return Err(Error::invalid_config(format!(
                    "resource set {} claims version {} which is already handled",
                    s.name(),
                    s.bundle().version
                )));
            }
        }
        Ok(Self { sets })
    }

    pub fn select(&self, spec: &ClusterSpec) -> Option<&ResourceSet> {
        self.sets.iter().find(|s| s.handles(spec))
    }

    pub fn bundles(&self) -> impl Iterator<Item = &VersionBundle> {
        self.sets.iter().map(|s| s.bundle())
    }

    /// Run an ensure-created pass with the matching set; `None` if no set handles the spec.
    pub async fn reconcile(&self, spec: &ClusterSpec) -> Result<Option<PassReport>> {
        match self.route(spec) {
            Some(set) => set.reconcile(spec).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn reconcile_deletion(&self, spec: &ClusterSpec) -> Result<Option<PassReport>> {
        match self.route(spec) {
            Some(set) => set.reconcile_deletion(spec).await.map(Some),
            None => Ok(None),
        }
    }

    fn route(&self, spec: &ClusterSpec) -> Option<&ResourceSet> {
        let set = self.select(spec);
        match set {
            Some(s) => debug!(cluster = %spec.id, version = %spec.version_bundle_version, resource_set = %s.name(), "routed cluster spec"),
            None => warn!(cluster = %spec.id, version = %spec.version_bundle_version, "no resource set handles this version bundle"),
        }
        set
    }
}
