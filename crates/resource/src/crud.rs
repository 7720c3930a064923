use kvmop_core::{ClusterSpec, Flow, Observed, PassContext, Patch, Result};
use tracing::{debug, info};

use crate::ops::CrudOps;

/// Type-erased step of a resource set.
#[async_trait::async_trait]
pub trait Reconciler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Converge the kind towards the desired state.
    async fn ensure_created(&self, cx: &PassContext, spec: &ClusterSpec) -> Result<Flow>;

    /// Remove the managed objects of the kind.
    async fn ensure_deleted(&self, cx: &PassContext, spec: &ClusterSpec) -> Result<Flow>;
}

/// Drives a [`CrudOps`] implementation through one pass.
pub struct CrudResource<O> {
    ops: O,
}

impl<O: CrudOps> CrudResource<O> {
    pub fn new(ops: O) -> Self {
        Self { ops }
    }

    async fn observe(&self, cx: &PassContext, spec: &ClusterSpec) -> Result<Option<(Vec<O::Object>, Vec<O::Object>)>> {
        let name = self.ops.name();
        let current = match self.ops.current_state(cx, spec).await.map_err(|e| e.within(name, "current_state"))? {
            Observed::State(objects) => objects,
            Observed::Cancelled => {
                info!(resource = name, cluster = %spec.id, pass_id = %cx.pass_id, "reconciliation cancelled");
                return Ok(None);
            }
        };
        let desired = self.ops.desired_state(spec).map_err(|e| e.within(name, "desired_state"))?;
        debug!(resource = name, current = current.len(), desired = desired.len(), "computed current and desired state");
        Ok(Some((current, desired)))
    }

    async fn apply(&self, cx: &PassContext, spec: &ClusterSpec, patch: Patch<O::Object>) -> Result<()> {
        let name = self.ops.name();
        if patch.is_empty() {
            debug!(resource = name, cluster = %spec.id, "nothing to change");
            return Ok(());
        }
        if !patch.to_create.is_empty() {
            debug!(resource = name, count = patch.to_create.len(), "creating objects");
            self.ops.apply_create_change(cx, spec, &patch.to_create).await.map_err(|e| e.within(name, "apply_create"))?;
        }
        if !patch.to_delete.is_empty() {
            debug!(resource = name, count = patch.to_delete.len(), "deleting objects");
            self.ops.apply_delete_change(cx, spec, &patch.to_delete).await.map_err(|e| e.within(name, "apply_delete"))?;
        }
        if !patch.to_update.is_empty() {
            debug!(resource = name, count = patch.to_update.len(), "updating objects");
            self.ops.apply_update_change(cx, spec, &patch.to_update).await.map_err(|e| e.within(name, "apply_update"))?;
        }
        info!(
            resource = name,
            cluster = %spec.id,
            created = patch.to_create.len(),
            updated = patch.to_update.len(),
            deleted = patch.to_delete.len(),
            "applied patch"
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl<O: CrudOps> Reconciler for CrudResource<O> {
    fn name(&self) -> &'static str {
        self.ops.name()
    }

    async fn ensure_created(&self, cx: &PassContext, spec: &ClusterSpec) -> Result<Flow> {
        let Some((current, desired)) = self.observe(cx, spec).await? else {
            return Ok(Flow::Cancelled);
        };
        let name = self.ops.name();
        let patch = self
            .ops
            .new_create_patch(cx, spec, &current, &desired)
            .and_then(|p| Ok(p.merge(self.ops.new_delete_patch(cx, spec, &current, &desired)?)))
            .and_then(|p| Ok(p.merge(self.ops.new_update_patch(cx, spec, &current, &desired)?)))
            .map_err(|e| e.within(name, "patch"))?;
        self.apply(cx, spec, patch).await?;
        Ok(Flow::Proceed)
    }

    async fn ensure_deleted(&self, cx: &PassContext, spec: &ClusterSpec) -> Result<Flow> {
        let Some((current, desired)) = self.observe(cx, spec).await? else {
            return Ok(Flow::Cancelled);
        };
        let patch = self
            .ops
            .new_teardown_patch(cx, spec, &current, &desired)
            .map_err(|e| e.within(self.ops.name(), "patch"))?;
        self.apply(cx, spec, patch).await?;
        Ok(Flow::Proceed)
    }
}
