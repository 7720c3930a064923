use std::fmt::Debug;

use kube::Resource;
use kvmop_core::{ClusterSpec, Observed, PassContext, Patch, Result};
use kvmop_kubehub::ObjectApi;
use tracing::debug;

use crate::diff;

/// Uniform CRUD contract implemented once per managed kind.
///
/// Patch computations are pure. Only `current_state` and the `apply_*`
/// methods talk to the orchestration API, and those are the calls the
/// retry and metrics decorators wrap.
#[async_trait::async_trait]
pub trait CrudOps: Send + Sync {
    type Object: Resource<DynamicType = ()> + Clone + Debug + Send + Sync + 'static;

    fn name(&self) -> &'static str;

    fn api(&self) -> &dyn ObjectApi<Self::Object>;

    /// Objects of this kind in the cluster namespace. An empty namespace is a
    /// valid state, not an error.
    async fn current_state(&self, _cx: &PassContext, spec: &ClusterSpec) -> Result<Observed<Vec<Self::Object>>> {
        match self.api().list(spec.namespace()).await {
            Ok(objects) => Ok(Observed::State(objects)),
            Err(e) if e.is_not_found() => {
                debug!(resource = self.name(), ns = %spec.namespace(), "nothing to list");
                Ok(Observed::State(Vec::new()))
            }
            Err(e) => Err(e),
        }
    }

    fn desired_state(&self, spec: &ClusterSpec) -> Result<Vec<Self::Object>>;

    fn new_create_patch(
        &self,
        _cx: &PassContext,
        _spec: &ClusterSpec,
        current: &[Self::Object],
        desired: &[Self::Object],
    ) -> Result<Patch<Self::Object>> {
        Ok(Patch::create(diff::absent_from(desired, current)))
    }

    fn new_update_patch(
        &self,
        _cx: &PassContext,
        _spec: &ClusterSpec,
        _current: &[Self::Object],
        _desired: &[Self::Object],
    ) -> Result<Patch<Self::Object>> {
        Ok(Patch::new())
    }

    fn new_delete_patch(
        &self,
        _cx: &PassContext,
        _spec: &ClusterSpec,
        current: &[Self::Object],
        desired: &[Self::Object],
    ) -> Result<Patch<Self::Object>> {
        Ok(Patch::delete(diff::absent_from(current, desired)))
    }

    /// Managed objects to remove when the cluster itself goes away.
    fn new_teardown_patch(
        &self,
        _cx: &PassContext,
        _spec: &ClusterSpec,
        current: &[Self::Object],
        desired: &[Self::Object],
    ) -> Result<Patch<Self::Object>> {
        Ok(Patch::delete(diff::present_in(current, desired)))
    }

    async fn apply_create_change(&self, _cx: &PassContext, spec: &ClusterSpec, objects: &[Self::Object]) -> Result<()> {
        for obj in objects {
            match self.api().create(spec.namespace(), obj).await {
                Ok(()) => {}
                Err(e) if e.is_already_exists() => {
                    debug!(resource = self.name(), name = %diff::name_of(obj), "already exists");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn apply_update_change(&self, _cx: &PassContext, spec: &ClusterSpec, objects: &[Self::Object]) -> Result<()> {
        for obj in objects {
            self.api().update(spec.namespace(), obj).await?;
        }
        Ok(())
    }

    async fn apply_delete_change(&self, _cx: &PassContext, spec: &ClusterSpec, objects: &[Self::Object]) -> Result<()> {
        for obj in objects {
            match self.api().delete(spec.namespace(), diff::name_of(obj)).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    debug!(resource = self.name(), name = %diff::name_of(obj), "already gone");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
