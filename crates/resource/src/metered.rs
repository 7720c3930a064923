//! Duration and outcome metrics around every reconciler call.

use std::{future::Future, time::Instant};

use kvmop_core::{ClusterSpec, Observed, PassContext, Patch, Result};
use kvmop_kubehub::ObjectApi;
use metrics::{counter, histogram};

use crate::ops::CrudOps;

async fn timed<T, Fut>(resource: &'static str, op: &'static str, fut: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    let t0 = Instant::now();
    let res = fut.await;
    histogram!("kvmop_resource_op_ms", t0.elapsed().as_secs_f64() * 1000.0, "resource" => resource, "op" => op);
    let outcome = if res.is_ok() { "ok" } else { "error" };
    counter!("kvmop_resource_ops_total", 1u64, "resource" => resource, "op" => op, "outcome" => outcome);
    res
}

pub struct Metered<O> {
    inner: O,
}

impl<O> Metered<O> {
    pub fn new(inner: O) -> Self {
        Self { inner }
    }
}

#[async_trait::async_trait]
impl<O: CrudOps> CrudOps for Metered<O> {
    type Object = O::Object;

    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn api(&self) -> &dyn ObjectApi<Self::Object> {
        self.inner.api()
    }

    async fn current_state(&self, cx: &PassContext, spec: &ClusterSpec) -> Result<Observed<Vec<Self::Object>>> {
        timed(self.name(), "current_state", self.inner.current_state(cx, spec)).await
    }

    fn desired_state(&self, spec: &ClusterSpec) -> Result<Vec<Self::Object>> {
        self.inner.desired_state(spec)
    }

    fn new_create_patch(&self, cx: &PassContext, spec: &ClusterSpec, current: &[Self::Object], desired: &[Self::Object]) -> Result<Patch<Self::Object>> {
        self.inner.new_create_patch(cx, spec, current, desired)
    }

    fn new_update_patch(&self, cx: &PassContext, spec: &ClusterSpec, current: &[Self::Object], desired: &[Self::Object]) -> Result<Patch<Self::Object>> {
        self.inner.new_update_patch(cx, spec, current, desired)
    }

    fn new_delete_patch(&self, cx: &PassContext, spec: &ClusterSpec, current: &[Self::Object], desired: &[Self::Object]) -> Result<Patch<Self::Object>> {
        self.inner.new_delete_patch(cx, spec, current, desired)
    }

    fn new_teardown_patch(&self, cx: &PassContext, spec: &ClusterSpec, current: &[Self::Object], desired: &[Self::Object]) -> Result<Patch<Self::Object>> {
        self.inner.new_teardown_patch(cx, spec, current, desired)
    }

    async fn apply_create_change(&self, cx: &PassContext, spec: &ClusterSpec, objects: &[Self::Object]) -> Result<()> {
        timed(self.name(), "apply_create", self.inner.apply_create_change(cx, spec, objects)).await
    }

    async fn apply_update_change(&self, cx: &PassContext, spec: &ClusterSpec, objects: &[Self::Object]) -> Result<()> {
        timed(self.name(), "apply_update", self.inner.apply_update_change(cx, spec, objects)).await
    }

    async fn apply_delete_change(&self, cx: &PassContext, spec: &ClusterSpec, objects: &[Self::Object]) -> Result<()> {
        timed(self.name(), "apply_delete", self.inner.apply_delete_change(cx, spec, objects)).await
    }
}
