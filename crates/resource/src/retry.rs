//! Bounded exponential backoff for transient API failures, and the
//! [`Retry`] decorator applying it to every reconciler call.

use std::{future::Future, time::Duration};

use kvmop_core::{ClusterSpec, Observed, PassContext, Patch, Result};
use kvmop_kubehub::ObjectApi;
use metrics::counter;
use tracing::{error, warn};

use crate::ops::CrudOps;

#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: crate::set::RESOURCE_RETRIES,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn with_max_attempts(attempts: u32) -> Self {
        Self { max_attempts: attempts, ..Default::default() }
    }
}

/// Run `call` until it succeeds, fails permanently, or the attempt ceiling is hit.
pub async fn retry_transient<T, F, Fut>(config: &RetryConfig, resource: &'static str, op: &'static str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0u32;
    let mut delay = config.initial_delay;
    loop {
        attempt += 1;
        match call().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                warn!(resource, op, attempt, error = %e, delay_ms = delay.as_millis() as u64, "transient failure, retrying");
                counter!("kvmop_resource_retries_total", 1u64, "resource" => resource, "op" => op);
                tokio::time::sleep(delay).await;
                delay = delay.mul_f64(config.multiplier).min(config.max_delay);
            }
            Err(e) => {
                if e.is_transient() {
                    error!(resource, op, attempt, error = %e, "giving up after max attempts");
                }
                return Err(e);
            }
        }
    }
}

/// Retries the API-facing operations of the wrapped reconciler.
pub struct Retry<O> {
    inner: O,
    config: RetryConfig,
}

impl<O> Retry<O> {
    pub fn new(inner: O, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait::async_trait]
impl<O: CrudOps> CrudOps for Retry<O> {
    type Object = O::Object;

    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn api(&self) -> &dyn ObjectApi<Self::Object> {
        self.inner.api()
    }

    async fn current_state(&self, cx: &PassContext, spec: &ClusterSpec) -> Result<Observed<Vec<Self::Object>>> {
        let inner = &self.inner;
        retry_transient(&self.config, inner.name(), "current_state", move || inner.current_state(cx, spec)).await
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
        let inner = &self.inner;
        retry_transient(&self.config, inner.name(), "apply_create", move || inner.apply_create_change(cx, spec, objects)).await
    }

    async fn apply_update_change(&self, cx: &PassContext, spec: &ClusterSpec, objects: &[Self::Object]) -> Result<()> {
        let inner = &self.inner;
        retry_transient(&self.config, inner.name(), "apply_update", move || inner.apply_update_change(cx, spec, objects)).await
    }

    async fn apply_delete_change(&self, cx: &PassContext, spec: &ClusterSpec, objects: &[Self::Object]) -> Result<()> {
        let inner = &self.inner;
        retry_transient(&self.config, inner.name(), "apply_delete", move || inner.apply_delete_change(cx, spec, objects)).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use kvmop_core::Error;

    fn fast(attempts: u32) -> RetryConfig {
        RetryConfig { max_attempts: attempts, initial_delay: Duration::from_millis(1), max_delay: Duration::from_millis(2), multiplier: 2.0 }
    }

    #[tokio::test]
    async fn conflict_is_retried_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let out = retry_transient(&fast(3), "deployment", "apply_update", move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 { Err(Error::Conflict("stale".into())) } else { Ok(n) }
        })
        .await;
        assert_eq!(out.unwrap(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_at_attempt_ceiling() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let out: Result<()> = retry_transient(&fast(3), "deployment", "apply_update", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Unavailable("503".into()))
        })
        .await;
        assert!(out.unwrap_err().is_transient());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let out: Result<()> = retry_transient(&fast(3), "ingress", "apply_create", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Api("forbidden".into()))
        })
        .await;
        assert!(matches!(out, Err(Error::Api(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn default_ceiling_is_three_attempts() {
        assert_eq!(RetryConfig::default().max_attempts, 3);
    }
}
