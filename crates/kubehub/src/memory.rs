//! In-memory object store implementing [`ObjectApi`].
//!
//! Objects are kept per `(namespace, name)` and listed in name order, which is
//! how the API server lists them. Every call is recorded, and failures can be
//! queued per verb to exercise the retry and error paths.

use std::{
    collections::{BTreeMap, VecDeque},
    sync::Arc,
};

use k8s_openapi::api::{
    apps::v1::Deployment,
    core::v1::{ConfigMap, Namespace, PersistentVolumeClaim, Service, ServiceAccount},
    networking::v1::Ingress,
};
use kube::{Resource, ResourceExt};
use kvmop_core::{Error, Result};
use tokio::sync::Mutex;

use crate::{Clients, ObjectApi};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl Verb {
    pub fn is_mutation(self) -> bool {
        matches!(self, Verb::Create | Verb::Update | Verb::Delete)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub verb: Verb,
    pub namespace: String,
    pub name: Option<String>,
}

struct Inner<K> {
    objects: BTreeMap<(String, String), K>,
    calls: Vec<Call>,
    failures: VecDeque<(Verb, Error)>,
    next_rv: u64,
}

pub struct MemoryApi<K> {
    inner: Arc<Mutex<Inner<K>>>,
}

impl<K> Clone for MemoryApi<K> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<K> Default for MemoryApi<K> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                objects: BTreeMap::new(),
                calls: Vec::new(),
                failures: VecDeque::new(),
                next_rv: 1,
            })),
        }
    }
}

impl<K> MemoryApi<K>
where
    K: Resource + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object as-is without recording a call.
    pub async fn seed(&self, namespace: &str, obj: K) {
        let mut g = self.inner.lock().await;
        g.objects.insert((namespace.to_string(), obj.name_any()), obj);
    }

    pub async fn stored(&self, namespace: &str) -> Vec<K> {
        let g = self.inner.lock().await;
        g.objects.iter().filter(|((ns, _), _)| ns == namespace).map(|(_, o)| o.clone()).collect()
    }

    pub async fn stored_one(&self, namespace: &str, name: &str) -> Option<K> {
        let g = self.inner.lock().await;
        g.objects.get(&(namespace.to_string(), name.to_string())).cloned()
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.inner.lock().await.calls.clone()
    }

    pub async fn mutations(&self) -> usize {
        self.inner.lock().await.calls.iter().filter(|c| c.verb.is_mutation()).count()
    }

    pub async fn clear_calls(&self) {
        self.inner.lock().await.calls.clear();
    }

    /// Make the next call with `verb` fail with `err`.
    pub async fn fail_next(&self, verb: Verb, err: Error) {
        self.inner.lock().await.failures.push_back((verb, err));
    }

    async fn enter(&self, verb: Verb, namespace: &str, name: Option<&str>) -> Result<tokio::sync::MutexGuard<'_, Inner<K>>> {
        let mut g = self.inner.lock().await;
        g.calls.push(Call { verb, namespace: namespace.to_string(), name: name.map(|s| s.to_string()) });
        if let Some(pos) = g.failures.iter().position(|(v, _)| *v == verb) {
            if let Some((_, err)) = g.failures.remove(pos) {
                return Err(err);
            }
        }
        Ok(g)
    }
}

fn bump<K: Resource>(obj: &mut K, rv: &mut u64) {
    obj.meta_mut().resource_version = Some(rv.to_string());
    *rv += 1;
}

#[async_trait::async_trait]
impl<K> ObjectApi<K> for MemoryApi<K>
where
    K: Resource + Clone + Send + Sync + 'static,
{
    async fn list(&self, namespace: &str) -> Result<Vec<K>> {
        let g = self.enter(Verb::List, namespace, None).await?;
        Ok(g.objects.iter().filter(|((ns, _), _)| ns == namespace).map(|(_, o)| o.clone()).collect())
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        let g = self.enter(Verb::Get, namespace, Some(name)).await?;
        Ok(g.objects.get(&(namespace.to_string(), name.to_string())).cloned())
    }

    async fn create(&self, namespace: &str, obj: &K) -> Result<()> {
        let name = obj.name_any();
        let mut g = self.enter(Verb::Create, namespace, Some(&name)).await?;
        let key = (namespace.to_string(), name);
        if g.objects.contains_key(&key) {
            return Err(Error::AlreadyExists(key.1));
        }
        let mut obj = obj.clone();
        let Inner { objects, next_rv, .. } = &mut *g;
        bump(&mut obj, next_rv);
        objects.insert(key, obj);
        Ok(())
    }

    async fn update(&self, namespace: &str, obj: &K) -> Result<()> {
        let name = obj.name_any();
        let mut g = self.enter(Verb::Update, namespace, Some(&name)).await?;
        let Inner { objects, next_rv, .. } = &mut *g;
        let Some(stored) = objects.get_mut(&(namespace.to_string(), name.clone())) else {
            return Err(Error::NotFound(name));
        };
        if let Some(rv) = obj.meta().resource_version.as_deref() {
            if stored.meta().resource_version.as_deref() != Some(rv) {
                return Err(Error::Conflict(format!("{}: resource version {} is stale", name, rv)));
            }
        }
        let mut obj = obj.clone();
        bump(&mut obj, next_rv);
        *stored = obj;
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        let mut g = self.enter(Verb::Delete, namespace, Some(name)).await?;
        match g.objects.remove(&(namespace.to_string(), name.to_string())) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(name.to_string())),
        }
    }
}

/// In-memory stores for every managed kind.
#[derive(Clone, Default)]
pub struct MemoryClients {
    pub namespaces: MemoryApi<Namespace>,
    pub service_accounts: MemoryApi<ServiceAccount>,
    pub config_maps: MemoryApi<ConfigMap>,
    pub deployments: MemoryApi<Deployment>,
    pub ingresses: MemoryApi<Ingress>,
    pub volume_claims: MemoryApi<PersistentVolumeClaim>,
    pub services: MemoryApi<Service>,
}

impl MemoryClients {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clients(&self) -> Clients {
        Clients {
            namespaces: Arc::new(self.namespaces.clone()),
            service_accounts: Arc::new(self.service_accounts.clone()),
            config_maps: Arc::new(self.config_maps.clone()),
            deployments: Arc::new(self.deployments.clone()),
            ingresses: Arc::new(self.ingresses.clone()),
            volume_claims: Arc::new(self.volume_claims.clone()),
            services: Arc::new(self.services.clone()),
        }
    }

    /// Mutating calls across all kinds.
    pub async fn mutations(&self) -> usize {
        self.namespaces.mutations().await
            + self.service_accounts.mutations().await
            + self.config_maps.mutations().await
            + self.deployments.mutations().await
            + self.ingresses.mutations().await
            + self.volume_claims.mutations().await
            + self.services.mutations().await
    }

    pub async fn clear_calls(&self) {
        self.namespaces.clear_calls().await;
        self.service_accounts.clear_calls().await;
        self.config_maps.clear_calls().await;
        self.deployments.clear_calls().await;
        self.ingresses.clear_calls().await;
        self.volume_claims.clear_calls().await;
        self.services.clear_calls().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::ObjectMeta;

    fn cm(name: &str) -> ConfigMap {
        ConfigMap { metadata: ObjectMeta { name: Some(name.into()), ..Default::default() }, ..Default::default() }
    }

    #[tokio::test]
    async fn get_missing_is_none() {
        let api = MemoryApi::<ConfigMap>::new();
        assert!(api.get("ns", "x").await.unwrap().is_none());
        assert_eq!(api.calls().await.len(), 1);
        assert_eq!(api.mutations().await, 0);
    }

    #[tokio::test]
    async fn list_is_name_ordered_and_namespace_scoped() {
        let api = MemoryApi::<ConfigMap>::new();
        api.create("ns", &cm("b")).await.unwrap();
        api.create("ns", &cm("a")).await.unwrap();
        api.create("other", &cm("c")).await.unwrap();
        let names: Vec<_> = api.list("ns").await.unwrap().iter().map(|o| o.name_any()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn create_twice_is_already_exists() {
        let api = MemoryApi::<ConfigMap>::new();
        api.create("ns", &cm("a")).await.unwrap();
        let err = api.create("ns", &cm("a")).await.unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn stale_resource_version_conflicts() {
        let api = MemoryApi::<ConfigMap>::new();
        api.create("ns", &cm("a")).await.unwrap();
        let mut stale = api.stored_one("ns", "a").await.unwrap();
        api.update("ns", &cm("a")).await.unwrap();
        stale.data = Some([("k".to_string(), "v".to_string())].into());
        let err = api.update("ns", &stale).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn update_and_delete_missing_are_not_found() {
        let api = MemoryApi::<ConfigMap>::new();
        assert!(api.update("ns", &cm("a")).await.unwrap_err().is_not_found());
        assert!(api.delete("ns", "a").await.unwrap_err().is_not_found());
        assert_eq!(api.mutations().await, 2);
    }

    #[tokio::test]
    async fn queued_failures_hit_matching_verb_once() {
        let api = MemoryApi::<ConfigMap>::new();
        api.fail_next(Verb::Create, Error::Unavailable("503".into())).await;
        assert!(api.list("ns").await.is_ok());
        assert!(api.create("ns", &cm("a")).await.unwrap_err().is_transient());
        assert!(api.create("ns", &cm("a")).await.is_ok());
    }
}
