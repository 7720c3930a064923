//! kvmop kubehub: the orchestration API contract consumed by the reconcilers,
//! with a kube-backed implementation and an in-memory one.

#![forbid(unsafe_code)]

use std::{fmt::Debug, marker::PhantomData, sync::Arc};

use k8s_openapi::{
    api::{
        apps::v1::Deployment,
        core::v1::{ConfigMap, Namespace, PersistentVolumeClaim, Service, ServiceAccount},
        networking::v1::Ingress,
    },
    ClusterResourceScope, NamespaceResourceScope,
};
use kube::{
    api::{Api, DeleteParams, ListParams, PostParams},
    Client, Resource, ResourceExt,
};
use kvmop_core::{Error, Result};
use metrics::counter;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

pub mod memory;

pub use memory::{Call, MemoryApi, MemoryClients, Verb};

/// CRUD access to one object kind.
///
/// `get` maps NotFound to `Ok(None)`; `create` signals `AlreadyExists`,
/// `update` and `delete` signal `NotFound` and stale writes signal `Conflict`.
/// Cluster-scoped implementations ignore `namespace`.
#[async_trait::async_trait]
pub trait ObjectApi<K>: Send + Sync {
    async fn list(&self, namespace: &str) -> Result<Vec<K>>;
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>>;
    async fn create(&self, namespace: &str, obj: &K) -> Result<()>;
    async fn update(&self, namespace: &str, obj: &K) -> Result<()>;
    async fn delete(&self, namespace: &str, name: &str) -> Result<()>;
}

/// Map a kube error onto the engine taxonomy.
pub fn classify(err: kube::Error, what: &str) -> Error {
    match err {
        kube::Error::Api(resp) => match resp.code {
            404 => Error::NotFound(format!("{}: {}", what, resp.message)),
            409 if resp.reason == "AlreadyExists" => Error::AlreadyExists(format!("{}: {}", what, resp.message)),
            409 => Error::Conflict(format!("{}: {}", what, resp.message)),
            429 | 500..=599 => Error::Unavailable(format!("{}: {} ({})", what, resp.message, resp.code)),
            _ => Error::Api(format!("{}: {} ({} {})", what, resp.message, resp.code, resp.reason)),
        },
        e @ (kube::Error::HyperError(_) | kube::Error::Service(_)) => Error::Unavailable(format!("{}: {}", what, e)),
        e => Error::Api(format!("{}: {}", what, e)),
    }
}

fn record<K: Resource<DynamicType = ()>>(verb: &'static str) {
    counter!("kvmop_api_calls_total", 1u64, "kind" => K::kind(&()).into_owned(), "verb" => verb);
}

/// Namespaced kinds backed by `kube::Api`.
pub struct KubeApi<K> {
    client: Client,
    _kind: PhantomData<fn() -> K>,
}

impl<K> KubeApi<K> {
    pub fn new(client: Client) -> Self {
        Self { client, _kind: PhantomData }
    }
}

#[async_trait::async_trait]
impl<K> ObjectApi<K> for KubeApi<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()> + Clone + Debug + DeserializeOwned + Serialize + Send + Sync + 'static,
{
    async fn list(&self, namespace: &str) -> Result<Vec<K>> {
        record::<K>("list");
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default()).await.map_err(|e| classify(e, namespace))?;
        debug!(kind = %K::kind(&()), ns = %namespace, count = list.items.len(), "listed objects");
        Ok(list.items)
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        record::<K>("get");
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name).await.map_err(|e| classify(e, name))
    }

    async fn create(&self, namespace: &str, obj: &K) -> Result<()> {
        record::<K>("create");
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.create(&PostParams::default(), obj).await.map_err(|e| classify(e, &obj.name_any()))?;
        Ok(())
    }

    async fn update(&self, namespace: &str, obj: &K) -> Result<()> {
        record::<K>("update");
        let name = obj.name_any();
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.replace(&name, &PostParams::default(), obj).await.map_err(|e| classify(e, &name))?;
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        record::<K>("delete");
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::default()).await.map_err(|e| classify(e, name))?;
        Ok(())
    }
}

/// Cluster-scoped kinds backed by `kube::Api`.
pub struct KubeClusterApi<K> {
    client: Client,
    _kind: PhantomData<fn() -> K>,
}

impl<K> KubeClusterApi<K> {
    pub fn new(client: Client) -> Self {
        Self { client, _kind: PhantomData }
    }
}

#[async_trait::async_trait]
impl<K> ObjectApi<K> for KubeClusterApi<K>
where
    K: Resource<Scope = ClusterResourceScope, DynamicType = ()> + Clone + Debug + DeserializeOwned + Serialize + Send + Sync + 'static,
{
    async fn list(&self, _namespace: &str) -> Result<Vec<K>> {
        record::<K>("list");
        let api: Api<K> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await.map_err(|e| classify(e, "list"))?;
        Ok(list.items)
    }

    async fn get(&self, _namespace: &str, name: &str) -> Result<Option<K>> {
        record::<K>("get");
        let api: Api<K> = Api::all(self.client.clone());
        api.get_opt(name).await.map_err(|e| classify(e, name))
    }

    async fn create(&self, _namespace: &str, obj: &K) -> Result<()> {
        record::<K>("create");
        let api: Api<K> = Api::all(self.client.clone());
        api.create(&PostParams::default(), obj).await.map_err(|e| classify(e, &obj.name_any()))?;
        Ok(())
    }

    async fn update(&self, _namespace: &str, obj: &K) -> Result<()> {
        record::<K>("update");
        let name = obj.name_any();
        let api: Api<K> = Api::all(self.client.clone());
        api.replace(&name, &PostParams::default(), obj).await.map_err(|e| classify(e, &name))?;
        Ok(())
    }

    async fn delete(&self, _namespace: &str, name: &str) -> Result<()> {
        record::<K>("delete");
        let api: Api<K> = Api::all(self.client.clone());
        api.delete(name, &DeleteParams::default()).await.map_err(|e| classify(e, name))?;
        Ok(())
    }
}

/// One API handle per managed kind.
#[derive(Clone)]
pub struct Clients {
    pub namespaces: Arc<dyn ObjectApi<Namespace>>,
    pub service_accounts: Arc<dyn ObjectApi<ServiceAccount>>,
    pub config_maps: Arc<dyn ObjectApi<ConfigMap>>,
    pub deployments: Arc<dyn ObjectApi<Deployment>>,
    pub ingresses: Arc<dyn ObjectApi<Ingress>>,
    pub volume_claims: Arc<dyn ObjectApi<PersistentVolumeClaim>>,
    pub services: Arc<dyn ObjectApi<Service>>,
}

impl Clients {
    pub fn kube(client: Client) -> Self {
        Self {
            namespaces: Arc::new(KubeClusterApi::new(client.clone())),
            service_accounts: Arc::new(KubeApi::new(client.clone())),
            config_maps: Arc::new(KubeApi::new(client.clone())),
            deployments: Arc::new(KubeApi::new(client.clone())),
            ingresses: Arc::new(KubeApi::new(client.clone())),
            volume_claims: Arc::new(KubeApi::new(client.clone())),
            services: Arc::new(KubeApi::new(client)),
        }
    }

    /// Clients for the current kube context (kubeconfig or in-cluster).
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| Error::invalid_config(format!("kube client: {}", e)))?;
        Ok(Self::kube(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_err(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".into(),
            message: "boom".into(),
            reason: reason.into(),
            code,
        })
    }

    #[test]
    fn classify_maps_status_codes() {
        assert!(matches!(classify(api_err(404, "NotFound"), "x"), Error::NotFound(_)));
        assert!(matches!(classify(api_err(409, "AlreadyExists"), "x"), Error::AlreadyExists(_)));
        assert!(matches!(classify(api_err(409, "Conflict"), "x"), Error::Conflict(_)));
        assert!(matches!(classify(api_err(429, "TooManyRequests"), "x"), Error::Unavailable(_)));
        assert!(matches!(classify(api_err(503, "ServiceUnavailable"), "x"), Error::Unavailable(_)));
        assert!(matches!(classify(api_err(422, "Invalid"), "x"), Error::Api(_)));
        assert!(matches!(classify(api_err(403, "Forbidden"), "x"), Error::Api(_)));
    }

    #[test]
    fn classify_keeps_object_name() {
        let e = classify(api_err(404, "NotFound"), "worker-w1");
        assert_eq!(e.to_string(), "not found: worker-w1: boom");
    }
}
