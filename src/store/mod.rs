//! Object store access for AWI resources
//!
//! Every write is checked against the object's `resourceVersion`; a stale write fails
//! with [`Error::Conflict`] and the caller re-reads before trying again.

use std::fmt::Debug;
use std::marker::PhantomData;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::{
    api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams},
    client::Client,
    Resource, ResourceExt,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Upper bound on read-modify-write attempts before a conflict is surfaced
pub const MAX_UPDATE_ATTEMPTS: usize = 5;

/// Which objects a list call returns
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListScope {
    /// `None` lists across all namespaces
    pub namespace: Option<String>,
    /// Label selector in `key=value[,key=value]` form
    pub label_selector: Option<String>,
}

impl ListScope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn namespaced(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            label_selector: None,
        }
    }

    pub fn with_labels(mut self, selector: impl Into<String>) -> Self {
        self.label_selector = Some(selector.into());
        self
    }
}

/// Revision-checked storage for one object kind
#[async_trait]
pub trait ObjectStore<K>: Send + Sync
where
    K: Clone + Send + Sync + 'static,
{
    /// Fetch one object; a missing object is `Ok(None)`
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>>;

    async fn list(&self, scope: &ListScope) -> Result<Vec<K>>;

    async fn create(&self, namespace: &str, object: &K) -> Result<K>;

    /// Replace the whole object, failing on a stale `resourceVersion`
    async fn replace(&self, object: &K) -> Result<K>;

    /// Replace only the status of the object, failing on a stale `resourceVersion`
    async fn replace_status(&self, object: &K) -> Result<K>;

    /// Request deletion; deleting a missing object succeeds
    async fn delete(&self, namespace: &str, name: &str) -> Result<()>;
}

/// [`ObjectStore`] backed by the Kubernetes API server
pub struct KubeStore<K> {
    client: Client,
    _kind: PhantomData<fn() -> K>,
}

impl<K> KubeStore<K> {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }
}

impl<K> Clone for KubeStore<K> {
    fn clone(&self) -> Self {
        Self::new(self.client.clone())
    }
}

impl<K> KubeStore<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + DeserializeOwned
        + Serialize
        + Send
        + Sync
        + 'static,
{
    fn api(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn api_for(&self, object: &K) -> Result<Api<K>> {
        let namespace = object.namespace().ok_or_else(|| {
            Error::InvalidObject(format!("{} has no namespace", object.name_any()))
        })?;
        Ok(self.api(&namespace))
    }
}

#[async_trait]
impl<K> ObjectStore<K> for KubeStore<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + DeserializeOwned
        + Serialize
        + Send
        + Sync
        + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        Ok(self.api(namespace).get_opt(name).await?)
    }

    async fn list(&self, scope: &ListScope) -> Result<Vec<K>> {
        let api: Api<K> = match &scope.namespace {
            Some(namespace) => self.api(namespace),
            None => Api::all(self.client.clone()),
        };
        let mut params = ListParams::default();
        if let Some(selector) = &scope.label_selector {
            params = params.labels(selector);
        }
        Ok(api.list(&params).await?.items)
    }

    async fn create(&self, namespace: &str, object: &K) -> Result<K> {
        Ok(self
            .api(namespace)
            .create(&PostParams::default(), object)
            .await?)
    }

    async fn replace(&self, object: &K) -> Result<K> {
        Ok(self
            .api_for(object)?
            .replace(&object.name_any(), &PostParams::default(), object)
            .await?)
    }

    async fn replace_status(&self, object: &K) -> Result<K> {
        let value = serde_json::to_value(object)?;
        let patch = json!({
            "metadata": { "resourceVersion": object.resource_version() },
            "status": value.get("status").cloned().unwrap_or_default(),
        });
        Ok(self
            .api_for(object)?
            .patch_status(
                &object.name_any(),
                &PatchParams::default(),
                &Patch::Merge(&patch),
            )
            .await?)
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        match self
            .api(namespace)
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(response)) if response.code == 404 => {
                debug!("{}/{} already deleted", namespace, name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Read-modify-write an object, retrying when the write loses a revision race.
///
/// `mutate` returns whether it changed anything; an unchanged object is not written.
/// A missing object yields `Ok(None)`.
pub async fn update_with_retry<K, S, F>(
    store: &S,
    namespace: &str,
    name: &str,
    mut mutate: F,
) -> Result<Option<K>>
where
    K: Clone + Send + Sync + 'static,
    S: ObjectStore<K> + ?Sized,
    F: FnMut(&mut K) -> bool + Send,
{
    for attempt in 1..=MAX_UPDATE_ATTEMPTS {
        let Some(mut object) = store.get(namespace, name).await? else {
            return Ok(None);
        };
        if !mutate(&mut object) {
            return Ok(Some(object));
        }
        match store.replace(&object).await {
            Ok(updated) => return Ok(Some(updated)),
            Err(Error::Conflict(message)) => {
                debug!(
                    "Update of {}/{} conflicted (attempt {}): {}",
                    namespace, name, attempt, message
                );
            }
            Err(e) => return Err(e),
        }
    }

    warn!(
        "Giving up on {}/{} after {} conflicting updates",
        namespace, name, MAX_UPDATE_ATTEMPTS
    );
    Err(Error::Conflict(format!("{}/{}", namespace, name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{Vpc, VpcSpec};
    use crate::testing::MemoryStore;
    use kube::api::ObjectMeta;

    fn vpc(name: &str) -> Vpc {
        Vpc {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("awi-system".to_string()),
                ..Default::default()
            },
            spec: VpcSpec {
                id: "vpc-111".to_string(),
                name: "development".to_string(),
                provider: "AWS".to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_list_scope_builders() {
        let scope = ListScope::namespaced("awi-system").with_labels("discovered=yes");
        assert_eq!(scope.namespace.as_deref(), Some("awi-system"));
        assert_eq!(scope.label_selector.as_deref(), Some("discovered=yes"));
        assert_eq!(ListScope::all().namespace, None);
    }

    #[tokio::test]
    async fn test_update_with_retry_applies_mutation() {
        let store = MemoryStore::<Vpc>::new();
        store.seed(vpc("aws.vpc-111"));

        let updated = update_with_retry(&store, "awi-system", "aws.vpc-111", |obj: &mut Vpc| {
            obj.spec.region = "us-east-1".to_string();
            true
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(updated.spec.region, "us-east-1");
        assert_eq!(store.writes().replaced, 1);
    }

    #[tokio::test]
    async fn test_update_with_retry_skips_unchanged() {
        let store = MemoryStore::<Vpc>::new();
        store.seed(vpc("aws.vpc-111"));

        update_with_retry(&store, "awi-system", "aws.vpc-111", |_: &mut Vpc| false)
            .await
            .unwrap();

        assert_eq!(store.writes().replaced, 0);
    }

    #[tokio::test]
    async fn test_update_with_retry_missing_object() {
        let store = MemoryStore::<Vpc>::new();
        let result = update_with_retry(&store, "awi-system", "missing", |_: &mut Vpc| true)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_update_with_retry_recovers_from_conflict() {
        let store = MemoryStore::<Vpc>::new();
        store.seed(vpc("aws.vpc-111"));
        store.conflict_next_replaces(2);

        let updated = update_with_retry(&store, "awi-system", "aws.vpc-111", |obj: &mut Vpc| {
            obj.spec.region = "eu-west-1".to_string();
            true
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(updated.spec.region, "eu-west-1");
        assert_eq!(store.writes().replaced, 1);
    }

    #[tokio::test]
    async fn test_update_with_retry_gives_up() {
        let store = MemoryStore::<Vpc>::new();
        store.seed(vpc("aws.vpc-111"));
        store.conflict_next_replaces(MAX_UPDATE_ATTEMPTS);

        let err = update_with_retry(&store, "awi-system", "aws.vpc-111", |_: &mut Vpc| true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }
}
