//! Generic convergence of a locally mirrored object set against a remote listing

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use kube::{Resource, ResourceExt};
use tracing::{debug, info, instrument, warn};

use super::{SyncReport, Syncer};
use crate::error::Result;
use crate::store::{ListScope, ObjectStore};

/// One class of mirrored inventory
#[async_trait]
pub trait MirrorClass: Send + Sync {
    /// Local mirror kind
    type Object: Resource + Clone + Send + Sync + 'static;
    /// Authoritative representation of one remote item
    type Item: Send + Sync;

    fn name(&self) -> &'static str;

    /// Authoritative inventory of the class
    async fn fetch_remote(&self) -> Result<Vec<Self::Item>>;

    /// Deterministic object name of a remote item
    fn key(&self, item: &Self::Item) -> String;

    /// Build the mirror object for a remote item
    fn translate(&self, key: &str, item: &Self::Item) -> Self::Object;

    /// Whether a stale mirror may be deleted
    fn deletable(&self, _object: &Self::Object) -> bool {
        true
    }
}

/// Converges the mirrors of one [`MirrorClass`] inside a single namespace.
///
/// Remote items without a local mirror are created, mirrors without a remote item are
/// deleted unless the class retains them. Existing mirrors are left untouched and items
/// that yield no valid name are skipped. The first failing call ends the pass; whatever
/// was applied before it stays applied.
pub struct ConvergingSyncer<C: MirrorClass> {
    class: C,
    store: Arc<dyn ObjectStore<C::Object>>,
    namespace: String,
}

impl<C: MirrorClass> ConvergingSyncer<C> {
    pub fn new(
        class: C,
        store: Arc<dyn ObjectStore<C::Object>>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            class,
            store,
            namespace: namespace.into(),
        }
    }
}

#[async_trait]
impl<C: MirrorClass> Syncer for ConvergingSyncer<C> {
    fn name(&self) -> &str {
        self.class.name()
    }

    #[instrument(skip(self), fields(class = self.class.name(), namespace = %self.namespace))]
    async fn sync(&self) -> Result<SyncReport> {
        let remote = self.class.fetch_remote().await?;
        let local = self
            .store
            .list(&ListScope::namespaced(&self.namespace))
            .await?;

        let mut stale: BTreeMap<String, C::Object> = local
            .into_iter()
            .map(|object| (object.name_any(), object))
            .collect();
        let mut seen = HashSet::new();
        let mut report = SyncReport::default();

        for item in &remote {
            let key = self.class.key(item);
            if key.is_empty() {
                warn!("Skipping remote {} without a usable name", self.class.name());
                report.skipped += 1;
                continue;
            }
            if !seen.insert(key.clone()) {
                debug!("Duplicate remote {} {}", self.class.name(), key);
                continue;
            }
            if stale.remove(&key).is_some() {
                report.unchanged += 1;
                continue;
            }
            let object = self.class.translate(&key, item);
            self.store.create(&self.namespace, &object).await?;
            info!("Created {} {}/{}", self.class.name(), self.namespace, key);
            report.created += 1;
        }

        for (name, object) in stale {
            if !self.class.deletable(&object) {
                debug!("Keeping {} {}/{}", self.class.name(), self.namespace, name);
                report.retained += 1;
                continue;
            }
            self.store.delete(&self.namespace, &name).await?;
            info!("Deleted {} {}/{}", self.class.name(), self.namespace, name);
            report.deleted += 1;
        }

        Ok(report)
    }
}
