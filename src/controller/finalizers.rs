//! Finalizer handling for AWI connection intents
//!
//! An intent is never removed from the store while its finalizer is present. The
//! finalizer is only dropped after the control plane confirmed the teardown, so a
//! failing teardown keeps the object (and its finalizer) around until a later
//! reconcile succeeds.

use async_trait::async_trait;
use kube::{Resource, ResourceExt};
use tracing::{debug, info};

use crate::error::Result;
use crate::store::{update_with_retry, ObjectStore};

/// Finalizer protecting InterNetworkDomainConnection resources
pub const CONNECTION_FINALIZER: &str =
    "internetworkdomainconnection.awi.app-net-interface.io/finalizer";

/// Finalizer protecting InterNetworkDomainAppConnection resources
pub const APP_CONNECTION_FINALIZER: &str =
    "internetworkdomainappconnection.awi.app-net-interface.io/finalizer";

/// Where an intent object is in its two-phase delete lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// Live object that has not been given the finalizer yet
    NoMarker,
    /// Live object carrying the finalizer
    Marked,
    /// Deletion requested, finalizer still present: teardown pending
    TearingDown,
    /// Deletion requested and the finalizer is gone (or the object is)
    Gone,
}

/// Classify an object by deletion timestamp and finalizer presence
pub fn lifecycle<K: Resource>(object: &K, finalizer: &str) -> Lifecycle {
    let deleting = object.meta().deletion_timestamp.is_some();
    match (deleting, has_finalizer(object, finalizer)) {
        (false, false) => Lifecycle::NoMarker,
        (false, true) => Lifecycle::Marked,
        (true, true) => Lifecycle::TearingDown,
        (true, false) => Lifecycle::Gone,
    }
}

pub fn has_finalizer<K: Resource>(object: &K, finalizer: &str) -> bool {
    object.finalizers().iter().any(|f| f == finalizer)
}

/// Add the finalizer unless it is present or deletion already started
fn add_finalizer<K: Resource>(object: &mut K, finalizer: &str) -> bool {
    if object.meta().deletion_timestamp.is_some() || has_finalizer(object, finalizer) {
        return false;
    }
    object.finalizers_mut().push(finalizer.to_string());
    true
}

fn remove_finalizer<K: Resource>(object: &mut K, finalizer: &str) -> bool {
    let before = object.finalizers().len();
    object.finalizers_mut().retain(|f| f != finalizer);
    object.finalizers().len() != before
}

/// Side effects of an intent on the control plane
#[async_trait]
pub trait IntentHandler<K>: Send + Sync {
    /// Establish (or re-assert) the intent remotely. Must be idempotent.
    async fn apply(&self, object: &K) -> Result<()>;

    /// Tear the intent down remotely. Must be idempotent; runs before the finalizer is
    /// removed.
    async fn cleanup(&self, object: &K) -> Result<()>;
}

/// Drive one intent object through its lifecycle.
///
/// The object is always re-read from the store first; a missing object is treated as
/// already deleted. Returns the lifecycle state that was acted upon.
pub async fn reconcile_intent<K, S, H>(
    store: &S,
    handler: &H,
    namespace: &str,
    name: &str,
    finalizer: &str,
) -> Result<Lifecycle>
where
    K: Resource + Clone + Send + Sync + 'static,
    S: ObjectStore<K> + ?Sized,
    H: IntentHandler<K> + ?Sized,
{
    let Some(object) = store.get(namespace, name).await? else {
        debug!("{}/{} no longer exists", namespace, name);
        return Ok(Lifecycle::Gone);
    };

    match lifecycle(&object, finalizer) {
        Lifecycle::NoMarker => {
            let marked =
                update_with_retry(store, namespace, name, |obj: &mut K| add_finalizer(obj, finalizer))
                    .await?;
            let Some(marked) = marked else {
                return Ok(Lifecycle::Gone);
            };
            if lifecycle(&marked, finalizer) != Lifecycle::Marked {
                debug!("{}/{} is being deleted, not connecting", namespace, name);
                return Ok(lifecycle(&marked, finalizer));
            }
            info!("Added finalizer to {}/{}", namespace, name);
            handler.apply(&marked).await?;
            Ok(Lifecycle::NoMarker)
        }
        Lifecycle::Marked => {
            handler.apply(&object).await?;
            Ok(Lifecycle::Marked)
        }
        Lifecycle::TearingDown => {
            handler.cleanup(&object).await?;
            update_with_retry(store, namespace, name, |obj: &mut K| {
                remove_finalizer(obj, finalizer)
            })
            .await?;
            info!("Removed finalizer from {}/{}", namespace, name);
            Ok(Lifecycle::TearingDown)
        }
        Lifecycle::Gone => {
            debug!("{}/{} has no finalizer left", namespace, name);
            Ok(Lifecycle::Gone)
        }
    }
}
