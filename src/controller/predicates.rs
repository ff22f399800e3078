//! Watch event filtering for intent objects
//!
//! Intents are immutable once created, so the only notifications worth a reconcile are
//! the first sighting of an object and its transition into deletion. Delete events are
//! never reconciled; teardown runs off the finalizer.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use kube::Resource;

/// Whether a change from `old` to `new` should trigger a reconcile
pub fn should_reconcile<K: Resource>(old: Option<&K>, new: &K) -> bool {
    match old {
        None => true,
        Some(old) => {
            old.meta().deletion_timestamp.is_none() && new.meta().deletion_timestamp.is_some()
        }
    }
}

/// Hash predicate for `predicate_filter`: changes only on first sight of a uid and when
/// deletion is requested, which realises [`should_reconcile`] on a watch stream.
pub fn deletion_transition<K: Resource>(object: &K) -> Option<u64> {
    let mut hasher = DefaultHasher::new();
    object.meta().uid.hash(&mut hasher);
    object.meta().deletion_timestamp.is_some().hash(&mut hasher);
    Some(hasher.finish())
}
