//! In-memory stand-ins for the object store and the control plane

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::error::ErrorResponse;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::awi::{AppConnectionInformation, ConnectionInformation, ControlPlane};
use crate::crd::{
    AppConnectionConfig, ConnectionRequest, ConnectionState, InstanceSpec, SiteSpec, SubnetSpec,
    VpcSpec, VpnSpec,
};
use crate::error::{Error, Result};
use crate::store::{ListScope, ObjectStore};

/// Number of writes a [`MemoryStore`] has accepted, by kind
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Writes {
    pub created: usize,
    pub replaced: usize,
    pub status_replaced: usize,
    pub deleted: usize,
}

impl Writes {
    pub fn total(&self) -> usize {
        self.created + self.replaced + self.status_replaced + self.deleted
    }
}

struct StoreState<K> {
    objects: BTreeMap<(String, String), K>,
    next_revision: u64,
    writes: Writes,
    pending_conflicts: usize,
    failing_status: HashSet<String>,
}

/// Revision-checked object store with API server finalizer semantics:
/// deleting an object that still carries finalizers only marks it for deletion, and
/// the object disappears once its last finalizer is removed.
pub struct MemoryStore<K> {
    state: Mutex<StoreState<K>>,
}

fn not_found(namespace: &str, name: &str) -> Error {
    Error::from(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("{}/{} not found", namespace, name),
        reason: "NotFound".to_string(),
        code: 404,
    }))
}

fn key_of<K: Resource>(object: &K) -> (String, String) {
    (object.namespace().unwrap_or_default(), object.name_any())
}

fn matches_selector<K: Resource>(object: &K, selector: &str) -> bool {
    selector
        .split(',')
        .filter(|term| !term.is_empty())
        .all(|term| {
            let (key, value) = term.split_once('=').unwrap_or((term, ""));
            object.labels().get(key).map(String::as_str) == Some(value)
        })
}

impl<K> MemoryStore<K>
where
    K: Resource + Clone,
{
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState {
                objects: BTreeMap::new(),
                next_revision: 1,
                writes: Writes::default(),
                pending_conflicts: 0,
                failing_status: HashSet::new(),
            }),
        }
    }

    /// Insert an object without counting it as a write
    pub fn seed(&self, mut object: K) -> K {
        let mut state = self.state.lock().unwrap();
        let revision = state.next_revision;
        state.next_revision += 1;
        let meta = object.meta_mut();
        meta.resource_version = Some(revision.to_string());
        if meta.uid.is_none() {
            meta.uid = Some(format!("uid-{}", revision));
        }
        state.objects.insert(key_of(&object), object.clone());
        object
    }

    pub fn object(&self, namespace: &str, name: &str) -> Option<K> {
        self.state
            .lock()
            .unwrap()
            .objects
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .objects
            .keys()
            .map(|(_, name)| name.clone())
            .collect()
    }

    pub fn writes(&self) -> Writes {
        self.state.lock().unwrap().writes
    }

    pub fn reset_writes(&self) {
        self.state.lock().unwrap().writes = Writes::default();
    }

    /// Make the next `count` replace calls fail as if another writer won the race
    pub fn conflict_next_replaces(&self, count: usize) {
        self.state.lock().unwrap().pending_conflicts = count;
    }

    /// Reject status writes for the named object
    pub fn fail_status_writes(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_status
            .insert(name.to_string());
    }

    fn checked_current(state: &StoreState<K>, object: &K) -> Result<K> {
        let (namespace, name) = key_of(object);
        let current = state
            .objects
            .get(&(namespace.clone(), name.clone()))
            .ok_or_else(|| not_found(&namespace, &name))?;
        if current.resource_version() != object.resource_version() {
            return Err(Error::Conflict(format!(
                "{}/{} is at revision {:?}, not {:?}",
                namespace,
                name,
                current.resource_version(),
                object.resource_version()
            )));
        }
        Ok(current.clone())
    }
}

impl<K> Default for MemoryStore<K>
where
    K: Resource + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K> ObjectStore<K> for MemoryStore<K>
where
    K: Resource + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        Ok(self.object(namespace, name))
    }

    async fn list(&self, scope: &ListScope) -> Result<Vec<K>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .objects
            .iter()
            .filter(|((namespace, _), _)| {
                scope.namespace.as_deref().map_or(true, |ns| ns == namespace.as_str())
            })
            .filter(|(_, object)| {
                scope
                    .label_selector
                    .as_deref()
                    .map_or(true, |selector| matches_selector(*object, selector))
            })
            .map(|(_, object)| object.clone())
            .collect())
    }

    async fn create(&self, namespace: &str, object: &K) -> Result<K> {
        let mut state = self.state.lock().unwrap();
        let mut object = object.clone();
        object.meta_mut().namespace = Some(namespace.to_string());
        let key = key_of(&object);
        if state.objects.contains_key(&key) {
            return Err(Error::Conflict(format!("{}/{} already exists", key.0, key.1)));
        }
        let revision = state.next_revision;
        state.next_revision += 1;
        let meta = object.meta_mut();
        meta.resource_version = Some(revision.to_string());
        meta.uid = Some(format!("uid-{}", revision));
        meta.creation_timestamp = Some(Time(Utc::now()));
        state.objects.insert(key, object.clone());
        state.writes.created += 1;
        Ok(object)
    }

    async fn replace(&self, object: &K) -> Result<K> {
        let mut state = self.state.lock().unwrap();
        if state.pending_conflicts > 0 {
            state.pending_conflicts -= 1;
            return Err(Error::Conflict(format!("{} changed", object.name_any())));
        }
        let current = Self::checked_current(&state, object)?;
        let key = key_of(object);
        let mut updated = object.clone();
        updated.meta_mut().deletion_timestamp = current.meta().deletion_timestamp.clone();
        state.writes.replaced += 1;

        if updated.meta().deletion_timestamp.is_some() && updated.finalizers().is_empty() {
            state.objects.remove(&key);
            return Ok(updated);
        }

        let revision = state.next_revision;
        state.next_revision += 1;
        updated.meta_mut().resource_version = Some(revision.to_string());
        state.objects.insert(key, updated.clone());
        Ok(updated)
    }

    async fn replace_status(&self, object: &K) -> Result<K> {
        let mut state = self.state.lock().unwrap();
        if state.failing_status.contains(&object.name_any()) {
            return Err(Error::InvalidObject(format!(
                "status of {} is read-only",
                object.name_any()
            )));
        }
        let current = Self::checked_current(&state, object)?;

        let mut merged = serde_json::to_value(&current)?;
        let incoming = serde_json::to_value(object)?;
        merged["status"] = incoming.get("status").cloned().unwrap_or_default();
        let mut updated: K = serde_json::from_value(merged)?;

        let revision = state.next_revision;
        state.next_revision += 1;
        updated.meta_mut().resource_version = Some(revision.to_string());
        state.objects.insert(key_of(&updated), updated.clone());
        state.writes.status_replaced += 1;
        Ok(updated)
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let key = (namespace.to_string(), name.to_string());
        let Some(current) = state.objects.get(&key).cloned() else {
            return Ok(());
        };
        state.writes.deleted += 1;

        if current.finalizers().is_empty() {
            state.objects.remove(&key);
            return Ok(());
        }

        if current.meta().deletion_timestamp.is_none() {
            let revision = state.next_revision;
            state.next_revision += 1;
            let mut marked = current;
            let meta = marked.meta_mut();
            meta.deletion_timestamp = Some(Time(Utc::now()));
            meta.resource_version = Some(revision.to_string());
            state.objects.insert(key, marked);
        }
        Ok(())
    }
}

/// Outbound control plane call, as observed by [`FakeControlPlane`]
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Connect(String),
    Disconnect(String),
    ConnectApps(AppConnectionConfig),
    DisconnectApps(String),
    ListConnections,
    ListConnectedApps,
    ListVpcs(String),
    ListSubnets(String),
    ListInstances(String),
    ListSites,
    ListVpns,
}

/// Recording control plane with canned inventory and switchable failures
pub struct FakeControlPlane {
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashMap<&'static str, u16>>,
    connect_state: Mutex<ConnectionState>,
    connections: Mutex<Vec<ConnectionInformation>>,
    app_connections: Mutex<Vec<AppConnectionInformation>>,
    vpcs: Mutex<Vec<VpcSpec>>,
    subnets: Mutex<Vec<SubnetSpec>>,
    instances: Mutex<Vec<InstanceSpec>>,
    sites: Mutex<Vec<SiteSpec>>,
    vpns: Mutex<Vec<VpnSpec>>,
}

impl Default for FakeControlPlane {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashMap::new()),
            connect_state: Mutex::new(ConnectionState::InProgress),
            connections: Mutex::new(Vec::new()),
            app_connections: Mutex::new(Vec::new()),
            vpcs: Mutex::new(Vec::new()),
            subnets: Mutex::new(Vec::new()),
            instances: Mutex::new(Vec::new()),
            sites: Mutex::new(Vec::new()),
            vpns: Mutex::new(Vec::new()),
        }
    }
}

impl FakeControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Make the named operation (`"disconnect"`, `"list_vpcs"`, ...) fail
    pub fn fail(&self, operation: &'static str) {
        self.fail_with_status(operation, 503);
    }

    /// Make the named operation fail with the given HTTP status
    pub fn fail_with_status(&self, operation: &'static str, status: u16) {
        self.failing.lock().unwrap().insert(operation, status);
    }

    pub fn recover(&self, operation: &'static str) {
        self.failing.lock().unwrap().remove(operation);
    }

    pub fn set_connect_state(&self, state: ConnectionState) {
        *self.connect_state.lock().unwrap() = state;
    }

    pub fn set_connections(&self, connections: Vec<ConnectionInformation>) {
        *self.connections.lock().unwrap() = connections;
    }

    pub fn set_app_connections(&self, app_connections: Vec<AppConnectionInformation>) {
        *self.app_connections.lock().unwrap() = app_connections;
    }

    pub fn set_vpcs(&self, vpcs: Vec<VpcSpec>) {
        *self.vpcs.lock().unwrap() = vpcs;
    }

    pub fn set_subnets(&self, subnets: Vec<SubnetSpec>) {
        *self.subnets.lock().unwrap() = subnets;
    }

    pub fn set_instances(&self, instances: Vec<InstanceSpec>) {
        *self.instances.lock().unwrap() = instances;
    }

    pub fn set_sites(&self, sites: Vec<SiteSpec>) {
        *self.sites.lock().unwrap() = sites;
    }

    pub fn set_vpns(&self, vpns: Vec<VpnSpec>) {
        *self.vpns.lock().unwrap() = vpns;
    }

    fn record(&self, operation: &'static str, call: Call) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if let Some(status) = self.failing.lock().unwrap().get(operation) {
            return Err(Error::ControlPlane {
                status: *status,
                message: format!("{} failed", operation),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn connect(&self, request: &ConnectionRequest) -> Result<ConnectionState> {
        self.record("connect", Call::Connect(request.connection_key()))?;
        Ok(*self.connect_state.lock().unwrap())
    }

    async fn disconnect(&self, connection_key: &str) -> Result<()> {
        self.record("disconnect", Call::Disconnect(connection_key.to_string()))
    }

    async fn connect_apps(&self, request: &AppConnectionConfig) -> Result<ConnectionState> {
        self.record("connect_apps", Call::ConnectApps(request.clone()))?;
        Ok(*self.connect_state.lock().unwrap())
    }

    async fn disconnect_apps(&self, app_connection_key: &str) -> Result<()> {
        self.record(
            "disconnect_apps",
            Call::DisconnectApps(app_connection_key.to_string()),
        )
    }

    async fn list_connections(&self) -> Result<Vec<ConnectionInformation>> {
        self.record("list_connections", Call::ListConnections)?;
        Ok(self.connections.lock().unwrap().clone())
    }

    async fn list_connected_apps(&self) -> Result<Vec<AppConnectionInformation>> {
        self.record("list_connected_apps", Call::ListConnectedApps)?;
        Ok(self.app_connections.lock().unwrap().clone())
    }

    async fn list_vpcs(&self, provider: &str) -> Result<Vec<VpcSpec>> {
        self.record("list_vpcs", Call::ListVpcs(provider.to_string()))?;
        Ok(self
            .vpcs
            .lock()
            .unwrap()
            .iter()
            .filter(|vpc| {
                vpc.provider.is_empty() || vpc.provider.eq_ignore_ascii_case(provider)
            })
            .cloned()
            .collect())
    }

    async fn list_subnets(&self, provider: &str) -> Result<Vec<SubnetSpec>> {
        self.record("list_subnets", Call::ListSubnets(provider.to_string()))?;
        Ok(self
            .subnets
            .lock()
            .unwrap()
            .iter()
            .filter(|subnet| {
                subnet.provider.is_empty() || subnet.provider.eq_ignore_ascii_case(provider)
            })
            .cloned()
            .collect())
    }

    async fn list_instances(&self, provider: &str) -> Result<Vec<InstanceSpec>> {
        self.record("list_instances", Call::ListInstances(provider.to_string()))?;
        Ok(self
            .instances
            .lock()
            .unwrap()
            .iter()
            .filter(|instance| {
                instance.provider.is_empty() || instance.provider.eq_ignore_ascii_case(provider)
            })
            .cloned()
            .collect())
    }

    async fn list_sites(&self) -> Result<Vec<SiteSpec>> {
        self.record("list_sites", Call::ListSites)?;
        Ok(self.sites.lock().unwrap().clone())
    }

    async fn list_vpns(&self) -> Result<Vec<VpnSpec>> {
        self.record("list_vpns", Call::ListVpns)?;
        Ok(self.vpns.lock().unwrap().clone())
    }
}
