//! Inventory synchronisation
//!
//! Keeps the discovered inventory CRDs (VPCs, subnets, instances, sites, VPNs and the
//! derived network domains) in line with the control plane. All mirrors live in one
//! namespace and are named deterministically from the remote identity.

mod converge;
mod inventory;
mod network_domain;
mod scheduler;

use std::sync::Arc;

use async_trait::async_trait;

pub use converge::{ConvergingSyncer, MirrorClass};
pub use inventory::{InstanceClass, Provided, SiteClass, SubnetClass, VpcClass, VpnClass};
pub use network_domain::NetworkDomainClass;
pub use scheduler::SyncScheduler;

use crate::awi::ControlPlane;
use crate::crd::{Instance, NetworkDomain, Site, Subnet, Vpc, Vpn};
use crate::error::Result;
use crate::store::ObjectStore;

/// Maximum length of an object name
const MAX_NAME_LEN: usize = 253;

/// Outcome of one syncer pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: usize,
    pub deleted: usize,
    pub unchanged: usize,
    /// Stale mirrors kept because the class does not own them
    pub retained: usize,
    /// Remote items that produced no valid object name
    pub skipped: usize,
}

#[async_trait]
pub trait Syncer: Send + Sync {
    fn name(&self) -> &str;

    async fn sync(&self) -> Result<SyncReport>;
}

/// Object name from identity segments: lower-cased, joined with `.`, restricted to
/// `[a-z0-9.-]`. Every dot-separated label starts and ends alphanumeric and empty labels
/// are dropped. The result is empty when no segment has an alphanumeric character.
pub fn object_name(parts: &[&str]) -> String {
    let sanitized = parts
        .iter()
        .map(|part| {
            part.trim()
                .to_lowercase()
                .chars()
                .map(|c| match c {
                    'a'..='z' | '0'..='9' | '-' | '.' => c,
                    _ => '-',
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join(".");

    let mut name = sanitized
        .split('.')
        .map(trim_label)
        .filter(|label| !label.is_empty())
        .collect::<Vec<_>>()
        .join(".");

    if name.len() > MAX_NAME_LEN {
        name.truncate(MAX_NAME_LEN);
        name = name
            .split('.')
            .map(trim_label)
            .filter(|label| !label.is_empty())
            .collect::<Vec<_>>()
            .join(".");
    }
    name
}

fn trim_label(label: &str) -> &str {
    label.trim_matches(|c: char| !c.is_ascii_alphanumeric())
}

/// Stores for every discovered inventory kind
#[derive(Clone)]
pub struct InventoryStores {
    pub vpcs: Arc<dyn ObjectStore<Vpc>>,
    pub subnets: Arc<dyn ObjectStore<Subnet>>,
    pub instances: Arc<dyn ObjectStore<Instance>>,
    pub sites: Arc<dyn ObjectStore<Site>>,
    pub vpns: Arc<dyn ObjectStore<Vpn>>,
    pub network_domains: Arc<dyn ObjectStore<NetworkDomain>>,
}

/// The syncers in pass order. Network domains come last since they are derived from
/// the VPC and VPN mirrors written earlier in the same pass.
pub fn standard_syncers(
    control_plane: Arc<dyn ControlPlane>,
    stores: &InventoryStores,
    namespace: &str,
    providers: &[String],
) -> Vec<Box<dyn Syncer>> {
    vec![
        Box::new(ConvergingSyncer::new(
            InstanceClass::new(control_plane.clone(), providers.to_vec()),
            stores.instances.clone(),
            namespace,
        )),
        Box::new(ConvergingSyncer::new(
            SiteClass::new(control_plane.clone()),
            stores.sites.clone(),
            namespace,
        )),
        Box::new(ConvergingSyncer::new(
            SubnetClass::new(control_plane.clone(), providers.to_vec()),
            stores.subnets.clone(),
            namespace,
        )),
        Box::new(ConvergingSyncer::new(
            VpcClass::new(control_plane.clone(), providers.to_vec()),
            stores.vpcs.clone(),
            namespace,
        )),
        Box::new(ConvergingSyncer::new(
            VpnClass::new(control_plane),
            stores.vpns.clone(),
            namespace,
        )),
        Box::new(ConvergingSyncer::new(
            NetworkDomainClass::new(stores.vpcs.clone(), stores.vpns.clone(), namespace),
            stores.network_domains.clone(),
            namespace,
        )),
    ]
}
