//! Network domains derived from the local VPC and VPN mirrors
//!
//! Every mirrored VPC becomes a `VPC` domain and every mirrored VPN a `VRF` domain.
//! Derived domains carry `discovered=yes`; domains without that label were written by
//! hand and are never removed here.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::converge::MirrorClass;
use super::object_name;
use crate::crd::{
    NetworkDomain, NetworkDomainSpec, NetworkDomainType, Vpc, Vpn, DISCOVERED_LABEL,
    DISCOVERED_VALUE,
};
use crate::error::Result;
use crate::store::{ListScope, ObjectStore};

pub struct NetworkDomainClass {
    vpcs: Arc<dyn ObjectStore<Vpc>>,
    vpns: Arc<dyn ObjectStore<Vpn>>,
    namespace: String,
}

impl NetworkDomainClass {
    pub fn new(
        vpcs: Arc<dyn ObjectStore<Vpc>>,
        vpns: Arc<dyn ObjectStore<Vpn>>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            vpcs,
            vpns,
            namespace: namespace.into(),
        }
    }
}

fn from_vpc(vpc: &Vpc) -> NetworkDomainSpec {
    NetworkDomainSpec {
        domain_type: NetworkDomainType::Vpc,
        name: vpc.spec.name.clone(),
        id: vpc.spec.id.clone(),
        provider: vpc.spec.provider.to_uppercase(),
        account_id: vpc.spec.account_id.clone(),
        labels: vpc.spec.labels.clone(),
    }
}

fn from_vpn(vpn: &Vpn) -> NetworkDomainSpec {
    NetworkDomainSpec {
        domain_type: NetworkDomainType::Vrf,
        name: vpn.spec.id.clone(),
        id: vpn.spec.id.clone(),
        labels: vpn.spec.labels.clone(),
        ..Default::default()
    }
}

#[async_trait]
impl MirrorClass for NetworkDomainClass {
    type Object = NetworkDomain;
    type Item = NetworkDomainSpec;

    fn name(&self) -> &'static str {
        "NetworkDomain"
    }

    async fn fetch_remote(&self) -> Result<Vec<NetworkDomainSpec>> {
        let scope = ListScope::namespaced(&self.namespace);
        let mut domains: Vec<NetworkDomainSpec> =
            self.vpcs.list(&scope).await?.iter().map(from_vpc).collect();
        domains.extend(self.vpns.list(&scope).await?.iter().map(from_vpn));
        Ok(domains)
    }

    fn key(&self, domain: &NetworkDomainSpec) -> String {
        match domain.domain_type {
            NetworkDomainType::Vpc => {
                object_name(&["vpc", &domain.provider, &domain.name, &domain.id])
            }
            NetworkDomainType::Vrf => object_name(&["vpn", &domain.id]),
        }
    }

    fn translate(&self, key: &str, domain: &NetworkDomainSpec) -> NetworkDomain {
        let mut object = NetworkDomain::new(key, domain.clone());
        object.metadata.labels = Some(BTreeMap::from([(
            DISCOVERED_LABEL.to_string(),
            DISCOVERED_VALUE.to_string(),
        )]));
        object
    }

    fn deletable(&self, domain: &NetworkDomain) -> bool {
        domain.is_discovered()
    }
}
