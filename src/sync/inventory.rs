//! Mirror classes for the control plane's cloud inventory

use std::sync::Arc;

use async_trait::async_trait;

use super::converge::MirrorClass;
use super::object_name;
use crate::awi::ControlPlane;
use crate::crd::{
    Instance, InstanceSpec, Site, SiteSpec, Subnet, SubnetSpec, Vpc, VpcSpec, Vpn, VpnSpec,
};
use crate::error::Result;

/// A remote item together with the provider it was listed under. The item's own
/// `provider` field is optional on the wire, so naming always uses the queried one.
pub struct Provided<T> {
    pub provider: String,
    pub item: T,
}

impl<T> Provided<T> {
    fn new(provider: &str, item: T) -> Self {
        Self {
            provider: provider.to_string(),
            item,
        }
    }
}

/// VPCs across every configured provider, named `<provider>.<id>`
pub struct VpcClass {
    control_plane: Arc<dyn ControlPlane>,
    providers: Vec<String>,
}

impl VpcClass {
    pub fn new(control_plane: Arc<dyn ControlPlane>, providers: Vec<String>) -> Self {
        Self {
            control_plane,
            providers,
        }
    }
}

#[async_trait]
impl MirrorClass for VpcClass {
    type Object = Vpc;
    type Item = Provided<VpcSpec>;

    fn name(&self) -> &'static str {
        "VPC"
    }

    async fn fetch_remote(&self) -> Result<Vec<Provided<VpcSpec>>> {
        let mut vpcs = Vec::new();
        for provider in &self.providers {
            let listed = self.control_plane.list_vpcs(provider).await?;
            vpcs.extend(listed.into_iter().map(|vpc| Provided::new(provider, vpc)));
        }
        Ok(vpcs)
    }

    fn key(&self, vpc: &Provided<VpcSpec>) -> String {
        object_name(&[&vpc.provider, &vpc.item.id])
    }

    fn translate(&self, key: &str, vpc: &Provided<VpcSpec>) -> Vpc {
        let mut spec = vpc.item.clone();
        if spec.provider.is_empty() {
            spec.provider = vpc.provider.clone();
        }
        Vpc::new(key, spec)
    }
}

/// Subnets across every configured provider, named `<provider>.<subnetId>`
pub struct SubnetClass {
    control_plane: Arc<dyn ControlPlane>,
    providers: Vec<String>,
}

impl SubnetClass {
    pub fn new(control_plane: Arc<dyn ControlPlane>, providers: Vec<String>) -> Self {
        Self {
            control_plane,
            providers,
        }
    }
}

#[async_trait]
impl MirrorClass for SubnetClass {
    type Object = Subnet;
    type Item = Provided<SubnetSpec>;

    fn name(&self) -> &'static str {
        "Subnet"
    }

    async fn fetch_remote(&self) -> Result<Vec<Provided<SubnetSpec>>> {
        let mut subnets = Vec::new();
        for provider in &self.providers {
            let listed = self.control_plane.list_subnets(provider).await?;
            subnets.extend(listed.into_iter().map(|subnet| Provided::new(provider, subnet)));
        }
        Ok(subnets)
    }

    fn key(&self, subnet: &Provided<SubnetSpec>) -> String {
        object_name(&[&subnet.provider, &subnet.item.subnet_id])
    }

    fn translate(&self, key: &str, subnet: &Provided<SubnetSpec>) -> Subnet {
        let mut spec = subnet.item.clone();
        if spec.provider.is_empty() {
            spec.provider = subnet.provider.clone();
        }
        Subnet::new(key, spec)
    }
}

/// Instances across every configured provider, named `<provider>.<id>`
pub struct InstanceClass {
    control_plane: Arc<dyn ControlPlane>,
    providers: Vec<String>,
}

impl InstanceClass {
    pub fn new(control_plane: Arc<dyn ControlPlane>, providers: Vec<String>) -> Self {
        Self {
            control_plane,
            providers,
        }
    }
}

#[async_trait]
impl MirrorClass for InstanceClass {
    type Object = Instance;
    type Item = Provided<InstanceSpec>;

    fn name(&self) -> &'static str {
        "Instance"
    }

    async fn fetch_remote(&self) -> Result<Vec<Provided<InstanceSpec>>> {
        let mut instances = Vec::new();
        for provider in &self.providers {
            let listed = self.control_plane.list_instances(provider).await?;
            instances.extend(
                listed
                    .into_iter()
                    .map(|instance| Provided::new(provider, instance)),
            );
        }
        Ok(instances)
    }

    fn key(&self, instance: &Provided<InstanceSpec>) -> String {
        object_name(&[&instance.provider, &instance.item.id])
    }

    fn translate(&self, key: &str, instance: &Provided<InstanceSpec>) -> Instance {
        let mut spec = instance.item.clone();
        if spec.provider.is_empty() {
            spec.provider = instance.provider.clone();
        }
        Instance::new(key, spec)
    }
}

/// SD-WAN sites, named by id
pub struct SiteClass {
    control_plane: Arc<dyn ControlPlane>,
}

impl SiteClass {
    pub fn new(control_plane: Arc<dyn ControlPlane>) -> Self {
        Self { control_plane }
    }
}

#[async_trait]
impl MirrorClass for SiteClass {
    type Object = Site;
    type Item = SiteSpec;

    fn name(&self) -> &'static str {
        "Site"
    }

    async fn fetch_remote(&self) -> Result<Vec<SiteSpec>> {
        self.control_plane.list_sites().await
    }

    fn key(&self, site: &SiteSpec) -> String {
        object_name(&[&site.id])
    }

    fn translate(&self, key: &str, site: &SiteSpec) -> Site {
        Site::new(key, site.clone())
    }
}

/// SD-WAN VPN segments, named by id
pub struct VpnClass {
    control_plane: Arc<dyn ControlPlane>,
}

impl VpnClass {
    pub fn new(control_plane: Arc<dyn ControlPlane>) -> Self {
        Self { control_plane }
    }
}

#[async_trait]
impl MirrorClass for VpnClass {
    type Object = Vpn;
    type Item = VpnSpec;

    fn name(&self) -> &'static str {
        "VPN"
    }

    async fn fetch_remote(&self) -> Result<Vec<VpnSpec>> {
        self.control_plane.list_vpns().await
    }

    fn key(&self, vpn: &VpnSpec) -> String {
        object_name(&[&vpn.id])
    }

    fn translate(&self, key: &str, vpn: &VpnSpec) -> Vpn {
        Vpn::new(key, vpn.clone())
    }
}
