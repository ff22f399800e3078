//! Custom Resource Definitions for kube-awi
//!
//! Intent kinds are authored by users; inventory kinds are owned by the syncers.

mod app_connection;
mod connection;
pub mod inventory;
pub mod types;


pub use app_connection::{
    InterNetworkDomainAppConnection, InterNetworkDomainAppConnectionSpec,
    InterNetworkDomainAppConnectionStatus,
};
pub use connection::{
    InterNetworkDomainConnection, InterNetworkDomainConnectionSpec,
    InterNetworkDomainConnectionStatus,
};
pub use inventory::{
    Instance, InstanceSpec, NetworkDomain, NetworkDomainSpec, NetworkDomainType, Site, SiteSpec,
    Subnet, SubnetSpec, Vpc, VpcSpec, Vpn, VpnSpec, DISCOVERED_LABEL, DISCOVERED_VALUE,
};
pub use types::*;

/// Every CRD served by the operator, in installation order
pub fn all_crds() -> Vec<k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition>
{
    use kube::CustomResourceExt;

    vec![
        InterNetworkDomainConnection::crd(),
        InterNetworkDomainAppConnection::crd(),
        NetworkDomain::crd(),
        Vpc::crd(),
        Vpn::crd(),
        Subnet::crd(),
        Instance::crd(),
        Site::crd(),
    ]
}
