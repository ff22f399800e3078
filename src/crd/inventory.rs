//! Discovered inventory Custom Resource Definitions
//!
//! Read-mostly mirrors of the control plane's cloud inventory. The syncers own these
//! objects; their spec is a verbatim copy of the remote representation.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Label marking network domains created by the syncer
pub const DISCOVERED_LABEL: &str = "discovered";
pub const DISCOVERED_VALUE: &str = "yes";

#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "awi.app-net-interface.io",
    version = "v1alpha1",
    kind = "VPC",
    root = "Vpc",
    namespaced,
    printcolumn = r#"{"name":"Provider","type":"string","jsonPath":".spec.provider"}"#,
    printcolumn = r#"{"name":"Region","type":"string","jsonPath":".spec.region"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct VpcSpec {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub provider: String,

    #[serde(default)]
    pub region: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub account_id: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "awi.app-net-interface.io",
    version = "v1alpha1",
    kind = "Subnet",
    namespaced,
    printcolumn = r#"{"name":"CIDR","type":"string","jsonPath":".spec.cidrBlock"}"#,
    printcolumn = r#"{"name":"VPC","type":"string","jsonPath":".spec.vpcId"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SubnetSpec {
    pub subnet_id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub cidr_block: String,

    #[serde(default)]
    pub vpc_id: String,

    #[serde(default)]
    pub zone: String,

    #[serde(default)]
    pub provider: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "awi.app-net-interface.io",
    version = "v1alpha1",
    kind = "Instance",
    namespaced,
    printcolumn = r#"{"name":"Private IP","type":"string","jsonPath":".spec.privateIp"}"#,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".spec.state"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSpec {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub provider: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub public_ip: String,

    #[serde(default)]
    pub private_ip: String,

    #[serde(default)]
    pub subnet_id: String,

    #[serde(default)]
    pub vpc_id: String,

    #[serde(default)]
    pub region: String,

    #[serde(default)]
    pub zone: String,

    #[serde(default)]
    pub state: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "awi.app-net-interface.io",
    version = "v1alpha1",
    kind = "Site",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct SiteSpec {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub system_ip: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "awi.app-net-interface.io",
    version = "v1alpha1",
    kind = "VPN",
    root = "Vpn",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct VpnSpec {
    pub id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub segment_name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// Kind of network domain backing a NetworkDomain object
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum NetworkDomainType {
    #[default]
    Vpc,
    Vrf,
}

#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "awi.app-net-interface.io",
    version = "v1alpha1",
    kind = "NetworkDomain",
    namespaced,
    shortname = "nd",
    printcolumn = r#"{"name":"Type","type":"string","jsonPath":".spec.type"}"#,
    printcolumn = r#"{"name":"Provider","type":"string","jsonPath":".spec.provider"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDomainSpec {
    #[serde(rename = "type")]
    pub domain_type: NetworkDomainType,

    #[serde(default)]
    pub name: String,

    pub id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub account_id: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl NetworkDomain {
    /// Whether the syncer created this object (as opposed to a hand-authored entry)
    pub fn is_discovered(&self) -> bool {
        self.metadata
            .labels
            .as_ref()
            .and_then(|labels| labels.get(DISCOVERED_LABEL))
            .map(|v| v == DISCOVERED_VALUE)
            .unwrap_or(false)
    }
}
