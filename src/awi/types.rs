//! Request and response payloads of the AWI control plane

use serde::{Deserialize, Serialize};

use crate::crd::{
    AppConnectionConfig, ConnectionMetadata, ConnectionState, InstanceSpec, SiteSpec, SubnetSpec,
    VpcSpec, VpnSpec,
};

/// A domain connection as known to the control plane
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInformation {
    pub id: String,

    #[serde(default)]
    pub metadata: ConnectionMetadata,

    #[serde(default)]
    pub status: ConnectionState,
}

/// An app connection as known to the control plane
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConnectionInformation {
    pub id: String,

    #[serde(default)]
    pub app_connection_config: AppConnectionConfig,

    #[serde(default)]
    pub status: ConnectionState,
}

/// First remote app connection addressing the same (domain connection, app) pair.
///
/// The pair is not unique; list order decides when several entries share it.
pub fn find_app_connection<'a>(
    remote: &'a [AppConnectionInformation],
    local: &AppConnectionConfig,
) -> Option<&'a AppConnectionInformation> {
    remote
        .iter()
        .find(|info| info.app_connection_config.same_identity(local))
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatusResponse {
    #[serde(default)]
    pub status: ConnectionState,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DisconnectRequest<'a> {
    pub connection_id: &'a str,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListConnectionsResponse {
    #[serde(default)]
    pub connections: Vec<ConnectionInformation>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListAppConnectionsResponse {
    #[serde(default)]
    pub app_connections: Vec<AppConnectionInformation>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct ListVpcsResponse {
    #[serde(default)]
    pub vpcs: Vec<VpcSpec>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct ListSubnetsResponse {
    #[serde(default)]
    pub subnets: Vec<SubnetSpec>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct ListInstancesResponse {
    #[serde(default)]
    pub instances: Vec<InstanceSpec>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct ListSitesResponse {
    #[serde(default)]
    pub sites: Vec<SiteSpec>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct ListVpnsResponse {
    #[serde(default)]
    pub vpns: Vec<VpnSpec>,
}
