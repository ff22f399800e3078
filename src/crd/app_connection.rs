//! InterNetworkDomainAppConnection Custom Resource Definition
//!
//! Application level connectivity on top of an InterNetworkDomainConnection. The remote
//! id is never stored; it is looked up by (domain connection name, app connection name).

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{AppConnectionConfig, ConnectionState};

#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "awi.app-net-interface.io",
    version = "v1alpha1",
    kind = "InterNetworkDomainAppConnection",
    namespaced,
    status = "InterNetworkDomainAppConnectionStatus",
    shortname = "iac",
    printcolumn = r#"{"name":"Connection","type":"string","jsonPath":".spec.appConnection.networkDomainConnection.selector.matchName"}"#,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct InterNetworkDomainAppConnectionSpec {
    pub app_connection: AppConnectionConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InterNetworkDomainAppConnectionStatus {
    #[serde(default)]
    pub state: ConnectionState,
}

impl InterNetworkDomainAppConnection {
    pub fn current_state(&self) -> Option<ConnectionState> {
        self.status.as_ref().map(|s| s.state)
    }

    /// Copy of the app connection request with the local cluster filled in.
    ///
    /// Only a pod-scoped "from" endpoint without an explicit cluster is touched; the
    /// stored spec is left alone.
    pub fn request_for_cluster(&self, cluster_name: &str) -> AppConnectionConfig {
        let mut request = self.spec.app_connection.clone();
        if let Some(endpoint) = request.from.endpoint.as_mut() {
            if endpoint.is_pod() && endpoint.selector.cluster_name().is_empty() {
                endpoint.selector.match_cluster = Some(super::types::MatchCluster {
                    name: cluster_name.to_string(),
                });
            }
        }
        request
    }
}
