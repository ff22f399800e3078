//! InterNetworkDomainConnection Custom Resource Definition
//!
//! Declares that two network domains should be connected by the AWI control plane.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{ConnectionRequest, ConnectionState};

#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "awi.app-net-interface.io",
    version = "v1alpha1",
    kind = "InterNetworkDomainConnection",
    namespaced,
    status = "InterNetworkDomainConnectionStatus",
    shortname = "idc",
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Connection","type":"string","jsonPath":".status.connectionId"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct InterNetworkDomainConnectionSpec {
    #[serde(flatten)]
    pub request: ConnectionRequest,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InterNetworkDomainConnectionStatus {
    #[serde(default)]
    pub state: ConnectionState,

    #[serde(default)]
    pub connection_id: String,
}

impl InterNetworkDomainConnection {
    pub fn connection_key(&self) -> String {
        self.spec.request.connection_key()
    }

    /// Status that should be recorded for the given remote state, if it differs from the
    /// current one
    pub fn status_change(&self, remote: ConnectionState) -> Option<InterNetworkDomainConnectionStatus> {
        let desired = InterNetworkDomainConnectionStatus {
            state: remote,
            connection_id: self.connection_key(),
        };
        match &self.status {
            Some(current) if *current == desired => None,
            _ => Some(desired),
        }
    }
}
