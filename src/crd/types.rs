//! Shared types for AWI connection specifications
//!
//! These types are used both as the spec of the intent CRDs and as the request bodies
//! sent to the AWI control plane.
//!
//! # Type Hierarchy
//!
//! - [`ConnectionRequest`] - inter network domain connection (source/destination selectors)
//! - [`AppConnectionConfig`] - application level connection on top of a domain connection
//! - [`ConnectionState`] - lifecycle state reported by the control plane

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// State of a connection as reported by the control plane
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Pending,
    InProgress,
    Success,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Pending => write!(f, "PENDING"),
            ConnectionState::InProgress => write!(f, "IN_PROGRESS"),
            ConnectionState::Success => write!(f, "SUCCESS"),
            ConnectionState::Failed => write!(f, "FAILED"),
            ConnectionState::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionMetadata {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Request to connect two network domains
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    #[serde(default)]
    pub metadata: ConnectionMetadata,

    #[serde(default)]
    pub spec: NetworkDomainConnectionConfig,
}

impl ConnectionRequest {
    /// Composite key identifying this connection on the control plane.
    ///
    /// Derived from the source and destination domain ids, never assigned remotely.
    pub fn connection_key(&self) -> String {
        format!(
            "{}:{}",
            self.spec.source.network_domain.selector.id(),
            self.spec.destination.network_domain.selector.id()
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDomainConnectionConfig {
    #[serde(default)]
    pub source: DomainEndpoint,

    #[serde(default)]
    pub destination: DomainEndpoint,

    /// Allow all traffic between the domains unless app connections narrow it
    #[serde(default)]
    pub default_access: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DomainEndpoint {
    #[serde(default)]
    pub network_domain: NetworkDomainRef,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDomainRef {
    #[serde(default)]
    pub selector: NetworkDomainSelector,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDomainSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_id: Option<MatchId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_name: Option<MatchName>,
}

impl NetworkDomainSelector {
    pub fn id(&self) -> &str {
        self.match_id.as_ref().map(|m| m.id.as_str()).unwrap_or("")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MatchId {
    pub id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MatchName {
    pub name: String,
}

/// Application connection riding on an existing network domain connection
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppConnectionConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub controller: String,

    #[serde(default)]
    pub metadata: AppMetadata,

    #[serde(default)]
    pub network_domain_connection: NetworkDomainConnectionRef,

    #[serde(default)]
    pub from: AppEndpointRef,

    #[serde(default)]
    pub to: AppEndpointRef,
}

impl AppConnectionConfig {
    /// Name of the network domain connection this app connection belongs to
    pub fn domain_connection_name(&self) -> &str {
        &self.network_domain_connection.selector.match_name
    }

    pub fn app_connection_name(&self) -> &str {
        &self.metadata.name
    }

    /// Whether both configs address the same remote app connection.
    ///
    /// The pair is not unique on the control plane; callers take the first match.
    pub fn same_identity(&self, other: &AppConnectionConfig) -> bool {
        self.domain_connection_name() == other.domain_connection_name()
            && self.app_connection_name() == other.app_connection_name()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppMetadata {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDomainConnectionRef {
    #[serde(default)]
    pub selector: NetworkDomainConnectionSelector,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDomainConnectionSelector {
    #[serde(default)]
    pub match_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppEndpointRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<AppEndpoint>,
}

/// Workload selector on one side of an app connection
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppEndpoint {
    /// Endpoint kind, e.g. `pod` or `instance`
    #[serde(default)]
    pub kind: String,

    #[serde(default)]
    pub selector: EndpointSelector,
}

impl AppEndpoint {
    pub fn is_pod(&self) -> bool {
        self.kind.eq_ignore_ascii_case("pod")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSelector {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub match_labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_cluster: Option<MatchCluster>,
}

impl EndpointSelector {
    pub fn cluster_name(&self) -> &str {
        self.match_cluster
            .as_ref()
            .map(|c| c.name.as_str())
            .unwrap_or("")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MatchCluster {
    pub name: String,
}
