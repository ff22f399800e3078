//! Runtime configuration of the operator

use std::time::Duration;

pub const DEFAULT_CONTROL_PLANE_ADDRESS: &str = "http://localhost:50051";
pub const DEFAULT_SYNC_NAMESPACE: &str = "awi-system";
pub const DEFAULT_PROVIDER: &str = "AWS";

/// Settings shared by the reconcilers, the status watcher and the syncers
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Address of the AWI control plane
    pub control_plane_address: String,
    /// Identity of the local cluster, injected into pod-scoped app connections
    pub cluster_name: String,
    /// Namespace holding every discovered inventory object
    pub sync_namespace: String,
    /// Cloud providers queried for VPCs, subnets and instances
    pub providers: Vec<String>,
    pub status_interval: Duration,
    pub sync_interval: Duration,
    /// Deadline for a single control plane call
    pub call_timeout: Duration,
    /// Deadline for a whole list-and-update pass
    pub pass_timeout: Duration,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            control_plane_address: DEFAULT_CONTROL_PLANE_ADDRESS.to_string(),
            cluster_name: String::new(),
            sync_namespace: DEFAULT_SYNC_NAMESPACE.to_string(),
            providers: vec![DEFAULT_PROVIDER.to_string()],
            status_interval: Duration::from_secs(15),
            sync_interval: Duration::from_secs(60),
            call_timeout: Duration::from_secs(30),
            pass_timeout: Duration::from_secs(60),
        }
    }
}

/// Split a comma separated provider list, dropping blanks
pub fn parse_providers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
