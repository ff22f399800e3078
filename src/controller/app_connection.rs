//! Control plane side effects of InterNetworkDomainAppConnection intents
//!
//! App connections have no stored remote id. Teardown resolves it from the live remote
//! list by (domain connection name, app connection name), first match wins.

use std::sync::Arc;

use async_trait::async_trait;
use kube::ResourceExt;
use tracing::{debug, info};

use super::finalizers::IntentHandler;
use crate::awi::{find_app_connection, ControlPlane};
use crate::crd::InterNetworkDomainAppConnection;
use crate::error::Result;

pub struct AppConnectionHandler {
    control_plane: Arc<dyn ControlPlane>,
    cluster_name: String,
}

impl AppConnectionHandler {
    pub fn new(control_plane: Arc<dyn ControlPlane>, cluster_name: impl Into<String>) -> Self {
        Self {
            control_plane,
            cluster_name: cluster_name.into(),
        }
    }
}

#[async_trait]
impl IntentHandler<InterNetworkDomainAppConnection> for AppConnectionHandler {
    async fn apply(&self, app: &InterNetworkDomainAppConnection) -> Result<()> {
        let request = if self.cluster_name.is_empty() {
            app.spec.app_connection.clone()
        } else {
            app.request_for_cluster(&self.cluster_name)
        };
        let state = self.control_plane.connect_apps(&request).await?;
        debug!("App connection {} reported {}", app.name_any(), state);
        Ok(())
    }

    async fn cleanup(&self, app: &InterNetworkDomainAppConnection) -> Result<()> {
        let local = &app.spec.app_connection;
        let remote = self.control_plane.list_connected_apps().await?;

        let Some(target) = find_app_connection(&remote, local) else {
            info!(
                "No remote app connection {} on {}, nothing to disconnect",
                local.app_connection_name(),
                local.domain_connection_name()
            );
            return Ok(());
        };

        match self.control_plane.disconnect_apps(&target.id).await {
            Ok(()) => info!("Disconnected app connection {} ({})", app.name_any(), target.id),
            Err(e) if e.is_not_found() => {
                info!("App connection {} ({}) already gone", app.name_any(), target.id)
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }
}
