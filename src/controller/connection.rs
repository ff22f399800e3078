//! Control plane side effects of InterNetworkDomainConnection intents

use std::sync::Arc;

use async_trait::async_trait;
use kube::ResourceExt;
use tracing::{debug, info};

use super::finalizers::IntentHandler;
use crate::awi::ControlPlane;
use crate::crd::InterNetworkDomainConnection;
use crate::error::Result;

pub struct ConnectionHandler {
    control_plane: Arc<dyn ControlPlane>,
}

impl ConnectionHandler {
    pub fn new(control_plane: Arc<dyn ControlPlane>) -> Self {
        Self { control_plane }
    }
}

#[async_trait]
impl IntentHandler<InterNetworkDomainConnection> for ConnectionHandler {
    async fn apply(&self, connection: &InterNetworkDomainConnection) -> Result<()> {
        let state = self.control_plane.connect(&connection.spec.request).await?;
        debug!(
            "Connection {} ({}) reported {}",
            connection.name_any(),
            connection.connection_key(),
            state
        );
        Ok(())
    }

    async fn cleanup(&self, connection: &InterNetworkDomainConnection) -> Result<()> {
        let key = connection.connection_key();
        match self.control_plane.disconnect(&key).await {
            Ok(()) => info!("Disconnected {} ({})", connection.name_any(), key),
            Err(e) if e.is_not_found() => {
                info!("Connection {} ({}) already gone", connection.name_any(), key)
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }
}
