//! Propagates remote connection status onto local intents
//!
//! Polls the control plane's full connection and app connection lists on a timer and
//! writes a status only when it differs from what is stored.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use kube::ResourceExt;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::awi::{find_app_connection, ControlPlane};
use crate::crd::{
    InterNetworkDomainAppConnection, InterNetworkDomainAppConnectionStatus,
    InterNetworkDomainConnection,
};
use crate::error::{Error, Result};
use crate::shutdown::Shutdown;
use crate::store::{ListScope, ObjectStore};

pub struct StatusWatcher {
    control_plane: Arc<dyn ControlPlane>,
    connections: Arc<dyn ObjectStore<InterNetworkDomainConnection>>,
    app_connections: Arc<dyn ObjectStore<InterNetworkDomainAppConnection>>,
    interval: Duration,
    pass_timeout: Duration,
}

impl StatusWatcher {
    pub fn new(
        control_plane: Arc<dyn ControlPlane>,
        connections: Arc<dyn ObjectStore<InterNetworkDomainConnection>>,
        app_connections: Arc<dyn ObjectStore<InterNetworkDomainAppConnection>>,
        interval: Duration,
        pass_timeout: Duration,
    ) -> Self {
        Self {
            control_plane,
            connections,
            app_connections,
            interval,
            pass_timeout,
        }
    }

    /// Poll immediately, then on every tick until `shutdown` fires
    pub async fn run(&self, shutdown: Shutdown) {
        info!("Starting status watcher (interval {:?})", self.interval);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                _ = ticker.tick() => {
                    if shutdown.is_triggered() {
                        break;
                    }
                    self.poll_once().await;
                }
            }
        }
        info!("Status watcher stopped");
    }

    /// One tick: both passes, each under the pass deadline. Failures are logged only.
    pub async fn poll_once(&self) {
        match self.bounded("connection status", self.sync_connection_status()).await {
            Ok(written) => debug!("Connection status pass wrote {} objects", written),
            Err(e) => warn!("Connection status pass failed: {}", e),
        }
        match self
            .bounded("app connection status", self.sync_app_connection_status())
            .await
        {
            Ok(written) => debug!("App connection status pass wrote {} objects", written),
            Err(e) => warn!("App connection status pass failed: {}", e),
        }
    }

    async fn bounded<F>(&self, pass: &str, fut: F) -> Result<usize>
    where
        F: std::future::Future<Output = Result<usize>>,
    {
        tokio::time::timeout(self.pass_timeout, fut)
            .await
            .map_err(|_| Error::Timeout(format!("{} pass after {:?}", pass, self.pass_timeout)))?
    }

    /// Copy remote connection states onto local intents. Returns the number of writes.
    #[instrument(skip(self))]
    pub async fn sync_connection_status(&self) -> Result<usize> {
        let remote = self.control_plane.list_connections().await?;
        let by_key: HashMap<&str, _> = remote.iter().map(|c| (c.id.as_str(), c)).collect();

        let mut written = 0;
        for connection in self.connections.list(&ListScope::all()).await? {
            let key = connection.connection_key();
            let Some(info) = by_key.get(key.as_str()) else {
                debug!("No remote connection {} for {}", key, connection.name_any());
                continue;
            };
            let Some(status) = connection.status_change(info.status) else {
                continue;
            };

            let mut updated = connection.clone();
            updated.status = Some(status);
            match self.connections.replace_status(&updated).await {
                Ok(_) => {
                    info!(
                        "InterNetworkDomainConnection {} is now {}",
                        connection.name_any(),
                        info.status
                    );
                    written += 1;
                }
                Err(e) => warn!(
                    "Failed to update status of {}: {}",
                    connection.name_any(),
                    e
                ),
            }
        }
        Ok(written)
    }

    /// Copy remote app connection states onto local intents. Returns the number of
    /// writes.
    #[instrument(skip(self))]
    pub async fn sync_app_connection_status(&self) -> Result<usize> {
        let remote = self.control_plane.list_connected_apps().await?;

        let mut written = 0;
        for app in self.app_connections.list(&ListScope::all()).await? {
            let Some(info) = find_app_connection(&remote, &app.spec.app_connection) else {
                debug!("No remote app connection for {}", app.name_any());
                continue;
            };
            if app.current_state() == Some(info.status) {
                continue;
            }

            let mut updated = app.clone();
            updated.status = Some(InterNetworkDomainAppConnectionStatus { state: info.status });
            match self.app_connections.replace_status(&updated).await {
                Ok(_) => {
                    info!(
                        "InterNetworkDomainAppConnection {} is now {}",
                        app.name_any(),
                        info.status
                    );
                    written += 1;
                }
                Err(e) => warn!("Failed to update status of {}: {}", app.name_any(), e),
            }
        }
        Ok(written)
    }
}
