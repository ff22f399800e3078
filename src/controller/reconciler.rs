//! Reconcilers for InterNetworkDomainConnection and InterNetworkDomainAppConnection
//!
//! Implements the controller pattern using kube-rs runtime. Both kinds share the
//! finalizer state machine in [`super::finalizers`]; only the control plane side effects
//! differ.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kube::{
    api::Api,
    client::Client,
    runtime::{
        controller::{Action, Controller},
        reflector,
        watcher::{self, Config},
        WatchStreamExt,
    },
    Resource, ResourceExt,
};
use serde::de::DeserializeOwned;
use tracing::{error, info, instrument};

use super::app_connection::AppConnectionHandler;
use super::connection::ConnectionHandler;
use super::finalizers::{reconcile_intent, APP_CONNECTION_FINALIZER, CONNECTION_FINALIZER};
use super::predicates::deletion_transition;
use crate::awi::ControlPlane;
use crate::crd::{InterNetworkDomainAppConnection, InterNetworkDomainConnection};
use crate::error::{Error, Result};
use crate::shutdown::Shutdown;
use crate::store::ObjectStore;

/// Shared state for the controllers
pub struct ControllerState {
    pub control_plane: Arc<dyn ControlPlane>,
    pub connections: Arc<dyn ObjectStore<InterNetworkDomainConnection>>,
    pub app_connections: Arc<dyn ObjectStore<InterNetworkDomainAppConnection>>,
    /// Injected into pod-scoped app connections that name no cluster
    pub cluster_name: String,
}

/// Run both intent controllers until `shutdown` fires
pub async fn run_controllers(
    client: Client,
    state: Arc<ControllerState>,
    shutdown: Shutdown,
) -> Result<()> {
    let connections: Api<InterNetworkDomainConnection> = Api::all(client.clone());
    let app_connections: Api<InterNetworkDomainAppConnection> = Api::all(client);

    ensure_crd_installed(&connections, "InterNetworkDomainConnection").await?;
    ensure_crd_installed(&app_connections, "InterNetworkDomainAppConnection").await?;

    info!("Starting InterNetworkDomainConnection and InterNetworkDomainAppConnection controllers");

    let connection_controller = {
        let (reader, writer) = reflector::store();
        let events = watcher::watcher(connections, Config::default())
            .default_backoff()
            .reflect(writer)
            .applied_objects()
            .predicate_filter(deletion_transition::<InterNetworkDomainConnection>);

        Controller::for_stream(events, reader)
            .graceful_shutdown_on(shutdown.signalled())
            .run(
                reconcile_connection,
                error_policy::<InterNetworkDomainConnection>,
                state.clone(),
            )
            .for_each(|res| async move {
                match res {
                    Ok(obj) => info!("Reconciled: {:?}", obj),
                    Err(e) => error!("Reconcile error: {:?}", e),
                }
            })
    };

    let app_connection_controller = {
        let (reader, writer) = reflector::store();
        let events = watcher::watcher(app_connections, Config::default())
            .default_backoff()
            .reflect(writer)
            .applied_objects()
            .predicate_filter(deletion_transition::<InterNetworkDomainAppConnection>);

        Controller::for_stream(events, reader)
            .graceful_shutdown_on(shutdown.signalled())
            .run(
                reconcile_app_connection,
                error_policy::<InterNetworkDomainAppConnection>,
                state,
            )
            .for_each(|res| async move {
                match res {
                    Ok(obj) => info!("Reconciled: {:?}", obj),
                    Err(e) => error!("Reconcile error: {:?}", e),
                }
            })
    };

    futures::join!(connection_controller, app_connection_controller);
    info!("Controllers stopped");
    Ok(())
}

async fn ensure_crd_installed<K>(api: &Api<K>, kind: &str) -> Result<()>
where
    K: Resource + Clone + DeserializeOwned + std::fmt::Debug,
{
    match api.list(&Default::default()).await {
        Ok(_) => {
            info!("{} CRD is available", kind);
            Ok(())
        }
        Err(e) => {
            error!("{} CRD not found. Please install the CRDs first: {:?}", kind, e);
            Err(Error::ConfigError(format!("{} CRD not installed", kind)))
        }
    }
}

fn namespace_of<K: Resource>(obj: &K) -> Result<String> {
    obj.namespace()
        .ok_or_else(|| Error::InvalidObject(format!("{} has no namespace", obj.name_any())))
}

/// Reconcile one InterNetworkDomainConnection
#[instrument(skip(obj, ctx), fields(name = %obj.name_any(), namespace = %obj.namespace().unwrap_or_default()))]
pub(crate) async fn reconcile_connection(
    obj: Arc<InterNetworkDomainConnection>,
    ctx: Arc<ControllerState>,
) -> Result<Action> {
    let namespace = namespace_of(obj.as_ref())?;
    let handler = ConnectionHandler::new(ctx.control_plane.clone());

    let stage = reconcile_intent(
        ctx.connections.as_ref(),
        &handler,
        &namespace,
        &obj.name_any(),
        CONNECTION_FINALIZER,
    )
    .await?;
    info!(
        "Reconciled InterNetworkDomainConnection {}/{} ({:?})",
        namespace,
        obj.name_any(),
        stage
    );
    Ok(Action::await_change())
}

/// Reconcile one InterNetworkDomainAppConnection
#[instrument(skip(obj, ctx), fields(name = %obj.name_any(), namespace = %obj.namespace().unwrap_or_default()))]
pub(crate) async fn reconcile_app_connection(
    obj: Arc<InterNetworkDomainAppConnection>,
    ctx: Arc<ControllerState>,
) -> Result<Action> {
    let namespace = namespace_of(obj.as_ref())?;
    let handler = AppConnectionHandler::new(ctx.control_plane.clone(), ctx.cluster_name.clone());

    let stage = reconcile_intent(
        ctx.app_connections.as_ref(),
        &handler,
        &namespace,
        &obj.name_any(),
        APP_CONNECTION_FINALIZER,
    )
    .await?;
    info!(
        "Reconciled InterNetworkDomainAppConnection {}/{} ({:?})",
        namespace,
        obj.name_any(),
        stage
    );
    Ok(Action::await_change())
}

pub(crate) fn error_policy<K: Resource>(
    obj: Arc<K>,
    error: &Error,
    _ctx: Arc<ControllerState>,
) -> Action {
    error!("Reconciliation error for {}: {:?}", obj.name_any(), error);

    // Use shorter retry for retriable errors
    let retry_duration = if error.is_retriable() {
        Duration::from_secs(15)
    } else {
        Duration::from_secs(60)
    };

    Action::requeue(retry_duration)
}
