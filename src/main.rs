use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use kube::api::ListParams;
use kube::{Api, Client, CustomResourceExt};
use kube_awi::awi::{ControlPlane, HttpControlPlane};
use kube_awi::config::{
    parse_providers, OperatorConfig, DEFAULT_CONTROL_PLANE_ADDRESS, DEFAULT_PROVIDER,
    DEFAULT_SYNC_NAMESPACE,
};
use kube_awi::controller::{self, ControllerState, StatusWatcher};
use kube_awi::crd::{
    Instance, InterNetworkDomainAppConnection, InterNetworkDomainConnection, NetworkDomain, Site,
    Subnet, Vpc, Vpn,
};
use kube_awi::leader::{holder_identity, LeaderElector};
use kube_awi::shutdown::Shutdown;
use kube_awi::store::KubeStore;
use kube_awi::sync::{standard_syncers, InventoryStores, SyncScheduler};
use kube_awi::{telemetry, Error};
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the operator
    Run(RunArgs),
    /// Show version and build information
    Version,
    /// Show cluster information
    Info(InfoArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Address of the AWI control plane
    #[arg(long, env = "AWI_CATALYST_ADDRESS", default_value = DEFAULT_CONTROL_PLANE_ADDRESS)]
    control_plane_address: String,

    /// Name of this cluster, used for pod-scoped app connections
    #[arg(long, env = "CLUSTER_NAME", default_value = "")]
    cluster_name: String,

    /// Namespace holding the discovered inventory
    #[arg(long, env = "AWI_NAMESPACE", default_value = DEFAULT_SYNC_NAMESPACE)]
    sync_namespace: String,

    /// Comma separated cloud providers to discover
    #[arg(long, env = "AWI_PROVIDERS", default_value = DEFAULT_PROVIDER)]
    providers: String,

    /// Seconds between status polls
    #[arg(long, env = "STATUS_WATCH_INTERVAL", default_value_t = 15)]
    status_interval_secs: u64,

    /// Seconds between inventory sync passes
    #[arg(long, env = "SYNC_INTERVAL", default_value_t = 60)]
    sync_interval_secs: u64,

    /// Deadline for a single control plane call
    #[arg(long, default_value_t = 30)]
    call_timeout_secs: u64,

    /// Deadline for a list-and-update pass
    #[arg(long, default_value_t = 60)]
    pass_timeout_secs: u64,

    /// Only run while holding the leader lease
    #[arg(long, env = "LEADER_ELECT")]
    leader_elect: bool,

    /// Namespace of the leader lease
    #[arg(long, env = "POD_NAMESPACE", default_value = DEFAULT_SYNC_NAMESPACE)]
    leader_namespace: String,
}

impl RunArgs {
    fn operator_config(&self) -> Result<OperatorConfig, Error> {
        let providers = parse_providers(&self.providers);
        if providers.is_empty() {
            return Err(Error::ConfigError("no cloud providers configured".to_string()));
        }
        Ok(OperatorConfig {
            control_plane_address: self.control_plane_address.clone(),
            cluster_name: self.cluster_name.clone(),
            sync_namespace: self.sync_namespace.clone(),
            providers,
            status_interval: Duration::from_secs(self.status_interval_secs),
            sync_interval: Duration::from_secs(self.sync_interval_secs),
            call_timeout: Duration::from_secs(self.call_timeout_secs),
            pass_timeout: Duration::from_secs(self.pass_timeout_secs),
        })
    }
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Namespace holding the discovered inventory
    #[arg(long, env = "AWI_NAMESPACE", default_value = DEFAULT_SYNC_NAMESPACE)]
    sync_namespace: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    match args.command {
        Commands::Version => {
            println!("kube-awi Operator v{}", env!("CARGO_PKG_VERSION"));
            println!("Build Date: {}", env!("BUILD_DATE"));
            println!("Git SHA: {}", env!("GIT_SHA"));
            println!("Rust Version: {}", env!("RUST_VERSION"));
            Ok(())
        }
        Commands::Info(info_args) => run_info(info_args).await,
        Commands::Run(run_args) => run_operator(run_args).await,
    }
}

async fn count<K>(api: Api<K>) -> Result<usize, Error>
where
    K: kube::Resource + Clone + serde::de::DeserializeOwned + std::fmt::Debug,
{
    Ok(api.list(&ListParams::default()).await?.items.len())
}

async fn run_info(args: InfoArgs) -> Result<(), Error> {
    // Initialize Kubernetes client
    let client = Client::try_default().await?;

    let connections = count(Api::<InterNetworkDomainConnection>::all(client.clone())).await?;
    let app_connections =
        count(Api::<InterNetworkDomainAppConnection>::all(client.clone())).await?;
    let vpcs = count(Api::<Vpc>::namespaced(client.clone(), &args.sync_namespace)).await?;
    let vpns = count(Api::<Vpn>::namespaced(client.clone(), &args.sync_namespace)).await?;
    let domains = count(Api::<NetworkDomain>::namespaced(client, &args.sync_namespace)).await?;

    println!(
        "{}: {}",
        InterNetworkDomainConnection::crd_name(),
        connections
    );
    println!(
        "{}: {}",
        InterNetworkDomainAppConnection::crd_name(),
        app_connections
    );
    println!("{}: {}", Vpc::crd_name(), vpcs);
    println!("{}: {}", Vpn::crd_name(), vpns);
    println!("{}: {}", NetworkDomain::crd_name(), domains);
    Ok(())
}

fn init_tracing() -> Result<(), Error> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let json = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let (json_layer, text_layer) = if json {
        (Some(fmt::layer().json().with_target(true)), None)
    } else {
        (None, Some(fmt::layer().with_target(true)))
    };

    // Register the subscriber with stdout logging and, when configured, OTLP export
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer);

    if telemetry::otel_enabled() {
        let otel_layer = telemetry::init_telemetry(&registry)?;
        registry.with(otel_layer).init();
        info!("OpenTelemetry tracing initialized");
    } else {
        registry.init();
        info!("OpenTelemetry tracing disabled (OTEL_EXPORTER_OTLP_ENDPOINT not set)");
    }
    Ok(())
}

/// Trigger `shutdown` on SIGINT or SIGTERM
fn spawn_signal_handler(shutdown: Shutdown) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
                        _ = sigterm.recv() => info!("Received SIGTERM"),
                    }
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {:?}", e);
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl-C");
        }
        shutdown.trigger();
    });
}

async fn run_operator(args: RunArgs) -> Result<(), Error> {
    init_tracing()?;
    let config = args.operator_config()?;

    info!("Starting kube-awi Operator v{}", env!("CARGO_PKG_VERSION"));

    // Initialize Kubernetes client
    let client = Client::try_default().await?;

    info!("Connected to Kubernetes cluster");

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    if args.leader_elect {
        let elector = Arc::new(LeaderElector::new(
            client.clone(),
            &args.leader_namespace,
            holder_identity(),
        ));
        if !elector.acquire(&shutdown).await {
            info!("Shut down before acquiring leadership");
            telemetry::shutdown_telemetry();
            return Ok(());
        }
        let holder = elector.clone();
        let lease_shutdown = shutdown.clone();
        tokio::spawn(async move { holder.hold(lease_shutdown).await });
    }

    let control_plane: Arc<dyn ControlPlane> = Arc::new(HttpControlPlane::new(
        &config.control_plane_address,
        config.call_timeout,
    )?);

    let state = Arc::new(ControllerState {
        control_plane: control_plane.clone(),
        connections: Arc::new(KubeStore::<InterNetworkDomainConnection>::new(client.clone())),
        app_connections: Arc::new(KubeStore::<InterNetworkDomainAppConnection>::new(
            client.clone(),
        )),
        cluster_name: config.cluster_name.clone(),
    });

    // Start the status watcher
    let watcher = StatusWatcher::new(
        control_plane.clone(),
        state.connections.clone(),
        state.app_connections.clone(),
        config.status_interval,
        config.pass_timeout,
    );
    let watcher_task = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { watcher.run(shutdown).await })
    };

    // Start the inventory sync scheduler
    let stores = InventoryStores {
        vpcs: Arc::new(KubeStore::<Vpc>::new(client.clone())),
        subnets: Arc::new(KubeStore::<Subnet>::new(client.clone())),
        instances: Arc::new(KubeStore::<Instance>::new(client.clone())),
        sites: Arc::new(KubeStore::<Site>::new(client.clone())),
        vpns: Arc::new(KubeStore::<Vpn>::new(client.clone())),
        network_domains: Arc::new(KubeStore::<NetworkDomain>::new(client.clone())),
    };
    let scheduler = SyncScheduler::new(
        standard_syncers(
            control_plane,
            &stores,
            &config.sync_namespace,
            &config.providers,
        ),
        config.sync_interval,
        config.pass_timeout,
    );
    let scheduler_task = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { scheduler.run(shutdown).await })
    };

    // Run the controller loops until shutdown
    let result = controller::run_controllers(client, state, shutdown.clone()).await;
    if let Err(e) = &result {
        error!("Controllers failed: {:?}", e);
    }
    shutdown.trigger();

    for task in [watcher_task, scheduler_task] {
        if let Err(e) = task.await {
            error!("Background task failed: {:?}", e);
        }
    }

    // Flush any remaining traces
    telemetry::shutdown_telemetry();

    result
}
