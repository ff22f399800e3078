//! Lease-based leader election
//!
//! Only the holder of the lease runs the reconcilers and the periodic loops. Losing the
//! lease shuts the operator down so a fresh process can campaign again.

use std::time::Duration;

use chrono::{DateTime, Utc};
use k8s_openapi::api::coordination::v1::{Lease, LeaseSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::MicroTime;
use kube::api::{Api, ObjectMeta, Patch, PatchParams, PostParams};
use kube::Client;
use tracing::{info, warn};

use crate::error::Result;
use crate::shutdown::Shutdown;

pub const LEASE_NAME: &str = "7aa1dec1.app-net-interface.io";
const LEASE_DURATION_SECS: i32 = 15;
const RENEW_INTERVAL: Duration = Duration::from_secs(10);
const RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Identity this process campaigns with
pub fn holder_identity() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| {
        hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown-host".to_string())
    })
}

/// Whether a lease held by someone else may be taken over at `now`
pub fn lease_expired(spec: Option<&LeaseSpec>, now: DateTime<Utc>) -> bool {
    spec.and_then(|s| s.renew_time.as_ref())
        .map(|renew| {
            let duration = spec
                .and_then(|s| s.lease_duration_seconds)
                .unwrap_or(LEASE_DURATION_SECS);
            now > renew.0 + chrono::Duration::seconds(duration as i64)
        })
        .unwrap_or(true)
}

pub struct LeaderElector {
    leases: Api<Lease>,
    namespace: String,
    identity: String,
}

impl LeaderElector {
    pub fn new(client: Client, namespace: &str, identity: String) -> Self {
        Self {
            leases: Api::namespaced(client, namespace),
            namespace: namespace.to_string(),
            identity,
        }
    }

    /// Campaign until the lease is ours. Returns false if shutdown came first.
    pub async fn acquire(&self, shutdown: &Shutdown) -> bool {
        info!(
            "Waiting for leadership of lease {}/{} as {}",
            self.namespace, LEASE_NAME, self.identity
        );
        loop {
            match self.try_acquire_or_renew().await {
                Ok(true) => {
                    info!("Acquired leadership for lease {}", LEASE_NAME);
                    return true;
                }
                Ok(false) => {}
                Err(e) => warn!("Leader election error: {:?}", e),
            }
            tokio::select! {
                _ = shutdown.wait() => return false,
                _ = tokio::time::sleep(RETRY_INTERVAL) => {}
            }
        }
    }

    /// Keep renewing the lease; trigger `shutdown` as soon as it is lost
    pub async fn hold(&self, shutdown: Shutdown) {
        loop {
            tokio::select! {
                _ = shutdown.wait() => return,
                _ = tokio::time::sleep(RENEW_INTERVAL) => {}
            }
            match self.try_acquire_or_renew().await {
                Ok(true) => {}
                Ok(false) => {
                    warn!("Lost leadership for lease {}", LEASE_NAME);
                    shutdown.trigger();
                    return;
                }
                Err(e) => {
                    warn!("Failed to renew lease {}: {:?}", LEASE_NAME, e);
                    if self.renewal_deadline_passed().await {
                        warn!("Lease {} expired while renewal was failing", LEASE_NAME);
                        shutdown.trigger();
                        return;
                    }
                }
            }
        }
    }

    async fn renewal_deadline_passed(&self) -> bool {
        match self.leases.get_opt(LEASE_NAME).await {
            Ok(Some(lease)) => lease_expired(lease.spec.as_ref(), Utc::now()),
            Ok(None) => true,
            Err(_) => false,
        }
    }

    async fn try_acquire_or_renew(&self) -> Result<bool> {
        let now = Utc::now();

        let Some(existing) = self.leases.get_opt(LEASE_NAME).await? else {
            let lease = Lease {
                metadata: ObjectMeta {
                    name: Some(LEASE_NAME.to_string()),
                    namespace: Some(self.namespace.clone()),
                    ..Default::default()
                },
                spec: Some(LeaseSpec {
                    holder_identity: Some(self.identity.clone()),
                    acquire_time: Some(MicroTime(now)),
                    renew_time: Some(MicroTime(now)),
                    lease_duration_seconds: Some(LEASE_DURATION_SECS),
                    ..Default::default()
                }),
            };
            self.leases.create(&PostParams::default(), &lease).await?;
            info!("Created lease {} with holder {}", LEASE_NAME, self.identity);
            return Ok(true);
        };

        let spec = existing.spec.as_ref();
        let current_holder = spec.and_then(|s| s.holder_identity.as_deref());

        let patch = if current_holder == Some(self.identity.as_str()) {
            serde_json::json!({
                "metadata": { "resourceVersion": existing.metadata.resource_version },
                "spec": {
                    "renewTime": MicroTime(now),
                    "leaseDurationSeconds": LEASE_DURATION_SECS,
                }
            })
        } else if lease_expired(spec, now) {
            info!(
                "Lease held by {:?} has expired, taking over",
                current_holder
            );
            serde_json::json!({
                "metadata": { "resourceVersion": existing.metadata.resource_version },
                "spec": {
                    "holderIdentity": self.identity,
                    "acquireTime": MicroTime(now),
                    "renewTime": MicroTime(now),
                    "leaseDurationSeconds": LEASE_DURATION_SECS,
                }
            })
        } else {
            return Ok(false);
        };

        self.leases
            .patch(LEASE_NAME, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(true)
    }
}
