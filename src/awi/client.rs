//! Client for the AWI control plane
//!
//! Every call is a single request/response under the client's per-call deadline. Calls
//! are never retried here; callers retry on their next scheduled invocation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use super::types::{
    AppConnectionInformation, ConnectionInformation, DisconnectRequest,
    ListAppConnectionsResponse, ListConnectionsResponse, ListInstancesResponse,
    ListSitesResponse, ListSubnetsResponse, ListVpcsResponse, ListVpnsResponse, StatusResponse,
};
use crate::crd::{
    AppConnectionConfig, ConnectionRequest, ConnectionState, InstanceSpec, SiteSpec, SubnetSpec,
    VpcSpec, VpnSpec,
};
use crate::error::{Error, Result};

/// Operations the operator consumes from the AWI control plane
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn connect(&self, request: &ConnectionRequest) -> Result<ConnectionState>;

    async fn disconnect(&self, connection_key: &str) -> Result<()>;

    async fn connect_apps(&self, request: &AppConnectionConfig) -> Result<ConnectionState>;

    async fn disconnect_apps(&self, app_connection_key: &str) -> Result<()>;

    async fn list_connections(&self) -> Result<Vec<ConnectionInformation>>;

    async fn list_connected_apps(&self) -> Result<Vec<AppConnectionInformation>>;

    async fn list_vpcs(&self, provider: &str) -> Result<Vec<VpcSpec>>;

    async fn list_subnets(&self, provider: &str) -> Result<Vec<SubnetSpec>>;

    async fn list_instances(&self, provider: &str) -> Result<Vec<InstanceSpec>>;

    async fn list_sites(&self) -> Result<Vec<SiteSpec>>;

    async fn list_vpns(&self) -> Result<Vec<VpnSpec>>;
}

/// JSON-over-HTTP implementation of [`ControlPlane`]
pub struct HttpControlPlane {
    http_client: Client,
    base_url: String,
}

impl HttpControlPlane {
    /// Create a client for the control plane at `address`.
    ///
    /// `address` may omit the scheme (`localhost:50051`), plain http is assumed then.
    pub fn new(address: &str, call_timeout: Duration) -> Result<Self> {
        let base_url = if address.contains("://") {
            address.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", address.trim_end_matches('/'))
        };
        info!("Using AWI control plane at {}", base_url);

        Ok(Self {
            http_client: Client::builder().timeout(call_timeout).build()?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        debug!("GET {}", path);
        let response = self
            .http_client
            .get(self.url(path))
            .query(query)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        debug!("POST {}", path);
        let response = self
            .http_client
            .post(self.url(path))
            .json(body)
            .send()
            .await?;
        check_status(response).await
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(Error::ControlPlane {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn connect(&self, request: &ConnectionRequest) -> Result<ConnectionState> {
        info!(
            "Sending connection request {} ({})",
            request.metadata.name,
            request.connection_key()
        );
        let response: StatusResponse = self
            .post("/v1/connections/connect", request)
            .await?
            .json()
            .await?;
        debug!("Connection response: {}", response.status);
        Ok(response.status)
    }

    async fn disconnect(&self, connection_key: &str) -> Result<()> {
        info!("Sending disconnect request for {}", connection_key);
        self.post(
            "/v1/connections/disconnect",
            &DisconnectRequest {
                connection_id: connection_key,
            },
        )
        .await?;
        Ok(())
    }

    async fn connect_apps(&self, request: &AppConnectionConfig) -> Result<ConnectionState> {
        info!(
            "Sending app connection request {} on {}",
            request.app_connection_name(),
            request.domain_connection_name()
        );
        let response: StatusResponse = self
            .post("/v1/app-connections/connect", request)
            .await?
            .json()
            .await?;
        debug!("App connection response: {}", response.status);
        Ok(response.status)
    }

    async fn disconnect_apps(&self, app_connection_key: &str) -> Result<()> {
        info!("Sending app disconnect request for {}", app_connection_key);
        self.post(
            "/v1/app-connections/disconnect",
            &DisconnectRequest {
                connection_id: app_connection_key,
            },
        )
        .await?;
        Ok(())
    }

    async fn list_connections(&self) -> Result<Vec<ConnectionInformation>> {
        let response: ListConnectionsResponse = self.get_json("/v1/connections", &[]).await?;
        Ok(response.connections)
    }

    async fn list_connected_apps(&self) -> Result<Vec<AppConnectionInformation>> {
        let response: ListAppConnectionsResponse =
            self.get_json("/v1/app-connections", &[]).await?;
        Ok(response.app_connections)
    }

    async fn list_vpcs(&self, provider: &str) -> Result<Vec<VpcSpec>> {
        let response: ListVpcsResponse = self
            .get_json("/v1/cloud/vpcs", &[("provider", provider)])
            .await?;
        Ok(response.vpcs)
    }

    async fn list_subnets(&self, provider: &str) -> Result<Vec<SubnetSpec>> {
        let response: ListSubnetsResponse = self
            .get_json("/v1/cloud/subnets", &[("provider", provider)])
            .await?;
        Ok(response.subnets)
    }

    async fn list_instances(&self, provider: &str) -> Result<Vec<InstanceSpec>> {
        let response: ListInstancesResponse = self
            .get_json("/v1/cloud/instances", &[("provider", provider)])
            .await?;
        Ok(response.instances)
    }

    async fn list_sites(&self) -> Result<Vec<SiteSpec>> {
        let response: ListSitesResponse = self.get_json("/v1/cloud/sites", &[]).await?;
        Ok(response.sites)
    }

    async fn list_vpns(&self) -> Result<Vec<VpnSpec>> {
        let response: ListVpnsResponse = self.get_json("/v1/cloud/vpns", &[]).await?;
        Ok(response.vpns)
    }
}
