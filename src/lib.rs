//! kube-awi: Kubernetes operator for the AWI network control plane
//!
//! This crate reconciles InterNetworkDomainConnection and InterNetworkDomainAppConnection
//! intents against the AWI control plane, mirrors their remote status back, and keeps
//! the discovered cloud inventory (VPCs, subnets, instances, sites, VPNs and network
//! domains) in sync as CRDs.

pub mod awi;
pub mod config;
pub mod controller;
pub mod crd;
pub mod error;
pub mod leader;
pub mod shutdown;
pub mod store;
pub mod sync;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::error::{Error, Result};
