//! AWI control plane access
//!
//! The operator only ever talks to the control plane through [`ControlPlane`].

mod client;
pub mod types;

pub use client::{ControlPlane, HttpControlPlane};
pub use types::{find_app_connection, AppConnectionInformation, ConnectionInformation};
