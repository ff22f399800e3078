//! Controller module for AWI connection intents
//! This module contains the controller loops, the finalizer lifecycle shared by both
//! intent kinds and the status watcher that mirrors remote state back onto them.

mod app_connection;
mod connection;
mod finalizers;
pub mod predicates;
mod reconciler;
mod status_watcher;

pub use app_connection::AppConnectionHandler;
pub use connection::ConnectionHandler;
pub use finalizers::{
    lifecycle, reconcile_intent, IntentHandler, Lifecycle, APP_CONNECTION_FINALIZER,
    CONNECTION_FINALIZER,
};
pub use reconciler::{run_controllers, ControllerState};
pub use status_watcher::StatusWatcher;
