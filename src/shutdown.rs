//! Root shutdown signal shared by every long-running task

use std::sync::Arc;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::watch;
use tracing::info;

/// Cloneable one-shot signal; once triggered it stays triggered
#[derive(Clone, Debug)]
pub struct Shutdown {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    pub fn trigger(&self) {
        if !self.sender.send_replace(true) {
            info!("Shutdown requested");
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the signal has been triggered
    pub async fn wait(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as any clone of self, so this only returns once set
        let _ = receiver.wait_for(|triggered| *triggered).await;
    }

    /// Shareable future for APIs that need an owned `Send + Sync` future
    pub fn signalled(&self) -> Shared<BoxFuture<'static, ()>> {
        let this = self.clone();
        async move { this.wait().await }.boxed().shared()
    }
}
