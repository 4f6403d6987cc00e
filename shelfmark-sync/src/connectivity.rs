//! Connectivity gate.
//!
//! Sync runs only once a network path exists. The gate remembers whether it
//! was the one that brought the network up and releases only what it
//! acquired, so it never fights a connection the user opened themselves.

use crate::error::SyncResult;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Platform connectivity primitives, supplied by the host.
#[async_trait]
pub trait NetworkController: Send + Sync {
    async fn is_online(&self) -> bool;

    /// Requests a network path and returns once one is available.
    async fn bring_online(&self) -> SyncResult<()>;

    async fn take_offline(&self);
}

/// Proof that a network path existed when the gate was passed.
///
/// Carries whether the gate itself opened the path; pass it back to
/// [`ConnectivityGate::release`] after the run.
#[derive(Debug)]
pub struct NetworkLease {
    opened_here: bool,
}

impl NetworkLease {
    pub fn opened_here(&self) -> bool {
        self.opened_here
    }
}

/// Defers work until connectivity exists and cleans up what it opened.
pub struct ConnectivityGate {
    network: Arc<dyn NetworkController>,
}

impl ConnectivityGate {
    pub fn new(network: Arc<dyn NetworkController>) -> Self {
        Self { network }
    }

    /// Waits for a network path, requesting one if none exists.
    pub async fn acquire(&self) -> SyncResult<NetworkLease> {
        if self.network.is_online().await {
            return Ok(NetworkLease { opened_here: false });
        }
        debug!("no network path, requesting connectivity");
        self.network.bring_online().await?;
        Ok(NetworkLease { opened_here: true })
    }

    /// Takes the network down only if this gate brought it up.
    pub async fn release(&self, lease: NetworkLease) {
        if lease.opened_here {
            debug!("releasing connectivity acquired for sync");
            self.network.take_offline().await;
        }
    }

    /// Checks current connectivity without ever requesting it.
    ///
    /// `Some` only when already online; the lease is never owned, so
    /// releasing it is a no-op.
    pub async fn opportunistic(&self) -> Option<NetworkLease> {
        if self.network.is_online().await {
            Some(NetworkLease { opened_here: false })
        } else {
            None
        }
    }
}
