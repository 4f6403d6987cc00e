//! Lifecycle agent.
//!
//! Binds the session tracker, orchestrator, and connectivity gate, and maps
//! the host's lifecycle triggers onto them. Triggers arrive as plain
//! function calls and are processed serially; a run completes or fails
//! before the next trigger is handled.

use crate::connectivity::ConnectivityGate;
use crate::orchestrator::SyncOrchestrator;
use crate::sources::BookSource;
use crate::types::{SyncMode, SyncReport};
use shelfmark_store::{EndReason, SessionStore, SessionTracker};
use shelfmark_types::SyncTrigger;
use tracing::{debug, warn};

/// Drives the sync engine from external lifecycle triggers.
pub struct SyncAgent {
    orchestrator: SyncOrchestrator,
    gate: ConnectivityGate,
    tracker: SessionTracker,
    store: SessionStore,
}

impl SyncAgent {
    pub fn new(
        orchestrator: SyncOrchestrator,
        gate: ConnectivityGate,
        tracker: SessionTracker,
        store: SessionStore,
    ) -> Self {
        Self {
            orchestrator,
            gate,
            tracker,
            store,
        }
    }

    /// The session tracker; hosts report document opens and page turns
    /// through it directly.
    pub fn tracker(&mut self) -> &mut SessionTracker {
        &mut self.tracker
    }

    /// Handles one lifecycle trigger.
    pub async fn handle_trigger(&mut self, trigger: SyncTrigger, source: &dyn BookSource) {
        debug!("lifecycle trigger: {trigger:?}");
        match trigger {
            SyncTrigger::Ready => {
                self.gated_sync(source, SyncMode::Autonomous).await;
            }
            // Position payloads travel through the tracker API; the trigger
            // itself carries nothing to act on.
            SyncTrigger::PageUpdate => {}
            SyncTrigger::Suspend => {
                self.end_session(EndReason::Suspend);
                self.checkpoint();
                self.opportunistic_sync(source).await;
            }
            SyncTrigger::Resume => {
                self.opportunistic_sync(source).await;
            }
            SyncTrigger::Close => {
                self.end_session(EndReason::DocumentClose);
                self.gated_sync(source, SyncMode::Autonomous).await;
            }
            SyncTrigger::Exit => {
                self.end_session(EndReason::Exit);
                if let Err(e) = self.store.close() {
                    warn!("session store close failed: {e}");
                }
            }
        }
    }

    /// User-initiated sync; the active session keeps running.
    pub async fn manual_sync(&mut self, source: &dyn BookSource) -> SyncReport {
        self.gated_sync(source, SyncMode::Manual).await
    }

    /// Full sync behind the connectivity gate.
    async fn gated_sync(&self, source: &dyn BookSource, mode: SyncMode) -> SyncReport {
        let lease = match self.gate.acquire().await {
            Ok(lease) => lease,
            Err(e) => {
                return match mode {
                    SyncMode::Manual => SyncReport::failed(Some(format!("Sync failed: {e}"))),
                    SyncMode::Autonomous => {
                        debug!("connectivity unavailable, skipping sync: {e}");
                        SyncReport::failed(None)
                    }
                };
            }
        };

        let report = self.orchestrator.sync_book(source, mode).await;
        self.gate.release(lease).await;
        report
    }

    /// Session-only sync, and only if the network is already up.
    async fn opportunistic_sync(&self, source: &dyn BookSource) {
        if let Some(lease) = self.gate.opportunistic().await {
            self.orchestrator
                .sync_sessions_only(source, SyncMode::Autonomous)
                .await;
            self.gate.release(lease).await;
        } else {
            debug!("offline, deferring session upload");
        }
    }

    fn end_session(&mut self, reason: EndReason) {
        if let Err(e) = self.tracker.end_session(reason) {
            warn!("failed to persist session: {e}");
        }
    }

    fn checkpoint(&self) {
        if let Err(e) = self.store.checkpoint() {
            warn!("session store checkpoint failed: {e}");
        }
    }
}
