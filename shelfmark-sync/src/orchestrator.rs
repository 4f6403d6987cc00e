//! Sync orchestrator.
//!
//! Sequences one sync run for the open book: resolve the server-side book
//! record, best-effort file uploads, highlights, then pending sessions with
//! all-or-nothing acknowledgement. Re-running after partial success is safe:
//! highlights are server-deduplicated, file uploads are skipped when the
//! server already holds the asset, and session upload only ever sends rows
//! still marked unsynced.

use crate::api_client::ApiClient;
use crate::error::SyncResult;
use crate::sources::BookSource;
use crate::types::*;
use shelfmark_store::SessionStore;
use shelfmark_types::BookFileHash;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Composes the API client and session store into whole sync runs.
pub struct SyncOrchestrator {
    api: Arc<ApiClient>,
    store: SessionStore,
}

impl SyncOrchestrator {
    pub fn new(api: Arc<ApiClient>, store: SessionStore) -> Self {
        Self { api, store }
    }

    /// Runs a full sync for the open book.
    ///
    /// Manual runs surface a distinguishable error message; autonomous runs
    /// perform identical steps but only log failures, relying on the next
    /// successful attempt to catch up.
    pub async fn sync_book(&self, source: &dyn BookSource, mode: SyncMode) -> SyncReport {
        match self.run_full(source).await {
            Ok(report) => report,
            Err(e) => report_failure(e, mode),
        }
    }

    /// Lighter-weight path for opportunistic runs: pending sessions only,
    /// no book-record resolution, no file or highlight traffic.
    pub async fn sync_sessions_only(&self, source: &dyn BookSource, mode: SyncMode) -> SyncReport {
        let result: SyncResult<SyncReport> = async {
            let Some(data) = source.book_data() else {
                debug!("no open book, nothing to sync");
                return Ok(SyncReport::succeeded());
            };
            let book = BookPayload::from_data(&data);
            let mut report = SyncReport::succeeded();
            report.sessions_synced = self.upload_pending_sessions(source, &book).await?;
            Ok(report)
        }
        .await;

        match result {
            Ok(report) => report,
            Err(e) => report_failure(e, mode),
        }
    }

    async fn run_full(&self, source: &dyn BookSource) -> SyncResult<SyncReport> {
        let Some(data) = source.book_data() else {
            debug!("no open book, nothing to sync");
            return Ok(SyncReport::succeeded());
        };
        let book = BookPayload::from_data(&data);

        // Without a resolved book record no partial upload is attempted.
        let status = self.resolve_book(&book).await?;
        self.upload_files(source, &book, &status).await;

        let mut report = SyncReport::succeeded();

        let highlights = source.highlights();
        if highlights.is_empty() {
            debug!("no highlights to upload for {}", book.title);
        } else {
            // Highlights are primary content: failure aborts the run.
            let resp = self.api.upload_highlights(&book, &highlights).await?;
            report.highlights_created = resp.highlights_created;
            report.highlights_skipped = resp.highlights_skipped;
        }

        report.sessions_synced = self.upload_pending_sessions(source, &book).await?;

        info!(
            "sync finished for {}: {} highlights created, {} skipped, {} sessions",
            book.title, report.highlights_created, report.highlights_skipped, report.sessions_synced
        );
        Ok(report)
    }

    /// Fetch-or-create of the server-side book record.
    async fn resolve_book(&self, book: &BookPayload) -> SyncResult<BookStatus> {
        let id = shelfmark_types::ClientBookId::from_title_author(&book.title, &book.author);
        match self.api.get_book(&id).await? {
            Some(status) => Ok(status),
            None => {
                info!("book {} not on server, creating", book.title);
                self.api.create_book(book).await
            }
        }
    }

    /// Best-effort cover and document upload.
    ///
    /// Each is skipped when the server already reports the asset or the
    /// local artifact is absent. Failures are logged and never abort the
    /// run.
    async fn upload_files(&self, source: &dyn BookSource, book: &BookPayload, status: &BookStatus) {
        let id = shelfmark_types::ClientBookId::from_title_author(&book.title, &book.author);

        if status.has_cover {
            debug!("server already has cover for {}", book.title);
        } else if let Some(bytes) = source.cover_bytes() {
            if let Err(e) = self.api.upload_cover(&id, bytes).await {
                warn!("cover upload failed for {}: {e}", book.title);
            }
        }

        if status.has_epub {
            debug!("server already has document for {}", book.title);
        } else if let Some(path) = source.doc_path() {
            match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    let filename = document_filename(&path);
                    if let Err(e) = self.api.upload_epub(&id, bytes, &filename).await {
                        warn!("document upload failed for {}: {e}", book.title);
                    }
                }
                Err(e) => debug!("document not readable, skipping upload: {e}"),
            }
        }
    }

    /// Uploads unsynced sessions for the book's local file, oldest first.
    ///
    /// Marking is all-or-nothing: ids are flagged synced only after the
    /// server accepted the entire batch, and a failed batch leaves every
    /// session unsynced (with its attempt counter bumped) for a later retry.
    async fn upload_pending_sessions(
        &self,
        source: &dyn BookSource,
        book: &BookPayload,
    ) -> SyncResult<u32> {
        let Some(path) = source.doc_path() else {
            return Ok(0);
        };
        let book_hash = BookFileHash::from_path(&path);

        let pending = self.store.unsynced_for_book(&book_hash)?;
        if pending.is_empty() {
            debug!("no pending sessions for {}", book.title);
            return Ok(0);
        }

        let ids: Vec<String> = pending.iter().map(|s| s.id.clone()).collect();
        let payloads: Vec<SessionPayload> = pending.iter().map(SessionPayload::from).collect();

        match self.api.upload_sessions(book, &payloads).await {
            Ok(_) => {
                self.store.mark_synced(&ids)?;
                Ok(ids.len() as u32)
            }
            Err(e) => {
                if let Err(se) = self.store.record_attempt(&ids) {
                    warn!("failed to record sync attempt: {se}");
                }
                Err(e)
            }
        }
    }
}

fn document_filename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "book.epub".to_string())
}

fn report_failure(e: crate::error::SyncError, mode: SyncMode) -> SyncReport {
    match mode {
        SyncMode::Manual => {
            let message = if e.is_auth() {
                "Authentication failed".to_string()
            } else {
                format!("Sync failed: {e}")
            };
            SyncReport::failed(Some(message))
        }
        SyncMode::Autonomous => {
            warn!("autonomous sync failed: {e}");
            SyncReport::failed(None)
        }
    }
}
