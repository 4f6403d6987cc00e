//! In-memory active-session state machine.
//!
//! Per open document the lifecycle is `NO_SESSION → ACTIVE → (discarded |
//! PERSISTED)`. Position updates are cheap and purely in-memory; storage is
//! touched exactly once, when a session ends with a duration above the
//! configured minimum.

use crate::error::StorageResult;
use crate::session_store::SessionStore;
use chrono::{DateTime, Utc};
use shelfmark_types::{BookFileHash, PositionType, SessionDraft};
use std::path::Path;
use tracing::{debug, warn};

/// Why a session ended. Recorded in logs only, not in the row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    /// A new session started while this one was still active.
    NewSession,
    Suspend,
    DocumentClose,
    Exit,
    Manual,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::NewSession => "new_session",
            EndReason::Suspend => "suspend",
            EndReason::DocumentClose => "document_close",
            EndReason::Exit => "exit",
            EndReason::Manual => "manual",
        }
    }
}

/// Everything the tracker needs to know when a document opens.
#[derive(Clone, Debug)]
pub struct BookOpen {
    /// Absolute path of the document on this device.
    pub book_file: String,
    pub book_title: String,
    pub book_author: String,
    pub position_type: PositionType,
    /// Page number rendered as a string, or an anchor locator.
    pub position: String,
    pub page: Option<u32>,
    pub total_pages: Option<u32>,
}

struct ActiveSession {
    book_file: String,
    book_hash: BookFileHash,
    book_title: String,
    book_author: String,
    start_time: DateTime<Utc>,
    position_type: PositionType,
    start_position: String,
    start_page: Option<u32>,
    current_position: String,
    current_page: Option<u32>,
    total_pages: Option<u32>,
}

/// Tracks the (at most one) active reading session and finalizes it into the
/// durable store.
pub struct SessionTracker {
    store: SessionStore,
    device_id: String,
    min_duration_secs: i64,
    active: Option<ActiveSession>,
}

impl SessionTracker {
    pub fn new(store: SessionStore, device_id: String, min_duration_secs: i64) -> Self {
        Self {
            store,
            device_id,
            min_duration_secs,
            active: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Start time of the active session, if any.
    pub fn active_started_at(&self) -> Option<DateTime<Utc>> {
        self.active.as_ref().map(|a| a.start_time)
    }

    /// Begins a session for a freshly opened document.
    ///
    /// Sessions never overlap: an already-active session is ended first
    /// (reason `new_session`). A persistence failure of the old session does
    /// not block the new one.
    pub fn start_session(&mut self, book: BookOpen) {
        if self.active.is_some() {
            if let Err(e) = self.end_session(EndReason::NewSession) {
                warn!("failed to persist previous session: {e}");
            }
        }

        let book_hash = BookFileHash::from_path(Path::new(&book.book_file));
        debug!("session started for {} ({book_hash})", book.book_title);
        self.active = Some(ActiveSession {
            book_file: book.book_file,
            book_hash,
            book_title: book.book_title,
            book_author: book.book_author,
            start_time: Utc::now(),
            position_type: book.position_type,
            start_position: book.position.clone(),
            start_page: book.page,
            current_position: book.position,
            current_page: book.page,
            total_pages: book.total_pages,
        });
    }

    /// Records the current position. Called on every page turn; in-memory
    /// only, never touches storage.
    pub fn update_position(&mut self, position: &str, page: Option<u32>) {
        if let Some(active) = self.active.as_mut() {
            active.current_position = position.to_string();
            active.current_page = page;
        }
    }

    /// Ends the active session now. See [`Self::end_session_at`].
    pub fn end_session(&mut self, reason: EndReason) -> StorageResult<Option<String>> {
        self.end_session_at(reason, Utc::now())
    }

    /// Ends the active session at the given instant.
    ///
    /// Sessions shorter than the configured minimum are discarded, never
    /// persisted; this filters accidental opens. Returns the id of the
    /// persisted row, or `None` when nothing was persisted. The active
    /// session is cleared in every outcome, including a failed insert, so a
    /// storage error cannot wedge the state machine.
    pub fn end_session_at(
        &mut self,
        reason: EndReason,
        ended_at: DateTime<Utc>,
    ) -> StorageResult<Option<String>> {
        let Some(active) = self.active.take() else {
            return Ok(None);
        };

        let duration = (ended_at - active.start_time).num_seconds().max(0);
        if duration < self.min_duration_secs {
            debug!(
                "discarding {duration}s session for {} (reason {}, minimum {}s)",
                active.book_title,
                reason.as_str(),
                self.min_duration_secs
            );
            return Ok(None);
        }

        let draft = SessionDraft {
            book_file: active.book_file,
            book_hash: active.book_hash,
            book_title: active.book_title,
            book_author: active.book_author,
            start_time: active.start_time,
            end_time: ended_at,
            duration_seconds: duration,
            position_type: active.position_type,
            start_position: active.start_position,
            end_position: active.current_position,
            start_page: active.start_page,
            end_page: active.current_page,
            total_pages: active.total_pages,
            device_id: self.device_id.clone(),
        };

        let id = self.store.insert_session(&draft)?;
        debug!("session {id} ended after {duration}s (reason {})", reason.as_str());
        Ok(Some(id))
    }
}
