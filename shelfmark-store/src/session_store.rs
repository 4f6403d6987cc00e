//! Durable reading-session queue.
//!
//! One row per finalized session, keyed by the device-local book-file hash.
//! Rows move through exactly one visible transition: unsynced → synced, and
//! only as a whole batch after the server acknowledged the upload.

use crate::error::{StorageError, StorageResult};
use chrono::DateTime;
use duckdb::{Connection, params};
use shelfmark_types::{BookFileHash, PositionType, ReadingSession, SessionDraft};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Persists finalized reading sessions until the server acknowledges them.
#[derive(Clone)]
pub struct SessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SessionStore {
    /// Opens or creates a session store at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = crate::open_duckdb_with_wal_recovery(path, "64MB", 1)?;
        initialize_session_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory session store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_session_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Inserts one finalized session and returns the id assigned to it.
    pub fn insert_session(&self, draft: &SessionDraft) -> StorageResult<String> {
        if draft.end_time < draft.start_time {
            return Err(StorageError::InvalidSession(format!(
                "end_time {} precedes start_time {}",
                draft.end_time, draft.start_time
            )));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO reading_sessions (
                id, book_file, book_hash, book_title, book_author,
                start_time, end_time, duration_seconds,
                position_type, start_position, end_position,
                start_page, end_page, total_pages,
                device_id, synced, sync_attempts
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, FALSE, 0)
            "#,
            params![
                id,
                draft.book_file,
                draft.book_hash.as_str(),
                draft.book_title,
                draft.book_author,
                draft.start_time.timestamp(),
                draft.end_time.timestamp(),
                draft.duration_seconds,
                draft.position_type.as_str(),
                draft.start_position,
                draft.end_position,
                draft.start_page.map(|p| p as i32),
                draft.end_page.map(|p| p as i32),
                draft.total_pages.map(|p| p as i32),
                draft.device_id,
            ],
        )?;
        debug!("persisted session {id} for {}", draft.book_hash);
        Ok(id)
    }

    /// Unsynced sessions for one book, oldest first.
    ///
    /// Ascending start_time keeps the upload order deterministic and
    /// auditable against the server's records.
    pub fn unsynced_for_book(&self, book_hash: &BookFileHash) -> StorageResult<Vec<ReadingSession>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, book_file, book_hash, book_title, book_author, \
                    start_time, end_time, duration_seconds, \
                    position_type, start_position, end_position, \
                    start_page, end_page, total_pages, \
                    device_id, synced, sync_attempts \
             FROM reading_sessions WHERE book_hash = ? AND NOT synced \
             ORDER BY start_time",
        )?;

        let sessions = stmt
            .query_map(params![book_hash.as_str()], row_to_session)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(sessions)
    }

    /// Flags a batch of sessions synced in one statement.
    ///
    /// Single-statement so the marking is atomic: after a failure either
    /// every id is still unsynced or every id is synced, never a subset.
    pub fn mark_synced(&self, ids: &[String]) -> StorageResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            &format!(
                "UPDATE reading_sessions SET synced = TRUE WHERE id IN ({})",
                id_list(ids)
            ),
            [],
        )?;
        debug!("marked {updated} sessions synced");
        Ok(updated)
    }

    /// Bumps the attempt counter after a failed batch upload.
    pub fn record_attempt(&self, ids: &[String]) -> StorageResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            &format!(
                "UPDATE reading_sessions SET sync_attempts = sync_attempts + 1 WHERE id IN ({})",
                id_list(ids)
            ),
            [],
        )?;
        Ok(updated)
    }

    /// Total number of persisted sessions.
    pub fn session_count(&self) -> StorageResult<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row("SELECT count(*) FROM reading_sessions", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Number of unsynced sessions for one book.
    pub fn unsynced_count(&self, book_hash: &BookFileHash) -> StorageResult<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT count(*) FROM reading_sessions WHERE book_hash = ? AND NOT synced",
            params![book_hash.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Forces a WAL checkpoint so a clean exit leaves no recovery burden.
    ///
    /// DuckDB also checkpoints on its own WAL threshold; this is the explicit
    /// flush the host calls on suspend and exit.
    pub fn checkpoint(&self) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch("CHECKPOINT;")?;
        Ok(())
    }

    /// Flushes before the process exits.
    ///
    /// The connection itself closes on drop; after `close` a normal shutdown
    /// leaves no WAL to recover.
    pub fn close(&self) -> StorageResult<()> {
        self.checkpoint()?;
        debug!("session store closed");
        Ok(())
    }
}

fn id_list(ids: &[String]) -> String {
    // DuckDB quoted-literal list; ids are store-assigned uuids but escape anyway
    ids.iter()
        .map(|id| format!("'{}'", id.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(",")
}

fn row_to_session(row: &duckdb::Row<'_>) -> duckdb::Result<ReadingSession> {
    let position_type: String = row.get(8)?;
    let start_page: Option<i32> = row.get(11)?;
    let end_page: Option<i32> = row.get(12)?;
    let total_pages: Option<i32> = row.get(13)?;
    let book_hash: String = row.get(2)?;

    Ok(ReadingSession {
        id: row.get(0)?,
        book_file: row.get(1)?,
        book_hash: BookFileHash::from_stored(book_hash),
        book_title: row.get(3)?,
        book_author: row.get(4)?,
        start_time: DateTime::from_timestamp(row.get(5)?, 0).unwrap_or_default(),
        end_time: DateTime::from_timestamp(row.get(6)?, 0).unwrap_or_default(),
        duration_seconds: row.get(7)?,
        position_type: PositionType::parse(&position_type).unwrap_or(PositionType::Page),
        start_position: row.get(9)?,
        end_position: row.get(10)?,
        start_page: start_page.map(|p| p as u32),
        end_page: end_page.map(|p| p as u32),
        total_pages: total_pages.map(|p| p as u32),
        device_id: row.get(14)?,
        synced: row.get(15)?,
        sync_attempts: row.get::<_, i32>(16)? as u32,
    })
}

fn initialize_session_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS reading_sessions (
            id VARCHAR PRIMARY KEY,
            book_file VARCHAR NOT NULL,
            book_hash VARCHAR NOT NULL,
            book_title VARCHAR NOT NULL,
            book_author VARCHAR NOT NULL,
            start_time BIGINT NOT NULL,
            end_time BIGINT NOT NULL,
            duration_seconds BIGINT NOT NULL,
            position_type VARCHAR NOT NULL,
            start_position VARCHAR NOT NULL,
            end_position VARCHAR NOT NULL,
            start_page INTEGER,
            end_page INTEGER,
            total_pages INTEGER,
            device_id VARCHAR NOT NULL,
            synced BOOLEAN NOT NULL DEFAULT FALSE,
            sync_attempts INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_sessions_book ON reading_sessions(book_hash);
        CREATE INDEX IF NOT EXISTS idx_sessions_unsynced ON reading_sessions(book_hash, synced);
        "#,
    )?;
    Ok(())
}
