//! Wire types and per-run results.

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use shelfmark_types::{BookData, ReadingSession};

/// Token grant from login or refresh.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires; servers may omit it.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Book record as sent to the server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BookPayload {
    pub client_book_id: String,
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
}

impl BookPayload {
    pub fn from_data(data: &BookData) -> Self {
        Self {
            client_book_id: data.client_book_id().to_string(),
            title: data.title.clone(),
            author: data.author.clone(),
            isbn: data.isbn.clone(),
            description: data.description.clone(),
            language: data.language.clone(),
            page_count: data.page_count,
            keywords: data.keywords.clone(),
        }
    }
}

/// Server-side view of a book record.
///
/// The lookup endpoint reports which assets the server already holds so the
/// agent can skip redundant file uploads.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BookStatus {
    #[serde(default)]
    pub has_cover: bool,
    #[serde(default)]
    pub has_epub: bool,
}

/// Result of a highlight batch upload; the server deduplicates.
#[derive(Clone, Debug, Deserialize)]
pub struct HighlightUploadResponse {
    #[serde(default)]
    pub book_id: i64,
    #[serde(default)]
    pub highlights_created: u32,
    #[serde(default)]
    pub highlights_skipped: u32,
}

/// Result of a session batch upload.
#[derive(Clone, Debug, Deserialize)]
pub struct SessionUploadResponse {
    #[serde(default)]
    pub book_id: i64,
}

/// A reading session as sent to the server.
///
/// Timestamps are UTC ISO-8601 strings, formatted explicitly rather than
/// relying on serializer defaults; the server schema is strict about them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionPayload {
    pub start_time: String,
    pub end_time: String,
    pub duration_seconds: i64,
    pub position_type: String,
    pub start_position: String,
    pub end_position: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
    pub device_id: String,
}

impl From<&ReadingSession> for SessionPayload {
    fn from(s: &ReadingSession) -> Self {
        Self {
            start_time: s.start_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            end_time: s.end_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            duration_seconds: s.duration_seconds,
            position_type: s.position_type.as_str().to_string(),
            start_position: s.start_position.clone(),
            end_position: s.end_position.clone(),
            start_page: s.start_page,
            end_page: s.end_page,
            total_pages: s.total_pages,
            device_id: s.device_id.clone(),
        }
    }
}

/// Whether a run was asked for by the user or fired by a lifecycle trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncMode {
    /// User-initiated; the report carries a distinguishable error message.
    Manual,
    /// Lifecycle-triggered; failures are logged, not surfaced.
    Autonomous,
}

/// Aggregate outcome of one orchestration run. Ephemeral, never persisted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub success: bool,
    pub highlights_created: u32,
    pub highlights_skipped: u32,
    pub sessions_synced: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncReport {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn failed(error: Option<String>) -> Self {
        Self {
            success: false,
            error,
            ..Self::default()
        }
    }
}
