//! Typed HTTP client for the sync server.
//!
//! Resource-oriented calls over reqwest. Every call obtains a bearer token
//! from the [`AuthManager`] first and short-circuits without any network I/O
//! when none can be produced. Non-200 responses become retryable
//! [`SyncError::Server`] values; the one deliberate exception is a 404 on
//! book lookup, which is a normal "book absent" outcome, not a failure.

use crate::credentials::AuthManager;
use crate::error::{SyncError, SyncResult};
use crate::types::*;
use reqwest::{Client, StatusCode, multipart};
use shelfmark_types::{ClientBookId, Highlight};
use std::sync::Arc;
use tracing::debug;

/// HTTP client for the Shelfmark sync API.
pub struct ApiClient {
    http: Client,
    auth: Arc<AuthManager>,
}

impl ApiClient {
    pub fn new(config: &crate::config::SyncConfig, auth: Arc<AuthManager>) -> Self {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.http_timeout_secs))
            .build()
            .expect("failed to build HTTP client");
        Self { http, auth }
    }

    /// Fetches the server-side book record; `Ok(None)` means the book does
    /// not exist yet.
    pub async fn get_book(&self, id: &ClientBookId) -> SyncResult<Option<BookStatus>> {
        let (base, token) = self.authed().await?;
        let resp = self
            .http
            .get(format!("{base}/api/v1/ereader/books/{id}"))
            .bearer_auth(&token)
            .send()
            .await?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(resp.json().await?)),
            _ => Err(server_error(resp).await),
        }
    }

    /// Creates the server-side book record.
    pub async fn create_book(&self, book: &BookPayload) -> SyncResult<BookStatus> {
        let (base, token) = self.authed().await?;
        let resp = self
            .http
            .post(format!("{base}/api/v1/ereader/books"))
            .bearer_auth(&token)
            .json(book)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(server_error(resp).await);
        }
        Ok(resp.json().await?)
    }

    /// Uploads a highlight batch; the server deduplicates and reports counts.
    pub async fn upload_highlights(
        &self,
        book: &BookPayload,
        highlights: &[Highlight],
    ) -> SyncResult<HighlightUploadResponse> {
        let (base, token) = self.authed().await?;
        let resp = self
            .http
            .post(format!("{base}/api/v1/highlights/upload"))
            .bearer_auth(&token)
            .json(&serde_json::json!({ "book": book, "highlights": highlights }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(server_error(resp).await);
        }
        Ok(resp.json().await?)
    }

    /// Uploads the rendered cover image for a book.
    pub async fn upload_cover(&self, id: &ClientBookId, bytes: Vec<u8>) -> SyncResult<()> {
        let (base, token) = self.authed().await?;
        let size = bytes.len();
        let form = multipart::Form::new().part(
            "cover",
            multipart::Part::bytes(bytes)
                .file_name("cover.jpg")
                .mime_str("image/jpeg")?,
        );
        let resp = self
            .http
            .post(format!("{base}/api/v1/ereader/books/{id}/cover"))
            .bearer_auth(&token)
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(server_error(resp).await);
        }
        debug!("uploaded cover for {id} ({size} bytes)");
        Ok(())
    }

    /// Uploads the source document for a book.
    pub async fn upload_epub(
        &self,
        id: &ClientBookId,
        bytes: Vec<u8>,
        filename: &str,
    ) -> SyncResult<()> {
        let (base, token) = self.authed().await?;
        let size = bytes.len();
        let form = multipart::Form::new().part(
            "epub",
            multipart::Part::bytes(bytes)
                .file_name(filename.to_string())
                .mime_str("application/epub+zip")?,
        );
        let resp = self
            .http
            .post(format!("{base}/api/v1/ereader/books/{id}/epub"))
            .bearer_auth(&token)
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(server_error(resp).await);
        }
        debug!("uploaded document for {id} ({size} bytes)");
        Ok(())
    }

    /// Uploads a session batch. An empty batch still serializes as `[]`
    /// (the server schema rejects null), though the orchestrator normally
    /// skips the call entirely when there is nothing to send.
    pub async fn upload_sessions(
        &self,
        book: &BookPayload,
        sessions: &[SessionPayload],
    ) -> SyncResult<SessionUploadResponse> {
        let (base, token) = self.authed().await?;
        let resp = self
            .http
            .post(format!("{base}/api/v1/reading_sessions/upload"))
            .bearer_auth(&token)
            .json(&serde_json::json!({ "book": book, "sessions": sessions }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(server_error(resp).await);
        }
        Ok(resp.json().await?)
    }

    async fn authed(&self) -> SyncResult<(String, String)> {
        let token = self.auth.get_valid_token().await?;
        Ok((self.auth.base_url().await, token))
    }
}

async fn server_error(resp: reqwest::Response) -> SyncError {
    let status = resp.status().as_u16();
    let message = resp.text().await.unwrap_or_default();
    SyncError::Server { status, message }
}
