//! Shared helpers for sync integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use shelfmark_sync::api_client::ApiClient;
use shelfmark_sync::config::SyncConfig;
use shelfmark_sync::connectivity::NetworkController;
use shelfmark_sync::credentials::AuthManager;
use shelfmark_sync::error::{SyncError, SyncResult};
use shelfmark_sync::sources::{BookSource, InMemorySettings, SettingsStore};
use shelfmark_types::{BookData, Highlight};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("shelfmark_sync=debug")
        .with_test_writer()
        .try_init();
}

pub fn test_config(base_url: &str) -> SyncConfig {
    SyncConfig {
        api_base_url: base_url.to_string(),
        device_id: "dev-test".to_string(),
        min_session_secs: 30,
        token_refresh_margin_secs: 60,
        default_token_lifetime_secs: 3600,
        http_timeout_secs: 5,
    }
}

/// Settings with an account but no cached tokens.
pub fn settings_with_account() -> Arc<InMemorySettings> {
    let settings = Arc::new(InMemorySettings::new());
    settings.set("sync.username", "reader");
    settings.set("sync.password", "hunter2");
    settings
}

/// Settings with an account and a cached token valid far into the future,
/// so API calls produce no auth traffic.
pub fn settings_with_valid_token() -> Arc<InMemorySettings> {
    let settings = settings_with_account();
    settings.set("sync.access_token", "at-cached");
    settings.set("sync.refresh_token", "rt-cached");
    settings.set("sync.token_expires_at", "2099-01-01T00:00:00+00:00");
    settings
}

pub fn auth_with(base_url: &str, settings: Arc<InMemorySettings>) -> Arc<AuthManager> {
    let config = test_config(base_url);
    Arc::new(AuthManager::new(&config, settings as Arc<dyn SettingsStore>))
}

pub fn api_with(base_url: &str, settings: Arc<InMemorySettings>) -> Arc<ApiClient> {
    let config = test_config(base_url);
    let auth = auth_with(base_url, settings);
    Arc::new(ApiClient::new(&config, auth))
}

pub fn token_grant_body() -> serde_json::Value {
    serde_json::json!({
        "access_token": "at-new",
        "refresh_token": "rt-new",
        "expires_in": 3600
    })
}

pub fn dune() -> BookData {
    BookData {
        title: "Dune".into(),
        author: "Frank Herbert".into(),
        isbn: Some("978-0441013593".into()),
        description: None,
        language: Some("en".into()),
        page_count: Some(412),
        keywords: None,
    }
}

pub fn highlight(text: &str, page: u32) -> Highlight {
    Highlight {
        text: text.into(),
        note: None,
        datetime: Utc.with_ymd_and_hms(2026, 3, 1, 20, 15, 0).unwrap(),
        page,
        chapter: None,
    }
}

/// A fixed book source for tests.
pub struct StaticBookSource {
    pub data: Option<BookData>,
    pub path: Option<PathBuf>,
    pub highlights: Vec<Highlight>,
    pub cover: Option<Vec<u8>>,
}

impl StaticBookSource {
    pub fn empty() -> Self {
        Self {
            data: None,
            path: None,
            highlights: Vec::new(),
            cover: None,
        }
    }
}

impl BookSource for StaticBookSource {
    fn book_data(&self) -> Option<BookData> {
        self.data.clone()
    }

    fn doc_path(&self) -> Option<PathBuf> {
        self.path.clone()
    }

    fn highlights(&self) -> Vec<Highlight> {
        self.highlights.clone()
    }

    fn cover_bytes(&self) -> Option<Vec<u8>> {
        self.cover.clone()
    }
}

/// Scriptable connectivity primitives.
pub struct FakeNetwork {
    online: AtomicBool,
    can_connect: bool,
    bring_up_calls: AtomicUsize,
    take_down_calls: AtomicUsize,
}

impl FakeNetwork {
    pub fn online() -> Self {
        Self::new(true, true)
    }

    pub fn offline() -> Self {
        Self::new(false, true)
    }

    pub fn unreachable() -> Self {
        Self::new(false, false)
    }

    fn new(online: bool, can_connect: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
            can_connect,
            bring_up_calls: AtomicUsize::new(0),
            take_down_calls: AtomicUsize::new(0),
        }
    }

    pub fn is_up(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn bring_up_calls(&self) -> usize {
        self.bring_up_calls.load(Ordering::SeqCst)
    }

    pub fn take_down_calls(&self) -> usize {
        self.take_down_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NetworkController for FakeNetwork {
    async fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    async fn bring_online(&self) -> SyncResult<()> {
        self.bring_up_calls.fetch_add(1, Ordering::SeqCst);
        if self.can_connect {
            self.online.store(true, Ordering::SeqCst);
            Ok(())
        } else {
            Err(SyncError::NetworkUnavailable("no access point".into()))
        }
    }

    async fn take_offline(&self) {
        self.take_down_calls.fetch_add(1, Ordering::SeqCst);
        self.online.store(false, Ordering::SeqCst);
    }
}
