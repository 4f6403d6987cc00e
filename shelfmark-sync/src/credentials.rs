//! Credential storage and token lifecycle.
//!
//! One component owns every token mutation: tokens are cached here, mirrored
//! to the host's settings store, and nothing else in the crate holds a copy.
//! Token acquisition follows a fixed priority (cached token while it is
//! still comfortably valid, then refresh, then full login) which keeps both
//! login frequency and password transmission at a minimum.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::sources::SettingsStore;
use crate::types::TokenResponse;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

const KEY_BASE_URL: &str = "sync.base_url";
const KEY_USERNAME: &str = "sync.username";
const KEY_PASSWORD: &str = "sync.password";
const KEY_ACCESS_TOKEN: &str = "sync.access_token";
const KEY_REFRESH_TOKEN: &str = "sync.refresh_token";
const KEY_TOKEN_EXPIRES_AT: &str = "sync.token_expires_at";

/// Account credentials plus the cached token state.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Loads credentials from settings, falling back to the configured base URL.
    pub fn load(settings: &dyn SettingsStore, default_base_url: &str) -> Self {
        Self {
            base_url: settings
                .get(KEY_BASE_URL)
                .unwrap_or_else(|| default_base_url.to_string()),
            username: settings.get(KEY_USERNAME).unwrap_or_default(),
            password: settings.get(KEY_PASSWORD).unwrap_or_default(),
            access_token: settings.get(KEY_ACCESS_TOKEN),
            refresh_token: settings.get(KEY_REFRESH_TOKEN),
            token_expires_at: settings
                .get(KEY_TOKEN_EXPIRES_AT)
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|t| t.with_timezone(&Utc)),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    /// True while the cached token stays valid for at least `margin_secs`.
    pub fn token_valid_for(&self, margin_secs: i64) -> bool {
        match (&self.access_token, self.token_expires_at) {
            (Some(_), Some(expires_at)) => Utc::now() + Duration::seconds(margin_secs) < expires_at,
            _ => false,
        }
    }
}

/// Produces a currently-valid bearer token, logging in or refreshing as needed.
pub struct AuthManager {
    http: Client,
    settings: Arc<dyn SettingsStore>,
    creds: RwLock<Credentials>,
    refresh_margin_secs: i64,
    default_token_lifetime_secs: i64,
    /// Serializes refresh/login so concurrent callers cannot race a rotation.
    refresh_lock: tokio::sync::Mutex<()>,
}

impl AuthManager {
    pub fn new(config: &SyncConfig, settings: Arc<dyn SettingsStore>) -> Self {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.http_timeout_secs))
            .build()
            .expect("failed to build HTTP client");
        let creds = Credentials::load(settings.as_ref(), &config.api_base_url);

        Self {
            http,
            settings,
            creds: RwLock::new(creds),
            refresh_margin_secs: config.token_refresh_margin_secs,
            default_token_lifetime_secs: config.default_token_lifetime_secs,
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub async fn base_url(&self) -> String {
        self.creds.read().await.base_url.clone()
    }

    pub async fn is_configured(&self) -> bool {
        self.creds.read().await.is_configured()
    }

    /// Replaces the stored account, dropping tokens issued for the old one.
    pub async fn set_account(&self, username: &str, password: &str, base_url: Option<&str>) {
        {
            let mut creds = self.creds.write().await;
            creds.username = username.to_string();
            creds.password = password.to_string();
            if let Some(url) = base_url {
                creds.base_url = url.to_string();
                self.settings.set(KEY_BASE_URL, url);
            }
            creds.access_token = None;
            creds.refresh_token = None;
            creds.token_expires_at = None;
        }
        self.settings.set(KEY_USERNAME, username);
        self.settings.set(KEY_PASSWORD, password);
        self.settings.remove(KEY_ACCESS_TOKEN);
        self.settings.remove(KEY_REFRESH_TOKEN);
        self.settings.remove(KEY_TOKEN_EXPIRES_AT);
    }

    /// Returns a currently-valid bearer token: cached → refresh → login.
    ///
    /// The cached token is reused without any network I/O while it stays
    /// valid past the refresh margin.
    pub async fn get_valid_token(&self) -> SyncResult<String> {
        {
            let creds = self.creds.read().await;
            if creds.token_valid_for(self.refresh_margin_secs) {
                if let Some(token) = creds.access_token.clone() {
                    return Ok(token);
                }
            }
        }

        let _guard = self.refresh_lock.lock().await;

        // Re-check: a concurrent caller may have renewed while we waited.
        {
            let creds = self.creds.read().await;
            if creds.token_valid_for(self.refresh_margin_secs) {
                if let Some(token) = creds.access_token.clone() {
                    return Ok(token);
                }
            }
        }

        let has_refresh_token = self.creds.read().await.refresh_token.is_some();
        if has_refresh_token {
            match self.refresh().await {
                Ok(token) => return Ok(token),
                Err(e) => debug!("token refresh failed, falling back to login: {e}"),
            }
        }

        self.login().await
    }

    /// Full login with the stored username/password.
    ///
    /// On rejection the stored credentials are left untouched.
    pub async fn login(&self) -> SyncResult<String> {
        let (base_url, username, password) = {
            let creds = self.creds.read().await;
            if !creds.is_configured() {
                return Err(SyncError::NotConfigured);
            }
            (
                creds.base_url.clone(),
                creds.username.clone(),
                creds.password.clone(),
            )
        };

        let resp = self
            .http
            .post(format!("{base_url}/api/v1/auth/login"))
            .form(&[("username", username.as_str()), ("password", password.as_str())])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(SyncError::AuthFailed(format!(
                "login failed: {}",
                resp.status().as_u16()
            )));
        }

        let grant: TokenResponse = resp
            .json()
            .await
            .map_err(|e| SyncError::AuthFailed(format!("malformed login response: {e}")))?;

        debug!("logged in as {username}");
        Ok(self.store_grant(grant).await)
    }

    /// Exchanges the refresh token for a new grant.
    ///
    /// Any failure, rejection or transport, clears both tokens so the next
    /// attempt goes through a full login instead of retrying a dead token.
    pub async fn refresh(&self) -> SyncResult<String> {
        let (base_url, refresh_token) = {
            let creds = self.creds.read().await;
            let token = creds
                .refresh_token
                .clone()
                .ok_or_else(|| SyncError::AuthFailed("no refresh token".to_string()))?;
            (creds.base_url.clone(), token)
        };

        let resp = self
            .http
            .post(format!("{base_url}/api/v1/auth/refresh"))
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await;

        let resp = match resp {
            Ok(r) => r,
            Err(e) => {
                warn!("token refresh transport failure: {e}");
                self.clear_tokens().await;
                return Err(SyncError::Network(e));
            }
        };

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            self.clear_tokens().await;
            return Err(SyncError::AuthFailed(format!(
                "token refresh rejected: {status}"
            )));
        }

        let grant: TokenResponse = match resp.json().await {
            Ok(g) => g,
            Err(e) => {
                self.clear_tokens().await;
                return Err(SyncError::AuthFailed(format!(
                    "malformed refresh response: {e}"
                )));
            }
        };

        debug!("access token refreshed");
        Ok(self.store_grant(grant).await)
    }

    /// Persists a token grant, returning the new access token.
    async fn store_grant(&self, grant: TokenResponse) -> String {
        let lifetime = grant.expires_in.unwrap_or(self.default_token_lifetime_secs);
        let expires_at = Utc::now() + Duration::seconds(lifetime);

        let mut creds = self.creds.write().await;
        creds.access_token = Some(grant.access_token.clone());
        creds.token_expires_at = Some(expires_at);
        // A grant without a rotated refresh token keeps the old one.
        if let Some(refresh) = grant.refresh_token {
            creds.refresh_token = Some(refresh.clone());
            self.settings.set(KEY_REFRESH_TOKEN, &refresh);
        }
        self.settings.set(KEY_ACCESS_TOKEN, &grant.access_token);
        self.settings
            .set(KEY_TOKEN_EXPIRES_AT, &expires_at.to_rfc3339());

        grant.access_token
    }

    /// Drops the cached access and refresh tokens together.
    async fn clear_tokens(&self) {
        let mut creds = self.creds.write().await;
        creds.access_token = None;
        creds.refresh_token = None;
        creds.token_expires_at = None;
        self.settings.remove(KEY_ACCESS_TOKEN);
        self.settings.remove(KEY_REFRESH_TOKEN);
        self.settings.remove(KEY_TOKEN_EXPIRES_AT);
    }

    /// Snapshot of the current credential state (for status display).
    pub async fn credentials(&self) -> Credentials {
        self.creds.read().await.clone()
    }
}
