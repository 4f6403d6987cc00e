//! Sync agent configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the sync agent.
///
/// Loaded at startup and injected into components via constructors; nothing
/// reads it through a global.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Base URL of the sync server (e.g., "https://api.shelfmark.app").
    /// A per-account override in settings takes precedence.
    pub api_base_url: String,

    /// Stable identifier for this install, stamped on every session row.
    pub device_id: String,

    /// Sessions shorter than this are discarded, never persisted.
    pub min_session_secs: i64,

    /// Cached tokens are reused only while they remain valid at least this
    /// long; inside the margin the agent refreshes instead.
    pub token_refresh_margin_secs: i64,

    /// Fallback token lifetime when the server omits `expires_in`.
    pub default_token_lifetime_secs: i64,

    /// Request timeout baked into the HTTP client. A timed-out request is a
    /// retryable network error, not a fatal one.
    pub http_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.shelfmark.app".to_string(),
            device_id: uuid::Uuid::new_v4().to_string(),
            min_session_secs: 30,
            token_refresh_margin_secs: 60,
            default_token_lifetime_secs: 3600,
            http_timeout_secs: 30,
        }
    }
}
