//! Sync engine for Shelfmark.
//!
//! Mirrors locally generated reading artifacts to a remote server, tolerating
//! intermittent connectivity, credential expiry, and partial failure:
//! - Token-lifecycle authentication (cache → refresh → login)
//! - Typed API client over reqwest
//! - Orchestrated upload of book record, files, highlights, and sessions
//!   with all-or-nothing session acknowledgement
//! - Connectivity gating that releases only network paths it opened

pub mod agent;
pub mod api_client;
pub mod config;
pub mod connectivity;
pub mod credentials;
pub mod error;
pub mod orchestrator;
pub mod sources;
pub mod types;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use types::*;
