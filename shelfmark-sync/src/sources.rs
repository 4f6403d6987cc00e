//! Collaborator interfaces supplied by the host reading application.
//!
//! Metadata and highlight extraction, cover rendering, and settings
//! persistence all live outside this crate; the sync engine consumes them
//! through these traits.

use shelfmark_types::{BookData, Highlight};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Read access to the currently open book.
pub trait BookSource: Send + Sync {
    /// Bibliographic metadata, or `None` when no document is open.
    fn book_data(&self) -> Option<BookData>;

    /// Absolute path of the open document on this device.
    fn doc_path(&self) -> Option<PathBuf>;

    /// Highlights extracted from the document state. Empty when none exist.
    fn highlights(&self) -> Vec<Highlight>;

    /// Rendered cover image bytes, when the host can produce one.
    fn cover_bytes(&self) -> Option<Vec<u8>>;
}

/// Key-value contract of the host's persisted settings.
///
/// Only the contract is consumed here; storage mechanics belong to the host.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory settings, for tests and hosts without persistence.
#[derive(Default)]
pub struct InMemorySettings {
    values: Mutex<HashMap<String, String>>,
}

impl InMemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for InMemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values.lock().unwrap().remove(key);
    }
}
