//! Book metadata, highlights, and the two book-identity hashes.
//!
//! A book is addressed two different ways and the two must never be mixed:
//! [`ClientBookId`] (title+author) identifies the book row on the server and
//! is stable across devices; [`BookFileHash`] (absolute file path) partitions
//! local session storage and is meaningless anywhere but this install. They
//! are separate newtypes so a call site cannot pass one where the other is
//! expected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

/// Bibliographic metadata extracted from the reading application.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookData {
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

impl BookData {
    pub fn client_book_id(&self) -> ClientBookId {
        ClientBookId::from_title_author(&self.title, &self.author)
    }
}

/// A highlight (annotation) extracted from the reading application.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub datetime: DateTime<Utc>,
    pub page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
}

/// Device-independent book identity: sha256 of normalized title + author.
///
/// Addresses the book record on the server. Normalization (trim + lowercase)
/// keeps the id stable across installs that disagree on metadata casing.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientBookId(String);

impl ClientBookId {
    pub fn from_title_author(title: &str, author: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(title.trim().to_lowercase().as_bytes());
        // Separator prevents ("ab", "c") colliding with ("a", "bc")
        hasher.update([0x1f]);
        hasher.update(author.trim().to_lowercase().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientBookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Device-local book identity: sha256 of the absolute file path.
///
/// Partitions the session store. Not portable across devices and never sent
/// to the server as a book identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookFileHash(String);

impl BookFileHash {
    pub fn from_path(path: &Path) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(path.to_string_lossy().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Rehydrates a hash previously read back from storage.
    pub fn from_stored(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookFileHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
