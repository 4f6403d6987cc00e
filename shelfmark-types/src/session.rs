//! Reading-session records.

use crate::book::BookFileHash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a position inside a document is expressed.
///
/// Fixed-layout documents report page numbers; reflowable documents report an
/// anchor (xpointer-like) locator string instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionType {
    Page,
    Anchor,
}

impl PositionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionType::Page => "page",
            PositionType::Anchor => "anchor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "page" => Some(PositionType::Page),
            "anchor" => Some(PositionType::Anchor),
            _ => None,
        }
    }
}

/// A finalized reading session, not yet persisted.
///
/// The store assigns the row id on insert; `synced` starts false and
/// `sync_attempts` at zero, so neither appears here.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionDraft {
    pub book_file: String,
    pub book_hash: BookFileHash,
    pub book_title: String,
    pub book_author: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: i64,
    pub position_type: PositionType,
    pub start_position: String,
    pub end_position: String,
    pub start_page: Option<u32>,
    pub end_page: Option<u32>,
    pub total_pages: Option<u32>,
    pub device_id: String,
}

/// A persisted reading session as read back from the store.
///
/// Rows are owned exclusively by the session store; consumers read unsynced
/// rows and instruct bulk marking, never mutate fields directly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadingSession {
    pub id: String,
    pub book_file: String,
    pub book_hash: BookFileHash,
    pub book_title: String,
    pub book_author: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: i64,
    pub position_type: PositionType,
    pub start_position: String,
    pub end_position: String,
    pub start_page: Option<u32>,
    pub end_page: Option<u32>,
    pub total_pages: Option<u32>,
    pub device_id: String,
    pub synced: bool,
    pub sync_attempts: u32,
}
