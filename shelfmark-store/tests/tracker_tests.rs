use chrono::Duration;
use pretty_assertions::assert_eq;
use shelfmark_store::{BookOpen, EndReason, SessionStore, SessionTracker};
use shelfmark_types::{BookFileHash, PositionType};
use std::path::Path;

fn open_book(path: &str) -> BookOpen {
    BookOpen {
        book_file: path.to_string(),
        book_title: "Dune".into(),
        book_author: "Frank Herbert".into(),
        position_type: PositionType::Page,
        position: "1".into(),
        page: Some(1),
        total_pages: Some(412),
    }
}

fn tracker_with_minimum(store: &SessionStore, min_secs: i64) -> SessionTracker {
    SessionTracker::new(store.clone(), "dev-1".into(), min_secs)
}

// ── Duration filter ──

#[test]
fn sessions_below_minimum_are_never_persisted() {
    let store = SessionStore::open_in_memory().unwrap();
    let mut tracker = tracker_with_minimum(&store, 60);

    // Three sessions of 10s, 90s, 120s with a 60s minimum
    for secs in [10i64, 90, 120] {
        tracker.start_session(open_book("/books/dune.epub"));
        let started = tracker.active_started_at().unwrap();
        let id = tracker
            .end_session_at(EndReason::Manual, started + Duration::seconds(secs))
            .unwrap();
        assert_eq!(id.is_some(), secs >= 60);
    }

    assert_eq!(store.session_count().unwrap(), 2);
}

#[test]
fn discarded_session_clears_active_state() {
    let store = SessionStore::open_in_memory().unwrap();
    let mut tracker = tracker_with_minimum(&store, 60);

    tracker.start_session(open_book("/books/dune.epub"));
    let started = tracker.active_started_at().unwrap();
    tracker
        .end_session_at(EndReason::Manual, started + Duration::seconds(5))
        .unwrap();

    assert!(!tracker.is_active());
    assert_eq!(store.session_count().unwrap(), 0);
}

#[test]
fn end_before_start_counts_as_zero_duration() {
    let store = SessionStore::open_in_memory().unwrap();
    let mut tracker = tracker_with_minimum(&store, 60);

    tracker.start_session(open_book("/books/dune.epub"));
    let started = tracker.active_started_at().unwrap();
    // Clock skew: ended "before" it started is discarded, not an error
    let id = tracker
        .end_session_at(EndReason::Manual, started - Duration::seconds(30))
        .unwrap();
    assert_eq!(id, None);
    assert_eq!(store.session_count().unwrap(), 0);
}

// ── State machine ──

#[test]
fn end_without_active_session_is_noop() {
    let store = SessionStore::open_in_memory().unwrap();
    let mut tracker = tracker_with_minimum(&store, 60);
    assert_eq!(tracker.end_session(EndReason::Manual).unwrap(), None);
    assert_eq!(store.session_count().unwrap(), 0);
}

#[test]
fn starting_over_an_active_session_ends_it_first() {
    let store = SessionStore::open_in_memory().unwrap();
    // Zero minimum so the auto-ended session persists
    let mut tracker = tracker_with_minimum(&store, 0);

    tracker.start_session(open_book("/books/dune.epub"));
    tracker.start_session(open_book("/books/hyperion.epub"));

    // Previous session persisted, new one active, never two at once
    assert_eq!(store.session_count().unwrap(), 1);
    assert!(tracker.is_active());

    let dune = BookFileHash::from_path(Path::new("/books/dune.epub"));
    assert_eq!(store.unsynced_count(&dune).unwrap(), 1);
}

#[test]
fn update_position_touches_no_storage() {
    let store = SessionStore::open_in_memory().unwrap();
    let mut tracker = tracker_with_minimum(&store, 0);

    tracker.start_session(open_book("/books/dune.epub"));
    for page in 2..50 {
        tracker.update_position(&page.to_string(), Some(page));
    }
    assert_eq!(store.session_count().unwrap(), 0);

    let started = tracker.active_started_at().unwrap();
    tracker
        .end_session_at(EndReason::DocumentClose, started + Duration::seconds(300))
        .unwrap();

    let hash = BookFileHash::from_path(Path::new("/books/dune.epub"));
    let row = &store.unsynced_for_book(&hash).unwrap()[0];
    // Final position captured at end, start position untouched
    assert_eq!(row.start_position, "1");
    assert_eq!(row.end_position, "49");
    assert_eq!(row.end_page, Some(49));
}

#[test]
fn persisted_session_carries_device_and_duration() {
    let store = SessionStore::open_in_memory().unwrap();
    let mut tracker = tracker_with_minimum(&store, 60);

    tracker.start_session(open_book("/books/dune.epub"));
    let started = tracker.active_started_at().unwrap();
    tracker
        .end_session_at(EndReason::Suspend, started + Duration::seconds(240))
        .unwrap();

    let hash = BookFileHash::from_path(Path::new("/books/dune.epub"));
    let row = &store.unsynced_for_book(&hash).unwrap()[0];
    assert_eq!(row.device_id, "dev-1");
    assert_eq!(row.duration_seconds, 240);
    assert_eq!(row.end_time - row.start_time, Duration::seconds(240));
}
