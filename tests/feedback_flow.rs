use chrono::{TimeZone, Utc};
use pose_review::config::FeedbackConfig;
use pose_review::feedback::{
    fetch_latest_feedback, show_feedback, Document, FeedbackError, MemoryStore, StoreFeedback, NO_FEEDBACK,
};
use pose_review::status::{RecordingStatus, StatusEntry};

#[test]
fn empty_collection_yields_fallback_text() {
    let store = MemoryStore::new();
    let content = fetch_latest_feedback(&store, &FeedbackConfig::default()).unwrap();
    assert_eq!(content, "Nessun feedback disponibile.");
    assert_eq!(content, NO_FEEDBACK);
}

#[test]
fn newest_document_wins() {
    let mut store = MemoryStore::new();
    let t1 = Utc.with_ymd_and_hms(2024, 9, 1, 8, 0, 0).unwrap();
    let t2 = Utc.with_ymd_and_hms(2024, 9, 1, 9, 30, 0).unwrap();
    store.insert_feedback("feedback", t2, "Ginocchia allineate, bene");
    store.insert_feedback("feedback", t1, "Scendi più lentamente");

    let content = fetch_latest_feedback(&store, &FeedbackConfig::default()).unwrap();
    assert_eq!(content, "Ginocchia allineate, bene");
}

#[test]
fn missing_content_field_is_read_error() {
    let mut store = MemoryStore::new();
    store.insert(
        "feedback",
        Document::new("feedback/broken").with_field("timestamp", "2024-09-01T10:00:00Z"),
    );

    let err = fetch_latest_feedback(&store, &FeedbackConfig::default()).unwrap_err();
    assert!(matches!(err, FeedbackError::Read(_)));
    assert!(err.to_string().starts_with("Errore nella scrittura del feedback"));
}

#[test]
fn custom_collection_from_config() {
    let mut store = MemoryStore::new();
    let t = Utc.with_ymd_and_hms(2024, 9, 1, 8, 0, 0).unwrap();
    store.insert_feedback("coach_notes", t, "Spalle rilassate");

    let config = FeedbackConfig {
        collection: "coach_notes".to_string(),
        ..FeedbackConfig::default()
    };
    assert_eq!(fetch_latest_feedback(&store, &config).unwrap(), "Spalle rilassate");
}

#[test]
fn shown_in_read_only_text_area() {
    let mut store = MemoryStore::new();
    let t = Utc.with_ymd_and_hms(2024, 9, 2, 12, 0, 0).unwrap();
    store.insert_feedback("feedback", t, "Ottima esecuzione");
    let source = StoreFeedback {
        store: &store,
        config: FeedbackConfig::default(),
    };
    let mut status = RecordingStatus::default();

    let shown = show_feedback(&source, &mut status);

    assert_eq!(shown.as_deref(), Some("Ottima esecuzione"));
    assert_eq!(
        status.entries,
        vec![StatusEntry::TextArea {
            label: "Feedback".to_string(),
            value: "Ottima esecuzione".to_string(),
        }]
    );
}
