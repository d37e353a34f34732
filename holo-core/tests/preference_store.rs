//! Connector-backed preference store against SQLite and the in-memory
//! vector index.

use holo_connect::config::{ConnectorName, ConnectorSpec, ConnectorsConfig};
use holo_connect::connector::{InMemoryVectorIndex, RelationalConnector, SqliteConnector};
use holo_core::{
    Bookmark, ConnectorPreferenceStore, Orchestrator, OrchestratorConfig, PreferenceStore,
    SessionId, StoreError, UserPreferences,
};
use serde_json::json;
use std::sync::Arc;

fn store() -> (Arc<SqliteConnector>, ConnectorPreferenceStore) {
    let db = Arc::new(SqliteConnector::new("relationalStore", "sqlite::memory:"));
    let index = Arc::new(InMemoryVectorIndex::new("vectorDB", "sessions", 64));
    let store = ConnectorPreferenceStore::new(db.clone(), Some(index), 64);
    (db, store)
}

#[tokio::test]
async fn test_defaults_for_unknown_user() {
    let (_, store) = store();
    let prefs = store.get_preferences("nobody").await.unwrap();
    assert_eq!(prefs, UserPreferences::default());
}

#[tokio::test]
async fn test_preferences_persist() {
    let (_, store) = store();
    let prefs = UserPreferences {
        reading_speed: 1.5,
        voice_preset: "soothing".to_string(),
        haptics_enabled: false,
        scent_enabled: true,
        language: "fr".to_string(),
        bookmarks: Vec::new(),
    };

    let echoed = store.set_preferences("u1", prefs.clone()).await.unwrap();
    assert_eq!(echoed, prefs);

    // upsert replaces the row
    let faster = UserPreferences {
        reading_speed: 2.0,
        ..prefs
    };
    store.set_preferences("u1", faster.clone()).await.unwrap();
    assert_eq!(store.get_preferences("u1").await.unwrap(), faster);
}

#[tokio::test]
async fn test_bookmarks_persist() {
    let (_, store) = store();
    let session = SessionId::new();
    let first = Bookmark::new(1, "the letter").with_session(session);
    let second = Bookmark::new(4, "homecoming");

    assert_eq!(store.save_bookmark("u1", first.clone()).await.unwrap(), first.id);
    store.save_bookmark("u1", second.clone()).await.unwrap();
    store.save_bookmark("u2", Bookmark::new(0, "other")).await.unwrap();

    let prefs = store.get_preferences("u1").await.unwrap();
    assert_eq!(prefs.bookmarks.len(), 2);
    assert!(prefs.bookmarks.contains(&first));
    assert!(prefs.bookmarks.contains(&second));
}

#[tokio::test]
async fn test_search_is_filtered_by_user() {
    let (_, store) = store();
    let mine = SessionId::new();
    let theirs = SessionId::new();
    store
        .record_session("u1", mine, "The lighthouse keeper watched the storm.")
        .await
        .unwrap();
    store
        .record_session("u2", theirs, "The lighthouse keeper watched the storm.")
        .await
        .unwrap();

    let hits = store.search_sessions("u1", "lighthouse storm").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].session_id, mine.to_string());
    assert!(hits[0].relevance_score > 0.0);
    assert!(hits[0].content_snippet.starts_with("The lighthouse"));
}

#[tokio::test]
async fn test_search_without_vector_connector() {
    let db = Arc::new(SqliteConnector::new("relationalStore", "sqlite::memory:"));
    let store = ConnectorPreferenceStore::new(db, None, 64);
    store
        .record_session("u1", SessionId::new(), "anything")
        .await
        .unwrap();
    assert!(store.search_sessions("u1", "anything").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_row_is_decode_error() {
    let (db, store) = store();
    store.ensure_schema().await.unwrap();
    db.execute(
        "INSERT INTO user_preferences VALUES (?, ?, ?, ?, ?, ?)",
        &[
            json!("u1"),
            json!("fast"),
            json!("normal"),
            json!(1),
            json!(1),
            json!("en"),
        ],
    )
    .await
    .unwrap();

    let err = store.get_preferences("u1").await.unwrap_err();
    assert!(matches!(err, StoreError::Decode { .. }));
}

#[tokio::test]
async fn test_orchestrator_records_played_sessions() {
    let config = OrchestratorConfig::new(
        ConnectorsConfig::new()
            .with_connector(
                ConnectorName::RelationalStore,
                ConnectorSpec::relational("sqlite::memory:"),
            )
            .with_connector(ConnectorName::VectorDb, ConnectorSpec::vector("sessions")),
    );
    let orchestrator = Orchestrator::new(config).unwrap();

    let session = SessionId::new();
    let response = orchestrator
        .play(session, "The caravan crossed the desert at dawn.", "u1")
        .await;
    assert!(response.is_started());

    let hits = orchestrator
        .preferences()
        .search_sessions("u1", "caravan desert")
        .await
        .unwrap();
    assert_eq!(hits[0].session_id, session.to_string());

    orchestrator.shutdown().await;
}
