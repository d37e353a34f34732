//! Per-user playback preferences, bookmarks and session search.
//!
//! Two stores implement [`PreferenceStore`]:
//!
//! - [`InMemoryPreferenceStore`] keeps everything in process memory and is
//!   used when no relational connector is configured.
//! - [`ConnectorPreferenceStore`] persists preferences and bookmarks through
//!   the `relationalStore` connector and indexes played sessions in the
//!   `vectorDB` connector for similarity search.
//!
//! Session search embeds text as a hashed bag of words, so both stores rank
//! identical inputs identically.

use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use holo_connect::connector::{RelationalConnector, Row, VectorConnector, VectorRecord};
use holo_connect::connector::vector::cosine_similarity;
use holo_connect::id::{BookmarkId, SessionId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::debug;

/// Default number of hits returned by a session search
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

const SNIPPET_CHARS: usize = 100;

/// Playback preferences for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    /// Playback rate multiplier
    pub reading_speed: f64,
    pub voice_preset: String,
    pub haptics_enabled: bool,
    pub scent_enabled: bool,
    pub language: String,
    /// Saved bookmarks; maintained through `save_bookmark`
    pub bookmarks: Vec<Bookmark>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            reading_speed: 1.0,
            voice_preset: "normal".to_string(),
            haptics_enabled: true,
            scent_enabled: true,
            language: "en".to_string(),
            bookmarks: Vec::new(),
        }
    }
}

/// A saved position in a playback session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: BookmarkId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    pub segment_index: usize,
    #[serde(default)]
    pub label: String,
    pub created_at: DateTime<Utc>,
}

impl Bookmark {
    /// Create a bookmark at `segment_index` with a fresh id
    pub fn new(segment_index: usize, label: impl Into<String>) -> Self {
        Self {
            id: BookmarkId::new(),
            session_id: None,
            segment_index,
            label: label.into(),
            created_at: Utc::now(),
        }
    }

    /// Tie the bookmark to a playback session
    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }
}

/// One result of a session search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHit {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub content_snippet: String,
    pub relevance_score: f32,
}

/// Persistence and search for user preferences
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Preferences for `user_id`, or the defaults if none were saved
    async fn get_preferences(&self, user_id: &str) -> StoreResult<UserPreferences>;

    /// Replace the preferences of `user_id`; returns what is now stored
    async fn set_preferences(
        &self,
        user_id: &str,
        preferences: UserPreferences,
    ) -> StoreResult<UserPreferences>;

    /// Past sessions of `user_id` ranked by similarity to `query`
    async fn search_sessions(&self, user_id: &str, query: &str) -> StoreResult<Vec<SessionHit>>;

    /// Save a bookmark for `user_id`
    async fn save_bookmark(&self, user_id: &str, bookmark: Bookmark) -> StoreResult<BookmarkId>;

    /// Index a played session so it can be found by `search_sessions`
    async fn record_session(
        &self,
        user_id: &str,
        session_id: SessionId,
        text: &str,
    ) -> StoreResult<()> {
        let _ = (user_id, session_id, text);
        Ok(())
    }
}

/// Embed `text` as an L2-normalized hashed bag of words
pub fn embed_text(text: &str, dimension: usize) -> Vec<f32> {
    let mut values = vec![0.0f32; dimension];
    if dimension == 0 {
        return values;
    }
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let bucket = (fnv1a(&token.to_lowercase()) % dimension as u64) as usize;
        values[bucket] += 1.0;
    }
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        values.iter_mut().for_each(|v| *v /= norm);
    }
    values
}

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(0xcbf29ce484222325, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x100000001b3)
    })
}

fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(SNIPPET_CHARS) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

fn rank(hits: &mut Vec<SessionHit>) {
    hits.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.timestamp.cmp(&a.timestamp))
    });
    hits.truncate(DEFAULT_SEARCH_LIMIT);
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Clone)]
struct RecordedSession {
    user_id: String,
    session_id: SessionId,
    played_at: DateTime<Utc>,
    snippet: String,
    embedding: Vec<f32>,
}

/// Process-local preference store
#[derive(Debug)]
pub struct InMemoryPreferenceStore {
    dimension: usize,
    preferences: RwLock<HashMap<String, UserPreferences>>,
    bookmarks: RwLock<HashMap<String, Vec<Bookmark>>>,
    sessions: RwLock<Vec<RecordedSession>>,
}

impl Default for InMemoryPreferenceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self {
            dimension: 64,
            preferences: RwLock::new(HashMap::new()),
            bookmarks: RwLock::new(HashMap::new()),
            sessions: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PreferenceStore for InMemoryPreferenceStore {
    async fn get_preferences(&self, user_id: &str) -> StoreResult<UserPreferences> {
        let mut prefs = self
            .preferences
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default();
        prefs.bookmarks = self
            .bookmarks
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default();
        Ok(prefs)
    }

    async fn set_preferences(
        &self,
        user_id: &str,
        mut preferences: UserPreferences,
    ) -> StoreResult<UserPreferences> {
        preferences.bookmarks.clear();
        self.preferences
            .write()
            .await
            .insert(user_id.to_string(), preferences);
        self.get_preferences(user_id).await
    }

    async fn search_sessions(&self, user_id: &str, query: &str) -> StoreResult<Vec<SessionHit>> {
        let query_vec = embed_text(query, self.dimension);
        let mut hits: Vec<SessionHit> = self
            .sessions
            .read()
            .await
            .iter()
            .filter(|s| s.user_id == user_id)
            .map(|s| SessionHit {
                session_id: s.session_id.to_string(),
                timestamp: s.played_at,
                content_snippet: s.snippet.clone(),
                relevance_score: cosine_similarity(&query_vec, &s.embedding),
            })
            .filter(|hit| hit.relevance_score > 0.0)
            .collect();
        rank(&mut hits);
        Ok(hits)
    }

    async fn save_bookmark(&self, user_id: &str, bookmark: Bookmark) -> StoreResult<BookmarkId> {
        let id = bookmark.id;
        let mut bookmarks = self.bookmarks.write().await;
        let saved = bookmarks.entry(user_id.to_string()).or_default();
        saved.retain(|b| b.id != id);
        saved.push(bookmark);
        Ok(id)
    }

    async fn record_session(
        &self,
        user_id: &str,
        session_id: SessionId,
        text: &str,
    ) -> StoreResult<()> {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|s| s.session_id != session_id);
        sessions.push(RecordedSession {
            user_id: user_id.to_string(),
            session_id,
            played_at: Utc::now(),
            snippet: snippet(text),
            embedding: embed_text(text, self.dimension),
        });
        Ok(())
    }
}

// ============================================================================
// Connector-backed store
// ============================================================================

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS user_preferences (
        user_id TEXT PRIMARY KEY,
        reading_speed REAL NOT NULL,
        voice_preset TEXT NOT NULL,
        haptics_enabled INTEGER NOT NULL,
        scent_enabled INTEGER NOT NULL,
        language TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS bookmarks (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        session_id TEXT,
        segment_index INTEGER NOT NULL,
        label TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
];

/// Preference store on top of the relational and vector connectors
pub struct ConnectorPreferenceStore {
    relational: Arc<dyn RelationalConnector>,
    vector: Option<Arc<dyn VectorConnector>>,
    dimension: usize,
    schema: OnceCell<()>,
}

impl ConnectorPreferenceStore {
    /// `dimension` must match the vector index the sessions are written to
    pub fn new(
        relational: Arc<dyn RelationalConnector>,
        vector: Option<Arc<dyn VectorConnector>>,
        dimension: usize,
    ) -> Self {
        Self {
            relational,
            vector,
            dimension,
            schema: OnceCell::new(),
        }
    }

    /// Create the tables on first use
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        self.schema
            .get_or_try_init(|| async {
                for statement in SCHEMA {
                    self.relational.execute(statement, &[]).await?;
                }
                debug!(connector = %self.relational.name(), "preference schema ready");
                Ok::<(), StoreError>(())
            })
            .await?;
        Ok(())
    }

    async fn load_bookmarks(&self, user_id: &str) -> StoreResult<Vec<Bookmark>> {
        let rows = self
            .relational
            .query(
                "SELECT id, session_id, segment_index, label, created_at
                 FROM bookmarks WHERE user_id = ? ORDER BY created_at, id",
                &[json!(user_id)],
            )
            .await?;
        rows.iter().map(decode_bookmark).collect()
    }
}

fn column<'a>(row: &'a Row, table: &'static str, name: &str) -> StoreResult<&'a Value> {
    row.get(name).ok_or_else(|| StoreError::Decode {
        table,
        message: format!("missing column '{name}'"),
    })
}

fn text_column(row: &Row, table: &'static str, name: &str) -> StoreResult<String> {
    column(row, table, name)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| StoreError::Decode {
            table,
            message: format!("column '{name}' is not text"),
        })
}

fn int_column(row: &Row, table: &'static str, name: &str) -> StoreResult<i64> {
    column(row, table, name)?
        .as_i64()
        .ok_or_else(|| StoreError::Decode {
            table,
            message: format!("column '{name}' is not an integer"),
        })
}

fn decode_preferences(row: &Row) -> StoreResult<UserPreferences> {
    const TABLE: &str = "user_preferences";
    let reading_speed = column(row, TABLE, "reading_speed")?
        .as_f64()
        .ok_or_else(|| StoreError::Decode {
            table: TABLE,
            message: "column 'reading_speed' is not a number".to_string(),
        })?;
    Ok(UserPreferences {
        reading_speed,
        voice_preset: text_column(row, TABLE, "voice_preset")?,
        haptics_enabled: int_column(row, TABLE, "haptics_enabled")? != 0,
        scent_enabled: int_column(row, TABLE, "scent_enabled")? != 0,
        language: text_column(row, TABLE, "language")?,
        bookmarks: Vec::new(),
    })
}

fn decode_bookmark(row: &Row) -> StoreResult<Bookmark> {
    const TABLE: &str = "bookmarks";
    let bad = |message: String| StoreError::Decode {
        table: TABLE,
        message,
    };

    let id = text_column(row, TABLE, "id")?
        .parse::<BookmarkId>()
        .map_err(|e| bad(format!("bad id: {e}")))?;
    let session_id = match column(row, TABLE, "session_id")? {
        Value::Null => None,
        Value::String(s) => Some(
            s.parse::<SessionId>()
                .map_err(|e| bad(format!("bad session_id: {e}")))?,
        ),
        other => return Err(bad(format!("bad session_id: {other}"))),
    };
    let segment_index = usize::try_from(int_column(row, TABLE, "segment_index")?)
        .map_err(|e| bad(format!("bad segment_index: {e}")))?;
    let created_at = DateTime::parse_from_rfc3339(&text_column(row, TABLE, "created_at")?)
        .map_err(|e| bad(format!("bad created_at: {e}")))?
        .with_timezone(&Utc);

    Ok(Bookmark {
        id,
        session_id,
        segment_index,
        label: text_column(row, TABLE, "label")?,
        created_at,
    })
}

#[async_trait]
impl PreferenceStore for ConnectorPreferenceStore {
    async fn get_preferences(&self, user_id: &str) -> StoreResult<UserPreferences> {
        self.ensure_schema().await?;
        let rows = self
            .relational
            .query(
                "SELECT reading_speed, voice_preset, haptics_enabled, scent_enabled, language
                 FROM user_preferences WHERE user_id = ?",
                &[json!(user_id)],
            )
            .await?;

        let mut prefs = match rows.first() {
            Some(row) => decode_preferences(row)?,
            None => UserPreferences::default(),
        };
        prefs.bookmarks = self.load_bookmarks(user_id).await?;
        Ok(prefs)
    }

    async fn set_preferences(
        &self,
        user_id: &str,
        preferences: UserPreferences,
    ) -> StoreResult<UserPreferences> {
        self.ensure_schema().await?;
        self.relational
            .execute(
                "INSERT INTO user_preferences
                    (user_id, reading_speed, voice_preset, haptics_enabled, scent_enabled, language)
                 VALUES (?, ?, ?, ?, ?, ?)
                 ON CONFLICT(user_id) DO UPDATE SET
                    reading_speed = excluded.reading_speed,
                    voice_preset = excluded.voice_preset,
                    haptics_enabled = excluded.haptics_enabled,
                    scent_enabled = excluded.scent_enabled,
                    language = excluded.language",
                &[
                    json!(user_id),
                    json!(preferences.reading_speed),
                    json!(preferences.voice_preset),
                    json!(preferences.haptics_enabled),
                    json!(preferences.scent_enabled),
                    json!(preferences.language),
                ],
            )
            .await?;
        debug!(user_id, "preferences saved");
        self.get_preferences(user_id).await
    }

    async fn search_sessions(&self, user_id: &str, query: &str) -> StoreResult<Vec<SessionHit>> {
        let Some(vector) = &self.vector else {
            debug!("no vector connector, session search returns nothing");
            return Ok(Vec::new());
        };

        let filter = json!({ "user_id": user_id });
        let matches = vector
            .query(
                &embed_text(query, self.dimension),
                DEFAULT_SEARCH_LIMIT,
                Some(&filter),
            )
            .await?;

        let mut hits = Vec::with_capacity(matches.len());
        for m in matches.into_iter().filter(|m| m.score > 0.0) {
            let timestamp = m
                .metadata
                .get("played_at")
                .and_then(Value::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&Utc))
                .ok_or_else(|| StoreError::Decode {
                    table: "sessions",
                    message: format!("record '{}' has no played_at", m.id),
                })?;
            hits.push(SessionHit {
                session_id: m.id,
                timestamp,
                content_snippet: m
                    .metadata
                    .get("snippet")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                relevance_score: m.score,
            });
        }
        rank(&mut hits);
        Ok(hits)
    }

    async fn save_bookmark(&self, user_id: &str, bookmark: Bookmark) -> StoreResult<BookmarkId> {
        self.ensure_schema().await?;
        self.relational
            .execute(
                "INSERT OR REPLACE INTO bookmarks
                    (id, user_id, session_id, segment_index, label, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                &[
                    json!(bookmark.id.to_string()),
                    json!(user_id),
                    bookmark
                        .session_id
                        .map(|s| json!(s.to_string()))
                        .unwrap_or(Value::Null),
                    json!(bookmark.segment_index),
                    json!(bookmark.label),
                    json!(bookmark.created_at.to_rfc3339()),
                ],
            )
            .await?;
        debug!(user_id, bookmark = %bookmark.id, "bookmark saved");
        Ok(bookmark.id)
    }

    async fn record_session(
        &self,
        user_id: &str,
        session_id: SessionId,
        text: &str,
    ) -> StoreResult<()> {
        let Some(vector) = &self.vector else {
            return Ok(());
        };
        let record = VectorRecord::new(session_id.to_string(), embed_text(text, self.dimension))
            .with_metadata("user_id", user_id)
            .with_metadata("snippet", snippet(text))
            .with_metadata("played_at", Utc::now().to_rfc3339());
        vector.upsert(vec![record]).await?;
        debug!(user_id, session = ?session_id, "session indexed");
        Ok(())
    }
}
