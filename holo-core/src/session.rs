//! Playback sessions and the session store.
//!
//! A session exists only after a successful `play`. Each one is an explicit
//! value keyed by [`SessionId`]; operations on different sessions never
//! observe each other.

use crate::device::DeviceOutputs;
use crate::segment::Segment;
use crate::tone::{Emotion, VoicePreset};
use holo_connect::id::SessionId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// No session
    #[default]
    Idle,
    Playing,
    Paused,
}

/// The mutable record of one in-progress playback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSession {
    pub id: SessionId,
    pub user_id: String,
    pub is_playing: bool,
    /// Always a valid index into `segments`
    pub current_segment_index: usize,
    pub segments: Vec<Segment>,
    pub total_duration: f64,
    pub playback_url: String,
    pub tone: Emotion,
    pub voice_preset: VoicePreset,
    pub device_outputs: DeviceOutputs,
}

impl PlaybackSession {
    pub fn state(&self) -> PlaybackState {
        if self.is_playing {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        }
    }

    pub fn current_segment(&self) -> Option<&Segment> {
        self.segments.get(self.current_segment_index)
    }

    /// Highlights across every segment
    pub fn total_highlights(&self) -> usize {
        self.segments.iter().map(|s| s.highlights.len()).sum()
    }
}

/// Sessions keyed by id.
///
/// Every mutation happens under the write lock, so each orchestrator
/// operation sees and leaves a consistent session.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, PlaybackSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a session
    pub async fn get(&self, id: SessionId) -> Option<PlaybackSession> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Insert a session, replacing any previous one under the same id
    pub async fn insert(&self, session: PlaybackSession) -> Option<PlaybackSession> {
        self.sessions.write().await.insert(session.id, session)
    }

    pub async fn remove(&self, id: SessionId) -> Option<PlaybackSession> {
        self.sessions.write().await.remove(&id)
    }

    /// Apply `f` to a session in place. Returns `None` if there is no session.
    pub async fn update<R>(
        &self,
        id: SessionId,
        f: impl FnOnce(&mut PlaybackSession) -> R,
    ) -> Option<R> {
        self.sessions.write().await.get_mut(&id).map(f)
    }

    pub async fn state(&self, id: SessionId) -> PlaybackState {
        self.sessions
            .read()
            .await
            .get(&id)
            .map(PlaybackSession::state)
            .unwrap_or_default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
