//! Structured results of orchestrator operations.
//!
//! Field names serialize in camelCase. Errors are ordinary values with an
//! `error` field so callers can branch on them without error handling.

use crate::device::{HapticEvent, ScentEvent};
use crate::tone::{Emotion, VoicePreset};
use serde::{Deserialize, Serialize};

/// Result of `play`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlayResponse {
    Started(PlayStarted),
    Failed(PlayFailed),
}

impl PlayResponse {
    pub fn is_started(&self) -> bool {
        matches!(self, PlayResponse::Started(_))
    }

    pub fn playback_url(&self) -> &str {
        match self {
            PlayResponse::Started(started) => &started.playback_url,
            PlayResponse::Failed(failed) => &failed.playback_url,
        }
    }

    pub fn metadata(&self) -> Option<&PlayMetadata> {
        match self {
            PlayResponse::Started(started) => Some(&started.metadata),
            PlayResponse::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            PlayResponse::Started(_) => None,
            PlayResponse::Failed(failed) => Some(&failed.error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayStarted {
    pub playback_url: String,
    pub metadata: PlayMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayFailed {
    pub error: String,
    /// Always empty
    pub playback_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayMetadata {
    pub total_segments: usize,
    pub current_segment: usize,
    pub emotion: Emotion,
    pub tts_settings: VoicePreset,
    pub haptic_events: Vec<HapticEvent>,
    pub scent_events: Vec<ScentEvent>,
    pub total_duration: f64,
}

/// Result of `pause` and `resume`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub current_segment: usize,
    pub is_playing: bool,
}

impl StatusResponse {
    pub(crate) fn paused(current_segment: usize) -> Self {
        Self {
            status: "paused".to_string(),
            error: None,
            current_segment,
            is_playing: false,
        }
    }

    pub(crate) fn playing(current_segment: usize) -> Self {
        Self {
            status: "playing".to_string(),
            error: None,
            current_segment,
            is_playing: true,
        }
    }

    pub(crate) fn error(message: String) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(message),
            current_segment: 0,
            is_playing: false,
        }
    }
}

/// Result of `seek`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeekResponse {
    /// `"seeked"` or `"error"`
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub current_segment: usize,
    pub playback_url: String,
    pub segment_text: String,
    pub segment_duration: f64,
}

impl SeekResponse {
    pub(crate) fn seeked(
        current_segment: usize,
        playback_url: String,
        segment_text: String,
        segment_duration: f64,
    ) -> Self {
        Self {
            status: "seeked".to_string(),
            error: None,
            current_segment,
            playback_url,
            segment_text,
            segment_duration,
        }
    }

    /// Error result; position and URL are whatever the session already had
    pub(crate) fn error(message: String, current_segment: usize, playback_url: String) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(message),
            current_segment,
            playback_url,
            segment_text: String::new(),
            segment_duration: 0.0,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Result of `summary`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub summary: String,
    pub total_segments: usize,
    pub total_highlights: usize,
    pub emotion: Emotion,
    pub current_position: usize,
    pub is_playing: bool,
}

impl SummaryResponse {
    pub(crate) const NO_CONTENT: &'static str = "No content available.";

    pub(crate) fn empty() -> Self {
        Self {
            summary: Self::NO_CONTENT.to_string(),
            total_segments: 0,
            total_highlights: 0,
            emotion: Emotion::Neutral,
            current_position: 0,
            is_playing: false,
        }
    }
}
