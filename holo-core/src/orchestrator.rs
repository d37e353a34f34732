//! PlaybackOrchestrator - the top-level API of the playback pipeline.
//!
//! The orchestrator resolves connectors by symbolic name, wires the four
//! processing components, drives the pipeline on `play` and owns the session
//! state machine:
//!
//! ```text
//!            play                 pause
//!   Idle ───────────▶ Playing ───────────▶ Paused
//!     ▲                  ▲  ◀─────────────   │
//!     │                  │      resume       │
//!     └──── end ─────────┴───────────────────┘
//! ```
//!
//! Every operation takes a [`SessionId`] and returns a structured response;
//! failures are reported in its `error` field, never as a panic.

use crate::device::{DeviceMapper, TableDeviceMapper};
use crate::error::{PlaybackError, PlaybackResult};
use crate::preferences::{
    ConnectorPreferenceStore, InMemoryPreferenceStore, PreferenceStore, UserPreferences,
};
use crate::segment::{SegmentationStrategy, Segmenter, SegmenterConfig, TextSegmenter};
use crate::session::{PlaybackSession, PlaybackState, SessionStore};
use crate::tone::{KeywordToneClassifier, ToneClassifier};
use crate::response::{
    PlayFailed, PlayMetadata, PlayResponse, PlayStarted, SeekResponse, StatusResponse,
    SummaryResponse,
};
use holo_connect::config::{ConnectorName, ConnectorSpec, ConnectorsConfig};
use holo_connect::connector::HttpConnector;
use holo_connect::error::ConnectorError;
use holo_connect::id::SessionId;
use holo_connect::registry::ConnectorRegistry;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Audio host used when no `TTS` connector is configured
pub const DEFAULT_AUDIO_BASE_URL: &str = "https://api.tts.example.com";

const DEFAULT_VECTOR_DIMENSION: usize = 64;
const SUMMARY_SEGMENTS: usize = 3;
const SUMMARY_FALLBACK_CHARS: usize = 100;

/// Configuration for an orchestrator.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    /// Connector bindings by symbolic name.
    pub connectors: ConnectorsConfig,

    /// Segmentation strategy used by `play`.
    pub strategy: SegmentationStrategy,

    /// Segmenter tunables.
    pub segmenter: SegmenterConfig,

    /// Send device events to the haptic and scent transports.
    pub dispatch_devices: bool,

    /// Host for placeholder playback URLs. Defaults to the `TTS` connector URL.
    pub audio_base_url: Option<String>,
}

impl OrchestratorConfig {
    /// Create a config over the given connector bindings.
    pub fn new(connectors: ConnectorsConfig) -> Self {
        Self {
            connectors,
            ..Default::default()
        }
    }

    /// Set the segmentation strategy.
    pub fn with_strategy(mut self, strategy: SegmentationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the segmenter tunables.
    pub fn with_segmenter(mut self, segmenter: SegmenterConfig) -> Self {
        self.segmenter = segmenter;
        self
    }

    /// Enable or disable device dispatch.
    pub fn with_dispatch_devices(mut self, enabled: bool) -> Self {
        self.dispatch_devices = enabled;
        self
    }

    /// Set the host for placeholder playback URLs.
    pub fn with_audio_base_url(mut self, url: impl Into<String>) -> Self {
        self.audio_base_url = Some(url.into());
        self
    }

    /// Effective audio host, without a trailing slash
    pub fn resolved_audio_base_url(&self) -> String {
        let url = match (&self.audio_base_url, self.connectors.get(ConnectorName::Tts)) {
            (Some(url), _) => url.as_str(),
            (None, Some(ConnectorSpec::Http { url, .. })) => url.as_str(),
            _ => DEFAULT_AUDIO_BASE_URL,
        };
        url.trim_end_matches('/').to_string()
    }

    fn vector_dimension(&self) -> usize {
        match self.connectors.get(ConnectorName::VectorDb) {
            Some(ConnectorSpec::Vector { dimension, .. }) => *dimension,
            _ => DEFAULT_VECTOR_DIMENSION,
        }
    }
}

/// Builder for an orchestrator with injected components.
///
/// Components not supplied are built from the registry the same way
/// [`Orchestrator::new`] does.
pub struct OrchestratorBuilder {
    config: OrchestratorConfig,
    registry: ConnectorRegistry,
    segmenter: Option<Arc<dyn Segmenter>>,
    tone: Option<Arc<dyn ToneClassifier>>,
    devices: Option<Arc<dyn DeviceMapper>>,
    preferences: Option<Arc<dyn PreferenceStore>>,
}

impl OrchestratorBuilder {
    /// Use `config` for playback defaults
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolve connectors from `registry` instead of building them from config
    pub fn registry(mut self, registry: ConnectorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn segmenter(mut self, segmenter: Arc<dyn Segmenter>) -> Self {
        self.segmenter = Some(segmenter);
        self
    }

    pub fn tone_classifier(mut self, tone: Arc<dyn ToneClassifier>) -> Self {
        self.tone = Some(tone);
        self
    }

    pub fn device_mapper(mut self, devices: Arc<dyn DeviceMapper>) -> Self {
        self.devices = Some(devices);
        self
    }

    pub fn preference_store(mut self, preferences: Arc<dyn PreferenceStore>) -> Self {
        self.preferences = Some(preferences);
        self
    }

    /// Assemble the orchestrator
    pub fn build(self) -> Orchestrator {
        let config = self.config;
        let registry = self.registry;

        let segmenter: Arc<dyn Segmenter> = match self.segmenter {
            Some(segmenter) => segmenter,
            None => Arc::new(TextSegmenter::new(config.segmenter.clone())),
        };

        let tone: Arc<dyn ToneClassifier> = match self.tone {
            Some(tone) => tone,
            None => {
                let mut classifier = KeywordToneClassifier::new();
                if let Some(remote) = registry.http(ConnectorName::EmotionModelApi) {
                    classifier = classifier.with_remote(remote);
                }
                Arc::new(classifier)
            }
        };

        let devices: Arc<dyn DeviceMapper> = match self.devices {
            Some(devices) => devices,
            None => {
                let mut mapper = TableDeviceMapper::new();
                if let Some(haptic) = registry.http(ConnectorName::HapticTransport) {
                    mapper = mapper.with_haptic_transport(haptic);
                }
                if let Some(scent) = registry.http(ConnectorName::ScentTransport) {
                    mapper = mapper.with_scent_transport(scent);
                }
                Arc::new(mapper)
            }
        };

        let preferences: Arc<dyn PreferenceStore> = match (
            self.preferences,
            registry.relational(ConnectorName::RelationalStore),
        ) {
            (Some(preferences), _) => preferences,
            (None, Some(relational)) => Arc::new(ConnectorPreferenceStore::new(
                relational,
                registry.vector(ConnectorName::VectorDb),
                config.vector_dimension(),
            )),
            (None, None) => Arc::new(InMemoryPreferenceStore::new()),
        };

        Orchestrator {
            segmenter,
            tone,
            devices,
            preferences,
            preprocessor: registry.http(ConnectorName::TextPreprocessor),
            audio_base_url: config.resolved_audio_base_url(),
            strategy: config.strategy,
            dispatch_devices: config.dispatch_devices,
            registry,
            sessions: SessionStore::new(),
        }
    }
}

/// Drives the playback pipeline for any number of sessions.
pub struct Orchestrator {
    segmenter: Arc<dyn Segmenter>,
    tone: Arc<dyn ToneClassifier>,
    devices: Arc<dyn DeviceMapper>,
    preferences: Arc<dyn PreferenceStore>,
    preprocessor: Option<Arc<dyn HttpConnector>>,
    registry: ConnectorRegistry,
    sessions: SessionStore,
    strategy: SegmentationStrategy,
    dispatch_devices: bool,
    audio_base_url: String,
}

impl Orchestrator {
    /// Build connectors from `config` and wire the default components.
    pub fn new(config: OrchestratorConfig) -> PlaybackResult<Self> {
        let registry = ConnectorRegistry::from_config(&config.connectors)?;
        Ok(Self::builder().config(config).registry(registry).build())
    }

    /// Start a builder with default config and an empty registry.
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder {
            config: OrchestratorConfig::default(),
            registry: ConnectorRegistry::new(),
            segmenter: None,
            tone: None,
            devices: None,
            preferences: None,
        }
    }

    /// Connectors this orchestrator resolved.
    pub fn registry(&self) -> &ConnectorRegistry {
        &self.registry
    }

    /// The preference store, for bookmark and search operations.
    pub fn preferences(&self) -> &Arc<dyn PreferenceStore> {
        &self.preferences
    }

    /// Release every connector.
    pub async fn shutdown(&self) {
        for outcome in self.registry.disconnect_all().await {
            if let Err(e) = outcome.result {
                warn!(connector = %outcome.name, error = %e, "disconnect failed");
            }
        }
    }

    fn segment_url(&self, user_id: &str, index: usize) -> String {
        format!("{}/audio/{}/segment_{}.mp3", self.audio_base_url, user_id, index)
    }

    async fn preprocess(&self, text: &str) -> String {
        let Some(connector) = &self.preprocessor else {
            return text.to_string();
        };
        let result = connector
            .post("/preprocess", &json!({ "text": text }))
            .await
            .and_then(|response| match response.get("text").and_then(Value::as_str) {
                Some(processed) => Ok(processed.to_string()),
                None => Err(ConnectorError::Parse(
                    "preprocessor response has no 'text' field".to_string(),
                )),
            });
        match result {
            Ok(processed) => processed,
            Err(e) => {
                warn!(error = %e, "text preprocessor failed, using raw text");
                text.to_string()
            }
        }
    }

    // ========================================================================
    // State machine
    // ========================================================================

    /// Run the full pipeline and start a fresh session.
    ///
    /// Any previous session under `session_id` is discarded, including on
    /// failure, which leaves the session `Idle`.
    pub async fn play(&self, session_id: SessionId, text: &str, user_id: &str) -> PlayResponse {
        match self.start(session_id, text, user_id).await {
            Ok(started) => PlayResponse::Started(started),
            Err(e) => {
                self.sessions.remove(session_id).await;
                warn!(session = ?session_id, error = %e, "play failed");
                PlayResponse::Failed(PlayFailed {
                    error: e.to_string(),
                    playback_url: String::new(),
                })
            }
        }
    }

    async fn start(
        &self,
        session_id: SessionId,
        text: &str,
        user_id: &str,
    ) -> PlaybackResult<PlayStarted> {
        let prefs: UserPreferences = self.preferences.get_preferences(user_id).await?;
        let text = self.preprocess(text).await;

        let segmented = self.segmenter.process(&text, self.strategy);
        let Some(first) = segmented.segments.first() else {
            return Err(PlaybackError::NoSegments);
        };
        debug!(
            segments = segmented.segments.len(),
            total_duration = segmented.total_duration,
            "text segmented"
        );

        let tone = self.tone.process(&text).await;

        let timestamps = first.highlight_timestamps();
        let mut outputs = self
            .devices
            .process(&first.highlights, tone.label, &timestamps)
            .await;
        if !prefs.haptics_enabled {
            outputs.haptic_events.clear();
        }
        if !prefs.scent_enabled {
            outputs.scent_events.clear();
        }
        if self.dispatch_devices {
            let report = self.devices.dispatch(&outputs).await;
            debug!(?report, "device events dispatched");
        }

        if let Err(e) = self
            .preferences
            .record_session(user_id, session_id, &text)
            .await
        {
            warn!(error = %e, "failed to index session for search");
        }

        let playback_url = self.segment_url(user_id, 0);
        let response = PlayStarted {
            playback_url: playback_url.clone(),
            metadata: PlayMetadata {
                total_segments: segmented.segments.len(),
                current_segment: 0,
                emotion: tone.label,
                tts_settings: tone.voice_preset.clone(),
                haptic_events: outputs.haptic_events.clone(),
                scent_events: outputs.scent_events.clone(),
                total_duration: segmented.total_duration,
            },
        };

        self.sessions
            .insert(PlaybackSession {
                id: session_id,
                user_id: user_id.to_string(),
                is_playing: true,
                current_segment_index: 0,
                segments: segmented.segments,
                total_duration: segmented.total_duration,
                playback_url,
                tone: tone.label,
                voice_preset: tone.voice_preset,
                device_outputs: outputs,
            })
            .await;

        info!(
            session = ?session_id,
            user_id,
            emotion = %tone.label,
            segments = response.metadata.total_segments,
            "playback started"
        );
        Ok(response)
    }

    /// Stop advancing. Idempotent; with no session only reports zeroed fields.
    pub async fn pause(&self, session_id: SessionId) -> StatusResponse {
        let current = self
            .sessions
            .update(session_id, |session| {
                session.is_playing = false;
                session.current_segment_index
            })
            .await;
        if current.is_some() {
            info!(session = ?session_id, "playback paused");
        }
        StatusResponse::paused(current.unwrap_or(0))
    }

    /// Continue from the current position without resetting it.
    pub async fn resume(&self, session_id: SessionId) -> StatusResponse {
        let current = self
            .sessions
            .update(session_id, |session| {
                session.is_playing = true;
                session.current_segment_index
            })
            .await;
        match current {
            Some(index) => {
                info!(session = ?session_id, segment = index, "playback resumed");
                StatusResponse::playing(index)
            }
            None => StatusResponse::error(PlaybackError::NoSession.to_string()),
        }
    }

    /// Move to segment `index`. Does not change whether the session is playing.
    pub async fn seek(&self, session_id: SessionId, index: i64) -> SeekResponse {
        let outcome = self
            .sessions
            .update(session_id, |session| {
                let total = session.segments.len();
                let position = usize::try_from(index).ok().filter(|i| *i < total);
                match position {
                    Some(i) => {
                        session.current_segment_index = i;
                        session.playback_url = self.segment_url(&session.user_id, i);
                        let segment = &session.segments[i];
                        Ok(SeekResponse::seeked(
                            i,
                            session.playback_url.clone(),
                            segment.text.clone(),
                            segment.duration,
                        ))
                    }
                    None => Err(SeekResponse::error(
                        PlaybackError::InvalidSegment { index, total }.to_string(),
                        session.current_segment_index,
                        session.playback_url.clone(),
                    )),
                }
            })
            .await;

        match outcome {
            Some(Ok(response)) => {
                debug!(session = ?session_id, segment = response.current_segment, "seeked");
                response
            }
            Some(Err(response)) => response,
            None => SeekResponse::error(PlaybackError::NoSession.to_string(), 0, String::new()),
        }
    }

    /// Read-only digest of the session.
    pub async fn summary(&self, session_id: SessionId) -> SummaryResponse {
        let Some(session) = self.sessions.get(session_id).await else {
            return SummaryResponse::empty();
        };
        SummaryResponse {
            summary: summarize(&session),
            total_segments: session.segments.len(),
            total_highlights: session.total_highlights(),
            emotion: session.tone,
            current_position: session.current_segment_index,
            is_playing: session.is_playing,
        }
    }

    /// Drop the session. Returns whether one existed.
    pub async fn end(&self, session_id: SessionId) -> bool {
        let existed = self.sessions.remove(session_id).await.is_some();
        if existed {
            info!(session = ?session_id, "playback ended");
        }
        existed
    }

    /// Current lifecycle state of a session.
    pub async fn state(&self, session_id: SessionId) -> PlaybackState {
        self.sessions.state(session_id).await
    }

    /// Snapshot of a session, if one exists.
    pub async fn session(&self, session_id: SessionId) -> Option<PlaybackSession> {
        self.sessions.get(session_id).await
    }
}

/// First sentence (or first 100 characters) of each of the first three
/// segments, plus a count of the rest.
fn summarize(session: &PlaybackSession) -> String {
    if session.segments.is_empty() {
        return SummaryResponse::NO_CONTENT.to_string();
    }

    let parts: Vec<String> = session
        .segments
        .iter()
        .take(SUMMARY_SEGMENTS)
        .map(|segment| match segment.text.split_once('.') {
            Some((first, _)) => format!("{first}."),
            None => segment.text.chars().take(SUMMARY_FALLBACK_CHARS).collect(),
        })
        .collect();

    let mut summary = parts.join(" ");
    let remaining = session.segments.len().saturating_sub(SUMMARY_SEGMENTS);
    if remaining > 0 {
        summary.push_str(&format!(" ... ({remaining} more segments)"));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceOutputs;
    use crate::segment::Segment;
    use crate::tone::{Emotion, VoicePreset};

    fn session_with(texts: &[&str]) -> PlaybackSession {
        let segments = texts
            .iter()
            .enumerate()
            .map(|(id, text)| Segment {
                id,
                text: text.to_string(),
                start_time: 0.0,
                end_time: 0.0,
                duration: 0.0,
                highlights: Vec::new(),
                word_count: 0,
            })
            .collect();
        PlaybackSession {
            id: SessionId::new(),
            user_id: "u1".to_string(),
            is_playing: true,
            current_segment_index: 0,
            segments,
            total_duration: 0.0,
            playback_url: String::new(),
            tone: Emotion::Neutral,
            voice_preset: VoicePreset::default(),
            device_outputs: DeviceOutputs::default(),
        }
    }

    #[test]
    fn test_summary_first_sentences() {
        let session = session_with(&["One. More.", "Two words", "Three. Again."]);
        assert_eq!(summarize(&session), "One. Two words Three.");
    }

    #[test]
    fn test_summary_counts_remaining_segments() {
        let session = session_with(&["A.", "B.", "C.", "D.", "E."]);
        assert_eq!(summarize(&session), "A. B. C. ... (2 more segments)");
    }

    #[test]
    fn test_summary_truncates_without_period() {
        let long = "x".repeat(150);
        let session = session_with(&[&long]);
        assert_eq!(summarize(&session).len(), SUMMARY_FALLBACK_CHARS);
    }

    #[test]
    fn test_audio_base_url_resolution() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.resolved_audio_base_url(), DEFAULT_AUDIO_BASE_URL);

        let config = OrchestratorConfig::new(ConnectorsConfig::new().with_connector(
            ConnectorName::Tts,
            ConnectorSpec::http("https://voice.example.org/"),
        ));
        assert_eq!(config.resolved_audio_base_url(), "https://voice.example.org");

        let config = config.with_audio_base_url("https://cdn.example.net");
        assert_eq!(config.resolved_audio_base_url(), "https://cdn.example.net");
    }

    #[tokio::test]
    async fn test_pause_without_session() {
        let orchestrator = Orchestrator::builder().build();
        let response = orchestrator.pause(SessionId::new()).await;
        assert_eq!(response.status, "paused");
        assert_eq!(response.current_segment, 0);
        assert!(!response.is_playing);
    }

    #[tokio::test]
    async fn test_resume_without_session() {
        let orchestrator = Orchestrator::builder().build();
        let response = orchestrator.resume(SessionId::new()).await;
        assert_eq!(response.status, "error");
        assert_eq!(response.error.as_deref(), Some("No segments available"));
    }

    #[tokio::test]
    async fn test_seek_without_session() {
        let orchestrator = Orchestrator::builder().build();
        let response = orchestrator.seek(SessionId::new(), 0).await;
        assert_eq!(response.status, "error");
        assert_eq!(response.error.as_deref(), Some("No segments available"));
        assert_eq!(response.playback_url, "");
        assert_eq!(response.segment_duration, 0.0);
    }
}
