//! Narrative playback pipeline.
//!
//! This crate provides:
//! - Text segmentation with reading-time estimates and highlights
//! - Keyword tone classification with an optional remote classifier
//! - Haptic and scent event mapping
//! - Per-user preferences, bookmarks and session search
//! - A session-keyed playback orchestrator (play/pause/resume/seek/summary)
//!
//! # Quick Start
//!
//! ```ignore
//! use holo_core::{Orchestrator, OrchestratorConfig, SessionId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = Orchestrator::new(OrchestratorConfig::default())?;
//!     let session = SessionId::new();
//!
//!     let started = orchestrator
//!         .play(session, "I am so happy and delighted!", "u1")
//!         .await;
//!     println!("{}", serde_json::to_string_pretty(&started)?);
//!
//!     let seeked = orchestrator.seek(session, 0).await;
//!     println!("{}", seeked.segment_text);
//!     Ok(())
//! }
//! ```

pub mod device;
pub mod error;
pub mod orchestrator;
pub mod preferences;
pub mod response;
pub mod segment;
pub mod session;
pub mod testing;
pub mod tone;

pub use holo_connect::id::{BookmarkId, SessionId};

// Primary public API
pub use device::{DeviceMapper, DeviceOutputs, HapticEvent, ScentEvent, TableDeviceMapper};
pub use error::{PlaybackError, StoreError, StoreResult};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, OrchestratorConfig};
pub use preferences::{
    Bookmark, ConnectorPreferenceStore, InMemoryPreferenceStore, PreferenceStore, SessionHit,
    UserPreferences,
};
pub use response::{PlayResponse, SeekResponse, StatusResponse, SummaryResponse};
pub use segment::{
    Highlight, HighlightKind, Segment, SegmentationStrategy, Segmenter, SegmenterConfig,
    TextSegmenter,
};
pub use session::{PlaybackSession, PlaybackState};
pub use testing::MockHttpConnector;
pub use tone::{Emotion, KeywordToneClassifier, ToneClassifier, ToneResult, VoicePreset};
