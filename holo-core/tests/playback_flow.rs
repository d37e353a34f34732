//! Playback flow tests through the public orchestrator API.
//!
//! These tests verify:
//! - The play pipeline output (tone, voice, device events, durations)
//! - The pause/resume/seek state machine and its error results
//! - Summaries
//! - Optional service hooks and their fallbacks
//!
//! Everything runs offline; HTTP services are `MockHttpConnector`s.

use holo_connect::config::ConnectorName;
use holo_connect::registry::ConnectorRegistry;
use holo_core::testing::MockHttpConnector;
use holo_core::{
    Emotion, Orchestrator, OrchestratorConfig, PlayResponse, PlaybackState, SegmentationStrategy,
    SessionId, UserPreferences,
};
use serde_json::json;
use std::sync::Arc;

const THREE_PARAGRAPHS: &str = "The morning was calm. Birds sang softly.\n\n\
She opened the letter. It was from her brother.\n\n\
He was coming home at last. Everyone was thrilled.";

fn orchestrator() -> Orchestrator {
    Orchestrator::builder().build()
}

fn started(response: &PlayResponse) -> &holo_core::response::PlayStarted {
    match response {
        PlayResponse::Started(started) => started,
        PlayResponse::Failed(failed) => panic!("play failed: {}", failed.error),
    }
}

// =============================================================================
// PLAY
// =============================================================================

#[tokio::test]
async fn test_happy_text_selects_cheerful_voice() {
    let orchestrator = orchestrator();
    let response = orchestrator
        .play(
            SessionId::new(),
            "I am so happy and delighted! This is wonderful and joyful!",
            "u1",
        )
        .await;

    let metadata = &started(&response).metadata;
    assert_eq!(metadata.emotion, Emotion::Happy);
    assert_eq!(metadata.tts_settings.voice, "cheerful");
    assert_eq!(metadata.current_segment, 0);

    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["metadata"]["emotion"], "happy");
    assert_eq!(value["metadata"]["ttsSettings"]["voice"], "cheerful");
}

#[tokio::test]
async fn test_empty_text_fails_without_session() {
    let orchestrator = orchestrator();
    let session = SessionId::new();
    let response = orchestrator.play(session, "", "u1").await;

    assert_eq!(response.playback_url(), "");
    assert_eq!(response.error(), Some("No segments generated"));
    assert_eq!(orchestrator.state(session).await, PlaybackState::Idle);
    assert!(orchestrator.session(session).await.is_none());
}

#[tokio::test]
async fn test_failed_play_discards_previous_session() {
    let orchestrator = orchestrator();
    let session = SessionId::new();
    assert!(orchestrator.play(session, THREE_PARAGRAPHS, "u1").await.is_started());

    let response = orchestrator.play(session, "   \n\n  ", "u1").await;
    assert!(!response.is_started());
    assert_eq!(orchestrator.state(session).await, PlaybackState::Idle);
}

#[tokio::test]
async fn test_durations_sum_to_total() {
    let orchestrator = orchestrator();
    let session = SessionId::new();
    let response = orchestrator.play(session, THREE_PARAGRAPHS, "u1").await;
    let metadata = &started(&response).metadata;
    assert_eq!(metadata.total_segments, 3);

    let snapshot = orchestrator.session(session).await.unwrap();
    let sum: f64 = snapshot.segments.iter().map(|s| s.duration).sum();
    assert!((sum - metadata.total_duration).abs() < 1e-9);

    for pair in snapshot.segments.windows(2) {
        assert!(pair[0].end_time <= pair[1].start_time + 1e-9);
    }
}

#[tokio::test]
async fn test_playback_url_uses_user_and_segment() {
    let orchestrator = orchestrator();
    let response = orchestrator.play(SessionId::new(), THREE_PARAGRAPHS, "reader-7").await;
    assert_eq!(
        response.playback_url(),
        "https://api.tts.example.com/audio/reader-7/segment_0.mp3"
    );
}

#[tokio::test]
async fn test_device_events_for_first_segment() {
    let orchestrator = orchestrator();
    let text = "She whispered \"we are safe now\" and smiled.\n\nA second paragraph.";
    let response = orchestrator.play(SessionId::new(), text, "u1").await;
    let metadata = &started(&response).metadata;

    assert_eq!(metadata.haptic_events.len(), 1);
    let haptic = &metadata.haptic_events[0];
    assert_eq!(haptic.trigger, "highlight");
    assert_eq!(haptic.metadata["highlight_type"], "quote");
    assert!(haptic.timestamp > 0.0);

    assert_eq!(metadata.scent_events.len(), 1);
}

#[tokio::test]
async fn test_preferences_gate_device_output() {
    let orchestrator = orchestrator();
    orchestrator
        .preferences()
        .set_preferences(
            "u1",
            UserPreferences {
                haptics_enabled: false,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let text = "She whispered \"we are safe now\" and smiled.";
    let response = orchestrator.play(SessionId::new(), text, "u1").await;
    let metadata = &started(&response).metadata;
    assert!(metadata.haptic_events.is_empty());
    assert_eq!(metadata.scent_events.len(), 1);
}

#[tokio::test]
async fn test_sentence_strategy() {
    let orchestrator = Orchestrator::builder()
        .config(OrchestratorConfig::default().with_strategy(SegmentationStrategy::Sentence))
        .build();
    let response = orchestrator.play(SessionId::new(), THREE_PARAGRAPHS, "u1").await;
    assert_eq!(started(&response).metadata.total_segments, 6);
}

// =============================================================================
// STATE MACHINE
// =============================================================================

#[tokio::test]
async fn test_pause_is_idempotent() {
    let orchestrator = orchestrator();
    let session = SessionId::new();
    orchestrator.play(session, THREE_PARAGRAPHS, "u1").await;

    let first = orchestrator.pause(session).await;
    let second = orchestrator.pause(session).await;
    assert_eq!(first, second);
    assert_eq!(first.status, "paused");
    assert!(!first.is_playing);
    assert_eq!(orchestrator.state(session).await, PlaybackState::Paused);
}

#[tokio::test]
async fn test_resume_keeps_position() {
    let orchestrator = orchestrator();
    let session = SessionId::new();
    orchestrator.play(session, THREE_PARAGRAPHS, "u1").await;
    orchestrator.seek(session, 2).await;
    orchestrator.pause(session).await;

    let resumed = orchestrator.resume(session).await;
    assert_eq!(resumed.status, "playing");
    assert_eq!(resumed.current_segment, 2);
    assert_eq!(orchestrator.state(session).await, PlaybackState::Playing);
}

#[tokio::test]
async fn test_seek_returns_segment_text() {
    let orchestrator = orchestrator();
    let session = SessionId::new();
    orchestrator.play(session, THREE_PARAGRAPHS, "u1").await;

    let seeked = orchestrator.seek(session, 1).await;
    assert_eq!(seeked.status, "seeked");
    assert_eq!(seeked.current_segment, 1);
    assert_eq!(seeked.segment_text, "She opened the letter. It was from her brother.");
    assert!(seeked.segment_duration > 0.0);
    assert!(seeked.playback_url.ends_with("/segment_1.mp3"));
}

#[tokio::test]
async fn test_seek_does_not_change_playing_flag() {
    let orchestrator = orchestrator();
    let session = SessionId::new();
    orchestrator.play(session, THREE_PARAGRAPHS, "u1").await;
    orchestrator.pause(session).await;
    orchestrator.seek(session, 1).await;
    assert_eq!(orchestrator.state(session).await, PlaybackState::Paused);
}

#[tokio::test]
async fn test_out_of_range_seek_leaves_state() {
    let orchestrator = orchestrator();
    let session = SessionId::new();
    let response = orchestrator.play(session, THREE_PARAGRAPHS, "u1").await;
    let url = response.playback_url().to_string();

    let seeked = orchestrator.seek(session, 999).await;
    assert_eq!(seeked.status, "error");
    assert_eq!(seeked.error.as_deref(), Some("Invalid segment index"));
    assert_eq!(seeked.current_segment, 0);
    assert_eq!(seeked.playback_url, url);
    assert_eq!(seeked.segment_text, "");

    let negative = orchestrator.seek(session, -1).await;
    assert_eq!(negative.status, "error");

    let summary = orchestrator.summary(session).await;
    assert_eq!(summary.current_position, 0);
}

#[tokio::test]
async fn test_replay_resets_position() {
    let orchestrator = orchestrator();
    let session = SessionId::new();
    orchestrator.play(session, THREE_PARAGRAPHS, "u1").await;
    orchestrator.seek(session, 2).await;
    orchestrator.pause(session).await;

    orchestrator.play(session, THREE_PARAGRAPHS, "u1").await;
    let summary = orchestrator.summary(session).await;
    assert_eq!(summary.current_position, 0);
    assert!(summary.is_playing);
}

#[tokio::test]
async fn test_end_returns_to_idle() {
    let orchestrator = orchestrator();
    let session = SessionId::new();
    orchestrator.play(session, THREE_PARAGRAPHS, "u1").await;
    assert!(orchestrator.end(session).await);
    assert!(!orchestrator.end(session).await);
    assert_eq!(orchestrator.state(session).await, PlaybackState::Idle);
}

// =============================================================================
// SUMMARY
// =============================================================================

#[tokio::test]
async fn test_summary_of_three_paragraphs() {
    let orchestrator = orchestrator();
    let session = SessionId::new();
    orchestrator.play(session, THREE_PARAGRAPHS, "u1").await;

    let summary = orchestrator.summary(session).await;
    assert_eq!(
        summary.summary,
        "The morning was calm. She opened the letter. He was coming home at last."
    );
    assert_eq!(summary.total_segments, 3);
    // "thrilled" and "calm" tie; excited comes first
    assert_eq!(summary.emotion, Emotion::Excited);
}

#[tokio::test]
async fn test_summary_without_session() {
    let orchestrator = orchestrator();
    let summary = orchestrator.summary(SessionId::new()).await;
    assert_eq!(summary.summary, "No content available.");
    assert_eq!(summary.total_segments, 0);
    assert!(!summary.is_playing);
}

// =============================================================================
// SERVICE HOOKS
// =============================================================================

#[tokio::test]
async fn test_remote_emotion_overrides_keywords() {
    let emotion = Arc::new(
        MockHttpConnector::new("emotionModelAPI")
            .with_response("/predict", json!({"emotion": "angry", "confidence": 0.97})),
    );
    let registry = ConnectorRegistry::new().with_http(ConnectorName::EmotionModelApi, emotion.clone());
    let orchestrator = Orchestrator::builder().registry(registry).build();

    let response = orchestrator
        .play(SessionId::new(), "I am so happy and delighted!", "u1")
        .await;
    let metadata = &started(&response).metadata;
    assert_eq!(metadata.emotion, Emotion::Angry);
    assert_eq!(metadata.tts_settings.voice, "intense");

    let calls = emotion.calls_to("/predict");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].payload, json!({"text": "I am so happy and delighted!"}));
}

#[tokio::test]
async fn test_failing_emotion_service_falls_back() {
    let emotion = Arc::new(MockHttpConnector::new("emotionModelAPI").failing());
    let registry = ConnectorRegistry::new().with_http(ConnectorName::EmotionModelApi, emotion);
    let orchestrator = Orchestrator::builder().registry(registry).build();

    let response = orchestrator
        .play(SessionId::new(), "I am so happy and delighted!", "u1")
        .await;
    assert_eq!(started(&response).metadata.emotion, Emotion::Happy);
}

#[tokio::test]
async fn test_preprocessor_rewrites_text() {
    let preprocessor = Arc::new(
        MockHttpConnector::new("textPreprocessor")
            .with_response("/preprocess", json!({"text": "A cleaned sentence."})),
    );
    let registry =
        ConnectorRegistry::new().with_http(ConnectorName::TextPreprocessor, preprocessor.clone());
    let orchestrator = Orchestrator::builder().registry(registry).build();

    let session = SessionId::new();
    orchestrator.play(session, "a  cleaned   sentence", "u1").await;
    let seeked = orchestrator.seek(session, 0).await;
    assert_eq!(seeked.segment_text, "A cleaned sentence.");
    assert_eq!(preprocessor.calls().len(), 1);
}

#[tokio::test]
async fn test_bad_preprocessor_response_uses_raw_text() {
    let preprocessor = Arc::new(
        MockHttpConnector::new("textPreprocessor")
            .with_response("/preprocess", json!({"unexpected": true})),
    );
    let registry = ConnectorRegistry::new().with_http(ConnectorName::TextPreprocessor, preprocessor);
    let orchestrator = Orchestrator::builder().registry(registry).build();

    let session = SessionId::new();
    orchestrator.play(session, "Raw text stays.", "u1").await;
    assert_eq!(orchestrator.seek(session, 0).await.segment_text, "Raw text stays.");
}

#[tokio::test]
async fn test_device_dispatch_posts_events() {
    let haptics = Arc::new(
        MockHttpConnector::new("hapticTransport").with_response("/haptics", json!({"ok": true})),
    );
    let scent = Arc::new(MockHttpConnector::new("scentTransport").failing());
    let registry = ConnectorRegistry::new()
        .with_http(ConnectorName::HapticTransport, haptics.clone())
        .with_http(ConnectorName::ScentTransport, scent.clone());
    let orchestrator = Orchestrator::builder()
        .config(OrchestratorConfig::default().with_dispatch_devices(true))
        .registry(registry)
        .build();

    let response = orchestrator
        .play(SessionId::new(), "He shouted \"run for the hills\" loudly.", "u1")
        .await;

    // a failing scent transport does not fail the play
    assert!(response.is_started());
    let posted = haptics.calls_to("/haptics");
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].payload["events"].as_array().map(Vec::len), Some(1));
    assert_eq!(scent.calls_to("/scent").len(), 1);
}

#[tokio::test]
async fn test_dispatch_disabled_by_default() {
    let haptics = Arc::new(
        MockHttpConnector::new("hapticTransport").with_response("/haptics", json!({})),
    );
    let registry =
        ConnectorRegistry::new().with_http(ConnectorName::HapticTransport, haptics.clone());
    let orchestrator = Orchestrator::builder().registry(registry).build();

    orchestrator
        .play(SessionId::new(), "He shouted \"run for the hills\" loudly.", "u1")
        .await;
    assert!(haptics.calls().is_empty());
}
