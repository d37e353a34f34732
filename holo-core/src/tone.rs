//! Emotional tone inference and voice presets.
//!
//! The built-in classifier scores a fixed keyword table against the text.
//! When an `emotionModelAPI` connector is supplied it is asked first, and the
//! keyword heuristic is used only if the service fails.

use async_trait::async_trait;
use holo_connect::connector::HttpConnector;
use holo_connect::error::ConnectorError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Placeholder confidence reported by the keyword heuristic. Not calibrated.
pub const HEURISTIC_CONFIDENCE: f32 = 0.85;

/// Categorical emotion label driving voice and device output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Excited,
    Calm,
    #[default]
    Neutral,
}

impl Emotion {
    /// Every label, in tie-break order for keyword scoring
    pub const ALL: [Emotion; 6] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Excited,
        Emotion::Calm,
        Emotion::Neutral,
    ];

    /// Lowercase label
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Excited => "excited",
            Emotion::Calm => "calm",
            Emotion::Neutral => "neutral",
        }
    }

    /// Parse a label case-insensitively; anything unknown is `Neutral`
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        Emotion::ALL
            .into_iter()
            .find(|e| e.as_str() == label)
            .unwrap_or(Emotion::Neutral)
    }

    /// Voice-synthesis settings for this label
    pub fn voice_preset(&self) -> VoicePreset {
        let (voice, rate, pitch, volume) = match self {
            Emotion::Happy => ("cheerful", 1.10, 1.10, 1.00),
            Emotion::Sad => ("melancholic", 0.90, 0.90, 0.80),
            Emotion::Angry => ("intense", 1.20, 1.00, 1.10),
            Emotion::Calm => ("soothing", 0.95, 1.00, 0.90),
            Emotion::Excited => ("energetic", 1.15, 1.05, 1.00),
            Emotion::Neutral => ("normal", 1.00, 1.00, 1.00),
        };
        VoicePreset {
            voice: voice.to_string(),
            rate,
            pitch,
            volume,
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Voice-synthesis parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoicePreset {
    pub voice: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for VoicePreset {
    fn default() -> Self {
        Emotion::Neutral.voice_preset()
    }
}

/// Outcome of tone classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneResult {
    pub label: Emotion,
    pub voice_preset: VoicePreset,
    /// Not calibrated unless produced by a real classification service
    pub confidence: f32,
}

impl ToneResult {
    /// Result for `label` with the heuristic placeholder confidence
    pub fn for_label(label: Emotion) -> Self {
        Self {
            label,
            voice_preset: label.voice_preset(),
            confidence: HEURISTIC_CONFIDENCE,
        }
    }
}

/// Infers emotional tone
#[async_trait]
pub trait ToneClassifier: Send + Sync {
    /// Classify narrative text
    async fn process(&self, text: &str) -> ToneResult;

    /// Classify a recorded voice sample
    async fn process_voice(&self, sample: &[u8]) -> ToneResult {
        let _ = sample;
        ToneResult::for_label(Emotion::Neutral)
    }
}

// Tie-break order follows the table order.
const EMOTION_KEYWORDS: &[(Emotion, &[&str])] = &[
    (
        Emotion::Happy,
        &["happy", "joy", "delighted", "pleased", "cheerful", "\u{1F60A}", "\u{1F604}"],
    ),
    (
        Emotion::Sad,
        &["sad", "unhappy", "depressed", "melancholy", "sorrowful", "\u{1F622}", "\u{1F61E}"],
    ),
    (
        Emotion::Angry,
        &["angry", "furious", "enraged", "mad", "irritated", "\u{1F620}", "\u{1F621}"],
    ),
    (
        Emotion::Excited,
        &["excited", "thrilled", "enthusiastic", "eager", "pumped", "\u{1F389}", "\u{2728}"],
    ),
    (
        Emotion::Calm,
        &["calm", "peaceful", "serene", "tranquil", "relaxed", "\u{1F9D8}"],
    ),
];

/// Score each label by how many of its keywords occur in `text`
/// (case-insensitive substring match) and return the best label.
/// Ties go to the earlier label; no matches at all means `Neutral`.
pub fn detect_emotion(text: &str) -> Emotion {
    let lower = text.to_lowercase();
    let mut best = (Emotion::Neutral, 0usize);
    for (emotion, keywords) in EMOTION_KEYWORDS {
        let score = keywords.iter().filter(|k| lower.contains(*k)).count();
        if score > best.1 {
            best = (*emotion, score);
        }
    }
    best.0
}

/// Keyword classifier with an optional remote override
#[derive(Default)]
pub struct KeywordToneClassifier {
    remote: Option<Arc<dyn HttpConnector>>,
}

impl KeywordToneClassifier {
    /// Create a classifier that only uses the keyword table
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask `connector` first; it must accept `POST /predict {"text": ...}`
    /// and answer `{"emotion": label, "confidence": number}`
    pub fn with_remote(mut self, connector: Arc<dyn HttpConnector>) -> Self {
        self.remote = Some(connector);
        self
    }

    /// Whether a remote classification service is attached
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    async fn classify_remote(
        &self,
        connector: &dyn HttpConnector,
        text: &str,
    ) -> Result<ToneResult, ConnectorError> {
        let response = connector.post("/predict", &json!({ "text": text })).await?;
        parse_prediction(&response)
    }
}

fn parse_prediction(response: &Value) -> Result<ToneResult, ConnectorError> {
    let label = response
        .get("emotion")
        .and_then(Value::as_str)
        .ok_or_else(|| ConnectorError::Parse("prediction has no 'emotion' field".to_string()))?;
    let mut result = ToneResult::for_label(Emotion::from_label(label));
    if let Some(confidence) = response.get("confidence").and_then(Value::as_f64) {
        result.confidence = confidence.clamp(0.0, 1.0) as f32;
    }
    Ok(result)
}

#[async_trait]
impl ToneClassifier for KeywordToneClassifier {
    async fn process(&self, text: &str) -> ToneResult {
        if let Some(connector) = &self.remote {
            match self.classify_remote(connector.as_ref(), text).await {
                Ok(result) => {
                    debug!(emotion = %result.label, "remote tone classification");
                    return result;
                }
                Err(e) => {
                    warn!(error = %e, "emotion service failed, using keyword heuristic");
                }
            }
        }

        let label = detect_emotion(text);
        debug!(emotion = %label, "keyword tone classification");
        ToneResult::for_label(label)
    }
}
