//! Haptic and scent output derived from highlights and tone.

use crate::segment::Highlight;
use crate::tone::Emotion;
use async_trait::async_trait;
use holo_connect::connector::HttpConnector;
use holo_connect::error::ConnectorError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Intensity of every scent trigger
pub const SCENT_INTENSITY: f32 = 0.5;

/// Duration of every scent trigger, in milliseconds
pub const SCENT_DURATION_MS: u64 = 3000;

/// Vibration template for one emotion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HapticTemplate {
    pub pattern: &'static str,
    pub intensity: f32,
    pub duration_ms: u64,
}

static HAPTIC_TEMPLATES: Lazy<HashMap<Emotion, HapticTemplate>> = Lazy::new(|| {
    let template = |pattern, intensity, duration_ms| HapticTemplate {
        pattern,
        intensity,
        duration_ms,
    };
    HashMap::from([
        (Emotion::Happy, template("gentle_pulse", 0.6, 200)),
        (Emotion::Sad, template("slow_wave", 0.4, 500)),
        (Emotion::Angry, template("sharp_burst", 0.9, 150)),
        (Emotion::Calm, template("smooth_wave", 0.3, 300)),
        (Emotion::Excited, template("rapid_pulse", 0.8, 100)),
        (Emotion::Neutral, template("subtle_tap", 0.5, 200)),
    ])
});

static SCENTS: Lazy<HashMap<Emotion, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (Emotion::Happy, "citrus"),
        (Emotion::Sad, "lavender"),
        (Emotion::Angry, "peppermint"),
        (Emotion::Calm, "chamomile"),
        (Emotion::Excited, "eucalyptus"),
        (Emotion::Neutral, "vanilla"),
    ])
});

/// Haptic template for `emotion`, falling back to the neutral entry
pub fn haptic_template(emotion: Emotion) -> HapticTemplate {
    HAPTIC_TEMPLATES
        .get(&emotion)
        .or_else(|| HAPTIC_TEMPLATES.get(&Emotion::Neutral))
        .copied()
        .unwrap_or(HapticTemplate {
            pattern: "subtle_tap",
            intensity: 0.5,
            duration_ms: 200,
        })
}

/// Scent for `emotion`, falling back to the neutral entry
pub fn scent_for(emotion: Emotion) -> &'static str {
    SCENTS
        .get(&emotion)
        .or_else(|| SCENTS.get(&Emotion::Neutral))
        .copied()
        .unwrap_or("vanilla")
}

/// A timestamped vibration instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HapticEvent {
    /// Seconds from the start of playback
    pub timestamp: f64,
    pub pattern: String,
    pub intensity: f32,
    /// Milliseconds
    pub duration: u64,
    pub trigger: String,
    pub metadata: Map<String, Value>,
}

/// An olfactory-output instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScentEvent {
    pub scent: String,
    pub intensity: f32,
    /// Milliseconds
    pub duration: u64,
    pub trigger: String,
}

/// Events computed for one segment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceOutputs {
    pub haptic_events: Vec<HapticEvent>,
    pub scent_events: Vec<ScentEvent>,
}

/// Which transports accepted a dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub haptics_sent: bool,
    pub scent_sent: bool,
}

/// Maps highlights and tone to device events
#[async_trait]
pub trait DeviceMapper: Send + Sync {
    /// Compute events. `timestamps[i]` belongs to `highlights[i]`; a missing
    /// timestamp is `0.0`.
    async fn process(
        &self,
        highlights: &[Highlight],
        emotion: Emotion,
        timestamps: &[f64],
    ) -> DeviceOutputs;

    /// Send computed events to the device transports, if any
    async fn dispatch(&self, outputs: &DeviceOutputs) -> DispatchReport {
        let _ = outputs;
        DispatchReport::default()
    }
}

/// Lookup-table mapper with optional haptic and scent transports
#[derive(Default)]
pub struct TableDeviceMapper {
    haptic_transport: Option<Arc<dyn HttpConnector>>,
    scent_transport: Option<Arc<dyn HttpConnector>>,
}

impl TableDeviceMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the `hapticTransport` connector; events go to `POST /haptics`
    pub fn with_haptic_transport(mut self, connector: Arc<dyn HttpConnector>) -> Self {
        self.haptic_transport = Some(connector);
        self
    }

    /// Attach the `scentTransport` connector; events go to `POST /scent`
    pub fn with_scent_transport(mut self, connector: Arc<dyn HttpConnector>) -> Self {
        self.scent_transport = Some(connector);
        self
    }

    /// Pure table lookup, no transport involved
    pub fn map_events(
        highlights: &[Highlight],
        emotion: Emotion,
        timestamps: &[f64],
    ) -> DeviceOutputs {
        let template = haptic_template(emotion);
        let haptic_events = highlights
            .iter()
            .enumerate()
            .map(|(idx, highlight)| {
                let mut metadata = Map::new();
                metadata.insert("highlight_text".into(), Value::from(highlight.text.clone()));
                metadata.insert("highlight_type".into(), Value::from(highlight.kind.as_str()));
                HapticEvent {
                    timestamp: timestamps.get(idx).copied().unwrap_or(0.0),
                    pattern: template.pattern.to_string(),
                    intensity: template.intensity,
                    duration: template.duration_ms,
                    trigger: "highlight".to_string(),
                    metadata,
                }
            })
            .collect();

        let scent_events = vec![ScentEvent {
            scent: scent_for(emotion).to_string(),
            intensity: SCENT_INTENSITY,
            duration: SCENT_DURATION_MS,
            trigger: "emotion".to_string(),
        }];

        DeviceOutputs {
            haptic_events,
            scent_events,
        }
    }
}

async fn send(
    transport: Option<&Arc<dyn HttpConnector>>,
    path: &str,
    body: Value,
) -> Option<Result<Value, ConnectorError>> {
    match transport {
        Some(connector) => Some(connector.post(path, &body).await),
        None => None,
    }
}

#[async_trait]
impl DeviceMapper for TableDeviceMapper {
    async fn process(
        &self,
        highlights: &[Highlight],
        emotion: Emotion,
        timestamps: &[f64],
    ) -> DeviceOutputs {
        let outputs = Self::map_events(highlights, emotion, timestamps);
        debug!(
            emotion = %emotion,
            haptic = outputs.haptic_events.len(),
            scent = outputs.scent_events.len(),
            "device events mapped"
        );
        outputs
    }

    async fn dispatch(&self, outputs: &DeviceOutputs) -> DispatchReport {
        let haptics = (!outputs.haptic_events.is_empty())
            .then(|| self.haptic_transport.as_ref())
            .flatten();
        let scent = (!outputs.scent_events.is_empty())
            .then(|| self.scent_transport.as_ref())
            .flatten();

        let (haptic_result, scent_result) = futures::join!(
            send(haptics, "/haptics", json!({ "events": outputs.haptic_events })),
            send(scent, "/scent", json!({ "events": outputs.scent_events })),
        );

        let mut report = DispatchReport::default();
        match haptic_result {
            Some(Ok(_)) => report.haptics_sent = true,
            Some(Err(e)) => warn!(error = %e, "haptic dispatch failed"),
            None => {}
        }
        match scent_result {
            Some(Ok(_)) => report.scent_sent = true,
            Some(Err(e)) => warn!(error = %e, "scent dispatch failed"),
            None => {}
        }
        report
    }
}
