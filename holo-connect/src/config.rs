//! Connector configuration.
//!
//! The orchestrator knows its external collaborators only by a fixed set of
//! symbolic names. Each name maps to a transport kind and the parameters
//! needed to reach it. This mapping is the sole configuration input of the
//! playback core.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

/// Symbolic connector names understood by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConnectorName {
    /// Optional text normalization service
    #[serde(rename = "textPreprocessor")]
    TextPreprocessor,
    /// Vector index holding past-session embeddings
    #[serde(rename = "vectorDB")]
    VectorDb,
    /// External emotion classification service
    #[serde(rename = "emotionModelAPI")]
    EmotionModelApi,
    /// Voice synthesis service
    #[serde(rename = "TTS")]
    Tts,
    /// Haptic device transport
    #[serde(rename = "hapticTransport")]
    HapticTransport,
    /// Scent device transport
    #[serde(rename = "scentTransport")]
    ScentTransport,
    /// Relational store for preferences and bookmarks
    #[serde(rename = "relationalStore")]
    RelationalStore,
}

impl ConnectorName {
    /// All names, in a stable order
    pub const ALL: [ConnectorName; 7] = [
        ConnectorName::TextPreprocessor,
        ConnectorName::VectorDb,
        ConnectorName::EmotionModelApi,
        ConnectorName::Tts,
        ConnectorName::HapticTransport,
        ConnectorName::ScentTransport,
        ConnectorName::RelationalStore,
    ];

    /// The configuration key for this name
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorName::TextPreprocessor => "textPreprocessor",
            ConnectorName::VectorDb => "vectorDB",
            ConnectorName::EmotionModelApi => "emotionModelAPI",
            ConnectorName::Tts => "TTS",
            ConnectorName::HapticTransport => "hapticTransport",
            ConnectorName::ScentTransport => "scentTransport",
            ConnectorName::RelationalStore => "relationalStore",
        }
    }

    /// The only transport kind this name may be bound to
    pub fn expected_kind(&self) -> ConnectorKind {
        match self {
            ConnectorName::VectorDb => ConnectorKind::Vector,
            ConnectorName::RelationalStore => ConnectorKind::Relational,
            _ => ConnectorKind::Http,
        }
    }
}

impl fmt::Display for ConnectorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport families a connector can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorKind {
    /// Request/response over HTTP
    Http,
    /// Vector similarity search
    Vector,
    /// Relational query/execute
    Relational,
}

impl fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectorKind::Http => "http",
            ConnectorKind::Vector => "vector",
            ConnectorKind::Relational => "relational",
        })
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_dimension() -> usize {
    64
}

/// Connection parameters for one connector, tagged by transport kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectorSpec {
    /// HTTP service reached at a base URL
    Http {
        /// Base URL; request paths are joined onto it
        url: String,
        /// Extra headers sent with every request
        #[serde(default)]
        headers: HashMap<String, String>,
        /// Per-request timeout
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    /// Vector index identified by name
    Vector {
        /// Index name
        index: String,
        /// Embedding dimension accepted by the index
        #[serde(default = "default_dimension")]
        dimension: usize,
    },
    /// Relational database reached by connection string
    Relational {
        /// Connection string, e.g. `sqlite::memory:`
        connection: String,
    },
}

impl ConnectorSpec {
    /// Create an HTTP spec with default headers and timeout
    pub fn http(url: impl Into<String>) -> Self {
        ConnectorSpec::Http {
            url: url.into(),
            headers: HashMap::new(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Create a vector spec with the default dimension
    pub fn vector(index: impl Into<String>) -> Self {
        ConnectorSpec::Vector {
            index: index.into(),
            dimension: default_dimension(),
        }
    }

    /// Create a relational spec
    pub fn relational(connection: impl Into<String>) -> Self {
        ConnectorSpec::Relational {
            connection: connection.into(),
        }
    }

    /// Transport kind of this spec
    pub fn kind(&self) -> ConnectorKind {
        match self {
            ConnectorSpec::Http { .. } => ConnectorKind::Http,
            ConnectorSpec::Vector { .. } => ConnectorKind::Vector,
            ConnectorSpec::Relational { .. } => ConnectorKind::Relational,
        }
    }

    /// Request timeout, for HTTP specs
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            ConnectorSpec::Http { timeout_secs, .. } => Some(Duration::from_secs(*timeout_secs)),
            _ => None,
        }
    }

    fn required_parameter(&self) -> (&'static str, &str) {
        match self {
            ConnectorSpec::Http { url, .. } => ("url", url),
            ConnectorSpec::Vector { index, .. } => ("index", index),
            ConnectorSpec::Relational { connection } => ("connection", connection),
        }
    }
}

/// Mapping from symbolic connector names to their specs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectorsConfig {
    /// Configured connectors; names left out are simply unavailable
    #[serde(default)]
    pub connectors: BTreeMap<ConnectorName, ConnectorSpec>,
}

impl ConnectorsConfig {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a name to a spec, replacing any previous binding
    pub fn with_connector(mut self, name: ConnectorName, spec: ConnectorSpec) -> Self {
        self.connectors.insert(name, spec);
        self
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(source: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Look up the spec bound to a name
    pub fn get(&self, name: ConnectorName) -> Option<&ConnectorSpec> {
        self.connectors.get(&name)
    }

    /// Check kinds and required parameters of every binding
    pub fn validate(&self) -> ConfigResult<()> {
        for (name, spec) in &self.connectors {
            let expected = name.expected_kind();
            if spec.kind() != expected {
                return Err(ConfigError::WrongKind {
                    name: *name,
                    expected,
                    found: spec.kind(),
                });
            }
            let (parameter, value) = spec.required_parameter();
            if value.trim().is_empty() {
                return Err(ConfigError::MissingParameter {
                    name: *name,
                    parameter,
                });
            }
        }
        Ok(())
    }
}
