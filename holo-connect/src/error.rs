//! Error types for connectors and connector configuration.
//!
//! Uses thiserror for ergonomic error definition.

use crate::config::{ConnectorKind, ConnectorName};
use std::time::Duration;

/// Errors raised by a connector while talking to its transport
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    /// Operation attempted on a connector that could not establish its transport
    #[error("Connector '{name}' is not connected")]
    NotConnected { name: String },

    /// Network/connection error
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success status from a remote service
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Request timed out
    #[error("Request timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Relational query or statement failed
    #[error("Query failed: {0}")]
    Query(String),

    /// Caller sent something the transport cannot accept
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Connector was built from unusable parameters
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for ConnectorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ConnectorError::Parse(err.to_string())
        } else {
            ConnectorError::Network(err.to_string())
        }
    }
}

impl From<sqlx::Error> for ConnectorError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => ConnectorError::Network("connection pool timed out".into()),
            sqlx::Error::Io(e) => ConnectorError::Network(e.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                ConnectorError::Parse(err.to_string())
            }
            other => ConnectorError::Query(other.to_string()),
        }
    }
}

/// Errors raised while loading or validating connector configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML document could not be parsed
    #[error("Invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON document could not be parsed
    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// A symbolic name was bound to a transport it cannot use
    #[error("Connector '{name}' must be of kind '{expected}', found '{found}'")]
    WrongKind {
        name: ConnectorName,
        expected: ConnectorKind,
        found: ConnectorKind,
    },

    /// A required connection parameter is blank
    #[error("Connector '{name}' is missing required parameter '{parameter}'")]
    MissingParameter {
        name: ConnectorName,
        parameter: &'static str,
    },

    /// Building a concrete connector failed
    #[error("Connector '{name}' could not be built: {source}")]
    Build {
        name: ConnectorName,
        #[source]
        source: ConnectorError,
    },
}

/// Result type for connector operations
pub type ConnectorResult<T> = std::result::Result<T, ConnectorError>;

/// Result type for configuration loading
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConnectorError::Api {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "API error (503): unavailable");
    }

    #[test]
    fn test_wrong_kind_display() {
        let err = ConfigError::WrongKind {
            name: ConnectorName::VectorDb,
            expected: ConnectorKind::Vector,
            found: ConnectorKind::Http,
        };
        assert_eq!(
            err.to_string(),
            "Connector 'vectorDB' must be of kind 'vector', found 'http'"
        );
    }

    #[test]
    fn test_sqlx_pool_timeout_is_network() {
        let err: ConnectorError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, ConnectorError::Network(_)));
    }
}
