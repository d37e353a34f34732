//! Error types for the playback pipeline

use holo_connect::error::{ConfigError, ConnectorError};
use thiserror::Error;

/// Errors from a preference store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    /// A stored row did not have the expected columns or types
    #[error("Malformed {table} row: {message}")]
    Decode {
        table: &'static str,
        message: String,
    },
}

/// Errors raised while driving a playback operation.
///
/// These never cross the orchestrator's public boundary; they are folded into
/// the `error` field of the structured responses.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("No segments generated")]
    NoSegments,

    /// Seek or summary on a session with nothing loaded
    #[error("No segments available")]
    NoSession,

    #[error("Invalid segment index")]
    InvalidSegment { index: i64, total: usize },

    #[error("Preference lookup failed: {0}")]
    Preferences(#[from] StoreError),

    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type StoreResult<T> = Result<T, StoreError>;
pub type PlaybackResult<T> = Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_messages() {
        assert_eq!(PlaybackError::NoSegments.to_string(), "No segments generated");
        assert_eq!(
            PlaybackError::InvalidSegment { index: 999, total: 3 }.to_string(),
            "Invalid segment index"
        );
    }

    #[test]
    fn test_store_error_from_connector() {
        let err: StoreError = ConnectorError::Query("no such table".into()).into();
        assert!(matches!(err, StoreError::Connector(ConnectorError::Query(_))));
    }
}
