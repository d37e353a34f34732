//! Testing utilities for the playback pipeline.
//!
//! `MockHttpConnector` stands in for any HTTP-kind connector
//! (`emotionModelAPI`, `textPreprocessor`, device transports) so the pipeline
//! can be exercised without a network.

use async_trait::async_trait;
use holo_connect::config::ConnectorKind;
use holo_connect::connector::{Connector, HttpConnector};
use holo_connect::error::ConnectorError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// A request the mock received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// `"GET"` or `"POST"`.
    pub method: &'static str,
    /// Request path.
    pub path: String,
    /// Query parameters or body.
    pub payload: Value,
}

/// An HTTP connector that returns scripted responses.
///
/// Every call is recorded. Paths without a scripted response answer with a
/// 404 `Api` error; a failing mock answers every call with a `Network` error.
pub struct MockHttpConnector {
    name: String,
    responses: HashMap<String, Value>,
    fail: bool,
    calls: Mutex<Vec<RecordedCall>>,
    connected: AtomicBool,
}

impl MockHttpConnector {
    /// Create a mock with no scripted responses.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: HashMap::new(),
            fail: false,
            calls: Mutex::new(Vec::new()),
            connected: AtomicBool::new(false),
        }
    }

    /// Script the response for `path`.
    pub fn with_response(mut self, path: impl Into<String>, response: Value) -> Self {
        self.responses.insert(path.into(), response);
        self
    }

    /// Make every call fail.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Calls received so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Calls received for `path`.
    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.path == path)
            .collect()
    }

    fn respond(&self, method: &'static str, path: &str, payload: &Value) -> Result<Value, ConnectorError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                method,
                path: path.to_string(),
                payload: payload.clone(),
            });
        }
        self.connected.store(true, Ordering::SeqCst);

        if self.fail {
            return Err(ConnectorError::Network(format!("{} is unreachable", self.name)));
        }
        self.responses
            .get(path)
            .cloned()
            .ok_or_else(|| ConnectorError::Api {
                status: 404,
                message: format!("no scripted response for {method} {path}"),
            })
    }
}

#[async_trait]
impl Connector for MockHttpConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Http
    }

    async fn connect(&self) -> Result<bool, ConnectorError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(true)
    }

    async fn disconnect(&self) -> Result<bool, ConnectorError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(true)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpConnector for MockHttpConnector {
    async fn get(&self, path: &str, params: &Value) -> Result<Value, ConnectorError> {
        self.respond("GET", path, params)
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ConnectorError> {
        self.respond("POST", path, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_scripted_and_unscripted_paths() {
        let mock = MockHttpConnector::new("emotionModelAPI")
            .with_response("/predict", json!({"emotion": "sad"}));

        let response = mock.post("/predict", &json!({"text": "hi"})).await.unwrap();
        assert_eq!(response["emotion"], "sad");

        let err = mock.get("/other", &Value::Null).await.unwrap_err();
        assert!(matches!(err, ConnectorError::Api { status: 404, .. }));

        let calls = mock.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].method, "POST");
        assert_eq!(calls[0].payload, json!({"text": "hi"}));
    }

    #[tokio::test]
    async fn test_failing_mock() {
        let mock = MockHttpConnector::new("TTS")
            .with_response("/", json!({}))
            .failing();
        assert!(matches!(
            mock.post("/", &json!({})).await,
            Err(ConnectorError::Network(_))
        ));
        assert_eq!(mock.calls_to("/").len(), 1);
    }
}
