//! HTTP connector built on reqwest.

use super::{Connector, HttpConnector};
use crate::config::ConnectorKind;
use crate::error::ConnectorError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// JSON-over-HTTP connector rooted at a base URL
pub struct RestConnector {
    name: String,
    base_url: String,
    headers: HeaderMap,
    timeout: Duration,
    client: RwLock<Option<reqwest::Client>>,
    connected: AtomicBool,
}

impl RestConnector {
    /// Create a connector. Header names and values are validated up front.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        headers: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Self, ConnectorError> {
        let mut header_map = HeaderMap::new();
        header_map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (key, value) in headers {
            let header_name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| ConnectorError::Configuration(format!("Invalid header '{}': {}", key, e)))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| ConnectorError::Configuration(format!("Invalid header '{}': {}", key, e)))?;
            header_map.insert(header_name, header_value);
        }

        Ok(Self {
            name: name.into(),
            base_url: base_url.into(),
            headers: header_map,
            timeout,
            client: RwLock::new(None),
            connected: AtomicBool::new(false),
        })
    }

    /// Base URL this connector was built with
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join a request path onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url.trim_end_matches('/'), path)
        }
    }

    /// Current client, connecting first if needed
    async fn client(&self) -> Result<reqwest::Client, ConnectorError> {
        if let Some(client) = self.client.read().await.as_ref() {
            return Ok(client.clone());
        }
        self.connect().await?;
        self.client
            .read()
            .await
            .clone()
            .ok_or_else(|| ConnectorError::NotConnected {
                name: self.name.clone(),
            })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, ConnectorError> {
        let response = request.send().await.map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ConnectorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await.map_err(|e| self.classify(e))?;
        if body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&body).map_err(|e| ConnectorError::Parse(e.to_string()))
    }

    fn classify(&self, err: reqwest::Error) -> ConnectorError {
        if err.is_timeout() {
            ConnectorError::Timeout {
                duration: self.timeout,
            }
        } else {
            err.into()
        }
    }
}

/// Flatten a JSON object into query pairs; strings are sent unquoted
fn query_pairs(params: &Value) -> Result<Vec<(String, String)>, ConnectorError> {
    match params {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => Ok(map
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect()),
        other => Err(ConnectorError::InvalidRequest(format!(
            "query parameters must be an object, got {}",
            other
        ))),
    }
}

#[async_trait]
impl Connector for RestConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Http
    }

    async fn connect(&self) -> Result<bool, ConnectorError> {
        let mut slot = self.client.write().await;
        if slot.is_none() {
            let client = reqwest::Client::builder()
                .default_headers(self.headers.clone())
                .timeout(self.timeout)
                .build()
                .map_err(|e| ConnectorError::Configuration(e.to_string()))?;
            *slot = Some(client);
            debug!(connector = %self.name, url = %self.base_url, "HTTP connector ready");
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(true)
    }

    async fn disconnect(&self) -> Result<bool, ConnectorError> {
        self.client.write().await.take();
        self.connected.store(false, Ordering::SeqCst);
        Ok(true)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpConnector for RestConnector {
    async fn get(&self, path: &str, params: &Value) -> Result<Value, ConnectorError> {
        let pairs = query_pairs(params)?;
        let client = self.client().await?;
        let url = self.endpoint(path);
        debug!(connector = %self.name, %url, "GET");
        self.send(client.get(url).query(&pairs)).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ConnectorError> {
        let client = self.client().await?;
        let url = self.endpoint(path);
        debug!(connector = %self.name, %url, "POST");
        self.send(client.post(url).json(body)).await
    }
}
