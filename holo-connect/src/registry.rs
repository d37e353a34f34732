//! Name-keyed registry of live connectors.

use crate::config::{ConnectorKind, ConnectorName, ConnectorSpec, ConnectorsConfig};
use crate::connector::{
    HttpConnector, InMemoryVectorIndex, RelationalConnector, RestConnector,
    SqliteConnector, VectorConnector,
};
use crate::error::{ConfigError, ConfigResult, ConnectorError};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A connector of any kind, kept behind its kind-specific trait
#[derive(Clone)]
pub enum ConnectorHandle {
    /// Request/response connector
    Http(Arc<dyn HttpConnector>),
    /// Vector similarity connector
    Vector(Arc<dyn VectorConnector>),
    /// Relational connector
    Relational(Arc<dyn RelationalConnector>),
}

impl ConnectorHandle {
    /// Transport family of the wrapped connector
    pub fn kind(&self) -> ConnectorKind {
        match self {
            ConnectorHandle::Http(_) => ConnectorKind::Http,
            ConnectorHandle::Vector(_) => ConnectorKind::Vector,
            ConnectorHandle::Relational(_) => ConnectorKind::Relational,
        }
    }

    /// Establish the transport
    pub async fn connect(&self) -> Result<bool, ConnectorError> {
        match self {
            ConnectorHandle::Http(c) => c.connect().await,
            ConnectorHandle::Vector(c) => c.connect().await,
            ConnectorHandle::Relational(c) => c.connect().await,
        }
    }

    /// Release the transport
    pub async fn disconnect(&self) -> Result<bool, ConnectorError> {
        match self {
            ConnectorHandle::Http(c) => c.disconnect().await,
            ConnectorHandle::Vector(c) => c.disconnect().await,
            ConnectorHandle::Relational(c) => c.disconnect().await,
        }
    }

    /// Whether the transport is established
    pub fn is_connected(&self) -> bool {
        match self {
            ConnectorHandle::Http(c) => c.is_connected(),
            ConnectorHandle::Vector(c) => c.is_connected(),
            ConnectorHandle::Relational(c) => c.is_connected(),
        }
    }
}

/// Outcome of a lifecycle call on one connector
#[derive(Debug)]
pub struct LifecycleOutcome {
    /// Which connector
    pub name: ConnectorName,
    /// What the connector reported
    pub result: Result<bool, ConnectorError>,
}

/// Registry of connectors keyed by symbolic name
#[derive(Default, Clone)]
pub struct ConnectorRegistry {
    connectors: BTreeMap<ConnectorName, ConnectorHandle>,
}

impl fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorRegistry")
            .field("connector_count", &self.connectors.len())
            .field("connectors", &self.connectors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ConnectorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build concrete connectors for every binding in `config`
    pub fn from_config(config: &ConnectorsConfig) -> ConfigResult<Self> {
        config.validate()?;

        let mut registry = Self::new();
        for (name, spec) in &config.connectors {
            let handle = match spec {
                ConnectorSpec::Http {
                    url,
                    headers,
                    timeout_secs,
                } => {
                    let connector = RestConnector::new(
                        name.as_str(),
                        url.clone(),
                        headers,
                        Duration::from_secs(*timeout_secs),
                    )
                    .map_err(|source| ConfigError::Build { name: *name, source })?;
                    ConnectorHandle::Http(Arc::new(connector))
                }
                ConnectorSpec::Vector { index, dimension } => ConnectorHandle::Vector(Arc::new(
                    InMemoryVectorIndex::new(name.as_str(), index.clone(), *dimension),
                )),
                ConnectorSpec::Relational { connection } => ConnectorHandle::Relational(Arc::new(
                    SqliteConnector::new(name.as_str(), connection.clone()),
                )),
            };
            registry.insert(*name, handle);
        }

        info!(connectors = ?registry.names().collect::<Vec<_>>(), "connector registry built");
        Ok(registry)
    }

    /// Register a connector, replacing any previous one under the same name
    pub fn insert(&mut self, name: ConnectorName, handle: ConnectorHandle) -> &mut Self {
        self.connectors.insert(name, handle);
        self
    }

    /// Register an HTTP connector
    pub fn with_http(mut self, name: ConnectorName, connector: Arc<dyn HttpConnector>) -> Self {
        self.insert(name, ConnectorHandle::Http(connector));
        self
    }

    /// Register a vector connector
    pub fn with_vector(mut self, name: ConnectorName, connector: Arc<dyn VectorConnector>) -> Self {
        self.insert(name, ConnectorHandle::Vector(connector));
        self
    }

    /// Register a relational connector
    pub fn with_relational(
        mut self,
        name: ConnectorName,
        connector: Arc<dyn RelationalConnector>,
    ) -> Self {
        self.insert(name, ConnectorHandle::Relational(connector));
        self
    }

    /// Get a connector of any kind
    pub fn get(&self, name: ConnectorName) -> Option<&ConnectorHandle> {
        self.connectors.get(&name)
    }

    /// Get an HTTP connector; `None` if absent or of another kind
    pub fn http(&self, name: ConnectorName) -> Option<Arc<dyn HttpConnector>> {
        match self.connectors.get(&name) {
            Some(ConnectorHandle::Http(c)) => Some(Arc::clone(c)),
            _ => None,
        }
    }

    /// Get a vector connector; `None` if absent or of another kind
    pub fn vector(&self, name: ConnectorName) -> Option<Arc<dyn VectorConnector>> {
        match self.connectors.get(&name) {
            Some(ConnectorHandle::Vector(c)) => Some(Arc::clone(c)),
            _ => None,
        }
    }

    /// Get a relational connector; `None` if absent or of another kind
    pub fn relational(&self, name: ConnectorName) -> Option<Arc<dyn RelationalConnector>> {
        match self.connectors.get(&name) {
            Some(ConnectorHandle::Relational(c)) => Some(Arc::clone(c)),
            _ => None,
        }
    }

    /// Check if a connector is registered under `name`
    pub fn contains(&self, name: ConnectorName) -> bool {
        self.connectors.contains_key(&name)
    }

    /// Registered names
    pub fn names(&self) -> impl Iterator<Item = ConnectorName> + '_ {
        self.connectors.keys().copied()
    }

    /// Number of registered connectors
    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }

    /// Connect every connector concurrently
    pub async fn connect_all(&self) -> Vec<LifecycleOutcome> {
        let outcomes = join_all(self.connectors.iter().map(|(name, handle)| async move {
            LifecycleOutcome {
                name: *name,
                result: handle.connect().await,
            }
        }))
        .await;

        for outcome in &outcomes {
            if let Err(e) = &outcome.result {
                warn!(connector = %outcome.name, error = %e, "connect failed");
            }
        }
        outcomes
    }

    /// Disconnect every connector concurrently
    pub async fn disconnect_all(&self) -> Vec<LifecycleOutcome> {
        join_all(self.connectors.iter().map(|(name, handle)| async move {
            LifecycleOutcome {
                name: *name,
                result: handle.disconnect().await,
            }
        }))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ConnectorsConfig {
        ConnectorsConfig::new()
            .with_connector(ConnectorName::Tts, ConnectorSpec::http("https://tts.example.com"))
            .with_connector(ConnectorName::VectorDb, ConnectorSpec::vector("sessions"))
            .with_connector(
                ConnectorName::RelationalStore,
                ConnectorSpec::relational("sqlite::memory:"),
            )
    }

    #[test]
    fn test_registry_from_config() {
        let registry = ConnectorRegistry::from_config(&config()).unwrap();
        assert_eq!(registry.len(), 3);
        assert!(registry.http(ConnectorName::Tts).is_some());
        assert!(registry.vector(ConnectorName::VectorDb).is_some());
        assert!(registry.relational(ConnectorName::RelationalStore).is_some());
        assert!(!registry.contains(ConnectorName::EmotionModelApi));
    }

    #[test]
    fn test_typed_lookup_rejects_other_kinds() {
        let registry = ConnectorRegistry::from_config(&config()).unwrap();
        assert!(registry.http(ConnectorName::VectorDb).is_none());
        assert!(registry.vector(ConnectorName::Tts).is_none());
    }

    #[tokio::test]
    async fn test_connect_and_disconnect_all() {
        let registry = ConnectorRegistry::from_config(&config()).unwrap();
        let outcomes = registry.connect_all().await;
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|o| matches!(o.result, Ok(true))));
        assert!(registry.names().all(|n| registry.get(n).unwrap().is_connected()));

        registry.disconnect_all().await;
        assert!(registry.names().all(|n| !registry.get(n).unwrap().is_connected()));
    }
}
