//! Connector traits and shared transport types.
//!
//! A connector is a named, lifecycle-managed adapter to one external
//! transport. Every connector implements [`Connector`]; the operation set it
//! offers depends on its kind, expressed as one extension trait per kind.
//! Components receive connectors by name from the
//! [`ConnectorRegistry`](crate::registry::ConnectorRegistry) and never
//! construct them.

pub mod http;
pub mod relational;
pub mod vector;

use crate::config::ConnectorKind;
use crate::error::ConnectorError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use http::RestConnector;
pub use relational::SqliteConnector;
pub use vector::InMemoryVectorIndex;

/// Lifecycle shared by every connector
#[async_trait]
pub trait Connector: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Transport family
    fn kind(&self) -> ConnectorKind;

    /// Establish the transport. Returns `true` once the connector is ready.
    async fn connect(&self) -> Result<bool, ConnectorError>;

    /// Release the transport. Returns `true` once the connector is closed.
    async fn disconnect(&self) -> Result<bool, ConnectorError>;

    /// Whether the transport is currently established
    fn is_connected(&self) -> bool;
}

/// Request/response transport
#[async_trait]
pub trait HttpConnector: Connector {
    /// GET `path` with query parameters taken from a JSON object
    async fn get(&self, path: &str, params: &Value) -> Result<Value, ConnectorError>;

    /// POST a JSON body to `path`
    async fn post(&self, path: &str, body: &Value) -> Result<Value, ConnectorError>;
}

/// Vector similarity transport
#[async_trait]
pub trait VectorConnector: Connector {
    /// Return up to `top_k` records nearest to `vector`, restricted to records
    /// whose metadata contains every key/value pair of `filter`
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&Value>,
    ) -> Result<Vec<VectorMatch>, ConnectorError>;

    /// Insert or replace records by id. Returns the number written.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, ConnectorError>;
}

/// Relational transport
#[async_trait]
pub trait RelationalConnector: Connector {
    /// Run a statement that returns rows
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Row>, ConnectorError>;

    /// Run a statement that modifies data
    async fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecStatus, ConnectorError>;
}

/// One relational row, keyed by column name
pub type Row = Map<String, Value>;

/// Outcome of a relational `execute`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecStatus {
    /// Rows inserted, updated or deleted
    pub rows_affected: u64,
}

/// A record stored in a vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Record id, unique within the index
    pub id: String,
    /// Embedding values
    pub values: Vec<f32>,
    /// Arbitrary metadata, used for filtering and returned with matches
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl VectorRecord {
    /// Create a record without metadata
    pub fn new(id: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            values,
            metadata: Map::new(),
        }
    }

    /// Attach a metadata field
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A query hit from a vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    /// Id of the matching record
    pub id: String,
    /// Similarity score, higher is closer
    pub score: f32,
    /// Metadata of the matching record
    pub metadata: Map<String, Value>,
}
