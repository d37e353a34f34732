//! In-process vector index with cosine similarity.

use super::{Connector, VectorConnector, VectorMatch, VectorRecord};
use crate::config::ConnectorKind;
use crate::error::ConnectorError;
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// Vector index held in memory, keyed by record id.
///
/// Records survive `disconnect`; only the connection flag is reset.
pub struct InMemoryVectorIndex {
    name: String,
    index: String,
    dimension: usize,
    records: RwLock<HashMap<String, VectorRecord>>,
    connected: AtomicBool,
}

impl InMemoryVectorIndex {
    /// Create an empty index accepting vectors of `dimension` values
    pub fn new(name: impl Into<String>, index: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            index: index.into(),
            dimension,
            records: RwLock::new(HashMap::new()),
            connected: AtomicBool::new(false),
        }
    }

    /// Name of the index
    pub fn index_name(&self) -> &str {
        &self.index
    }

    /// Embedding dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the index holds no records
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn check_dimension(&self, values: &[f32]) -> Result<(), ConnectorError> {
        if values.len() != self.dimension {
            return Err(ConnectorError::InvalidRequest(format!(
                "index '{}' expects {} dimensions, got {}",
                self.index,
                self.dimension,
                values.len()
            )));
        }
        Ok(())
    }
}

/// Cosine similarity; zero vectors score 0.0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn matches_filter(record: &VectorRecord, filter: Option<&Value>) -> bool {
    match filter {
        Some(Value::Object(conditions)) => conditions
            .iter()
            .all(|(key, expected)| record.metadata.get(key) == Some(expected)),
        _ => true,
    }
}

#[async_trait]
impl Connector for InMemoryVectorIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Vector
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
impl VectorConnector for InMemoryVectorIndex {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&Value>,
    ) -> Result<Vec<VectorMatch>, ConnectorError> {
        if !self.is_connected() {
            self.connect().await?;
        }
        self.check_dimension(vector)?;

        let records = self.records.read().await;
        let mut matches: Vec<VectorMatch> = records
            .values()
            .filter(|record| matches_filter(record, filter))
            .map(|record| VectorMatch {
                id: record.id.clone(),
                score: cosine_similarity(vector, &record.values),
                metadata: record.metadata.clone(),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(CmpOrdering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(top_k);

        debug!(index = %self.index, hits = matches.len(), "vector query");
        Ok(matches)
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, ConnectorError> {
        if !self.is_connected() {
            self.connect().await?;
        }
        for record in &records {
            self.check_dimension(&record.values)?;
        }

        let count = records.len();
        let mut stored = self.records.write().await;
        for record in records {
            stored.insert(record.id.clone(), record);
        }
        debug!(index = %self.index, upserted = count, "vector upsert");
        Ok(count)
    }
}
