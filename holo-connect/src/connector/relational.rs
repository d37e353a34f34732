//! Relational connector backed by SQLite through sqlx.

use super::{Connector, ExecStatus, RelationalConnector, Row};
use crate::config::ConnectorKind;
use crate::error::ConnectorError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, Sqlite, TypeInfo, ValueRef};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// SQLite connector.
///
/// In-memory databases live in a single pooled connection that is never
/// recycled, so their contents persist until `disconnect`.
pub struct SqliteConnector {
    name: String,
    url: String,
    pool: RwLock<Option<SqlitePool>>,
    connected: AtomicBool,
}

impl SqliteConnector {
    /// Create a connector for a connection string such as `sqlite::memory:`
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            pool: RwLock::new(None),
            connected: AtomicBool::new(false),
        }
    }

    fn is_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }

    async fn pool(&self) -> Result<SqlitePool, ConnectorError> {
        if let Some(pool) = self.pool.read().await.as_ref() {
            return Ok(pool.clone());
        }
        self.connect().await?;
        self.pool
            .read()
            .await
            .clone()
            .ok_or_else(|| ConnectorError::NotConnected {
                name: self.name.clone(),
            })
    }
}

/// Bind JSON arguments positionally
fn build_query<'q>(sql: &'q str, args: &[Value]) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    let mut query = sqlx::query(sql);
    for arg in args {
        query = match arg {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => query.bind(i),
                None => query.bind(n.as_f64()),
            },
            Value::String(s) => query.bind(s.clone()),
            other => query.bind(other.to_string()),
        };
    }
    query
}

/// Decode a row into a JSON object by each value's storage class
fn decode_row(row: &SqliteRow) -> Result<Row, ConnectorError> {
    let mut out = Map::new();
    for column in row.columns() {
        let ordinal = column.ordinal();
        let raw = row.try_get_raw(ordinal)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let storage = raw.type_info().name().to_string();
            match storage.as_str() {
                "INTEGER" | "BOOLEAN" => Value::from(row.try_get_unchecked::<i64, _>(ordinal)?),
                "REAL" => serde_json::Number::from_f64(row.try_get_unchecked::<f64, _>(ordinal)?)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                "BLOB" => Value::from(row.try_get_unchecked::<Vec<u8>, _>(ordinal)?),
                _ => Value::from(row.try_get_unchecked::<String, _>(ordinal)?),
            }
        };
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}

#[async_trait]
impl Connector for SqliteConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Relational
    }

    async fn connect(&self) -> Result<bool, ConnectorError> {
        let mut slot = self.pool.write().await;
        if slot.is_none() {
            let options = if self.is_memory() {
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
            } else {
                SqlitePoolOptions::new().max_connections(5)
            };
            let pool = options.connect(&self.url).await?;
            *slot = Some(pool);
            info!(connector = %self.name, url = %self.url, "relational connector ready");
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(true)
    }

    async fn disconnect(&self) -> Result<bool, ConnectorError> {
        if let Some(pool) = self.pool.write().await.take() {
            pool.close().await;
        }
        self.connected.store(false, Ordering::SeqCst);
        Ok(true)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelationalConnector for SqliteConnector {
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Row>, ConnectorError> {
        let pool = self.pool().await?;
        let rows = build_query(sql, args).fetch_all(&pool).await?;
        debug!(connector = %self.name, rows = rows.len(), "query");
        rows.iter().map(decode_row).collect()
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecStatus, ConnectorError> {
        let pool = self.pool().await?;
        let result = build_query(sql, args).execute(&pool).await?;
        debug!(connector = %self.name, rows_affected = result.rows_affected(), "execute");
        Ok(ExecStatus {
            rows_affected: result.rows_affected(),
        })
    }
}
