//! # Holo Connect
//!
//! Transport adapters for the Holo narrative playback pipeline.
//!
//! ## Core Concepts
//!
//! - **Connector**: a named, lifecycle-managed adapter (`connect`/`disconnect`)
//! - **Kinds**: HTTP request/response, vector similarity, relational query/execute
//! - **Registry**: connectors resolved by fixed symbolic names from configuration
//!
//! ## Example
//!
//! ```rust,ignore
//! use holo_connect::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConnectorsConfig::new()
//!         .with_connector(ConnectorName::RelationalStore, ConnectorSpec::relational("sqlite::memory:"));
//!     let registry = ConnectorRegistry::from_config(&config)?;
//!
//!     let db = registry.relational(ConnectorName::RelationalStore).unwrap();
//!     let rows = db.query("SELECT 1 AS one", &[]).await?;
//!     println!("{:?}", rows);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod connector;
pub mod error;
pub mod id;
pub mod registry;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{ConnectorKind, ConnectorName, ConnectorSpec, ConnectorsConfig};
    pub use crate::connector::{
        Connector, ExecStatus, HttpConnector, InMemoryVectorIndex, RelationalConnector,
        RestConnector, Row, SqliteConnector, VectorConnector, VectorMatch, VectorRecord,
    };
    pub use crate::error::*;
    pub use crate::id::{BookmarkId, SessionId};
    pub use crate::registry::{ConnectorHandle, ConnectorRegistry, LifecycleOutcome};
}
