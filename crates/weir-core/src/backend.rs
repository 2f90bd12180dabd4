//! Backend adapter traits
//!
//! A `Backend` is implemented once per store type (relational, document,
//! key-value) and selected when the pool is constructed. The pool only ever
//! talks to a store through these traits.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{QueryResult, Result, Value};

/// The family of store a backend speaks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// SQL databases (postgres, mysql, sqlite, ...)
    Relational,
    /// Document stores (mongodb, couchdb, ...)
    Document,
    /// Key-value stores (redis, memcached, ...)
    KeyValue,
}

impl StoreKind {
    /// Stable lowercase label, usable in logs and serialized reports
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Relational => "relational",
            StoreKind::Document => "document",
            StoreKind::KeyValue => "key_value",
        }
    }
}

/// Connection parameters handed to a backend adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Display name for logging
    pub name: String,
    /// Host address (empty for file-based stores)
    pub host: String,
    /// Port number (0 for default or file-based)
    pub port: u16,
    /// Database name or file path
    pub database: Option<String>,
    /// Username
    pub username: Option<String>,
    /// Password
    pub password: Option<String>,
    /// Additional adapter-specific parameters
    pub params: HashMap<String, String>,
}

impl BackendConfig {
    /// Create a new configuration with default values
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            host: String::new(),
            port: 0,
            database: None,
            username: None,
            password: None,
            params: HashMap::new(),
        }
    }

    /// Set the host and port
    pub fn with_host(mut self, host: &str, port: u16) -> Self {
        self.host = host.to_string();
        self.port = port;
        self
    }

    /// Set the database name or file path
    pub fn with_database(mut self, database: &str) -> Self {
        self.database = Some(database.to_string());
        self
    }

    /// Set the credentials
    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }

    /// Set an adapter-specific parameter
    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Get an adapter-specific parameter
    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// A store adapter, implemented once per store type
///
/// The adapter owns everything protocol-specific: how to open a physical
/// connection, what a liveness probe looks like (`SELECT 1`, `PING`, an
/// admin ping), and how statements and transactions are issued.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Adapter name (e.g. "postgres", "mongodb", "redis")
    fn name(&self) -> &str;

    /// Which store family this adapter speaks to
    fn kind(&self) -> StoreKind;

    /// Open a physical connection
    async fn connect(&self, config: &BackendConfig) -> Result<Arc<dyn BackendConnection>>;

    /// Open and immediately close a connection to verify the configuration
    async fn test_connection(&self, config: &BackendConfig) -> Result<()> {
        let conn = self.connect(config).await?;
        tracing::debug!(backend = self.name(), "test connection established");
        conn.close().await
    }
}

#[async_trait]
impl<T: Backend> Backend for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn kind(&self) -> StoreKind {
        (**self).kind()
    }

    async fn connect(&self, config: &BackendConfig) -> Result<Arc<dyn BackendConnection>> {
        (**self).connect(config).await
    }
}

/// A single physical connection produced by a [`Backend`]
#[async_trait]
pub trait BackendConnection: Send + Sync {
    /// Cheap liveness probe; `false` means the connection should be destroyed
    async fn validate(&self) -> bool;

    /// Execute an operation against the store
    async fn execute(&self, query: &str, params: &[Value]) -> Result<QueryResult>;

    /// Begin a transaction on this connection
    async fn begin(&self) -> Result<()>;

    /// Commit the open transaction
    async fn commit(&self) -> Result<()>;

    /// Roll back the open transaction
    async fn rollback(&self) -> Result<()>;

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}
