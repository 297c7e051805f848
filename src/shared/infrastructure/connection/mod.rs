// Connection to the remote document store.
//
// Purpose
// - Describe what the composition root needs to reach the store: parameters,
//   a connector that opens one attempt, and the handle the stores read and write through.
//
// Boundaries
// - Retrying lives in the bootstrapper, memoizing in the service registry.
// - The document protocol beyond find/upsert is owned by the store collaborators.

pub mod bootstrapper;
pub mod in_memory;
pub mod mongo;
pub mod retry_policy;

use crate::shared::infrastructure::service_registry::BoxError;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParameters {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl ConnectionParameters {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connection string without credentials; those are handed to the driver separately.
    pub fn uri(&self) -> String {
        format!("mongodb://{}", self.address())
    }
}

impl fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParameters")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Opens a single connection attempt.
#[async_trait]
pub trait Connector: Send + Sync {
    type Connection: Send + Sync + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn connect(&self, params: &ConnectionParameters)
    -> Result<Self::Connection, Self::Error>;
}

/// Live handle to the document store, shared read-only by every store built on it.
#[async_trait]
pub trait DocumentConnection: Send + Sync {
    async fn find(
        &self,
        namespace: &str,
        id: &str,
    ) -> anyhow::Result<Option<serde_json::Value>>;

    async fn upsert(
        &self,
        namespace: &str,
        id: &str,
        document: serde_json::Value,
    ) -> anyhow::Result<()>;
}

#[derive(Debug, Error)]
#[error("could not connect to {address} after {attempts} attempts")]
pub struct ConnectionExhausted {
    pub address: String,
    pub attempts: u32,
    #[source]
    pub source: BoxError,
}
