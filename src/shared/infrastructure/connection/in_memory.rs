// In memory document store reachable through the Connector port.
//
// Purpose
// - Local development and tests without a running database.
// - Simulate a flaky store by refusing a configurable number of attempts.

use crate::shared::infrastructure::connection::{
    ConnectionParameters, Connector, DocumentConnection,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InMemoryConnectionError {
    #[error("connection to {address} refused")]
    Refused { address: String },
}

/// Cloning yields another handle onto the same documents.
#[derive(Clone, Default)]
pub struct InMemoryConnection {
    documents: Arc<RwLock<HashMap<(String, String), Value>>>,
}

impl InMemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentConnection for InMemoryConnection {
    async fn find(&self, namespace: &str, id: &str) -> anyhow::Result<Option<Value>> {
        let guard = self.documents.read().await;
        Ok(guard.get(&(namespace.to_string(), id.to_string())).cloned())
    }

    async fn upsert(&self, namespace: &str, id: &str, document: Value) -> anyhow::Result<()> {
        let mut guard = self.documents.write().await;
        guard.insert((namespace.to_string(), id.to_string()), document);
        Ok(())
    }
}

pub struct InMemoryConnector {
    server: InMemoryConnection,
    refusals: AtomicU32,
    attempts: AtomicU32,
}

impl Default for InMemoryConnector {
    fn default() -> Self {
        Self::refusing_first(0)
    }
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse the first `refusals` connection attempts, then accept every one.
    pub fn refusing_first(refusals: u32) -> Self {
        Self {
            server: InMemoryConnection::new(),
            refusals: AtomicU32::new(refusals),
            attempts: AtomicU32::new(0),
        }
    }

    pub fn offline() -> Self {
        Self::refusing_first(u32::MAX)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for InMemoryConnector {
    type Connection = InMemoryConnection;
    type Error = InMemoryConnectionError;

    async fn connect(
        &self,
        params: &ConnectionParameters,
    ) -> Result<InMemoryConnection, InMemoryConnectionError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .refusals
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                left.checked_sub(1)
            })
            .is_ok();
        if refused {
            return Err(InMemoryConnectionError::Refused {
                address: params.address(),
            });
        }
        Ok(self.server.clone())
    }
}
