use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure of a factory, shared between every requester of the failed key.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Clone, Error)]
pub enum RegistryError<K: fmt::Debug> {
    #[error("cyclic dependency: {cycle:?}")]
    CyclicDependency { cycle: Vec<K> },

    #[error("no factory bound for {0:?}")]
    Unbound(K),

    #[error("failed to construct {key:?}: {source}")]
    Construction {
        key: K,
        #[source]
        source: SharedError,
    },

    #[error("{0:?} does not hold a value of the requested type")]
    TypeMismatch(K),

    #[error("construction of {0:?} was aborted before it settled")]
    Aborted(K),
}

impl<K: fmt::Debug> RegistryError<K> {
    /// Root cause of a factory failure, if this error carries one.
    pub fn construction_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            RegistryError::Construction { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
