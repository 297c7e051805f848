// Lazy, memoized construction of the application's services.
//
// Purpose
// - Build each service on first demand, after the services it depends on.
// - Guarantee one construction per key, no matter how many callers ask at once.
//
// Responsibilities
// - Own the memoization slot of every key for the lifetime of the registry.
// - Let concurrent first-time callers attach to the construction already running.
// - Cache failures; a failed key is never rebuilt by a later resolve.
// - Refuse keys whose declared dependencies loop back on themselves.

pub mod binding;
pub mod errors;

pub use binding::{Dependencies, FactoryBinding, Service};
pub use errors::{BoxError, RegistryError, SharedError};

use binding::BoxFuture;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, warn};

/// Identifier of a constructible service.
pub trait RegistryKey: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> RegistryKey for T where T: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

type Outcome<K> = Result<Service, RegistryError<K>>;

enum Slot<K: RegistryKey> {
    InProgress(watch::Receiver<Option<Outcome<K>>>),
    Completed(Service),
    Failed(RegistryError<K>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Unstarted,
    InProgress,
    Completed,
    Failed,
}

struct Inner<K: RegistryKey> {
    bindings: HashMap<K, FactoryBinding<K>>,
    slots: Mutex<HashMap<K, Slot<K>>>,
}

#[derive(Clone)]
pub struct ServiceRegistry<K: RegistryKey> {
    inner: Arc<Inner<K>>,
}

pub struct ServiceRegistryBuilder<K: RegistryKey> {
    bindings: HashMap<K, FactoryBinding<K>>,
}

impl<K: RegistryKey> Default for ServiceRegistryBuilder<K> {
    fn default() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }
}

impl<K: RegistryKey> ServiceRegistryBuilder<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a binding. A later binding for the same key replaces the earlier one.
    pub fn bind(mut self, binding: FactoryBinding<K>) -> Self {
        let key = binding.key();
        if self.bindings.insert(key, binding).is_some() {
            warn!(?key, "replacing existing factory binding");
        }
        self
    }

    pub fn build(self) -> ServiceRegistry<K> {
        ServiceRegistry {
            inner: Arc::new(Inner {
                bindings: self.bindings,
                slots: Mutex::new(HashMap::new()),
            }),
        }
    }
}

impl<K: RegistryKey> ServiceRegistry<K> {
    pub fn builder() -> ServiceRegistryBuilder<K> {
        ServiceRegistryBuilder::new()
    }

    /// Return the service bound to `key`, constructing it and its dependencies
    /// on first use.
    ///
    /// Callers arriving while the construction runs wait for it and observe
    /// its outcome. A failed construction stays failed.
    pub async fn resolve<T>(&self, key: K) -> Result<T, RegistryError<K>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let service = self.resolve_service(key).await?;
        service
            .downcast_ref::<T>()
            .cloned()
            .ok_or(RegistryError::TypeMismatch(key))
    }

    pub async fn slot_state(&self, key: K) -> SlotState {
        match self.inner.slots.lock().await.get(&key) {
            None => SlotState::Unstarted,
            Some(Slot::InProgress(_)) => SlotState::InProgress,
            Some(Slot::Completed(_)) => SlotState::Completed,
            Some(Slot::Failed(_)) => SlotState::Failed,
        }
    }

    fn resolve_service(&self, key: K) -> BoxFuture<'_, Outcome<K>> {
        Box::pin(async move {
            let mut settled = {
                let mut slots = self.inner.slots.lock().await;
                match slots.get(&key) {
                    Some(Slot::Completed(service)) => return Ok(Arc::clone(service)),
                    Some(Slot::Failed(error)) => return Err(error.clone()),
                    Some(Slot::InProgress(settled)) => settled.clone(),
                    None => {
                        if let Err(error) = self.check_acyclic(key) {
                            warn!(?key, %error, "refusing to construct service");
                            slots.insert(key, Slot::Failed(error.clone()));
                            return Err(error);
                        }
                        let (settle, settled) = watch::channel(None);
                        slots.insert(key, Slot::InProgress(settled.clone()));
                        // Runs detached so a cancelled first caller does not strand the others.
                        tokio::spawn(self.clone().construct(key, settle));
                        settled
                    }
                }
            };

            let outcome = settled
                .wait_for(Option::is_some)
                .await
                .ok()
                .and_then(|outcome| Option::clone(&outcome));
            match outcome {
                Some(outcome) => outcome,
                None => self.abandon(key).await,
            }
        })
    }

    async fn construct(self, key: K, settle: watch::Sender<Option<Outcome<K>>>) {
        let outcome = self.build_service(key).await;
        {
            let mut slots = self.inner.slots.lock().await;
            let slot = match &outcome {
                Ok(service) => Slot::Completed(Arc::clone(service)),
                Err(error) => Slot::Failed(error.clone()),
            };
            slots.insert(key, slot);
        }
        settle.send_replace(Some(outcome));
    }

    async fn build_service(&self, key: K) -> Outcome<K> {
        let binding = self
            .inner
            .bindings
            .get(&key)
            .ok_or(RegistryError::Unbound(key))?;

        let mut resolved = HashMap::with_capacity(binding.dependencies.len());
        for dependency in &binding.dependencies {
            match self.resolve_service(*dependency).await {
                Ok(service) => {
                    resolved.insert(*dependency, service);
                }
                Err(error) => {
                    warn!(?key, ?dependency, %error, "dependency failed, service not constructed");
                    return Err(error);
                }
            }
        }

        debug!(?key, "constructing service");
        match (binding.factory)(Dependencies::new(resolved)).await {
            Ok(service) => {
                debug!(?key, "service constructed");
                Ok(service)
            }
            Err(source) => {
                let error = RegistryError::Construction {
                    key,
                    source: Arc::from(source),
                };
                warn!(?key, %error, "service construction failed");
                Err(error)
            }
        }
    }

    // The constructing task died without reporting; settle the slot as failed.
    async fn abandon(&self, key: K) -> Outcome<K> {
        let mut slots = self.inner.slots.lock().await;
        match slots.get(&key) {
            Some(Slot::Completed(service)) => Ok(Arc::clone(service)),
            Some(Slot::Failed(error)) => Err(error.clone()),
            _ => {
                let aborted = RegistryError::Aborted(key);
                error!(?key, "service construction aborted");
                slots.insert(key, Slot::Failed(aborted.clone()));
                Err(aborted)
            }
        }
    }

    fn check_acyclic(&self, root: K) -> Result<(), RegistryError<K>> {
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        self.visit(root, &mut path, &mut visited)
    }

    fn visit(
        &self,
        key: K,
        path: &mut Vec<K>,
        visited: &mut HashSet<K>,
    ) -> Result<(), RegistryError<K>> {
        if visited.contains(&key) {
            return Ok(());
        }
        if let Some(start) = path.iter().position(|entered| *entered == key) {
            let mut cycle = path[start..].to_vec();
            cycle.push(key);
            return Err(RegistryError::CyclicDependency { cycle });
        }
        let binding = self
            .inner
            .bindings
            .get(&key)
            .ok_or(RegistryError::Unbound(key))?;

        path.push(key);
        for dependency in &binding.dependencies {
            self.visit(*dependency, path, visited)?;
        }
        path.pop();
        visited.insert(key);
        Ok(())
    }
}
