use crate::shared::infrastructure::service_registry::RegistryKey;
use crate::shared::infrastructure::service_registry::errors::BoxError;
use std::any::{Any, type_name};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type-erased service instance as held by a memoization slot.
pub type Service = Arc<dyn Any + Send + Sync>;

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type Factory<K> =
    Arc<dyn Fn(Dependencies<K>) -> BoxFuture<'static, Result<Service, BoxError>> + Send + Sync>;

/// Resolved values of the keys a binding declared, handed to its factory.
pub struct Dependencies<K: RegistryKey> {
    values: HashMap<K, Service>,
}

impl<K: RegistryKey> Dependencies<K> {
    pub(crate) fn new(values: HashMap<K, Service>) -> Self {
        Self { values }
    }

    pub fn get<T>(&self, key: K) -> Result<T, BoxError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let service = self
            .values
            .get(&key)
            .ok_or_else(|| format!("{key:?} was not declared as a dependency"))?;
        service
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| format!("{key:?} is not a {}", type_name::<T>()).into())
    }
}

/// Pure description of how one service is built.
///
/// Nothing runs until the registry resolves `key` for the first time; the
/// dependencies are resolved in declaration order before `factory` is called.
pub struct FactoryBinding<K: RegistryKey> {
    pub(crate) key: K,
    pub(crate) dependencies: Vec<K>,
    pub(crate) factory: Factory<K>,
}

impl<K: RegistryKey> FactoryBinding<K> {
    pub fn new<F, Fut, T>(key: K, dependencies: impl IntoIterator<Item = K>, factory: F) -> Self
    where
        F: Fn(Dependencies<K>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
        T: Send + Sync + 'static,
    {
        let factory: Factory<K> = Arc::new(move |dependencies| {
            let constructing = factory(dependencies);
            Box::pin(async move { constructing.await.map(|value| Arc::new(value) as Service) })
        });
        Self {
            key,
            dependencies: dependencies.into_iter().collect(),
            factory,
        }
    }

    pub fn key(&self) -> K {
        self.key
    }

    pub fn dependencies(&self) -> &[K] {
        &self.dependencies
    }
}

#[cfg(test)]
mod factory_binding_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn it_should_hand_declared_dependencies_to_the_factory() {
        let binding = FactoryBinding::new("greeting", ["name"], |deps: Dependencies<&'static str>| async move {
            let name: Arc<String> = deps.get("name")?;
            Ok::<_, BoxError>(Arc::new(format!("hello {name}")))
        });
        assert_eq!(binding.key(), "greeting");
        assert_eq!(binding.dependencies(), &["name"]);

        let mut values: HashMap<&str, Service> = HashMap::new();
        values.insert("name", Arc::new(Arc::new("ada".to_string())));
        let service = (binding.factory)(Dependencies::new(values))
            .await
            .expect("factory failed");
        let greeting = service
            .downcast_ref::<Arc<String>>()
            .expect("unexpected service type");
        assert_eq!(greeting.as_str(), "hello ada");
    }

    #[rstest]
    fn it_should_reject_undeclared_or_mistyped_dependencies() {
        let mut values: HashMap<&str, Service> = HashMap::new();
        values.insert("port", Arc::new(8080u16));
        let deps = Dependencies::new(values);

        let missing = deps.get::<u16>("host").unwrap_err();
        assert_eq!(missing.to_string(), "\"host\" was not declared as a dependency");

        let mistyped = deps.get::<String>("port").unwrap_err();
        assert!(mistyped.to_string().starts_with("\"port\" is not a"));
        assert_eq!(deps.get::<u16>("port").unwrap(), 8080);
    }
}
