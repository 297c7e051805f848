// Composition root for the trips services.
//
// Responsibilities
// - Declare one factory binding per service and what it is built from.
// - Expose one getter per service; the first call builds it, every later call shares it.
// - Reach the document store through the connection bootstrapper, once per process.

use crate::modules::trips::adapters::outbound::card_store::CardStore;
use crate::modules::trips::adapters::outbound::card_store_in_memory::InMemoryCardStore;
use crate::modules::trips::adapters::outbound::card_store_remote::RemoteCardStore;
use crate::modules::trips::core::commands::TripCommand;
use crate::modules::trips::core::events::TripEvent;
use crate::modules::trips::use_cases::card_events::listener::CardEventListener;
use crate::modules::trips::use_cases::card_locks::CardLocks;
use crate::modules::trips::use_cases::end_trip::handler::EndTripCommandHandler;
use crate::modules::trips::use_cases::start_trip::handler::StartTripCommandHandler;
use crate::shared::infrastructure::command_bus::CommandBus;
use crate::shared::infrastructure::connection::bootstrapper::{
    ConnectionBootstrapper, Sleeper, TokioSleeper,
};
use crate::shared::infrastructure::connection::{Connector, DocumentConnection};
use crate::shared::infrastructure::event_bus::DomainEventBus;
use crate::shared::infrastructure::service_registry::{
    BoxError, Dependencies, FactoryBinding, RegistryError, ServiceRegistry,
};
use crate::shell::config::{AppConfig, CardStoreBackend};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKey {
    Connection,
    InMemoryCardStore,
    RemoteCardStore,
    CardStore,
    CardLocks,
    CommandBus,
    DomainEventBus,
    StartTripCommandHandler,
    EndTripCommandHandler,
    CardEventListener,
}

pub type ServiceError = RegistryError<ServiceKey>;

#[derive(Clone)]
pub struct Services {
    registry: ServiceRegistry<ServiceKey>,
}

impl Services {
    pub fn new<C>(config: AppConfig, connector: C) -> Self
    where
        C: Connector + 'static,
        C::Connection: DocumentConnection,
    {
        Self::with_sleeper(config, connector, TokioSleeper)
    }

    pub fn with_sleeper<C, S>(config: AppConfig, connector: C, sleeper: S) -> Self
    where
        C: Connector + 'static,
        C::Connection: DocumentConnection,
        S: Sleeper + 'static,
    {
        let bootstrapper = Arc::new(ConnectionBootstrapper::with_sleeper(connector, sleeper));
        let params = config.connection.clone();
        let policy = config.retry_policy;
        let database_name = config.database_name.clone();
        let collection_name = config.collection_name.clone();
        let card_store_source = match config.card_store {
            CardStoreBackend::Remote => ServiceKey::RemoteCardStore,
            CardStoreBackend::InMemory => ServiceKey::InMemoryCardStore,
        };

        let registry = ServiceRegistry::builder()
            .bind(FactoryBinding::new(ServiceKey::Connection, [], move |_| {
                let bootstrapper = bootstrapper.clone();
                let params = params.clone();
                async move {
                    let connection = bootstrapper.try_connect(&params, &policy).await?;
                    Ok::<_, BoxError>(Arc::new(connection) as Arc<dyn DocumentConnection>)
                }
            }))
            .bind(FactoryBinding::new(ServiceKey::InMemoryCardStore, [], |_| async {
                Ok::<_, BoxError>(Arc::new(InMemoryCardStore::new()))
            }))
            .bind(FactoryBinding::new(
                ServiceKey::RemoteCardStore,
                [ServiceKey::Connection],
                move |deps: Dependencies<ServiceKey>| {
                    let database_name = database_name.clone();
                    let collection_name = collection_name.clone();
                    async move {
                        let connection: Arc<dyn DocumentConnection> =
                            deps.get(ServiceKey::Connection)?;
                        Ok::<_, BoxError>(Arc::new(RemoteCardStore::new(
                            connection,
                            &database_name,
                            &collection_name,
                        )))
                    }
                },
            ))
            .bind(FactoryBinding::new(
                ServiceKey::CardStore,
                [card_store_source],
                move |deps: Dependencies<ServiceKey>| async move {
                    let store: Arc<dyn CardStore> = match card_store_source {
                        ServiceKey::InMemoryCardStore => {
                            deps.get::<Arc<InMemoryCardStore>>(card_store_source)?
                        }
                        _ => deps.get::<Arc<RemoteCardStore>>(card_store_source)?,
                    };
                    Ok::<_, BoxError>(store)
                },
            ))
            .bind(FactoryBinding::new(ServiceKey::CardLocks, [], |_| async {
                Ok::<_, BoxError>(Arc::new(CardLocks::new()))
            }))
            .bind(FactoryBinding::new(ServiceKey::CommandBus, [], |_| async {
                Ok::<_, BoxError>(Arc::new(CommandBus::<TripCommand>::new()))
            }))
            .bind(FactoryBinding::new(ServiceKey::DomainEventBus, [], |_| async {
                Ok::<_, BoxError>(Arc::new(DomainEventBus::<TripEvent>::new()))
            }))
            .bind(FactoryBinding::new(
                ServiceKey::StartTripCommandHandler,
                [
                    ServiceKey::CardStore,
                    ServiceKey::DomainEventBus,
                    ServiceKey::CardLocks,
                ],
                |deps: Dependencies<ServiceKey>| async move {
                    Ok::<_, BoxError>(Arc::new(
                        StartTripCommandHandler::new(
                            deps.get(ServiceKey::CardStore)?,
                            deps.get(ServiceKey::DomainEventBus)?,
                        )
                        .with_locks(deps.get(ServiceKey::CardLocks)?),
                    ))
                },
            ))
            .bind(FactoryBinding::new(
                ServiceKey::EndTripCommandHandler,
                [
                    ServiceKey::CardStore,
                    ServiceKey::DomainEventBus,
                    ServiceKey::CardLocks,
                ],
                |deps: Dependencies<ServiceKey>| async move {
                    Ok::<_, BoxError>(Arc::new(
                        EndTripCommandHandler::new(
                            deps.get(ServiceKey::CardStore)?,
                            deps.get(ServiceKey::DomainEventBus)?,
                        )
                        .with_locks(deps.get(ServiceKey::CardLocks)?),
                    ))
                },
            ))
            .bind(FactoryBinding::new(
                ServiceKey::CardEventListener,
                [ServiceKey::CardStore, ServiceKey::CardLocks],
                |deps: Dependencies<ServiceKey>| async move {
                    Ok::<_, BoxError>(Arc::new(
                        CardEventListener::new(deps.get(ServiceKey::CardStore)?)
                            .with_locks(deps.get(ServiceKey::CardLocks)?),
                    ))
                },
            ))
            .build();

        Self { registry }
    }

    pub fn registry(&self) -> &ServiceRegistry<ServiceKey> {
        &self.registry
    }

    pub async fn connection(&self) -> Result<Arc<dyn DocumentConnection>, ServiceError> {
        self.registry.resolve(ServiceKey::Connection).await
    }

    pub async fn in_memory_card_store(&self) -> Result<Arc<InMemoryCardStore>, ServiceError> {
        self.registry.resolve(ServiceKey::InMemoryCardStore).await
    }

    pub async fn remote_card_store(&self) -> Result<Arc<RemoteCardStore>, ServiceError> {
        self.registry.resolve(ServiceKey::RemoteCardStore).await
    }

    pub async fn card_store(&self) -> Result<Arc<dyn CardStore>, ServiceError> {
        self.registry.resolve(ServiceKey::CardStore).await
    }

    pub async fn card_locks(&self) -> Result<Arc<CardLocks>, ServiceError> {
        self.registry.resolve(ServiceKey::CardLocks).await
    }

    pub async fn command_bus(&self) -> Result<Arc<CommandBus<TripCommand>>, ServiceError> {
        self.registry.resolve(ServiceKey::CommandBus).await
    }

    pub async fn domain_event_bus(&self) -> Result<Arc<DomainEventBus<TripEvent>>, ServiceError> {
        self.registry.resolve(ServiceKey::DomainEventBus).await
    }

    pub async fn start_trip_command_handler(
        &self,
    ) -> Result<Arc<StartTripCommandHandler>, ServiceError> {
        self.registry
            .resolve(ServiceKey::StartTripCommandHandler)
            .await
    }

    pub async fn end_trip_command_handler(
        &self,
    ) -> Result<Arc<EndTripCommandHandler>, ServiceError> {
        self.registry.resolve(ServiceKey::EndTripCommandHandler).await
    }

    pub async fn card_event_listener(&self) -> Result<Arc<CardEventListener>, ServiceError> {
        self.registry.resolve(ServiceKey::CardEventListener).await
    }
}
