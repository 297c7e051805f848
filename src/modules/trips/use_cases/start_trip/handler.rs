use crate::modules::trips::adapters::outbound::card_store::CardStore;
use crate::modules::trips::core::card::{Card, Trip};
use crate::modules::trips::core::commands::{StartTrip, TripCommand};
use crate::modules::trips::core::events::TripEvent;
use crate::modules::trips::use_cases::card_locks::CardLocks;
use crate::modules::trips::use_cases::errors::{ApplicationError, DecideError};
use crate::shared::infrastructure::command_bus::CommandHandler;
use crate::shared::infrastructure::event_bus::DomainEventBus;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

pub struct StartTripCommandHandler {
    store: Arc<dyn CardStore>,
    event_bus: Arc<DomainEventBus<TripEvent>>,
    locks: Arc<CardLocks>,
}

impl StartTripCommandHandler {
    pub fn new(store: Arc<dyn CardStore>, event_bus: Arc<DomainEventBus<TripEvent>>) -> Self {
        Self {
            store,
            event_bus,
            locks: Arc::new(CardLocks::new()),
        }
    }

    pub fn with_locks(mut self, locks: Arc<CardLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Check the card in at `origin` and return the id of the new trip.
    pub async fn handle(&self, command: StartTrip) -> Result<String, ApplicationError> {
        let guard = self.locks.lock(&command.card_id).await;
        let mut card = self
            .store
            .get(&command.card_id)
            .await?
            .unwrap_or_else(|| Card::new(command.card_id.clone()));
        if card.trip.is_some() {
            return Err(DecideError::TripInProgress(command.card_id).into());
        }

        let trip_id = Uuid::now_v7().to_string();
        card.trip = Some(Trip {
            trip_id: trip_id.clone(),
            origin: command.origin.clone(),
            started_at: command.started_at,
        });
        self.store.save(card).await?;
        drop(guard);

        self.event_bus.publish(TripEvent::TripStarted {
            card_id: command.card_id,
            trip_id: trip_id.clone(),
            origin: command.origin,
            started_at: command.started_at,
        });
        Ok(trip_id)
    }
}

#[async_trait]
impl CommandHandler<TripCommand> for StartTripCommandHandler {
    async fn handle(&self, command: TripCommand) -> anyhow::Result<()> {
        match command {
            TripCommand::StartTrip(start) => {
                StartTripCommandHandler::handle(self, start).await?;
                Ok(())
            }
            other => anyhow::bail!("{other:?} is not a StartTrip command"),
        }
    }
}
