use crate::modules::trips::adapters::outbound::card_store::CardStore;
use crate::modules::trips::core::commands::{EndTrip, TripCommand};
use crate::modules::trips::core::events::TripEvent;
use crate::modules::trips::use_cases::card_locks::CardLocks;
use crate::modules::trips::use_cases::errors::{ApplicationError, DecideError};
use crate::shared::infrastructure::command_bus::CommandHandler;
use crate::shared::infrastructure::event_bus::DomainEventBus;
use async_trait::async_trait;
use std::sync::Arc;

pub const FLAT_FARE: i64 = 210;

pub struct EndTripCommandHandler {
    store: Arc<dyn CardStore>,
    event_bus: Arc<DomainEventBus<TripEvent>>,
    locks: Arc<CardLocks>,
}

impl EndTripCommandHandler {
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

    /// Check the card out at `destination`; charging the fare is left to the
    /// listeners of `TripEnded`.
    pub async fn handle(&self, command: EndTrip) -> Result<(), ApplicationError> {
        let guard = self.locks.lock(&command.card_id).await;
        let mut card = self
            .store
            .get(&command.card_id)
            .await?
            .ok_or_else(|| DecideError::NoTripInProgress(command.card_id.clone()))?;
        let Some(trip) = card.trip.take() else {
            return Err(DecideError::NoTripInProgress(command.card_id).into());
        };
        self.store.save(card).await?;
        drop(guard);

        self.event_bus.publish(TripEvent::TripEnded {
            card_id: command.card_id,
            trip_id: trip.trip_id,
            origin: trip.origin,
            destination: command.destination,
            ended_at: command.ended_at,
            fare: FLAT_FARE,
        });
        Ok(())
    }
}

#[async_trait]
impl CommandHandler<TripCommand> for EndTripCommandHandler {
    async fn handle(&self, command: TripCommand) -> anyhow::Result<()> {
        match command {
            TripCommand::EndTrip(end) => Ok(EndTripCommandHandler::handle(self, end).await?),
            other => anyhow::bail!("{other:?} is not an EndTrip command"),
        }
    }
}

#[cfg(test)]
mod end_trip_command_handler_tests {
    use super::*;
    use crate::modules::trips::adapters::outbound::card_store_in_memory::InMemoryCardStore;
    use crate::modules::trips::core::card::{Card, Trip};
    use rstest::{fixture, rstest};

    #[fixture]
    fn end_trip() -> EndTrip {
        EndTrip {
            card_id: "card-0001".into(),
            destination: "Osaka".into(),
            ended_at: 1_700_000_360_000,
        }
    }

    async fn store_with_trip() -> Arc<InMemoryCardStore> {
        let store = Arc::new(InMemoryCardStore::new());
        let mut card = Card::new("card-0001");
        card.trip = Some(Trip {
            trip_id: "trip-0001".into(),
            origin: "Tokyo".into(),
            started_at: 1_700_000_000_000,
        });
        store.save(card).await.unwrap();
        store
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_end_the_trip_and_publish_the_fare(end_trip: EndTrip) {
        let store = store_with_trip().await;
        let event_bus = Arc::new(DomainEventBus::new());
        let mut events = event_bus.subscribe();
        let handler = EndTripCommandHandler::new(store.clone(), event_bus);

        handler.handle(end_trip).await.expect("handle failed");

        let card = store.get("card-0001").await.unwrap().expect("card missing");
        assert_eq!(card.trip, None);
        assert_eq!(
            events.recv().await.unwrap(),
            TripEvent::TripEnded {
                card_id: "card-0001".into(),
                trip_id: "trip-0001".into(),
                origin: "Tokyo".into(),
                destination: "Osaka".into(),
                ended_at: 1_700_000_360_000,
                fare: FLAT_FARE,
            }
        );
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_reject_a_card_without_a_trip(end_trip: EndTrip) {
        let store = Arc::new(InMemoryCardStore::new());
        store.save(Card::new("card-0001")).await.unwrap();
        let handler = EndTripCommandHandler::new(store, Arc::new(DomainEventBus::new()));

        let result = handler.handle(end_trip).await;
        assert!(matches!(
            result,
            Err(ApplicationError::Domain(DecideError::NoTripInProgress(_)))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_reject_an_unknown_card(end_trip: EndTrip) {
        let handler = EndTripCommandHandler::new(
            Arc::new(InMemoryCardStore::new()),
            Arc::new(DomainEventBus::new()),
        );

        let result = handler.handle(end_trip).await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "domain rejected: no trip in progress on card card-0001"
        );
    }
}
