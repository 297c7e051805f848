use crate::modules::trips::adapters::outbound::card_store::CardStore;
use crate::modules::trips::core::events::TripEvent;
use crate::modules::trips::use_cases::card_locks::CardLocks;
use std::sync::Arc;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, warn};

/// Keeps card balances in line with the trips published on the event bus.
///
/// Fare charges take the card's lock, so a trip command handled on the same
/// card in between cannot be overwritten by the charge.
pub struct CardEventListener {
    store: Arc<dyn CardStore>,
    locks: Arc<CardLocks>,
}

impl CardEventListener {
    pub fn new(store: Arc<dyn CardStore>) -> Self {
        Self {
            store,
            locks: Arc::new(CardLocks::new()),
        }
    }

    pub fn with_locks(mut self, locks: Arc<CardLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub async fn on_event(&self, event: &TripEvent) -> anyhow::Result<()> {
        match event {
            TripEvent::TripStarted { card_id, trip_id, .. } => {
                debug!(%card_id, %trip_id, "trip started");
                Ok(())
            }
            TripEvent::TripEnded {
                card_id, fare, ..
            } => {
                let _guard = self.locks.lock(card_id).await;
                let Some(mut card) = self.store.get(card_id).await? else {
                    anyhow::bail!("trip ended on unknown card {card_id}");
                };
                card.balance -= fare;
                self.store.save(card).await
            }
        }
    }

    /// Consume events until the bus is dropped.
    pub async fn run(&self, mut events: Receiver<TripEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Err(err) = self.on_event(&event).await {
                        error!(?event, error = %err, "card event listener failed");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "card event listener lagged behind the event bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}
