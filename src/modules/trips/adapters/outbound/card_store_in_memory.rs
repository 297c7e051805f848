// In memory implementation of the CardStore port.
//
// Purpose
// - Support handler tests and local development without a document store.

use crate::modules::trips::adapters::outbound::card_store::CardStore;
use crate::modules::trips::core::card::Card;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryCardStore {
    cards: RwLock<HashMap<String, Card>>,
    is_offline: bool,
}

impl InMemoryCardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_offline(&mut self) {
        self.is_offline = !self.is_offline;
    }
}

#[async_trait]
impl CardStore for InMemoryCardStore {
    async fn get(&self, card_id: &str) -> anyhow::Result<Option<Card>> {
        if self.is_offline {
            anyhow::bail!("Card store offline");
        }
        Ok(self.cards.read().await.get(card_id).cloned())
    }

    async fn save(&self, card: Card) -> anyhow::Result<()> {
        if self.is_offline {
            anyhow::bail!("Card store offline");
        }
        self.cards.write().await.insert(card.card_id.clone(), card);
        Ok(())
    }
}

#[cfg(test)]
mod in_memory_card_store_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn it_should_save_and_get_a_card() {
        let store = InMemoryCardStore::new();
        let mut card = Card::new("card-1");
        card.balance = 500;
        store.save(card.clone()).await.expect("save failed");

        assert_eq!(store.get("card-1").await.unwrap(), Some(card));
        assert_eq!(store.get("card-2").await.unwrap(), None);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_fail_while_offline() {
        let mut store = InMemoryCardStore::new();
        store.toggle_offline();
        let error = store.get("card-1").await.unwrap_err();
        assert_eq!(error.to_string(), "Card store offline");
        assert!(store.save(Card::new("card-1")).await.is_err());
    }
}
