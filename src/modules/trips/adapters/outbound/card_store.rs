use crate::modules::trips::core::card::Card;
use async_trait::async_trait;

#[async_trait]
pub trait CardStore: Send + Sync {
    async fn get(&self, card_id: &str) -> anyhow::Result<Option<Card>>;
    async fn save(&self, card: Card) -> anyhow::Result<()>;
}
