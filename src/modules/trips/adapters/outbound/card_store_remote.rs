// CardStore backed by the document store connection.
//
// Responsibilities
// - Map cards to JSON documents in `<database>.<collection>`, keyed by card id.

use crate::modules::trips::adapters::outbound::card_store::CardStore;
use crate::modules::trips::core::card::Card;
use crate::shared::infrastructure::connection::DocumentConnection;
use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;

pub struct RemoteCardStore {
    connection: Arc<dyn DocumentConnection>,
    namespace: String,
}

impl RemoteCardStore {
    pub fn new(
        connection: Arc<dyn DocumentConnection>,
        database_name: &str,
        collection_name: &str,
    ) -> Self {
        Self {
            connection,
            namespace: format!("{database_name}.{collection_name}"),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

#[async_trait]
impl CardStore for RemoteCardStore {
    async fn get(&self, card_id: &str) -> anyhow::Result<Option<Card>> {
        let Some(document) = self.connection.find(&self.namespace, card_id).await? else {
            return Ok(None);
        };
        let card = serde_json::from_value(document)
            .with_context(|| format!("malformed card document {card_id} in {}", self.namespace))?;
        Ok(Some(card))
    }

    async fn save(&self, card: Card) -> anyhow::Result<()> {
        let document = serde_json::to_value(&card)?;
        self.connection
            .upsert(&self.namespace, &card.card_id, document)
            .await
    }
}
