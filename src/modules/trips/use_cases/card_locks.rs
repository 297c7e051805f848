use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Serializes load-modify-save cycles on the same card.
///
/// Every use case that reads a card and writes it back holds the card's lock
/// for the whole cycle. Only writers sharing one `CardLocks` are serialized.
#[derive(Default)]
pub struct CardLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CardLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, card_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(card_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod card_locks_tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;
    use tokio::time::timeout;

    #[rstest]
    #[tokio::test]
    async fn it_should_hold_back_a_second_writer_of_the_same_card() {
        let locks = CardLocks::new();
        let held = locks.lock("card-0001").await;

        let blocked = timeout(Duration::from_millis(20), locks.lock("card-0001")).await;
        assert!(blocked.is_err());

        drop(held);
        timeout(Duration::from_millis(20), locks.lock("card-0001"))
            .await
            .expect("lock should be free once released");
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_not_block_writers_of_other_cards() {
        let locks = CardLocks::new();
        let _held = locks.lock("card-0001").await;

        timeout(Duration::from_millis(20), locks.lock("card-0002"))
            .await
            .expect("other cards should not be locked");
    }
}
