use tokio::sync::broadcast::{self, Receiver, Sender};

pub const DEFAULT_CAPACITY: usize = 100;

/// In-process publish/subscribe of domain events.
pub struct DomainEventBus<E: Clone> {
    sender: Sender<E>,
}

impl<E: Clone> DomainEventBus<E> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to every current subscriber and return how many there were.
    /// Events published while nobody listens are dropped.
    pub fn publish(&self, event: E) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> Receiver<E> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<E: Clone> Default for DomainEventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}
