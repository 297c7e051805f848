use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    async fn handle(&self, command: C) -> anyhow::Result<()>;
}

#[derive(Debug, Error)]
pub enum CommandBusError {
    #[error("no handler registered for {0}")]
    NoHandler(&'static str),

    #[error("{command} failed: {source}")]
    Handler {
        command: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

/// Routes each command to the handler registered under its name.
pub struct CommandBus<C: Command> {
    handlers: RwLock<HashMap<&'static str, Arc<dyn CommandHandler<C>>>>,
}

impl<C: Command> Default for CommandBus<C> {
    fn default() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }
}

impl<C: Command> CommandBus<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for commands named `name`, replacing any previous one.
    pub async fn register(&self, name: &'static str, handler: Arc<dyn CommandHandler<C>>) {
        self.handlers.write().await.insert(name, handler);
    }

    pub async fn dispatch(&self, command: C) -> Result<(), CommandBusError> {
        let name = command.name();
        let handler = self
            .handlers
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or(CommandBusError::NoHandler(name))?;
        handler
            .handle(command)
            .await
            .map_err(|source| CommandBusError::Handler {
                command: name,
                source,
            })
    }
}

#[cfg(test)]
mod command_bus_tests {
    use super::*;
    use rstest::rstest;
    use std::sync::Mutex;

    struct Ping(u32);

    impl Command for Ping {
        fn name(&self) -> &'static str {
            "Ping"
        }
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl CommandHandler<Ping> for Recorder {
        async fn handle(&self, command: Ping) -> anyhow::Result<()> {
            if command.0 == 0 {
                anyhow::bail!("zero is not a ping");
            }
            self.seen.lock().unwrap().push(command.0);
            Ok(())
        }
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_route_a_command_to_its_handler() {
        let bus = CommandBus::<Ping>::new();
        let recorder = Arc::new(Recorder::default());
        bus.register("Ping", recorder.clone()).await;

        bus.dispatch(Ping(3)).await.expect("dispatch failed");
        assert_eq!(*recorder.seen.lock().unwrap(), vec![3]);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_fail_without_a_registered_handler() {
        let bus = CommandBus::<Ping>::new();
        let result = bus.dispatch(Ping(1)).await;
        assert!(matches!(result, Err(CommandBusError::NoHandler("Ping"))));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_report_the_handler_failure() {
        let bus = CommandBus::<Ping>::new();
        bus.register("Ping", Arc::new(Recorder::default())).await;
        let error = bus.dispatch(Ping(0)).await.unwrap_err();
        assert_eq!(error.to_string(), "Ping failed: zero is not a ping");
    }
}
