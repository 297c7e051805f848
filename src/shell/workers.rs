use crate::modules::trips::core::commands::TripCommand;
use crate::shared::infrastructure::command_bus::CommandBus;
use crate::shell::services::{ServiceError, Services};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Resolve the command bus with both trip handlers registered on it.
pub async fn command_bus_with_handlers(
    services: &Services,
) -> Result<Arc<CommandBus<TripCommand>>, ServiceError> {
    let command_bus = services.command_bus().await?;
    command_bus
        .register(
            TripCommand::START_TRIP,
            services.start_trip_command_handler().await?,
        )
        .await;
    command_bus
        .register(
            TripCommand::END_TRIP,
            services.end_trip_command_handler().await?,
        )
        .await;
    Ok(command_bus)
}

/// Subscribe the card event listener to the domain event bus and run it in the background.
pub async fn spawn_card_event_listener(
    services: &Services,
) -> Result<JoinHandle<()>, ServiceError> {
    let listener = services.card_event_listener().await?;
    let events = services.domain_event_bus().await?.subscribe();
    info!("card event listener subscribed");
    Ok(tokio::spawn(async move { listener.run(events).await }))
}
