use shinkansen_travel::shared::infrastructure::connection::in_memory::InMemoryConnector;
use shinkansen_travel::shared::infrastructure::connection::mongo::MongoConnector;
use shinkansen_travel::shell::config::{AppConfig, CardStoreBackend, DATABASE_NAME};
use shinkansen_travel::shell::services::Services;
use shinkansen_travel::shell::workers::{command_bus_with_handlers, spawn_card_event_listener};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        address = %config.connection.address(),
        backend = ?config.card_store,
        "starting trip services"
    );

    let backend = config.card_store;
    let services = match backend {
        CardStoreBackend::Remote => Services::new(config, MongoConnector::new(DATABASE_NAME)),
        CardStoreBackend::InMemory => Services::new(config, InMemoryConnector::new()),
    };

    let _command_bus = command_bus_with_handlers(&services).await?;
    let listener = spawn_card_event_listener(&services).await?;
    tracing::info!("trip services ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    listener.abort();
    Ok(())
}
