mod api;
mod config;
mod consumer;
mod db;
mod error;
mod models;
mod notifier;
mod processor;
mod publisher;
mod queue;
mod runtime;
mod scorer;
mod store;
#[cfg(test)]
mod test_support;
mod transport;

use config::AppConfig;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config
    let config = AppConfig::load()?;

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .init();

    info!(
        ingest = config.roles.ingest,
        notifier = config.roles.notifier,
        reporter = config.roles.reporter,
        "Starting PetroShield fuel pipeline..."
    );

    // Init DB
    let pool = db::init_pool(&config.database_url, config.db_max_connections).await?;
    db::apply_schema(&pool).await?;
    info!("Connected to database");

    runtime::run(config, pool).await
}
