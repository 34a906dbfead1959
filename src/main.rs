// Start the indexer:
// - load configuration and set up logging
// - connect to the database and load the address cache
// - start the worker pool and the periodic cache refresh
// - replay pipeline messages (JSON lines) from stdin until EOF or Ctrl-C

use script_address_indexer::{blockchain::WorkerPool, config::Config, db, models::PipelineMessage, state::AppState};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting script-address-indexer");

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded: {:?}", config);

    let db_pool = db::connection::establish_connection(&config.database_url).await?;
    tracing::info!("Database connection established");

    let state = AppState::build(config, db_pool).await?;
    let shutdown = CancellationToken::new();

    let refresh_handle = state
        .config
        .cache_refresh_interval
        .map(|period| state.address_cache.clone().spawn_refresh_task(period, shutdown.clone()));

    let pool = WorkerPool::new(
        state.dispatcher.clone(),
        state.config.worker_count,
        state.config.event_channel_capacity,
        shutdown.clone(),
    );
    let sender = pool.get_sender();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::info!("Input exhausted, draining workers");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<PipelineMessage>(&line) {
                    Ok(message) => sender.send(message).await?,
                    Err(e) => tracing::warn!("Skipping malformed message: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl-C, shutting down");
                shutdown.cancel();
                break;
            }
        }
    }

    drop(sender);
    let abandoned = pool.join().await;
    if abandoned > 0 {
        tracing::warn!("{} pipeline messages were not processed before shutdown", abandoned);
    }

    shutdown.cancel();
    if let Some(handle) = refresh_handle {
        let _ = handle.await;
    }

    state.db_pool.close().await;
    tracing::info!("Shutdown complete");

    Ok(())
}
