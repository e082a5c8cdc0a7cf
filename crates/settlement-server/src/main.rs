//! Settlement engine binary.
//!
//! This is the entry point that wires together configuration loading,
//! the `PostgreSQL` pool and migrations, the player/admin HTTP server,
//! and the authoritative tick loop. It runs until the process receives
//! a shutdown signal.
//!
//! # Startup sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `settlement-config.yaml`, falling back to
//!    documented defaults
//! 3. Connect to `PostgreSQL` and run pending migrations
//! 4. Build the shared application state
//! 5. Spawn the HTTP + event-channel server on a background task
//! 6. Run the tick loop at the configured rate until shutdown

mod error;
mod tick;

use std::path::Path;
use std::sync::Arc;

use settlement_api::AppState;
use settlement_db::PostgresPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::tick::TickContext;

/// Application entry point for the settlement engine.
///
/// # Errors
///
/// Returns an error if configuration loading, the database connection,
/// migrations, or server startup fail.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    info!("settlement-engine starting");

    let config = Arc::new(load_config()?);
    info!(
        tick_hz = config.tick.tick_hz,
        disaster_tick_hz = config.tick.disaster_tick_hz,
        port = config.server.port,
        "configuration loaded"
    );

    let pool = PostgresPool::connect_url(&config.infrastructure.database_url).await?;
    pool.run_migrations().await?;
    info!("database connected and migrated");

    let state = AppState::new(pool, Arc::clone(&config));

    let _server_handle = settlement_api::spawn_server(config.server.port, state.clone()).await?;

    run_tick_loop(&state, &config).await
}

/// Load the simulation configuration from `settlement-config.yaml` in the
/// current working directory, falling back to documented defaults if the
/// file does not exist.
fn load_config() -> Result<settlement_core::config::SimulationConfig, EngineError> {
    let config_path = Path::new("settlement-config.yaml");
    if config_path.exists() {
        Ok(settlement_core::config::SimulationConfig::from_file(config_path)?)
    } else {
        info!("config file not found, using defaults");
        Ok(settlement_core::config::SimulationConfig::from_defaults())
    }
}

/// Drive the authoritative tick loop at the configured rate.
///
/// Each iteration advances every ready world's dirty settlements, active
/// construction queues, and in-progress disasters by one tick, then
/// sleeps for the remainder of the configured tick interval. A tick that
/// overruns its interval runs the next tick immediately rather than
/// accumulating backlog.
///
/// # Errors
///
/// Returns the first [`EngineError`] a tick produces; the loop does not
/// retry past a failed tick today, leaving recovery to process restart.
async fn run_tick_loop(
    state: &AppState,
    config: &Arc<settlement_core::config::SimulationConfig>,
) -> Result<(), EngineError> {
    let interval = config.tick.tick_interval();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let ctx = TickContext::new(state.db(), config, &state.registry);

    info!(interval_ms = interval.as_millis(), "entering tick loop");

    let mut tick: u64 = 0;
    loop {
        ticker.tick().await;
        let now = chrono::Utc::now();
        if let Err(err) = tick::run_tick(&ctx, tick, now).await {
            tracing::error!(tick, error = %err, "tick failed");
            return Err(err);
        }
        tick = tick.wrapping_add(1);
    }
}
