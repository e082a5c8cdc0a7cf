//! Shared application state for the event-channel and admin REST server.
//!
//! [`AppState`] holds the `PostgreSQL` pool, the resolved simulation
//! config, the broadcast registry, and the structure-metadata cache. All
//! handlers read these through the `Arc`-wrapped state; there is no
//! per-request connection setup.

use std::sync::Arc;

use settlement_core::SimulationConfig;
use settlement_db::PostgresPool;
use settlement_events::BroadcastRegistry;
use sqlx::PgPool;

use crate::metadata_cache::StructureMetadataCache;

/// Shared state injected into every Axum handler via the `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// The `PostgreSQL` connection pool.
    pub pool: PostgresPool,
    /// The resolved simulation configuration.
    pub config: Arc<SimulationConfig>,
    /// The room-based broadcast registry backing the event channel.
    pub registry: Arc<BroadcastRegistry>,
    /// Server-side cache of structure definitions, keyed by last
    /// definition-change, expiring after `metadata_cache_ttl_s`.
    pub structure_metadata: Arc<StructureMetadataCache>,
}

impl AppState {
    /// Build the application state from its constituent parts.
    #[must_use]
    pub fn new(pool: PostgresPool, config: Arc<SimulationConfig>) -> Self {
        Self {
            pool,
            config,
            registry: Arc::new(BroadcastRegistry::new()),
            structure_metadata: Arc::new(StructureMetadataCache::new()),
        }
    }

    /// Borrow the raw `sqlx` pool, for constructing store instances.
    #[must_use]
    pub fn db(&self) -> &PgPool {
        self.pool.pool()
    }
}
