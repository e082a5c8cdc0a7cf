//! Error types for the settlement engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps every subsystem
//! failure the engine can propagate during startup and the tick loop.

/// Top-level error for the settlement engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` and the tick loop can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration failed to load.
    #[error("config error: {0}")]
    Config(#[from] settlement_core::config::ConfigError),

    /// A database operation failed.
    #[error("database error: {0}")]
    Db(#[from] settlement_db::DbError),

    /// A pure tick computation failed.
    #[error("tick error: {0}")]
    Tick(#[from] settlement_core::error::TickError),

    /// The player/admin HTTP server failed to spawn.
    #[error("server startup error: {0}")]
    Startup(#[from] settlement_api::StartupError),

    /// A structure lifecycle operation failed while materializing a
    /// completed construction entry.
    #[error("structure error: {0}")]
    Structure(#[from] settlement_structures::StructureError),

    /// A disaster-damage computation failed.
    #[error("disaster error: {0}")]
    Disaster(#[from] settlement_disaster::DisasterError),

    /// A ledger entry failed validation.
    #[error("ledger error: {0}")]
    Ledger(#[from] settlement_ledger::LedgerError),
}
