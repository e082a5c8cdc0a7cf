//! Error types for the game loop driver.

use settlement_construction::ConstructionError;
use settlement_disaster::DisasterError;
use settlement_economy::EconomyError;

use crate::clock::ClockError;

/// Errors that can occur while advancing one tick.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// The tick clock failed to advance.
    #[error("clock error: {0}")]
    Clock(#[from] ClockError),

    /// A production or population calculation failed.
    #[error("economy error: {0}")]
    Economy(#[from] EconomyError),

    /// A construction queue operation failed.
    #[error("construction error: {0}")]
    Construction(#[from] ConstructionError),

    /// A disaster lifecycle operation failed.
    #[error("disaster error: {0}")]
    Disaster(#[from] DisasterError),
}
