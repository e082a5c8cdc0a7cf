//! Error types for the `settlement-construction` crate.

use settlement_types::ResourceAmounts;

/// Errors that can occur while enqueueing, completing, or cancelling a
/// construction queue entry.
#[derive(Debug, thiserror::Error)]
pub enum ConstructionError {
    /// Not enough storage to cover the computed cost.
    #[error("insufficient resources: shortages {shortages:?}")]
    InsufficientResources {
        /// Per-resource amount still needed.
        shortages: ResourceAmounts,
    },

    /// The settlement already has 10 non-terminal queue entries.
    #[error("construction queue is full (10 non-terminal entries)")]
    QueueFull,

    /// Emergency enqueue was requested outside an active AFTERMATH
    /// disaster window.
    #[error("emergency construction is only permitted during disaster aftermath")]
    EmergencyNotAllowed,

    /// An operation was attempted on an entry already in a terminal
    /// status.
    #[error("construction entry is already {status:?}")]
    AlreadyTerminal {
        /// The entry's current terminal status.
        status: settlement_types::ConstructionStatus,
    },

    /// Arithmetic overflow while computing cost or duration.
    #[error("arithmetic overflow computing {context}")]
    ArithmeticOverflow {
        /// Description of what was being computed.
        context: &'static str,
    },
}
