//! Error types for the `settlement-disaster` crate.

use settlement_types::DisasterStatus;

/// Errors that can occur while scheduling or advancing a disaster.
#[derive(Debug, thiserror::Error)]
pub enum DisasterError {
    /// The requested status transition reverses or skips the state
    /// machine.
    #[error("cannot advance disaster from {from:?} to {to:?}")]
    IllegalTransition {
        /// The disaster's current status.
        from: DisasterStatus,
        /// The requested next status.
        to: DisasterStatus,
    },

    /// A biome has no entries in the risk table.
    #[error("no disaster risk table entry for biome {0:?}")]
    NoRiskTableEntry(settlement_types::BiomeKind),

    /// Arithmetic overflow while computing damage or casualties.
    #[error("arithmetic overflow computing {context}")]
    ArithmeticOverflow {
        /// Description of what was being computed.
        context: &'static str,
    },
}
