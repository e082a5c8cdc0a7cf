//! Double-entry bookkeeping for settlement resource storage.
//!
//! Every mutation of a settlement's integer resource storage outside direct
//! admin seeding is recorded as a `LedgerEntry` so the tick driver can
//! verify, per tick, that production credits, construction debits/refunds,
//! and loss debits all balance.
//!
//! # Architecture
//!
//! - [`ledger`] -- the [`Ledger`] struct: an append-only log with recording methods.
//! - [`transaction`] -- the [`TransactionBuilder`] for validated entry construction.
//! - [`conservation`] -- conservation law verification and anomaly detection.
//!
//! # Entry types and entity pairs
//!
//! | Type                | From (debit) | To (credit)  | Kind     |
//! |----------------------|--------------|--------------|----------|
//! | `Production`         | World        | Settlement   | source   |
//! | `ConstructionDebit`   | Settlement   | Construction | internal |
//! | `ConstructionRefund`  | Construction | Settlement   | internal |
//! | `Waste`               | Settlement   | Void         | sink     |
//! | `DisasterLoss`        | Settlement   | Void         | sink     |
//!
//! Source flows create resources (tick production, out of the world model).
//! Sink flows destroy them (storage overflow waste, disaster losses).
//! Internal flows move resources between a settlement and its own in-flight
//! construction queue; each entry carries the same quantity on both sides,
//! so internal movements balance by construction and the check is
//! defense-in-depth rather than a real constraint.
//!
//! All quantities are `u32`, matching the integer resource storage they
//! account for -- no floating point or decimal rounding enters bookkeeping.
//!
//! # Usage
//!
//! ```
//! use settlement_ledger::{ConservationResult, Ledger};
//! use settlement_types::{Resource, SettlementId, WorldId};
//!
//! let mut ledger = Ledger::new();
//! let world = WorldId::new();
//! let settlement = SettlementId::new();
//!
//! ledger
//!     .record_production(1, Resource::Wood, 10, world, settlement)
//!     .ok();
//!
//! assert_eq!(ledger.verify_conservation(1), ConservationResult::Balanced);
//! ```

pub mod conservation;
pub mod ledger;
pub mod transaction;

pub use conservation::ConservationResult;
pub use ledger::{ConstructionTransferParams, Ledger, TransferParams};
pub use transaction::TransactionBuilder;

use std::collections::BTreeMap;

use settlement_types::{LedgerEntryType, Resource};

/// Errors that can occur when recording ledger entries.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Quantity must be strictly positive.
    #[error("ledger entry quantity must be non-zero")]
    ZeroQuantity,

    /// A required field was not set on the builder.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The from/to entity types do not match the expected types for the
    /// entry type.
    #[error("invalid entity type for {entry_type:?} {side}: expected {expected}, got {actual}")]
    InvalidEntityType {
        /// The entry type being validated.
        entry_type: LedgerEntryType,
        /// Which side of the entry (`"from"` or `"to"`).
        side: &'static str,
        /// The expected entity type.
        expected: String,
        /// The actual entity type.
        actual: String,
    },

    /// Summing ledger quantities for conservation verification overflowed
    /// `u32`.
    #[error("arithmetic overflow while summing ledger quantities")]
    ArithmeticOverflow,

    /// An internal error that should not occur in normal operation.
    #[error("internal ledger error: {0}")]
    InternalError(&'static str),
}

/// A conservation law violation detected during tick verification.
///
/// When the conservation check finds that internal credits and debits do
/// not balance for one or more resources in a tick, this struct captures
/// the details for alerting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAnomaly {
    /// The tick where the anomaly was detected.
    pub tick: u64,
    /// Per-resource imbalance: `(debit_total, credit_total)` for each
    /// resource that did not balance.
    pub imbalances: BTreeMap<Resource, (u32, u32)>,
    /// Human-readable description of the anomaly.
    pub message: String,
}

impl core::fmt::Display for LedgerAnomaly {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message)
    }
}
