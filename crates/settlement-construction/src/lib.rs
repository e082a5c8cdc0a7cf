//! The per-settlement construction queue: enqueue, complete,
//! cancel, and position bookkeeping.
//!
//! A pure domain library. The caller owns the transaction: load the
//! settlement's existing entries and storage, call [`queue::enqueue`] or
//! [`queue::cancel`], debit/refund via `settlement-ledger`, and persist
//! the result.
//!
//! # Modules
//!
//! - [`cost`] -- Emergency cost scaling, shortage detection, and
//!   completion-time computation.
//! - [`queue`] -- Enqueue/cancel/promote and position compaction.
//! - [`error`] -- Error types for queue operations.

pub mod cost;
pub mod error;
pub mod queue;

pub use error::ConstructionError;
pub use queue::{cancel, compact_positions, enqueue, promote_next_queued, EnqueueOutcome, EnqueueRequest, MAX_ACTIVE, MAX_QUEUE_LEN};
