//! Disaster scheduling, lifecycle advancement, and per-tick damage.
//!
//! A pure domain library: no database coupling. The caller persists
//! [`DisasterEvent`](settlement_types::DisasterEvent) rows and applies the
//! structure health loss / casualty figures this crate computes.
//!
//! # Modules
//!
//! - [`schedule`] -- Biome-weighted disaster type selection.
//! - [`engine`] -- The SCHEDULED/WARNING/IMPACT/AFTERMATH/RESOLVED state
//!   machine.
//! - [`damage`] -- Per-tick structure health loss and casualty formulas.
//! - [`error`] -- Error types for scheduling and advancement.

pub mod damage;
pub mod engine;
pub mod error;
pub mod schedule;

pub use engine::{resilience_gain, Transition};
pub use error::DisasterError;
pub use schedule::{risk_table, select_disaster_type, RiskTable};
