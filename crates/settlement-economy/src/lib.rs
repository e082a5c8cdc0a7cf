//! The per-tick production and population calculators.
//!
//! A pure domain library: no database or ledger coupling. Callers load a
//! settlement's current state, run these calculators, and persist the
//! result plus any waste/starvation events through `settlement-ledger`.
//!
//! # Modules
//!
//! - [`config`] -- Rate tables: base extraction rates, tier and health
//!   multiplier step functions, disaster resistance.
//! - [`production`] -- The extractor production formula and
//!   capacity-overflow commit splitting.
//! - [`population`] -- Capacity, happiness, growth, and starvation for
//!   one growth-tick window.
//! - [`error`] -- Error types for calculator operations.

pub mod config;
pub mod error;
pub mod population;
pub mod production;

pub use config::ProductionConfig;
pub use error::EconomyError;
pub use population::{PopulationConfig, PopulationTickResult};
pub use production::{CommitOutcome, DisasterImpact, ExtractorContribution};
