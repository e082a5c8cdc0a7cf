//! Structure modifier engine and the build/upgrade/demolish service.
//!
//! A structure's modifiers at level L are computed by rule, not stored
//! per level. [`rules`] holds the formula table; [`modifiers`] sums
//! per-structure contributions into the cached `SettlementModifier`
//! aggregate a settlement mutation invalidates; [`prerequisites`]
//! validates minimum-level gating as a pure function; [`service`]
//! implements Build/Upgrade/Demolish.
//!
//! # Modules
//!
//! - [`rules`] -- Named modifier formulas (linear, exponential,
//!   diminishing) keyed by structure kind.
//! - [`modifiers`] -- Aggregate recomputation across a settlement's
//!   structures.
//! - [`prerequisites`] -- Minimum-level prerequisite validation.
//! - [`service`] -- Build/Upgrade/Demolish validation and construction.
//! - [`error`] -- Error types for structure operations.

pub mod error;
pub mod modifiers;
pub mod prerequisites;
pub mod rules;
pub mod service;

pub use error::StructureError;
pub use rules::Formula;
pub use service::{area_freed, build, demolish, upgrade, BuildRequest, DemolishResult};
