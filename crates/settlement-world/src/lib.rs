//! Procedural world generation for the settlement engine.
//!
//! Implements the deterministic `Generate(worldSpec) -> (regions, tiles)`
//! contract: seeded multi-octave fractal noise for elevation,
//! precipitation, and temperature; tile-type and biome classification;
//! per-resource quality derivation; and plot-slot sampling.
//!
//! # Modules
//!
//! - [`noise`] -- Deterministic fractal noise built on the same
//!   xorshift64 mixing technique used elsewhere in the engine for
//!   reproducible randomness.
//! - [`classify`] -- Tile-type and biome classification, resource
//!   quality derivation, and plot-slot sampling.
//! - [`generator`] -- Top-level generation, producing the full
//!   region/tile grid for a world.
//! - [`error`] -- Error types for world generation.

pub mod classify;
pub mod error;
pub mod generator;
pub mod noise;

pub use error::WorldError;
pub use generator::{GeneratedWorld, generate};
