//! Error types for the `settlement-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`] through the
//! standard [`Result`] type alias.

use settlement_types::{BiomeKind, RegionId, WorldId};

/// Errors that can occur during world generation.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The requested world was not found.
    #[error("world not found: {0}")]
    WorldNotFound(WorldId),

    /// A region referenced by a generation step does not exist.
    #[error("region not found: {0}")]
    RegionNotFound(RegionId),

    /// No biome definition's climate window contains a classified tile,
    /// meaning the seeded biome table doesn't cover the full precip/temp
    /// space (a configuration bug, not a runtime condition).
    #[error("no biome definition covers precipitation={precipitation}, temperature={temperature}")]
    NoCoveringBiome {
        /// The tile's precipitation value.
        precipitation: f64,
        /// The tile's temperature value.
        temperature: f64,
    },

    /// A biome's plot-slot range is empty (`min > max`), a configuration bug.
    #[error("biome {0:?} has an empty plot-slot range")]
    EmptyPlotSlotRange(BiomeKind),

    /// World dimensions are invalid (zero width or height).
    #[error("invalid world dimensions: {width}x{height} regions")]
    InvalidDimensions {
        /// Requested width in regions.
        width: u32,
        /// Requested height in regions.
        height: u32,
    },

    /// Generation failed for a reason recorded on the world's
    /// `failure_reason` field.
    #[error("world generation failed: {0}")]
    GenerationFailed(String),
}
