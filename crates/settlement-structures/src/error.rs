//! Error types for the `settlement-structures` crate.

use settlement_types::StructureKind;

/// Errors that can occur while validating or executing a structure
/// mutation.
#[derive(Debug, thiserror::Error)]
pub enum StructureError {
    /// Arithmetic overflow while evaluating a modifier formula or cost.
    #[error("arithmetic overflow computing a modifier or cost")]
    ArithmeticOverflow,

    /// One or more prerequisite structures are missing or under-leveled.
    #[error("prerequisites not met: {0:?}")]
    PrerequisitesNotMet(Vec<StructureKind>),

    /// The structure is already at its maximum level.
    #[error("{kind:?} is already at its maximum level {max_level}")]
    MaxLevelReached {
        /// The structure kind.
        kind: StructureKind,
        /// The definition's maximum level.
        max_level: u8,
    },

    /// A `unique_per_settlement` structure already exists in the target
    /// settlement.
    #[error("{0:?} is unique per settlement and one is already built here")]
    DuplicateUnique(StructureKind),

    /// The target tile/slot is already occupied by another extractor.
    #[error("slot {slot} on the target tile is already occupied")]
    SlotOccupied {
        /// The occupied slot index.
        slot: u8,
    },

    /// Not enough settlement area remains for a BUILDING-category
    /// structure.
    #[error("insufficient settlement area: needs {needed}, {available} available")]
    InsufficientArea {
        /// Area the structure would consume.
        needed: u32,
        /// Area currently available.
        available: u32,
    },

    /// The settlement's TownHall level does not meet the definition's
    /// minimum.
    #[error("settlement tier too low: requires TownHall level {required}, has {actual}")]
    TierTooLow {
        /// Required TownHall level.
        required: u8,
        /// The settlement's actual TownHall level.
        actual: u8,
    },
}
