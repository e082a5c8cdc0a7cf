//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every entity in the settlement engine has a strongly-typed ID to prevent
//! accidental mixing of identifiers at compile time. All IDs use UUID v7
//! (time-ordered) for efficient database indexing.
//!
//! `PostgreSQL` generates UUIDs via `DEFAULT uuidv7()` for inserts. The
//! `new()` constructors here exist for cases where app-side generation is
//! needed (tests, seed data, optimistic inserts before the round trip).

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for an Account.
    AccountId
}

define_id! {
    /// Unique identifier for a Profile (1:1 with an Account).
    ProfileId
}

define_id! {
    /// Unique identifier for a Server, which owns many Worlds.
    ServerId
}

define_id! {
    /// Unique identifier for a World.
    WorldId
}

define_id! {
    /// Unique identifier for a Region inside a World.
    RegionId
}

define_id! {
    /// Unique identifier for a Tile inside a Region.
    TileId
}

define_id! {
    /// Unique identifier for a Biome definition.
    BiomeId
}

define_id! {
    /// Unique identifier for a Settlement.
    SettlementId
}

define_id! {
    /// Unique identifier for a Structure definition (not an instance).
    StructureDefId
}

define_id! {
    /// Unique identifier for a SettlementStructure instance.
    StructureId
}

define_id! {
    /// Unique identifier for a SettlementModifier cache row.
    ModifierId
}

define_id! {
    /// Unique identifier for a ConstructionQueueEntry.
    ConstructionId
}

define_id! {
    /// Unique identifier for a DisasterEvent.
    DisasterId
}

define_id! {
    /// Unique identifier for a DisasterHistory row.
    DisasterHistoryId
}

define_id! {
    /// Unique identifier for a LedgerEntry row.
    LedgerEntryId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let settlement = SettlementId::new();
        let tile = TileId::new();
        // These are different types -- the compiler enforces no mixing.
        assert_ne!(settlement.into_inner(), Uuid::nil());
        assert_ne!(tile.into_inner(), Uuid::nil());
    }

    #[test]
    fn id_roundtrip_serde() {
        let original = SettlementId::new();
        let json = serde_json::to_string(&original).ok();
        assert!(json.is_some());
        let restored: Result<SettlementId, _> =
            serde_json::from_str(json.as_deref().unwrap_or(""));
        assert!(restored.is_ok());
    }

    #[test]
    fn id_display_matches_uuid() {
        let id = StructureId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }

    #[test]
    fn ledger_entry_id_roundtrips() {
        let original = LedgerEntryId::new();
        let json = serde_json::to_string(&original).ok();
        assert!(json.is_some());
        let restored: Result<LedgerEntryId, _> =
            serde_json::from_str(json.as_deref().unwrap_or(""));
        assert!(restored.is_ok());
    }
}
