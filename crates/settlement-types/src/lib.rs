//! Shared type definitions for the settlement engine.
//!
//! This crate is the single source of truth for all types used across the
//! workspace. Types defined here flow downstream to `TypeScript` via
//! `ts-rs` for the out-of-scope browser UI.
//!
//! # Modules
//!
//! - [`ids`] -- type-safe UUID wrappers for all entity identifiers
//! - [`enums`] -- enumeration types (resources, structures, disasters, status)
//! - [`structs`] -- core entity structs
//! - [`events`] -- event-channel payloads fanned out over the room-based broadcast registry

pub mod enums;
pub mod events;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    BiomeKind, ConstructionStatus, DisasterStatus, DisasterType, EntityType, LedgerEntryType,
    Resource, Role, ServerStatus, SettlementTier, SeverityLevel, StructureCategory, StructureKind,
    TileType, WorldStatus,
};
pub use events::{
    ConstructionProgress, DisasterImpactSummary, ErrorEnvelope, OutboundEvent, RoomKey,
};
pub use ids::{
    AccountId, BiomeId, ConstructionId, DisasterHistoryId, DisasterId, LedgerEntryId, ModifierId,
    ProfileId, RegionId, ServerId, SettlementId, StructureDefId, StructureId, TileId, WorldId,
};
pub use structs::{
    Account, Biome, ConstructionQueueEntry, DisasterEvent, DisasterHistory, LedgerEntry,
    ModifierContribution, NoiseBundle, Profile, Region, ResourceAmounts, Server, Settlement,
    SettlementModifier, SettlementPopulation, SettlementStorage, SettlementStructure,
    StructureDef, StructureRequirement, StructurePrerequisite, TemplateConfig, Tile, World,
    REGION_SIZE,
};

#[cfg(test)]
mod tests {
    //! Integration tests for type exports and `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs generates TypeScript bindings when types with
        // #[ts(export)] are used. Importing them here triggers generation.
        // The actual files are written to the `bindings/` directory
        // relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::AccountId::export_all();
        let _ = crate::ids::ProfileId::export_all();
        let _ = crate::ids::ServerId::export_all();
        let _ = crate::ids::WorldId::export_all();
        let _ = crate::ids::RegionId::export_all();
        let _ = crate::ids::TileId::export_all();
        let _ = crate::ids::BiomeId::export_all();
        let _ = crate::ids::SettlementId::export_all();
        let _ = crate::ids::StructureDefId::export_all();
        let _ = crate::ids::StructureId::export_all();
        let _ = crate::ids::ModifierId::export_all();
        let _ = crate::ids::ConstructionId::export_all();
        let _ = crate::ids::DisasterId::export_all();
        let _ = crate::ids::DisasterHistoryId::export_all();
        let _ = crate::ids::LedgerEntryId::export_all();

        // Enums
        let _ = crate::enums::Role::export_all();
        let _ = crate::enums::ServerStatus::export_all();
        let _ = crate::enums::WorldStatus::export_all();
        let _ = crate::enums::TileType::export_all();
        let _ = crate::enums::Resource::export_all();
        let _ = crate::enums::BiomeKind::export_all();
        let _ = crate::enums::SettlementTier::export_all();
        let _ = crate::enums::StructureCategory::export_all();
        let _ = crate::enums::StructureKind::export_all();
        let _ = crate::enums::ConstructionStatus::export_all();
        let _ = crate::enums::DisasterType::export_all();
        let _ = crate::enums::SeverityLevel::export_all();
        let _ = crate::enums::DisasterStatus::export_all();
        let _ = crate::enums::LedgerEntryType::export_all();
        let _ = crate::enums::EntityType::export_all();

        // Structs
        let _ = crate::structs::Account::export_all();
        let _ = crate::structs::Profile::export_all();
        let _ = crate::structs::Server::export_all();
        let _ = crate::structs::NoiseBundle::export_all();
        let _ = crate::structs::TemplateConfig::export_all();
        let _ = crate::structs::World::export_all();
        let _ = crate::structs::Region::export_all();
        let _ = crate::structs::Tile::export_all();
        let _ = crate::structs::Biome::export_all();
        let _ = crate::structs::Settlement::export_all();
        let _ = crate::structs::SettlementStorage::export_all();
        let _ = crate::structs::SettlementPopulation::export_all();
        let _ = crate::structs::StructureDef::export_all();
        let _ = crate::structs::StructureRequirement::export_all();
        let _ = crate::structs::StructurePrerequisite::export_all();
        let _ = crate::structs::SettlementStructure::export_all();
        let _ = crate::structs::ModifierContribution::export_all();
        let _ = crate::structs::SettlementModifier::export_all();
        let _ = crate::structs::ConstructionQueueEntry::export_all();
        let _ = crate::structs::DisasterEvent::export_all();
        let _ = crate::structs::DisasterHistory::export_all();
        let _ = crate::structs::LedgerEntry::export_all();

        // Events
        let _ = crate::events::RoomKey::export_all();
        let _ = crate::events::ConstructionProgress::export_all();
        let _ = crate::events::DisasterImpactSummary::export_all();
        let _ = crate::events::OutboundEvent::export_all();
        let _ = crate::events::ErrorEnvelope::export_all();
    }
}
