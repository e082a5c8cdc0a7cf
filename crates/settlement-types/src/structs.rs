//! Core entity structs for the settlement engine: Account/Profile, Server,
//! World, Region, Tile, Biome, Settlement and its owned Storage/Population,
//! structure definitions and instances, modifiers, construction queue
//! entries, and the disaster lifecycle entities.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{
    BiomeKind, ConstructionStatus, DisasterStatus, DisasterType, EntityType, LedgerEntryType,
    Resource, Role, ServerStatus, SettlementTier, StructureCategory, StructureKind, WorldStatus,
};
use crate::ids::{
    AccountId, BiomeId, ConstructionId, DisasterHistoryId, DisasterId, LedgerEntryId, ModifierId,
    ProfileId, RegionId, ServerId, SettlementId, StructureDefId, StructureId, TileId, WorldId,
};

/// A map of the five settleable resources to integer amounts, used for
/// storage balances, build costs, and production/waste deltas.
pub type ResourceAmounts = BTreeMap<Resource, u32>;

// ---------------------------------------------------------------------------
// Account / Profile
// ---------------------------------------------------------------------------

/// A player account. Owns exactly one [`Profile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Account {
    /// Unique account identifier.
    pub id: AccountId,
    /// Login email, unique.
    pub email: String,
    /// Salted password hash; never serialized to external clients.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Bearer token used by the session resolver.
    #[serde(skip_serializing)]
    pub auth_token: String,
    /// Access role gating the admin REST surface.
    pub role: Role,
    /// Real-world creation time.
    pub created_at: DateTime<Utc>,
}

/// A player-facing profile, 1:1 with an [`Account`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Profile {
    /// Unique profile identifier.
    pub id: ProfileId,
    /// The account this profile belongs to.
    pub account_id: AccountId,
    /// Display name, unique.
    pub username: String,
    /// Opaque reference to an avatar asset.
    pub avatar_reference: Option<String>,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// A game server. Owns many [`World`]s. `(hostname, port)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Server {
    /// Unique server identifier.
    pub id: ServerId,
    /// Display name.
    pub name: String,
    /// Network hostname.
    pub hostname: String,
    /// Network port. `(hostname, port)` must be unique.
    pub port: u16,
    /// Current operational status.
    pub status: ServerStatus,
    /// Real-world creation time.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// World generation parameters
// ---------------------------------------------------------------------------

/// One of the three seeded noise bundles used by the world generator to
/// produce elevation, precipitation, or temperature fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NoiseBundle {
    /// Number of fractal octaves summed, `k = 0..octaves-1`.
    pub octaves: u32,
    /// Base amplitude of the first octave.
    #[ts(as = "String")]
    pub amplitude: Decimal,
    /// Base frequency of the first octave.
    #[ts(as = "String")]
    pub frequency: Decimal,
    /// Per-octave amplitude falloff, applied as `persistence^k`.
    #[ts(as = "String")]
    pub persistence: Decimal,
    /// Final scale multiplier applied to the summed value.
    #[ts(as = "String")]
    pub scale: Decimal,
    /// Seed for the deterministic noise function.
    pub seed: u64,
}

/// World-template-level tunables that scale production, depletion, and
/// disaster behavior uniformly across a world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TemplateConfig {
    /// Named template, e.g. `"RELAXED"`, `"STANDARD"`, `"HARDCORE"`.
    pub template_type: String,
    /// Overall build/upkeep difficulty multiplier.
    #[ts(as = "String")]
    pub difficulty: Decimal,
    /// Multiplier applied to base tile resource abundance at generation.
    #[ts(as = "String")]
    pub abundance: Decimal,
    /// Rate at which `tile.baseProductionModifier` decays under repeated
    /// disaster impact.
    #[ts(as = "String")]
    pub depletion: Decimal,
    /// Multiplier on disaster scheduling frequency.
    #[ts(as = "String")]
    pub disaster_frequency: Decimal,
    /// Multiplier on rolled disaster severity.
    #[ts(as = "String")]
    pub disaster_severity: Decimal,
    /// `worldMul` applied uniformly to all production.
    #[ts(as = "String")]
    pub world_production_multiplier: Decimal,
}

// ---------------------------------------------------------------------------
// World / Region / Tile / Biome
// ---------------------------------------------------------------------------

/// A game world owned by a [`Server`]. Owns many [`Region`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct World {
    /// Unique world identifier.
    pub id: WorldId,
    /// The server this world runs on.
    pub server_id: ServerId,
    /// Display name.
    pub name: String,
    /// Generation/readiness lifecycle status.
    pub status: WorldStatus,
    /// Reason generation failed, set only when `status == Failed`.
    pub failure_reason: Option<String>,
    /// Elevation noise bundle.
    pub elevation_noise: NoiseBundle,
    /// Precipitation noise bundle.
    pub precipitation_noise: NoiseBundle,
    /// Temperature noise bundle.
    pub temperature_noise: NoiseBundle,
    /// Width of the world in regions.
    pub width_regions: u32,
    /// Height of the world in regions.
    pub height_regions: u32,
    /// Template tunables.
    pub template: TemplateConfig,
    /// Real-world creation time.
    pub created_at: DateTime<Utc>,
}

/// The fixed number of tiles along one edge of a square region.
pub const REGION_SIZE: u32 = 10;

/// A 2-D block of [`Tile`]s inside a [`World`], addressed by `(x, y)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Region {
    /// Unique region identifier.
    pub id: RegionId,
    /// The world this region belongs to.
    pub world_id: WorldId,
    /// Region-grid X coordinate.
    pub x: i32,
    /// Region-grid Y coordinate.
    pub y: i32,
    /// Elevation field, row-major, `REGION_SIZE * REGION_SIZE` entries.
    pub elevation_map: Vec<f64>,
    /// Precipitation field, row-major, `REGION_SIZE * REGION_SIZE` entries.
    pub precipitation_map: Vec<f64>,
    /// Temperature field, row-major, `REGION_SIZE * REGION_SIZE` entries.
    pub temperature_map: Vec<f64>,
}

/// A single tile inside a [`Region`], addressed by `(x, y)` in tile space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Tile {
    /// Unique tile identifier.
    pub id: TileId,
    /// The region this tile belongs to.
    pub region_id: RegionId,
    /// Tile-grid X coordinate within the region.
    pub x: u32,
    /// Tile-grid Y coordinate within the region.
    pub y: u32,
    /// LAND or OCEAN, derived from elevation.
    pub tile_type: crate::enums::TileType,
    /// Raw elevation value.
    pub elevation: f64,
    /// Raw temperature value.
    pub temperature: f64,
    /// Raw precipitation value.
    pub precipitation: f64,
    /// Biome classification for this tile.
    pub biome: BiomeKind,
    /// Food quality scalar in `[0, 100]`.
    pub food_quality: u8,
    /// Water quality scalar in `[0, 100]`; derived from precipitation when
    /// not separately persisted.
    pub water_quality: u8,
    /// Wood quality scalar in `[0, 100]`.
    pub wood_quality: u8,
    /// Stone quality scalar in `[0, 100]`.
    pub stone_quality: u8,
    /// Ore quality scalar in `[0, 100]`.
    pub ore_quality: u8,
    /// Optional special-resource tag (e.g. `"rare_ore_vein"`).
    pub special_resource: Option<String>,
    /// Extractor capacity; default 5.
    pub plot_slots: u8,
    /// Persistent disaster depletion multiplier in `(0, 1]`.
    #[ts(as = "String")]
    pub base_production_modifier: Decimal,
    /// The settlement bound to this tile, if any (at most one).
    pub settlement_id: Option<SettlementId>,
}

/// A biome definition: a climate window, per-resource production
/// modifiers, and the plot-slot sampling range for tiles classified into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Biome {
    /// Unique biome identifier.
    pub id: BiomeId,
    /// The classification this definition covers.
    pub kind: BiomeKind,
    /// Minimum precipitation for tiles classified into this biome.
    pub precipitation_min: f64,
    /// Maximum precipitation for tiles classified into this biome.
    pub precipitation_max: f64,
    /// Minimum temperature for tiles classified into this biome.
    pub temperature_min: f64,
    /// Maximum temperature for tiles classified into this biome.
    pub temperature_max: f64,
    /// Per-resource production-efficiency modifiers (`biomeEff_r`).
    #[ts(as = "BTreeMap<Resource, String>")]
    pub resource_modifiers: BTreeMap<Resource, Decimal>,
    /// Minimum plot slots sampled for a tile of this biome.
    pub plot_slots_min: u8,
    /// Maximum plot slots sampled for a tile of this biome.
    pub plot_slots_max: u8,
}

// ---------------------------------------------------------------------------
// Settlement / Storage / Population
// ---------------------------------------------------------------------------

/// A settlement bound to exactly one LAND tile, owned by a [`Profile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Settlement {
    /// Unique settlement identifier.
    pub id: SettlementId,
    /// The owning profile.
    pub owner_profile_id: ProfileId,
    /// The tile this settlement is bound to (unique).
    pub tile_id: TileId,
    /// Display name.
    pub name: String,
    /// Growth tier, 1..4.
    pub tier: SettlementTier,
    /// Resilience score accumulated by surviving disasters, `[0, 100]`.
    pub resilience: u8,
    /// Marked by the tick driver when a panic occurs during this
    /// settlement's tick; skipped for one tick.
    pub errored: bool,
    /// Optimistic-concurrency timestamp.
    pub updated_at: DateTime<Utc>,
    /// Real-world creation time.
    pub created_at: DateTime<Utc>,
}

/// A settlement's integer resource storage. Exclusively owned 1:1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SettlementStorage {
    /// The settlement this storage belongs to.
    pub settlement_id: SettlementId,
    /// Current integer amounts per resource; always non-negative.
    pub amounts: ResourceAmounts,
    /// Maximum amount storable per resource before overflow is wasted.
    pub capacity: ResourceAmounts,
    /// Optimistic-concurrency timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A settlement's population state. Exclusively owned 1:1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SettlementPopulation {
    /// The settlement this population belongs to.
    pub settlement_id: SettlementId,
    /// Current population count.
    pub current: u32,
    /// Happiness, clamped `[0, 100]`.
    pub happiness: u8,
    /// Timestamp of the last growth-tick application.
    pub last_growth_at: DateTime<Utc>,
    /// Remaining ticks of decaying disaster-trauma happiness penalty.
    pub trauma_ticks_remaining: u32,
}

// ---------------------------------------------------------------------------
// Structure definitions
// ---------------------------------------------------------------------------

/// A static structure definition (not an instance). Looked up by
/// [`StructureKind`] via `settlement_structures::blueprint`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StructureDef {
    /// Unique definition identifier.
    pub id: StructureDefId,
    /// The structure subtype this definition describes.
    pub kind: StructureKind,
    /// EXTRACTOR or BUILDING.
    pub category: StructureCategory,
    /// Tier 1..5; gates `minTownHallLevel` style prerequisites.
    pub tier: u8,
    /// Maximum level this structure can be upgraded to.
    pub max_level: u8,
    /// Base construction time before emergency/workshop modifiers.
    pub construction_time_seconds: u32,
    /// Population assigned to operate this structure once built.
    pub population_required: u32,
    /// Settlement area consumed (BUILDING only; 0 for EXTRACTOR).
    pub area_cost: u32,
    /// Whether a settlement may own at most one instance of this kind.
    pub unique_per_settlement: bool,
    /// Minimum settlement tier's TownHall level required to build this.
    pub min_town_hall_level: u8,
}

/// A base resource cost entry for building a [`StructureDef`] at level 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StructureRequirement {
    /// The structure this requirement applies to.
    pub structure_def_id: StructureDefId,
    /// The resource required.
    pub resource: Resource,
    /// The quantity required.
    pub quantity: u32,
}

/// A prerequisite gating construction of a [`StructureDef`]: either another
/// structure at a minimum level, or (reserved for a future research/tech
/// tree) a research requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StructurePrerequisite {
    /// The structure this prerequisite gates.
    pub structure_def_id: StructureDefId,
    /// The required structure kind, if this is a structure prerequisite.
    pub required_structure: Option<StructureKind>,
    /// The minimum level of the required structure.
    pub required_level: u8,
}

// ---------------------------------------------------------------------------
// Structure instances
// ---------------------------------------------------------------------------

/// An instance of a [`StructureDef`] standing inside a [`Settlement`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SettlementStructure {
    /// Unique structure instance identifier.
    pub id: StructureId,
    /// The settlement this structure belongs to.
    pub settlement_id: SettlementId,
    /// The structure kind this instance was built from.
    pub kind: StructureKind,
    /// Current level, `>= 1`.
    pub level: u8,
    /// Current health, `[0, 100]`.
    pub health: u8,
    /// Population currently assigned to this structure.
    pub population_assigned: u32,
    /// For EXTRACTOR instances: the tile this structure occupies.
    pub tile_id: Option<TileId>,
    /// For EXTRACTOR instances: the occupied slot, unique per
    /// `(tile_id, slot_position)`.
    pub slot_position: Option<u8>,
    /// Timestamp of the most recent disaster damage, if any.
    pub damaged_at: Option<DateTime<Utc>>,
    /// Timestamp of the most recent repair, if any.
    pub repaired_at: Option<DateTime<Utc>>,
    /// Optimistic-concurrency timestamp.
    pub updated_at: DateTime<Utc>,
    /// Real-world creation time.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Modifiers
// ---------------------------------------------------------------------------

/// One structure's contribution to a [`SettlementModifier`]'s total,
/// recorded so the aggregate is explainable to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ModifierContribution {
    /// The contributing structure instance.
    pub structure_id: StructureId,
    /// The structure's level at the time of computation.
    pub level: u8,
    /// The rule-derived value this structure contributes.
    #[ts(as = "String")]
    pub value: Decimal,
}

/// A cached aggregate of one named modifier across all of a settlement's
/// structures. Invalidated by any structure mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SettlementModifier {
    /// Unique row identifier.
    pub id: ModifierId,
    /// The settlement this aggregate belongs to.
    pub settlement_id: SettlementId,
    /// The modifier's name, e.g. `"population_capacity"`.
    pub modifier_type: String,
    /// Sum over `contributing_structures[].value`; must equal the sum
    /// exactly, not approximately.
    #[ts(as = "String")]
    pub total_value: Decimal,
    /// Number of structures contributing a non-zero value.
    pub source_count: u32,
    /// Per-structure contribution records.
    pub contributing_structures: Vec<ModifierContribution>,
    /// When this aggregate was last (re)computed.
    pub last_calculated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Construction queue
// ---------------------------------------------------------------------------

/// One entry in a settlement's FIFO construction queue (positions `0..10`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ConstructionQueueEntry {
    /// Unique entry identifier.
    pub id: ConstructionId,
    /// The settlement this entry belongs to.
    pub settlement_id: SettlementId,
    /// The structure kind being built.
    pub structure_kind: StructureKind,
    /// The resource cost snapshot taken at enqueue time (post-emergency
    /// multiplier).
    pub resources_cost: ResourceAmounts,
    /// Current lifecycle status.
    pub status: ConstructionStatus,
    /// Position within the settlement's queue, a permutation of
    /// `0..n-1` among non-terminal entries.
    pub position: u8,
    /// Whether this entry was enqueued under emergency (AFTERMATH) rules.
    pub is_emergency: bool,
    /// When construction began (set on transition to IN_PROGRESS).
    pub started_at: Option<DateTime<Utc>>,
    /// When construction is scheduled to complete.
    pub completes_at: Option<DateTime<Utc>>,
    /// Real-world creation time.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Disaster lifecycle
// ---------------------------------------------------------------------------

/// A scheduled or active disaster affecting a world, optionally scoped to
/// a region and a set of biomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DisasterEvent {
    /// Unique disaster identifier.
    pub id: DisasterId,
    /// The world this disaster affects.
    pub world_id: WorldId,
    /// The disaster type (biome-weighted selection).
    pub disaster_type: DisasterType,
    /// Raw severity score in `[0, 100]`.
    pub severity: u8,
    /// The severity band derived from `severity`.
    pub severity_level: crate::enums::SeverityLevel,
    /// The region this disaster is scoped to, if region-limited.
    pub affected_region: Option<RegionId>,
    /// The biomes this disaster affects, if biome-limited.
    pub affected_biomes: Vec<BiomeKind>,
    /// When the disaster is/was scheduled to begin impact.
    pub scheduled_at: DateTime<Utc>,
    /// Seconds of warning before `scheduled_at`.
    pub warning_time_seconds: u32,
    /// Seconds the IMPACT phase lasts.
    pub impact_duration_seconds: u32,
    /// Current lifecycle status (monotonic).
    pub status: DisasterStatus,
    /// When the WARNING phase began.
    pub warning_started_at: Option<DateTime<Utc>>,
    /// When the IMPACT phase began.
    pub impact_started_at: Option<DateTime<Utc>>,
    /// When the IMPACT phase ended.
    pub impact_ended_at: Option<DateTime<Utc>>,
    /// Whether `disaster-imminent` has already been emitted once.
    pub imminent_warning_issued: bool,
}

/// A per-settlement record of a disaster's effects, persisted at AFTERMATH
/// entry and retained for history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DisasterHistory {
    /// Unique history row identifier.
    pub id: DisasterHistoryId,
    /// The settlement this record describes.
    pub settlement_id: SettlementId,
    /// The disaster this record describes.
    pub disaster_id: DisasterId,
    /// Population lost.
    pub casualties: u32,
    /// Structures that took damage but survived.
    pub structures_damaged: u32,
    /// Structures destroyed outright (health reached zero).
    pub structures_destroyed: u32,
    /// Resources lost from storage.
    pub resources_lost: ResourceAmounts,
    /// Resilience points gained at RESOLVED for surviving this disaster.
    pub resilience_gained: u8,
    /// Real-world creation time.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Ledger (storage bookkeeping underpinning production, construction, and disaster impact)
// ---------------------------------------------------------------------------

/// A single double-entry movement of one resource between two entities.
///
/// Every settlement storage mutation outside of direct admin seeding is
/// recorded as a `LedgerEntry` so the tick driver can verify, per tick, that
/// debits and credits balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LedgerEntry {
    /// Unique entry identifier.
    pub id: LedgerEntryId,
    /// The simulation tick this entry was recorded during.
    pub tick: u64,
    /// The category of movement this entry records.
    pub entry_type: LedgerEntryType,
    /// The source (debit) entity, if this entry type has one.
    pub from_entity: Option<uuid::Uuid>,
    /// The source entity's type.
    pub from_entity_type: Option<EntityType>,
    /// The destination (credit) entity, if this entry type has one.
    pub to_entity: Option<uuid::Uuid>,
    /// The destination entity's type.
    pub to_entity_type: Option<EntityType>,
    /// The resource moved.
    pub resource: Resource,
    /// The (always strictly positive) quantity moved.
    pub quantity: u32,
    /// A short machine-oriented reason code, e.g. `"TICK_PRODUCTION"`.
    pub reason: String,
    /// An optional reference to the entity that caused this entry, e.g. a
    /// `ConstructionId` for a debit/refund pair.
    pub reference_id: Option<uuid::Uuid>,
    /// Real-world creation time.
    pub created_at: DateTime<Utc>,
}
