//! Enumeration types for the settlement engine.
//!
//! All enumerations are organized by the data-model entity they classify,
//! plus the disaster taxonomy.
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Account / role
// ---------------------------------------------------------------------------

/// The role held by an Account, used by the admin REST auth resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Role {
    /// A regular player.
    Member,
    /// Support staff with elevated read access (not modeled further here).
    Support,
    /// Full administrative access; required for every admin route.
    Administrator,
}

// ---------------------------------------------------------------------------
// Server / World lifecycle
// ---------------------------------------------------------------------------

/// Operational status of a Server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ServerStatus {
    /// Not accepting connections.
    Offline,
    /// Accepting admin connections only.
    Maintenance,
    /// Fully available.
    Online,
}

/// Lifecycle status of a World.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum WorldStatus {
    /// Region and tile generation is still running; gameplay is blocked.
    Generating,
    /// Generation succeeded; the world accepts settlements.
    Ready,
    /// Generation failed; see the world's failure reason.
    Failed,
}

// ---------------------------------------------------------------------------
// Tiles / biomes
// ---------------------------------------------------------------------------

/// Whether a Tile can host a Settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum TileType {
    /// Elevation < 0; never settleable, zero land-resource quality.
    Ocean,
    /// Elevation >= 0; settleable.
    Land,
}

/// A resource produced by extractor structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Resource {
    /// Harvested from farms; quality derives from tile food quality.
    Food,
    /// Drawn from wells; quality derives from precipitation when tile
    /// `waterQuality` is unavailable.
    Water,
    /// Harvested from forests.
    Wood,
    /// Quarried from rocky terrain.
    Stone,
    /// Mined from ore-bearing tiles.
    Ore,
}

impl Resource {
    /// All five resources, in the canonical order used for storage maps
    /// and the starting-resource table.
    pub const ALL: [Resource; 5] = [
        Resource::Food,
        Resource::Water,
        Resource::Wood,
        Resource::Stone,
        Resource::Ore,
    ];
}

/// A named biome classification with a climate window and resource
/// modifiers. Identifiers are stable and used for deterministic
/// first-match tie-breaking during classification and for the
/// biome -> disaster-type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum BiomeKind {
    /// Temperate, moderate precipitation; balanced production.
    Grassland,
    /// High precipitation, moderate temperature; wood-favored.
    Forest,
    /// Low precipitation, high temperature; ore/stone-favored.
    Desert,
    /// High elevation signal; stone/ore-favored, low food.
    Mountain,
    /// Low temperature, low precipitation.
    Tundra,
    /// High precipitation, moderate-to-high temperature; food-favored.
    Swamp,
    /// Moderate precipitation and temperature, adjacent to ocean tiles.
    Coastal,
    /// Ocean tiles; never settleable.
    Ocean,
}

impl BiomeKind {
    /// All biome kinds, in the deterministic tie-break ordering used by
    /// classification (declaration order is the id ordering).
    pub const ALL: [BiomeKind; 8] = [
        BiomeKind::Grassland,
        BiomeKind::Forest,
        BiomeKind::Desert,
        BiomeKind::Mountain,
        BiomeKind::Tundra,
        BiomeKind::Swamp,
        BiomeKind::Coastal,
        BiomeKind::Ocean,
    ];
}

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

/// A settlement's growth tier, gating structure tiers and construction
/// decisions (`minTownHallLevel`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum SettlementTier {
    /// Tier 1.
    Outpost,
    /// Tier 2.
    Village,
    /// Tier 3.
    Town,
    /// Tier 4.
    City,
}

impl SettlementTier {
    /// The tier as an integer 1..4, matching the data model's `(1..4)`.
    pub const fn as_level(self) -> u8 {
        match self {
            SettlementTier::Outpost => 1,
            SettlementTier::Village => 2,
            SettlementTier::Town => 3,
            SettlementTier::City => 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Structures
// ---------------------------------------------------------------------------

/// The functional category of a Structure definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum StructureCategory {
    /// Occupies a tile slot and produces a resource.
    Extractor,
    /// Consumes settlement area; may be unique per settlement.
    Building,
}

/// A structure subtype. `category()` determines whether it is an
/// EXTRACTOR (tile-bound, slotted) or a BUILDING (area-bound).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum StructureKind {
    /// EXTRACTOR producing food.
    Farm,
    /// EXTRACTOR producing water.
    Well,
    /// EXTRACTOR producing wood.
    LumberCamp,
    /// EXTRACTOR producing stone.
    Quarry,
    /// EXTRACTOR producing ore.
    Mine,
    /// BUILDING, unique; governs settlement tier and minTownHallLevel gate.
    TownHall,
    /// BUILDING; adds population capacity.
    House,
    /// BUILDING; adds storage capacity.
    Warehouse,
    /// BUILDING, unique; speeds construction (workshop bonus).
    Workshop,
    /// BUILDING; shelters population during disasters, reduces casualties.
    Shelter,
    /// BUILDING; reduces disaster structure damage in its settlement.
    Wall,
}

impl StructureKind {
    /// The category this kind belongs to.
    pub const fn category(self) -> StructureCategory {
        match self {
            StructureKind::Farm
            | StructureKind::Well
            | StructureKind::LumberCamp
            | StructureKind::Quarry
            | StructureKind::Mine => StructureCategory::Extractor,
            StructureKind::TownHall
            | StructureKind::House
            | StructureKind::Warehouse
            | StructureKind::Workshop
            | StructureKind::Shelter
            | StructureKind::Wall => StructureCategory::Building,
        }
    }

    /// The resource an EXTRACTOR of this kind produces, if any.
    pub const fn produces(self) -> Option<Resource> {
        match self {
            StructureKind::Farm => Some(Resource::Food),
            StructureKind::Well => Some(Resource::Water),
            StructureKind::LumberCamp => Some(Resource::Wood),
            StructureKind::Quarry => Some(Resource::Stone),
            StructureKind::Mine => Some(Resource::Ore),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// The lifecycle status of a ConstructionQueueEntry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ConstructionStatus {
    /// Waiting for an active slot (more than 3 already in progress).
    Queued,
    /// Actively under construction; counts against the 3-active limit.
    InProgress,
    /// Finished; a SettlementStructure row was created.
    Complete,
    /// Cancelled before completion; 50% of the cost was refunded.
    Cancelled,
}

impl ConstructionStatus {
    /// Whether this status counts as terminal (no longer occupies a queue
    /// slot or the 10-total non-terminal limit).
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ConstructionStatus::Complete | ConstructionStatus::Cancelled
        )
    }
}

// ---------------------------------------------------------------------------
// Disasters
// ---------------------------------------------------------------------------

/// The fifteen disaster types named in the biome -> disaster table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum DisasterType {
    /// Reduces water and food production over a sustained period.
    Drought,
    /// High-wind event; damages buildings, low casualty risk.
    Tornado,
    /// Crop-eating swarm; reduces food production sharply.
    LocustSwarm,
    /// Rising water; damages low-lying structures.
    Flood,
    /// Spreading fire; high structure damage, moderate casualties.
    Wildfire,
    /// Sustained high temperature; reduces water, raises casualty risk.
    Heatwave,
    /// Ground shaking; damages all structure categories.
    Earthquake,
    /// Wind-driven sand; damages exposed extractors.
    Sandstorm,
    /// Heavy snow slide; damages mountain/tundra settlements.
    Avalanche,
    /// Ground displacement; damages mountain settlements.
    Landslide,
    /// Eruptive event; highest single-event severity ceiling.
    Volcano,
    /// Severe winter storm; damages buildings, raises casualty risk.
    Blizzard,
    /// Insect infestation; damages forest/swamp food production.
    InsectPlague,
    /// Crop and plant disease; reduces food production.
    Blight,
    /// Coastal wind-and-surge event; damages coastal/ocean settlements.
    Hurricane,
}

/// The ordinal severity band of a DisasterEvent, mapping to the impact
/// fraction used by `disasterMod_r` and structure/casualty damage
/// calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum SeverityLevel {
    /// Impact fraction 0.2.
    Mild,
    /// Impact fraction 0.4.
    Moderate,
    /// Impact fraction 0.6.
    Major,
    /// Impact fraction 0.8.
    Catastrophic,
}

impl SeverityLevel {
    /// Classify a raw severity score in `[0, 100]` into its band.
    pub const fn from_score(severity: u8) -> Self {
        match severity {
            0..=24 => SeverityLevel::Mild,
            25..=49 => SeverityLevel::Moderate,
            50..=74 => SeverityLevel::Major,
            _ => SeverityLevel::Catastrophic,
        }
    }

    /// The multiplicative impact fraction for this band.
    pub const fn impact_fraction(self) -> rust_decimal::Decimal {
        match self {
            SeverityLevel::Mild => rust_decimal::Decimal::from_parts(2, 0, 0, false, 1),
            SeverityLevel::Moderate => rust_decimal::Decimal::from_parts(4, 0, 0, false, 1),
            SeverityLevel::Major => rust_decimal::Decimal::from_parts(6, 0, 0, false, 1),
            SeverityLevel::Catastrophic => rust_decimal::Decimal::from_parts(8, 0, 0, false, 1),
        }
    }
}

/// The lifecycle status of a DisasterEvent.
/// Transitions are monotonic: no variant here may move to an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum DisasterStatus {
    /// Scheduled; type picked, waiting for the warning window to open.
    Scheduled,
    /// Warning window open; `disaster-warning` / `disaster-imminent` emitted.
    Warning,
    /// Actively dealing damage and casualties.
    Impact,
    /// Impact finished; emergency-construction window open for 48h.
    Aftermath,
    /// Terminal; resilience gain computed, retained for history.
    Resolved,
}

impl DisasterStatus {
    /// Whether `self -> next` is a legal (non-reversing) transition.
    pub const fn can_advance_to(self, next: DisasterStatus) -> bool {
        use DisasterStatus::{Aftermath, Impact, Resolved, Scheduled, Warning};
        matches!(
            (self, next),
            (Scheduled, Warning)
                | (Warning, Impact)
                | (Impact, Aftermath)
                | (Aftermath, Resolved)
        )
    }
}

// ---------------------------------------------------------------------------
// Ledger / entity type (storage bookkeeping commit + conservation)
// ---------------------------------------------------------------------------

/// The category of a resource movement recorded by the settlement ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum LedgerEntryType {
    /// Tick production credited to settlement storage (world -> settlement).
    Production,
    /// Construction enqueue debit (settlement -> construction).
    ConstructionDebit,
    /// Construction cancellation 50% refund (construction -> settlement).
    ConstructionRefund,
    /// Production overflow past storage capacity (settlement -> void).
    Waste,
    /// Disaster-caused resource loss (settlement -> void).
    DisasterLoss,
}

/// The type of entity participating in a ledger transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum EntityType {
    /// A settlement's storage.
    Settlement,
    /// The in-flight construction queue.
    Construction,
    /// The world (source of production).
    World,
    /// The void (destination for waste and disaster losses).
    Void,
}
