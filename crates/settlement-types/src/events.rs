//! Event-channel payload types fanned out over the broadcast registry's rooms.
//!
//! Every outbound event is a tagged enum variant carrying a `timestamp`
//! plus a typed payload, so a single `Event` value can be serialized once
//! and delivered verbatim to every subscriber of its room.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ConstructionStatus, DisasterType, Resource, SeverityLevel, StructureKind};
use crate::ids::{ConstructionId, DisasterId, SettlementId, StructureId, TileId, WorldId};
use crate::structs::ResourceAmounts;

/// A room identifier the event bus fans out to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum RoomKey {
    /// Authoritative world-scope events, named `world:{id}`.
    World(WorldId),
    /// Targeted settlement events, named `settlement:{id}`.
    Settlement(SettlementId),
}

impl RoomKey {
    /// The canonical string name used on the wire and in log fields.
    pub fn name(&self) -> String {
        match self {
            RoomKey::World(id) => format!("world:{id}"),
            RoomKey::Settlement(id) => format!("settlement:{id}"),
        }
    }
}

/// A single progress record inside a coalesced `construction-progress-batch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ConstructionProgress {
    /// The settlement this entry belongs to.
    pub settlement_id: SettlementId,
    /// The construction entry being reported.
    pub project_id: ConstructionId,
    /// Completion percentage, `0..=100`.
    pub progress: u8,
    /// Seconds remaining until `completes_at`.
    pub time_remaining_seconds: u32,
}

/// Aggregated counts emitted at `disaster-impact-end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DisasterImpactSummary {
    /// Total population lost across affected settlements.
    pub casualties: u32,
    /// Structures that took damage but survived.
    pub structures_damaged: u32,
    /// Structures destroyed outright.
    pub structures_destroyed: u32,
    /// Resources lost across affected settlements.
    pub resources_lost: ResourceAmounts,
}

/// Every typed outbound event deliverable over the event channel.
/// Server-authoritative; clients never construct these, only inbound
/// commands (modeled separately by `settlement-api`'s request DTOs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type")]
#[ts(export, export_to = "bindings/")]
pub enum OutboundEvent {
    /// Sent immediately after a successful socket upgrade.
    Connected {
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Sent after `authenticate` resolves a valid session.
    Authenticated {
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Sent after `join-world` adds the client to `world:{worldId}`.
    WorldJoined {
        /// The joined world.
        world_id: WorldId,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Full reconnect snapshot: resources, population, construction, and
    /// active disasters, never a partial log.
    GameState {
        /// The settlement this snapshot describes.
        settlement_id: SettlementId,
        /// Current resource amounts.
        resources: ResourceAmounts,
        /// Current population count.
        population_current: u32,
        /// Current population capacity.
        population_capacity: u32,
        /// Non-terminal construction entries.
        constructions: Vec<ConstructionId>,
        /// Disasters currently active against this settlement's world.
        active_disasters: Vec<DisasterId>,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Generic incremental state update (economy, used sparingly; most
    /// deltas use the more specific variants below).
    StateUpdate {
        /// The settlement this update describes.
        settlement_id: SettlementId,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Emitted once per economic tick for a settlement.
    ResourceTick {
        /// The settlement this tick describes.
        settlement_id: SettlementId,
        /// The tick number.
        tick: u64,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Emitted when storage amounts change.
    ResourceUpdate {
        /// The settlement this update describes.
        settlement_id: SettlementId,
        /// Current resource amounts after the update.
        resources: ResourceAmounts,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Full resource snapshot, used on `request-resources-data` and on
    /// reconnect.
    ResourcesData {
        /// The settlement this snapshot describes.
        settlement_id: SettlementId,
        /// Current resource amounts.
        resources: ResourceAmounts,
        /// Current storage capacity per resource.
        capacity: ResourceAmounts,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Per-resource production credited this tick.
    ResourceProduction {
        /// The settlement this production describes.
        settlement_id: SettlementId,
        /// Amounts produced this tick.
        produced: ResourceAmounts,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Per-resource consumption debited this tick (population upkeep).
    ResourceConsumption {
        /// The settlement this consumption describes.
        settlement_id: SettlementId,
        /// Amounts consumed this tick.
        consumed: ResourceAmounts,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Emitted immediately after a build/upgrade/demolish changes storage
    /// capacity.
    ResourceCapacityChange {
        /// The settlement this change describes.
        settlement_id: SettlementId,
        /// New capacity per resource.
        capacity: ResourceAmounts,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Emitted when production overflow is dropped past storage capacity.
    ResourceWaste {
        /// The settlement this waste describes.
        settlement_id: SettlementId,
        /// Amounts wasted per resource.
        wasted: ResourceAmounts,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Warning that storage is near capacity for one or more resources.
    StorageWarning {
        /// The settlement this warning describes.
        settlement_id: SettlementId,
        /// Resources nearing capacity.
        resources: Vec<Resource>,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Warning that a resource is near depletion.
    ResourceShortage {
        /// The settlement this warning describes.
        settlement_id: SettlementId,
        /// Resources in shortage.
        resources: Vec<Resource>,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Population summary, emitted immediately after any capacity-changing
    /// commit, and once per population tick.
    PopulationState {
        /// The settlement this state describes.
        settlement_id: SettlementId,
        /// Current population.
        current: u32,
        /// Current capacity.
        capacity: u32,
        /// Current happiness, `[0, 100]`.
        happiness: u8,
        /// People-per-hour growth rate (signed; negative is emigration).
        #[ts(as = "String")]
        growth_rate: rust_decimal::Decimal,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Emitted when population grows this tick.
    PopulationGrowth {
        /// The settlement this growth describes.
        settlement_id: SettlementId,
        /// Number of settlers added.
        added: u32,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Emitted when happiness drops into a warning band or starvation
    /// casualties occur.
    PopulationWarning {
        /// The settlement this warning describes.
        settlement_id: SettlementId,
        /// Human-readable reason (e.g. `"food shortage"`).
        reason: String,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Emitted when a new settler arrives (growth of exactly one).
    SettlerArrived {
        /// The settlement the settler arrived at.
        settlement_id: SettlementId,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Emitted on successful `Enqueue`.
    ConstructionQueued {
        /// The settlement this entry belongs to.
        settlement_id: SettlementId,
        /// The new entry's identifier.
        project_id: ConstructionId,
        /// Assigned queue position.
        position: u8,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Emitted when an entry transitions QUEUED -> IN_PROGRESS.
    ConstructionStarted {
        /// The settlement this entry belongs to.
        settlement_id: SettlementId,
        /// The entry that started.
        project_id: ConstructionId,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Coalesced per-second batch of in-progress construction percentages.
    ConstructionProgressBatch {
        /// The world this batch covers.
        world_id: WorldId,
        /// One entry per in-progress construction.
        constructions: Vec<ConstructionProgress>,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Emitted on `Complete`.
    ConstructionComplete {
        /// The settlement this entry belongs to.
        settlement_id: SettlementId,
        /// The completed entry.
        project_id: ConstructionId,
        /// The structure instance created.
        structure_id: StructureId,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Emitted on `Cancel`.
    ConstructionCancelled {
        /// The settlement this entry belongs to.
        settlement_id: SettlementId,
        /// The cancelled entry.
        project_id: ConstructionId,
        /// Amount refunded (50% of the cost snapshot).
        refunded: ResourceAmounts,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Full construction-queue snapshot, used on `request-construction-state`
    /// and on reconnect.
    ConstructionState {
        /// The settlement this snapshot describes.
        settlement_id: SettlementId,
        /// Non-terminal entries, in position order.
        entries: Vec<ConstructionId>,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Emitted by `Build` to `world:{worldId}`.
    StructureBuilt {
        /// The settlement the structure was built in.
        settlement_id: SettlementId,
        /// The new structure instance.
        structure_id: StructureId,
        /// The structure kind.
        kind: StructureKind,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Emitted by `Upgrade`.
    StructureUpgraded {
        /// The settlement the structure belongs to.
        settlement_id: SettlementId,
        /// The upgraded structure.
        structure_id: StructureId,
        /// The new level.
        new_level: u8,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Emitted by `Demolish`.
    StructureDemolished {
        /// The settlement the structure belonged to.
        settlement_id: SettlementId,
        /// The demolished structure.
        structure_id: StructureId,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Emitted when a BUILDING's demolish/build changes area usage.
    AreaUpdated {
        /// The settlement whose area usage changed.
        settlement_id: SettlementId,
        /// Area currently in use.
        area_used: u32,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Entry into WARNING.
    DisasterWarning {
        /// The disaster entering WARNING.
        disaster_id: DisasterId,
        /// The disaster type.
        disaster_type: DisasterType,
        /// Seconds remaining until scheduled impact.
        time_remaining_seconds: u32,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Emitted once, 30 minutes before scheduled impact.
    DisasterImminent {
        /// The imminent disaster.
        disaster_id: DisasterId,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Entry into IMPACT.
    DisasterImpactStart {
        /// The disaster entering IMPACT.
        disaster_id: DisasterId,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Periodic progress update during IMPACT.
    DisasterDamageUpdate {
        /// The disaster in progress.
        disaster_id: DisasterId,
        /// Completion percentage of the impact window, `0..=100`.
        progress: u8,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Entry into AFTERMATH; carries aggregated impact counts.
    DisasterImpactEnd {
        /// The disaster leaving IMPACT.
        disaster_id: DisasterId,
        /// Aggregated counts across all affected settlements.
        summary: DisasterImpactSummary,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Emitted per structure taking damage during IMPACT.
    StructureDamaged {
        /// The settlement the structure belongs to.
        settlement_id: SettlementId,
        /// The damaged structure.
        structure_id: StructureId,
        /// Health after this damage tick.
        health_after: u8,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Emitted when a structure's health reaches zero during IMPACT.
    StructureDestroyed {
        /// The settlement the structure belonged to.
        settlement_id: SettlementId,
        /// The destroyed structure.
        structure_id: StructureId,
        /// The tile this structure's slot is now free on, if EXTRACTOR.
        tile_id: Option<TileId>,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Emitted per settlement when casualties are dealt during IMPACT.
    CasualtiesReport {
        /// The settlement affected.
        settlement_id: SettlementId,
        /// Population lost.
        casualties: u32,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Entry into AFTERMATH.
    DisasterAftermath {
        /// The disaster entering AFTERMATH.
        disaster_id: DisasterId,
        /// Whether the 48h emergency-repair discount window is active.
        emergency_repair_discount: bool,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Terminal transition into RESOLVED.
    DisasterResolved {
        /// The resolved disaster.
        disaster_id: DisasterId,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl OutboundEvent {
    /// The room this event should be delivered to.
    pub fn room(&self, world_id: WorldId, settlement_id: Option<SettlementId>) -> RoomKey {
        settlement_id.map_or(RoomKey::World(world_id), RoomKey::Settlement)
    }

    /// Whether this event is a high-frequency progress event eligible to
    /// be dropped under subscriber backpressure. Lifecycle events
    /// are never dropped.
    pub const fn is_droppable_progress(&self) -> bool {
        matches!(self, OutboundEvent::ConstructionProgressBatch { .. })
    }
}

/// The `{code, message}` / `{error, code, message, ...details}` envelope
/// delivered for failed commands on either REST or the event channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ErrorEnvelope {
    /// Whether this is an error envelope (always `true`; present for wire
    /// compatibility with clients that switch on the `error` field).
    pub error: bool,
    /// A typed error kind code from the taxonomy, e.g.
    /// `"INSUFFICIENT_RESOURCES"`.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Additional structured context (e.g. a shortages map).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
