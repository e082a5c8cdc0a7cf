//! Build/Upgrade/Demolish: the structure lifecycle operations.
//!
//! These are pure validation-and-construction functions; the caller owns
//! the transaction (load current state, call here, persist the result,
//! recompute and persist affected modifiers via [`crate::modifiers`]).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use settlement_types::{
    SettlementId, SettlementStructure, StructureCategory, StructureDef, StructureId, StructureKind,
    StructurePrerequisite, TileId,
};

use crate::error::StructureError;
use crate::prerequisites;

/// Everything [`build`] needs to validate and instantiate a new
/// structure.
pub struct BuildRequest<'a> {
    /// The definition being built.
    pub def: &'a StructureDef,
    /// The definition's prerequisites.
    pub prerequisites: &'a [StructurePrerequisite],
    /// The settlement's current structures.
    pub existing_structures: &'a [SettlementStructure],
    /// Every seeded structure definition, keyed by kind, used for area
    /// accounting across the settlement's existing BUILDING structures.
    pub structure_defs: &'a BTreeMap<StructureKind, StructureDef>,
    /// Total settlement area available for BUILDING structures.
    pub area_budget: u32,
    /// The settlement's current TownHall level (0 if none built yet).
    pub town_hall_level: u8,
    /// Target tile, for EXTRACTOR structures.
    pub tile_id: Option<TileId>,
    /// Target slot on the tile, for EXTRACTOR structures.
    pub slot_position: Option<u8>,
    /// The settlement this structure is being built in.
    pub settlement_id: SettlementId,
    /// Current time, stamped on the new row.
    pub now: DateTime<Utc>,
}

/// Validate and construct a new level-1 structure instance.
///
/// Checks, in order: prerequisites, uniqueness and area budget (BUILDING
/// only), slot occupancy (EXTRACTOR only), and the TownHall tier gate.
/// Resource debiting is the construction queue's responsibility: by the
/// time a queue entry completes and calls this, the cost has already
/// been debited.
///
/// # Errors
///
/// Returns a [`StructureError`] variant naming the first failed check.
pub fn build(request: &BuildRequest) -> Result<SettlementStructure, StructureError> {
    prerequisites::validate(request.prerequisites, request.existing_structures)
        .map_err(StructureError::PrerequisitesNotMet)?;

    match request.def.category {
        StructureCategory::Building => {
            if request.def.unique_per_settlement
                && request
                    .existing_structures
                    .iter()
                    .any(|s| s.kind == request.def.kind)
            {
                return Err(StructureError::DuplicateUnique(request.def.kind));
            }

            let used = area_used(request.existing_structures, request.structure_defs);
            let available = request.area_budget.saturating_sub(used);
            if request.def.area_cost > available {
                return Err(StructureError::InsufficientArea {
                    needed: request.def.area_cost,
                    available,
                });
            }
        }
        StructureCategory::Extractor => {
            if let (Some(tile_id), Some(slot)) = (request.tile_id, request.slot_position) {
                let occupied = request.existing_structures.iter().any(|s| {
                    s.tile_id == Some(tile_id) && s.slot_position == Some(slot)
                });
                if occupied {
                    return Err(StructureError::SlotOccupied { slot });
                }
            }
        }
    }

    if request.town_hall_level < request.def.min_town_hall_level {
        return Err(StructureError::TierTooLow {
            required: request.def.min_town_hall_level,
            actual: request.town_hall_level,
        });
    }

    Ok(SettlementStructure {
        id: StructureId::new(),
        settlement_id: request.settlement_id,
        kind: request.def.kind,
        level: 1,
        health: 100,
        population_assigned: 0,
        tile_id: request.tile_id,
        slot_position: request.slot_position,
        damaged_at: None,
        repaired_at: None,
        updated_at: request.now,
        created_at: request.now,
    })
}

/// Sum the area cost of every BUILDING-category structure a settlement
/// already owns.
fn area_used(
    existing: &[SettlementStructure],
    defs: &BTreeMap<StructureKind, StructureDef>,
) -> u32 {
    existing
        .iter()
        .filter_map(|structure| defs.get(&structure.kind))
        .filter(|def| def.category == StructureCategory::Building)
        .map(|def| def.area_cost)
        .fold(0_u32, |total, cost| total.saturating_add(cost))
}

/// Upgrade a structure in place to `level + 1`.
///
/// # Errors
///
/// Returns [`StructureError::MaxLevelReached`] if the structure is
/// already at `def.max_level`.
pub fn upgrade(
    structure: &mut SettlementStructure,
    def: &StructureDef,
    now: DateTime<Utc>,
) -> Result<(), StructureError> {
    if structure.level >= def.max_level {
        return Err(StructureError::MaxLevelReached {
            kind: structure.kind,
            max_level: def.max_level,
        });
    }

    structure.level = structure.level.saturating_add(1);
    structure.updated_at = now;
    Ok(())
}

/// The settlement area a demolished structure frees, for the caller to
/// apply to its area accounting (0 for EXTRACTOR structures, which don't
/// consume area).
pub const fn area_freed(def: &StructureDef) -> u32 {
    match def.category {
        StructureCategory::Building => def.area_cost,
        StructureCategory::Extractor => 0,
    }
}

/// Outcome of demolishing a structure: the area it frees and the
/// settlement-wide modifier types that need recomputing.
pub struct DemolishResult {
    /// Area returned to the settlement's budget (0 for EXTRACTOR).
    pub area_freed: u32,
    /// Modifier types [`crate::modifiers::recompute`] must re-derive now
    /// that this structure's contribution is gone.
    pub affected_modifier_types: Vec<&'static str>,
}

/// Remove a structure. The caller deletes the row; this computes what
/// bookkeeping that deletion triggers.
pub fn demolish(structure: &SettlementStructure, def: &StructureDef) -> DemolishResult {
    DemolishResult {
        area_freed: area_freed(def),
        affected_modifier_types: crate::modifiers::affected_modifier_types(structure),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use settlement_types::StructureDefId;

    fn town_hall_def() -> StructureDef {
        StructureDef {
            id: StructureDefId::new(),
            kind: StructureKind::TownHall,
            category: StructureCategory::Building,
            tier: 1,
            max_level: 5,
            construction_time_seconds: 60,
            population_required: 0,
            area_cost: 10,
            unique_per_settlement: true,
            min_town_hall_level: 0,
        }
    }

    fn house_def() -> StructureDef {
        StructureDef {
            id: StructureDefId::new(),
            kind: StructureKind::House,
            category: StructureCategory::Building,
            tier: 1,
            max_level: 5,
            construction_time_seconds: 60,
            population_required: 0,
            area_cost: 5,
            unique_per_settlement: false,
            min_town_hall_level: 1,
        }
    }

    fn existing_town_hall(level: u8) -> SettlementStructure {
        SettlementStructure {
            id: settlement_types::StructureId::new(),
            settlement_id: SettlementId::new(),
            kind: StructureKind::TownHall,
            level,
            health: 100,
            population_assigned: 0,
            tile_id: None,
            slot_position: None,
            damaged_at: None,
            repaired_at: None,
            updated_at: Utc::now(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn build_rejects_duplicate_unique_structure() {
        let def = town_hall_def();
        let existing = vec![existing_town_hall(1)];
        let defs = BTreeMap::from([(StructureKind::TownHall, def.clone())]);

        let request = BuildRequest {
            def: &def,
            prerequisites: &[],
            existing_structures: &existing,
            structure_defs: &defs,
            area_budget: 100,
            town_hall_level: 1,
            tile_id: None,
            slot_position: None,
            settlement_id: SettlementId::new(),
            now: Utc::now(),
        };

        assert!(matches!(build(&request), Err(StructureError::DuplicateUnique(_))));
    }

    #[test]
    fn build_rejects_insufficient_area() {
        let def = house_def();
        let town_hall = town_hall_def();
        let existing = vec![existing_town_hall(1)];
        let defs = BTreeMap::from([
            (StructureKind::TownHall, town_hall),
            (StructureKind::House, def.clone()),
        ]);

        let request = BuildRequest {
            def: &def,
            prerequisites: &[],
            existing_structures: &existing,
            structure_defs: &defs,
            area_budget: 12,
            town_hall_level: 1,
            tile_id: None,
            slot_position: None,
            settlement_id: SettlementId::new(),
            now: Utc::now(),
        };

        assert!(matches!(build(&request), Err(StructureError::InsufficientArea { .. })));
    }

    #[test]
    fn build_rejects_tier_too_low() {
        let def = house_def();
        let defs = BTreeMap::from([(StructureKind::House, def.clone())]);

        let request = BuildRequest {
            def: &def,
            prerequisites: &[],
            existing_structures: &[],
            structure_defs: &defs,
            area_budget: 100,
            town_hall_level: 0,
            tile_id: None,
            slot_position: None,
            settlement_id: SettlementId::new(),
            now: Utc::now(),
        };

        assert!(matches!(build(&request), Err(StructureError::TierTooLow { .. })));
    }

    #[test]
    fn build_succeeds_when_all_checks_pass() {
        let def = house_def();
        let town_hall = town_hall_def();
        let existing = vec![existing_town_hall(1)];
        let defs = BTreeMap::from([
            (StructureKind::TownHall, town_hall),
            (StructureKind::House, def.clone()),
        ]);

        let request = BuildRequest {
            def: &def,
            prerequisites: &[],
            existing_structures: &existing,
            structure_defs: &defs,
            area_budget: 100,
            town_hall_level: 1,
            tile_id: None,
            slot_position: None,
            settlement_id: SettlementId::new(),
            now: Utc::now(),
        };

        let built = build(&request).unwrap();
        assert_eq!(built.kind, StructureKind::House);
        assert_eq!(built.level, 1);
    }

    #[test]
    fn upgrade_increments_level() {
        let def = house_def();
        let mut structure = existing_town_hall(1);
        structure.kind = StructureKind::House;
        upgrade(&mut structure, &def, Utc::now()).unwrap();
        assert_eq!(structure.level, 2);
    }

    #[test]
    fn upgrade_rejects_at_max_level() {
        let def = house_def();
        let mut structure = existing_town_hall(5);
        structure.kind = StructureKind::House;
        assert!(matches!(
            upgrade(&mut structure, &def, Utc::now()),
            Err(StructureError::MaxLevelReached { .. })
        ));
    }

    #[test]
    fn demolish_reports_area_and_affected_modifiers() {
        let def = house_def();
        let mut structure = existing_town_hall(1);
        structure.kind = StructureKind::House;
        let result = demolish(&structure, &def);
        assert_eq!(result.area_freed, def.area_cost);
        assert_eq!(result.affected_modifier_types, vec!["population_capacity"]);
    }

    #[test]
    fn demolish_extractor_frees_no_area() {
        let def = StructureDef {
            id: settlement_types::StructureDefId::new(),
            kind: StructureKind::Farm,
            category: StructureCategory::Extractor,
            tier: 1,
            max_level: 5,
            construction_time_seconds: 60,
            population_required: 1,
            area_cost: 0,
            unique_per_settlement: false,
            min_town_hall_level: 0,
        };
        let mut structure = existing_town_hall(1);
        structure.kind = StructureKind::Farm;
        let result = demolish(&structure, &def);
        assert_eq!(result.area_freed, 0);
        assert!(result.affected_modifier_types.is_empty());
    }
}
