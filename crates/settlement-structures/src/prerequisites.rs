//! Prerequisite validation: a pure function reading a settlement's
//! existing structures for minimum-level satisfaction.

use settlement_types::{SettlementStructure, StructureKind, StructurePrerequisite};

/// Validate a structure definition's prerequisites against a
/// settlement's existing structures.
///
/// Returns `Ok(())` if every prerequisite is satisfied, or `Err` with the
/// list of required structure kinds that are missing or under-leveled.
pub fn validate(
    prerequisites: &[StructurePrerequisite],
    existing: &[SettlementStructure],
) -> Result<(), Vec<StructureKind>> {
    let missing: Vec<StructureKind> = prerequisites
        .iter()
        .filter_map(|prereq| {
            let required_kind = prereq.required_structure?;
            let satisfied = existing
                .iter()
                .any(|s| s.kind == required_kind && s.level >= prereq.required_level);
            (!satisfied).then_some(required_kind)
        })
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use settlement_types::{SettlementId, StructureDefId, StructureId};

    fn structure(kind: StructureKind, level: u8) -> SettlementStructure {
        SettlementStructure {
            id: StructureId::new(),
            settlement_id: SettlementId::new(),
            kind,
            level,
            health: 100,
            population_assigned: 0,
            tile_id: None,
            slot_position: None,
            damaged_at: None,
            repaired_at: None,
            updated_at: chrono::Utc::now(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn no_prerequisites_always_satisfied() {
        assert!(validate(&[], &[]).is_ok());
    }

    #[test]
    fn missing_prerequisite_structure_is_reported() {
        let def_id = StructureDefId::new();
        let prereqs = vec![StructurePrerequisite {
            structure_def_id: def_id,
            required_structure: Some(StructureKind::TownHall),
            required_level: 2,
        }];
        let result = validate(&prereqs, &[]);
        assert_eq!(result, Err(vec![StructureKind::TownHall]));
    }

    #[test]
    fn under_leveled_prerequisite_is_reported() {
        let def_id = StructureDefId::new();
        let prereqs = vec![StructurePrerequisite {
            structure_def_id: def_id,
            required_structure: Some(StructureKind::TownHall),
            required_level: 3,
        }];
        let existing = vec![structure(StructureKind::TownHall, 2)];
        assert_eq!(validate(&prereqs, &existing), Err(vec![StructureKind::TownHall]));
    }

    #[test]
    fn satisfied_prerequisite_passes() {
        let def_id = StructureDefId::new();
        let prereqs = vec![StructurePrerequisite {
            structure_def_id: def_id,
            required_structure: Some(StructureKind::TownHall),
            required_level: 2,
        }];
        let existing = vec![structure(StructureKind::TownHall, 2)];
        assert!(validate(&prereqs, &existing).is_ok());
    }
}
