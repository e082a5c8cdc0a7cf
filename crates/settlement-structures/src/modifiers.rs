//! Recomputing a settlement's cached `SettlementModifier` aggregates from
//! its current structures.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use settlement_types::{ModifierContribution, ModifierId, SettlementId, SettlementStructure};

use crate::error::StructureError;
use crate::rules::{evaluate, rule_for};
use settlement_types::SettlementModifier;

/// Every modifier type name this structure kind contributes to, used to
/// decide which aggregates need recomputing after a structure mutation.
pub fn affected_modifier_types(structure: &SettlementStructure) -> Vec<&'static str> {
    rule_for(structure.kind)
        .map(|(name, _)| vec![name])
        .unwrap_or_default()
}

/// Recompute one named modifier's aggregate by summing contributions from
/// every structure whose kind's rule targets it.
///
/// # Errors
///
/// Returns [`StructureError::ArithmeticOverflow`] if a formula or the sum
/// overflows.
pub fn recompute(
    settlement_id: SettlementId,
    modifier_type: &str,
    structures: &[SettlementStructure],
    now: DateTime<Utc>,
) -> Result<SettlementModifier, StructureError> {
    let mut total = Decimal::ZERO;
    let mut contributing_structures = Vec::new();

    for structure in structures {
        let Some((name, formula)) = rule_for(structure.kind) else {
            continue;
        };
        if name != modifier_type {
            continue;
        }

        let value = evaluate(formula, structure.level)?;
        if value == Decimal::ZERO {
            continue;
        }

        total = total
            .checked_add(value)
            .ok_or(StructureError::ArithmeticOverflow)?;
        contributing_structures.push(ModifierContribution {
            structure_id: structure.id,
            level: structure.level,
            value,
        });
    }

    let source_count = u32::try_from(contributing_structures.len()).unwrap_or(u32::MAX);

    Ok(SettlementModifier {
        id: ModifierId::new(),
        settlement_id,
        modifier_type: modifier_type.to_string(),
        total_value: total,
        source_count,
        contributing_structures,
        last_calculated_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use settlement_types::{StructureId, StructureKind};

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
            updated_at: Utc::now(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn recompute_sums_every_contributing_structure() {
        let settlement_id = SettlementId::new();
        let structures = vec![
            structure(StructureKind::TownHall, 1),
            structure(StructureKind::House, 2),
            structure(StructureKind::Farm, 3),
        ];

        let modifier = recompute(settlement_id, "population_capacity", &structures, Utc::now())
            .unwrap();

        assert_eq!(modifier.source_count, 2);
        assert_eq!(modifier.contributing_structures.len(), 2);
        assert_eq!(modifier.total_value, Decimal::from(20 + 10));
    }

    #[test]
    fn recompute_ignores_unrelated_modifier_types() {
        let settlement_id = SettlementId::new();
        let structures = vec![structure(StructureKind::Warehouse, 1)];

        let modifier =
            recompute(settlement_id, "population_capacity", &structures, Utc::now()).unwrap();

        assert_eq!(modifier.source_count, 0);
        assert_eq!(modifier.total_value, Decimal::ZERO);
    }

    #[test]
    fn affected_modifier_types_is_empty_for_extractors() {
        let farm = structure(StructureKind::Farm, 1);
        assert!(affected_modifier_types(&farm).is_empty());
    }
}
