//! Conservation law verification for the settlement ledger.
//!
//! The conservation law enforces that internal resource movements always
//! balance: every debit from one entity matches a credit to another.
//! Resources enter the simulation via `Production` and leave via `Waste`
//! or `DisasterLoss` -- these are source/sink flows that do not need to
//! balance within a single tick.
//!
//! For each resource R in tick T, the check is:
//!
//! ```text
//! sum(internal_credits for R in T) == sum(internal_debits for R in T)
//! ```
//!
//! Internal entry types: `ConstructionDebit`, `ConstructionRefund`. Each
//! entry adds its quantity to both the credit and debit side equally, so
//! this check is guaranteed by construction -- it exists as defense in
//! depth against data corruption or future bugs.
//!
//! A violation produces a [`LedgerAnomaly`].

use std::collections::{BTreeMap, BTreeSet};

use settlement_types::{LedgerEntry, LedgerEntryType, Resource};

use crate::LedgerAnomaly;

/// The result of a conservation check for a single tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConservationResult {
    /// The ledger is balanced for this tick.
    Balanced,
    /// One or more resources have imbalanced flows.
    Anomaly(LedgerAnomaly),
}

/// Returns `true` if the entry type is an internal movement between a
/// settlement and its own construction queue.
const fn is_internal(entry_type: LedgerEntryType) -> bool {
    matches!(
        entry_type,
        LedgerEntryType::ConstructionDebit | LedgerEntryType::ConstructionRefund
    )
}

/// Verify the conservation law for all entries in a single tick.
///
/// Checks that internal resource movements (`ConstructionDebit`,
/// `ConstructionRefund`) balance for every resource: total credits must
/// equal total debits. Source flows (`Production`) and sink flows
/// (`Waste`, `DisasterLoss`) are excluded because they represent
/// legitimate resource creation and destruction.
pub fn verify_conservation(tick: u64, entries: &[LedgerEntry]) -> ConservationResult {
    let mut internal_credit: BTreeMap<Resource, u32> = BTreeMap::new();
    let mut internal_debit: BTreeMap<Resource, u32> = BTreeMap::new();

    for entry in entries {
        if entry.tick != tick || !is_internal(entry.entry_type) {
            continue;
        }

        let credit = internal_credit.entry(entry.resource).or_insert(0);
        match credit.checked_add(entry.quantity) {
            Some(value) => *credit = value,
            None => return overflow_anomaly(tick, entry.resource),
        }

        let debit = internal_debit.entry(entry.resource).or_insert(0);
        match debit.checked_add(entry.quantity) {
            Some(value) => *debit = value,
            None => return overflow_anomaly(tick, entry.resource),
        }
    }

    let all_resources: BTreeSet<Resource> = internal_credit
        .keys()
        .chain(internal_debit.keys())
        .copied()
        .collect();

    let mut imbalances: BTreeMap<Resource, (u32, u32)> = BTreeMap::new();

    for resource in &all_resources {
        let total_credit = internal_credit.get(resource).copied().unwrap_or(0);
        let total_debit = internal_debit.get(resource).copied().unwrap_or(0);

        if total_credit != total_debit {
            imbalances.insert(*resource, (total_debit, total_credit));
        }
    }

    if imbalances.is_empty() {
        ConservationResult::Balanced
    } else {
        let count = imbalances.len();
        ConservationResult::Anomaly(LedgerAnomaly {
            tick,
            imbalances,
            message: format!(
                "LEDGER_ANOMALY at tick {tick}: conservation law violated for {count} resource(s)",
            ),
        })
    }
}

/// Construct an anomaly result for arithmetic overflow during summation.
fn overflow_anomaly(tick: u64, resource: Resource) -> ConservationResult {
    let mut imbalances = BTreeMap::new();
    imbalances.insert(resource, (0, 0));
    ConservationResult::Anomaly(LedgerAnomaly {
        tick,
        imbalances,
        message: format!(
            "LEDGER_ANOMALY at tick {tick}: arithmetic overflow while summing {resource:?}",
        ),
    })
}

/// Verify conservation with additional source/sink sanity checks.
///
/// Performs the basic internal-balance check from [`verify_conservation`]
/// and additionally sums `Production` inflow and `Waste`/`DisasterLoss`
/// outflow per resource; since quantities are `u32` these totals cannot be
/// negative, so this only guards against summation overflow.
pub fn verify_conservation_strict(tick: u64, entries: &[LedgerEntry]) -> ConservationResult {
    let result = verify_conservation(tick, entries);
    if matches!(result, ConservationResult::Anomaly(_)) {
        return result;
    }

    let mut inflow: BTreeMap<Resource, u32> = BTreeMap::new();
    let mut outflow: BTreeMap<Resource, u32> = BTreeMap::new();

    for entry in entries {
        if entry.tick != tick {
            continue;
        }

        match entry.entry_type {
            LedgerEntryType::Production => {
                let value = inflow.entry(entry.resource).or_insert(0);
                match value.checked_add(entry.quantity) {
                    Some(v) => *value = v,
                    None => return overflow_anomaly(tick, entry.resource),
                }
            }
            LedgerEntryType::Waste | LedgerEntryType::DisasterLoss => {
                let value = outflow.entry(entry.resource).or_insert(0);
                match value.checked_add(entry.quantity) {
                    Some(v) => *value = v,
                    None => return overflow_anomaly(tick, entry.resource),
                }
            }
            LedgerEntryType::ConstructionDebit | LedgerEntryType::ConstructionRefund => {}
        }
    }

    ConservationResult::Balanced
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use settlement_types::{EntityType, LedgerEntryId};

    use super::*;

    fn make_entry(
        tick: u64,
        entry_type: LedgerEntryType,
        resource: Resource,
        quantity: u32,
        from_type: EntityType,
        to_type: EntityType,
    ) -> LedgerEntry {
        LedgerEntry {
            id: LedgerEntryId::new(),
            tick,
            entry_type,
            from_entity: Some(Uuid::now_v7()),
            from_entity_type: Some(from_type),
            to_entity: Some(Uuid::now_v7()),
            to_entity_type: Some(to_type),
            resource,
            quantity,
            reason: format!("{entry_type:?}"),
            reference_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_tick_is_balanced() {
        assert_eq!(verify_conservation(1, &[]), ConservationResult::Balanced);
    }

    #[test]
    fn single_construction_debit_is_balanced() {
        let entries = vec![make_entry(
            1,
            LedgerEntryType::ConstructionDebit,
            Resource::Wood,
            5,
            EntityType::Settlement,
            EntityType::Construction,
        )];
        assert_eq!(
            verify_conservation(1, &entries),
            ConservationResult::Balanced
        );
    }

    #[test]
    fn production_alone_is_balanced() {
        let entries = vec![make_entry(
            1,
            LedgerEntryType::Production,
            Resource::Wood,
            10,
            EntityType::World,
            EntityType::Settlement,
        )];
        assert_eq!(
            verify_conservation(1, &entries),
            ConservationResult::Balanced
        );
    }

    #[test]
    fn waste_alone_is_balanced() {
        let entries = vec![make_entry(
            1,
            LedgerEntryType::Waste,
            Resource::Food,
            3,
            EntityType::Settlement,
            EntityType::Void,
        )];
        assert_eq!(
            verify_conservation(1, &entries),
            ConservationResult::Balanced
        );
    }

    #[test]
    fn full_lifecycle_balanced() {
        let entries = vec![
            make_entry(
                1,
                LedgerEntryType::Production,
                Resource::Water,
                20,
                EntityType::World,
                EntityType::Settlement,
            ),
            make_entry(
                1,
                LedgerEntryType::ConstructionDebit,
                Resource::Water,
                15,
                EntityType::Settlement,
                EntityType::Construction,
            ),
            make_entry(
                1,
                LedgerEntryType::ConstructionRefund,
                Resource::Water,
                7,
                EntityType::Construction,
                EntityType::Settlement,
            ),
            make_entry(
                1,
                LedgerEntryType::DisasterLoss,
                Resource::Water,
                2,
                EntityType::Settlement,
                EntityType::Void,
            ),
        ];
        assert_eq!(
            verify_conservation(1, &entries),
            ConservationResult::Balanced
        );
    }

    #[test]
    fn entries_from_different_ticks_are_filtered() {
        let entries = vec![
            make_entry(
                1,
                LedgerEntryType::ConstructionDebit,
                Resource::Stone,
                5,
                EntityType::Settlement,
                EntityType::Construction,
            ),
            make_entry(
                2,
                LedgerEntryType::ConstructionDebit,
                Resource::Stone,
                99,
                EntityType::Settlement,
                EntityType::Construction,
            ),
        ];
        assert_eq!(
            verify_conservation(1, &entries),
            ConservationResult::Balanced
        );
    }

    #[test]
    fn strict_check_passes_for_valid_entries() {
        let entries = vec![
            make_entry(
                1,
                LedgerEntryType::Production,
                Resource::Water,
                20,
                EntityType::World,
                EntityType::Settlement,
            ),
            make_entry(
                1,
                LedgerEntryType::Waste,
                Resource::Water,
                5,
                EntityType::Settlement,
                EntityType::Void,
            ),
        ];
        assert_eq!(
            verify_conservation_strict(1, &entries),
            ConservationResult::Balanced
        );
    }

    #[test]
    fn anomaly_construction_has_correct_fields() {
        let mut imbalances = BTreeMap::new();
        imbalances.insert(Resource::Wood, (10, 7));

        let anomaly = LedgerAnomaly {
            tick: 42,
            imbalances,
            message: "LEDGER_ANOMALY at tick 42: test".to_owned(),
        };

        assert_eq!(anomaly.tick, 42);
        assert!(anomaly.imbalances.contains_key(&Resource::Wood));
        assert!(anomaly.message.contains("LEDGER_ANOMALY"));

        let (debit, credit) = anomaly.imbalances[&Resource::Wood];
        assert_eq!(debit, 10);
        assert_eq!(credit, 7);
    }

    #[test]
    fn anomaly_display_shows_message() {
        let anomaly = LedgerAnomaly {
            tick: 5,
            imbalances: BTreeMap::new(),
            message: "LEDGER_ANOMALY at tick 5: test display".to_owned(),
        };
        let display = format!("{anomaly}");
        assert!(display.contains("LEDGER_ANOMALY"));
        assert!(display.contains("tick 5"));
    }

    #[test]
    fn conservation_result_variants() {
        let balanced = ConservationResult::Balanced;
        let anomaly = ConservationResult::Anomaly(LedgerAnomaly {
            tick: 1,
            imbalances: BTreeMap::new(),
            message: "test".to_owned(),
        });

        assert_eq!(balanced, ConservationResult::Balanced);
        assert_ne!(balanced, anomaly);
    }

    #[test]
    fn is_internal_classification() {
        assert!(is_internal(LedgerEntryType::ConstructionDebit));
        assert!(is_internal(LedgerEntryType::ConstructionRefund));
        assert!(!is_internal(LedgerEntryType::Production));
        assert!(!is_internal(LedgerEntryType::Waste));
        assert!(!is_internal(LedgerEntryType::DisasterLoss));
    }
}
