//! Cost and duration computation for a construction-queue enqueue.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use settlement_types::{ResourceAmounts, StructureRequirement};

use crate::error::ConstructionError;

/// The emergency cost multiplier applied to every resource requirement
/// when enqueueing under AFTERMATH rules.
const EMERGENCY_COST_MULTIPLIER: Decimal = Decimal::from_parts(25, 0, 0, false, 1); // 2.5

/// `base cost from Structure definition x (emergency ? 2.5 : 1.0)`.
///
/// # Errors
///
/// Returns [`ConstructionError::ArithmeticOverflow`] if a scaled quantity
/// overflows `u32`.
pub fn compute_cost(
    requirements: &[StructureRequirement],
    emergency: bool,
) -> Result<ResourceAmounts, ConstructionError> {
    let mut cost = ResourceAmounts::new();
    for requirement in requirements {
        let quantity = if emergency {
            Decimal::from(requirement.quantity)
                .checked_mul(EMERGENCY_COST_MULTIPLIER)
                .ok_or(ConstructionError::ArithmeticOverflow {
                    context: "emergency cost scaling",
                })?
                .round()
                .to_u32()
                .ok_or(ConstructionError::ArithmeticOverflow {
                    context: "emergency cost scaling",
                })?
        } else {
            requirement.quantity
        };
        cost.insert(requirement.resource, quantity);
    }
    Ok(cost)
}

/// Which resources (and by how much) `storage` falls short of `cost`.
/// Empty if storage covers every resource in full.
pub fn shortages(storage: &ResourceAmounts, cost: &ResourceAmounts) -> ResourceAmounts {
    let mut shortfall = ResourceAmounts::new();
    for (&resource, &needed) in cost {
        let available = storage.get(&resource).copied().unwrap_or(0);
        if available < needed {
            shortfall.insert(resource, needed - available);
        }
    }
    shortfall
}

/// `completesAt = now + constructionTime/(emergency ? 2 : 1)/(workshop
/// bonus)`. `workshop_bonus` is the settlement's aggregated
/// `construction_speed_bonus` modifier, e.g. `0.3` for 30% faster.
///
/// # Errors
///
/// Returns [`ConstructionError::ArithmeticOverflow`] if the duration
/// computation overflows.
pub fn compute_completes_at(
    construction_time_seconds: u32,
    emergency: bool,
    workshop_bonus: Decimal,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ConstructionError> {
    let overflow = || ConstructionError::ArithmeticOverflow {
        context: "construction duration",
    };

    let mut seconds = Decimal::from(construction_time_seconds);
    if emergency {
        seconds = seconds.checked_div(Decimal::from(2)).ok_or_else(overflow)?;
    }
    let speedup = Decimal::ONE.checked_add(workshop_bonus).ok_or_else(overflow)?;
    seconds = seconds.checked_div(speedup).ok_or_else(overflow)?;

    let whole_seconds = seconds.round().to_i64().ok_or_else(overflow)?;
    Ok(now + Duration::seconds(whole_seconds.max(0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use settlement_types::{Resource, StructureDefId};

    fn requirement(resource: Resource, quantity: u32) -> StructureRequirement {
        StructureRequirement {
            structure_def_id: StructureDefId::new(),
            resource,
            quantity,
        }
    }

    #[test]
    fn emergency_cost_is_two_point_five_times_base() {
        let requirements = vec![requirement(Resource::Wood, 100), requirement(Resource::Stone, 60)];
        let cost = compute_cost(&requirements, true).unwrap();
        assert_eq!(cost[&Resource::Wood], 250);
        assert_eq!(cost[&Resource::Stone], 150);
    }

    #[test]
    fn non_emergency_cost_is_unchanged() {
        let requirements = vec![requirement(Resource::Wood, 100)];
        let cost = compute_cost(&requirements, false).unwrap();
        assert_eq!(cost[&Resource::Wood], 100);
    }

    #[test]
    fn shortages_reports_only_the_deficit() {
        let cost = ResourceAmounts::from([(Resource::Wood, 100), (Resource::Stone, 60)]);
        let storage = ResourceAmounts::from([(Resource::Wood, 40), (Resource::Stone, 100)]);
        let shortfall = shortages(&storage, &cost);
        assert_eq!(shortfall.get(&Resource::Wood), Some(&60));
        assert_eq!(shortfall.get(&Resource::Stone), None);
    }

    #[test]
    fn emergency_halves_construction_time() {
        let now = Utc::now();
        let normal = compute_completes_at(3600, false, Decimal::ZERO, now).unwrap();
        let emergency = compute_completes_at(3600, true, Decimal::ZERO, now).unwrap();
        assert!(emergency < normal);
    }

    #[test]
    fn workshop_bonus_speeds_up_construction() {
        let now = Utc::now();
        let base = compute_completes_at(3600, false, Decimal::ZERO, now).unwrap();
        let boosted = compute_completes_at(3600, false, Decimal::new(5, 1), now).unwrap();
        assert!(boosted < base);
    }
}
