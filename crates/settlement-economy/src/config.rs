//! Tunable rate tables for the production and population calculators.
//!
//! A plain struct with a `Default` impl and a handful of derived-value
//! methods, so the tick driver can override individual rates (e.g. per
//! world template) without touching the formulas themselves.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use settlement_types::{DisasterType, Resource};

/// Base extraction rate per resource, per tick, at quality 100 and tier 1
/// before any multiplier is applied.
#[derive(Debug, Clone)]
pub struct ProductionConfig {
    /// `base_rate_r` for each resource.
    pub base_rates: BTreeMap<Resource, Decimal>,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        let mut base_rates = BTreeMap::new();
        // Food at 0.2 so a single level-1, full-quality, full-health FARM
        // with no modifiers produces exactly 1.0/tick (tierMul(1) == 5).
        base_rates.insert(Resource::Food, Decimal::new(2, 1)); // 0.2
        base_rates.insert(Resource::Water, Decimal::new(2, 1)); // 0.2
        base_rates.insert(Resource::Wood, Decimal::new(16, 2)); // 0.16
        base_rates.insert(Resource::Stone, Decimal::new(12, 2)); // 0.12
        base_rates.insert(Resource::Ore, Decimal::new(8, 2)); // 0.08
        Self { base_rates }
    }
}

impl ProductionConfig {
    /// `base_rate_r`, or zero if the resource has no table entry.
    pub fn base_rate(&self, resource: Resource) -> Decimal {
        self.base_rates.get(&resource).copied().unwrap_or(Decimal::ZERO)
    }
}

/// `tierMul(level)`: a step function over extractor level bands, not a
/// continuous curve. Higher tiers unlock disproportionately larger
/// output rather than gradually scaling.
pub const fn tier_multiplier(level: u8) -> Decimal {
    match level {
        1..=3 => Decimal::from_parts(5, 0, 0, false, 0),
        4..=6 => Decimal::from_parts(10, 0, 0, false, 0),
        7..=9 => Decimal::from_parts(20, 0, 0, false, 0),
        _ => Decimal::from_parts(35, 0, 0, false, 0),
    }
}

/// `healthEff(health)`: a step function scaling production by structure
/// health. `health = None` (a structure with no health tracking) is
/// treated as fully healthy.
pub fn health_effectiveness(health: Option<u8>) -> Decimal {
    let health = health.unwrap_or(100);
    match health {
        95..=100 => Decimal::from_parts(1, 0, 0, false, 0),
        80..=94 => Decimal::from_parts(95, 0, 0, false, 2),
        60..=79 => Decimal::from_parts(85, 0, 0, false, 2),
        40..=59 => Decimal::from_parts(70, 0, 0, false, 2),
        20..=39 => Decimal::from_parts(50, 0, 0, false, 2),
        1..=19 => Decimal::from_parts(10, 0, 0, false, 2),
        0 => Decimal::ZERO,
        101..=u8::MAX => Decimal::from_parts(1, 0, 0, false, 0),
    }
}

/// A disaster type's innate resistance for a resource: how much of the
/// severity impact a resource shrugs off even with no structural
/// mitigation. Disasters named after a resource's production chain
/// (drought -> water, locusts -> food) hit that resource at full force
/// (`0` resistance); unrelated resources are mostly unaffected.
pub const fn innate_resistance(disaster: DisasterType, resource: Resource) -> Decimal {
    let near_immune = Decimal::from_parts(9, 0, 0, false, 1); // 0.9
    let half_resistant = Decimal::from_parts(5, 0, 0, false, 1);
    let zero = Decimal::ZERO;
    match (disaster, resource) {
        (DisasterType::Drought, Resource::Water) => zero,
        (DisasterType::Drought, Resource::Food) => half_resistant,
        (DisasterType::LocustSwarm | DisasterType::InsectPlague | DisasterType::Blight, Resource::Food) => zero,
        (DisasterType::Heatwave, Resource::Water) => zero,
        (DisasterType::Heatwave, Resource::Food) => half_resistant,
        (DisasterType::Wildfire, Resource::Wood) => zero,
        (DisasterType::Wildfire, Resource::Food) => half_resistant,
        (DisasterType::Sandstorm, Resource::Ore | Resource::Stone) => half_resistant,
        (DisasterType::Flood | DisasterType::Hurricane, Resource::Food | Resource::Water) => half_resistant,
        _ => near_immune,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_multiplier_steps_at_band_edges() {
        assert_eq!(tier_multiplier(3), Decimal::from(5));
        assert_eq!(tier_multiplier(4), Decimal::from(10));
        assert_eq!(tier_multiplier(10), Decimal::from(35));
    }

    #[test]
    fn health_effectiveness_zero_at_zero_health() {
        assert_eq!(health_effectiveness(Some(0)), Decimal::ZERO);
        assert_eq!(health_effectiveness(None), Decimal::from(1));
    }

    #[test]
    fn drought_fully_impacts_water_but_shrugs_off_wood() {
        assert_eq!(innate_resistance(DisasterType::Drought, Resource::Water), Decimal::ZERO);
        assert!(innate_resistance(DisasterType::Drought, Resource::Wood) > Decimal::new(5, 1));
    }
}
