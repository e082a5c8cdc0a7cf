//! The population calculator: capacity, happiness, growth, and
//! starvation for one growth-tick window.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use settlement_types::{Resource, ResourceAmounts, SettlementTier};

use crate::error::EconomyError;

/// Tunables for the population calculator.
#[derive(Debug, Clone, Copy)]
pub struct PopulationConfig {
    /// Food units consumed per resident per growth-tick window.
    pub per_capita_food_need: u32,
    /// Water units consumed per resident per growth-tick window.
    pub per_capita_water_need: u32,
    /// Fractional population growth per hour when happiness is in the
    /// thriving band (`>= 70`).
    pub growth_rate_thrive: Decimal,
    /// Fractional population loss per hour when happiness is in the
    /// emigrating band (`< 40`).
    pub emigration_rate: Decimal,
    /// Fraction of a food deficit that converts to starvation
    /// casualties.
    pub starvation_casualty_rate: Decimal,
    /// Ticks of decaying happiness penalty applied per disaster impact.
    pub trauma_ticks: u32,
    /// Happiness penalty applied while `trauma_ticks_remaining > 0`.
    pub trauma_penalty: u8,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            per_capita_food_need: 2,
            per_capita_water_need: 2,
            growth_rate_thrive: Decimal::new(2, 2),     // 0.02 (2%/hour)
            emigration_rate: Decimal::new(1, 2),         // 0.01 (1%/hour)
            starvation_casualty_rate: Decimal::new(5, 2), // 0.05
            trauma_ticks: 24,
            trauma_penalty: 15,
        }
    }
}

/// `capacity = tier baseline + aggregated population_capacity modifier`.
pub const fn capacity(tier: SettlementTier, modifier_total: u32) -> u32 {
    let baseline: u32 = match tier {
        SettlementTier::Outpost => 10,
        SettlementTier::Village => 25,
        SettlementTier::Town => 50,
        SettlementTier::City => 100,
    };
    baseline.saturating_add(modifier_total)
}

/// Derive `[0, 100]` happiness from current storage levels against
/// per-capita needs and any active disaster trauma.
pub fn happiness(
    storage: &ResourceAmounts,
    population: u32,
    config: &PopulationConfig,
    trauma_ticks_remaining: u32,
) -> u8 {
    let mut score: i32 = 50;

    let food = storage.get(&Resource::Food).copied().unwrap_or(0);
    let water = storage.get(&Resource::Water).copied().unwrap_or(0);
    let food_need = population.saturating_mul(config.per_capita_food_need);
    let water_need = population.saturating_mul(config.per_capita_water_need);

    score += if food < food_need { -20 } else { 10 };
    score += if water < water_need { -20 } else { 10 };

    if trauma_ticks_remaining > 0 {
        score -= i32::from(config.trauma_penalty);
    }

    score.clamp(0, 100) as u8
}

/// Growth (or emigration) rate per hour at a given happiness level.
/// Negative means the settlement is shrinking.
pub fn growth_rate_per_hour(happiness: u8, config: &PopulationConfig) -> Decimal {
    if happiness >= 70 {
        config.growth_rate_thrive
    } else if happiness >= 40 {
        Decimal::ZERO
    } else {
        -config.emigration_rate
    }
}

/// The outcome of applying one population growth-tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopulationTickResult {
    /// Population after growth, emigration, and starvation, capped at
    /// `capacity`.
    pub new_population: u32,
    /// Residents lost to starvation this tick, already reflected in
    /// `new_population`.
    pub starvation_casualties: u32,
}

/// Apply one growth-tick: starvation first, then growth/emigration,
/// capped at `capacity`.
///
/// # Errors
///
/// Returns [`EconomyError::ArithmeticOverflow`] if the growth-delta
/// computation overflows `Decimal`'s range.
pub fn apply_tick(
    current_population: u32,
    capacity: u32,
    happiness: u8,
    food_available: u32,
    hours_elapsed: Decimal,
    config: &PopulationConfig,
) -> Result<PopulationTickResult, EconomyError> {
    let overflow = || EconomyError::ArithmeticOverflow {
        context: "population growth delta",
    };

    let food_need = current_population.saturating_mul(config.per_capita_food_need);
    let starvation_casualties = if food_available < food_need {
        let deficit = food_need - food_available;
        let casualty_estimate = Decimal::from(deficit)
            .checked_mul(config.starvation_casualty_rate)
            .ok_or_else(overflow)?;
        casualty_estimate
            .round()
            .to_u32()
            .unwrap_or(0)
            .min(current_population)
    } else {
        0
    };

    let after_starvation = current_population - starvation_casualties;

    let rate = growth_rate_per_hour(happiness, config);
    let delta = rate
        .checked_mul(Decimal::from(after_starvation))
        .ok_or_else(overflow)?
        .checked_mul(hours_elapsed)
        .ok_or_else(overflow)?
        .round()
        .to_i64()
        .unwrap_or(0);

    let grown = i64::from(after_starvation).saturating_add(delta).max(0);
    let new_population = u32::try_from(grown).unwrap_or(u32::MAX).min(capacity);

    Ok(PopulationTickResult {
        new_population,
        starvation_casualties,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(food: u32, water: u32) -> ResourceAmounts {
        ResourceAmounts::from([(Resource::Food, food), (Resource::Water, water)])
    }

    #[test]
    fn capacity_scales_with_tier_and_modifier() {
        assert_eq!(capacity(SettlementTier::Outpost, 0), 10);
        assert_eq!(capacity(SettlementTier::City, 50), 150);
    }

    #[test]
    fn happiness_drops_on_shortage() {
        let config = PopulationConfig::default();
        let low = happiness(&storage(0, 0), 10, &config, 0);
        let high = happiness(&storage(1000, 1000), 10, &config, 0);
        assert!(low < high);
    }

    #[test]
    fn trauma_depresses_happiness() {
        let config = PopulationConfig::default();
        let calm = happiness(&storage(1000, 1000), 10, &config, 0);
        let traumatized = happiness(&storage(1000, 1000), 10, &config, 5);
        assert!(traumatized < calm);
    }

    #[test]
    fn thriving_settlement_grows() {
        let config = PopulationConfig::default();
        let result = apply_tick(100, 200, 80, 10_000, Decimal::from(1), &config).unwrap();
        assert!(result.new_population > 100);
        assert_eq!(result.starvation_casualties, 0);
    }

    #[test]
    fn starving_settlement_loses_population() {
        let config = PopulationConfig::default();
        let result = apply_tick(100, 200, 50, 0, Decimal::from(1), &config).unwrap();
        assert!(result.starvation_casualties > 0);
        assert!(result.new_population < 100);
    }

    #[test]
    fn growth_never_exceeds_capacity() {
        let config = PopulationConfig::default();
        let result = apply_tick(95, 100, 90, 10_000, Decimal::from(10), &config).unwrap();
        assert!(result.new_population <= 100);
    }
}
