//! The production calculator: per-resource output for one tick window.
//!
//! `produced_r = base_rate_r * tileQuality_r/100 * biomeEff_r * tierMul(level)
//! * healthEff(health) * disasterMod_r * tile.baseProductionModifier * ticks
//! * worldMul`, summed over the highest-level extractor of each extractor
//! type (duplicates of the same type are suppressed, not summed).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use settlement_types::{DisasterType, Resource, SeverityLevel};

use crate::config;
pub use crate::config::ProductionConfig;
use crate::error::EconomyError;

/// One extractor's contribution to a resource's production this tick.
#[derive(Debug, Clone, Copy)]
pub struct ExtractorContribution {
    /// The extractor's current level.
    pub level: u8,
    /// The extractor's current health, `[0, 100]`, or `None` if untracked.
    pub health: Option<u8>,
    /// The tile's quality score for this resource, `[0, 100]`.
    pub tile_quality: u8,
    /// `biomeEff_r`, the biome's production-efficiency modifier for this
    /// resource.
    pub biome_efficiency: Decimal,
    /// `tile.baseProductionModifier`, decayed by repeated disaster impact.
    pub base_production_modifier: Decimal,
}

/// An active disaster affecting this resource's production this tick.
#[derive(Debug, Clone, Copy)]
pub struct DisasterImpact {
    /// The disaster's type, used to look up innate resource resistance.
    pub disaster_type: DisasterType,
    /// The disaster's current severity band.
    pub severity: SeverityLevel,
}

/// `disasterMod_r`: the product of `(1 - severityImpact * (1 -
/// resistance_r))` over every active disaster affecting this resource,
/// floored at 0.1 so production never fully halts.
///
/// # Errors
///
/// Returns [`EconomyError::ArithmeticOverflow`] if the product overflows.
pub fn disaster_modifier(
    resource: Resource,
    impacts: &[DisasterImpact],
) -> Result<Decimal, EconomyError> {
    let mut modifier = Decimal::ONE;
    let overflow = || EconomyError::ArithmeticOverflow {
        context: "disaster modifier",
    };

    for impact in impacts {
        let resistance = config::innate_resistance(impact.disaster_type, resource);
        let unmitigated = Decimal::ONE.checked_sub(resistance).ok_or_else(overflow)?;
        let impact_fraction = impact
            .severity
            .impact_fraction()
            .checked_mul(unmitigated)
            .ok_or_else(overflow)?;
        let factor = Decimal::ONE.checked_sub(impact_fraction).ok_or_else(overflow)?;
        modifier = modifier.checked_mul(factor).ok_or_else(overflow)?;
    }

    let floor = Decimal::new(1, 1); // 0.1
    Ok(modifier.max(floor))
}

/// The amount of `resource` produced this tick window by the
/// highest-level extractor among `extractors` (all assumed to be the
/// same extractor type; lower-level duplicates of that type are
/// ignored, not summed).
///
/// # Errors
///
/// Returns [`EconomyError::ArithmeticOverflow`] if any multiplication in
/// the formula overflows `Decimal`'s range.
pub fn produced_amount(
    config: &ProductionConfig,
    resource: Resource,
    extractors: &[ExtractorContribution],
    disaster_impacts: &[DisasterImpact],
    ticks: u32,
    world_multiplier: Decimal,
) -> Result<u32, EconomyError> {
    // Only the highest-level extractor of this type contributes; among
    // ties the first one in `extractors` order wins, not an arbitrary one.
    let mut chosen: Option<&ExtractorContribution> = None;
    for candidate in extractors {
        match chosen {
            Some(current) if candidate.level <= current.level => {}
            _ => chosen = Some(candidate),
        }
    }
    let Some(extractor) = chosen else {
        return Ok(0);
    };

    let overflow = || EconomyError::ArithmeticOverflow {
        context: "production amount",
    };

    let quality_factor = Decimal::from(u32::from(extractor.tile_quality))
        .checked_div(Decimal::from(100))
        .ok_or_else(overflow)?;
    let tier_mul = config::tier_multiplier(extractor.level);
    let health_eff = config::health_effectiveness(extractor.health);
    let disaster_mod = disaster_modifier(resource, disaster_impacts)?;

    let value = config
        .base_rate(resource)
        .checked_mul(quality_factor)
        .ok_or_else(overflow)?
        .checked_mul(extractor.biome_efficiency)
        .ok_or_else(overflow)?
        .checked_mul(tier_mul)
        .ok_or_else(overflow)?
        .checked_mul(health_eff)
        .ok_or_else(overflow)?
        .checked_mul(disaster_mod)
        .ok_or_else(overflow)?
        .checked_mul(extractor.base_production_modifier)
        .ok_or_else(overflow)?
        .checked_mul(Decimal::from(ticks))
        .ok_or_else(overflow)?
        .checked_mul(world_multiplier)
        .ok_or_else(overflow)?;

    Ok(value.round().to_u32().unwrap_or(0))
}

/// What to do with production that would overflow a resource's storage
/// capacity: the part that fits, and the part dropped as waste.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Amount actually added to storage.
    pub committed: u32,
    /// Amount dropped because storage was already at or would exceed
    /// capacity; emitted as a `record_waste` ledger event by the caller.
    pub wasted: u32,
}

/// Commit a produced amount against a resource's current storage level
/// and capacity, splitting off anything that overflows.
pub const fn commit_against_capacity(current: u32, produced: u32, capacity: u32) -> CommitOutcome {
    let room = capacity.saturating_sub(current);
    if produced <= room {
        CommitOutcome {
            committed: produced,
            wasted: 0,
        }
    } else {
        CommitOutcome {
            committed: room,
            wasted: produced - room,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor(level: u8) -> ExtractorContribution {
        extractor_with_health(level, Some(100))
    }

    fn extractor_with_health(level: u8, health: Option<u8>) -> ExtractorContribution {
        ExtractorContribution {
            level,
            health,
            tile_quality: 100,
            biome_efficiency: Decimal::ONE,
            base_production_modifier: Decimal::ONE,
        }
    }

    fn produce_one_tick(health: Option<u8>) -> Decimal {
        let config = ProductionConfig::default();
        let extractors = [extractor_with_health(1, health)];
        let produced =
            produced_amount(&config, Resource::Food, &extractors, &[], 1, Decimal::ONE).unwrap();
        Decimal::from(produced)
    }

    #[test]
    fn health_effectiveness_step_values_match_scenario_table() {
        assert_eq!(produce_one_tick(Some(100)), Decimal::from(1));
        assert_eq!(produce_one_tick(Some(80)), Decimal::new(95, 2));
        assert_eq!(produce_one_tick(Some(60)), Decimal::new(85, 2));
        assert_eq!(produce_one_tick(Some(40)), Decimal::new(70, 2));
        assert_eq!(produce_one_tick(Some(20)), Decimal::new(50, 2));
        assert_eq!(produce_one_tick(Some(10)), Decimal::new(10, 2));
        assert_eq!(produce_one_tick(Some(0)), Decimal::ZERO);
    }

    #[test]
    fn only_the_highest_level_extractor_contributes() {
        let config = ProductionConfig::default();
        let extractors = vec![extractor(1), extractor(3)];
        let all = produced_amount(&config, Resource::Food, &extractors, &[], 1, Decimal::ONE).unwrap();
        let single = produced_amount(&config, Resource::Food, &[extractor(3)], &[], 1, Decimal::ONE).unwrap();
        assert_eq!(all, single);
    }

    #[test]
    fn duplicate_same_level_extractors_pick_the_first_not_the_healthiest() {
        let config = ProductionConfig::default();
        let extractors = [
            extractor_with_health(1, Some(100)),
            extractor_with_health(1, Some(60)),
            extractor_with_health(1, Some(20)),
        ];
        let produced =
            produced_amount(&config, Resource::Food, &extractors, &[], 1, Decimal::ONE).unwrap();
        assert_eq!(produced, 1);
    }

    #[test]
    fn no_extractors_produces_nothing() {
        let config = ProductionConfig::default();
        let produced = produced_amount(&config, Resource::Food, &[], &[], 1, Decimal::ONE).unwrap();
        assert_eq!(produced, 0);
    }

    #[test]
    fn disaster_modifier_is_floored_at_one_tenth() {
        let impacts = vec![
            DisasterImpact {
                disaster_type: DisasterType::Drought,
                severity: SeverityLevel::Catastrophic,
            },
            DisasterImpact {
                disaster_type: DisasterType::Drought,
                severity: SeverityLevel::Catastrophic,
            },
        ];
        let modifier = disaster_modifier(Resource::Water, &impacts).unwrap();
        assert_eq!(modifier, Decimal::new(1, 1));
    }

    #[test]
    fn compound_disasters_multiply_not_add() {
        let impacts = vec![
            DisasterImpact {
                disaster_type: DisasterType::Drought,
                severity: SeverityLevel::Major,
            },
            DisasterImpact {
                disaster_type: DisasterType::Heatwave,
                severity: SeverityLevel::Moderate,
            },
        ];
        let modifier = disaster_modifier(Resource::Water, &impacts).unwrap();
        assert_eq!(modifier, Decimal::new(24, 2));
    }

    #[test]
    fn disaster_with_full_resistance_leaves_production_untouched() {
        let impacts = vec![DisasterImpact {
            disaster_type: DisasterType::Volcano,
            severity: SeverityLevel::Major,
        }];
        // Volcano has no documented effect on water in our resistance table.
        let modifier = disaster_modifier(Resource::Water, &impacts).unwrap();
        assert!(modifier > Decimal::new(9, 1));
    }

    #[test]
    fn commit_splits_overflow_into_waste() {
        let outcome = commit_against_capacity(90, 20, 100);
        assert_eq!(outcome.committed, 10);
        assert_eq!(outcome.wasted, 10);
    }

    #[test]
    fn commit_with_room_wastes_nothing() {
        let outcome = commit_against_capacity(10, 20, 100);
        assert_eq!(outcome.committed, 20);
        assert_eq!(outcome.wasted, 0);
    }
}
