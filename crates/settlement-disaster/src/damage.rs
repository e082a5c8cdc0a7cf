//! Per-tick structure damage and casualty computation during IMPACT.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use settlement_types::SeverityLevel;

use crate::error::DisasterError;

/// Health lost by one structure during one IMPACT tick, proportional to
/// severity and inversely proportional to the impact's total duration,
/// reduced by the structure's own resistance (e.g. Wall's
/// `disaster_structure_resistance` modifier).
///
/// # Errors
///
/// Returns [`DisasterError::ArithmeticOverflow`] on overflow.
pub fn structure_health_loss(
    severity: SeverityLevel,
    impact_duration_seconds: u32,
    tick_seconds: u32,
    resistance: Decimal,
) -> Result<u8, DisasterError> {
    let overflow = || DisasterError::ArithmeticOverflow {
        context: "structure health loss",
    };

    if impact_duration_seconds == 0 {
        return Ok(0);
    }

    let total_damage = severity.impact_fraction().checked_mul(Decimal::from(100)).ok_or_else(overflow)?;
    let per_second = total_damage
        .checked_div(Decimal::from(impact_duration_seconds))
        .ok_or_else(overflow)?;
    let this_tick = per_second
        .checked_mul(Decimal::from(tick_seconds))
        .ok_or_else(overflow)?;

    let mitigated = Decimal::ONE.checked_sub(resistance).ok_or_else(overflow)?;
    let damage = this_tick.checked_mul(mitigated).ok_or_else(overflow)?;

    Ok(damage.round().to_u8().unwrap_or(0))
}

/// Population lost this IMPACT tick: a fraction of `population`
/// proportional to severity, reduced by active shelter coverage
/// (`disaster_casualty_reduction`) and a happiness buffer (high
/// happiness settlements cope better).
///
/// # Errors
///
/// Returns [`DisasterError::ArithmeticOverflow`] on overflow.
pub fn casualties(
    population: u32,
    severity: SeverityLevel,
    impact_duration_seconds: u32,
    tick_seconds: u32,
    shelter_reduction: Decimal,
    happiness: u8,
) -> Result<u32, DisasterError> {
    let overflow = || DisasterError::ArithmeticOverflow {
        context: "casualty count",
    };

    if impact_duration_seconds == 0 {
        return Ok(0);
    }

    let total_fraction = severity.impact_fraction();
    let per_tick_fraction = total_fraction
        .checked_mul(Decimal::from(tick_seconds))
        .ok_or_else(overflow)?
        .checked_div(Decimal::from(impact_duration_seconds))
        .ok_or_else(overflow)?;

    let happiness_buffer = Decimal::from(happiness)
        .checked_div(Decimal::from(200))
        .ok_or_else(overflow)?; // up to 0.5 at 100 happiness
    let after_shelter = Decimal::ONE.checked_sub(shelter_reduction).ok_or_else(overflow)?;
    let after_happiness = Decimal::ONE.checked_sub(happiness_buffer).ok_or_else(overflow)?;

    let effective_fraction = per_tick_fraction
        .checked_mul(after_shelter)
        .ok_or_else(overflow)?
        .checked_mul(after_happiness)
        .ok_or_else(overflow)?
        .max(Decimal::ZERO);

    let lost = Decimal::from(population)
        .checked_mul(effective_fraction)
        .ok_or_else(overflow)?;

    Ok(lost.round().to_u32().unwrap_or(0).min(population))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_loss_spreads_across_the_full_duration() {
        let per_tick = structure_health_loss(SeverityLevel::Major, 3600, 60, Decimal::ZERO).unwrap();
        let total: u32 = (0..60).map(|_| u32::from(per_tick)).sum();
        // Major = 0.6 impact fraction -> 60 health over the full duration.
        assert!((50..=70).contains(&total));
    }

    #[test]
    fn resistance_reduces_health_loss() {
        let unmitigated = structure_health_loss(SeverityLevel::Major, 3600, 60, Decimal::ZERO).unwrap();
        let mitigated = structure_health_loss(SeverityLevel::Major, 3600, 60, Decimal::new(5, 1)).unwrap();
        assert!(mitigated < unmitigated);
    }

    #[test]
    fn shelters_and_happiness_reduce_casualties() {
        let base = casualties(1000, SeverityLevel::Major, 3600, 3600, Decimal::ZERO, 0).unwrap();
        let protected = casualties(1000, SeverityLevel::Major, 3600, 3600, Decimal::new(5, 1), 100).unwrap();
        assert!(protected < base);
    }

    #[test]
    fn casualties_never_exceed_population() {
        let lost = casualties(10, SeverityLevel::Catastrophic, 10, 3600, Decimal::ZERO, 0).unwrap();
        assert!(lost <= 10);
    }
}
