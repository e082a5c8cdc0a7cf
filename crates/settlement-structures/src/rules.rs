//! The modifier rule table: each BUILDING structure kind contributes a
//! rule-derived value to one named modifier, computed by formula from the
//! structure's level rather than stored per level.

use rust_decimal::Decimal;
use settlement_types::StructureKind;

use crate::error::StructureError;

/// A modifier formula shape, evaluated over a structure's level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formula {
    /// `base + per_level * (level - 1)`.
    Linear {
        /// Value at level 1.
        base: Decimal,
        /// Additional value per level above 1.
        per_level: Decimal,
    },
    /// `base * growth^(level - 1)`.
    Exponential {
        /// Value at level 1.
        base: Decimal,
        /// Per-level growth factor, typically `> 1`.
        growth: Decimal,
    },
    /// `cap * (1 - decay^level)`, approaching `cap` as level grows.
    Diminishing {
        /// The asymptotic upper bound.
        cap: Decimal,
        /// Per-level decay factor in `(0, 1)`.
        decay: Decimal,
    },
}

/// Evaluate a formula at a given structure level.
///
/// # Errors
///
/// Returns [`StructureError::ArithmeticOverflow`] if the computation
/// overflows `Decimal`'s range.
pub fn evaluate(formula: Formula, level: u8) -> Result<Decimal, StructureError> {
    match formula {
        Formula::Linear { base, per_level } => {
            let steps = Decimal::from(level.saturating_sub(1));
            let increment = per_level
                .checked_mul(steps)
                .ok_or(StructureError::ArithmeticOverflow)?;
            base.checked_add(increment)
                .ok_or(StructureError::ArithmeticOverflow)
        }
        Formula::Exponential { base, growth } => {
            let factor = checked_powu(growth, u32::from(level.saturating_sub(1)))?;
            base.checked_mul(factor)
                .ok_or(StructureError::ArithmeticOverflow)
        }
        Formula::Diminishing { cap, decay } => {
            let factor = checked_powu(decay, u32::from(level))?;
            let remaining = Decimal::ONE
                .checked_sub(factor)
                .ok_or(StructureError::ArithmeticOverflow)?;
            cap.checked_mul(remaining)
                .ok_or(StructureError::ArithmeticOverflow)
        }
    }
}

/// Raise a `Decimal` to a non-negative integer power via repeated
/// checked multiplication (`Decimal` has no built-in `powu`).
fn checked_powu(base: Decimal, exponent: u32) -> Result<Decimal, StructureError> {
    let mut result = Decimal::ONE;
    for _ in 0..exponent {
        result = result
            .checked_mul(base)
            .ok_or(StructureError::ArithmeticOverflow)?;
    }
    Ok(result)
}

/// The modifier this structure kind contributes to at a given level, and
/// the formula governing it. `None` for EXTRACTOR kinds and any BUILDING
/// kind with no settlement-wide modifier (`TownHall` governs tier
/// directly rather than through this table).
pub fn rule_for(kind: StructureKind) -> Option<(&'static str, Formula)> {
    match kind {
        StructureKind::TownHall => Some((
            "population_capacity",
            Formula::Linear {
                base: Decimal::from_parts(20, 0, 0, false, 0),
                per_level: Decimal::from_parts(5, 0, 0, false, 0),
            },
        )),
        StructureKind::House => Some((
            "population_capacity",
            Formula::Linear {
                base: Decimal::from_parts(5, 0, 0, false, 0),
                per_level: Decimal::from_parts(5, 0, 0, false, 0),
            },
        )),
        StructureKind::Warehouse => Some((
            "storage_capacity",
            Formula::Linear {
                base: Decimal::from_parts(200, 0, 0, false, 0),
                per_level: Decimal::from_parts(100, 0, 0, false, 0),
            },
        )),
        StructureKind::Workshop => Some((
            "construction_speed_bonus",
            Formula::Diminishing {
                cap: Decimal::from_parts(5, 0, 0, false, 1), // 0.5
                decay: Decimal::from_parts(8, 0, 0, false, 1), // 0.8
            },
        )),
        StructureKind::Shelter => Some((
            "disaster_casualty_reduction",
            Formula::Linear {
                base: Decimal::from_parts(5, 0, 0, false, 2),      // 0.05
                per_level: Decimal::from_parts(2, 0, 0, false, 2), // 0.02
            },
        )),
        StructureKind::Wall => Some((
            "disaster_structure_resistance",
            Formula::Exponential {
                base: Decimal::from_parts(5, 0, 0, false, 2),   // 0.05
                growth: Decimal::from_parts(115, 0, 0, false, 2), // 1.15
            },
        )),
        StructureKind::Farm
        | StructureKind::Well
        | StructureKind::LumberCamp
        | StructureKind::Quarry
        | StructureKind::Mine => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_rises_by_per_level_step() {
        let value_1 = evaluate(rule_for(StructureKind::House).unwrap().1, 1).unwrap();
        let value_2 = evaluate(rule_for(StructureKind::House).unwrap().1, 2).unwrap();
        assert_eq!(value_2 - value_1, Decimal::from(5));
    }

    #[test]
    fn extractor_kinds_have_no_rule() {
        assert!(rule_for(StructureKind::Farm).is_none());
        assert!(rule_for(StructureKind::Mine).is_none());
    }

    #[test]
    fn diminishing_formula_approaches_cap() {
        let (_, formula) = rule_for(StructureKind::Workshop).unwrap();
        let low = evaluate(formula, 1).unwrap();
        let high = evaluate(formula, 20).unwrap();
        assert!(high > low);
        assert!(high < Decimal::from_parts(5, 0, 0, false, 1));
    }

    #[test]
    fn exponential_formula_grows_each_level() {
        let (_, formula) = rule_for(StructureKind::Wall).unwrap();
        let level_1 = evaluate(formula, 1).unwrap();
        let level_2 = evaluate(formula, 2).unwrap();
        assert!(level_2 > level_1);
    }
}
