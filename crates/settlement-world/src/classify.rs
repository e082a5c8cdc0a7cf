//! Tile-type and biome classification, resource quality derivation, and
//! plot-slot sampling.

use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;
use settlement_types::{Biome, BiomeKind, Resource, TileType};

use crate::error::WorldError;
use crate::noise::lattice_value;

/// Classify a tile's type from its raw elevation.
pub const fn classify_tile_type(elevation: f64) -> TileType {
    if elevation < 0.0 {
        TileType::Ocean
    } else {
        TileType::Land
    }
}

/// Classify a tile's biome.
///
/// Ocean tiles are always [`BiomeKind::Ocean`]. Land tiles are matched
/// against every other biome's climate window in [`BiomeKind::ALL`]
/// declaration order, the first containing window winning.
pub fn classify_biome(
    biomes: &BTreeMap<BiomeKind, Biome>,
    tile_type: TileType,
    precipitation: f64,
    temperature: f64,
) -> Result<BiomeKind, WorldError> {
    if tile_type == TileType::Ocean {
        return Ok(BiomeKind::Ocean);
    }

    for kind in BiomeKind::ALL {
        if kind == BiomeKind::Ocean {
            continue;
        }
        let Some(biome) = biomes.get(&kind) else {
            continue;
        };
        if (biome.precipitation_min..=biome.precipitation_max).contains(&precipitation)
            && (biome.temperature_min..=biome.temperature_max).contains(&temperature)
        {
            return Ok(kind);
        }
    }

    Err(WorldError::NoCoveringBiome {
        precipitation,
        temperature,
    })
}

/// Squash an unbounded noise value into `[0, 1]`.
fn squash(value: f64) -> f64 {
    (value.tanh() + 1.0) / 2.0
}

fn to_quality(value: f64) -> u8 {
    value.clamp(0.0, 100.0).round() as u8
}

/// Derive the five resource quality scalars for a tile in `[0, 100]`.
///
/// Each is a climate-driven base value, scaled by the biome's
/// per-resource modifier and perturbed by a per-resource noise sample so
/// tiles of the same biome and climate still vary slightly. Ocean tiles
/// get zero land-resource quality; `waterQuality` is derived from
/// precipitation regardless of tile type.
#[allow(clippy::too_many_arguments)]
pub fn derive_qualities(
    tile_type: TileType,
    biome: &Biome,
    precipitation: f64,
    temperature: f64,
    elevation: f64,
    seed: u64,
    x: i64,
    y: i64,
) -> (u8, u8, u8, u8, u8) {
    let precip_n = squash(precipitation);
    let temp_n = squash(temperature);
    let elevation_n = squash(elevation);

    let water_quality = to_quality(precip_n * 100.0);

    if tile_type == TileType::Ocean {
        return (0, water_quality, 0, 0, 0);
    }

    let food_raw = precip_n * 60.0 + (1.0 - (temp_n - 0.5).abs() * 2.0) * 40.0;
    let wood_raw = precip_n * 70.0 + (1.0 - temp_n) * 30.0;
    let stone_raw = elevation_n * 60.0 + (1.0 - precip_n) * 40.0;
    let ore_raw = elevation_n * 50.0 + (1.0 - precip_n) * 50.0;

    let food_quality = apply_modifier(food_raw, biome, Resource::Food, seed, x, y);
    let wood_quality = apply_modifier(wood_raw, biome, Resource::Wood, seed, x, y);
    let stone_quality = apply_modifier(stone_raw, biome, Resource::Stone, seed, x, y);
    let ore_quality = apply_modifier(ore_raw, biome, Resource::Ore, seed, x, y);

    (food_quality, water_quality, wood_quality, stone_quality, ore_quality)
}

/// Apply a biome's resource modifier and a small deterministic
/// perturbation, salted per resource so the four qualities don't move in
/// lockstep.
fn apply_modifier(raw: f64, biome: &Biome, resource: Resource, seed: u64, x: i64, y: i64) -> u8 {
    let modifier = biome
        .resource_modifiers
        .get(&resource)
        .and_then(rust_decimal::Decimal::to_f64)
        .unwrap_or(1.0);
    let salt = resource_salt(resource);
    let perturbation = lattice_value(x, y, seed.wrapping_add(salt)) * 10.0;

    to_quality(raw * modifier + perturbation)
}

const fn resource_salt(resource: Resource) -> u64 {
    match resource {
        Resource::Food => 0x1000_0001,
        Resource::Water => 0x1000_0003,
        Resource::Wood => 0x1000_0007,
        Resource::Stone => 0x1000_000B,
        Resource::Ore => 0x1000_000D,
    }
}

/// Sample a tile's plot-slot count uniformly from the biome's range.
///
/// # Errors
///
/// Returns [`WorldError::EmptyPlotSlotRange`] if the biome's range is
/// inverted (`min > max`), a configuration bug.
pub fn sample_plot_slots(
    biome: &Biome,
    biome_kind: BiomeKind,
    seed: u64,
    x: i64,
    y: i64,
) -> Result<u8, WorldError> {
    if biome.plot_slots_min > biome.plot_slots_max {
        return Err(WorldError::EmptyPlotSlotRange(biome_kind));
    }

    let span = u32::from(biome.plot_slots_max - biome.plot_slots_min) + 1;
    let unit = (lattice_value(x, y, seed.wrapping_add(0xA5A5_5A5A_5A5A_5A5A)) + 1.0) / 2.0;
    let offset = ((unit * f64::from(span)).floor() as u32).min(span - 1);

    Ok(biome.plot_slots_min + u8::try_from(offset).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn grassland() -> Biome {
        Biome {
            id: settlement_types::BiomeId::new(),
            kind: BiomeKind::Grassland,
            precipitation_min: -1.0,
            precipitation_max: 1.0,
            temperature_min: -1.0,
            temperature_max: 1.0,
            resource_modifiers: BTreeMap::from([
                (Resource::Food, dec!(1.2)),
                (Resource::Water, dec!(1.0)),
                (Resource::Wood, dec!(1.0)),
                (Resource::Stone, dec!(0.8)),
                (Resource::Ore, dec!(0.8)),
            ]),
            plot_slots_min: 3,
            plot_slots_max: 5,
        }
    }

    #[test]
    fn elevation_below_zero_is_ocean() {
        assert_eq!(classify_tile_type(-0.01), TileType::Ocean);
        assert_eq!(classify_tile_type(0.0), TileType::Land);
    }

    #[test]
    fn ocean_tiles_classify_as_ocean_biome() {
        let biomes = BTreeMap::new();
        let kind = classify_biome(&biomes, TileType::Ocean, 0.0, 0.0).unwrap();
        assert_eq!(kind, BiomeKind::Ocean);
    }

    #[test]
    fn land_tile_matches_covering_window() {
        let mut biomes = BTreeMap::new();
        biomes.insert(BiomeKind::Grassland, grassland());
        let kind = classify_biome(&biomes, TileType::Land, 0.2, -0.3).unwrap();
        assert_eq!(kind, BiomeKind::Grassland);
    }

    #[test]
    fn land_tile_with_no_covering_window_errs() {
        let biomes = BTreeMap::new();
        let result = classify_biome(&biomes, TileType::Land, 0.2, -0.3);
        assert!(matches!(result, Err(WorldError::NoCoveringBiome { .. })));
    }

    #[test]
    fn ocean_tiles_have_zero_land_quality() {
        let biome = grassland();
        let (food, water, wood, stone, ore) =
            derive_qualities(TileType::Ocean, &biome, 0.5, 0.1, -0.2, 7, 3, 4);
        assert_eq!((food, wood, stone, ore), (0, 0, 0, 0));
        assert!(water > 0);
    }

    #[test]
    fn land_qualities_are_reproducible() {
        let biome = grassland();
        let a = derive_qualities(TileType::Land, &biome, 0.5, 0.1, 0.3, 7, 3, 4);
        let b = derive_qualities(TileType::Land, &biome, 0.5, 0.1, 0.3, 7, 3, 4);
        assert_eq!(a, b);
    }

    #[test]
    fn plot_slots_stay_within_range() {
        let biome = grassland();
        for x in 0..20_i64 {
            let slots = sample_plot_slots(&biome, BiomeKind::Grassland, 11, x, 0).unwrap();
            assert!((3..=5).contains(&slots));
        }
    }

    #[test]
    fn empty_plot_slot_range_errs() {
        let mut biome = grassland();
        biome.plot_slots_min = 5;
        biome.plot_slots_max = 3;
        let result = sample_plot_slots(&biome, BiomeKind::Grassland, 11, 0, 0);
        assert!(matches!(result, Err(WorldError::EmptyPlotSlotRange(_))));
    }
}
