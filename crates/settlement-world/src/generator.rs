//! Top-level world generation: `Generate(worldSpec) -> (regions, tiles)`.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use settlement_types::{
    Biome, BiomeKind, NoiseBundle, REGION_SIZE, Region, RegionId, Tile, TileId, WorldId,
};

use crate::classify::{classify_biome, classify_tile_type, derive_qualities, sample_plot_slots};
use crate::error::WorldError;
use crate::noise::fractal_value;

/// The regions and tiles produced by a single generation run.
#[derive(Debug, Clone)]
pub struct GeneratedWorld {
    /// Every region in the world, row-major by `(y, x)`.
    pub regions: Vec<Region>,
    /// Every tile in the world, grouped by region in the same order.
    pub tiles: Vec<Tile>,
}

/// Generate a world's full region/tile grid.
///
/// `width_regions` x `height_regions` regions are produced, each
/// [`REGION_SIZE`] x [`REGION_SIZE`] tiles. For every tile this samples
/// the three noise bundles, classifies tile type and biome, derives
/// resource qualities, and samples a plot-slot count, per the world
/// generator's step-by-step algorithm.
///
/// # Errors
///
/// Returns [`WorldError::InvalidDimensions`] if either dimension is zero,
/// [`WorldError::NoCoveringBiome`] if the seeded biome table has a gap in
/// its climate coverage, or [`WorldError::EmptyPlotSlotRange`] if a
/// biome's plot-slot range is inverted.
pub fn generate(
    world_id: WorldId,
    elevation_noise: &NoiseBundle,
    precipitation_noise: &NoiseBundle,
    temperature_noise: &NoiseBundle,
    width_regions: u32,
    height_regions: u32,
    biomes: &[Biome],
) -> Result<GeneratedWorld, WorldError> {
    if width_regions == 0 || height_regions == 0 {
        return Err(WorldError::InvalidDimensions {
            width: width_regions,
            height: height_regions,
        });
    }

    let biomes_by_kind: BTreeMap<BiomeKind, Biome> =
        biomes.iter().cloned().map(|biome| (biome.kind, biome)).collect();

    let tile_count = (width_regions * height_regions * REGION_SIZE * REGION_SIZE) as usize;
    let mut regions = Vec::with_capacity((width_regions * height_regions) as usize);
    let mut tiles = Vec::with_capacity(tile_count);

    for ry in 0..height_regions {
        for rx in 0..width_regions {
            let region_id = RegionId::new();
            let mut elevation_map = Vec::with_capacity((REGION_SIZE * REGION_SIZE) as usize);
            let mut precipitation_map = Vec::with_capacity((REGION_SIZE * REGION_SIZE) as usize);
            let mut temperature_map = Vec::with_capacity((REGION_SIZE * REGION_SIZE) as usize);

            for ty in 0..REGION_SIZE {
                for tx in 0..REGION_SIZE {
                    let world_x = f64::from(rx * REGION_SIZE + tx);
                    let world_y = f64::from(ry * REGION_SIZE + ty);

                    let elevation = fractal_value(elevation_noise, world_x, world_y);
                    let precipitation = fractal_value(precipitation_noise, world_x, world_y);
                    let temperature = fractal_value(temperature_noise, world_x, world_y);

                    elevation_map.push(elevation);
                    precipitation_map.push(precipitation);
                    temperature_map.push(temperature);

                    let tile_type = classify_tile_type(elevation);
                    let biome_kind =
                        classify_biome(&biomes_by_kind, tile_type, precipitation, temperature)?;
                    let biome = biomes_by_kind.get(&biome_kind).ok_or(
                        WorldError::NoCoveringBiome {
                            precipitation,
                            temperature,
                        },
                    )?;

                    let lattice_x = i64::from(rx * REGION_SIZE + tx);
                    let lattice_y = i64::from(ry * REGION_SIZE + ty);

                    let (food_quality, water_quality, wood_quality, stone_quality, ore_quality) =
                        derive_qualities(
                            tile_type,
                            biome,
                            precipitation,
                            temperature,
                            elevation,
                            elevation_noise.seed,
                            lattice_x,
                            lattice_y,
                        );

                    let plot_slots = sample_plot_slots(
                        biome,
                        biome_kind,
                        elevation_noise.seed,
                        lattice_x,
                        lattice_y,
                    )?;

                    tiles.push(Tile {
                        id: TileId::new(),
                        region_id,
                        x: tx,
                        y: ty,
                        tile_type,
                        elevation,
                        temperature,
                        precipitation,
                        biome: biome_kind,
                        food_quality,
                        water_quality,
                        wood_quality,
                        stone_quality,
                        ore_quality,
                        special_resource: None,
                        plot_slots,
                        base_production_modifier: Decimal::ONE,
                        settlement_id: None,
                    });
                }
            }

            regions.push(Region {
                id: region_id,
                world_id,
                x: i32::try_from(rx).unwrap_or(i32::MAX),
                y: i32::try_from(ry).unwrap_or(i32::MAX),
                elevation_map,
                precipitation_map,
                temperature_map,
            });
        }
    }

    Ok(GeneratedWorld { regions, tiles })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use settlement_types::{BiomeId, Resource, WorldId};

    fn bundle(seed: u64) -> NoiseBundle {
        NoiseBundle {
            octaves: 3,
            amplitude: dec!(1.0),
            frequency: dec!(0.1),
            persistence: dec!(0.5),
            scale: dec!(1.0),
            seed,
        }
    }

    fn modifiers() -> BTreeMap<Resource, Decimal> {
        BTreeMap::from([
            (Resource::Food, dec!(1.0)),
            (Resource::Water, dec!(1.0)),
            (Resource::Wood, dec!(1.0)),
            (Resource::Stone, dec!(1.0)),
            (Resource::Ore, dec!(1.0)),
        ])
    }

    fn full_biome_table() -> Vec<Biome> {
        BiomeKind::ALL
            .into_iter()
            .map(|kind| Biome {
                id: BiomeId::new(),
                kind,
                precipitation_min: -2.0,
                precipitation_max: 2.0,
                temperature_min: -2.0,
                temperature_max: 2.0,
                resource_modifiers: modifiers(),
                plot_slots_min: 3,
                plot_slots_max: 6,
            })
            .collect()
    }

    #[test]
    fn generate_produces_full_grid() {
        let world_id = WorldId::new();
        let elevation = bundle(1);
        let precipitation = bundle(2);
        let temperature = bundle(3);
        let biomes = full_biome_table();

        let world = generate(world_id, &elevation, &precipitation, &temperature, 2, 3, &biomes)
            .unwrap();

        assert_eq!(world.regions.len(), 6);
        assert_eq!(world.tiles.len(), 6 * (REGION_SIZE * REGION_SIZE) as usize);
        assert!(world.regions.iter().all(|r| r.world_id == world_id));
    }

    #[test]
    fn generate_is_reproducible() {
        let world_id = WorldId::new();
        let elevation = bundle(1);
        let precipitation = bundle(2);
        let temperature = bundle(3);
        let biomes = full_biome_table();

        let a = generate(world_id, &elevation, &precipitation, &temperature, 1, 1, &biomes)
            .unwrap();
        let b = generate(world_id, &elevation, &precipitation, &temperature, 1, 1, &biomes)
            .unwrap();

        let a_elev: Vec<f64> = a.tiles.iter().map(|t| t.elevation).collect();
        let b_elev: Vec<f64> = b.tiles.iter().map(|t| t.elevation).collect();
        assert_eq!(a_elev, b_elev);
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let world_id = WorldId::new();
        let elevation = bundle(1);
        let precipitation = bundle(2);
        let temperature = bundle(3);
        let biomes = full_biome_table();

        let result = generate(world_id, &elevation, &precipitation, &temperature, 0, 1, &biomes);
        assert!(matches!(result, Err(WorldError::InvalidDimensions { .. })));
    }

    #[test]
    fn missing_biome_coverage_surfaces_as_error() {
        let world_id = WorldId::new();
        let elevation = bundle(1);
        let precipitation = bundle(2);
        let temperature = bundle(3);

        let result = generate(world_id, &elevation, &precipitation, &temperature, 1, 1, &[]);
        assert!(matches!(result, Err(WorldError::NoCoveringBiome { .. })));
    }
}
