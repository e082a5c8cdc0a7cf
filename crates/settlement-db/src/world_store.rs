//! World, Region, Tile, and Biome persistence.
//!
//! Worlds are generated once and then read heavily by the tick
//! driver and the world-generation REST endpoints; tiles are queried by
//! region far more often than individually, hence `tiles_by_region`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use settlement_types::{
    Biome, BiomeId, BiomeKind, NoiseBundle, Region, RegionId, Resource, ServerId, TemplateConfig,
    Tile, TileId, TileType, World, WorldId, WorldStatus,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Operations on the `worlds`, `regions`, `tiles`, and `biomes` tables.
pub struct WorldStore<'a> {
    pool: &'a PgPool,
}

impl<'a> WorldStore<'a> {
    /// Create a new world store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a newly generated world.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert_world(&self, world: &World) -> Result<(), DbError> {
        let noise = serde_json::to_value(&(
            &world.elevation_noise,
            &world.precipitation_noise,
            &world.temperature_noise,
        ))?;
        let template = serde_json::to_value(&world.template)?;

        sqlx::query(
            r"INSERT INTO worlds
              (id, server_id, name, status, failure_reason, noise_bundles, template, width_regions, height_regions, created_at)
              VALUES ($1, $2, $3, $4::world_status, $5, $6, $7, $8, $9, $10)",
        )
        .bind(world.id.into_inner())
        .bind(world.server_id.into_inner())
        .bind(&world.name)
        .bind(world_status_to_db(world.status))
        .bind(&world.failure_reason)
        .bind(noise)
        .bind(template)
        .bind(i64::from(world.width_regions))
        .bind(i64::from(world.height_regions))
        .bind(world.created_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Update a world's lifecycle status and optional failure reason.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn update_status(
        &self,
        world_id: WorldId,
        status: WorldStatus,
        failure_reason: Option<&str>,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"UPDATE worlds SET status = $2::world_status, failure_reason = $3 WHERE id = $1",
        )
        .bind(world_id.into_inner())
        .bind(world_status_to_db(status))
        .bind(failure_reason)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Fetch a world by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no such world exists, or
    /// [`DbError::Postgres`] if the query fails.
    pub async fn get_world(&self, world_id: WorldId) -> Result<World, DbError> {
        let row = sqlx::query_as::<_, WorldRow>(
            r"SELECT id, server_id, name, status::TEXT as status, failure_reason, noise_bundles,
                     template, width_regions, height_regions, created_at
              FROM worlds WHERE id = $1",
        )
        .bind(world_id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        row.map(WorldRow::into_world)
            .transpose()?
            .ok_or_else(|| DbError::NotFound(format!("world {world_id}")))
    }

    /// List every world, for the admin dashboard and world listing routes.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list_worlds(&self) -> Result<Vec<World>, DbError> {
        let rows = sqlx::query_as::<_, WorldRow>(
            r"SELECT id, server_id, name, status::TEXT as status, failure_reason, noise_bundles,
                     template, width_regions, height_regions, created_at
              FROM worlds ORDER BY created_at",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(WorldRow::into_world).collect()
    }

    /// Delete a world. Regions, tiles, settlements, and every entity
    /// scoped underneath cascade via foreign-key `ON DELETE CASCADE`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete_world(&self, world_id: WorldId) -> Result<(), DbError> {
        sqlx::query(r"DELETE FROM worlds WHERE id = $1")
            .bind(world_id.into_inner())
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Batch-insert generated regions.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if any batch fails to insert.
    pub async fn batch_insert_regions(&self, regions: &[Region]) -> Result<(), DbError> {
        if regions.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for region in regions {
            sqlx::query(
                r"INSERT INTO regions (id, world_id, x, y, elevation_map, precipitation_map, temperature_map)
                  VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(region.id.into_inner())
            .bind(region.world_id.into_inner())
            .bind(region.x)
            .bind(region.y)
            .bind(serde_json::to_value(&region.elevation_map)?)
            .bind(serde_json::to_value(&region.precipitation_map)?)
            .bind(serde_json::to_value(&region.temperature_map)?)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    /// Batch-insert generated tiles.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if any batch fails to insert.
    pub async fn batch_insert_tiles(&self, tiles: &[Tile]) -> Result<(), DbError> {
        const BATCH_SIZE: usize = 500;
        if tiles.is_empty() {
            return Ok(());
        }

        for chunk in tiles.chunks(BATCH_SIZE) {
            let mut tx = self.pool.begin().await?;
            for tile in chunk {
                sqlx::query(
                    r"INSERT INTO tiles
                      (id, region_id, x, y, tile_type, elevation, temperature, precipitation,
                       biome, food_quality, water_quality, wood_quality, stone_quality, ore_quality,
                       special_resource, plot_slots, base_production_modifier, settlement_id)
                      VALUES ($1, $2, $3, $4, $5::tile_type, $6, $7, $8, $9::biome_kind, $10, $11, $12, $13, $14, $15, $16, $17, $18)",
                )
                .bind(tile.id.into_inner())
                .bind(tile.region_id.into_inner())
                .bind(i64::from(tile.x))
                .bind(i64::from(tile.y))
                .bind(tile_type_to_db(tile.tile_type))
                .bind(tile.elevation)
                .bind(tile.temperature)
                .bind(tile.precipitation)
                .bind(biome_kind_to_db(tile.biome))
                .bind(i32::from(tile.food_quality))
                .bind(i32::from(tile.water_quality))
                .bind(i32::from(tile.wood_quality))
                .bind(i32::from(tile.stone_quality))
                .bind(i32::from(tile.ore_quality))
                .bind(&tile.special_resource)
                .bind(i32::from(tile.plot_slots))
                .bind(tile.base_production_modifier)
                .bind(tile.settlement_id.map(uuid::Uuid::from))
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await?;
        }

        Ok(())
    }

    /// Fetch every tile in a region, ordered by `(y, x)` (`TilesByRegion`).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn tiles_by_region(&self, region_id: RegionId) -> Result<Vec<Tile>, DbError> {
        let rows = sqlx::query_as::<_, TileRow>(
            r"SELECT id, region_id, x, y, tile_type::TEXT as tile_type, elevation, temperature,
                     precipitation, biome::TEXT as biome, food_quality, water_quality, wood_quality,
                     stone_quality, ore_quality, special_resource, plot_slots,
                     base_production_modifier, settlement_id
              FROM tiles WHERE region_id = $1 ORDER BY y, x",
        )
        .bind(region_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TileRow::into_tile).collect()
    }

    /// Bind a settlement to a tile (at most one settlement per
    /// tile, enforced by a unique index on `settlement_id` in the schema).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn bind_settlement_to_tile(
        &self,
        tile_id: TileId,
        settlement_id: Uuid,
    ) -> Result<(), DbError> {
        sqlx::query(r"UPDATE tiles SET settlement_id = $2 WHERE id = $1")
            .bind(tile_id.into_inner())
            .bind(settlement_id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Fetch a single tile by id, for resolving a structure's or
    /// settlement's production inputs (quality, biome) at tick time.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the tile doesn't exist, or
    /// [`DbError::Postgres`] if the query fails.
    pub async fn get_tile(&self, tile_id: TileId) -> Result<Tile, DbError> {
        let row = sqlx::query_as::<_, TileRow>(
            r"SELECT id, region_id, x, y, tile_type::TEXT as tile_type, elevation, temperature,
                     precipitation, biome::TEXT as biome, food_quality, water_quality, wood_quality,
                     stone_quality, ore_quality, special_resource, plot_slots,
                     base_production_modifier, settlement_id
              FROM tiles WHERE id = $1",
        )
        .bind(tile_id.into_inner())
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("tile {tile_id}")))?;

        row.into_tile()
    }

    /// Resolve a tile to the world it belongs to, via its region, for
    /// the event-channel session resolver (settlement -> tile -> world).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the tile doesn't exist, or
    /// [`DbError::Postgres`] if the query fails.
    pub async fn world_id_for_tile(&self, tile_id: TileId) -> Result<WorldId, DbError> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r"SELECT r.world_id FROM tiles t JOIN regions r ON r.id = t.region_id WHERE t.id = $1",
        )
        .bind(tile_id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        row.map(|(id,)| WorldId::from(id))
            .ok_or_else(|| DbError::NotFound(format!("tile {tile_id}")))
    }

    /// Seed the fixed biome definition table.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn seed_biomes(&self, biomes: &[Biome]) -> Result<(), DbError> {
        for biome in biomes {
            let modifiers = serde_json::to_value(&biome.resource_modifiers)?;
            sqlx::query(
                r"INSERT INTO biomes
                  (id, kind, precipitation_min, precipitation_max, temperature_min, temperature_max,
                   resource_modifiers, plot_slots_min, plot_slots_max)
                  VALUES ($1, $2::biome_kind, $3, $4, $5, $6, $7, $8, $9)
                  ON CONFLICT (kind) DO NOTHING",
            )
            .bind(biome.id.into_inner())
            .bind(biome_kind_to_db(biome.kind))
            .bind(biome.precipitation_min)
            .bind(biome.precipitation_max)
            .bind(biome.temperature_min)
            .bind(biome.temperature_max)
            .bind(modifiers)
            .bind(i32::from(biome.plot_slots_min))
            .bind(i32::from(biome.plot_slots_max))
            .execute(self.pool)
            .await?;
        }

        Ok(())
    }

    /// Fetch every seeded biome definition.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn all_biomes(&self) -> Result<Vec<Biome>, DbError> {
        let rows = sqlx::query_as::<_, BiomeRow>(
            r"SELECT id, kind::TEXT as kind, precipitation_min, precipitation_max,
                     temperature_min, temperature_max, resource_modifiers, plot_slots_min, plot_slots_max
              FROM biomes",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(BiomeRow::into_biome).collect()
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct WorldRow {
    id: Uuid,
    server_id: Uuid,
    name: String,
    status: String,
    failure_reason: Option<String>,
    noise_bundles: serde_json::Value,
    template: serde_json::Value,
    width_regions: i64,
    height_regions: i64,
    created_at: DateTime<Utc>,
}

impl WorldRow {
    fn into_world(self) -> Result<World, DbError> {
        let (elevation_noise, precipitation_noise, temperature_noise): (
            NoiseBundle,
            NoiseBundle,
            NoiseBundle,
        ) = serde_json::from_value(self.noise_bundles)?;
        let template: TemplateConfig = serde_json::from_value(self.template)?;

        Ok(World {
            id: WorldId::from(self.id),
            server_id: ServerId::from(self.server_id),
            name: self.name,
            status: world_status_from_db(&self.status),
            failure_reason: self.failure_reason,
            elevation_noise,
            precipitation_noise,
            temperature_noise,
            width_regions: u32::try_from(self.width_regions).unwrap_or(0),
            height_regions: u32::try_from(self.height_regions).unwrap_or(0),
            template,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct TileRow {
    id: Uuid,
    region_id: Uuid,
    x: i64,
    y: i64,
    tile_type: String,
    elevation: f64,
    temperature: f64,
    precipitation: f64,
    biome: String,
    food_quality: i32,
    water_quality: i32,
    wood_quality: i32,
    stone_quality: i32,
    ore_quality: i32,
    special_resource: Option<String>,
    plot_slots: i32,
    base_production_modifier: Decimal,
    settlement_id: Option<Uuid>,
}

impl TileRow {
    fn into_tile(self) -> Result<Tile, DbError> {
        Ok(Tile {
            id: TileId::from(self.id),
            region_id: RegionId::from(self.region_id),
            x: u32::try_from(self.x).unwrap_or(0),
            y: u32::try_from(self.y).unwrap_or(0),
            tile_type: tile_type_from_db(&self.tile_type),
            elevation: self.elevation,
            temperature: self.temperature,
            precipitation: self.precipitation,
            biome: biome_kind_from_db(&self.biome),
            food_quality: u8::try_from(self.food_quality).unwrap_or(0),
            water_quality: u8::try_from(self.water_quality).unwrap_or(0),
            wood_quality: u8::try_from(self.wood_quality).unwrap_or(0),
            stone_quality: u8::try_from(self.stone_quality).unwrap_or(0),
            ore_quality: u8::try_from(self.ore_quality).unwrap_or(0),
            special_resource: self.special_resource,
            plot_slots: u8::try_from(self.plot_slots).unwrap_or(0),
            base_production_modifier: self.base_production_modifier,
            settlement_id: self.settlement_id.map(settlement_types::SettlementId::from),
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct BiomeRow {
    id: Uuid,
    kind: String,
    precipitation_min: f64,
    precipitation_max: f64,
    temperature_min: f64,
    temperature_max: f64,
    resource_modifiers: serde_json::Value,
    plot_slots_min: i32,
    plot_slots_max: i32,
}

impl BiomeRow {
    fn into_biome(self) -> Result<Biome, DbError> {
        let resource_modifiers: BTreeMap<Resource, Decimal> =
            serde_json::from_value(self.resource_modifiers)?;

        Ok(Biome {
            id: BiomeId::from(self.id),
            kind: biome_kind_from_db(&self.kind),
            precipitation_min: self.precipitation_min,
            precipitation_max: self.precipitation_max,
            temperature_min: self.temperature_min,
            temperature_max: self.temperature_max,
            resource_modifiers,
            plot_slots_min: u8::try_from(self.plot_slots_min).unwrap_or(0),
            plot_slots_max: u8::try_from(self.plot_slots_max).unwrap_or(0),
        })
    }
}

const fn world_status_to_db(status: WorldStatus) -> &'static str {
    match status {
        WorldStatus::Generating => "generating",
        WorldStatus::Ready => "ready",
        WorldStatus::Failed => "failed",
    }
}

fn world_status_from_db(value: &str) -> WorldStatus {
    match value {
        "ready" => WorldStatus::Ready,
        "failed" => WorldStatus::Failed,
        _ => WorldStatus::Generating,
    }
}

const fn tile_type_to_db(tile_type: TileType) -> &'static str {
    match tile_type {
        TileType::Ocean => "ocean",
        TileType::Land => "land",
    }
}

fn tile_type_from_db(value: &str) -> TileType {
    match value {
        "land" => TileType::Land,
        _ => TileType::Ocean,
    }
}

const fn biome_kind_to_db(kind: BiomeKind) -> &'static str {
    match kind {
        BiomeKind::Grassland => "grassland",
        BiomeKind::Forest => "forest",
        BiomeKind::Desert => "desert",
        BiomeKind::Mountain => "mountain",
        BiomeKind::Tundra => "tundra",
        BiomeKind::Swamp => "swamp",
        BiomeKind::Coastal => "coastal",
        BiomeKind::Ocean => "ocean",
    }
}

fn biome_kind_from_db(value: &str) -> BiomeKind {
    match value {
        "forest" => BiomeKind::Forest,
        "desert" => BiomeKind::Desert,
        "mountain" => BiomeKind::Mountain,
        "tundra" => BiomeKind::Tundra,
        "swamp" => BiomeKind::Swamp,
        "coastal" => BiomeKind::Coastal,
        "ocean" => BiomeKind::Ocean,
        _ => BiomeKind::Grassland,
    }
}
