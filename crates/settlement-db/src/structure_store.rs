//! Structure definition, instance, and modifier persistence.
//!
//! Definitions and their requirement/prerequisite rows are seeded once at
//! startup and read-only thereafter; instances and modifier caches mutate
//! on every Build/Upgrade/Demolish/Damage/Repair operation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use settlement_types::{
    ModifierContribution, ModifierId, Resource, SettlementId, SettlementModifier, StructureCategory,
    StructureDef, StructureDefId, StructureId, StructureKind, StructurePrerequisite,
    StructureRequirement, SettlementStructure, TileId,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Operations on the structure definition, instance, and modifier tables.
pub struct StructureStore<'a> {
    pool: &'a PgPool,
}

impl<'a> StructureStore<'a> {
    /// Create a new structure store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Seed a structure definition and its requirement/prerequisite rows.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn seed_structure_def(
        &self,
        def: &StructureDef,
        requirements: &[StructureRequirement],
        prerequisites: &[StructurePrerequisite],
    ) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"INSERT INTO structure_defs
              (id, kind, category, tier, max_level, construction_time_seconds, population_required,
               area_cost, unique_per_settlement, min_town_hall_level)
              VALUES ($1, $2::structure_kind, $3::structure_category, $4, $5, $6, $7, $8, $9, $10)
              ON CONFLICT (kind) DO NOTHING",
        )
        .bind(def.id.into_inner())
        .bind(structure_kind_to_db(def.kind))
        .bind(structure_category_to_db(def.category))
        .bind(i32::from(def.tier))
        .bind(i32::from(def.max_level))
        .bind(i64::from(def.construction_time_seconds))
        .bind(i64::from(def.population_required))
        .bind(i64::from(def.area_cost))
        .bind(def.unique_per_settlement)
        .bind(i32::from(def.min_town_hall_level))
        .execute(&mut *tx)
        .await?;

        for req in requirements {
            sqlx::query(
                r"INSERT INTO structure_requirements (structure_def_id, resource, quantity)
                  VALUES ($1, $2::resource, $3)
                  ON CONFLICT DO NOTHING",
            )
            .bind(req.structure_def_id.into_inner())
            .bind(resource_to_db(req.resource))
            .bind(i64::from(req.quantity))
            .execute(&mut *tx)
            .await?;
        }

        for prereq in prerequisites {
            sqlx::query(
                r"INSERT INTO structure_prerequisites (structure_def_id, required_structure, required_level)
                  VALUES ($1, $2::structure_kind, $3)
                  ON CONFLICT DO NOTHING",
            )
            .bind(prereq.structure_def_id.into_inner())
            .bind(prereq.required_structure.map(structure_kind_to_db))
            .bind(i32::from(prereq.required_level))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Fetch every seeded structure definition.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn all_structure_defs(&self) -> Result<Vec<StructureDef>, DbError> {
        let rows = sqlx::query_as::<_, StructureDefRow>(
            r"SELECT id, kind::TEXT as kind, category::TEXT as category, tier, max_level,
                     construction_time_seconds, population_required, area_cost,
                     unique_per_settlement, min_town_hall_level
              FROM structure_defs",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(StructureDefRow::into_def).collect())
    }

    /// Fetch a definition's base resource requirements.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn requirements_for(
        &self,
        def_id: StructureDefId,
    ) -> Result<Vec<StructureRequirement>, DbError> {
        let rows = sqlx::query_as::<_, RequirementRow>(
            r"SELECT structure_def_id, resource::TEXT as resource, quantity
              FROM structure_requirements WHERE structure_def_id = $1",
        )
        .bind(def_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(RequirementRow::into_requirement).collect())
    }

    /// Fetch a definition's prerequisite structures.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn prerequisites_for(
        &self,
        def_id: StructureDefId,
    ) -> Result<Vec<StructurePrerequisite>, DbError> {
        let rows = sqlx::query_as::<_, PrerequisiteRow>(
            r"SELECT structure_def_id, required_structure::TEXT as required_structure, required_level
              FROM structure_prerequisites WHERE structure_def_id = $1",
        )
        .bind(def_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(PrerequisiteRow::into_prerequisite).collect())
    }

    /// Insert a newly built structure instance.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails (e.g. the
    /// `(tile_id, slot_position)` uniqueness constraint).
    pub async fn insert_structure(&self, structure: &SettlementStructure) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO settlement_structures
              (id, settlement_id, kind, level, health, population_assigned, tile_id, slot_position,
               damaged_at, repaired_at, updated_at, created_at)
              VALUES ($1, $2, $3::structure_kind, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(structure.id.into_inner())
        .bind(structure.settlement_id.into_inner())
        .bind(structure_kind_to_db(structure.kind))
        .bind(i32::from(structure.level))
        .bind(i32::from(structure.health))
        .bind(i64::from(structure.population_assigned))
        .bind(structure.tile_id.map(uuid::Uuid::from))
        .bind(structure.slot_position.map(i32::from))
        .bind(structure.damaged_at)
        .bind(structure.repaired_at)
        .bind(structure.updated_at)
        .bind(structure.created_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Persist in-place mutations to a structure instance (level, health,
    /// population assignment, damage/repair timestamps).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn update_structure(&self, structure: &SettlementStructure) -> Result<(), DbError> {
        sqlx::query(
            r"UPDATE settlement_structures
              SET level = $2, health = $3, population_assigned = $4, damaged_at = $5,
                  repaired_at = $6, updated_at = $7
              WHERE id = $1",
        )
        .bind(structure.id.into_inner())
        .bind(i32::from(structure.level))
        .bind(i32::from(structure.health))
        .bind(i64::from(structure.population_assigned))
        .bind(structure.damaged_at)
        .bind(structure.repaired_at)
        .bind(structure.updated_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Delete a demolished or destroyed structure instance.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete_structure(&self, structure_id: StructureId) -> Result<(), DbError> {
        sqlx::query(r"DELETE FROM settlement_structures WHERE id = $1")
            .bind(structure_id.into_inner())
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Fetch a single structure instance by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no such structure exists, or
    /// [`DbError::Postgres`] if the query fails.
    pub async fn get_structure(
        &self,
        structure_id: StructureId,
    ) -> Result<SettlementStructure, DbError> {
        let row = sqlx::query_as::<_, StructureRow>(
            r"SELECT id, settlement_id, kind::TEXT as kind, level, health, population_assigned,
                     tile_id, slot_position, damaged_at, repaired_at, updated_at, created_at
              FROM settlement_structures WHERE id = $1",
        )
        .bind(structure_id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        row.map(StructureRow::into_structure)
            .ok_or_else(|| DbError::NotFound(format!("settlement_structure {structure_id}")))
    }

    /// Fetch every structure belonging to a settlement.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn structures_by_settlement(
        &self,
        settlement_id: SettlementId,
    ) -> Result<Vec<SettlementStructure>, DbError> {
        let rows = sqlx::query_as::<_, StructureRow>(
            r"SELECT id, settlement_id, kind::TEXT as kind, level, health, population_assigned,
                     tile_id, slot_position, damaged_at, repaired_at, updated_at, created_at
              FROM settlement_structures WHERE settlement_id = $1
              ORDER BY created_at",
        )
        .bind(settlement_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(StructureRow::into_structure).collect())
    }

    /// Upsert a settlement's cached modifier aggregate, recomputed and
    /// overwritten on every structure mutation.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the upsert fails.
    pub async fn upsert_modifier(&self, modifier: &SettlementModifier) -> Result<(), DbError> {
        let contributions = serde_json::to_value(&modifier.contributing_structures)?;

        sqlx::query(
            r"INSERT INTO settlement_modifiers
              (id, settlement_id, modifier_type, total_value, source_count, contributing_structures, last_calculated_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7)
              ON CONFLICT (settlement_id, modifier_type) DO UPDATE SET
                total_value = EXCLUDED.total_value,
                source_count = EXCLUDED.source_count,
                contributing_structures = EXCLUDED.contributing_structures,
                last_calculated_at = EXCLUDED.last_calculated_at",
        )
        .bind(modifier.id.into_inner())
        .bind(modifier.settlement_id.into_inner())
        .bind(&modifier.modifier_type)
        .bind(modifier.total_value)
        .bind(i64::from(modifier.source_count))
        .bind(contributions)
        .bind(modifier.last_calculated_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Fetch all cached modifier aggregates for a settlement.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn modifiers_for_settlement(
        &self,
        settlement_id: SettlementId,
    ) -> Result<Vec<SettlementModifier>, DbError> {
        let rows = sqlx::query_as::<_, ModifierRow>(
            r"SELECT id, settlement_id, modifier_type, total_value, source_count,
                     contributing_structures, last_calculated_at
              FROM settlement_modifiers WHERE settlement_id = $1",
        )
        .bind(settlement_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(ModifierRow::into_modifier).collect()
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct StructureDefRow {
    id: Uuid,
    kind: String,
    category: String,
    tier: i32,
    max_level: i32,
    construction_time_seconds: i64,
    population_required: i64,
    area_cost: i64,
    unique_per_settlement: bool,
    min_town_hall_level: i32,
}

impl StructureDefRow {
    fn into_def(self) -> StructureDef {
        StructureDef {
            id: StructureDefId::from(self.id),
            kind: structure_kind_from_db(&self.kind),
            category: structure_category_from_db(&self.category),
            tier: u8::try_from(self.tier).unwrap_or(1),
            max_level: u8::try_from(self.max_level).unwrap_or(1),
            construction_time_seconds: u32::try_from(self.construction_time_seconds).unwrap_or(0),
            population_required: u32::try_from(self.population_required).unwrap_or(0),
            area_cost: u32::try_from(self.area_cost).unwrap_or(0),
            unique_per_settlement: self.unique_per_settlement,
            min_town_hall_level: u8::try_from(self.min_town_hall_level).unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct RequirementRow {
    structure_def_id: Uuid,
    resource: String,
    quantity: i64,
}

impl RequirementRow {
    fn into_requirement(self) -> StructureRequirement {
        StructureRequirement {
            structure_def_id: StructureDefId::from(self.structure_def_id),
            resource: resource_from_db(&self.resource),
            quantity: u32::try_from(self.quantity).unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct PrerequisiteRow {
    structure_def_id: Uuid,
    required_structure: Option<String>,
    required_level: i32,
}

impl PrerequisiteRow {
    fn into_prerequisite(self) -> StructurePrerequisite {
        StructurePrerequisite {
            structure_def_id: StructureDefId::from(self.structure_def_id),
            required_structure: self.required_structure.as_deref().map(structure_kind_from_db),
            required_level: u8::try_from(self.required_level).unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct StructureRow {
    id: Uuid,
    settlement_id: Uuid,
    kind: String,
    level: i32,
    health: i32,
    population_assigned: i64,
    tile_id: Option<Uuid>,
    slot_position: Option<i32>,
    damaged_at: Option<DateTime<Utc>>,
    repaired_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl StructureRow {
    fn into_structure(self) -> SettlementStructure {
        SettlementStructure {
            id: StructureId::from(self.id),
            settlement_id: SettlementId::from(self.settlement_id),
            kind: structure_kind_from_db(&self.kind),
            level: u8::try_from(self.level).unwrap_or(1),
            health: u8::try_from(self.health).unwrap_or(0),
            population_assigned: u32::try_from(self.population_assigned).unwrap_or(0),
            tile_id: self.tile_id.map(TileId::from),
            slot_position: self.slot_position.map(|p| u8::try_from(p).unwrap_or(0)),
            damaged_at: self.damaged_at,
            repaired_at: self.repaired_at,
            updated_at: self.updated_at,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ModifierRow {
    id: Uuid,
    settlement_id: Uuid,
    modifier_type: String,
    total_value: Decimal,
    source_count: i64,
    contributing_structures: serde_json::Value,
    last_calculated_at: DateTime<Utc>,
}

impl ModifierRow {
    fn into_modifier(self) -> Result<SettlementModifier, DbError> {
        let contributing_structures: Vec<ModifierContribution> =
            serde_json::from_value(self.contributing_structures)?;

        Ok(SettlementModifier {
            id: ModifierId::from(self.id),
            settlement_id: SettlementId::from(self.settlement_id),
            modifier_type: self.modifier_type,
            total_value: self.total_value,
            source_count: u32::try_from(self.source_count).unwrap_or(0),
            contributing_structures,
            last_calculated_at: self.last_calculated_at,
        })
    }
}

const fn structure_kind_to_db(kind: StructureKind) -> &'static str {
    match kind {
        StructureKind::Farm => "farm",
        StructureKind::Well => "well",
        StructureKind::LumberCamp => "lumber_camp",
        StructureKind::Quarry => "quarry",
        StructureKind::Mine => "mine",
        StructureKind::TownHall => "town_hall",
        StructureKind::House => "house",
        StructureKind::Warehouse => "warehouse",
        StructureKind::Workshop => "workshop",
        StructureKind::Shelter => "shelter",
        StructureKind::Wall => "wall",
    }
}

fn structure_kind_from_db(value: &str) -> StructureKind {
    match value {
        "well" => StructureKind::Well,
        "lumber_camp" => StructureKind::LumberCamp,
        "quarry" => StructureKind::Quarry,
        "mine" => StructureKind::Mine,
        "town_hall" => StructureKind::TownHall,
        "house" => StructureKind::House,
        "warehouse" => StructureKind::Warehouse,
        "workshop" => StructureKind::Workshop,
        "shelter" => StructureKind::Shelter,
        "wall" => StructureKind::Wall,
        _ => StructureKind::Farm,
    }
}

const fn structure_category_to_db(category: StructureCategory) -> &'static str {
    match category {
        StructureCategory::Extractor => "extractor",
        StructureCategory::Building => "building",
    }
}

fn structure_category_from_db(value: &str) -> StructureCategory {
    match value {
        "building" => StructureCategory::Building,
        _ => StructureCategory::Extractor,
    }
}

const fn resource_to_db(resource: Resource) -> &'static str {
    match resource {
        Resource::Food => "food",
        Resource::Water => "water",
        Resource::Wood => "wood",
        Resource::Stone => "stone",
        Resource::Ore => "ore",
    }
}

fn resource_from_db(value: &str) -> Resource {
    match value {
        "water" => Resource::Water,
        "wood" => Resource::Wood,
        "stone" => Resource::Stone,
        "ore" => Resource::Ore,
        _ => Resource::Food,
    }
}
