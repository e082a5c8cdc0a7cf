//! Settlement, storage, and population persistence.
//!
//! The tick driver's per-tick fan-out loads every settlement bound to a
//! ready world (`dirty_settlements`) rather than the whole table, since a
//! world may outlive settlements abandoned long ago.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use settlement_types::{
    ProfileId, Resource, ResourceAmounts, Settlement, SettlementId, SettlementPopulation,
    SettlementStorage, SettlementTier, TileId, WorldId,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Operations on the `settlements`, `settlement_storage`, and
/// `settlement_population` tables.
pub struct SettlementStore<'a> {
    pool: &'a PgPool,
}

impl<'a> SettlementStore<'a> {
    /// Create a new settlement store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a newly founded settlement along with its initial storage and
    /// population rows, in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn found_settlement(
        &self,
        settlement: &Settlement,
        storage: &SettlementStorage,
        population: &SettlementPopulation,
    ) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"INSERT INTO settlements
              (id, owner_profile_id, tile_id, name, tier, resilience, errored, updated_at, created_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(settlement.id.into_inner())
        .bind(settlement.owner_profile_id.into_inner())
        .bind(settlement.tile_id.into_inner())
        .bind(&settlement.name)
        .bind(i32::from(settlement.tier.as_level()))
        .bind(i32::from(settlement.resilience))
        .bind(settlement.errored)
        .bind(settlement.updated_at)
        .bind(settlement.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"INSERT INTO settlement_storage (settlement_id, amounts, capacity, updated_at)
              VALUES ($1, $2, $3, $4)",
        )
        .bind(storage.settlement_id.into_inner())
        .bind(serde_json::to_value(&storage.amounts)?)
        .bind(serde_json::to_value(&storage.capacity)?)
        .bind(storage.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"INSERT INTO settlement_population
              (settlement_id, current, happiness, last_growth_at, trauma_ticks_remaining)
              VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(population.settlement_id.into_inner())
        .bind(i64::from(population.current))
        .bind(i32::from(population.happiness))
        .bind(population.last_growth_at)
        .bind(i64::from(population.trauma_ticks_remaining))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Fetch a single settlement by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no such settlement exists, or
    /// [`DbError::Postgres`] if the query fails.
    pub async fn get_settlement(&self, settlement_id: SettlementId) -> Result<Settlement, DbError> {
        let row = sqlx::query_as::<_, SettlementRow>(
            r"SELECT id, owner_profile_id, tile_id, name, tier, resilience,
                     errored, updated_at, created_at
              FROM settlements WHERE id = $1",
        )
        .bind(settlement_id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        row.map(SettlementRow::into_settlement)
            .ok_or_else(|| DbError::NotFound(format!("settlement {settlement_id}")))
    }

    /// Fetch the settlement owned by a profile, for resolving a
    /// `join-world` event-channel session to its settlement.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the profile owns no settlement, or
    /// [`DbError::Postgres`] if the query fails.
    pub async fn settlement_by_owner(&self, owner_profile_id: ProfileId) -> Result<Settlement, DbError> {
        let row = sqlx::query_as::<_, SettlementRow>(
            r"SELECT id, owner_profile_id, tile_id, name, tier, resilience,
                     errored, updated_at, created_at
              FROM settlements WHERE owner_profile_id = $1",
        )
        .bind(owner_profile_id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        row.map(SettlementRow::into_settlement)
            .ok_or_else(|| DbError::NotFound(format!("settlement owned by {owner_profile_id}")))
    }

    /// Load every settlement bound to a world whose status is `READY`,
    /// for the tick driver's per-tick fan-out.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn dirty_settlements(&self, world_id: WorldId) -> Result<Vec<Settlement>, DbError> {
        let rows = sqlx::query_as::<_, SettlementRow>(
            r"SELECT s.id, s.owner_profile_id, s.tile_id, s.name, s.tier, s.resilience,
                     s.errored, s.updated_at, s.created_at
              FROM settlements s
              JOIN tiles t ON t.id = s.tile_id
              JOIN regions r ON r.id = t.region_id
              WHERE r.world_id = $1
              ORDER BY s.created_at",
        )
        .bind(world_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(SettlementRow::into_settlement).collect())
    }

    /// Fetch a settlement's storage.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no such row exists, or
    /// [`DbError::Postgres`] if the query fails.
    pub async fn get_storage(
        &self,
        settlement_id: SettlementId,
    ) -> Result<SettlementStorage, DbError> {
        let row = sqlx::query_as::<_, StorageRow>(
            r"SELECT settlement_id, amounts, capacity, updated_at
              FROM settlement_storage WHERE settlement_id = $1",
        )
        .bind(settlement_id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        row.map(StorageRow::into_storage)
            .transpose()?
            .ok_or_else(|| DbError::NotFound(format!("settlement_storage {settlement_id}")))
    }

    /// Replace a settlement's storage amounts, e.g. after a tick's
    /// production/consumption/waste has been applied.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn update_storage(
        &self,
        settlement_id: SettlementId,
        amounts: &ResourceAmounts,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"UPDATE settlement_storage SET amounts = $2, updated_at = $3 WHERE settlement_id = $1",
        )
        .bind(settlement_id.into_inner())
        .bind(serde_json::to_value(amounts)?)
        .bind(updated_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Fetch a settlement's population state.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no such row exists, or
    /// [`DbError::Postgres`] if the query fails.
    pub async fn get_population(
        &self,
        settlement_id: SettlementId,
    ) -> Result<SettlementPopulation, DbError> {
        let row = sqlx::query_as::<_, PopulationRow>(
            r"SELECT settlement_id, current, happiness, last_growth_at, trauma_ticks_remaining
              FROM settlement_population WHERE settlement_id = $1",
        )
        .bind(settlement_id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        row.map(PopulationRow::into_population)
            .ok_or_else(|| DbError::NotFound(format!("settlement_population {settlement_id}")))
    }

    /// Persist an updated population state.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn update_population(
        &self,
        population: &SettlementPopulation,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"UPDATE settlement_population
              SET current = $2, happiness = $3, last_growth_at = $4, trauma_ticks_remaining = $5
              WHERE settlement_id = $1",
        )
        .bind(population.settlement_id.into_inner())
        .bind(i64::from(population.current))
        .bind(i32::from(population.happiness))
        .bind(population.last_growth_at)
        .bind(i64::from(population.trauma_ticks_remaining))
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Mark a settlement `errored`, skipping it for one tick after a panic
    /// during its per-tick processing.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn set_errored(&self, settlement_id: SettlementId, errored: bool) -> Result<(), DbError> {
        sqlx::query(r"UPDATE settlements SET errored = $2 WHERE id = $1")
            .bind(settlement_id.into_inner())
            .bind(errored)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Update a settlement's tier and resilience, with optimistic
    /// concurrency on `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn update_tier_and_resilience(
        &self,
        settlement_id: SettlementId,
        tier: SettlementTier,
        resilience: u8,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"UPDATE settlements SET tier = $2, resilience = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(settlement_id.into_inner())
        .bind(i32::from(tier.as_level()))
        .bind(i32::from(resilience))
        .bind(updated_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct SettlementRow {
    id: Uuid,
    owner_profile_id: Uuid,
    tile_id: Uuid,
    name: String,
    tier: i32,
    resilience: i32,
    errored: bool,
    updated_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl SettlementRow {
    fn into_settlement(self) -> Settlement {
        Settlement {
            id: SettlementId::from(self.id),
            owner_profile_id: ProfileId::from(self.owner_profile_id),
            tile_id: TileId::from(self.tile_id),
            name: self.name,
            tier: tier_from_level(self.tier),
            resilience: u8::try_from(self.resilience).unwrap_or(0),
            errored: self.errored,
            updated_at: self.updated_at,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct StorageRow {
    settlement_id: Uuid,
    amounts: serde_json::Value,
    capacity: serde_json::Value,
    updated_at: DateTime<Utc>,
}

impl StorageRow {
    fn into_storage(self) -> Result<SettlementStorage, DbError> {
        let amounts: BTreeMap<Resource, u32> = serde_json::from_value(self.amounts)?;
        let capacity: BTreeMap<Resource, u32> = serde_json::from_value(self.capacity)?;

        Ok(SettlementStorage {
            settlement_id: SettlementId::from(self.settlement_id),
            amounts,
            capacity,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct PopulationRow {
    settlement_id: Uuid,
    current: i64,
    happiness: i32,
    last_growth_at: DateTime<Utc>,
    trauma_ticks_remaining: i64,
}

impl PopulationRow {
    fn into_population(self) -> SettlementPopulation {
        SettlementPopulation {
            settlement_id: SettlementId::from(self.settlement_id),
            current: u32::try_from(self.current).unwrap_or(0),
            happiness: u8::try_from(self.happiness).unwrap_or(0),
            last_growth_at: self.last_growth_at,
            trauma_ticks_remaining: u32::try_from(self.trauma_ticks_remaining).unwrap_or(0),
        }
    }
}

fn tier_from_level(level: i32) -> SettlementTier {
    match level {
        2 => SettlementTier::Village,
        3 => SettlementTier::Town,
        4 => SettlementTier::City,
        _ => SettlementTier::Outpost,
    }
}
