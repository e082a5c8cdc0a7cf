//! Construction queue persistence.
//!
//! A settlement's queue is small (at most 10 non-terminal entries) so
//! `active_by_settlement` and `queue_for_settlement` simply load the
//! whole thing rather than paginating.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use settlement_types::{
    ConstructionId, ConstructionQueueEntry, ConstructionStatus, Resource, SettlementId,
    StructureKind,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Operations on the `construction_queue` table.
pub struct ConstructionStore<'a> {
    pool: &'a PgPool,
}

impl<'a> ConstructionStore<'a> {
    /// Create a new construction store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Enqueue a new construction entry.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn enqueue(&self, entry: &ConstructionQueueEntry) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO construction_queue
              (id, settlement_id, structure_kind, resources_cost, status, position, is_emergency,
               started_at, completes_at, created_at)
              VALUES ($1, $2, $3::structure_kind, $4, $5::construction_status, $6, $7, $8, $9, $10)",
        )
        .bind(entry.id.into_inner())
        .bind(entry.settlement_id.into_inner())
        .bind(structure_kind_to_db(entry.structure_kind))
        .bind(serde_json::to_value(&entry.resources_cost)?)
        .bind(construction_status_to_db(entry.status))
        .bind(i32::from(entry.position))
        .bind(entry.is_emergency)
        .bind(entry.started_at)
        .bind(entry.completes_at)
        .bind(entry.created_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Persist status/position/timing changes to an entry (dequeue,
    /// completion, cancellation, or reordering after a removal).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn update_entry(&self, entry: &ConstructionQueueEntry) -> Result<(), DbError> {
        sqlx::query(
            r"UPDATE construction_queue
              SET status = $2::construction_status, position = $3, started_at = $4, completes_at = $5
              WHERE id = $1",
        )
        .bind(entry.id.into_inner())
        .bind(construction_status_to_db(entry.status))
        .bind(i32::from(entry.position))
        .bind(entry.started_at)
        .bind(entry.completes_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Fetch a settlement's full queue (all statuses), ordered by position
    /// (`position` is a permutation of `0..n-1`).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn queue_for_settlement(
        &self,
        settlement_id: SettlementId,
    ) -> Result<Vec<ConstructionQueueEntry>, DbError> {
        let rows = sqlx::query_as::<_, ConstructionRow>(
            r"SELECT id, settlement_id, structure_kind::TEXT as structure_kind, resources_cost,
                     status::TEXT as status, position, is_emergency, started_at, completes_at, created_at
              FROM construction_queue WHERE settlement_id = $1
              ORDER BY position",
        )
        .bind(settlement_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(ConstructionRow::into_entry).collect()
    }

    /// Fetch every non-terminal (QUEUED/IN_PROGRESS) entry across a world's
    /// settlements, for the tick driver's construction phase, joined per
    /// settlement upstream.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn active_for_settlement(
        &self,
        settlement_id: SettlementId,
    ) -> Result<Vec<ConstructionQueueEntry>, DbError> {
        let rows = sqlx::query_as::<_, ConstructionRow>(
            r"SELECT id, settlement_id, structure_kind::TEXT as structure_kind, resources_cost,
                     status::TEXT as status, position, is_emergency, started_at, completes_at, created_at
              FROM construction_queue
              WHERE settlement_id = $1 AND status IN ('queued', 'in_progress')
              ORDER BY position",
        )
        .bind(settlement_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(ConstructionRow::into_entry).collect()
    }

    /// Delete a terminal (complete/cancelled) entry once it has been
    /// folded into settlement state and no longer needs a queue slot.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete_entry(&self, entry_id: ConstructionId) -> Result<(), DbError> {
        sqlx::query(r"DELETE FROM construction_queue WHERE id = $1")
            .bind(entry_id.into_inner())
            .execute(self.pool)
            .await?;

        Ok(())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ConstructionRow {
    id: Uuid,
    settlement_id: Uuid,
    structure_kind: String,
    resources_cost: serde_json::Value,
    status: String,
    position: i32,
    is_emergency: bool,
    started_at: Option<DateTime<Utc>>,
    completes_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl ConstructionRow {
    fn into_entry(self) -> Result<ConstructionQueueEntry, DbError> {
        let resources_cost: BTreeMap<Resource, u32> = serde_json::from_value(self.resources_cost)?;

        Ok(ConstructionQueueEntry {
            id: ConstructionId::from(self.id),
            settlement_id: SettlementId::from(self.settlement_id),
            structure_kind: structure_kind_from_db(&self.structure_kind),
            resources_cost,
            status: construction_status_from_db(&self.status),
            position: u8::try_from(self.position).unwrap_or(0),
            is_emergency: self.is_emergency,
            started_at: self.started_at,
            completes_at: self.completes_at,
            created_at: self.created_at,
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

const fn construction_status_to_db(status: ConstructionStatus) -> &'static str {
    match status {
        ConstructionStatus::Queued => "queued",
        ConstructionStatus::InProgress => "in_progress",
        ConstructionStatus::Complete => "complete",
        ConstructionStatus::Cancelled => "cancelled",
    }
}

fn construction_status_from_db(value: &str) -> ConstructionStatus {
    match value {
        "in_progress" => ConstructionStatus::InProgress,
        "complete" => ConstructionStatus::Complete,
        "cancelled" => ConstructionStatus::Cancelled,
        _ => ConstructionStatus::Queued,
    }
}
