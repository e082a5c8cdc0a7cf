//! Ledger audit trail persistence.
//!
//! Every [`LedgerEntry`] produced during a tick is batch-inserted here so
//! the conservation check () can be re-run against durable
//! history and so disputes over a settlement's resource history can be
//! resolved from the audit trail rather than trusted to memory.

use settlement_types::{EntityType, LedgerEntry, LedgerEntryType, Resource};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Default batch size for ledger entry inserts.
const DEFAULT_BATCH_SIZE: usize = 200;

/// Operations on the `ledger_entries` table.
pub struct LedgerStore<'a> {
    pool: &'a PgPool,
    batch_size: usize,
}

impl<'a> LedgerStore<'a> {
    /// Create a new ledger store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the batch size for inserts.
    #[must_use]
    pub const fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Batch-insert ledger entries, typically all entries produced during a
    /// single tick's commit.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if any batch fails to insert; batches
    /// already committed are not rolled back.
    pub async fn batch_insert(&self, entries: &[LedgerEntry]) -> Result<(), DbError> {
        if entries.is_empty() {
            return Ok(());
        }

        for chunk in entries.chunks(self.batch_size) {
            let mut tx = self.pool.begin().await?;

            for entry in chunk {
                let tick_i64 = i64::try_from(entry.tick).unwrap_or(i64::MAX);

                sqlx::query(
                    r"INSERT INTO ledger_entries
                      (id, tick, entry_type, from_entity, from_entity_type, to_entity, to_entity_type, resource, quantity, reason, reference_id, created_at)
                      VALUES ($1, $2, $3::ledger_entry_type, $4, $5::entity_type, $6, $7::entity_type, $8::resource, $9, $10, $11, $12)",
                )
                .bind(entry.id.into_inner())
                .bind(tick_i64)
                .bind(entry_type_to_db(entry.entry_type))
                .bind(entry.from_entity)
                .bind(entry.from_entity_type.map(entity_type_to_db))
                .bind(entry.to_entity)
                .bind(entry.to_entity_type.map(entity_type_to_db))
                .bind(resource_to_db(entry.resource))
                .bind(i64::from(entry.quantity))
                .bind(&entry.reason)
                .bind(entry.reference_id)
                .bind(entry.created_at)
                .execute(&mut *tx)
                .await?;
            }

            tx.commit().await?;
        }

        tracing::debug!(count = entries.len(), "inserted ledger entries");
        Ok(())
    }

    /// Query all ledger entries recorded during a specific tick.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn entries_for_tick(&self, tick: u64) -> Result<Vec<LedgerEntryRow>, DbError> {
        let tick_i64 = i64::try_from(tick).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, LedgerEntryRow>(
            r"SELECT id, tick, entry_type::TEXT as entry_type, from_entity,
                     from_entity_type::TEXT as from_entity_type, to_entity,
                     to_entity_type::TEXT as to_entity_type, resource::TEXT as resource,
                     quantity, reason, reference_id, created_at
              FROM ledger_entries
              WHERE tick = $1
              ORDER BY id",
        )
        .bind(tick_i64)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Query all ledger entries touching a settlement (either side of the
    /// entry), across its full history.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn entries_for_settlement(
        &self,
        settlement_id: Uuid,
    ) -> Result<Vec<LedgerEntryRow>, DbError> {
        let rows = sqlx::query_as::<_, LedgerEntryRow>(
            r"SELECT id, tick, entry_type::TEXT as entry_type, from_entity,
                     from_entity_type::TEXT as from_entity_type, to_entity,
                     to_entity_type::TEXT as to_entity_type, resource::TEXT as resource,
                     quantity, reason, reference_id, created_at
              FROM ledger_entries
              WHERE from_entity = $1 OR to_entity = $1
              ORDER BY tick, id",
        )
        .bind(settlement_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}

/// A row from the `ledger_entries` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LedgerEntryRow {
    /// Unique entry identifier.
    pub id: Uuid,
    /// The tick this entry was recorded during.
    pub tick: i64,
    /// The category of movement, as stored text.
    pub entry_type: String,
    /// The source entity, if any.
    pub from_entity: Option<Uuid>,
    /// The source entity's type, as stored text.
    pub from_entity_type: Option<String>,
    /// The destination entity, if any.
    pub to_entity: Option<Uuid>,
    /// The destination entity's type, as stored text.
    pub to_entity_type: Option<String>,
    /// The resource moved, as stored text.
    pub resource: String,
    /// The quantity moved.
    pub quantity: i64,
    /// The machine-oriented reason code.
    pub reason: String,
    /// An optional reference to the entity that caused this entry.
    pub reference_id: Option<Uuid>,
    /// Real-world creation time.
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Convert a [`LedgerEntryType`] to its `PostgreSQL` enum label.
const fn entry_type_to_db(entry_type: LedgerEntryType) -> &'static str {
    match entry_type {
        LedgerEntryType::Production => "production",
        LedgerEntryType::ConstructionDebit => "construction_debit",
        LedgerEntryType::ConstructionRefund => "construction_refund",
        LedgerEntryType::Waste => "waste",
        LedgerEntryType::DisasterLoss => "disaster_loss",
    }
}

/// Convert an [`EntityType`] to its `PostgreSQL` enum label.
const fn entity_type_to_db(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Settlement => "settlement",
        EntityType::Construction => "construction",
        EntityType::World => "world",
        EntityType::Void => "void",
    }
}

/// Convert a [`Resource`] to its `PostgreSQL` enum label.
const fn resource_to_db(resource: Resource) -> &'static str {
    match resource {
        Resource::Food => "food",
        Resource::Water => "water",
        Resource::Wood => "wood",
        Resource::Stone => "stone",
        Resource::Ore => "ore",
    }
}
