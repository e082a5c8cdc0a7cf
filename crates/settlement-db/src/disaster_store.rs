//! Disaster event and history persistence.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use settlement_types::{
    BiomeKind, DisasterEvent, DisasterHistory, DisasterHistoryId, DisasterId, DisasterStatus,
    DisasterType, RegionId, Resource, SettlementId, SeverityLevel, WorldId,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Operations on the `disaster_events` and `disaster_history` tables.
pub struct DisasterStore<'a> {
    pool: &'a PgPool,
}

impl<'a> DisasterStore<'a> {
    /// Create a new disaster store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a newly scheduled disaster.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert_disaster(&self, disaster: &DisasterEvent) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO disaster_events
              (id, world_id, disaster_type, severity, severity_level, affected_region,
               affected_biomes, scheduled_at, warning_time_seconds, impact_duration_seconds,
               status, warning_started_at, impact_started_at, impact_ended_at, imminent_warning_issued)
              VALUES ($1, $2, $3::disaster_type, $4, $5::severity_level, $6, $7, $8, $9, $10,
                      $11::disaster_status, $12, $13, $14, $15)",
        )
        .bind(disaster.id.into_inner())
        .bind(disaster.world_id.into_inner())
        .bind(disaster_type_to_db(disaster.disaster_type))
        .bind(i32::from(disaster.severity))
        .bind(severity_level_to_db(disaster.severity_level))
        .bind(disaster.affected_region.map(uuid::Uuid::from))
        .bind(serde_json::to_value(&disaster.affected_biomes)?)
        .bind(disaster.scheduled_at)
        .bind(i64::from(disaster.warning_time_seconds))
        .bind(i64::from(disaster.impact_duration_seconds))
        .bind(disaster_status_to_db(disaster.status))
        .bind(disaster.warning_started_at)
        .bind(disaster.impact_started_at)
        .bind(disaster.impact_ended_at)
        .bind(disaster.imminent_warning_issued)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Persist a lifecycle transition (monotonic).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn update_disaster(&self, disaster: &DisasterEvent) -> Result<(), DbError> {
        sqlx::query(
            r"UPDATE disaster_events
              SET status = $2::disaster_status, warning_started_at = $3, impact_started_at = $4,
                  impact_ended_at = $5, imminent_warning_issued = $6
              WHERE id = $1",
        )
        .bind(disaster.id.into_inner())
        .bind(disaster_status_to_db(disaster.status))
        .bind(disaster.warning_started_at)
        .bind(disaster.impact_started_at)
        .bind(disaster.impact_ended_at)
        .bind(disaster.imminent_warning_issued)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Fetch every disaster in a world that has not yet reached RESOLVED
    /// (`ActiveDisastersByWorld`).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn active_by_world(&self, world_id: WorldId) -> Result<Vec<DisasterEvent>, DbError> {
        let rows = sqlx::query_as::<_, DisasterRow>(
            r"SELECT id, world_id, disaster_type::TEXT as disaster_type, severity,
                     severity_level::TEXT as severity_level, affected_region, affected_biomes,
                     scheduled_at, warning_time_seconds, impact_duration_seconds,
                     status::TEXT as status, warning_started_at, impact_started_at, impact_ended_at,
                     imminent_warning_issued
              FROM disaster_events
              WHERE world_id = $1 AND status != 'resolved'
              ORDER BY scheduled_at",
        )
        .bind(world_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(DisasterRow::into_disaster).collect()
    }

    /// Insert a per-settlement disaster-history record, persisted at
    /// AFTERMATH entry.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert_history(&self, history: &DisasterHistory) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO disaster_history
              (id, settlement_id, disaster_id, casualties, structures_damaged, structures_destroyed,
               resources_lost, resilience_gained, created_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(history.id.into_inner())
        .bind(history.settlement_id.into_inner())
        .bind(history.disaster_id.into_inner())
        .bind(i64::from(history.casualties))
        .bind(i64::from(history.structures_damaged))
        .bind(i64::from(history.structures_destroyed))
        .bind(serde_json::to_value(&history.resources_lost)?)
        .bind(i32::from(history.resilience_gained))
        .bind(history.created_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Fetch a settlement's full disaster history.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn history_for_settlement(
        &self,
        settlement_id: SettlementId,
    ) -> Result<Vec<DisasterHistory>, DbError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r"SELECT id, settlement_id, disaster_id, casualties, structures_damaged,
                     structures_destroyed, resources_lost, resilience_gained, created_at
              FROM disaster_history WHERE settlement_id = $1
              ORDER BY created_at",
        )
        .bind(settlement_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(HistoryRow::into_history).collect()
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct DisasterRow {
    id: Uuid,
    world_id: Uuid,
    disaster_type: String,
    severity: i32,
    severity_level: String,
    affected_region: Option<Uuid>,
    affected_biomes: serde_json::Value,
    scheduled_at: DateTime<Utc>,
    warning_time_seconds: i64,
    impact_duration_seconds: i64,
    status: String,
    warning_started_at: Option<DateTime<Utc>>,
    impact_started_at: Option<DateTime<Utc>>,
    impact_ended_at: Option<DateTime<Utc>>,
    imminent_warning_issued: bool,
}

impl DisasterRow {
    fn into_disaster(self) -> Result<DisasterEvent, DbError> {
        let affected_biomes: Vec<BiomeKind> = serde_json::from_value(self.affected_biomes)?;

        Ok(DisasterEvent {
            id: DisasterId::from(self.id),
            world_id: WorldId::from(self.world_id),
            disaster_type: disaster_type_from_db(&self.disaster_type),
            severity: u8::try_from(self.severity).unwrap_or(0),
            severity_level: severity_level_from_db(&self.severity_level),
            affected_region: self.affected_region.map(RegionId::from),
            affected_biomes,
            scheduled_at: self.scheduled_at,
            warning_time_seconds: u32::try_from(self.warning_time_seconds).unwrap_or(0),
            impact_duration_seconds: u32::try_from(self.impact_duration_seconds).unwrap_or(0),
            status: disaster_status_from_db(&self.status),
            warning_started_at: self.warning_started_at,
            impact_started_at: self.impact_started_at,
            impact_ended_at: self.impact_ended_at,
            imminent_warning_issued: self.imminent_warning_issued,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct HistoryRow {
    id: Uuid,
    settlement_id: Uuid,
    disaster_id: Uuid,
    casualties: i64,
    structures_damaged: i64,
    structures_destroyed: i64,
    resources_lost: serde_json::Value,
    resilience_gained: i32,
    created_at: DateTime<Utc>,
}

impl HistoryRow {
    fn into_history(self) -> Result<DisasterHistory, DbError> {
        let resources_lost: BTreeMap<Resource, u32> = serde_json::from_value(self.resources_lost)?;

        Ok(DisasterHistory {
            id: DisasterHistoryId::from(self.id),
            settlement_id: SettlementId::from(self.settlement_id),
            disaster_id: DisasterId::from(self.disaster_id),
            casualties: u32::try_from(self.casualties).unwrap_or(0),
            structures_damaged: u32::try_from(self.structures_damaged).unwrap_or(0),
            structures_destroyed: u32::try_from(self.structures_destroyed).unwrap_or(0),
            resources_lost,
            resilience_gained: u8::try_from(self.resilience_gained).unwrap_or(0),
            created_at: self.created_at,
        })
    }
}

const fn disaster_type_to_db(disaster_type: DisasterType) -> &'static str {
    match disaster_type {
        DisasterType::Drought => "drought",
        DisasterType::Tornado => "tornado",
        DisasterType::LocustSwarm => "locust_swarm",
        DisasterType::Flood => "flood",
        DisasterType::Wildfire => "wildfire",
        DisasterType::Heatwave => "heatwave",
        DisasterType::Earthquake => "earthquake",
        DisasterType::Sandstorm => "sandstorm",
        DisasterType::Avalanche => "avalanche",
        DisasterType::Landslide => "landslide",
        DisasterType::Volcano => "volcano",
        DisasterType::Blizzard => "blizzard",
        DisasterType::InsectPlague => "insect_plague",
        DisasterType::Blight => "blight",
        DisasterType::Hurricane => "hurricane",
    }
}

fn disaster_type_from_db(value: &str) -> DisasterType {
    match value {
        "tornado" => DisasterType::Tornado,
        "locust_swarm" => DisasterType::LocustSwarm,
        "flood" => DisasterType::Flood,
        "wildfire" => DisasterType::Wildfire,
        "heatwave" => DisasterType::Heatwave,
        "earthquake" => DisasterType::Earthquake,
        "sandstorm" => DisasterType::Sandstorm,
        "avalanche" => DisasterType::Avalanche,
        "landslide" => DisasterType::Landslide,
        "volcano" => DisasterType::Volcano,
        "blizzard" => DisasterType::Blizzard,
        "insect_plague" => DisasterType::InsectPlague,
        "blight" => DisasterType::Blight,
        "hurricane" => DisasterType::Hurricane,
        _ => DisasterType::Drought,
    }
}

const fn severity_level_to_db(level: SeverityLevel) -> &'static str {
    match level {
        SeverityLevel::Mild => "mild",
        SeverityLevel::Moderate => "moderate",
        SeverityLevel::Major => "major",
        SeverityLevel::Catastrophic => "catastrophic",
    }
}

fn severity_level_from_db(value: &str) -> SeverityLevel {
    match value {
        "moderate" => SeverityLevel::Moderate,
        "major" => SeverityLevel::Major,
        "catastrophic" => SeverityLevel::Catastrophic,
        _ => SeverityLevel::Mild,
    }
}

const fn disaster_status_to_db(status: DisasterStatus) -> &'static str {
    match status {
        DisasterStatus::Scheduled => "scheduled",
        DisasterStatus::Warning => "warning",
        DisasterStatus::Impact => "impact",
        DisasterStatus::Aftermath => "aftermath",
        DisasterStatus::Resolved => "resolved",
    }
}

fn disaster_status_from_db(value: &str) -> DisasterStatus {
    match value {
        "warning" => DisasterStatus::Warning,
        "impact" => DisasterStatus::Impact,
        "aftermath" => DisasterStatus::Aftermath,
        "resolved" => DisasterStatus::Resolved,
        _ => DisasterStatus::Scheduled,
    }
}
