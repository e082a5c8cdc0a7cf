//! The admin REST surface: dashboard, server/world lifecycle, structure
//! metadata and mutation, disaster trigger/clear, and the test-only
//! admin-elevation route.
//!
//! Every handler here requires [`AdminSession`](crate::auth::AdminSession)
//! except the metadata read and the test route. Handlers call straight
//! into the domain crates (`settlement-structures`, `settlement-world`,
//! `settlement-disaster`) and the stores in `settlement-db`; there is no
//! separate service layer to keep in sync.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/admin/dashboard` | Counts + recent servers/worlds |
//! | `GET`/`POST` | `/servers` | List / create servers |
//! | `GET`/`PATCH`/`DELETE` | `/servers/{id}` | Single server lifecycle |
//! | `GET`/`POST` | `/worlds` | List / create worlds (generation is async) |
//! | `GET` | `/worlds/{id}` | Single world (poll for `status`) |
//! | `DELETE` | `/worlds/{id}` | Delete a world (cascades) |
//! | `GET` | `/structures/metadata` | Cached structure definitions |
//! | `POST` | `/structures/create` | Build a structure directly |
//! | `POST` | `/structures/{id}/upgrade` | Upgrade a structure |
//! | `DELETE` | `/structures/{id}` | Demolish a structure |
//! | `GET` | `/structures/by-settlement/{id}` | A settlement's structures |
//! | `POST` | `/admin/disasters/trigger` | Force-schedule a disaster |
//! | `POST` | `/admin/disasters/clear` | Resolve a world's active disasters |
//! | `PUT` | `/test/elevate-admin/{email}` | Test-only role elevation |

use std::collections::BTreeMap;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use rust_decimal::Decimal;
use settlement_db::{AccountStore, DisasterStore, SettlementStore, StructureStore, WorldStore};
use settlement_structures::service::{self, BuildRequest};
use settlement_types::{
    DisasterEvent, DisasterId, DisasterStatus, DisasterType, NoiseBundle, ResourceAmounts, Role,
    Server, ServerId, ServerStatus, SettlementId, SettlementTier, SeverityLevel, StructureDefId,
    StructureId, StructureKind, TemplateConfig, World, WorldId, WorldStatus,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /admin/dashboard
// ---------------------------------------------------------------------------

/// Return server/world counts and the five most recently created of each,
/// for the admin dashboard landing page.
pub async fn dashboard(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let accounts = AccountStore::new(state.db());
    let worlds = WorldStore::new(state.db());

    let servers = accounts.list_servers().await?;
    let all_worlds = worlds.list_worlds().await?;

    let recent_servers: Vec<&Server> = servers.iter().rev().take(5).collect();
    let recent_worlds: Vec<&World> = all_worlds.iter().rev().take(5).collect();

    Ok(Json(serde_json::json!({
        "serverCount": servers.len(),
        "worldCount": all_worlds.len(),
        "recentServers": recent_servers,
        "recentWorlds": recent_worlds,
    })))
}

// ---------------------------------------------------------------------------
// Servers
// ---------------------------------------------------------------------------

/// Request body for creating a server.
#[derive(Debug, serde::Deserialize)]
pub struct CreateServerRequest {
    /// Display name for the server.
    pub name: String,
    /// Network hostname the server is reachable at.
    pub hostname: String,
    /// Network port the server listens on.
    pub port: u16,
}

/// List every server.
pub async fn list_servers(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let store = AccountStore::new(state.db());
    Ok(Json(store.list_servers().await?))
}

/// Create a server, offline by default until an operator flips it online.
pub async fn create_server(
    State(state): State<AppState>,
    Json(body): Json<CreateServerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if body.name.is_empty() || body.hostname.is_empty() {
        return Err(ApiError::MissingFields("name and hostname are required".to_string()));
    }

    let server = Server {
        id: ServerId::new(),
        name: body.name,
        hostname: body.hostname,
        port: body.port,
        status: ServerStatus::Offline,
        created_at: Utc::now(),
    };

    let store = AccountStore::new(state.db());
    store.insert_server(&server).await?;
    Ok(Json(server))
}

/// Fetch a single server.
pub async fn get_server(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let store = AccountStore::new(state.db());
    let server = store
        .get_server(ServerId::from(id))
        .await
        .map_err(|err| not_found_or(err, ApiError::ServerNotFound))?;
    Ok(Json(server))
}

/// Request body for patching a server's mutable fields.
#[derive(Debug, serde::Deserialize)]
pub struct UpdateServerRequest {
    /// New display name, if changing.
    pub name: Option<String>,
    /// New network hostname, if changing.
    pub hostname: Option<String>,
    /// New network port, if changing.
    pub port: Option<u16>,
    /// New status, if changing.
    pub status: Option<String>,
}

/// Patch a server's name, hostname, port, or status.
pub async fn update_server(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateServerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let store = AccountStore::new(state.db());
    let mut server = store
        .get_server(ServerId::from(id))
        .await
        .map_err(|err| not_found_or(err, ApiError::ServerNotFound))?;

    if let Some(name) = body.name {
        server.name = name;
    }
    if let Some(hostname) = body.hostname {
        server.hostname = hostname;
    }
    if let Some(port) = body.port {
        server.port = port;
    }
    if let Some(status) = body.status.as_deref() {
        server.status = parse_server_status(status);
    }

    store.update_server(&server).await?;
    Ok(Json(server))
}

/// Delete a server.
pub async fn delete_server(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let store = AccountStore::new(state.db());
    store.delete_server(ServerId::from(id)).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

fn parse_server_status(value: &str) -> ServerStatus {
    match value {
        "maintenance" => ServerStatus::Maintenance,
        "online" => ServerStatus::Online,
        _ => ServerStatus::Offline,
    }
}

// ---------------------------------------------------------------------------
// Worlds
// ---------------------------------------------------------------------------

/// Request body for creating a world.
#[derive(Debug, serde::Deserialize)]
pub struct CreateWorldRequest {
    /// The server this world is hosted on.
    pub server_id: Uuid,
    /// Display name for the world.
    pub name: String,
    /// Width of the world, in regions.
    #[serde(default = "default_regions_per_side")]
    pub width_regions: u32,
    /// Height of the world, in regions.
    #[serde(default = "default_regions_per_side")]
    pub height_regions: u32,
    /// Seed for procedural generation; a random seed is used when absent.
    pub seed: Option<u64>,
}

const fn default_regions_per_side() -> u32 {
    4
}

/// List every world.
pub async fn list_worlds(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let store = WorldStore::new(state.db());
    Ok(Json(store.list_worlds().await?))
}

/// Create a world row in `generating` status and kick off region/tile
/// generation detached from the request; the caller polls `GET
/// /worlds/{id}` for `status` to flip to `ready` or `failed`.
pub async fn create_world(
    State(state): State<AppState>,
    Json(body): Json<CreateWorldRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if body.name.is_empty() {
        return Err(ApiError::MissingFields("name is required".to_string()));
    }

    let seed = body.seed.unwrap_or(state.config.world.seed);
    let world = World {
        id: WorldId::new(),
        server_id: ServerId::from(body.server_id),
        name: body.name,
        status: WorldStatus::Generating,
        failure_reason: None,
        elevation_noise: default_noise_bundle(seed),
        precipitation_noise: default_noise_bundle(seed.wrapping_add(1)),
        temperature_noise: default_noise_bundle(seed.wrapping_add(2)),
        width_regions: body.width_regions.max(1),
        height_regions: body.height_regions.max(1),
        template: default_template(),
        created_at: Utc::now(),
    };

    let store = WorldStore::new(state.db());
    store.insert_world(&world).await?;

    let pool = state.pool.clone();
    let world_for_task = world.clone();
    tokio::spawn(async move {
        generate_world(pool, world_for_task).await;
    });

    Ok(Json(world))
}

/// Generate a world's regions and tiles, flipping its status to `ready`
/// or `failed` on completion. Runs detached from the creating request.
async fn generate_world(pool: settlement_db::PostgresPool, world: World) {
    let store = WorldStore::new(pool.pool());

    let outcome = match store.all_biomes().await {
        Ok(biomes) => settlement_world::generator::generate(
            world.id,
            &world.elevation_noise,
            &world.precipitation_noise,
            &world.temperature_noise,
            world.width_regions,
            world.height_regions,
            &biomes,
        )
        .map_err(|err| err.to_string()),
        Err(err) => Err(err.to_string()),
    };

    let result = match outcome {
        Ok(generated) => {
            let persisted = async {
                store.batch_insert_regions(&generated.regions).await?;
                store.batch_insert_tiles(&generated.tiles).await?;
                Ok::<(), settlement_db::DbError>(())
            }
            .await;
            persisted.map_err(|err| err.to_string())
        }
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => {
            if let Err(err) = store.update_status(world.id, WorldStatus::Ready, None).await {
                tracing::error!(world_id = %world.id, error = %err, "failed to mark world ready");
            }
        }
        Err(reason) => {
            tracing::error!(world_id = %world.id, reason = %reason, "world generation failed");
            if let Err(err) =
                store.update_status(world.id, WorldStatus::Failed, Some(&reason)).await
            {
                tracing::error!(world_id = %world.id, error = %err, "failed to mark world failed");
            }
        }
    }
}

fn default_noise_bundle(seed: u64) -> NoiseBundle {
    NoiseBundle {
        octaves: 4,
        amplitude: Decimal::ONE,
        frequency: Decimal::new(1, 1),
        persistence: Decimal::new(5, 1),
        scale: Decimal::ONE,
        seed,
    }
}

fn default_template() -> TemplateConfig {
    TemplateConfig {
        template_type: "STANDARD".to_string(),
        difficulty: Decimal::ONE,
        abundance: Decimal::ONE,
        depletion: Decimal::new(5, 2),
        disaster_frequency: Decimal::ONE,
        disaster_severity: Decimal::ONE,
        world_production_multiplier: Decimal::ONE,
    }
}

/// Fetch a single world; the client polls this for generation status.
pub async fn get_world(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let store = WorldStore::new(state.db());
    let world = store
        .get_world(WorldId::from(id))
        .await
        .map_err(|err| not_found_or(err, ApiError::WorldNotFound))?;
    Ok(Json(world))
}

/// Delete a world. Regions, tiles, settlements, and everything scoped
/// underneath cascade.
pub async fn delete_world(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let store = WorldStore::new(state.db());
    store.delete_world(WorldId::from(id)).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

// ---------------------------------------------------------------------------
// Structure metadata
// ---------------------------------------------------------------------------

/// Return every structure definition, served from the 5-minute cache.
/// Reports `cached`/`cacheAge` so callers can see whether this response
/// came from the cache or triggered a fresh load.
pub async fn structure_metadata(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let lookup = load_structure_defs(&state).await?;
    Ok(Json(serde_json::json!({
        "definitions": lookup.defs,
        "cached": lookup.cached,
        "cacheAge": lookup.cache_age_seconds,
        "timestamp": Utc::now(),
    })))
}

pub(crate) async fn load_structure_defs(
    state: &AppState,
) -> Result<crate::metadata_cache::CacheLookup, ApiError> {
    let ttl = Duration::from_secs(state.config.server.metadata_cache_ttl_s);
    let pool = state.pool.clone();
    state
        .structure_metadata
        .get_or_load(ttl, || async move {
            StructureStore::new(pool.pool()).all_structure_defs().await
        })
        .await
        .map_err(ApiError::from)
}

// ---------------------------------------------------------------------------
// Structures: create / upgrade / demolish / list
// ---------------------------------------------------------------------------

/// Request body for directly creating a structure.
#[derive(Debug, serde::Deserialize)]
pub struct CreateStructureRequest {
    /// The settlement the structure is built for.
    pub settlement_id: Uuid,
    /// The structure definition to instantiate.
    pub structure_def_id: Uuid,
    /// The target tile, for EXTRACTOR-category structures.
    pub tile_id: Option<Uuid>,
    /// The target slot position, for EXTRACTOR-category structures.
    pub slot_position: Option<u8>,
}

/// Build a structure directly against a settlement, bypassing the
/// construction queue -- the admin surface's equivalent of a completed
/// build. Validates and debits the same as a queued completion would.
pub async fn create_structure(
    State(state): State<AppState>,
    Json(body): Json<CreateStructureRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let settlement_id = SettlementId::from(body.settlement_id);
    let def_id = StructureDefId::from(body.structure_def_id);

    let defs = load_structure_defs(&state).await?.defs;
    let def = defs
        .iter()
        .find(|def| def.id == def_id)
        .cloned()
        .ok_or(ApiError::StructureNotFound)?;

    let structure_store = StructureStore::new(state.db());
    let settlement_store = SettlementStore::new(state.db());

    let settlement = settlement_store
        .get_settlement(settlement_id)
        .await
        .map_err(|err| not_found_or(err, ApiError::SettlementNotFound))?;
    let existing = structure_store.structures_by_settlement(settlement_id).await?;
    let prerequisites = structure_store.prerequisites_for(def_id).await?;
    let requirements = structure_store.requirements_for(def_id).await?;

    let defs_by_kind: BTreeMap<StructureKind, settlement_types::StructureDef> =
        defs.into_iter().map(|def| (def.kind, def)).collect();
    let town_hall_level = existing
        .iter()
        .filter(|structure| structure.kind == StructureKind::TownHall)
        .map(|structure| structure.level)
        .max()
        .unwrap_or(0);

    let now = Utc::now();
    let built = service::build(&BuildRequest {
        def: &def,
        prerequisites: &prerequisites,
        existing_structures: &existing,
        structure_defs: &defs_by_kind,
        area_budget: area_budget_for(settlement.tier),
        town_hall_level,
        tile_id: body.tile_id.map(settlement_types::TileId::from),
        slot_position: body.slot_position,
        settlement_id,
        now,
    })?;

    let cost = settlement_construction::cost::compute_cost(&requirements, false)?;
    let mut storage = settlement_store.get_storage(settlement_id).await?;
    let shortfall = settlement_construction::cost::shortages(&storage.amounts, &cost);
    if !shortfall.is_empty() {
        return Err(ApiError::InsufficientResources(shortfall));
    }
    debit(&mut storage.amounts, &cost);
    settlement_store.update_storage(settlement_id, &storage.amounts, now).await?;

    structure_store.insert_structure(&built).await?;

    for modifier_type in settlement_structures::modifiers::affected_modifier_types(&built) {
        recompute_modifier(&structure_store, settlement_id, modifier_type, now).await?;
    }

    state.registry.publish(
        &settlement_types::RoomKey::Settlement(settlement_id),
        settlement_types::OutboundEvent::StructureBuilt {
            settlement_id,
            structure_id: built.id,
            kind: built.kind,
            timestamp: now,
        },
    );

    Ok(Json(built))
}

pub(crate) async fn recompute_modifier(
    structure_store: &StructureStore<'_>,
    settlement_id: SettlementId,
    modifier_type: &str,
    now: chrono::DateTime<Utc>,
) -> Result<(), ApiError> {
    let structures = structure_store.structures_by_settlement(settlement_id).await?;
    let modifier =
        settlement_structures::modifiers::recompute(settlement_id, modifier_type, &structures, now)?;
    structure_store.upsert_modifier(&modifier).await?;
    Ok(())
}

pub(crate) fn debit(storage: &mut ResourceAmounts, cost: &ResourceAmounts) {
    for (&resource, &amount) in cost {
        let entry = storage.entry(resource).or_insert(0);
        *entry = entry.saturating_sub(amount);
    }
}

/// The settlement area budget for a tier: 50 base, +50 per tier level
/// above Outpost.
pub(crate) const fn area_budget_for(tier: SettlementTier) -> u32 {
    50 + 50 * (tier.as_level() as u32 - 1)
}

/// Upgrade a structure to its next level.
pub async fn upgrade_structure(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let structure_id = StructureId::from(id);
    let structure_store = StructureStore::new(state.db());

    let mut structure = structure_store
        .get_structure(structure_id)
        .await
        .map_err(|err| not_found_or(err, ApiError::StructureNotFound))?;

    let defs = load_structure_defs(&state).await?.defs;
    let def = defs
        .into_iter()
        .find(|def| def.kind == structure.kind)
        .ok_or(ApiError::StructureNotFound)?;

    service::upgrade(&mut structure, &def, Utc::now())?;
    structure_store.update_structure(&structure).await?;

    for modifier_type in settlement_structures::modifiers::affected_modifier_types(&structure) {
        recompute_modifier(&structure_store, structure.settlement_id, modifier_type, structure.updated_at)
            .await?;
    }

    Ok(Json(structure))
}

/// Demolish a structure.
pub async fn demolish_structure(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let structure_id = StructureId::from(id);
    let structure_store = StructureStore::new(state.db());

    let structure = structure_store
        .get_structure(structure_id)
        .await
        .map_err(|err| not_found_or(err, ApiError::StructureNotFound))?;

    let defs = load_structure_defs(&state).await?.defs;
    let def = defs
        .into_iter()
        .find(|def| def.kind == structure.kind)
        .ok_or(ApiError::StructureNotFound)?;

    let result = service::demolish(&structure, &def);
    structure_store.delete_structure(structure_id).await?;

    let now = Utc::now();
    for modifier_type in result.affected_modifier_types {
        recompute_modifier(&structure_store, structure.settlement_id, modifier_type, now).await?;
    }

    Ok(Json(serde_json::json!({
        "deleted": true,
        "areaFreed": result.area_freed,
    })))
}

/// List every structure belonging to a settlement.
pub async fn structures_by_settlement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let store = StructureStore::new(state.db());
    let structures = store.structures_by_settlement(SettlementId::from(id)).await?;
    Ok(Json(structures))
}

// ---------------------------------------------------------------------------
// Disasters (admin trigger/clear, for test and demo scenarios)
// ---------------------------------------------------------------------------

/// Request body for force-scheduling a disaster.
#[derive(Debug, serde::Deserialize)]
pub struct TriggerDisasterRequest {
    /// The target world.
    pub world_id: Uuid,
    /// The disaster type to schedule, by name.
    #[serde(rename = "type")]
    pub disaster_type: String,
    /// Disaster severity, `[0, 100]`.
    pub severity: u8,
    /// Impact duration, in seconds.
    #[serde(default = "default_impact_duration_seconds")]
    pub duration: u32,
}

const fn default_impact_duration_seconds() -> u32 {
    3600
}

/// Force-schedule a disaster against a world, skipping the normal
/// biome-weighted draw, for test and demo scenarios.
pub async fn trigger_disaster(
    State(state): State<AppState>,
    Json(body): Json<TriggerDisasterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let disaster_type = parse_disaster_type(&body.disaster_type)
        .ok_or_else(|| ApiError::MissingFields("unrecognized disaster type".to_string()))?;

    let now = Utc::now();
    let event = DisasterEvent {
        id: DisasterId::new(),
        world_id: WorldId::from(body.world_id),
        disaster_type,
        severity: body.severity,
        severity_level: severity_level_for(body.severity),
        affected_region: None,
        affected_biomes: Vec::new(),
        scheduled_at: now,
        warning_time_seconds: 0,
        impact_duration_seconds: body.duration,
        status: DisasterStatus::Impact,
        warning_started_at: Some(now),
        impact_started_at: Some(now),
        impact_ended_at: None,
        imminent_warning_issued: true,
    };

    let store = DisasterStore::new(state.db());
    store.insert_disaster(&event).await?;

    state.registry.publish(
        &settlement_types::RoomKey::World(event.world_id),
        settlement_types::OutboundEvent::DisasterImpactStart { disaster_id: event.id, timestamp: now },
    );

    Ok(Json(event))
}

/// Request body for clearing every active disaster in a world.
#[derive(Debug, serde::Deserialize)]
pub struct ClearDisasterRequest {
    /// The target world.
    pub world_id: Uuid,
}

/// Resolve every active disaster in a world, for test and demo cleanup.
pub async fn clear_disasters(
    State(state): State<AppState>,
    Json(body): Json<ClearDisasterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let world_id = WorldId::from(body.world_id);
    let store = DisasterStore::new(state.db());
    let active = store.active_by_world(world_id).await?;

    let now = Utc::now();
    let mut cleared = Vec::with_capacity(active.len());
    for mut event in active {
        event.status = DisasterStatus::Resolved;
        event.impact_ended_at.get_or_insert(now);
        store.update_disaster(&event).await?;
        state.registry.publish(
            &settlement_types::RoomKey::World(world_id),
            settlement_types::OutboundEvent::DisasterResolved { disaster_id: event.id, timestamp: now },
        );
        cleared.push(event);
    }

    Ok(Json(serde_json::json!({ "cleared": cleared.len(), "disasters": cleared })))
}

fn parse_disaster_type(value: &str) -> Option<DisasterType> {
    Some(match value {
        "drought" => DisasterType::Drought,
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
        _ => return None,
    })
}

fn severity_level_for(severity: u8) -> SeverityLevel {
    match severity {
        0..=24 => SeverityLevel::Mild,
        25..=49 => SeverityLevel::Moderate,
        50..=74 => SeverityLevel::Major,
        _ => SeverityLevel::Catastrophic,
    }
}

// ---------------------------------------------------------------------------
// Test-only admin elevation
// ---------------------------------------------------------------------------

/// Elevate an account to `ADMINISTRATOR` by email. Gated at the router
/// level to `node_env == "test"`.
pub async fn elevate_admin(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let store = AccountStore::new(state.db());
    store.set_role_by_email(&email, Role::Administrator).await?;
    Ok(Json(serde_json::json!({ "elevated": true, "email": email })))
}

/// Map a [`settlement_db::DbError::NotFound`] to `not_found`; any other
/// error goes through the blanket conversion.
pub(crate) fn not_found_or(err: settlement_db::DbError, not_found: ApiError) -> ApiError {
    match err {
        settlement_db::DbError::NotFound(_) => not_found,
        other => other.into(),
    }
}
