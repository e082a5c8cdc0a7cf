//! The event channel: a single `WebSocket` connection multiplexing every
//! inbound command and outbound event for one client.
//!
//! Clients connect to `GET /ws` and immediately receive `connected`. From
//! there every other command requires `authenticate` first. A session may
//! hold any number of active room subscriptions at once (its world room
//! plus its own settlement room); each subscription runs two small
//! forwarder tasks that drain the subscription's lifecycle/progress
//! channels into one shared outbound queue, so the connection's main loop
//! only ever has to select over that one queue and the socket itself.

use std::collections::BTreeMap;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use settlement_construction::queue::{self, EnqueueRequest};
use settlement_db::{
    AccountStore, ConstructionStore, DisasterStore, LedgerStore, SettlementStore, StructureStore,
    WorldStore,
};
use settlement_events::SubscriberId;
use settlement_ledger::{ConstructionTransferParams, Ledger};
use settlement_structures::service::{self, BuildRequest};
use settlement_types::{
    Account, ConstructionId, ConstructionStatus, DisasterStatus, ErrorEnvelope, OutboundEvent,
    ProfileId, ResourceAmounts, RoomKey, Settlement, SettlementId, StructureDefId, StructureId,
    StructureKind, TileId, WorldId,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::{area_budget_for, debit, load_structure_defs, not_found_or, recompute_modifier};
use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and run the event
/// channel for its lifetime.
///
/// # Route
///
/// `GET /ws`
pub async fn connect(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| run(socket, state))
}

/// Every command a client may send over the event channel. The `type` tag
/// matches the wire name exactly (kebab-case); payload fields stay
/// `snake_case` like every other type on this wire.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum InboundCommand {
    Authenticate {
        player_id: Uuid,
        token: String,
    },
    JoinWorld {
        world_id: Uuid,
        player_id: Uuid,
    },
    LeaveWorld,
    RequestGameState {
        world_id: Uuid,
    },
    BuildStructure {
        structure_def_id: Uuid,
        tile_id: Option<Uuid>,
        slot_position: Option<u8>,
    },
    StartConstruction {
        structure_def_id: Uuid,
        tile_id: Option<Uuid>,
        slot_position: Option<u8>,
    },
    UpgradeStructure {
        structure_id: Uuid,
    },
    CancelConstruction {
        project_id: Uuid,
    },
    CollectResources,
    RequestResourcesData,
    RequestConstructionState,
}

/// One of a session's active room subscriptions: the two forwarder tasks
/// that drain [`settlement_events::registry::Subscription`]'s lifecycle
/// and progress channels into the connection's shared outbound queue.
struct RoomSubscription {
    room: RoomKey,
    subscriber_id: SubscriberId,
    lifecycle_task: JoinHandle<()>,
    progress_task: JoinHandle<()>,
}

/// Per-connection state: the authenticated account, the joined world and
/// settlement (if any), and the room subscriptions currently forwarding
/// into `outbound_tx`.
struct Session {
    outbound_tx: mpsc::UnboundedSender<OutboundEvent>,
    account: Option<Account>,
    settlement: Option<Settlement>,
    world_id: Option<WorldId>,
    rooms: Vec<RoomSubscription>,
}

impl Session {
    fn new(outbound_tx: mpsc::UnboundedSender<OutboundEvent>) -> Self {
        Self { outbound_tx, account: None, settlement: None, world_id: None, rooms: Vec::new() }
    }

    /// Join `room`, spawning its forwarder tasks, unless already joined.
    fn join_room(&mut self, state: &AppState, room: RoomKey) {
        if self.rooms.iter().any(|r| r.room == room) {
            return;
        }

        let subscription = state.registry.join(room.clone());
        let subscriber_id = subscription.id;
        let mut lifecycle = subscription.lifecycle;
        let lifecycle_tx = self.outbound_tx.clone();
        let lifecycle_task = tokio::spawn(async move {
            while let Some(event) = lifecycle.recv().await {
                if lifecycle_tx.send(event).is_err() {
                    break;
                }
            }
        });

        let mut progress = subscription.progress;
        let progress_tx = self.outbound_tx.clone();
        let progress_task = tokio::spawn(async move {
            while progress.changed().await.is_ok() {
                if let Some(event) = progress.borrow().clone() {
                    if progress_tx.send(event).is_err() {
                        break;
                    }
                }
            }
        });

        self.rooms.push(RoomSubscription { room, subscriber_id, lifecycle_task, progress_task });
    }

    /// Leave every room this session currently holds.
    fn leave_all(&mut self, state: &AppState) {
        for subscription in self.rooms.drain(..) {
            subscription.lifecycle_task.abort();
            subscription.progress_task.abort();
            state.registry.leave(&subscription.room, subscription.subscriber_id);
        }
    }

    /// Leave the world and settlement rooms and clear the joined state,
    /// for `leave-world` and re-`join-world`.
    fn leave_world(&mut self, state: &AppState) {
        self.leave_all(state);
        self.world_id = None;
        self.settlement = None;
    }
}

/// Run one connection's event channel: send `connected`, then loop,
/// dispatching inbound commands and forwarding room events, until the
/// socket closes.
async fn run(mut socket: WebSocket, state: AppState) {
    debug!("event channel client connected");

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    let mut session = Session::new(outbound_tx);

    if send_event(&mut socket, &OutboundEvent::Connected { timestamp: Utc::now() }).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            event = outbound_rx.recv() => {
                match event {
                    Some(event) => {
                        if send_event(&mut socket, &event).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_text(&mut socket, &state, &mut session, &text).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("event channel client disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(err)) => {
                        debug!("event channel error: {err}");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    session.leave_all(&state);
}

/// Deserialize and dispatch one inbound text frame, sending an error
/// envelope directly to the socket on failure.
async fn handle_text(socket: &mut WebSocket, state: &AppState, session: &mut Session, text: &str) {
    let command: InboundCommand = match serde_json::from_str(text) {
        Ok(command) => command,
        Err(err) => {
            send_error(socket, &ApiError::MissingFields(err.to_string())).await;
            return;
        }
    };

    if let Err(err) = dispatch(socket, state, session, command).await {
        send_error(socket, &err).await;
    }
}

async fn dispatch(
    socket: &mut WebSocket,
    state: &AppState,
    session: &mut Session,
    command: InboundCommand,
) -> Result<(), ApiError> {
    match command {
        InboundCommand::Authenticate { player_id, token } => {
            authenticate(socket, state, session, player_id, token).await
        }
        InboundCommand::JoinWorld { world_id, player_id } => {
            join_world(socket, state, session, WorldId::from(world_id), ProfileId::from(player_id))
                .await
        }
        InboundCommand::LeaveWorld => {
            session.leave_world(state);
            Ok(())
        }
        InboundCommand::RequestGameState { world_id } => {
            if session.world_id != Some(WorldId::from(world_id)) {
                return Err(ApiError::Unauthenticated);
            }
            send_game_state(socket, state, session).await
        }
        InboundCommand::BuildStructure { structure_def_id, tile_id, slot_position } => {
            enqueue_construction(
                state,
                session,
                StructureDefId::from(structure_def_id),
                tile_id.map(TileId::from),
                slot_position,
                false,
            )
            .await
        }
        InboundCommand::StartConstruction { structure_def_id, tile_id, slot_position } => {
            enqueue_construction(
                state,
                session,
                StructureDefId::from(structure_def_id),
                tile_id.map(TileId::from),
                slot_position,
                true,
            )
            .await
        }
        InboundCommand::UpgradeStructure { structure_id } => {
            upgrade_structure(state, session, StructureId::from(structure_id)).await
        }
        InboundCommand::CancelConstruction { project_id } => {
            cancel_construction(state, session, ConstructionId::from(project_id)).await
        }
        InboundCommand::CollectResources | InboundCommand::RequestResourcesData => {
            send_resources_data(socket, state, session).await
        }
        InboundCommand::RequestConstructionState => {
            send_construction_state(socket, state, session).await
        }
    }
}

async fn authenticate(
    socket: &mut WebSocket,
    state: &AppState,
    session: &mut Session,
    player_id: Uuid,
    token: String,
) -> Result<(), ApiError> {
    let store = AccountStore::new(state.db());
    let account = store.find_by_auth_token(&token).await?.ok_or(ApiError::Unauthenticated)?;

    let profile = store
        .profile_for_account(account.id)
        .await?
        .ok_or(ApiError::Unauthenticated)?;
    if profile.id != ProfileId::from(player_id) {
        return Err(ApiError::Unauthenticated);
    }

    session.account = Some(account);
    send_event(socket, &OutboundEvent::Authenticated { timestamp: Utc::now() })
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))
}

async fn join_world(
    socket: &mut WebSocket,
    state: &AppState,
    session: &mut Session,
    world_id: WorldId,
    player_id: ProfileId,
) -> Result<(), ApiError> {
    if session.account.is_none() {
        return Err(ApiError::Unauthenticated);
    }

    let settlement_store = SettlementStore::new(state.db());
    let settlement = settlement_store
        .settlement_by_owner(player_id)
        .await
        .map_err(|err| not_found_or(err, ApiError::SettlementNotFound))?;

    session.leave_world(state);
    session.world_id = Some(world_id);
    session.settlement = Some(settlement.clone());
    session.join_room(state, RoomKey::World(world_id));
    session.join_room(state, RoomKey::Settlement(settlement.id));

    send_event(socket, &OutboundEvent::WorldJoined { world_id, timestamp: Utc::now() })
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))
}

/// This session's joined settlement, or [`ApiError::Unauthenticated`] if
/// no `join-world` has succeeded yet.
fn current_settlement(session: &Session) -> Result<Settlement, ApiError> {
    session.settlement.clone().ok_or(ApiError::Unauthenticated)
}

/// Whether an AFTERMATH disaster is currently active against the world
/// this settlement's tile belongs to, required for emergency enqueues.
async fn aftermath_active(state: &AppState, settlement: &Settlement) -> Result<bool, ApiError> {
    let world_id = WorldStore::new(state.db()).world_id_for_tile(settlement.tile_id).await?;
    let disasters = DisasterStore::new(state.db()).active_by_world(world_id).await?;
    Ok(disasters.iter().any(|event| event.status == DisasterStatus::Aftermath))
}

async fn send_game_state(
    socket: &mut WebSocket,
    state: &AppState,
    session: &Session,
) -> Result<(), ApiError> {
    let settlement = current_settlement(session)?;
    let settlement_store = SettlementStore::new(state.db());
    let structure_store = StructureStore::new(state.db());
    let construction_store = ConstructionStore::new(state.db());

    let storage = settlement_store.get_storage(settlement.id).await?;
    let population = settlement_store.get_population(settlement.id).await?;
    let capacity = population_capacity(&structure_store, settlement.id).await?;
    let queue = construction_store.queue_for_settlement(settlement.id).await?;
    let world_id = WorldStore::new(state.db()).world_id_for_tile(settlement.tile_id).await?;
    let disasters = DisasterStore::new(state.db()).active_by_world(world_id).await?;

    send_event(
        socket,
        &OutboundEvent::GameState {
            settlement_id: settlement.id,
            resources: storage.amounts,
            population_current: population.current,
            population_capacity: capacity,
            constructions: queue.iter().filter(|e| !e.status.is_terminal()).map(|e| e.id).collect(),
            active_disasters: disasters.iter().map(|d| d.id).collect(),
            timestamp: Utc::now(),
        },
    )
    .await
    .map_err(|err| ApiError::Internal(err.to_string()))
}

async fn send_resources_data(
    socket: &mut WebSocket,
    state: &AppState,
    session: &Session,
) -> Result<(), ApiError> {
    let settlement = current_settlement(session)?;
    let storage = SettlementStore::new(state.db()).get_storage(settlement.id).await?;

    send_event(
        socket,
        &OutboundEvent::ResourcesData {
            settlement_id: settlement.id,
            resources: storage.amounts,
            capacity: storage.capacity,
            timestamp: Utc::now(),
        },
    )
    .await
    .map_err(|err| ApiError::Internal(err.to_string()))
}

async fn send_construction_state(
    socket: &mut WebSocket,
    state: &AppState,
    session: &Session,
) -> Result<(), ApiError> {
    let settlement = current_settlement(session)?;
    let queue = ConstructionStore::new(state.db()).queue_for_settlement(settlement.id).await?;

    send_event(
        socket,
        &OutboundEvent::ConstructionState {
            settlement_id: settlement.id,
            entries: queue.iter().filter(|e| !e.status.is_terminal()).map(|e| e.id).collect(),
            timestamp: Utc::now(),
        },
    )
    .await
    .map_err(|err| ApiError::Internal(err.to_string()))
}

/// The `population_capacity` modifier aggregate, read from the
/// structure-derived modifier cache (`SettlementPopulation` carries no
/// capacity field of its own).
async fn population_capacity(
    structure_store: &StructureStore<'_>,
    settlement_id: SettlementId,
) -> Result<u32, ApiError> {
    let modifiers = structure_store.modifiers_for_settlement(settlement_id).await?;
    let capacity = modifiers
        .iter()
        .find(|modifier| modifier.modifier_type == "population_capacity")
        .map_or(Decimal::ZERO, |modifier| modifier.total_value);
    Ok(capacity.round().to_u32().unwrap_or(0))
}

/// Enqueue a build onto the construction queue. `emergency` selects
/// between `build-structure` (normal, `false`) and `start-construction`
/// (2.5x cost, AFTERMATH-gated, `true`).
async fn enqueue_construction(
    state: &AppState,
    session: &Session,
    structure_def_id: StructureDefId,
    tile_id: Option<TileId>,
    slot_position: Option<u8>,
    emergency: bool,
) -> Result<(), ApiError> {
    // A queue entry only carries `structure_kind`, not a tile/slot choice;
    // placement is validated again at completion time against whatever
    // slot is free then, so slot occupancy is not checked here.
    let _ = (tile_id, slot_position);
    let settlement = current_settlement(session)?;

    let defs = load_structure_defs(state).await?.defs;
    let def = defs
        .iter()
        .find(|def| def.id == structure_def_id)
        .cloned()
        .ok_or(ApiError::StructureNotFound)?;

    let structure_store = StructureStore::new(state.db());
    let construction_store = ConstructionStore::new(state.db());
    let settlement_store = SettlementStore::new(state.db());

    let existing_structures = structure_store.structures_by_settlement(settlement.id).await?;
    let prerequisites = structure_store.prerequisites_for(structure_def_id).await?;
    let requirements = structure_store.requirements_for(structure_def_id).await?;
    let existing_entries = construction_store.queue_for_settlement(settlement.id).await?;
    let storage = settlement_store.get_storage(settlement.id).await?;

    let defs_by_kind: BTreeMap<StructureKind, settlement_types::StructureDef> =
        defs.into_iter().map(|def| (def.kind, def)).collect();
    let town_hall_level = existing_structures
        .iter()
        .filter(|structure| structure.kind == StructureKind::TownHall)
        .map(|structure| structure.level)
        .max()
        .unwrap_or(0);

    // A build that could never legally complete (missing prerequisite,
    // duplicate unique, over the area budget, or below the TownHall tier
    // gate) is rejected before any resources move, not caught at
    // completion time after the player has already paid for it.
    service::build(&BuildRequest {
        def: &def,
        prerequisites: &prerequisites,
        existing_structures: &existing_structures,
        structure_defs: &defs_by_kind,
        area_budget: area_budget_for(settlement.tier),
        town_hall_level,
        tile_id: None,
        slot_position: None,
        settlement_id: settlement.id,
        now: Utc::now(),
    })?;
    let workshop_bonus = structure_store
        .modifiers_for_settlement(settlement.id)
        .await?
        .into_iter()
        .find(|modifier| modifier.modifier_type == "construction_speed_bonus")
        .map_or(Decimal::ZERO, |modifier| modifier.total_value);

    let aftermath = if emergency { aftermath_active(state, &settlement).await? } else { false };
    let now = Utc::now();

    let outcome = queue::enqueue(&EnqueueRequest {
        settlement_id: settlement.id,
        structure_def_id,
        structure_kind: def.kind,
        requirements: &requirements,
        construction_time_seconds: def.construction_time_seconds,
        storage: &storage.amounts,
        existing_entries: &existing_entries,
        workshop_bonus,
        emergency,
        aftermath_active: aftermath,
        now,
    })?;

    let mut remaining = storage.amounts;
    debit(&mut remaining, &outcome.cost);
    settlement_store.update_storage(settlement.id, &remaining, now).await?;
    construction_store.enqueue(&outcome.entry).await?;
    record_construction_ledger(state, settlement.id, outcome.entry.id, &outcome.cost, false).await?;

    let event = if outcome.entry.status == ConstructionStatus::InProgress {
        OutboundEvent::ConstructionStarted {
            settlement_id: settlement.id,
            project_id: outcome.entry.id,
            timestamp: now,
        }
    } else {
        OutboundEvent::ConstructionQueued {
            settlement_id: settlement.id,
            project_id: outcome.entry.id,
            position: outcome.entry.position,
            timestamp: now,
        }
    };
    state.registry.publish(&RoomKey::Settlement(settlement.id), event);

    Ok(())
}

async fn cancel_construction(
    state: &AppState,
    session: &Session,
    project_id: ConstructionId,
) -> Result<(), ApiError> {
    let settlement = current_settlement(session)?;
    let construction_store = ConstructionStore::new(state.db());
    let mut entries = construction_store.queue_for_settlement(settlement.id).await?;

    let entry = entries
        .iter_mut()
        .find(|entry| entry.id == project_id)
        .ok_or(ApiError::ConstructionNotFound)?;
    let refund = queue::cancel(entry)?;
    queue::compact_positions(&mut entries);

    for entry in &entries {
        construction_store.update_entry(entry).await?;
    }

    let settlement_store = SettlementStore::new(state.db());
    let mut storage = settlement_store.get_storage(settlement.id).await?;
    for (&resource, &amount) in &refund {
        let stored = storage.amounts.entry(resource).or_insert(0);
        *stored = stored.saturating_add(amount);
    }
    let now = Utc::now();
    settlement_store.update_storage(settlement.id, &storage.amounts, now).await?;
    record_construction_ledger(state, settlement.id, project_id, &refund, true).await?;

    state.registry.publish(
        &RoomKey::Settlement(settlement.id),
        OutboundEvent::ConstructionCancelled {
            settlement_id: settlement.id,
            project_id,
            refunded: refund,
            timestamp: now,
        },
    );

    Ok(())
}

async fn upgrade_structure(
    state: &AppState,
    session: &Session,
    structure_id: StructureId,
) -> Result<(), ApiError> {
    let settlement = current_settlement(session)?;
    let structure_store = StructureStore::new(state.db());

    let mut structure = structure_store
        .get_structure(structure_id)
        .await
        .map_err(|err| not_found_or(err, ApiError::StructureNotFound))?;
    if structure.settlement_id != settlement.id {
        return Err(ApiError::NotSettlementOwner);
    }

    let defs = load_structure_defs(state).await?.defs;
    let def = defs.into_iter().find(|def| def.kind == structure.kind).ok_or(ApiError::StructureNotFound)?;

    let requirements = structure_store.requirements_for(def.id).await?;
    let cost = settlement_construction::cost::compute_cost(&requirements, false)?;
    let settlement_store = SettlementStore::new(state.db());
    let mut storage = settlement_store.get_storage(settlement.id).await?;
    let shortfall = settlement_construction::cost::shortages(&storage.amounts, &cost);
    if !shortfall.is_empty() {
        return Err(ApiError::InsufficientResources(shortfall));
    }

    let now = Utc::now();
    service::upgrade(&mut structure, &def, now)?;
    debit(&mut storage.amounts, &cost);
    settlement_store.update_storage(settlement.id, &storage.amounts, now).await?;
    structure_store.update_structure(&structure).await?;

    for modifier_type in settlement_structures::modifiers::affected_modifier_types(&structure) {
        recompute_modifier(&structure_store, settlement.id, modifier_type, structure.updated_at).await?;
    }

    state.registry.publish(
        &RoomKey::Settlement(settlement.id),
        OutboundEvent::StructureUpgraded {
            settlement_id: settlement.id,
            structure_id,
            new_level: structure.level,
            timestamp: now,
        },
    );

    Ok(())
}

/// Record a construction debit or refund to the append-only ledger under
/// a `tick = 0` sentinel: these movements happen off the tick clock in
/// direct response to a client command, so they are excluded from every
/// real tick's conservation check but still balance on their own.
async fn record_construction_ledger(
    state: &AppState,
    settlement_id: SettlementId,
    construction_id: ConstructionId,
    amounts: &ResourceAmounts,
    refund: bool,
) -> Result<(), ApiError> {
    let mut ledger = Ledger::new();
    for (&resource, &quantity) in amounts {
        if quantity == 0 {
            continue;
        }
        let params = ConstructionTransferParams {
            tick: 0,
            resource,
            quantity,
            settlement: settlement_id.into_inner(),
            construction: construction_id.into_inner(),
        };
        let result =
            if refund { ledger.record_construction_refund(0, params) } else { ledger.record_construction_debit(0, params) };
        result.map_err(|err| ApiError::Internal(err.to_string()))?;
    }

    if ledger.is_empty() {
        return Ok(());
    }
    LedgerStore::new(state.db()).batch_insert(ledger.all_entries()).await?;
    Ok(())
}

/// Serialize and send one outbound event as a text frame.
async fn send_event(socket: &mut WebSocket, event: &OutboundEvent) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(err) => {
            warn!("failed to serialize outbound event: {err}");
            return Ok(());
        }
    };
    socket.send(Message::Text(json.into())).await
}

/// Send an error envelope directly to the socket, logging (not
/// propagating) a send failure since the caller is already on the error
/// path.
async fn send_error(socket: &mut WebSocket, err: &ApiError) {
    let envelope: ErrorEnvelope = err.envelope();
    if let Ok(json) = serde_json::to_string(&envelope) {
        if socket.send(Message::Text(json.into())).await.is_err() {
            debug!("failed to deliver error envelope, client likely disconnected");
        }
    }
}
