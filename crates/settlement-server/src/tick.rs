//! The per-tick orchestration loop.
//!
//! [`run_tick`] loads every `Ready` world's dirty settlements and active
//! disasters, runs them through `settlement_core::driver`'s pure
//! functions, persists the results in per-settlement updates, and
//! publishes the resulting events through the broadcast registry. The
//! driver crate does no I/O of its own; this module is the caller it
//! names in its own doc comments.

use std::cell::RefCell;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use settlement_core::config::SimulationConfig;
use settlement_core::driver::{self, ExtractorGroup, SettlementTickInput};
use settlement_db::{
    ConstructionStore, DisasterStore, LedgerStore, SettlementStore, StructureStore, WorldStore,
};
use settlement_disaster::damage;
use settlement_disaster::engine::{self, Transition};
use settlement_economy::{population, production};
use settlement_events::BroadcastRegistry;
use settlement_ledger::Ledger;
use settlement_structures::{service, BuildRequest};
use settlement_types::{
    Biome, BiomeKind, ConstructionStatus, DisasterEvent, DisasterHistory, DisasterHistoryId,
    DisasterId, DisasterStatus, OutboundEvent, Resource, ResourceAmounts, Settlement,
    SettlementId, SettlementPopulation, SettlementStructure, SettlementTier, StructureCategory,
    StructureDef, StructureKind, Tile, WorldId, WorldStatus,
};
use sqlx::PgPool;

use crate::error::EngineError;

/// Borrowed handles the tick loop needs for the duration of one tick.
pub struct TickContext<'a> {
    /// The database connection pool.
    pub pool: &'a PgPool,
    /// The loaded simulation config (tick rates, world defaults).
    pub config: &'a SimulationConfig,
    /// The event broadcast registry, shared with the HTTP server.
    pub registry: &'a BroadcastRegistry,
    /// Per-settlement casualty/resource-loss totals accumulated across a
    /// disaster's IMPACT phase, consumed into a `DisasterHistory` row when
    /// it reaches AFTERMATH. Lives for the process's whole tick loop, not
    /// just one tick, since IMPACT commonly spans many ticks.
    disaster_totals: RefCell<BTreeMap<(SettlementId, DisasterId), DisasterDamageTotals>>,
}

impl<'a> TickContext<'a> {
    /// Build a tick context with an empty disaster-totals accumulator.
    #[must_use]
    pub fn new(pool: &'a PgPool, config: &'a SimulationConfig, registry: &'a BroadcastRegistry) -> Self {
        Self {
            pool,
            config,
            registry,
            disaster_totals: RefCell::new(BTreeMap::new()),
        }
    }
}

/// Casualties and resources lost to one disaster, accumulated tick by
/// tick across the whole IMPACT phase.
#[derive(Debug, Clone, Default)]
struct DisasterDamageTotals {
    casualties: u32,
    resources_lost: ResourceAmounts,
}

/// Run one full tick: every `Ready` world's economy, construction, and
/// disaster phases.
///
/// # Errors
///
/// Returns [`EngineError`] if a database operation or driver computation
/// fails. A single settlement's failure is caught and marked `errored`
/// rather than aborting the whole tick; only infrastructure failures
/// (connection loss, a world/structure-def load failing) propagate.
pub async fn run_tick(ctx: &TickContext<'_>, tick: u64, now: DateTime<Utc>) -> Result<(), EngineError> {
    let world_store = WorldStore::new(ctx.pool);
    let structure_store = StructureStore::new(ctx.pool);

    let worlds = world_store.list_worlds().await?;
    let biomes = world_store.all_biomes().await?;
    let biomes_by_kind: BTreeMap<BiomeKind, Biome> =
        biomes.into_iter().map(|biome| (biome.kind, biome)).collect();
    let defs = structure_store.all_structure_defs().await?;
    let defs_by_kind: BTreeMap<StructureKind, StructureDef> =
        defs.into_iter().map(|def| (def.kind, def)).collect();

    for world in worlds.into_iter().filter(|world| world.status == WorldStatus::Ready) {
        run_world_tick(ctx, &world, tick, now, &biomes_by_kind, &defs_by_kind).await?;
    }

    Ok(())
}

/// Seed a disaster-scheduling RNG for one world's tick.
///
/// Combines the world's own noise seed (so two worlds with the same
/// generation seed don't draw identical disasters) with the tick counter
/// (so the same world's draw varies tick to tick), matching
/// `schedule::select_disaster_type`'s requirement for a seeded,
/// reproducible RNG rather than thread-local randomness.
fn world_disaster_rng(world_seed: u64, tick: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(world_seed ^ tick.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// The area budget for a tier: 50 base, +50 per tier level above 1.
/// Mirrors `settlement-api`'s own direct-build path so a completed queue
/// entry validates identically to an admin-built structure.
const fn area_budget_for(tier: SettlementTier) -> u32 {
    50 + 50 * (tier.as_level() as u32 - 1)
}

async fn run_world_tick(
    ctx: &TickContext<'_>,
    world: &settlement_types::World,
    tick: u64,
    now: DateTime<Utc>,
    biomes_by_kind: &BTreeMap<BiomeKind, Biome>,
    defs_by_kind: &BTreeMap<StructureKind, StructureDef>,
) -> Result<(), EngineError> {
    let world_id = world.id;
    let settlement_store = SettlementStore::new(ctx.pool);
    let structure_store = StructureStore::new(ctx.pool);
    let construction_store = ConstructionStore::new(ctx.pool);
    let disaster_store = DisasterStore::new(ctx.pool);
    let ledger_store = LedgerStore::new(ctx.pool);
    let world_store = WorldStore::new(ctx.pool);

    let settlements = settlement_store.dirty_settlements(world_id).await?;
    if settlements.is_empty() {
        return Ok(());
    }

    let mut ledger = Ledger::new();
    let production_config = production::ProductionConfig::default();
    let population_config = population::PopulationConfig::default();
    let tick_seconds = ctx.config.tick.tick_interval().as_secs_f64();
    let hours_elapsed = Decimal::ONE / (Decimal::from(ctx.config.tick.tick_hz.max(1)) * Decimal::from(3600));
    let world_multiplier = percent_to_decimal(ctx.config.world.world_multiplier_percent);

    let disasters = disaster_store.active_by_world(world_id).await?;
    let impacting: Vec<&DisasterEvent> =
        disasters.iter().filter(|event| event.status == DisasterStatus::Impact).collect();

    let mut in_progress: Vec<(SettlementId, settlement_types::ConstructionQueueEntry)> = Vec::new();
    let mut tiles_by_settlement: BTreeMap<SettlementId, Tile> = BTreeMap::new();

    for settlement in &settlements {
        let tile = match world_store.get_tile(settlement.tile_id).await {
            Ok(tile) => tile,
            Err(err) => {
                tracing::error!(settlement_id = %settlement.id, error = %err, "failed to load tile, skipping settlement this tick");
                continue;
            }
        };
        tiles_by_settlement.insert(settlement.id, tile.clone());
        let structures = structure_store.structures_by_settlement(settlement.id).await?;
        let modifiers = structure_store.modifiers_for_settlement(settlement.id).await?;

        let disaster_impacts: Vec<production::DisasterImpact> = impacting
            .iter()
            .filter(|event| disaster_affects_tile(event, &tile))
            .map(|event| production::DisasterImpact {
                disaster_type: event.disaster_type,
                severity: event.severity_level,
            })
            .collect();

        if let Err(err) = tick_settlement_economy(
            ctx,
            &settlement_store,
            settlement,
            &structures,
            &tile,
            biomes_by_kind,
            &modifiers,
            &disaster_impacts,
            &production_config,
            &population_config,
            world_multiplier,
            hours_elapsed,
            world_id,
            tick,
            now,
            &mut ledger,
        )
        .await
        {
            tracing::error!(settlement_id = %settlement.id, error = %err, "economy tick failed, marking settlement errored");
            settlement_store.set_errored(settlement.id, true).await?;
            continue;
        }

        if let Err(err) = tick_settlement_construction(
            &construction_store,
            &structure_store,
            settlement,
            &tile,
            &modifiers,
            defs_by_kind,
            ctx.registry,
            now,
            &mut in_progress,
        )
        .await
        {
            tracing::error!(settlement_id = %settlement.id, error = %err, "construction tick failed, marking settlement errored");
            settlement_store.set_errored(settlement.id, true).await?;
            continue;
        }

        if let Err(err) = apply_disaster_damage(
            ctx,
            &structure_store,
            &settlement_store,
            settlement,
            &tile,
            &impacting,
            &modifiers,
            tick_seconds,
            tick,
            now,
            &mut ledger,
        )
        .await
        {
            tracing::error!(settlement_id = %settlement.id, error = %err, "disaster damage tick failed, marking settlement errored");
            settlement_store.set_errored(settlement.id, true).await?;
            continue;
        }
    }

    let progress_input: Vec<(SettlementId, &settlement_types::ConstructionQueueEntry)> =
        in_progress.iter().map(|(id, entry)| (*id, entry)).collect();
    if let Some(batch) = driver::coalesce_construction_progress(world_id, &progress_input, now) {
        ctx.registry.publish(&batch.room(world_id, None), batch);
    }

    // At most one disaster is ever in flight per world: only roll for a
    // new one while none is currently scheduled/warning/impacting/in
    // aftermath.
    if disasters.is_empty() {
        let mut settled_biomes: Vec<BiomeKind> = tiles_by_settlement.values().map(|tile| tile.biome).collect();
        settled_biomes.sort_unstable();
        settled_biomes.dedup();
        if let Some(&biome) = settled_biomes.get((tick as usize) % settled_biomes.len().max(1)) {
            let mut rng = world_disaster_rng(world.elevation_noise.seed, tick);
            if let Some(new_disaster) = driver::maybe_schedule_disaster(
                world_id,
                biome,
                world.template.disaster_frequency,
                world.template.disaster_severity,
                tick_seconds,
                &mut rng,
                now,
            ) {
                disaster_store.insert_disaster(&new_disaster).await?;
            }
        }
    }

    for mut event in disasters {
        advance_world_disaster(
            ctx,
            &disaster_store,
            &structure_store,
            &settlement_store,
            &settlements,
            &tiles_by_settlement,
            &mut event,
            now,
            world_id,
        )
        .await?;
    }

    let entries: Vec<settlement_types::LedgerEntry> =
        ledger.entries_for_tick(tick).into_iter().cloned().collect();
    ledger_store.batch_insert(&entries).await?;

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn tick_settlement_economy(
    ctx: &TickContext<'_>,
    settlement_store: &SettlementStore<'_>,
    settlement: &Settlement,
    structures: &[SettlementStructure],
    tile: &Tile,
    biomes_by_kind: &BTreeMap<BiomeKind, Biome>,
    modifiers: &[settlement_types::SettlementModifier],
    disaster_impacts: &[production::DisasterImpact],
    production_config: &production::ProductionConfig,
    population_config: &population::PopulationConfig,
    world_multiplier: Decimal,
    hours_elapsed: Decimal,
    world_id: WorldId,
    tick: u64,
    now: DateTime<Utc>,
    ledger: &mut Ledger,
) -> Result<(), EngineError> {
    let storage = settlement_store.get_storage(settlement.id).await?;
    let population = settlement_store.get_population(settlement.id).await?;
    let population_capacity_modifier = modifier_total_u32(modifiers, "population_capacity");
    let extractor_groups = build_extractor_groups(structures, tile, biomes_by_kind);

    let input = SettlementTickInput {
        settlement_id: settlement.id,
        tier: settlement.tier,
        storage: storage.amounts.clone(),
        capacity: storage.capacity.clone(),
        population: population.current,
        population_capacity_modifier,
        trauma_ticks_remaining: population.trauma_ticks_remaining,
        extractor_groups,
        disaster_impacts: disaster_impacts.to_vec(),
    };

    let outcome = driver::run_economy(
        &input,
        production_config,
        population_config,
        1,
        hours_elapsed,
        world_multiplier,
        now,
    )?;

    record_production_and_waste(ledger, tick, world_id, settlement.id, &outcome.events);

    settlement_store.update_storage(settlement.id, &outcome.storage, now).await?;
    settlement_store
        .update_population(&SettlementPopulation {
            settlement_id: settlement.id,
            current: outcome.population,
            happiness: outcome.happiness,
            last_growth_at: now,
            trauma_ticks_remaining: population.trauma_ticks_remaining.saturating_sub(1),
        })
        .await?;

    for event in outcome.events {
        let room = event.room(world_id, Some(settlement.id));
        ctx.registry.publish(&room, event);
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn tick_settlement_construction(
    construction_store: &ConstructionStore<'_>,
    structure_store: &StructureStore<'_>,
    settlement: &Settlement,
    tile: &Tile,
    modifiers: &[settlement_types::SettlementModifier],
    defs_by_kind: &BTreeMap<StructureKind, StructureDef>,
    registry: &BroadcastRegistry,
    now: DateTime<Utc>,
    in_progress: &mut Vec<(SettlementId, settlement_types::ConstructionQueueEntry)>,
) -> Result<(), EngineError> {
    let mut entries = construction_store.active_for_settlement(settlement.id).await?;
    if entries.is_empty() {
        return Ok(());
    }

    let workshop_bonus = modifier_total_decimal(modifiers, "construction_speed_bonus");
    let next_seconds = entries
        .iter()
        .filter(|entry| entry.status == ConstructionStatus::Queued)
        .min_by_key(|entry| entry.position)
        .and_then(|entry| defs_by_kind.get(&entry.structure_kind))
        .map_or(3600, |def| def.construction_time_seconds);

    let advance = driver::advance_construction(&mut entries, next_seconds, workshop_bonus, now)?;

    let mut structures = structure_store.structures_by_settlement(settlement.id).await?;
    let mut completed_ids = Vec::new();

    for completed_id in &advance.completed {
        let Some(entry) = entries.iter().find(|entry| entry.id == *completed_id).cloned() else {
            continue;
        };
        let Some(def) = defs_by_kind.get(&entry.structure_kind) else {
            continue;
        };

        let placement = match def.category {
            StructureCategory::Building => Some((None, None)),
            StructureCategory::Extractor => {
                find_free_slot(tile, &structures).map(|slot| (Some(tile.id), Some(slot)))
            }
        };
        let Some((placement_tile, slot_position)) = placement else {
            tracing::warn!(
                settlement_id = %settlement.id,
                structure_kind = ?entry.structure_kind,
                "no free tile slot for completed extractor, deferring to next tick"
            );
            continue;
        };

        let prerequisites = structure_store.prerequisites_for(def.id).await?;
        let town_hall_level = structures
            .iter()
            .filter(|structure| structure.kind == StructureKind::TownHall)
            .map(|structure| structure.level)
            .max()
            .unwrap_or(0);

        let built = service::build(&BuildRequest {
            def,
            prerequisites: &prerequisites,
            existing_structures: &structures,
            structure_defs: defs_by_kind,
            area_budget: area_budget_for(settlement.tier),
            town_hall_level,
            tile_id: placement_tile,
            slot_position,
            settlement_id: settlement.id,
            now,
        })?;

        structure_store.insert_structure(&built).await?;
        structures.push(built.clone());

        for modifier_type in settlement_structures::modifiers::affected_modifier_types(&built) {
            let refreshed = structure_store.structures_by_settlement(settlement.id).await?;
            let modifier =
                settlement_structures::modifiers::recompute(settlement.id, modifier_type, &refreshed, now)?;
            structure_store.upsert_modifier(&modifier).await?;
        }

        registry.publish(
            &settlement_types::RoomKey::Settlement(settlement.id),
            OutboundEvent::ConstructionComplete {
                settlement_id: settlement.id,
                project_id: entry.id,
                structure_id: built.id,
                timestamp: now,
            },
        );
        registry.publish(
            &settlement_types::RoomKey::Settlement(settlement.id),
            OutboundEvent::StructureBuilt {
                settlement_id: settlement.id,
                structure_id: built.id,
                kind: built.kind,
                timestamp: now,
            },
        );
        completed_ids.push(entry.id);
    }

    for entry in &entries {
        if completed_ids.contains(&entry.id) {
            construction_store.delete_entry(entry.id).await?;
        } else {
            construction_store.update_entry(entry).await?;
        }
        if entry.status == ConstructionStatus::InProgress && !completed_ids.contains(&entry.id) {
            in_progress.push((settlement.id, entry.clone()));
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn apply_disaster_damage(
    ctx: &TickContext<'_>,
    structure_store: &StructureStore<'_>,
    settlement_store: &SettlementStore<'_>,
    settlement: &Settlement,
    tile: &Tile,
    impacting: &[&DisasterEvent],
    modifiers: &[settlement_types::SettlementModifier],
    tick_seconds: f64,
    tick: u64,
    now: DateTime<Utc>,
    ledger: &mut Ledger,
) -> Result<(), EngineError> {
    let registry = ctx.registry;
    let affecting: Vec<&&DisasterEvent> =
        impacting.iter().filter(|event| disaster_affects_tile(event, tile)).collect();
    if affecting.is_empty() {
        return Ok(());
    }

    let resistance = modifier_total_decimal(modifiers, "disaster_structure_resistance");
    let shelter_reduction = modifier_total_decimal(modifiers, "disaster_casualty_reduction");
    let population = settlement_store.get_population(settlement.id).await?;
    let mut structures = structure_store.structures_by_settlement(settlement.id).await?;
    let mut casualties_total = 0u32;

    for event in affecting {
        let loss = damage::structure_health_loss(
            event.severity_level,
            event.impact_duration_seconds,
            tick_seconds.max(1.0).round() as u32,
            resistance,
        )?;
        for structure in &mut structures {
            let before = structure.health;
            structure.health = structure.health.saturating_sub(loss);
            structure.damaged_at = Some(now);
            structure_store.update_structure(structure).await?;

            if structure.health == 0 && before > 0 {
                registry.publish(
                    &settlement_types::RoomKey::Settlement(settlement.id),
                    OutboundEvent::StructureDestroyed {
                        settlement_id: settlement.id,
                        structure_id: structure.id,
                        tile_id: structure.tile_id,
                        timestamp: now,
                    },
                );
            } else if loss > 0 {
                registry.publish(
                    &settlement_types::RoomKey::Settlement(settlement.id),
                    OutboundEvent::StructureDamaged {
                        settlement_id: settlement.id,
                        structure_id: structure.id,
                        health_after: structure.health,
                        timestamp: now,
                    },
                );
            }
        }

        let casualties = damage::casualties(
            population.current,
            event.severity_level,
            event.impact_duration_seconds,
            tick_seconds.max(1.0).round() as u32,
            shelter_reduction,
            population.happiness,
        )?;
        casualties_total = casualties_total.saturating_add(casualties);

        let mut totals = ctx.disaster_totals.borrow_mut();
        let running = totals.entry((settlement.id, event.id)).or_default();
        running.casualties = running.casualties.saturating_add(casualties);
        drop(totals);

        if let Some(loss) = resource_loss_for(event.severity_level) {
            let mut storage = settlement_store.get_storage(settlement.id).await?;
            for (resource, amount) in loss {
                let current = storage.amounts.get(&resource).copied().unwrap_or(0);
                let lost = current.min(amount);
                if lost == 0 {
                    continue;
                }
                storage.amounts.insert(resource, current - lost);
                let void = uuid::Uuid::now_v7();
                ledger.record_disaster_loss(
                    tick,
                    resource,
                    lost,
                    settlement.id.into(),
                    void,
                    event.id.into(),
                )?;

                let mut totals = ctx.disaster_totals.borrow_mut();
                let running = totals.entry((settlement.id, event.id)).or_default();
                let current_lost = running.resources_lost.get(&resource).copied().unwrap_or(0);
                running.resources_lost.insert(resource, current_lost + lost);
            }
            settlement_store.update_storage(settlement.id, &storage.amounts, now).await?;
        }
    }

    if casualties_total > 0 {
        let new_population = population.current.saturating_sub(casualties_total);
        settlement_store
            .update_population(&SettlementPopulation {
                settlement_id: settlement.id,
                current: new_population,
                happiness: population.happiness,
                last_growth_at: population.last_growth_at,
                trauma_ticks_remaining: population.trauma_ticks_remaining,
            })
            .await?;
        registry.publish(
            &settlement_types::RoomKey::Settlement(settlement.id),
            OutboundEvent::CasualtiesReport {
                settlement_id: settlement.id,
                casualties: casualties_total,
                timestamp: now,
            },
        );
    }

    Ok(())
}

/// Disasters carry no direct resource-loss table; a moderate-or-worse
/// disaster depletes a small, fixed fraction of food and water storage,
/// consistent with the production-side `disaster_modifier` floor of 0.1
/// (a disaster this severe can wipe out up to 90% of output but never
/// all of it).
fn resource_loss_for(severity: settlement_types::SeverityLevel) -> Option<Vec<(Resource, u32)>> {
    use settlement_types::SeverityLevel;
    match severity {
        SeverityLevel::Mild => None,
        SeverityLevel::Moderate => Some(vec![(Resource::Food, 5), (Resource::Water, 5)]),
        SeverityLevel::Major => Some(vec![(Resource::Food, 15), (Resource::Water, 15)]),
        SeverityLevel::Catastrophic => Some(vec![(Resource::Food, 30), (Resource::Water, 30)]),
    }
}

#[allow(clippy::too_many_arguments)]
async fn advance_world_disaster(
    ctx: &TickContext<'_>,
    disaster_store: &DisasterStore<'_>,
    structure_store: &StructureStore<'_>,
    settlement_store: &SettlementStore<'_>,
    settlements: &[Settlement],
    tiles_by_settlement: &BTreeMap<SettlementId, Tile>,
    event: &mut DisasterEvent,
    now: DateTime<Utc>,
    world_id: WorldId,
) -> Result<(), EngineError> {
    let transition = driver::advance_disaster(event, now)?;
    if transition == Transition::None {
        return Ok(());
    }

    disaster_store.update_disaster(event).await?;

    let affected_settlements: Vec<&Settlement> = settlements
        .iter()
        .filter(|settlement| {
            tiles_by_settlement.get(&settlement.id).is_some_and(|tile| disaster_affects_tile(event, tile))
        })
        .collect();

    match transition {
        Transition::EnterAftermath => {
            for settlement in &affected_settlements {
                let totals = ctx.disaster_totals.borrow_mut().remove(&(settlement.id, event.id));
                let Some(totals) = totals else { continue };

                let structures = structure_store.structures_by_settlement(settlement.id).await?;
                let structures_damaged =
                    structures.iter().filter(|structure| structure.health > 0 && structure.health < 100).count()
                        as u32;
                let structures_destroyed =
                    structures.iter().filter(|structure| structure.health == 0).count() as u32;

                let history = DisasterHistory {
                    id: DisasterHistoryId::new(),
                    settlement_id: settlement.id,
                    disaster_id: event.id,
                    casualties: totals.casualties,
                    structures_damaged,
                    structures_destroyed,
                    resources_lost: totals.resources_lost,
                    resilience_gained: 0,
                    created_at: now,
                };
                disaster_store.insert_history(&history).await?;
            }
        }
        Transition::EnterResolved => {
            for settlement in &affected_settlements {
                let gain = engine::resilience_gain(event.severity_level);
                let new_resilience = settlement.resilience.saturating_add(gain).min(100);
                settlement_store
                    .update_tier_and_resilience(settlement.id, settlement.tier, new_resilience, now)
                    .await?;
            }
        }
        _ => {}
    }

    let room = settlement_types::RoomKey::World(world_id);
    let outbound = match transition {
        Transition::None => return Ok(()),
        Transition::EnterWarning => OutboundEvent::DisasterWarning {
            disaster_id: event.id,
            disaster_type: event.disaster_type,
            time_remaining_seconds: (event.scheduled_at - now).num_seconds().max(0) as u32,
            timestamp: now,
        },
        Transition::ImminentWarning => OutboundEvent::DisasterImminent { disaster_id: event.id, timestamp: now },
        Transition::EnterImpact => {
            OutboundEvent::DisasterImpactStart { disaster_id: event.id, timestamp: now }
        }
        Transition::EnterAftermath => OutboundEvent::DisasterAftermath {
            disaster_id: event.id,
            emergency_repair_discount: true,
            timestamp: now,
        },
        Transition::EnterResolved => OutboundEvent::DisasterResolved { disaster_id: event.id, timestamp: now },
    };
    ctx.registry.publish(&room, outbound);

    Ok(())
}

fn disaster_affects_tile(event: &DisasterEvent, tile: &Tile) -> bool {
    if let Some(region) = event.affected_region {
        return region == tile.region_id;
    }
    if !event.affected_biomes.is_empty() {
        return event.affected_biomes.contains(&tile.biome);
    }
    true
}

fn build_extractor_groups(
    structures: &[SettlementStructure],
    tile: &Tile,
    biomes_by_kind: &BTreeMap<BiomeKind, Biome>,
) -> Vec<ExtractorGroup> {
    let mut groups: BTreeMap<Resource, Vec<production::ExtractorContribution>> = BTreeMap::new();

    for structure in structures {
        let Some(resource) = structure.kind.produces() else { continue };
        let tile_quality = tile_quality_for(tile, resource);
        let biome_efficiency = biomes_by_kind
            .get(&tile.biome)
            .and_then(|biome| biome.resource_modifiers.get(&resource).copied())
            .unwrap_or(Decimal::ONE);

        groups.entry(resource).or_default().push(production::ExtractorContribution {
            level: structure.level,
            health: Some(structure.health),
            tile_quality,
            biome_efficiency,
            base_production_modifier: tile.base_production_modifier,
        });
    }

    groups
        .into_iter()
        .map(|(resource, contributions)| ExtractorGroup { resource, contributions })
        .collect()
}

const fn tile_quality_for(tile: &Tile, resource: Resource) -> u8 {
    match resource {
        Resource::Food => tile.food_quality,
        Resource::Water => tile.water_quality,
        Resource::Wood => tile.wood_quality,
        Resource::Stone => tile.stone_quality,
        Resource::Ore => tile.ore_quality,
    }
}

fn find_free_slot(tile: &Tile, structures: &[SettlementStructure]) -> Option<u8> {
    let occupied: Vec<u8> = structures
        .iter()
        .filter(|structure| structure.tile_id == Some(tile.id))
        .filter_map(|structure| structure.slot_position)
        .collect();
    (0..tile.plot_slots).find(|slot| !occupied.contains(slot))
}

fn modifier_total_u32(modifiers: &[settlement_types::SettlementModifier], modifier_type: &str) -> u32 {
    modifiers
        .iter()
        .find(|modifier| modifier.modifier_type == modifier_type)
        .map_or(0, |modifier| modifier.total_value.round().to_u32().unwrap_or(0))
}

fn modifier_total_decimal(modifiers: &[settlement_types::SettlementModifier], modifier_type: &str) -> Decimal {
    modifiers
        .iter()
        .find(|modifier| modifier.modifier_type == modifier_type)
        .map_or(Decimal::ZERO, |modifier| modifier.total_value)
}

fn percent_to_decimal(percent: u32) -> Decimal {
    Decimal::from(percent) / Decimal::from(100)
}

/// Record ledger movements for this tick's production/waste from the
/// events `run_economy` already computed, rather than diffing storage
/// (a diff can't distinguish waste from concurrent consumption).
fn record_production_and_waste(
    ledger: &mut Ledger,
    tick: u64,
    world_id: WorldId,
    settlement_id: SettlementId,
    events: &[OutboundEvent],
) {
    for event in events {
        match event {
            OutboundEvent::ResourceProduction { produced, .. } => {
                for (&resource, &quantity) in produced {
                    if let Err(err) = ledger.record_production(
                        tick,
                        resource,
                        quantity,
                        world_id.into(),
                        settlement_id.into(),
                    ) {
                        tracing::error!(%err, "failed to record production ledger entry");
                    }
                }
            }
            OutboundEvent::ResourceWaste { wasted, .. } => {
                for (&resource, &quantity) in wasted {
                    let void = uuid::Uuid::now_v7();
                    if let Err(err) =
                        ledger.record_waste(tick, resource, quantity, settlement_id.into(), void)
                    {
                        tracing::error!(%err, "failed to record waste ledger entry");
                    }
                }
            }
            _ => {}
        }
    }
}
