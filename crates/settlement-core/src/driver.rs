//! The game loop: the fixed-rate driver that orchestrates production,
//! population, construction promotion, and disaster advancement once per
//! tick.
//!
//! This crate has no database or event-transport dependency of its own.
//! [`run_economy`], [`advance_construction`], and [`advance_disaster`] are
//! pure functions: the caller loads a batch of dirty settlements, runs
//! them through these phases, persists the result in one transaction per
//! settlement, and hands the returned events to the broadcast registry.
//! This mirrors the per-settlement pure-function shape already used by
//! `settlement-economy` and `settlement-construction` -- the driver adds
//! orchestration on top, not a new style of calculation.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use settlement_construction::queue;
use settlement_disaster::engine::{self, Transition};
use settlement_disaster::schedule;
use settlement_economy::{population, production};
use settlement_types::{
    BiomeKind, ConstructionId, ConstructionProgress, ConstructionQueueEntry, ConstructionStatus,
    DisasterEvent, DisasterId, DisasterStatus, OutboundEvent, Resource, ResourceAmounts,
    SettlementId, SettlementTier, SeverityLevel, WorldId,
};

use crate::error::TickError;

/// The resources tracked by the production phase, in the order totals are
/// computed.
const PRODUCED_RESOURCES: [Resource; 5] = [
    Resource::Food,
    Resource::Water,
    Resource::Wood,
    Resource::Stone,
    Resource::Ore,
];

/// One extractor structure type's contributions toward one resource.
/// Duplicate suppression (highest level wins) applies within a group, not
/// across groups -- two different extractor types producing the same
/// resource both contribute.
#[derive(Debug, Clone)]
pub struct ExtractorGroup {
    /// The resource this group of extractors produces.
    pub resource: Resource,
    /// The individual extractors of this type, across the settlement.
    pub contributions: Vec<production::ExtractorContribution>,
}

/// Everything the economy phase needs for one settlement, already loaded
/// by the caller.
#[derive(Debug, Clone)]
pub struct SettlementTickInput {
    /// The settlement being ticked.
    pub settlement_id: SettlementId,
    /// The settlement's current tier, for population capacity baseline.
    pub tier: SettlementTier,
    /// Current resource storage.
    pub storage: ResourceAmounts,
    /// Current storage capacity per resource.
    pub capacity: ResourceAmounts,
    /// Current population.
    pub population: u32,
    /// Aggregated `population_capacity` structure modifier.
    pub population_capacity_modifier: u32,
    /// Ticks of decaying happiness trauma remaining from a past disaster.
    pub trauma_ticks_remaining: u32,
    /// Active extractors, grouped by structure type.
    pub extractor_groups: Vec<ExtractorGroup>,
    /// Disasters currently impacting this settlement's production.
    pub disaster_impacts: Vec<production::DisasterImpact>,
}

/// The result of running one settlement through the economy phase.
#[derive(Debug, Clone)]
pub struct SettlementTickOutcome {
    /// The settlement this outcome belongs to.
    pub settlement_id: SettlementId,
    /// Storage after production and any capacity overflow is applied.
    pub storage: ResourceAmounts,
    /// Population after growth, emigration, and starvation.
    pub population: u32,
    /// Happiness computed from the post-production storage.
    pub happiness: u8,
    /// The growth rate used this tick (for the `PopulationState` event).
    pub growth_rate: Decimal,
    /// Events to emit for this settlement.
    pub events: Vec<OutboundEvent>,
}

/// Run the production and population phases for one settlement.
///
/// # Errors
///
/// Returns [`TickError::Economy`] if any formula overflows.
pub fn run_economy(
    input: &SettlementTickInput,
    production_config: &production::ProductionConfig,
    population_config: &population::PopulationConfig,
    ticks: u32,
    hours_elapsed: Decimal,
    world_multiplier: Decimal,
    now: DateTime<Utc>,
) -> Result<SettlementTickOutcome, TickError> {
    let mut storage = input.storage.clone();
    let mut produced_total = ResourceAmounts::new();
    let mut wasted_total = ResourceAmounts::new();

    let mut groups_by_resource: BTreeMap<Resource, Vec<&ExtractorGroup>> = BTreeMap::new();
    for group in &input.extractor_groups {
        groups_by_resource.entry(group.resource).or_default().push(group);
    }

    for resource in PRODUCED_RESOURCES {
        let mut produced = 0u32;
        if let Some(groups) = groups_by_resource.get(&resource) {
            for group in groups {
                let amount = production::produced_amount(
                    production_config,
                    resource,
                    &group.contributions,
                    &input.disaster_impacts,
                    ticks,
                    world_multiplier,
                )?;
                produced = produced.saturating_add(amount);
            }
        }
        if produced == 0 {
            continue;
        }

        let current = storage.get(&resource).copied().unwrap_or(0);
        let capacity = input.capacity.get(&resource).copied().unwrap_or(0);
        let commit = production::commit_against_capacity(current, produced, capacity);
        storage.insert(resource, current.saturating_add(commit.committed));
        if commit.committed > 0 {
            produced_total.insert(resource, commit.committed);
        }
        if commit.wasted > 0 {
            wasted_total.insert(resource, commit.wasted);
        }
    }

    let capacity_total = population::capacity(input.tier, input.population_capacity_modifier);
    let happiness = population::happiness(
        &storage,
        input.population,
        population_config,
        input.trauma_ticks_remaining,
    );
    let food_available = storage.get(&Resource::Food).copied().unwrap_or(0);
    let pop_result = population::apply_tick(
        input.population,
        capacity_total,
        happiness,
        food_available,
        hours_elapsed,
        population_config,
    )?;
    let growth_rate = population::growth_rate_per_hour(happiness, population_config);

    let mut events = Vec::new();
    if !produced_total.is_empty() {
        events.push(OutboundEvent::ResourceProduction {
            settlement_id: input.settlement_id,
            produced: produced_total,
            timestamp: now,
        });
    }
    if !wasted_total.is_empty() {
        events.push(OutboundEvent::ResourceWaste {
            settlement_id: input.settlement_id,
            wasted: wasted_total,
            timestamp: now,
        });
    }
    events.push(OutboundEvent::PopulationState {
        settlement_id: input.settlement_id,
        current: pop_result.new_population,
        capacity: capacity_total,
        happiness,
        growth_rate,
        timestamp: now,
    });
    if pop_result.starvation_casualties > 0 {
        events.push(OutboundEvent::PopulationWarning {
            settlement_id: input.settlement_id,
            reason: "food shortage".to_owned(),
            timestamp: now,
        });
    }

    Ok(SettlementTickOutcome {
        settlement_id: input.settlement_id,
        storage,
        population: pop_result.new_population,
        happiness,
        growth_rate,
        events,
    })
}

/// The result of advancing one settlement's construction queue.
#[derive(Debug, Clone, Default)]
pub struct ConstructionAdvance {
    /// Entries that reached `completes_at` this tick. The caller is
    /// responsible for constructing the resulting structure (via
    /// `settlement-structures::service::build`) and persisting the
    /// `Complete` status in the same transaction.
    pub completed: Vec<ConstructionId>,
}

/// Mark any `InProgress` entry whose `completes_at` has passed as
/// `Complete`, compact positions, and promote the next queued entry.
///
/// # Errors
///
/// Returns [`TickError::Construction`] if promotion's duration
/// computation overflows.
pub fn advance_construction(
    entries: &mut Vec<ConstructionQueueEntry>,
    construction_time_seconds: u32,
    workshop_bonus: Decimal,
    now: DateTime<Utc>,
) -> Result<ConstructionAdvance, TickError> {
    let mut completed = Vec::new();
    for entry in entries.iter_mut() {
        if entry.status == ConstructionStatus::InProgress
            && entry.completes_at.is_some_and(|at| now >= at)
        {
            entry.status = ConstructionStatus::Complete;
            completed.push(entry.id);
        }
    }

    if !completed.is_empty() {
        queue::compact_positions(entries);
    }
    queue::promote_next_queued(entries, construction_time_seconds, workshop_bonus, now)?;

    Ok(ConstructionAdvance { completed })
}

/// Advance one disaster's lifecycle state machine by one tick.
///
/// # Errors
///
/// Returns [`TickError::Disaster`] if the computed transition is illegal
/// (a bug in [`settlement_disaster::engine::evaluate`], not a caller
/// error).
pub fn advance_disaster(
    event: &mut DisasterEvent,
    now: DateTime<Utc>,
) -> Result<Transition, TickError> {
    let transition = engine::evaluate(event, now);
    engine::apply(event, transition, now)?;
    Ok(transition)
}

/// Average real-time interval between newly scheduled disasters at a
/// 1.0x frequency multiplier, the baseline [`maybe_schedule_disaster`]'s
/// per-tick roll targets.
pub const BASE_DISASTER_INTERVAL_SECONDS: f64 = 3.0 * 24.0 * 3600.0;

/// Warning window granted before a newly scheduled disaster's impact
/// begins.
pub const SCHEDULED_WARNING_TIME_SECONDS: u32 = 7_200;

/// How long a newly scheduled disaster's impact phase lasts.
pub const SCHEDULED_IMPACT_DURATION_SECONDS: u32 = 3_600;

/// Roll whether a new disaster should be scheduled against `biome` this
/// tick, and build it (status SCHEDULED) if so.
///
/// Approximates a Poisson process: the per-tick probability is
/// `tick_seconds / (BASE_DISASTER_INTERVAL_SECONDS / frequency_multiplier)`.
/// The caller is expected to skip this roll entirely while the world
/// already has a non-resolved disaster, so at most one is ever scheduled
/// at a time.
#[must_use]
pub fn maybe_schedule_disaster(
    world_id: WorldId,
    biome: BiomeKind,
    frequency_multiplier: Decimal,
    severity_multiplier: Decimal,
    tick_seconds: f64,
    rng: &mut impl Rng,
    now: DateTime<Utc>,
) -> Option<DisasterEvent> {
    let multiplier = frequency_multiplier.to_f64().filter(|value| *value > 0.0)?;
    let interval_seconds = BASE_DISASTER_INTERVAL_SECONDS / multiplier;
    let probability = (tick_seconds / interval_seconds).clamp(0.0, 1.0);
    if rng.random::<f64>() >= probability {
        return None;
    }

    let disaster_type = schedule::select_disaster_type(biome, rng)?;
    let severity = roll_severity(severity_multiplier, rng);

    Some(DisasterEvent {
        id: DisasterId::new(),
        world_id,
        disaster_type,
        severity,
        severity_level: SeverityLevel::from_score(severity),
        affected_region: None,
        affected_biomes: vec![biome],
        scheduled_at: now + Duration::seconds(i64::from(SCHEDULED_WARNING_TIME_SECONDS)),
        warning_time_seconds: SCHEDULED_WARNING_TIME_SECONDS,
        impact_duration_seconds: SCHEDULED_IMPACT_DURATION_SECONDS,
        status: DisasterStatus::Scheduled,
        warning_started_at: None,
        impact_started_at: None,
        impact_ended_at: None,
        imminent_warning_issued: false,
    })
}

/// Roll a raw severity score in `[0, 100]`, scaled by the world
/// template's `disaster_severity` multiplier.
fn roll_severity(multiplier: Decimal, rng: &mut impl Rng) -> u8 {
    let base = Decimal::from(rng.random_range(0..100u8));
    (base * multiplier).to_u8().unwrap_or(u8::MAX).min(100)
}

/// Coalesce every in-progress construction entry across a world into a
/// single `construction-progress-batch` event, per the per-second
/// backpressure-droppable batching the event bus expects. Returns `None`
/// if nothing is in progress.
#[must_use]
pub fn coalesce_construction_progress(
    world_id: WorldId,
    in_progress: &[(SettlementId, &ConstructionQueueEntry)],
    now: DateTime<Utc>,
) -> Option<OutboundEvent> {
    let constructions: Vec<ConstructionProgress> = in_progress
        .iter()
        .filter(|(_, entry)| entry.status == ConstructionStatus::InProgress)
        .filter_map(|(settlement_id, entry)| {
            let started_at = entry.started_at?;
            let completes_at = entry.completes_at?;
            let total = (completes_at - started_at).num_seconds().max(1);
            let remaining = (completes_at - now).num_seconds().clamp(0, total);
            let elapsed = total - remaining;
            let progress = u8::try_from((elapsed * 100) / total).unwrap_or(100).min(100);
            Some(ConstructionProgress {
                settlement_id: *settlement_id,
                project_id: entry.id,
                progress,
                time_remaining_seconds: u32::try_from(remaining).unwrap_or(0),
            })
        })
        .collect();

    if constructions.is_empty() {
        return None;
    }

    Some(OutboundEvent::ConstructionProgressBatch {
        world_id,
        constructions,
        timestamp: now,
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use settlement_types::{ConstructionId, SettlementId};

    fn entry(
        status: ConstructionStatus,
        started_at: Option<DateTime<Utc>>,
        completes_at: Option<DateTime<Utc>>,
    ) -> ConstructionQueueEntry {
        ConstructionQueueEntry {
            id: ConstructionId::new(),
            settlement_id: SettlementId::new(),
            structure_kind: settlement_types::StructureKind::House,
            resources_cost: ResourceAmounts::new(),
            status,
            position: 0,
            is_emergency: false,
            started_at,
            completes_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn run_economy_produces_nothing_without_extractors() {
        let input = SettlementTickInput {
            settlement_id: SettlementId::new(),
            tier: SettlementTier::Outpost,
            storage: ResourceAmounts::new(),
            capacity: ResourceAmounts::from([(Resource::Food, 100)]),
            population: 5,
            population_capacity_modifier: 0,
            trauma_ticks_remaining: 0,
            extractor_groups: vec![],
            disaster_impacts: vec![],
        };
        let outcome = run_economy(
            &input,
            &production::ProductionConfig::default(),
            &population::PopulationConfig::default(),
            1,
            Decimal::ONE,
            Decimal::ONE,
            Utc::now(),
        )
        .unwrap();
        assert!(outcome.storage.get(&Resource::Food).copied().unwrap_or(0) == 0);
        assert!(!outcome.events.is_empty());
    }

    #[test]
    fn advance_construction_completes_and_promotes() {
        let now = Utc::now();
        let mut entries = vec![
            entry(ConstructionStatus::InProgress, Some(now), Some(now - chrono::Duration::seconds(1))),
            entry(ConstructionStatus::Queued, None, None),
        ];
        let advance = advance_construction(&mut entries, 3600, Decimal::ZERO, now).unwrap();
        assert_eq!(advance.completed.len(), 1);
        assert!(entries.iter().any(|e| e.status == ConstructionStatus::InProgress));
    }

    #[test]
    fn coalesce_skips_entries_missing_timestamps() {
        let world_id = WorldId::new();
        let settlement_id = SettlementId::new();
        let incomplete = entry(ConstructionStatus::InProgress, None, None);
        let batch = coalesce_construction_progress(world_id, &[(settlement_id, &incomplete)], Utc::now());
        assert!(batch.is_none());
    }

    #[test]
    fn coalesce_reports_progress_fraction() {
        let world_id = WorldId::new();
        let settlement_id = SettlementId::new();
        let now = Utc::now();
        let started = now - chrono::Duration::seconds(30);
        let completes = now + chrono::Duration::seconds(30);
        let active = entry(ConstructionStatus::InProgress, Some(started), Some(completes));
        let batch = coalesce_construction_progress(world_id, &[(settlement_id, &active)], now).unwrap();
        match batch {
            OutboundEvent::ConstructionProgressBatch { constructions, .. } => {
                assert_eq!(constructions.len(), 1);
                assert_eq!(constructions[0].progress, 50);
            }
            _ => panic!("expected a construction progress batch"),
        }
    }

    #[test]
    fn maybe_schedule_disaster_never_fires_at_zero_frequency() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(1);
        let scheduled = maybe_schedule_disaster(
            WorldId::new(),
            BiomeKind::Grassland,
            Decimal::ZERO,
            Decimal::ONE,
            60.0,
            &mut rng,
            Utc::now(),
        );
        assert!(scheduled.is_none());
    }

    #[test]
    fn maybe_schedule_disaster_is_reproducible_for_same_seed() {
        let world_id = WorldId::new();
        let now = Utc::now();
        let draw = |seed: u64| {
            let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
            maybe_schedule_disaster(
                world_id,
                BiomeKind::Grassland,
                Decimal::from(1000),
                Decimal::ONE,
                60.0,
                &mut rng,
                now,
            )
        };
        let first = draw(42);
        let second = draw(42);
        assert_eq!(first.map(|event| event.disaster_type), second.map(|event| event.disaster_type));
        assert_eq!(first.map(|event| event.severity), second.map(|event| event.severity));
    }
}
