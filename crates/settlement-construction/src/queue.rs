//! The per-settlement FIFO construction queue.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use settlement_types::{
    ConstructionId, ConstructionQueueEntry, ConstructionStatus, ResourceAmounts, SettlementId,
    StructureDefId, StructureKind, StructureRequirement,
};

use crate::cost::{self, shortages};
use crate::error::ConstructionError;

/// Non-terminal queue entries occupying an active construction slot.
pub const MAX_ACTIVE: usize = 3;
/// Non-terminal queue entries a settlement may hold at once, positions
/// `0..MAX_QUEUE_LEN-1`.
pub const MAX_QUEUE_LEN: usize = 10;

/// Everything [`enqueue`] needs to validate and construct a new entry.
pub struct EnqueueRequest<'a> {
    /// The settlement enqueueing this structure.
    pub settlement_id: SettlementId,
    /// The structure definition being built.
    pub structure_def_id: StructureDefId,
    /// The structure kind being built.
    pub structure_kind: StructureKind,
    /// The definition's base resource requirements.
    pub requirements: &'a [StructureRequirement],
    /// Base construction time in seconds.
    pub construction_time_seconds: u32,
    /// The settlement's current storage.
    pub storage: &'a ResourceAmounts,
    /// The settlement's non-terminal entries, for capacity/slot counting.
    pub existing_entries: &'a [ConstructionQueueEntry],
    /// The settlement's aggregated `construction_speed_bonus` modifier.
    pub workshop_bonus: Decimal,
    /// Whether this enqueue is under emergency (AFTERMATH) rules.
    pub emergency: bool,
    /// Whether a world AFTERMATH disaster is currently active; required
    /// for `emergency` to be honored.
    pub aftermath_active: bool,
    /// Current time, stamped on the new row.
    pub now: DateTime<Utc>,
}

/// The outcome of a successful enqueue: the new entry plus the ledger
/// debit the caller must record.
pub struct EnqueueOutcome {
    /// The newly constructed queue entry.
    pub entry: ConstructionQueueEntry,
    /// The resource cost the caller must debit from settlement storage
    /// via `settlement-ledger`'s `record_construction_debit`.
    pub cost: ResourceAmounts,
}

/// Validate and construct a new queue entry.
///
/// Checks, in order: emergency eligibility, queue capacity, resource
/// availability. Does not mutate storage or the ledger -- the caller
/// debits the returned `cost` in the same transaction.
///
/// # Errors
///
/// Returns a [`ConstructionError`] variant naming the first failed
/// check.
pub fn enqueue(request: &EnqueueRequest) -> Result<EnqueueOutcome, ConstructionError> {
    if request.emergency && !request.aftermath_active {
        return Err(ConstructionError::EmergencyNotAllowed);
    }

    let non_terminal = request
        .existing_entries
        .iter()
        .filter(|e| !e.status.is_terminal())
        .count();
    if non_terminal >= MAX_QUEUE_LEN {
        return Err(ConstructionError::QueueFull);
    }

    let cost = cost::compute_cost(request.requirements, request.emergency)?;
    let shortfall = shortages(request.storage, &cost);
    if !shortfall.is_empty() {
        return Err(ConstructionError::InsufficientResources { shortages: shortfall });
    }

    let active_count = request
        .existing_entries
        .iter()
        .filter(|e| e.status == ConstructionStatus::InProgress)
        .count();
    let status = if active_count < MAX_ACTIVE {
        ConstructionStatus::InProgress
    } else {
        ConstructionStatus::Queued
    };

    let position = next_free_position(request.existing_entries);
    let completes_at = if status == ConstructionStatus::InProgress {
        Some(cost::compute_completes_at(
            request.construction_time_seconds,
            request.emergency,
            request.workshop_bonus,
            request.now,
        )?)
    } else {
        None
    };
    let started_at = (status == ConstructionStatus::InProgress).then_some(request.now);

    let entry = ConstructionQueueEntry {
        id: ConstructionId::new(),
        settlement_id: request.settlement_id,
        structure_kind: request.structure_kind,
        resources_cost: cost.clone(),
        status,
        position,
        is_emergency: request.emergency,
        started_at,
        completes_at,
        created_at: request.now,
    };

    Ok(EnqueueOutcome { entry, cost })
}

/// The first free position in `0..MAX_QUEUE_LEN` not held by a
/// non-terminal entry.
fn next_free_position(existing: &[ConstructionQueueEntry]) -> u8 {
    let taken: Vec<u8> = existing
        .iter()
        .filter(|e| !e.status.is_terminal())
        .map(|e| e.position)
        .collect();
    (0..MAX_QUEUE_LEN as u8)
        .find(|position| !taken.contains(position))
        .unwrap_or(0)
}

/// The refund fraction applied to a cancelled entry's cost snapshot (:
/// cancelling refunds exactly 50%).
const CANCEL_REFUND_FRACTION: Decimal = Decimal::from_parts(5, 0, 0, false, 1); // 0.5

/// Cancel a non-terminal entry: compute its 50% refund and mark it
/// cancelled. The caller records the refund via
/// `settlement-ledger`'s `record_construction_refund` and compacts
/// positions with [`compact_positions`].
///
/// # Errors
///
/// Returns [`ConstructionError::AlreadyTerminal`] if the entry is
/// already `Complete` or `Cancelled`.
pub fn cancel(entry: &mut ConstructionQueueEntry) -> Result<ResourceAmounts, ConstructionError> {
    if entry.status.is_terminal() {
        return Err(ConstructionError::AlreadyTerminal { status: entry.status });
    }

    let mut refund = ResourceAmounts::new();
    for (&resource, &quantity) in &entry.resources_cost {
        let half = Decimal::from(quantity)
            .checked_mul(CANCEL_REFUND_FRACTION)
            .and_then(|v| v.round().to_u32())
            .unwrap_or(0);
        refund.insert(resource, half);
    }

    entry.status = ConstructionStatus::Cancelled;
    Ok(refund)
}

/// Renumber every non-terminal entry's `position` to a dense
/// `0..n-1` permutation, preserving relative order, after a
/// cancellation or completion frees a slot.
pub fn compact_positions(entries: &mut [ConstructionQueueEntry]) {
    let mut ordered: Vec<&mut ConstructionQueueEntry> = entries
        .iter_mut()
        .filter(|e| !e.status.is_terminal())
        .collect();
    ordered.sort_by_key(|e| e.position);
    for (index, entry) in ordered.into_iter().enumerate() {
        entry.position = index as u8;
    }
}

/// Promote the lowest-position `Queued` entry to `InProgress`, called
/// after a completion or cancellation frees an active slot.
///
/// # Errors
///
/// Returns [`ConstructionError::ArithmeticOverflow`] if duration
/// computation overflows.
pub fn promote_next_queued(
    entries: &mut [ConstructionQueueEntry],
    construction_time_seconds: u32,
    workshop_bonus: Decimal,
    now: DateTime<Utc>,
) -> Result<(), ConstructionError> {
    let active_count = entries
        .iter()
        .filter(|e| e.status == ConstructionStatus::InProgress)
        .count();
    if active_count >= MAX_ACTIVE {
        return Ok(());
    }

    if let Some(next) = entries
        .iter_mut()
        .filter(|e| e.status == ConstructionStatus::Queued)
        .min_by_key(|e| e.position)
    {
        next.status = ConstructionStatus::InProgress;
        next.started_at = Some(now);
        next.completes_at = Some(cost::compute_completes_at(
            construction_time_seconds,
            next.is_emergency,
            workshop_bonus,
            now,
        )?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use settlement_types::Resource;

    fn requirement(resource: Resource, quantity: u32) -> StructureRequirement {
        StructureRequirement {
            structure_def_id: StructureDefId::new(),
            resource,
            quantity,
        }
    }

    fn base_request<'a>(
        requirements: &'a [StructureRequirement],
        storage: &'a ResourceAmounts,
        existing: &'a [ConstructionQueueEntry],
    ) -> EnqueueRequest<'a> {
        EnqueueRequest {
            settlement_id: SettlementId::new(),
            structure_def_id: StructureDefId::new(),
            structure_kind: StructureKind::House,
            requirements,
            construction_time_seconds: 3600,
            storage,
            existing_entries: existing,
            workshop_bonus: Decimal::ZERO,
            emergency: false,
            aftermath_active: false,
            now: Utc::now(),
        }
    }

    #[test]
    fn enqueue_rejects_insufficient_resources() {
        let requirements = vec![requirement(Resource::Wood, 100)];
        let storage = ResourceAmounts::from([(Resource::Wood, 10)]);
        let request = base_request(&requirements, &storage, &[]);
        assert!(matches!(
            enqueue(&request),
            Err(ConstructionError::InsufficientResources { .. })
        ));
    }

    #[test]
    fn enqueue_rejects_emergency_without_aftermath() {
        let requirements = vec![];
        let storage = ResourceAmounts::new();
        let mut request = base_request(&requirements, &storage, &[]);
        request.emergency = true;
        assert!(matches!(enqueue(&request), Err(ConstructionError::EmergencyNotAllowed)));
    }

    #[test]
    fn enqueue_goes_straight_to_in_progress_under_the_active_limit() {
        let requirements = vec![];
        let storage = ResourceAmounts::new();
        let request = base_request(&requirements, &storage, &[]);
        let outcome = enqueue(&request).unwrap();
        assert_eq!(outcome.entry.status, ConstructionStatus::InProgress);
        assert_eq!(outcome.entry.position, 0);
    }

    #[test]
    fn cancel_refunds_exactly_half() {
        let mut entry = ConstructionQueueEntry {
            id: ConstructionId::new(),
            settlement_id: SettlementId::new(),
            structure_kind: StructureKind::House,
            resources_cost: ResourceAmounts::from([(Resource::Wood, 100), (Resource::Stone, 60)]),
            status: ConstructionStatus::Queued,
            position: 0,
            is_emergency: false,
            started_at: None,
            completes_at: None,
            created_at: Utc::now(),
        };
        let refund = cancel(&mut entry).unwrap();
        assert_eq!(refund[&Resource::Wood], 50);
        assert_eq!(refund[&Resource::Stone], 30);
        assert_eq!(entry.status, ConstructionStatus::Cancelled);
    }

    #[test]
    fn cancel_rejects_already_terminal_entries() {
        let mut entry = ConstructionQueueEntry {
            id: ConstructionId::new(),
            settlement_id: SettlementId::new(),
            structure_kind: StructureKind::House,
            resources_cost: ResourceAmounts::new(),
            status: ConstructionStatus::Complete,
            position: 0,
            is_emergency: false,
            started_at: None,
            completes_at: None,
            created_at: Utc::now(),
        };
        assert!(matches!(cancel(&mut entry), Err(ConstructionError::AlreadyTerminal { .. })));
    }

    #[test]
    fn compact_positions_yields_a_dense_permutation() {
        let mut entries = vec![
            entry_at(5, ConstructionStatus::Queued),
            entry_at(2, ConstructionStatus::InProgress),
            entry_at(9, ConstructionStatus::Cancelled),
        ];
        compact_positions(&mut entries);
        let mut positions: Vec<u8> = entries
            .iter()
            .filter(|e| !e.status.is_terminal())
            .map(|e| e.position)
            .collect();
        positions.sort_unstable();
        assert_eq!(positions, vec![0, 1]);
    }

    fn entry_at(position: u8, status: ConstructionStatus) -> ConstructionQueueEntry {
        ConstructionQueueEntry {
            id: ConstructionId::new(),
            settlement_id: SettlementId::new(),
            structure_kind: StructureKind::House,
            resources_cost: ResourceAmounts::new(),
            status,
            position,
            is_emergency: false,
            started_at: None,
            completes_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn promote_next_queued_advances_lowest_position() {
        let mut entries = vec![entry_at(1, ConstructionStatus::Queued), entry_at(0, ConstructionStatus::Queued)];
        promote_next_queued(&mut entries, 3600, Decimal::ZERO, Utc::now()).unwrap();
        let promoted = entries.iter().find(|e| e.status == ConstructionStatus::InProgress).unwrap();
        assert_eq!(promoted.position, 0);
    }
}
