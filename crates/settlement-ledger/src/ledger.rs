//! The settlement ledger: an append-only log of all storage movements.
//!
//! The [`Ledger`] struct is the in-memory representation of the ledger for
//! the current tick batch. It holds all [`LedgerEntry`] values and provides
//! methods for recording movements, querying balances, and verifying the
//! conservation law.
//!
//! # Design
//!
//! - **Append-only**: entries are never modified or deleted.
//! - **Double-entry**: every movement has a debit (from) and credit (to).
//! - **Conservation**: internal movements balance per tick.
//! - **Precision**: all quantities are `u32` -- no floating point.

use uuid::Uuid;

use settlement_types::{EntityType, LedgerEntry, LedgerEntryType, Resource};

use crate::conservation::{verify_conservation, verify_conservation_strict, ConservationResult};
use crate::{LedgerError, TransactionBuilder};

/// Parameters for recording a general-purpose ledger movement.
///
/// Packs the arguments of a movement into a single struct to satisfy
/// clippy's argument count limit and improve call-site readability.
pub struct TransferParams {
    /// The tick number.
    pub tick: u64,
    /// The category of movement.
    pub entry_type: LedgerEntryType,
    /// The resource being moved.
    pub resource: Resource,
    /// Quantity moved.
    pub quantity: u32,
    /// Source entity id.
    pub from_entity: Uuid,
    /// Source entity type.
    pub from_entity_type: EntityType,
    /// Destination entity id.
    pub to_entity: Uuid,
    /// Destination entity type.
    pub to_entity_type: EntityType,
    /// Machine-oriented reason code.
    pub reason: String,
    /// Optional reference to a related entity.
    pub reference_id: Option<Uuid>,
}

/// Parameters for recording a construction-queue debit or refund.
pub struct ConstructionTransferParams {
    /// The tick number.
    pub tick: u64,
    /// The resource being moved.
    pub resource: Resource,
    /// Quantity moved.
    pub quantity: u32,
    /// The settlement this construction entry belongs to.
    pub settlement: Uuid,
    /// The construction queue entry this debit/refund is for.
    pub construction: Uuid,
}

/// The settlement ledger: tracks all resource storage movements recorded
/// during a batch of ticks.
///
/// Enforces three invariants:
/// 1. All quantities are strictly positive (validated at entry creation).
/// 2. Every entry type has the correct source/destination entity types.
/// 3. The conservation law holds for internal movements at the end of
///    every tick.
#[derive(Debug, Default)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// Create a new empty ledger.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Return the number of entries in the ledger.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return whether the ledger has no entries.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a pre-built [`LedgerEntry`] to the ledger, e.g. one loaded
    /// from the database.
    pub fn append(&mut self, entry: LedgerEntry) {
        self.entries.push(entry);
    }

    /// Record a movement between two entities.
    ///
    /// This is the general-purpose recording method. It builds and
    /// validates a [`LedgerEntry`] via the [`TransactionBuilder`] and
    /// appends it.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the entry fails validation.
    pub fn record_transfer(
        &mut self,
        params: TransferParams,
    ) -> Result<&LedgerEntry, LedgerError> {
        let mut builder = TransactionBuilder::new(params.tick, params.entry_type, params.resource)
            .from(params.from_entity, params.from_entity_type)
            .to(params.to_entity, params.to_entity_type)
            .quantity(params.quantity)
            .reason(params.reason);

        if let Some(ref_id) = params.reference_id {
            builder = builder.reference_id(ref_id);
        }

        let entry = builder.build()?;
        self.entries.push(entry);

        self.entries.last().ok_or(LedgerError::InternalError(
            "failed to retrieve entry after append",
        ))
    }

    /// Record tick production credited to settlement storage (world to
    /// settlement). The source side of the conservation check.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the entry fails validation.
    pub fn record_production(
        &mut self,
        tick: u64,
        resource: Resource,
        quantity: u32,
        world: Uuid,
        settlement: Uuid,
    ) -> Result<&LedgerEntry, LedgerError> {
        self.record_transfer(TransferParams {
            tick,
            entry_type: LedgerEntryType::Production,
            resource,
            quantity,
            from_entity: world,
            from_entity_type: EntityType::World,
            to_entity: settlement,
            to_entity_type: EntityType::Settlement,
            reason: "TICK_PRODUCTION".to_owned(),
            reference_id: None,
        })
    }

    /// Record a construction-enqueue debit (settlement to construction).
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the entry fails validation.
    pub fn record_construction_debit(
        &mut self,
        tick: u64,
        params: ConstructionTransferParams,
    ) -> Result<&LedgerEntry, LedgerError> {
        self.record_transfer(TransferParams {
            tick,
            entry_type: LedgerEntryType::ConstructionDebit,
            resource: params.resource,
            quantity: params.quantity,
            from_entity: params.settlement,
            from_entity_type: EntityType::Settlement,
            to_entity: params.construction,
            to_entity_type: EntityType::Construction,
            reason: "CONSTRUCTION_ENQUEUE".to_owned(),
            reference_id: Some(params.construction),
        })
    }

    /// Record a construction-cancellation refund (construction to
    /// settlement). Callers apply the 50% refund fraction before
    /// calling this.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the entry fails validation.
    pub fn record_construction_refund(
        &mut self,
        tick: u64,
        params: ConstructionTransferParams,
    ) -> Result<&LedgerEntry, LedgerError> {
        self.record_transfer(TransferParams {
            tick,
            entry_type: LedgerEntryType::ConstructionRefund,
            resource: params.resource,
            quantity: params.quantity,
            from_entity: params.construction,
            from_entity_type: EntityType::Construction,
            to_entity: params.settlement,
            to_entity_type: EntityType::Settlement,
            reason: "CONSTRUCTION_CANCELLED".to_owned(),
            reference_id: Some(params.construction),
        })
    }

    /// Record production overflow wasted past storage capacity (settlement
    /// to void).
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the entry fails validation.
    pub fn record_waste(
        &mut self,
        tick: u64,
        resource: Resource,
        quantity: u32,
        settlement: Uuid,
        void: Uuid,
    ) -> Result<&LedgerEntry, LedgerError> {
        self.record_transfer(TransferParams {
            tick,
            entry_type: LedgerEntryType::Waste,
            resource,
            quantity,
            from_entity: settlement,
            from_entity_type: EntityType::Settlement,
            to_entity: void,
            to_entity_type: EntityType::Void,
            reason: "STORAGE_OVERFLOW".to_owned(),
            reference_id: None,
        })
    }

    /// Record disaster-caused resource loss (settlement to void).
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the entry fails validation.
    pub fn record_disaster_loss(
        &mut self,
        tick: u64,
        resource: Resource,
        quantity: u32,
        settlement: Uuid,
        void: Uuid,
        disaster: Uuid,
    ) -> Result<&LedgerEntry, LedgerError> {
        self.record_transfer(TransferParams {
            tick,
            entry_type: LedgerEntryType::DisasterLoss,
            resource,
            quantity,
            from_entity: settlement,
            from_entity_type: EntityType::Settlement,
            to_entity: void,
            to_entity_type: EntityType::Void,
            reason: "DISASTER_IMPACT".to_owned(),
            reference_id: Some(disaster),
        })
    }

    /// Verify the conservation law for a given tick.
    pub fn verify_conservation(&self, tick: u64) -> ConservationResult {
        verify_conservation(tick, &self.entries)
    }

    /// Verify the conservation law with strict flow-direction semantics.
    pub fn verify_conservation_strict(&self, tick: u64) -> ConservationResult {
        verify_conservation_strict(tick, &self.entries)
    }

    /// Return all entries for a given tick.
    pub fn entries_for_tick(&self, tick: u64) -> Vec<&LedgerEntry> {
        self.entries.iter().filter(|e| e.tick == tick).collect()
    }

    /// Return all entries, in insertion order.
    pub fn all_entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Calculate the net balance for a specific entity and resource.
    ///
    /// Positive means the entity has received more than it has sent.
    pub fn entity_balance(&self, entity_id: Uuid, resource: Resource) -> i64 {
        let mut balance: i64 = 0;

        for entry in &self.entries {
            if entry.resource != resource {
                continue;
            }
            if entry.to_entity == Some(entity_id) {
                balance = balance.saturating_add(i64::from(entry.quantity));
            }
            if entry.from_entity == Some(entity_id) {
                balance = balance.saturating_sub(i64::from(entry.quantity));
            }
        }

        balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> Uuid {
        Uuid::now_v7()
    }

    #[test]
    fn new_ledger_is_empty() {
        let ledger = Ledger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.len(), 0);
    }

    #[test]
    fn record_production_appends_entry() {
        let mut ledger = Ledger::new();
        let result = ledger.record_production(1, Resource::Wood, 10, id(), id());
        assert!(result.is_ok());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn production_alone_is_balanced() {
        let mut ledger = Ledger::new();
        let _ = ledger.record_production(1, Resource::Water, 20, id(), id());
        assert_eq!(ledger.verify_conservation(1), ConservationResult::Balanced);
    }

    #[test]
    fn construction_debit_and_refund_cycle() {
        let mut ledger = Ledger::new();
        let settlement = id();
        let construction = id();

        let _ = ledger.record_construction_debit(
            1,
            ConstructionTransferParams {
                tick: 1,
                resource: Resource::Wood,
                quantity: 50,
                settlement,
                construction,
            },
        );

        // Cancelled next tick; caller computes the 50% refund amount.
        let _ = ledger.record_construction_refund(
            2,
            ConstructionTransferParams {
                tick: 2,
                resource: Resource::Wood,
                quantity: 25,
                settlement,
                construction,
            },
        );

        assert_eq!(ledger.verify_conservation(1), ConservationResult::Balanced);
        assert_eq!(ledger.verify_conservation(2), ConservationResult::Balanced);

        // Net settlement balance: -50 (debit) + 25 (refund) = -25.
        assert_eq!(ledger.entity_balance(settlement, Resource::Wood), -25);
    }

    #[test]
    fn waste_and_disaster_loss_are_sinks() {
        let mut ledger = Ledger::new();
        let settlement = id();
        let void = id();
        let disaster = id();

        let _ = ledger.record_waste(1, Resource::Food, 3, settlement, void);
        let _ = ledger.record_disaster_loss(1, Resource::Stone, 12, settlement, void, disaster);

        assert_eq!(ledger.verify_conservation(1), ConservationResult::Balanced);
        assert_eq!(ledger.entity_balance(settlement, Resource::Food), -3);
        assert_eq!(ledger.entity_balance(settlement, Resource::Stone), -12);
    }

    #[test]
    fn zero_quantity_rejected_via_ledger() {
        let mut ledger = Ledger::new();
        let result = ledger.record_production(1, Resource::Wood, 0, id(), id());
        assert!(result.is_err());
        assert_eq!(ledger.len(), 0);
    }

    #[test]
    fn entries_for_tick_filters_correctly() {
        let mut ledger = Ledger::new();
        let _ = ledger.record_production(1, Resource::Wood, 5, id(), id());
        let _ = ledger.record_production(2, Resource::Stone, 3, id(), id());

        assert_eq!(ledger.entries_for_tick(1).len(), 1);
        assert_eq!(ledger.entries_for_tick(2).len(), 1);
        assert_eq!(ledger.entries_for_tick(3).len(), 0);
    }

    #[test]
    fn strict_conservation_passes_for_full_tick() {
        let mut ledger = Ledger::new();
        let world = id();
        let settlement = id();
        let construction = id();
        let void = id();

        let _ = ledger.record_production(1, Resource::Wood, 10, world, settlement);
        let _ = ledger.record_construction_debit(
            1,
            ConstructionTransferParams {
                tick: 1,
                resource: Resource::Wood,
                quantity: 8,
                settlement,
                construction,
            },
        );
        let _ = ledger.record_waste(1, Resource::Wood, 1, settlement, void);

        assert_eq!(
            ledger.verify_conservation_strict(1),
            ConservationResult::Balanced
        );
    }
}
