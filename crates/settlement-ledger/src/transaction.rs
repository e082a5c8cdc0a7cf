//! Transaction builder and validation for the settlement ledger.
//!
//! Provides a [`TransactionBuilder`] that enforces the double-entry
//! invariant: every ledger entry specifies a source entity (debit) and a
//! destination entity (credit), and the pair must match the contract for
//! its [`LedgerEntryType`].

use chrono::Utc;
use uuid::Uuid;

use settlement_types::{EntityType, LedgerEntry, LedgerEntryId, LedgerEntryType, Resource};

use crate::LedgerError;

/// Builder for constructing validated [`LedgerEntry`] values.
///
/// # Examples
///
/// ```
/// use settlement_ledger::TransactionBuilder;
/// use settlement_types::{EntityType, LedgerEntryType, Resource};
/// use uuid::Uuid;
///
/// let entry = TransactionBuilder::new(1, LedgerEntryType::Production, Resource::Wood)
///     .from(Uuid::now_v7(), EntityType::World)
///     .to(Uuid::now_v7(), EntityType::Settlement)
///     .quantity(5)
///     .reason("TICK_PRODUCTION".to_owned())
///     .build();
///
/// assert!(entry.is_ok());
/// ```
#[derive(Debug)]
pub struct TransactionBuilder {
    tick: u64,
    entry_type: LedgerEntryType,
    resource: Resource,
    from_entity: Option<Uuid>,
    from_entity_type: Option<EntityType>,
    to_entity: Option<Uuid>,
    to_entity_type: Option<EntityType>,
    quantity: Option<u32>,
    reason: Option<String>,
    reference_id: Option<Uuid>,
}

impl TransactionBuilder {
    /// Start building a ledger entry for the given tick, entry type, and
    /// resource.
    pub const fn new(tick: u64, entry_type: LedgerEntryType, resource: Resource) -> Self {
        Self {
            tick,
            entry_type,
            resource,
            from_entity: None,
            from_entity_type: None,
            to_entity: None,
            to_entity_type: None,
            quantity: None,
            reason: None,
            reference_id: None,
        }
    }

    /// Set the source entity (debit side).
    #[must_use]
    pub const fn from(mut self, entity: Uuid, entity_type: EntityType) -> Self {
        self.from_entity = Some(entity);
        self.from_entity_type = Some(entity_type);
        self
    }

    /// Set the destination entity (credit side).
    #[must_use]
    pub const fn to(mut self, entity: Uuid, entity_type: EntityType) -> Self {
        self.to_entity = Some(entity);
        self.to_entity_type = Some(entity_type);
        self
    }

    /// Set the quantity of resource moved.
    #[must_use]
    pub const fn quantity(mut self, qty: u32) -> Self {
        self.quantity = Some(qty);
        self
    }

    /// Set the machine-oriented reason code for this entry.
    #[must_use]
    pub fn reason(mut self, reason: String) -> Self {
        self.reason = Some(reason);
        self
    }

    /// Set an optional reference to the entity that caused this entry.
    #[must_use]
    pub const fn reference_id(mut self, id: Uuid) -> Self {
        self.reference_id = Some(id);
        self
    }

    /// Validate inputs and produce a [`LedgerEntry`].
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ZeroQuantity`] if the quantity is zero.
    /// Returns [`LedgerError::MissingField`] if required fields are not set.
    /// Returns [`LedgerError::InvalidEntityType`] if the from/to entity
    /// types do not match the expected pair for the entry type.
    pub fn build(self) -> Result<LedgerEntry, LedgerError> {
        let quantity = self.quantity.ok_or(LedgerError::MissingField("quantity"))?;
        let reason = self.reason.ok_or(LedgerError::MissingField("reason"))?;

        if quantity == 0 {
            return Err(LedgerError::ZeroQuantity);
        }

        validate_entity_types(self.entry_type, self.from_entity_type, self.to_entity_type)?;

        Ok(LedgerEntry {
            id: LedgerEntryId::new(),
            tick: self.tick,
            entry_type: self.entry_type,
            from_entity: self.from_entity,
            from_entity_type: self.from_entity_type,
            to_entity: self.to_entity,
            to_entity_type: self.to_entity_type,
            resource: self.resource,
            quantity,
            reason,
            reference_id: self.reference_id,
            created_at: Utc::now(),
        })
    }
}

/// Validate that the from/to entity types match the contract for the given
/// [`LedgerEntryType`].
fn validate_entity_types(
    entry_type: LedgerEntryType,
    from_type: Option<EntityType>,
    to_type: Option<EntityType>,
) -> Result<(), LedgerError> {
    let (expected_from, expected_to) = expected_entity_types(entry_type);

    if from_type != Some(expected_from) {
        return Err(LedgerError::InvalidEntityType {
            entry_type,
            side: "from",
            expected: format!("{expected_from:?}"),
            actual: format!("{from_type:?}"),
        });
    }

    if to_type != Some(expected_to) {
        return Err(LedgerError::InvalidEntityType {
            entry_type,
            side: "to",
            expected: format!("{expected_to:?}"),
            actual: format!("{to_type:?}"),
        });
    }

    Ok(())
}

/// Return the expected `(from, to)` entity types for each [`LedgerEntryType`].
const fn expected_entity_types(entry_type: LedgerEntryType) -> (EntityType, EntityType) {
    match entry_type {
        LedgerEntryType::Production => (EntityType::World, EntityType::Settlement),
        LedgerEntryType::ConstructionDebit => (EntityType::Settlement, EntityType::Construction),
        LedgerEntryType::ConstructionRefund => (EntityType::Construction, EntityType::Settlement),
        LedgerEntryType::Waste | LedgerEntryType::DisasterLoss => {
            (EntityType::Settlement, EntityType::Void)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_produces_valid_entry() {
        let world = Uuid::now_v7();
        let settlement = Uuid::now_v7();
        let result = TransactionBuilder::new(1, LedgerEntryType::Production, Resource::Wood)
            .from(world, EntityType::World)
            .to(settlement, EntityType::Settlement)
            .quantity(5)
            .reason("TICK_PRODUCTION".to_owned())
            .build();

        assert!(result.is_ok());
        if let Ok(entry) = result {
            assert_eq!(entry.tick, 1);
            assert_eq!(entry.entry_type, LedgerEntryType::Production);
            assert_eq!(entry.resource, Resource::Wood);
            assert_eq!(entry.quantity, 5);
        }
    }

    #[test]
    fn zero_quantity_rejected() {
        let result = TransactionBuilder::new(1, LedgerEntryType::Production, Resource::Water)
            .from(Uuid::now_v7(), EntityType::World)
            .to(Uuid::now_v7(), EntityType::Settlement)
            .quantity(0)
            .reason("TICK_PRODUCTION".to_owned())
            .build();

        assert!(matches!(result, Err(LedgerError::ZeroQuantity)));
    }

    #[test]
    fn wrong_entity_type_rejected() {
        // Production expects World->Settlement, not Settlement->Settlement.
        let result = TransactionBuilder::new(1, LedgerEntryType::Production, Resource::Wood)
            .from(Uuid::now_v7(), EntityType::Settlement)
            .to(Uuid::now_v7(), EntityType::Settlement)
            .quantity(5)
            .reason("TICK_PRODUCTION".to_owned())
            .build();

        assert!(matches!(result, Err(LedgerError::InvalidEntityType { .. })));
    }

    #[test]
    fn missing_quantity_rejected() {
        let result = TransactionBuilder::new(1, LedgerEntryType::Waste, Resource::Wood)
            .from(Uuid::now_v7(), EntityType::Settlement)
            .to(Uuid::now_v7(), EntityType::Void)
            .reason("STORAGE_OVERFLOW".to_owned())
            .build();

        assert!(matches!(
            result,
            Err(LedgerError::MissingField("quantity"))
        ));
    }

    #[test]
    fn reference_id_is_optional() {
        let ref_id = Uuid::now_v7();
        let result = TransactionBuilder::new(1, LedgerEntryType::ConstructionDebit, Resource::Stone)
            .from(Uuid::now_v7(), EntityType::Settlement)
            .to(Uuid::now_v7(), EntityType::Construction)
            .quantity(2)
            .reason("CONSTRUCTION_ENQUEUE".to_owned())
            .reference_id(ref_id)
            .build();

        assert!(result.is_ok());
        if let Ok(entry) = result {
            assert_eq!(entry.reference_id, Some(ref_id));
        }
    }

    #[test]
    fn all_entry_types_have_valid_entity_mappings() {
        // Exhaustive match in expected_entity_types -- this test documents
        // the contract and will fail to compile if a new variant is added
        // without a mapping.
        let all_types = [
            LedgerEntryType::Production,
            LedgerEntryType::ConstructionDebit,
            LedgerEntryType::ConstructionRefund,
            LedgerEntryType::Waste,
            LedgerEntryType::DisasterLoss,
        ];

        for entry_type in all_types {
            let (from, to) = expected_entity_types(entry_type);
            assert_ne!(
                format!("{from:?}"),
                format!("{to:?}").as_str(),
                "entry type {entry_type:?} has from == to"
            );
        }
    }
}
