//! Non-negative goods stock owned by storage buildings.

use std::collections::BTreeMap;

use hamlet_core::{BuildingId, ResourceType};
use thiserror::Error;

/// Errors raised by inventory mutations.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum InventoryError {
    /// The stock holds fewer units than requested.
    #[error("insufficient {resource:?}: requested {requested}, available {available}")]
    Insufficient {
        /// Resource requested.
        resource: ResourceType,
        /// Units requested.
        requested: u32,
        /// Units held.
        available: u32,
    },
}

/// Resource quantities held by a single storage building.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inventory {
    stock: BTreeMap<ResourceType, u32>,
}

impl Inventory {
    /// Units of the resource currently held.
    #[must_use]
    pub fn quantity(&self, resource: ResourceType) -> u32 {
        self.stock.get(&resource).copied().unwrap_or(0)
    }

    /// Adds units of the resource.
    pub fn add(&mut self, resource: ResourceType, quantity: u32) {
        if quantity == 0 {
            return;
        }
        let entry = self.stock.entry(resource).or_insert(0);
        *entry = entry.saturating_add(quantity);
    }

    /// Removes units of the resource, leaving the stock untouched when short.
    pub fn try_consume(
        &mut self,
        resource: ResourceType,
        quantity: u32,
    ) -> Result<(), InventoryError> {
        let available = self.quantity(resource);
        if available < quantity {
            return Err(InventoryError::Insufficient {
                resource,
                requested: quantity,
                available,
            });
        }
        if available == quantity {
            let _ = self.stock.remove(&resource);
        } else {
            let _ = self.stock.insert(resource, available - quantity);
        }
        Ok(())
    }

    /// Held resources with a positive quantity, in catalogue order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceType, u32)> + '_ {
        self.stock
            .iter()
            .filter(|(_, quantity)| **quantity > 0)
            .map(|(resource, quantity)| (*resource, *quantity))
    }

    /// Total units across every resource.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.stock.values().map(|quantity| u64::from(*quantity)).sum()
    }
}

/// Withdrawals planned during a single settlement pass.
///
/// Systems that emit several withdrawal commands before any of them is
/// applied record each one here so later plans see the reduced stock.
#[derive(Clone, Debug, Default)]
pub struct StockLedger {
    withdrawn: BTreeMap<(BuildingId, ResourceType), u32>,
}

impl StockLedger {
    /// Units still available once planned withdrawals are subtracted.
    #[must_use]
    pub fn available(
        &self,
        building: BuildingId,
        inventory: &Inventory,
        resource: ResourceType,
    ) -> u32 {
        let planned = self
            .withdrawn
            .get(&(building, resource))
            .copied()
            .unwrap_or(0);
        inventory.quantity(resource).saturating_sub(planned)
    }

    /// Records a planned withdrawal.
    pub fn record(&mut self, building: BuildingId, resource: ResourceType, quantity: u32) {
        let entry = self.withdrawn.entry((building, resource)).or_insert(0);
        *entry = entry.saturating_add(quantity);
    }
}
