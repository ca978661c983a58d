//! Declared transport routes between storage buildings.

use hamlet_core::{BuildingId, ResourceType, RouteId};

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Route {
    pub(crate) source: BuildingId,
    pub(crate) target: BuildingId,
    pub(crate) whitelist: Vec<ResourceType>,
    pub(crate) last_cost: Option<f32>,
    pub(crate) last_moved: u32,
}

impl Route {
    pub(crate) fn new(source: BuildingId, target: BuildingId, whitelist: Vec<ResourceType>) -> Self {
        Self {
            source,
            target,
            whitelist,
            last_cost: None,
            last_moved: 0,
        }
    }
}

/// Read-only view of a route.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteSnapshot {
    /// Identifier of the route.
    pub id: RouteId,
    /// Storage the goods leave from.
    pub source: BuildingId,
    /// Storage the goods arrive at.
    pub target: BuildingId,
    /// Allowed resources; empty allows every resource.
    pub whitelist: Vec<ResourceType>,
    /// Path cost computed during the last settlement, if any.
    pub last_cost: Option<f32>,
    /// Units moved during the last settlement.
    pub last_moved: u32,
}

impl RouteSnapshot {
    /// Resources eligible for transfer: the whitelist as declared, or the whole catalogue.
    pub fn eligible_resources(&self) -> Vec<ResourceType> {
        if self.whitelist.is_empty() {
            ResourceType::ALL.to_vec()
        } else {
            self.whitelist.clone()
        }
    }
}
