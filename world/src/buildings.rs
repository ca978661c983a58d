//! Building instances and the role-specific state they carry.

use std::sync::Arc;

use hamlet_core::{
    BuildingConfig, BuildingKind, CellCoord, CellRect, Faction, FoodSourceMode,
};

use crate::inventory::Inventory;

/// Capability of storage buildings that houses may fetch food from.
pub trait FoodProvider {
    /// Goods held by the provider.
    fn stock(&self) -> &Inventory;

    /// Reports whether a house with the given mode may fetch from this provider.
    fn feeds(&self, mode: FoodSourceMode) -> bool;
}

/// Food storage that feeds every house.
#[derive(Clone, Debug, Default)]
pub struct Granary {
    inventory: Inventory,
}

impl FoodProvider for Granary {
    fn stock(&self) -> &Inventory {
        &self.inventory
    }

    fn feeds(&self, _mode: FoodSourceMode) -> bool {
        true
    }
}

/// General storage that feeds houses only when they allow it.
#[derive(Clone, Debug, Default)]
pub struct Warehouse {
    inventory: Inventory,
}

impl FoodProvider for Warehouse {
    fn stock(&self) -> &Inventory {
        &self.inventory
    }

    fn feeds(&self, mode: FoodSourceMode) -> bool {
        mode == FoodSourceMode::GranaryOrWarehouse
    }
}

/// Residential counters of a house.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct HousingState {
    pub(crate) level: u8,
    pub(crate) population: u32,
    pub(crate) max_population: u32,
    pub(crate) employable: u32,
    pub(crate) employed: u32,
    pub(crate) unemployed: u32,
    pub(crate) experience: u32,
    pub(crate) experience_to_next: u32,
}

/// Experience a level-one house needs before its first promotion.
pub const INITIAL_EXPERIENCE_TO_NEXT: u32 = 60;

impl HousingState {
    fn new(max_population: u32) -> Self {
        Self {
            level: 1,
            population: 0,
            max_population,
            employable: 0,
            employed: 0,
            unemployed: 0,
            experience: 0,
            experience_to_next: INITIAL_EXPERIENCE_TO_NEXT,
        }
    }
}

/// Job slot usage of a provider.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct JobProvider {
    pub(crate) slots: u32,
    pub(crate) occupied: u32,
    pub(crate) priority: u32,
    pub(crate) commute_max_cost: f32,
}

impl JobProvider {
    fn from_config(config: &BuildingConfig, occupied: u32) -> Option<Self> {
        config.jobs.map(|jobs| Self {
            slots: jobs.slots,
            occupied: occupied.min(jobs.slots),
            priority: jobs.priority,
            commute_max_cost: jobs.commute_max_cost,
        })
    }
}

/// Level and experience of an upgradable building.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct UpgradeState {
    pub(crate) level: u32,
    pub(crate) experience: u32,
}

/// Role-specific state selected from the building kind.
#[derive(Clone, Debug)]
pub(crate) enum BuildingRole {
    Housing(HousingState),
    Granary(Granary),
    Warehouse(Warehouse),
    Plain,
}

/// Building instance placed in the world.
#[derive(Clone, Debug)]
pub(crate) struct Building {
    pub(crate) config: Arc<BuildingConfig>,
    pub(crate) origin: CellCoord,
    pub(crate) faction: Faction,
    pub(crate) constructed: bool,
    pub(crate) progress: u32,
    pub(crate) role: BuildingRole,
    pub(crate) jobs: Option<JobProvider>,
    pub(crate) upgrade: UpgradeState,
}

impl Building {
    pub(crate) fn new(config: Arc<BuildingConfig>, origin: CellCoord, faction: Faction) -> Self {
        let role = match config.kind {
            BuildingKind::House => BuildingRole::Housing(HousingState::new(
                config.housing.map_or(0, |params| params.max_population),
            )),
            BuildingKind::Granary => BuildingRole::Granary(Granary::default()),
            BuildingKind::Warehouse => BuildingRole::Warehouse(Warehouse::default()),
            BuildingKind::Service | BuildingKind::Civic => BuildingRole::Plain,
        };
        let jobs = JobProvider::from_config(&config, 0);
        let upgrade = UpgradeState {
            level: config.level.max(1),
            experience: 0,
        };
        Self {
            config,
            origin,
            faction,
            constructed: false,
            progress: 0,
            role,
            jobs,
            upgrade,
        }
    }

    pub(crate) fn footprint(&self) -> CellRect {
        self.config.footprint(self.origin)
    }

    /// Swaps the definition and recomputes the job slots it offers.
    pub(crate) fn replace_config(&mut self, config: Arc<BuildingConfig>) {
        let occupied = self.jobs.map_or(0, |jobs| jobs.occupied);
        self.jobs = JobProvider::from_config(&config, occupied);
        self.config = config;
    }

    /// Writes the capacity overrides that apply to this building's roles.
    ///
    /// Returns the overrides that took effect.
    pub(crate) fn override_capacity(
        &mut self,
        job_slots: Option<u32>,
        max_population: Option<u32>,
    ) -> (Option<u32>, Option<u32>) {
        let slots = match (self.jobs.as_mut(), job_slots) {
            (Some(jobs), Some(slots)) => {
                jobs.slots = slots;
                jobs.occupied = jobs.occupied.min(slots);
                Some(slots)
            }
            _ => None,
        };
        let ceiling = match (self.housing_mut(), max_population) {
            (Some(housing), Some(ceiling)) => {
                housing.max_population = ceiling;
                Some(ceiling)
            }
            _ => None,
        };
        (slots, ceiling)
    }

    pub(crate) fn housing(&self) -> Option<&HousingState> {
        match &self.role {
            BuildingRole::Housing(state) => Some(state),
            _ => None,
        }
    }

    pub(crate) fn housing_mut(&mut self) -> Option<&mut HousingState> {
        match &mut self.role {
            BuildingRole::Housing(state) => Some(state),
            _ => None,
        }
    }

    pub(crate) fn inventory(&self) -> Option<&Inventory> {
        match &self.role {
            BuildingRole::Granary(granary) => Some(&granary.inventory),
            BuildingRole::Warehouse(warehouse) => Some(&warehouse.inventory),
            _ => None,
        }
    }

    pub(crate) fn inventory_mut(&mut self) -> Option<&mut Inventory> {
        match &mut self.role {
            BuildingRole::Granary(granary) => Some(&mut granary.inventory),
            BuildingRole::Warehouse(warehouse) => Some(&mut warehouse.inventory),
            _ => None,
        }
    }

    pub(crate) fn food_provider(&self) -> Option<&dyn FoodProvider> {
        match &self.role {
            BuildingRole::Granary(granary) => Some(granary),
            BuildingRole::Warehouse(warehouse) => Some(warehouse),
            _ => None,
        }
    }
}

/// Identifier allocator that never reuses identifiers.
#[derive(Clone, Copy, Debug)]
pub(crate) struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub(crate) const fn new() -> Self {
        Self { next: 1 }
    }

    pub(crate) fn allocate(&mut self) -> u32 {
        let value = self.next;
        self.next = self.next.saturating_add(1);
        value
    }
}
