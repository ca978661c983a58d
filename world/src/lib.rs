#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for the Hamlet colony simulation.

use std::{collections::BTreeMap, sync::Arc};

use hamlet_core::{
    BuildingCatalog, BuildingId, CellCoord, Command, ConfigId, EmploymentPlan, Event, Faction,
    HousingSettlement, PlacementError, ResourceType, RouteError, RouteId,
};
use tracing::{debug, info, warn};

mod area_effect;
mod buildings;
pub mod grid;
pub mod inventory;
mod occupancy;
mod placement;
pub mod reachability;
mod routes;
pub mod snapshot;
mod treasury;
mod turn;

use area_effect::{AreaEffects, Contribution};
use buildings::{Building, IdAllocator};
use grid::{Grid, GridLayers};
use occupancy::Occupancy;
use routes::Route;
use turn::TurnClock;

pub use buildings::{FoodProvider, Granary, Warehouse, INITIAL_EXPERIENCE_TO_NEXT};
pub use inventory::{Inventory, InventoryError, StockLedger};
pub use routes::RouteSnapshot;
pub use treasury::{Treasury, DEFAULT_HAPPINESS, MAX_HAPPINESS, MIN_HAPPINESS};
pub use turn::FIRST_TURN;

/// Represents the authoritative Hamlet world state.
#[derive(Debug)]
pub struct World {
    catalog: BuildingCatalog,
    grid: Grid,
    occupancy: Occupancy,
    area_effects: AreaEffects,
    buildings: BTreeMap<BuildingId, Building>,
    building_ids: IdAllocator,
    routes: BTreeMap<RouteId, Route>,
    route_ids: IdAllocator,
    clock: TurnClock,
    treasury: Treasury,
}

impl World {
    /// Creates a world baked from the provided layers with no buildings placed.
    #[must_use]
    pub fn new(catalog: BuildingCatalog, layers: &GridLayers) -> Self {
        let grid = Grid::bake(layers);
        let bounds = grid.bounds();
        Self {
            catalog,
            occupancy: Occupancy::new(bounds),
            area_effects: AreaEffects::new(bounds),
            grid,
            buildings: BTreeMap::new(),
            building_ids: IdAllocator::new(),
            routes: BTreeMap::new(),
            route_ids: IdAllocator::new(),
            clock: TurnClock::new(),
            treasury: Treasury::default(),
        }
    }

    /// Replaces the starting treasury.
    #[must_use]
    pub fn with_treasury(mut self, treasury: Treasury) -> Self {
        self.treasury = treasury;
        self
    }

    fn place(
        &mut self,
        config_id: ConfigId,
        origin: CellCoord,
        faction: Faction,
        out_events: &mut Vec<Event>,
    ) {
        let Some(config) = self.catalog.get(&config_id).cloned() else {
            out_events.push(Event::PlacementRejected {
                config: config_id,
                origin,
                reason: PlacementError::UnknownConfig,
            });
            return;
        };

        let footprint = config.footprint(origin);
        let issues = placement::validate_area(&self.grid, &self.occupancy, footprint);
        if !issues.is_empty() {
            debug!(config = %config_id, %origin, issues = issues.len(), "placement rejected");
            out_events.push(Event::PlacementRejected {
                config: config_id,
                origin,
                reason: PlacementError::Obstructed(issues),
            });
            return;
        }

        let id = BuildingId::new(self.building_ids.allocate());
        self.occupancy.register(id, footprint);
        for cell in footprint.cells() {
            let _ = self.grid.set_blocked(cell, true);
        }
        let immediate = config.build_turns == 0;
        let _ = self
            .buildings
            .insert(id, Building::new(Arc::clone(&config), origin, faction));
        out_events.push(Event::BuildingPlaced {
            building: id,
            config: config_id,
            faction,
            region: footprint,
        });

        if immediate {
            self.complete_construction(id, out_events);
        }
    }

    fn demolish(&mut self, id: BuildingId, out_events: &mut Vec<Event>) {
        let Some(building) = self.buildings.remove(&id) else {
            out_events.push(Event::DemolitionRejected { building: id });
            return;
        };

        let footprint = building.footprint();
        self.occupancy.unregister(id, footprint);
        for cell in footprint.cells() {
            let _ = self.grid.set_blocked(cell, false);
        }
        if building.constructed {
            self.area_effects.apply(
                &mut self.grid,
                &building.config,
                building.origin,
                Contribution::Remove,
            );
        }
        info!(building = %id, config = %building.config.id, "building demolished");
        out_events.push(Event::BuildingDemolished {
            building: id,
            config: building.config.id.clone(),
            faction: building.faction,
            was_constructed: building.constructed,
            region: footprint,
        });

        self.routes.retain(|route, declared| {
            let keep = declared.source != id && declared.target != id;
            if !keep {
                debug!(route = route.get(), building = %id, "route lost an endpoint");
                out_events.push(Event::RouteRemoved { route: *route });
            }
            keep
        });
    }

    fn settle_leveling(
        &mut self,
        id: BuildingId,
        level: u32,
        experience: u32,
        out_events: &mut Vec<Event>,
    ) {
        let Some(building) = self.buildings.get_mut(&id) else {
            return;
        };
        let previous_level = building.upgrade.level;
        building.upgrade.level = level;
        building.upgrade.experience = experience;
        out_events.push(Event::LevelingSettled {
            building: id,
            level,
            experience,
        });
        if level > previous_level {
            info!(building = %id, level, "building levelled up");
            out_events.push(Event::BuildingLeveledUp {
                building: id,
                level,
            });
        }
    }

    fn complete_construction(&mut self, id: BuildingId, out_events: &mut Vec<Event>) {
        let Some(building) = self.buildings.get_mut(&id) else {
            return;
        };
        if building.constructed {
            return;
        }
        building.constructed = true;
        building.progress = building.progress.max(building.config.build_turns);
        self.area_effects.apply(
            &mut self.grid,
            &building.config,
            building.origin,
            Contribution::Add,
        );
        info!(building = %id, config = %building.config.id, "construction complete");
        out_events.push(Event::BuildingConstructed {
            building: id,
            config: building.config.id.clone(),
            faction: building.faction,
        });
    }

    fn rebuild_area_effects(&mut self, out_events: &mut Vec<Event>) {
        self.area_effects.rebuild(
            &mut self.grid,
            self.buildings
                .values()
                .filter(|building| building.constructed)
                .map(|building| (building.config.as_ref(), building.origin)),
        );
        out_events.push(Event::AreaEffectsRebuilt);
    }

    fn apply_employment(&mut self, plan: EmploymentPlan, out_events: &mut Vec<Event>) {
        for building in self.buildings.values_mut() {
            if let Some(jobs) = building.jobs.as_mut() {
                jobs.occupied = 0;
            }
            if let Some(housing) = building.housing_mut() {
                housing.employable = 0;
                housing.employed = 0;
                housing.unemployed = 0;
            }
        }

        for occupancy in plan.providers {
            let Some(jobs) = self
                .buildings
                .get_mut(&occupancy.building)
                .and_then(|building| building.jobs.as_mut())
            else {
                continue;
            };
            debug_assert!(
                occupancy.occupied <= jobs.slots,
                "provider {} overfilled",
                occupancy.building
            );
            jobs.occupied = occupancy.occupied.min(jobs.slots);
        }

        let mut employable = 0_u32;
        let mut employed = 0_u32;
        for entry in plan.housing {
            let Some(housing) = self
                .buildings
                .get_mut(&entry.building)
                .and_then(Building::housing_mut)
            else {
                continue;
            };
            housing.employable = entry.employable;
            housing.employed = entry.employed.min(entry.employable);
            housing.unemployed = entry.employable.saturating_sub(housing.employed);
            employable = employable.saturating_add(housing.employable);
            employed = employed.saturating_add(housing.employed);
        }

        out_events.push(Event::EmploymentAssigned {
            employable,
            employed,
        });
    }

    fn settle_housing(&mut self, settlement: HousingSettlement, out_events: &mut Vec<Event>) {
        let Some(housing) = self
            .buildings
            .get_mut(&settlement.building)
            .and_then(Building::housing_mut)
        else {
            return;
        };
        let previous_level = housing.level;
        housing.population = settlement.population;
        housing.level = settlement.level;
        housing.max_population = settlement.max_population;
        housing.experience = settlement.experience;
        housing.experience_to_next = settlement.experience_to_next;

        out_events.push(Event::HousingSettled {
            building: settlement.building,
            population: settlement.population,
        });
        if settlement.level > previous_level {
            info!(building = %settlement.building, level = settlement.level, "house levelled up");
            out_events.push(Event::HousingLeveledUp {
                building: settlement.building,
                level: settlement.level,
            });
        }
    }

    fn withdraw(
        &mut self,
        id: BuildingId,
        resource: ResourceType,
        quantity: u32,
        out_events: &mut Vec<Event>,
    ) -> bool {
        let Some(inventory) = self
            .buildings
            .get_mut(&id)
            .and_then(Building::inventory_mut)
        else {
            out_events.push(Event::WithdrawalRejected {
                building: id,
                resource,
                requested: quantity,
                available: 0,
            });
            return false;
        };
        match inventory.try_consume(resource, quantity) {
            Ok(()) => true,
            Err(InventoryError::Insufficient {
                requested,
                available,
                ..
            }) => {
                warn!(building = %id, ?resource, requested, available, "withdrawal rejected");
                out_events.push(Event::WithdrawalRejected {
                    building: id,
                    resource,
                    requested,
                    available,
                });
                false
            }
        }
    }

    fn deposit(&mut self, id: BuildingId, resource: ResourceType, quantity: u32) -> bool {
        match self
            .buildings
            .get_mut(&id)
            .and_then(Building::inventory_mut)
        {
            Some(inventory) => {
                inventory.add(resource, quantity);
                true
            }
            None => false,
        }
    }

    fn declare_route(
        &mut self,
        source: BuildingId,
        target: BuildingId,
        whitelist: Vec<ResourceType>,
        out_events: &mut Vec<Event>,
    ) {
        let endpoint = |id: &BuildingId| self.buildings.get(id);
        let verdict = match (endpoint(&source), endpoint(&target)) {
            _ if source == target => Err(RouteError::SameEndpoint),
            (Some(from), Some(to)) => {
                if from.config.kind.is_storage() && to.config.kind.is_storage() {
                    Ok(())
                } else {
                    Err(RouteError::NotStorage)
                }
            }
            _ => Err(RouteError::MissingEndpoint),
        };

        match verdict {
            Ok(()) => {
                let route = RouteId::new(self.route_ids.allocate());
                let _ = self
                    .routes
                    .insert(route, Route::new(source, target, whitelist));
                out_events.push(Event::RouteDeclared {
                    route,
                    source,
                    target,
                });
            }
            Err(reason) => out_events.push(Event::RouteRejected {
                source,
                target,
                reason,
            }),
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::PlaceBuilding {
            config,
            origin,
            faction,
        } => world.place(config, origin, faction, out_events),
        Command::DemolishBuilding { building } => world.demolish(building, out_events),
        Command::ReplaceConfig { building, config } => {
            let replacement = world.catalog.get(&config).cloned();
            let target = world.buildings.get_mut(&building);
            match (target, replacement) {
                (Some(target), Some(replacement)) if replacement.size == target.config.size => {
                    let from = target.config.id.clone();
                    target.replace_config(replacement);
                    out_events.push(Event::ConfigReplaced {
                        building,
                        from,
                        to: config,
                    });
                    world.rebuild_area_effects(out_events);
                }
                _ => out_events.push(Event::ConfigReplacementRejected { building, config }),
            }
        }
        Command::AdvanceConstruction { building } => {
            let Some(target) = world.buildings.get_mut(&building) else {
                return;
            };
            if target.constructed {
                return;
            }
            target.progress = target.progress.saturating_add(1);
            let (progress, required) = (target.progress, target.config.build_turns);
            if progress >= required {
                world.complete_construction(building, out_events);
            } else {
                out_events.push(Event::ConstructionProgressed {
                    building,
                    progress,
                    required,
                });
            }
        }
        Command::SpendGold { amount, reason } => {
            let spent = world.treasury.spend(amount);
            if spent < amount {
                warn!(requested = amount, spent, ?reason, "treasury ran dry");
            }
            out_events.push(Event::GoldSpent {
                requested: amount,
                spent,
                reason,
            });
        }
        Command::AdjustHappiness { delta } => {
            let from = world.treasury.adjust_happiness(delta);
            out_events.push(Event::HappinessChanged {
                from,
                to: world.treasury.happiness,
            });
        }
        Command::ApplyEmployment { plan } => world.apply_employment(plan, out_events),
        Command::SettleHousing(settlement) => world.settle_housing(settlement, out_events),
        Command::SettleLeveling {
            building,
            level,
            experience,
        } => world.settle_leveling(building, level, experience, out_events),
        Command::OverrideCapacity {
            building,
            job_slots,
            max_population,
        } => {
            let Some(target) = world.buildings.get_mut(&building) else {
                return;
            };
            let (job_slots, max_population) = target.override_capacity(job_slots, max_population);
            out_events.push(Event::CapacityOverridden {
                building,
                job_slots,
                max_population,
            });
        }
        Command::WithdrawGoods {
            building,
            resource,
            quantity,
        } => {
            if world.withdraw(building, resource, quantity, out_events) {
                out_events.push(Event::GoodsWithdrawn {
                    building,
                    resource,
                    quantity,
                });
            }
        }
        Command::DepositGoods {
            building,
            resource,
            quantity,
        } => {
            if world.deposit(building, resource, quantity) {
                out_events.push(Event::GoodsDeposited {
                    building,
                    resource,
                    quantity,
                });
            } else {
                debug!(%building, ?resource, "deposit ignored by non-storage building");
            }
        }
        Command::TransferGoods {
            route,
            resource,
            quantity,
        } => {
            let Some((source, target)) = world
                .routes
                .get(&route)
                .map(|declared| (declared.source, declared.target))
            else {
                return;
            };
            if world.buildings.get(&target).and_then(Building::inventory).is_none() {
                return;
            }
            if world.withdraw(source, resource, quantity, out_events) {
                let _ = world.deposit(target, resource, quantity);
                debug!(route = route.get(), ?resource, quantity, "goods transferred");
                out_events.push(Event::GoodsTransferred {
                    route,
                    resource,
                    quantity,
                });
            }
        }
        Command::RecordRouteOutcome { route, cost, moved } => {
            if let Some(declared) = world.routes.get_mut(&route) {
                declared.last_cost = Some(cost);
                declared.last_moved = moved;
                out_events.push(Event::RouteSettled { route, cost, moved });
            }
        }
        Command::DeclareRoute {
            source,
            target,
            whitelist,
        } => world.declare_route(source, target, whitelist, out_events),
        Command::RemoveRoute { route } => {
            if world.routes.remove(&route).is_some() {
                out_events.push(Event::RouteRemoved { route });
            }
        }
        Command::RebuildAreaEffects => world.rebuild_area_effects(out_events),
        Command::AddTurnBlocker { owner, reason } => {
            world.clock.add_blocker(owner.clone(), reason);
            out_events.push(Event::TurnBlockerAdded { owner });
        }
        Command::RemoveTurnBlocker { owner } => {
            if world.clock.remove_blocker(&owner) {
                out_events.push(Event::TurnBlockerRemoved { owner });
            }
        }
        Command::BeginTurn => out_events.push(Event::TurnBegan {
            turn: world.clock.turn(),
        }),
        Command::CloseTurn => {
            let turn = world.clock.turn();
            if world.clock.is_blocked() {
                let blockers = world.clock.blockers();
                warn!(turn, blockers = blockers.len(), "end of turn refused");
                out_events.push(Event::EndTurnRefused { turn, blockers });
            } else {
                out_events.push(Event::BeforeTurnEnd { turn });
            }
        }
        Command::AdvanceTurn => {
            if world.clock.is_blocked() {
                out_events.push(Event::EndTurnRefused {
                    turn: world.clock.turn(),
                    blockers: world.clock.blockers(),
                });
                return;
            }
            let finished = world.clock.advance();
            out_events.push(Event::TurnEnded { turn: finished });
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::sync::Arc;

    use hamlet_core::{
        BuildingCatalog, BuildingConfig, BuildingId, CellCoord, CellRect, Faction,
        PlacementIssue, ServiceLevels, TurnBlocker,
    };

    use super::{
        grid::Grid, placement, Building, FoodProvider, Inventory, RouteSnapshot, Treasury, World,
    };

    /// Number of the turn currently in progress.
    #[must_use]
    pub fn turn(world: &World) -> u32 {
        world.clock.turn()
    }

    /// Reports whether any blocker prevents the turn from ending.
    #[must_use]
    pub fn is_blocked(world: &World) -> bool {
        world.clock.is_blocked()
    }

    /// Registered blockers ordered by owner.
    #[must_use]
    pub fn blockers(world: &World) -> Vec<TurnBlocker> {
        world.clock.blockers()
    }

    /// Provides read-only access to the baked grid.
    #[must_use]
    pub fn grid(world: &World) -> &Grid {
        &world.grid
    }

    /// Effective service levels of a cell.
    #[must_use]
    pub fn service_levels(world: &World, cell: CellCoord) -> Option<ServiceLevels> {
        world.grid.service_levels(cell)
    }

    /// Provides read-only access to the building catalogue.
    #[must_use]
    pub fn catalog(world: &World) -> &BuildingCatalog {
        &world.catalog
    }

    /// Building registered at the cell, if any.
    #[must_use]
    pub fn occupant(world: &World, cell: CellCoord) -> Option<BuildingId> {
        world.occupancy.occupant(cell)
    }

    /// Lists every footprint cell that would reject the building at the origin.
    #[must_use]
    pub fn validate_area(
        world: &World,
        config: &BuildingConfig,
        origin: CellCoord,
    ) -> Vec<PlacementIssue> {
        placement::validate_area(&world.grid, &world.occupancy, config.footprint(origin))
    }

    /// Reports whether the building fits at the origin.
    #[must_use]
    pub fn is_area_free(world: &World, config: &BuildingConfig, origin: CellCoord) -> bool {
        validate_area(world, config, origin).is_empty()
    }

    /// Captures every building in ascending identifier order.
    #[must_use]
    pub fn buildings(world: &World) -> Vec<BuildingSnapshot> {
        world
            .buildings
            .iter()
            .map(|(id, building)| BuildingSnapshot::capture(*id, building))
            .collect()
    }

    /// Captures a single building.
    #[must_use]
    pub fn building(world: &World, id: BuildingId) -> Option<BuildingSnapshot> {
        world
            .buildings
            .get(&id)
            .map(|building| BuildingSnapshot::capture(id, building))
    }

    /// Goods held by a storage building.
    #[must_use]
    pub fn inventory(world: &World, id: BuildingId) -> Option<&Inventory> {
        world.buildings.get(&id).and_then(Building::inventory)
    }

    /// Food capability of a storage building.
    #[must_use]
    pub fn food_provider(world: &World, id: BuildingId) -> Option<&dyn FoodProvider> {
        world.buildings.get(&id).and_then(Building::food_provider)
    }

    /// Residential counters of a house.
    #[must_use]
    pub fn housing(world: &World, id: BuildingId) -> Option<HousingSnapshot> {
        let housing = world.buildings.get(&id)?.housing()?;
        Some(HousingSnapshot {
            building: id,
            level: housing.level,
            population: housing.population,
            max_population: housing.max_population,
            employable: housing.employable,
            employed: housing.employed,
            unemployed: housing.unemployed,
            experience: housing.experience,
            experience_to_next: housing.experience_to_next,
        })
    }

    /// Job slot usage of a provider.
    #[must_use]
    pub fn job_provider(world: &World, id: BuildingId) -> Option<JobProviderSnapshot> {
        let jobs = world.buildings.get(&id)?.jobs?;
        Some(JobProviderSnapshot {
            building: id,
            slots: jobs.slots,
            occupied: jobs.occupied,
            priority: jobs.priority,
            commute_max_cost: jobs.commute_max_cost,
        })
    }

    /// Captures every declared route in ascending identifier order.
    #[must_use]
    pub fn routes(world: &World) -> Vec<RouteSnapshot> {
        world
            .routes
            .iter()
            .map(|(id, route)| RouteSnapshot {
                id: *id,
                source: route.source,
                target: route.target,
                whitelist: route.whitelist.clone(),
                last_cost: route.last_cost,
                last_moved: route.last_moved,
            })
            .collect()
    }

    /// Current kingdom statistics.
    #[must_use]
    pub fn treasury(world: &World) -> Treasury {
        world.treasury
    }

    /// Immutable representation of a single building.
    #[derive(Clone, Debug, PartialEq)]
    pub struct BuildingSnapshot {
        /// Identifier of the building.
        pub id: BuildingId,
        /// Definition backing the building.
        pub config: Arc<BuildingConfig>,
        /// Anchor cell of the footprint.
        pub origin: CellCoord,
        /// Cells covered by the footprint.
        pub region: CellRect,
        /// Owning faction.
        pub faction: Faction,
        /// Whether construction finished.
        pub constructed: bool,
        /// Turns of construction accumulated.
        pub progress: u32,
        /// Current level, starting from the definition's level.
        pub level: u32,
        /// Experience carried toward the next level.
        pub experience: u32,
    }

    impl BuildingSnapshot {
        fn capture(id: BuildingId, building: &Building) -> Self {
            Self {
                id,
                config: Arc::clone(&building.config),
                origin: building.origin,
                region: building.footprint(),
                faction: building.faction,
                constructed: building.constructed,
                progress: building.progress,
                level: building.upgrade.level,
                experience: building.upgrade.experience,
            }
        }
    }

    /// Residential counters of a single house.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct HousingSnapshot {
        /// Housing building.
        pub building: BuildingId,
        /// Current level.
        pub level: u8,
        /// Current residents.
        pub population: u32,
        /// Population ceiling of the level.
        pub max_population: u32,
        /// Residents able to work this turn.
        pub employable: u32,
        /// Residents with a job this turn.
        pub employed: u32,
        /// Employable residents without a job.
        pub unemployed: u32,
        /// Experience toward the next level.
        pub experience: u32,
        /// Experience required for the next level.
        pub experience_to_next: u32,
    }

    /// Job slot usage of a single provider.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct JobProviderSnapshot {
        /// Job-providing building.
        pub building: BuildingId,
        /// Total slots.
        pub slots: u32,
        /// Slots filled this turn.
        pub occupied: u32,
        /// Fill priority.
        pub priority: u32,
        /// Longest accepted commute.
        pub commute_max_cost: f32,
    }

    impl JobProviderSnapshot {
        /// Slots still open.
        #[must_use]
        pub fn free_slots(&self) -> u32 {
            self.slots.saturating_sub(self.occupied)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hamlet_core::{BuildingConfig, BuildingKind, CellRect, PlacementFlags, Ring};

    fn catalog() -> BuildingCatalog {
        let mut clinic = BuildingConfig::new("clinic", BuildingKind::Service);
        clinic.build_turns = 2;
        clinic.medical_rings = vec![Ring { radius: 2, level: 3 }];
        let mut hospital = BuildingConfig::new("hospital", BuildingKind::Service);
        hospital.medical_rings = vec![Ring { radius: 3, level: 5 }];
        let mut plaza = BuildingConfig::new("plaza", BuildingKind::Civic);
        plaza.build_turns = 0;
        plaza.size = 2;
        BuildingCatalog::from_configs([
            clinic,
            hospital,
            plaza,
            BuildingConfig::new("granary", BuildingKind::Granary),
        ])
        .expect("valid catalogue")
    }

    fn world() -> World {
        let map = vec![".".repeat(8); 8].join("\n");
        World::new(catalog(), &GridLayers::from_ascii(&map))
    }

    fn place(world: &mut World, config: &str, x: i32, y: i32) -> BuildingId {
        let mut events = Vec::new();
        apply(
            world,
            Command::PlaceBuilding {
                config: ConfigId::new(config),
                origin: CellCoord::new(x, y),
                faction: Faction::Player,
            },
            &mut events,
        );
        events
            .iter()
            .find_map(|event| match event {
                Event::BuildingPlaced { building, .. } => Some(*building),
                _ => None,
            })
            .expect("placement succeeds")
    }

    #[test]
    fn placement_blocks_and_registers_the_footprint() {
        let mut world = world();
        let plaza = place(&mut world, "plaza", 3, 3);
        for cell in CellRect::square(CellCoord::new(3, 3), 2).cells() {
            assert!(query::grid(&world).is_blocked(cell));
            assert_eq!(query::occupant(&world, cell), Some(plaza));
        }
        let snapshot = query::building(&world, plaza).expect("plaza exists");
        assert!(snapshot.constructed, "zero build turns completes on placement");
    }

    #[test]
    fn overlapping_placement_is_rejected_with_reasons() {
        let mut world = world();
        let _ = place(&mut world, "plaza", 3, 3);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceBuilding {
                config: ConfigId::new("granary"),
                origin: CellCoord::new(4, 4),
                faction: Faction::Player,
            },
            &mut events,
        );
        match events.as_slice() {
            [Event::PlacementRejected {
                reason: PlacementError::Obstructed(issues),
                ..
            }] => {
                assert_eq!(issues.len(), 1);
                assert!(issues[0]
                    .reasons
                    .contains(PlacementFlags::BLOCKED | PlacementFlags::OCCUPIED));
            }
            other => panic!("unexpected events {other:?}"),
        }
    }

    #[test]
    fn unknown_config_is_rejected() {
        let mut world = world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceBuilding {
                config: ConfigId::new("castle"),
                origin: CellCoord::new(0, 0),
                faction: Faction::Player,
            },
            &mut events,
        );
        assert!(matches!(
            events.as_slice(),
            [Event::PlacementRejected {
                reason: PlacementError::UnknownConfig,
                ..
            }]
        ));
    }

    #[test]
    fn construction_completes_once_and_applies_effects() {
        let mut world = world();
        let clinic = place(&mut world, "clinic", 4, 4);
        let origin = CellCoord::new(4, 4);
        let mut events = Vec::new();

        apply(&mut world, Command::AdvanceConstruction { building: clinic }, &mut events);
        assert_eq!(
            events,
            vec![Event::ConstructionProgressed {
                building: clinic,
                progress: 1,
                required: 2,
            }]
        );
        assert_eq!(query::service_levels(&world, origin).map(|l| l.medical), Some(0));

        events.clear();
        apply(&mut world, Command::AdvanceConstruction { building: clinic }, &mut events);
        apply(&mut world, Command::AdvanceConstruction { building: clinic }, &mut events);
        let completions = events
            .iter()
            .filter(|event| matches!(event, Event::BuildingConstructed { .. }))
            .count();
        assert_eq!(completions, 1, "construction notifies exactly once");
        assert_eq!(query::service_levels(&world, origin).map(|l| l.medical), Some(3));
    }

    #[test]
    fn demolition_frees_cells_and_withdraws_effects() {
        let mut world = world();
        let clinic = place(&mut world, "clinic", 4, 4);
        let mut events = Vec::new();
        apply(&mut world, Command::AdvanceConstruction { building: clinic }, &mut events);
        apply(&mut world, Command::AdvanceConstruction { building: clinic }, &mut events);

        events.clear();
        apply(&mut world, Command::DemolishBuilding { building: clinic }, &mut events);
        assert!(matches!(
            events.as_slice(),
            [Event::BuildingDemolished {
                was_constructed: true,
                ..
            }]
        ));
        let origin = CellCoord::new(4, 4);
        assert!(!query::grid(&world).is_blocked(origin));
        assert_eq!(query::occupant(&world, origin), None);
        assert_eq!(query::service_levels(&world, origin).map(|l| l.medical), Some(0));

        events.clear();
        apply(&mut world, Command::DemolishBuilding { building: clinic }, &mut events);
        assert_eq!(events, vec![Event::DemolitionRejected { building: clinic }]);
    }

    #[test]
    fn config_swap_rebuilds_area_effects() {
        let mut world = world();
        let clinic = place(&mut world, "clinic", 4, 4);
        let mut events = Vec::new();
        apply(&mut world, Command::AdvanceConstruction { building: clinic }, &mut events);
        apply(&mut world, Command::AdvanceConstruction { building: clinic }, &mut events);

        events.clear();
        apply(
            &mut world,
            Command::ReplaceConfig {
                building: clinic,
                config: ConfigId::new("hospital"),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![
                Event::ConfigReplaced {
                    building: clinic,
                    from: ConfigId::new("clinic"),
                    to: ConfigId::new("hospital"),
                },
                Event::AreaEffectsRebuilt,
            ]
        );
        assert_eq!(
            query::service_levels(&world, CellCoord::new(7, 4)).map(|l| l.medical),
            Some(5)
        );

        events.clear();
        apply(
            &mut world,
            Command::ReplaceConfig {
                building: clinic,
                config: ConfigId::new("plaza"),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::ConfigReplacementRejected {
                building: clinic,
                config: ConfigId::new("plaza"),
            }]
        );
    }

    #[test]
    fn withdrawals_fail_atomically() {
        let mut world = world();
        let granary = place(&mut world, "granary", 0, 0);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::DepositGoods {
                building: granary,
                resource: ResourceType::Rice,
                quantity: 3,
            },
            &mut events,
        );
        events.clear();
        apply(
            &mut world,
            Command::WithdrawGoods {
                building: granary,
                resource: ResourceType::Rice,
                quantity: 5,
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::WithdrawalRejected {
                building: granary,
                resource: ResourceType::Rice,
                requested: 5,
                available: 3,
            }]
        );
        assert_eq!(
            query::inventory(&world, granary).map(|inventory| inventory.quantity(ResourceType::Rice)),
            Some(3)
        );
    }

    #[test]
    fn blockers_gate_the_end_of_turn() {
        let mut world = world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::AddTurnBlocker {
                owner: "dialog".into(),
                reason: "pending decision".into(),
            },
            &mut events,
        );
        events.clear();
        apply(&mut world, Command::CloseTurn, &mut events);
        assert!(matches!(
            events.as_slice(),
            [Event::EndTurnRefused { turn: 1, blockers }] if blockers.len() == 1
        ));

        events.clear();
        apply(
            &mut world,
            Command::RemoveTurnBlocker {
                owner: "dialog".into(),
            },
            &mut events,
        );
        apply(&mut world, Command::CloseTurn, &mut events);
        apply(&mut world, Command::AdvanceTurn, &mut events);
        assert_eq!(
            events,
            vec![
                Event::TurnBlockerRemoved {
                    owner: "dialog".into()
                },
                Event::BeforeTurnEnd { turn: 1 },
                Event::TurnEnded { turn: 1 },
            ]
        );
        assert_eq!(query::turn(&world), 2);
    }

    #[test]
    fn routes_require_two_distinct_storages() {
        let mut world = world();
        let granary = place(&mut world, "granary", 0, 0);
        let plaza = place(&mut world, "plaza", 4, 4);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::DeclareRoute {
                source: granary,
                target: plaza,
                whitelist: Vec::new(),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::DeclareRoute {
                source: granary,
                target: granary,
                whitelist: Vec::new(),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![
                Event::RouteRejected {
                    source: granary,
                    target: plaza,
                    reason: RouteError::NotStorage,
                },
                Event::RouteRejected {
                    source: granary,
                    target: granary,
                    reason: RouteError::SameEndpoint,
                },
            ]
        );
        assert!(query::routes(&world).is_empty());
    }
}
