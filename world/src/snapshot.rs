//! Export and import of the persistent world state.
//!
//! Snapshots carry only the data needed to rebuild a world: buildings are
//! re-placed through the placement boundary on import and area effects are
//! rebuilt from scratch afterwards. The encoding is left to callers.

use std::collections::BTreeMap;

use hamlet_core::{
    BuildingId, CellCoord, Command, ConfigId, Event, Faction, PlacementError, ResourceType,
    RouteError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{apply, Treasury, World};

/// Persistent state of a whole world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Turn in progress.
    pub turn: u32,
    /// Kingdom statistics.
    pub treasury: Treasury,
    /// Every building in ascending identifier order.
    pub buildings: Vec<BuildingRecord>,
    /// Every declared route in ascending identifier order.
    #[serde(default)]
    pub routes: Vec<RouteRecord>,
}

/// Persistent state of a single building.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildingRecord {
    /// Identifier at export time; routes refer to buildings through it.
    pub id: BuildingId,
    /// Definition backing the building.
    pub config: ConfigId,
    /// Anchor cell.
    pub origin: CellCoord,
    /// Owning faction.
    pub faction: Faction,
    /// Whether construction finished.
    pub constructed: bool,
    /// Turns of construction accumulated.
    pub progress: u32,
    /// Residential counters of houses.
    #[serde(default)]
    pub housing: Option<HousingRecord>,
    /// Goods held by storage buildings.
    #[serde(default)]
    pub inventory: Vec<StockRecord>,
    /// Job slots filled at export time.
    #[serde(default)]
    pub jobs_occupied: u32,
    /// Job slots offered, including level overrides.
    #[serde(default)]
    pub job_slots: Option<u32>,
    /// Upgrade level.
    #[serde(default = "first_level")]
    pub level: u32,
    /// Experience toward the next upgrade level.
    #[serde(default)]
    pub experience: u32,
}

fn first_level() -> u32 {
    1
}

/// Persistent residential counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HousingRecord {
    /// Level of the house.
    pub level: u8,
    /// Residents.
    pub population: u32,
    /// Population ceiling.
    pub max_population: u32,
    /// Residents able to work.
    pub employable: u32,
    /// Residents with a job.
    pub employed: u32,
    /// Experience toward the next level.
    pub experience: u32,
    /// Experience required for the next level.
    pub experience_to_next: u32,
}

/// Quantity of a single resource held in storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    /// Resource held.
    pub resource: ResourceType,
    /// Units held.
    pub quantity: u32,
}

/// Persistent description of a route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRecord {
    /// Exported identifier of the source storage.
    pub source: BuildingId,
    /// Exported identifier of the target storage.
    pub target: BuildingId,
    /// Allowed resources; empty allows every resource.
    #[serde(default)]
    pub whitelist: Vec<ResourceType>,
}

/// Errors raised while importing a snapshot.
///
/// The target world is left partially populated on error and should be discarded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImportError {
    /// The target world already holds buildings or routes.
    #[error("snapshots can only be imported into an empty world")]
    NotEmpty,
    /// A building could not be re-placed.
    #[error("building `{config}` at {origin} could not be placed: {reason:?}")]
    Placement {
        /// Definition of the building.
        config: ConfigId,
        /// Anchor cell of the building.
        origin: CellCoord,
        /// Reason reported by the placement boundary.
        reason: PlacementError,
    },
    /// A route refers to a building absent from the snapshot.
    #[error("route refers to unknown building {0}")]
    UnknownBuilding(BuildingId),
    /// A route could not be declared.
    #[error("route {source_id} -> {target_id} was rejected: {reason:?}")]
    Route {
        /// Exported source identifier.
        source_id: BuildingId,
        /// Exported target identifier.
        target_id: BuildingId,
        /// Reason reported by the world.
        reason: RouteError,
    },
}

/// Captures the persistent state of the world.
#[must_use]
pub fn export(world: &World) -> WorldSnapshot {
    let buildings = world
        .buildings
        .iter()
        .map(|(id, building)| BuildingRecord {
            id: *id,
            config: building.config.id.clone(),
            origin: building.origin,
            faction: building.faction,
            constructed: building.constructed,
            progress: building.progress,
            housing: building.housing().map(|housing| HousingRecord {
                level: housing.level,
                population: housing.population,
                max_population: housing.max_population,
                employable: housing.employable,
                employed: housing.employed,
                experience: housing.experience,
                experience_to_next: housing.experience_to_next,
            }),
            inventory: building
                .inventory()
                .map(|inventory| {
                    inventory
                        .iter()
                        .map(|(resource, quantity)| StockRecord { resource, quantity })
                        .collect()
                })
                .unwrap_or_default(),
            jobs_occupied: building.jobs.map_or(0, |jobs| jobs.occupied),
            job_slots: building.jobs.map(|jobs| jobs.slots),
            level: building.upgrade.level,
            experience: building.upgrade.experience,
        })
        .collect();

    let routes = world
        .routes
        .values()
        .map(|route| RouteRecord {
            source: route.source,
            target: route.target,
            whitelist: route.whitelist.clone(),
        })
        .collect();

    WorldSnapshot {
        turn: world.clock.turn(),
        treasury: world.treasury,
        buildings,
        routes,
    }
}

/// Rebuilds the snapshot inside an empty world.
///
/// Buildings receive fresh identifiers; the returned map translates exported
/// identifiers into the new ones.
pub fn import(
    world: &mut World,
    snapshot: &WorldSnapshot,
    out_events: &mut Vec<Event>,
) -> Result<BTreeMap<BuildingId, BuildingId>, ImportError> {
    if !world.buildings.is_empty() || !world.routes.is_empty() {
        return Err(ImportError::NotEmpty);
    }
    world.clock.restore(snapshot.turn);
    world.treasury = snapshot.treasury;

    let mut remap = BTreeMap::new();
    for record in &snapshot.buildings {
        let mut events = Vec::new();
        apply(
            world,
            Command::PlaceBuilding {
                config: record.config.clone(),
                origin: record.origin,
                faction: record.faction,
            },
            &mut events,
        );
        let placed = events.iter().find_map(|event| match event {
            Event::BuildingPlaced { building, .. } => Some(Ok(*building)),
            Event::PlacementRejected { reason, .. } => Some(Err(reason.clone())),
            _ => None,
        });
        let id = match placed {
            Some(Ok(id)) => id,
            Some(Err(reason)) => {
                return Err(ImportError::Placement {
                    config: record.config.clone(),
                    origin: record.origin,
                    reason,
                })
            }
            None => {
                return Err(ImportError::Placement {
                    config: record.config.clone(),
                    origin: record.origin,
                    reason: PlacementError::UnknownConfig,
                })
            }
        };
        out_events.extend(events);
        restore_building(world, id, record);
        let _ = remap.insert(record.id, id);
    }

    for route in &snapshot.routes {
        let source = *remap
            .get(&route.source)
            .ok_or(ImportError::UnknownBuilding(route.source))?;
        let target = *remap
            .get(&route.target)
            .ok_or(ImportError::UnknownBuilding(route.target))?;
        let mut events = Vec::new();
        apply(
            world,
            Command::DeclareRoute {
                source,
                target,
                whitelist: route.whitelist.clone(),
            },
            &mut events,
        );
        if let Some(reason) = events.iter().find_map(|event| match event {
            Event::RouteRejected { reason, .. } => Some(*reason),
            _ => None,
        }) {
            return Err(ImportError::Route {
                source_id: route.source,
                target_id: route.target,
                reason,
            });
        }
        out_events.extend(events);
    }

    apply(world, Command::RebuildAreaEffects, out_events);
    Ok(remap)
}

fn restore_building(world: &mut World, id: BuildingId, record: &BuildingRecord) {
    let Some(building) = world.buildings.get_mut(&id) else {
        return;
    };
    building.constructed = record.constructed;
    building.progress = record.progress;
    building.upgrade.level = record.level.max(1);
    building.upgrade.experience = record.experience;
    if let Some(jobs) = building.jobs.as_mut() {
        if let Some(slots) = record.job_slots {
            jobs.slots = slots;
        }
        jobs.occupied = record.jobs_occupied.min(jobs.slots);
    }
    if let (Some(housing), Some(saved)) = (building.housing_mut(), record.housing) {
        housing.level = saved.level;
        housing.population = saved.population;
        housing.max_population = saved.max_population;
        housing.employable = saved.employable;
        housing.employed = saved.employed.min(saved.employable);
        housing.unemployed = saved.employable.saturating_sub(housing.employed);
        housing.experience = saved.experience;
        housing.experience_to_next = saved.experience_to_next;
    }
    if let Some(inventory) = building.inventory_mut() {
        for stock in &record.inventory {
            inventory.add(stock.resource, stock.quantity);
        }
    }
}
