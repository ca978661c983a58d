#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Turn orchestration over the authoritative world.
//!
//! [`Simulation`] owns the world together with every per-turn system and runs
//! them in the order configured by a [`TurnPipeline`]. Every command a handler
//! produces is applied before the next handler runs.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use hamlet_core::{
    BuildingId, Command, Event, HousingSettlement, RouteId, Stage, TurnBlocker,
};
use hamlet_system_construction::Construction;
use hamlet_system_employment::Employment;
use hamlet_system_housing::Housing;
use hamlet_system_leveling::Leveling;
use hamlet_system_progression::Progression;
use hamlet_system_transport::{RoutePrediction, Transport};
use hamlet_world::{
    apply,
    grid::GridLayers,
    query,
    snapshot::{self, WorldSnapshot},
    World,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

mod config;
mod pipeline;

pub use config::{default_buildings, PlacementSpec, RouteSpec, SimulationConfig};
pub use pipeline::{TurnPhaseHandler, TurnPipeline};

/// Separates the housing random stream from the employment one.
const HOUSING_STREAM: u64 = 0x9e37_79b9_7f4a_7c15;
/// Separates the levelling random stream from the other two.
const LEVELING_STREAM: u64 = 0xc2b2_ae3d_27d4_eb4f;

/// Result of asking the orchestrator to end the current turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EndTurnOutcome {
    /// The turn was settled and the next one began.
    Advanced {
        /// Turn that ended.
        finished: u32,
        /// Turn now in progress.
        turn: u32,
    },
    /// Registered blockers kept the turn open; nothing changed.
    Refused {
        /// Turn still in progress.
        turn: u32,
        /// Blockers that refused the request.
        blockers: Vec<TurnBlocker>,
    },
}

/// Persistent state of a simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    /// Civic stage reached.
    pub stage: Stage,
    /// Positions of the random streams.
    #[serde(default)]
    pub streams: StreamPositions,
    /// Buildings, routes, treasury and turn.
    pub world: WorldSnapshot,
}

/// Word positions of every seeded random stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamPositions {
    /// Employment stream.
    pub employment: u128,
    /// Housing stream.
    pub housing: u128,
    /// Levelling stream.
    pub leveling: u128,
}

/// Owns the world and every per-turn system.
pub struct Simulation {
    world: World,
    pipeline: TurnPipeline,
    construction: Construction,
    employment: Employment,
    housing: Housing,
    leveling: Leveling,
    transport: Transport,
    progression: Progression,
    journal: Vec<Event>,
}

impl Simulation {
    /// Builds the scenario and begins the first turn.
    pub fn new(config: &SimulationConfig) -> Result<Self> {
        let mut simulation = Self::empty(config)?;
        simulation.populate(config)?;
        simulation.begin_turn();
        Ok(simulation)
    }

    /// Rebuilds a saved simulation on the scenario's map and catalogue.
    ///
    /// Scenario placements and routes are ignored; the snapshot provides them.
    /// Random streams resume where they were saved, so a restored run matches an
    /// uninterrupted one as long as the scenario seed is unchanged.
    /// Returns the translation from saved building identifiers to the new ones.
    pub fn restore(
        config: &SimulationConfig,
        saved: &SimulationSnapshot,
    ) -> Result<(Self, BTreeMap<BuildingId, BuildingId>)> {
        let mut simulation = Self::empty(config)?;
        let remap = snapshot::import(&mut simulation.world, &saved.world, &mut simulation.journal)
            .context("snapshot does not fit the scenario")?;
        simulation.progression.restore(saved.stage, &simulation.world);
        simulation.employment.seek(saved.streams.employment);
        simulation.housing.seek(saved.streams.housing);
        simulation.leveling.seek(saved.streams.leveling);
        info!(
            turn = query::turn(&simulation.world),
            buildings = remap.len(),
            "simulation restored"
        );
        Ok((simulation, remap))
    }

    fn empty(config: &SimulationConfig) -> Result<Self> {
        let catalog = config.catalog().context("invalid building catalogue")?;
        let world = World::new(catalog, &GridLayers::from_ascii(&config.map))
            .with_treasury(config.treasury);
        Ok(Self {
            world,
            pipeline: config.pipeline.clone(),
            construction: Construction,
            employment: Employment::seeded(config.employment.clone(), config.seed),
            housing: Housing::seeded(config.housing.clone(), config.seed ^ HOUSING_STREAM),
            leveling: Leveling::seeded(config.seed ^ LEVELING_STREAM),
            transport: Transport::new(config.transport.clone()),
            progression: Progression::new(config.progression.clone()),
            journal: Vec::new(),
        })
    }

    fn populate(&mut self, config: &SimulationConfig) -> Result<()> {
        let mut placed = Vec::with_capacity(config.placements.len());
        for (index, spec) in config.placements.iter().enumerate() {
            let building = self
                .place(spec)
                .with_context(|| format!("placement #{index} of `{}` failed", spec.config))?;
            placed.push(building);
        }

        for route in &config.routes {
            let source = *placed
                .get(route.source)
                .with_context(|| format!("route source #{} is not a placement", route.source))?;
            let target = *placed
                .get(route.target)
                .with_context(|| format!("route target #{} is not a placement", route.target))?;
            let events = self.submit(Command::DeclareRoute {
                source,
                target,
                whitelist: route.whitelist.clone(),
            });
            if let Some(reason) = events.iter().find_map(|event| match event {
                Event::RouteRejected { reason, .. } => Some(*reason),
                _ => None,
            }) {
                bail!(
                    "route #{} -> #{} was rejected: {reason:?}",
                    route.source,
                    route.target
                );
            }
        }
        Ok(())
    }

    fn place(&mut self, spec: &PlacementSpec) -> Result<BuildingId> {
        let events = self.submit(Command::PlaceBuilding {
            config: spec.config.clone(),
            origin: spec.origin,
            faction: spec.faction,
        });
        let outcome = events.iter().find_map(|event| match event {
            Event::BuildingPlaced { building, .. } => Some(Ok(*building)),
            Event::PlacementRejected { reason, .. } => Some(Err(reason.clone())),
            _ => None,
        });
        let building = match outcome {
            Some(Ok(building)) => building,
            Some(Err(reason)) => bail!("rejected at {}: {reason:?}", spec.origin),
            None => bail!("no placement outcome at {}", spec.origin),
        };

        if spec.constructed {
            let required = query::building(&self.world, building)
                .map_or(0, |snapshot| snapshot.config.build_turns);
            for _ in 0..required {
                if query::building(&self.world, building).is_some_and(|snapshot| snapshot.constructed)
                {
                    break;
                }
                let _ = self.submit(Command::AdvanceConstruction { building });
            }
        }

        for stock in &spec.inventory {
            let _ = self.submit(Command::DepositGoods {
                building,
                resource: stock.resource,
                quantity: stock.quantity,
            });
        }

        if let Some(population) = spec.population {
            let state = query::housing(&self.world, building)
                .context("only houses accept an initial population")?;
            let _ = self.submit(Command::SettleHousing(HousingSettlement {
                building,
                population: population.min(state.max_population),
                level: state.level,
                max_population: state.max_population,
                experience: state.experience,
                experience_to_next: state.experience_to_next,
            }));
        }
        Ok(building)
    }

    /// Applies a command from outside the turn pipeline and returns its events.
    ///
    /// Events are also recorded in the journal.
    pub fn submit(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        apply(&mut self.world, command, &mut events);
        let mut reactions = Vec::new();
        self.progression.handle(&events, &mut reactions);
        events.extend(reactions);
        self.journal.extend(events.iter().cloned());
        events
    }

    /// Closes the current turn unless a blocker is registered.
    pub fn request_end_turn(&mut self) -> EndTurnOutcome {
        let turn = query::turn(&self.world);
        let events = self.submit(Command::CloseTurn);
        if let Some(blockers) = refusal(&events) {
            return EndTurnOutcome::Refused { turn, blockers };
        }

        let handlers = self.pipeline.before_turn_end.clone();
        self.run_handlers(&handlers);

        let events = self.submit(Command::AdvanceTurn);
        if let Some(blockers) = refusal(&events) {
            return EndTurnOutcome::Refused { turn, blockers };
        }
        self.begin_turn();
        EndTurnOutcome::Advanced {
            finished: turn,
            turn: query::turn(&self.world),
        }
    }

    fn begin_turn(&mut self) {
        let _ = self.submit(Command::BeginTurn);
        let handlers = self.pipeline.turn_began.clone();
        self.run_handlers(&handlers);
    }

    fn run_handlers(&mut self, handlers: &[TurnPhaseHandler]) {
        for handler in handlers {
            let mut commands = Vec::new();
            match handler {
                TurnPhaseHandler::Construction => {
                    self.construction.handle(&self.world, &mut commands);
                }
                TurnPhaseHandler::EmploymentAssignment => {
                    self.employment.assign(&self.world, &mut commands);
                }
                TurnPhaseHandler::EmploymentHappiness => {
                    self.employment.settle(&self.world, &mut commands);
                }
                TurnPhaseHandler::Housing => self.housing.handle(&self.world, &mut commands),
                TurnPhaseHandler::Leveling => self.leveling.handle(&self.world, &mut commands),
                TurnPhaseHandler::Transport => self.transport.handle(&self.world, &mut commands),
            }
            debug!(?handler, commands = commands.len(), "phase handler ran");
            for command in commands {
                let _ = self.submit(command);
            }
        }
    }

    /// Grants experience to an upgradable building and applies any promotion.
    ///
    /// Returns `false` when the building is missing or cannot level.
    pub fn grant_experience(&mut self, building: BuildingId, experience: u32) -> bool {
        let mut commands = Vec::new();
        if !self
            .leveling
            .grant(&self.world, building, experience, &mut commands)
        {
            return false;
        }
        for command in commands {
            let _ = self.submit(command);
        }
        true
    }

    /// Registers a blocker that keeps the current turn open.
    pub fn add_blocker(&mut self, owner: impl Into<String>, reason: impl Into<String>) {
        let _ = self.submit(Command::AddTurnBlocker {
            owner: owner.into(),
            reason: reason.into(),
        });
    }

    /// Removes the blocker registered by `owner`, if any.
    pub fn remove_blocker(&mut self, owner: impl Into<String>) {
        let _ = self.submit(Command::RemoveTurnBlocker {
            owner: owner.into(),
        });
    }

    /// Reports whether a blocker keeps the current turn open.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        query::is_blocked(&self.world)
    }

    /// Turn in progress.
    #[must_use]
    pub fn turn(&self) -> u32 {
        query::turn(&self.world)
    }

    /// Civic stage reached.
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.progression.stage()
    }

    /// Read access to the world for queries.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Predicted path cost, throughput and upkeep of a route.
    #[must_use]
    pub fn predict_route(&self, route: RouteId) -> Option<RoutePrediction> {
        self.transport.predict(&self.world, route)
    }

    /// Takes every event recorded since the previous call.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.journal)
    }

    /// Captures the persistent state of the simulation.
    #[must_use]
    pub fn export(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            stage: self.progression.stage(),
            streams: StreamPositions {
                employment: self.employment.stream_position(),
                housing: self.housing.stream_position(),
                leveling: self.leveling.stream_position(),
            },
            world: snapshot::export(&self.world),
        }
    }
}

fn refusal(events: &[Event]) -> Option<Vec<TurnBlocker>> {
    events.iter().find_map(|event| match event {
        Event::EndTurnRefused { blockers, .. } => Some(blockers.clone()),
        _ => None,
    })
}
