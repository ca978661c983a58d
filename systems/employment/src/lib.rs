#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Employment assignment between housing labour pools and job providers.
//!
//! At the start of each turn every constructed house offers
//! `floor(population × employment_percent / 100)` workers. Houses are visited
//! in ascending identifier order and fill the reachable providers greedily,
//! nearest first, higher priority first among equals, with a seeded random
//! key breaking any remaining tie. At the end of the turn the global
//! employment rate is mapped to a happiness adjustment.

use std::{cmp::Ordering, collections::BTreeMap};

use hamlet_core::{
    BuildingId, BuildingKind, Command, EmploymentPlan, HousingEmployment, ProviderOccupancy,
};
use hamlet_world::{
    query::{self, BuildingSnapshot},
    reachability::{approach_cost, departure_seeds, reachable_from},
    World,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

mod curve;

pub use curve::{HappinessCurve, Keyframe};

/// Tunable parameters of the employment system.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmploymentTuning {
    /// Mapping from employment rate to happiness change.
    pub curve: HappinessCurve,
    /// Rate at or above which the labour market is reported as tight.
    pub tightness_threshold: f32,
}

impl Default for EmploymentTuning {
    fn default() -> Self {
        Self {
            curve: HappinessCurve::default(),
            tightness_threshold: 0.95,
        }
    }
}

/// Pure system that assigns workers and converts employment into happiness.
#[derive(Debug)]
pub struct Employment<R = ChaCha8Rng> {
    tuning: EmploymentTuning,
    rng: R,
}

impl Employment<ChaCha8Rng> {
    /// Creates the system with a ChaCha generator seeded from `seed`.
    #[must_use]
    pub fn seeded(tuning: EmploymentTuning, seed: u64) -> Self {
        Self::with_rng(tuning, ChaCha8Rng::seed_from_u64(seed))
    }

    /// Position of the random stream, in 32-bit words.
    #[must_use]
    pub fn stream_position(&self) -> u128 {
        self.rng.get_word_pos()
    }

    /// Moves the random stream to a position reported by [`Self::stream_position`].
    pub fn seek(&mut self, position: u128) {
        self.rng.set_word_pos(position);
    }
}

impl<R: Rng> Employment<R> {
    /// Creates the system with an explicit random source.
    #[must_use]
    pub fn with_rng(tuning: EmploymentTuning, rng: R) -> Self {
        Self { tuning, rng }
    }

    /// Computes this turn's assignment and emits it as a single command.
    pub fn assign(&mut self, world: &World, out: &mut Vec<Command>) {
        let plan = self.plan(world);
        out.push(Command::ApplyEmployment { plan });
    }

    /// Builds the assignment without emitting it.
    pub fn plan(&mut self, world: &World) -> EmploymentPlan {
        let grid = query::grid(world);
        let buildings = query::buildings(world);

        let mut free_slots: BTreeMap<BuildingId, u32> = BTreeMap::new();
        let mut providers = Vec::new();
        for building in buildings.iter().filter(|building| building.constructed) {
            if let Some(jobs) = query::job_provider(world, building.id) {
                let _ = free_slots.insert(building.id, jobs.slots);
                providers.push((building, jobs));
            }
        }

        let mut plan = EmploymentPlan::default();
        for house in buildings
            .iter()
            .filter(|building| building.constructed && building.config.kind == BuildingKind::House)
        {
            let (Some(params), Some(housing)) =
                (house.config.housing, query::housing(world, house.id))
            else {
                continue;
            };
            let employable = employable_workers(housing.population, params.employment_percent);
            if employable == 0 {
                plan.housing.push(HousingEmployment {
                    building: house.id,
                    employable: 0,
                    employed: 0,
                });
                continue;
            }

            let budget = params.commute_move_points;
            let reach = reachable_from(grid, departure_seeds(grid, house.region), budget);
            let mut candidates: Vec<Candidate> = providers
                .iter()
                .filter(|(provider, _)| provider.id != house.id)
                .filter(|(provider, _)| free_slots.get(&provider.id).is_some_and(|free| *free > 0))
                .filter_map(|(provider, jobs)| {
                    let cost = approach_cost(grid, &reach, provider.region)?;
                    (cost <= jobs.commute_max_cost && cost <= budget).then(|| Candidate {
                        building: provider.id,
                        cost,
                        priority: jobs.priority,
                        tie_break: self.rng.gen(),
                    })
                })
                .collect();
            candidates.sort_by(Candidate::order);

            let mut employed = 0;
            for candidate in candidates {
                if employed == employable {
                    break;
                }
                let Some(free) = free_slots.get_mut(&candidate.building) else {
                    continue;
                };
                let take = (*free).min(employable - employed);
                *free -= take;
                employed += take;
                debug!(
                    house = %house.id,
                    provider = %candidate.building,
                    cost = candidate.cost,
                    workers = take,
                    "assigned workers"
                );
            }

            plan.housing.push(HousingEmployment {
                building: house.id,
                employable,
                employed,
            });
        }

        plan.providers = providers
            .iter()
            .map(|(provider, jobs)| ProviderOccupancy {
                building: provider.id,
                occupied: jobs.slots - free_slots.get(&provider.id).copied().unwrap_or(jobs.slots),
            })
            .collect();
        plan
    }

    /// Converts the current employment rate into a happiness adjustment.
    pub fn settle(&mut self, world: &World, out: &mut Vec<Command>) {
        let rate = employment_rate(world);
        if rate >= self.tuning.tightness_threshold {
            warn!(rate, "labour market is tight");
        }
        let delta = self.tuning.curve.happiness_delta(rate);
        if delta != 0 {
            out.push(Command::AdjustHappiness { delta });
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    building: BuildingId,
    cost: f32,
    priority: u32,
    tie_break: u64,
}

impl Candidate {
    fn order(left: &Self, right: &Self) -> Ordering {
        left.cost
            .total_cmp(&right.cost)
            .then_with(|| right.priority.cmp(&left.priority))
            .then_with(|| left.tie_break.cmp(&right.tie_break))
    }
}

/// Residents able to work given the house's employment share.
#[must_use]
pub fn employable_workers(population: u32, employment_percent: u32) -> u32 {
    (u64::from(population) * u64::from(employment_percent) / 100) as u32
}

/// Share of employable residents with a job across all constructed houses.
#[must_use]
pub fn employment_rate(world: &World) -> f32 {
    let (employed, employable) = query::buildings(world)
        .iter()
        .filter(|building| building.constructed)
        .filter_map(|building: &BuildingSnapshot| query::housing(world, building.id))
        .fold((0_u64, 0_u64), |(employed, employable), housing| {
            (
                employed + u64::from(housing.employed.min(housing.employable)),
                employable + u64::from(housing.employable),
            )
        });
    if employable == 0 {
        return 0.0;
    }
    (employed as f32 / employable as f32).clamp(0.0, 1.0)
}
