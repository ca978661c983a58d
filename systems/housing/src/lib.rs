#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Housing settlement: capacity, population drift, foraging and experience.

use std::collections::BTreeSet;

use hamlet_core::{BuildingId, BuildingKind, Command, HousingSettlement, ResourceType};
use hamlet_world::{
    query::{self, BuildingSnapshot, HousingSnapshot},
    reachability::{approach_cost, departure_seeds, reachable_from},
    FoodProvider, StockLedger, World,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

mod rules;

pub use rules::{Conditions, HousingLevelRule, HousingTuning};

/// Pure system that settles every constructed house at the end of a turn.
#[derive(Debug)]
pub struct Housing<R = ChaCha8Rng> {
    tuning: HousingTuning,
    rng: R,
}

impl Housing<ChaCha8Rng> {
    /// Creates the system with a ChaCha generator seeded from `seed`.
    #[must_use]
    pub fn seeded(tuning: HousingTuning, seed: u64) -> Self {
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

struct ReachableProvider<'a> {
    building: BuildingId,
    cost: f32,
    provider: &'a dyn FoodProvider,
}

impl<R: Rng> Housing<R> {
    /// Creates the system with an explicit random source.
    #[must_use]
    pub fn with_rng(tuning: HousingTuning, rng: R) -> Self {
        Self { tuning, rng }
    }

    /// Level rules in use.
    #[must_use]
    pub fn tuning(&self) -> &HousingTuning {
        &self.tuning
    }

    /// Emits settlement and withdrawal commands for every constructed house.
    pub fn handle(&mut self, world: &World, out: &mut Vec<Command>) {
        let buildings = query::buildings(world);
        let storages: Vec<&BuildingSnapshot> = buildings
            .iter()
            .filter(|building| building.constructed && building.config.kind.is_storage())
            .collect();
        let happiness = query::treasury(world).happiness;
        let mut ledger = StockLedger::default();

        for house in buildings
            .iter()
            .filter(|building| building.constructed && building.config.kind == BuildingKind::House)
        {
            let (Some(params), Some(state)) =
                (house.config.housing, query::housing(world, house.id))
            else {
                continue;
            };
            let Some(rule) = self.tuning.rule(state.level) else {
                continue;
            };

            let grid = query::grid(world);
            let reach = reachable_from(
                grid,
                departure_seeds(grid, house.region),
                params.fetch_move_points,
            );
            let mut providers: Vec<ReachableProvider<'_>> = storages
                .iter()
                .filter_map(|storage| {
                    let provider = query::food_provider(world, storage.id)?;
                    if !provider.feeds(params.food_source) {
                        return None;
                    }
                    let cost = approach_cost(grid, &reach, storage.region)?;
                    Some(ReachableProvider {
                        building: storage.id,
                        cost,
                        provider,
                    })
                })
                .collect();
            providers.sort_by(|left, right| {
                left.cost
                    .total_cmp(&right.cost)
                    .then_with(|| left.building.cmp(&right.building))
            });

            let available_goods: BTreeSet<ResourceType> = providers
                .iter()
                .flat_map(|entry| {
                    entry
                        .provider
                        .stock()
                        .iter()
                        .filter(|(resource, _)| {
                            ledger.available(entry.building, entry.provider.stock(), *resource) > 0
                        })
                        .map(|(resource, _)| resource)
                        .collect::<Vec<_>>()
                })
                .collect();
            let conditions = Conditions {
                available_goods,
                service_levels: query::service_levels(world, house.origin).unwrap_or_default(),
                happiness,
            };

            let target = rule.capacity(&conditions).min(state.max_population);
            let population = drift_population(
                state.population,
                target,
                params.fill_per_turn,
                params.drain_per_turn,
            );

            let need = food_need(population, params.food_per_capita);
            if need > 0 {
                let accepted = rule.accepted_foods();
                let eaten = forage(&providers, &accepted, need, &mut ledger, out);
                if eaten < need {
                    warn!(house = %house.id, need, eaten, "food shortfall");
                }
            }

            let settlement = self.progress(house.id, &state, population);
            debug!(
                house = %house.id,
                population,
                capacity = target,
                level = settlement.level,
                "house settled"
            );
            out.push(Command::SettleHousing(settlement));
        }
    }

    fn progress(
        &mut self,
        building: BuildingId,
        state: &HousingSnapshot,
        population: u32,
    ) -> HousingSettlement {
        let mut settlement = HousingSettlement {
            building,
            population,
            level: state.level,
            max_population: state.max_population,
            experience: state.experience,
            experience_to_next: state.experience_to_next,
        };
        if state.max_population == 0 || population < state.max_population {
            return settlement;
        }

        let low = self.tuning.experience_min.min(self.tuning.experience_max);
        let high = self.tuning.experience_max.max(low);
        let gained = self.rng.gen_range(low..=high);
        settlement.experience = settlement.experience.saturating_add(gained);
        if settlement.experience < settlement.experience_to_next {
            return settlement;
        }

        if settlement.level >= self.tuning.max_level() {
            settlement.experience = settlement.experience_to_next;
            return settlement;
        }

        settlement.level += 1;
        settlement.experience = 0;
        settlement.experience_to_next = self.tuning.next_requirement(settlement.experience_to_next);
        if let Some(rule) = self.tuning.rule(settlement.level) {
            settlement.max_population = rule.max_population;
        }
        settlement
    }
}

/// Draws up to `need` units from the nearest provider that holds an accepted food.
fn forage(
    providers: &[ReachableProvider<'_>],
    accepted: &[ResourceType],
    need: u32,
    ledger: &mut StockLedger,
    out: &mut Vec<Command>,
) -> u32 {
    let Some(chosen) = providers.iter().find(|entry| {
        accepted
            .iter()
            .any(|food| ledger.available(entry.building, entry.provider.stock(), *food) > 0)
    }) else {
        return 0;
    };

    let mut remaining = need;
    for food in accepted {
        if remaining == 0 {
            break;
        }
        let available = ledger.available(chosen.building, chosen.provider.stock(), *food);
        let take = available.min(remaining);
        if take == 0 {
            continue;
        }
        ledger.record(chosen.building, *food, take);
        remaining -= take;
        out.push(Command::WithdrawGoods {
            building: chosen.building,
            resource: *food,
            quantity: take,
        });
    }
    need - remaining
}

/// Moves the population one step toward the target.
#[must_use]
pub fn drift_population(current: u32, target: u32, fill: u32, drain: u32) -> u32 {
    if current < target {
        current.saturating_add(fill).min(target)
    } else if current > target {
        current.saturating_sub(drain).max(target)
    } else {
        current
    }
}

/// Food units eaten per turn, rounded up.
#[must_use]
pub fn food_need(population: u32, per_capita: f32) -> u32 {
    if !per_capita.is_finite() || per_capita <= 0.0 {
        return 0;
    }
    (population as f32 * per_capita).ceil() as u32
}
