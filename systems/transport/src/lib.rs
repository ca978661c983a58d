#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Transport routing between storage buildings.
//!
//! Every turn each route measures the cheapest path `L` between the walkable
//! cells around its two storages, derives a throughput `Q` and an upkeep `M`
//! from it, pays the upkeep and moves up to `Q` units of goods.

use hamlet_core::{CellRect, Command, RouteId, SpendReason, UNBOUNDED_BUDGET};
use hamlet_world::{
    grid::Grid,
    query::{self, BuildingSnapshot},
    reachability::{approach_cells, approach_cost, reachable_from},
    RouteSnapshot, StockLedger, World,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of passes made over the eligible resources when loading goods.
const LOADING_PASSES: usize = 2;

/// Tunable parameters of the transport formulas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportTuning {
    /// Base throughput indexed by storage level, starting at level one.
    pub base_throughput: Vec<u32>,
    /// Added to the path cost before dividing the throughput.
    pub offset: f32,
    /// Upkeep charged per unit of path cost.
    pub maintenance_factor: f32,
    /// Lower bound applied to predicted throughput.
    pub min_predicted: u32,
}

impl Default for TransportTuning {
    fn default() -> Self {
        Self {
            base_throughput: vec![12, 20, 32, 48, 64],
            offset: 1.0,
            maintenance_factor: 0.5,
            min_predicted: 1,
        }
    }
}

impl TransportTuning {
    /// Base throughput of a storage level, clamped into the configured table.
    #[must_use]
    pub fn base_for_level(&self, level: u32) -> u32 {
        let index = (level.max(1) - 1) as usize;
        self.base_throughput
            .get(index)
            .or_else(|| self.base_throughput.last())
            .copied()
            .unwrap_or(0)
    }

    /// Units a route may move per turn.
    #[must_use]
    pub fn throughput(&self, source_level: u32, target_level: u32, cost: f32) -> u32 {
        let base = self
            .base_for_level(source_level)
            .min(self.base_for_level(target_level));
        let divisor = self.offset + cost.max(0.0);
        if divisor <= 0.0 {
            return base;
        }
        (base as f32 / divisor).floor().max(0.0) as u32
    }

    /// Gold charged per turn for a path of the provided cost.
    #[must_use]
    pub fn maintenance(&self, cost: f32) -> u32 {
        (self.maintenance_factor * cost.max(0.0)).ceil().max(0.0) as u32
    }
}

/// Per-turn figures of a route.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoutePrediction {
    /// Cheapest adjacency-to-adjacency path cost.
    pub cost: f32,
    /// Units moved per turn.
    pub quantity: u32,
    /// Gold charged per turn.
    pub maintenance: u32,
}

/// Cheapest path cost between the walkable cells around two footprints.
#[must_use]
pub fn route_cost(grid: &Grid, source: CellRect, target: CellRect) -> Option<f32> {
    let seeds = approach_cells(grid, source)
        .into_iter()
        .map(|cell| (cell, 0.0));
    let reach = reachable_from(grid, seeds, UNBOUNDED_BUDGET);
    approach_cost(grid, &reach, target)
}

/// Pure system that moves goods along declared routes.
#[derive(Debug, Default)]
pub struct Transport {
    tuning: TransportTuning,
}

impl Transport {
    /// Creates the system with the provided tuning.
    #[must_use]
    pub fn new(tuning: TransportTuning) -> Self {
        Self { tuning }
    }

    /// Tuning in use.
    #[must_use]
    pub fn tuning(&self) -> &TransportTuning {
        &self.tuning
    }

    /// Predicts the figures of a route without moving anything.
    ///
    /// Returns `None` when an endpoint is missing or the storages are not connected.
    #[must_use]
    pub fn predict(&self, world: &World, route: RouteId) -> Option<RoutePrediction> {
        let route = query::routes(world).into_iter().find(|entry| entry.id == route)?;
        let (source, target) = endpoints(world, &route)?;
        let mut prediction = self.measure(world, &source, &target)?;
        prediction.quantity = prediction.quantity.max(self.tuning.min_predicted);
        Some(prediction)
    }

    /// Emits upkeep and transfer commands for every route.
    pub fn handle(&mut self, world: &World, out: &mut Vec<Command>) {
        let mut ledger = StockLedger::default();
        for route in query::routes(world) {
            let Some((source, target)) = endpoints(world, &route) else {
                continue;
            };
            if !source.constructed || !target.constructed {
                continue;
            }
            let Some(prediction) = self.measure(world, &source, &target) else {
                debug!(route = route.id.get(), "storages are not connected");
                continue;
            };

            if prediction.maintenance > 0 {
                out.push(Command::SpendGold {
                    amount: prediction.maintenance,
                    reason: SpendReason::RouteUpkeep { route: route.id },
                });
            }

            let moved = load(world, &route, prediction.quantity, &mut ledger, out);
            out.push(Command::RecordRouteOutcome {
                route: route.id,
                cost: prediction.cost,
                moved,
            });
        }
    }

    fn measure(
        &self,
        world: &World,
        source: &BuildingSnapshot,
        target: &BuildingSnapshot,
    ) -> Option<RoutePrediction> {
        let cost = route_cost(query::grid(world), source.region, target.region)?;
        Some(RoutePrediction {
            cost,
            quantity: self
                .tuning
                .throughput(source.level, target.level, cost),
            maintenance: self.tuning.maintenance(cost),
        })
    }
}

fn endpoints(
    world: &World,
    route: &RouteSnapshot,
) -> Option<(BuildingSnapshot, BuildingSnapshot)> {
    Some((
        query::building(world, route.source)?,
        query::building(world, route.target)?,
    ))
}

fn load(
    world: &World,
    route: &RouteSnapshot,
    quota: u32,
    ledger: &mut StockLedger,
    out: &mut Vec<Command>,
) -> u32 {
    let Some(stock) = query::inventory(world, route.source) else {
        return 0;
    };
    let resources = route.eligible_resources();
    let mut moved = 0;
    for _ in 0..LOADING_PASSES {
        for resource in &resources {
            if moved >= quota {
                return moved;
            }
            let take = ledger
                .available(route.source, stock, *resource)
                .min(quota - moved);
            if take == 0 {
                continue;
            }
            ledger.record(route.source, *resource, take);
            moved += take;
            out.push(Command::TransferGoods {
                route: route.id,
                resource: *resource,
                quantity: take,
            });
        }
    }
    moved
}
