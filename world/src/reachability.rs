//! Budgeted uniform-cost search over the cost-weighted grid.

use std::{
    cmp::Reverse,
    collections::{BTreeMap, BTreeSet, BinaryHeap},
};

use hamlet_core::{CellCoord, CellRect};
use ordered_float::OrderedFloat;

use crate::grid::Grid;

/// Minimal accumulated cost of every cell reachable within a budget.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReachableSet {
    costs: BTreeMap<CellCoord, f32>,
}

impl ReachableSet {
    /// Cost of reaching the cell, `None` when it is out of reach.
    #[must_use]
    pub fn cost(&self, cell: CellCoord) -> Option<f32> {
        self.costs.get(&cell).copied()
    }

    /// Reports whether the cell is reachable.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.costs.contains_key(&cell)
    }

    /// Number of reachable cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.costs.len()
    }

    /// Reports whether nothing is reachable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    /// Reachable cells and their costs in coordinate order.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, f32)> + '_ {
        self.costs.iter().map(|(cell, cost)| (*cell, *cost))
    }
}

/// Searches outward from a single start cell at cost zero.
#[must_use]
pub fn reachable(grid: &Grid, start: CellCoord, budget: f32) -> ReachableSet {
    reachable_from(grid, [(start, 0.0)], budget)
}

/// Searches outward from several seed cells, each entering at its own cost.
///
/// Seeds that are blocked, missing or already over budget are ignored. The
/// frontier pops the lowest cost first and breaks ties by discovery order.
#[must_use]
pub fn reachable_from(
    grid: &Grid,
    seeds: impl IntoIterator<Item = (CellCoord, f32)>,
    budget: f32,
) -> ReachableSet {
    let mut best: BTreeMap<CellCoord, f32> = BTreeMap::new();
    let mut frontier = BinaryHeap::new();
    let mut discovered: u64 = 0;

    for (cell, cost) in seeds {
        if grid.is_blocked(cell) || cost > budget || cost < 0.0 {
            continue;
        }
        if best.get(&cell).is_some_and(|known| *known <= cost) {
            continue;
        }
        let _ = best.insert(cell, cost);
        frontier.push(Reverse((OrderedFloat(cost), discovered, cell)));
        discovered += 1;
    }

    let mut settled = BTreeSet::new();
    while let Some(Reverse((OrderedFloat(cost), _, cell))) = frontier.pop() {
        if !settled.insert(cell) {
            continue;
        }
        for neighbor in grid.neighbors8(cell) {
            if settled.contains(&neighbor) {
                continue;
            }
            let next = cost + grid.step_cost(neighbor);
            if next > budget {
                continue;
            }
            if best.get(&neighbor).is_some_and(|known| *known <= next) {
                continue;
            }
            let _ = best.insert(neighbor, next);
            frontier.push(Reverse((OrderedFloat(next), discovered, neighbor)));
            discovered += 1;
        }
    }

    ReachableSet { costs: best }
}

/// Walkable cells 8-adjacent to the footprint, in coordinate order.
#[must_use]
pub fn approach_cells(grid: &Grid, footprint: CellRect) -> Vec<CellCoord> {
    let cells: BTreeSet<CellCoord> = footprint
        .cells()
        .flat_map(|cell| grid.neighbors8(cell).collect::<Vec<_>>())
        .filter(|cell| !footprint.contains(*cell))
        .collect();
    cells.into_iter().collect()
}

/// Seeds for a search that departs from a building, each at its own step cost.
#[must_use]
pub fn departure_seeds(grid: &Grid, footprint: CellRect) -> Vec<(CellCoord, f32)> {
    approach_cells(grid, footprint)
        .into_iter()
        .map(|cell| (cell, grid.step_cost(cell)))
        .collect()
}

/// Cheapest reachable approach cell of the footprint, if any.
#[must_use]
pub fn approach_cost(grid: &Grid, reachable: &ReachableSet, footprint: CellRect) -> Option<f32> {
    approach_cells(grid, footprint)
        .into_iter()
        .filter_map(|cell| reachable.cost(cell))
        .min_by(|left, right| left.total_cmp(right))
}
