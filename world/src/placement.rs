//! Footprint validation against the grid and the occupancy index.

use hamlet_core::{CellRect, PlacementFlags, PlacementIssue};

use crate::{grid::Grid, occupancy::Occupancy};

/// Lists every footprint cell that cannot host a building, with all its reasons.
pub(crate) fn validate_area(
    grid: &Grid,
    occupancy: &Occupancy,
    footprint: CellRect,
) -> Vec<PlacementIssue> {
    footprint
        .cells()
        .filter_map(|cell| {
            let mut reasons = PlacementFlags::NONE;
            if !grid.is_inside(cell) {
                reasons.insert(PlacementFlags::OUT_OF_BOUNDS);
            } else {
                if grid.is_blocked(cell) {
                    reasons.insert(PlacementFlags::BLOCKED);
                }
                if grid.has_road(cell) {
                    reasons.insert(PlacementFlags::ROAD);
                }
                if occupancy.occupant(cell).is_some() {
                    reasons.insert(PlacementFlags::OCCUPIED);
                }
            }
            (!reasons.is_empty()).then_some(PlacementIssue { cell, reasons })
        })
        .collect()
}
