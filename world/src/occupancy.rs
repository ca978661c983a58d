//! Dense cell to building registry used for placement legality.

use hamlet_core::{BuildingId, CellCoord, CellRect};

use crate::grid::GridBounds;

/// Maps every footprint cell back to the single building that owns it.
#[derive(Clone, Debug, Default)]
pub(crate) struct Occupancy {
    bounds: GridBounds,
    cells: Vec<Option<BuildingId>>,
}

impl Occupancy {
    pub(crate) fn new(bounds: GridBounds) -> Self {
        Self {
            bounds,
            cells: vec![None; bounds.len()],
        }
    }

    pub(crate) fn occupant(&self, cell: CellCoord) -> Option<BuildingId> {
        self.bounds
            .index(cell)
            .and_then(|index| self.cells.get(index).copied().flatten())
    }

    pub(crate) fn register(&mut self, building: BuildingId, footprint: CellRect) {
        for cell in footprint.cells() {
            if let Some(index) = self.bounds.index(cell) {
                debug_assert!(
                    self.cells[index].is_none(),
                    "cell {cell} registered twice (owner {:?}, newcomer {building})",
                    self.cells[index]
                );
                self.cells[index] = Some(building);
            }
        }
    }

    pub(crate) fn unregister(&mut self, building: BuildingId, footprint: CellRect) {
        for cell in footprint.cells() {
            if let Some(index) = self.bounds.index(cell) {
                if self.cells[index] == Some(building) {
                    self.cells[index] = None;
                }
            }
        }
    }
}
