//! Incremental take-highest aggregation of service rings.

use hamlet_core::{BuildingConfig, CellCoord, EffectChannel, MAX_SERVICE_LEVEL};

use crate::grid::{Grid, GridBounds};

const LEVEL_SLOTS: usize = MAX_SERVICE_LEVEL as usize + 1;
const CHANNELS: usize = EffectChannel::ALL.len();

type LevelCounters = [[u32; LEVEL_SLOTS]; CHANNELS];

/// Whether a building's rings are being added or withdrawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Contribution {
    Add,
    Remove,
}

fn channel_slot(channel: EffectChannel) -> usize {
    match channel {
        EffectChannel::Medical => 0,
        EffectChannel::Security => 1,
        EffectChannel::Beauty => 2,
    }
}

/// Per-cell, per-channel counters indexed by service level.
#[derive(Clone, Debug)]
pub(crate) struct AreaEffects {
    bounds: GridBounds,
    counters: Vec<LevelCounters>,
}

impl AreaEffects {
    pub(crate) fn new(bounds: GridBounds) -> Self {
        Self {
            bounds,
            counters: vec![[[0; LEVEL_SLOTS]; CHANNELS]; bounds.len()],
        }
    }

    /// Adjusts the counters for every ring of the building and refreshes the grid.
    pub(crate) fn apply(
        &mut self,
        grid: &mut Grid,
        config: &BuildingConfig,
        origin: CellCoord,
        contribution: Contribution,
    ) {
        for channel in EffectChannel::ALL {
            for ring in config.rings(channel) {
                let Some(level) = ring.effective_level() else {
                    continue;
                };
                for cell in diamond(origin, ring.radius) {
                    if !grid.is_inside(cell) {
                        continue;
                    }
                    let Some(index) = self.bounds.index(cell) else {
                        continue;
                    };
                    let counter = &mut self.counters[index][channel_slot(channel)][usize::from(level)];
                    match contribution {
                        Contribution::Add => *counter += 1,
                        Contribution::Remove => {
                            debug_assert!(*counter > 0, "ring counter underflow at {cell}");
                            *counter = counter.saturating_sub(1);
                        }
                    }
                }
            }
        }

        for cell in diamond(origin, config.max_ring_radius()) {
            self.write_back(grid, cell);
        }
    }

    /// Clears every counter and level, then replays each provided building.
    pub(crate) fn rebuild<'a>(
        &mut self,
        grid: &mut Grid,
        buildings: impl IntoIterator<Item = (&'a BuildingConfig, CellCoord)>,
    ) {
        for counters in &mut self.counters {
            *counters = [[0; LEVEL_SLOTS]; CHANNELS];
        }
        grid.clear_levels();
        for (config, origin) in buildings {
            self.apply(grid, config, origin, Contribution::Add);
        }
    }

    fn write_back(&self, grid: &mut Grid, cell: CellCoord) {
        if !grid.is_inside(cell) {
            return;
        }
        let Some(index) = self.bounds.index(cell) else {
            return;
        };
        for channel in EffectChannel::ALL {
            let counters = &self.counters[index][channel_slot(channel)];
            let highest = (1..LEVEL_SLOTS)
                .rev()
                .find(|level| counters[*level] > 0)
                .unwrap_or(0);
            grid.set_level(cell, channel, highest as i32);
        }
    }
}

/// Cells within the Manhattan radius of the centre.
fn diamond(center: CellCoord, radius: u32) -> impl Iterator<Item = CellCoord> {
    let radius = i32::try_from(radius).unwrap_or(i32::MAX);
    (-radius..=radius).flat_map(move |dx| {
        let span = radius - dx.abs();
        (-span..=span).map(move |dy| center.offset(dx, dy))
    })
}
