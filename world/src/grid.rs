//! Authoritative per-cell terrain and service state.

use std::collections::BTreeSet;

use hamlet_core::{CellCoord, EffectChannel, ServiceLevels};

/// Step cost of a cell carrying a road.
pub const ROAD_STEP_COST: f32 = 0.5;
/// Step cost of a plain ground cell.
pub const GROUND_STEP_COST: f32 = 1.0;

/// Static layer data a grid is baked from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GridLayers {
    /// Cells that exist.
    pub ground: BTreeSet<CellCoord>,
    /// Cells carrying a road.
    pub roads: BTreeSet<CellCoord>,
    /// Cells blocked by static scenery.
    pub blocks: BTreeSet<CellCoord>,
}

impl GridLayers {
    /// Parses an ASCII map where each line is a row and each character a column.
    ///
    /// `.` is ground, `=` is a road and `#` is a blocked cell; any other
    /// character leaves the cell void. Line `n` maps to `y = n`.
    #[must_use]
    pub fn from_ascii(map: &str) -> Self {
        let mut layers = Self::default();
        for (y, line) in map.lines().enumerate() {
            for (x, glyph) in line.chars().enumerate() {
                let cell = CellCoord::new(x as i32, y as i32);
                match glyph {
                    '.' => {
                        let _ = layers.ground.insert(cell);
                    }
                    '=' => {
                        let _ = layers.ground.insert(cell);
                        let _ = layers.roads.insert(cell);
                    }
                    '#' => {
                        let _ = layers.ground.insert(cell);
                        let _ = layers.blocks.insert(cell);
                    }
                    _ => {}
                }
            }
        }
        layers
    }
}

/// Rectangular index space covering every baked cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct GridBounds {
    min: CellCoord,
    width: u32,
    height: u32,
}

impl GridBounds {
    fn enclosing(cells: &BTreeSet<CellCoord>) -> Self {
        let mut iter = cells.iter();
        let Some(first) = iter.next() else {
            return Self::default();
        };
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x(), first.y(), first.x(), first.y());
        for cell in iter {
            min_x = min_x.min(cell.x());
            min_y = min_y.min(cell.y());
            max_x = max_x.max(cell.x());
            max_y = max_y.max(cell.y());
        }
        Self {
            min: CellCoord::new(min_x, min_y),
            width: min_x.abs_diff(max_x) + 1,
            height: min_y.abs_diff(max_y) + 1,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub(crate) fn index(&self, cell: CellCoord) -> Option<usize> {
        let dx = i64::from(cell.x()) - i64::from(self.min.x());
        let dy = i64::from(cell.y()) - i64::from(self.min.y());
        if dx < 0 || dy < 0 || dx >= i64::from(self.width) || dy >= i64::from(self.height) {
            return None;
        }
        Some(dy as usize * self.width as usize + dx as usize)
    }

    fn coord(&self, index: usize) -> CellCoord {
        let width = self.width as usize;
        self.min
            .offset((index % width) as i32, (index / width) as i32)
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct CellData {
    road: bool,
    blocked: bool,
    levels: ServiceLevels,
}

/// Dense grid of existing cells with road, blocking and service state.
#[derive(Clone, Debug, Default)]
pub struct Grid {
    bounds: GridBounds,
    cells: Vec<Option<CellData>>,
}

impl Grid {
    /// Bakes a grid from static layers; cells without ground do not exist.
    #[must_use]
    pub fn bake(layers: &GridLayers) -> Self {
        let bounds = GridBounds::enclosing(&layers.ground);
        let mut cells = vec![None; bounds.len()];
        for cell in &layers.ground {
            if let Some(index) = bounds.index(*cell) {
                cells[index] = Some(CellData {
                    road: layers.roads.contains(cell),
                    blocked: layers.blocks.contains(cell),
                    levels: ServiceLevels::default(),
                });
            }
        }
        Self { bounds, cells }
    }

    pub(crate) fn bounds(&self) -> GridBounds {
        self.bounds
    }

    fn cell(&self, cell: CellCoord) -> Option<&CellData> {
        self.bounds
            .index(cell)
            .and_then(|index| self.cells.get(index))
            .and_then(Option::as_ref)
    }

    fn cell_mut(&mut self, cell: CellCoord) -> Option<&mut CellData> {
        self.bounds
            .index(cell)
            .and_then(|index| self.cells.get_mut(index))
            .and_then(Option::as_mut)
    }

    /// Reports whether the cell exists.
    #[must_use]
    pub fn is_inside(&self, cell: CellCoord) -> bool {
        self.cell(cell).is_some()
    }

    /// Reports whether the cell is blocked; missing cells count as blocked.
    #[must_use]
    pub fn is_blocked(&self, cell: CellCoord) -> bool {
        self.cell(cell).map_or(true, |data| data.blocked)
    }

    /// Reports whether the cell carries a road.
    #[must_use]
    pub fn has_road(&self, cell: CellCoord) -> bool {
        self.cell(cell).is_some_and(|data| data.road)
    }

    /// Sets the blocked flag, returning `false` when the cell does not exist.
    pub fn set_blocked(&mut self, cell: CellCoord, blocked: bool) -> bool {
        match self.cell_mut(cell) {
            Some(data) => {
                data.blocked = blocked;
                true
            }
            None => false,
        }
    }

    /// Cost of stepping onto the cell.
    #[must_use]
    pub fn step_cost(&self, cell: CellCoord) -> f32 {
        if self.has_road(cell) {
            ROAD_STEP_COST
        } else {
            GROUND_STEP_COST
        }
    }

    /// Walkable 8-neighbours of the cell.
    pub fn neighbors8(&self, cell: CellCoord) -> impl Iterator<Item = CellCoord> + '_ {
        cell.neighbors8()
            .filter(move |neighbor| !self.is_blocked(*neighbor))
    }

    /// Service levels of the cell, `None` when it does not exist.
    #[must_use]
    pub fn service_levels(&self, cell: CellCoord) -> Option<ServiceLevels> {
        self.cell(cell).map(|data| data.levels)
    }

    /// Level of a single channel, zero for missing cells.
    #[must_use]
    pub fn level(&self, cell: CellCoord, channel: EffectChannel) -> i16 {
        self.service_levels(cell)
            .map_or(0, |levels| levels.get(channel))
    }

    /// Writes a channel level, clamped into the signed 16-bit range.
    pub fn set_level(&mut self, cell: CellCoord, channel: EffectChannel, value: i32) {
        let clamped = value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
        if let Some(data) = self.cell_mut(cell) {
            match channel {
                EffectChannel::Medical => data.levels.medical = clamped,
                EffectChannel::Security => data.levels.security = clamped,
                EffectChannel::Beauty => data.levels.beauty = clamped,
            }
        }
    }

    /// Resets every service level to zero.
    pub fn clear_levels(&mut self) {
        for data in self.cells.iter_mut().flatten() {
            data.levels = ServiceLevels::default();
        }
    }

    /// Every existing cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, data)| data.is_some())
            .map(|(index, _)| self.bounds.coord(index))
    }
}
