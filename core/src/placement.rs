//! Placement legality flags reported for individual footprint cells.

use std::{fmt, ops::BitOr};

use serde::{Deserialize, Serialize};

use crate::CellCoord;

/// Set of reasons a single cell cannot host a building footprint.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlacementFlags(u8);

impl PlacementFlags {
    /// No failure recorded.
    pub const NONE: Self = Self(0);
    /// The cell lies outside the baked grid.
    pub const OUT_OF_BOUNDS: Self = Self(1);
    /// The cell is blocked by static terrain or another footprint.
    pub const BLOCKED: Self = Self(1 << 1);
    /// The cell carries a road.
    pub const ROAD: Self = Self(1 << 2);
    /// The cell is registered to another building.
    pub const OCCUPIED: Self = Self(1 << 3);

    const NAMED: [(Self, &'static str); 4] = [
        (Self::OUT_OF_BOUNDS, "OUT_OF_BOUNDS"),
        (Self::BLOCKED, "BLOCKED"),
        (Self::ROAD, "ROAD"),
        (Self::OCCUPIED, "OCCUPIED"),
    ];

    /// Raw bit representation.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Reports whether no reason is recorded.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Reports whether every reason in `other` is recorded.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Records the reasons in `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl BitOr for PlacementFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for PlacementFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        let mut first = true;
        for (flag, name) in Self::NAMED {
            if self.contains(flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Single footprint cell that failed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlacementIssue {
    /// Cell that failed.
    pub cell: CellCoord,
    /// Every reason the cell failed.
    pub reasons: PlacementFlags,
}

#[cfg(test)]
mod tests {
    use super::PlacementFlags;

    #[test]
    fn flags_combine_and_report_membership() {
        let mut flags = PlacementFlags::NONE;
        assert!(flags.is_empty());
        flags.insert(PlacementFlags::BLOCKED);
        flags.insert(PlacementFlags::OCCUPIED);
        assert!(flags.contains(PlacementFlags::BLOCKED));
        assert!(flags.contains(PlacementFlags::OCCUPIED));
        assert!(!flags.contains(PlacementFlags::ROAD));
        assert_eq!(
            flags,
            PlacementFlags::BLOCKED | PlacementFlags::OCCUPIED,
            "insert and bitor must agree"
        );
    }

    #[test]
    fn debug_lists_flag_names() {
        let flags = PlacementFlags::OUT_OF_BOUNDS | PlacementFlags::ROAD;
        assert_eq!(format!("{flags:?}"), "OUT_OF_BOUNDS | ROAD");
        assert_eq!(format!("{:?}", PlacementFlags::NONE), "NONE");
    }
}
