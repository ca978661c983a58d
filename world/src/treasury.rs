//! Kingdom-wide statistics.

use serde::{Deserialize, Serialize};

/// Lowest global happiness.
pub const MIN_HAPPINESS: i32 = 0;
/// Highest global happiness.
pub const MAX_HAPPINESS: i32 = 100;
/// Happiness of a new settlement.
pub const DEFAULT_HAPPINESS: i32 = 50;

/// Gold, research and mood of the settlement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Treasury {
    /// Spendable gold.
    pub gold: u32,
    /// Accumulated science.
    pub science: u32,
    /// Accumulated culture.
    pub culture: u32,
    /// Global happiness in `0..=100`.
    pub happiness: i32,
    /// Accumulated faith.
    pub faith: u32,
}

impl Default for Treasury {
    fn default() -> Self {
        Self {
            gold: 0,
            science: 0,
            culture: 0,
            happiness: DEFAULT_HAPPINESS,
            faith: 0,
        }
    }
}

impl Treasury {
    /// Debits up to `amount` gold and returns what was actually taken.
    pub(crate) fn spend(&mut self, amount: u32) -> u32 {
        let spent = amount.min(self.gold);
        self.gold -= spent;
        spent
    }

    /// Applies a happiness delta, clamped, and returns the previous value.
    pub(crate) fn adjust_happiness(&mut self, delta: i32) -> i32 {
        let previous = self.happiness;
        self.happiness = previous
            .saturating_add(delta)
            .clamp(MIN_HAPPINESS, MAX_HAPPINESS);
        previous
    }
}
