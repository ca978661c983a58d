//! Turn counter and the blockers that gate ending a turn.

use std::collections::BTreeMap;

use hamlet_core::TurnBlocker;

/// First turn of every new world.
pub const FIRST_TURN: u32 = 1;

#[derive(Clone, Debug)]
pub(crate) struct TurnClock {
    turn: u32,
    blockers: BTreeMap<String, String>,
}

impl TurnClock {
    pub(crate) fn new() -> Self {
        Self {
            turn: FIRST_TURN,
            blockers: BTreeMap::new(),
        }
    }

    pub(crate) fn turn(&self) -> u32 {
        self.turn
    }

    pub(crate) fn restore(&mut self, turn: u32) {
        self.turn = turn.max(FIRST_TURN);
    }

    pub(crate) fn is_blocked(&self) -> bool {
        !self.blockers.is_empty()
    }

    /// Registers or replaces the blocker held by the owner.
    pub(crate) fn add_blocker(&mut self, owner: String, reason: String) {
        let _ = self.blockers.insert(owner, reason);
    }

    pub(crate) fn remove_blocker(&mut self, owner: &str) -> bool {
        self.blockers.remove(owner).is_some()
    }

    pub(crate) fn blockers(&self) -> Vec<TurnBlocker> {
        self.blockers
            .iter()
            .map(|(owner, reason)| TurnBlocker {
                owner: owner.clone(),
                reason: reason.clone(),
            })
            .collect()
    }

    /// Moves to the next turn, returning the turn that just finished.
    pub(crate) fn advance(&mut self) -> u32 {
        let finished = self.turn;
        self.turn = self.turn.saturating_add(1);
        finished
    }
}
