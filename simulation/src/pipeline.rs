//! Ordered phase handlers run by the turn orchestrator.

use serde::{Deserialize, Serialize};

/// Per-turn system invoked by the orchestrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhaseHandler {
    /// Advances construction and charges building maintenance.
    Construction,
    /// Matches working residents with job slots.
    EmploymentAssignment,
    /// Feeds the employment rate into global happiness.
    EmploymentHappiness,
    /// Settles population, food and experience of houses.
    Housing,
    /// Grows experience of upgradable buildings and applies their rungs.
    Leveling,
    /// Moves goods along declared routes.
    Transport,
}

/// Handler order for both phases of a turn.
///
/// Each handler sees the commands of the handlers before it already applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnPipeline {
    /// Handlers run right after `TurnBegan`.
    pub turn_began: Vec<TurnPhaseHandler>,
    /// Handlers run right after `BeforeTurnEnd`.
    pub before_turn_end: Vec<TurnPhaseHandler>,
}

impl Default for TurnPipeline {
    fn default() -> Self {
        Self {
            turn_began: vec![TurnPhaseHandler::EmploymentAssignment],
            before_turn_end: vec![
                TurnPhaseHandler::Construction,
                TurnPhaseHandler::EmploymentHappiness,
                TurnPhaseHandler::Housing,
                TurnPhaseHandler::Leveling,
                TurnPhaseHandler::Transport,
            ],
        }
    }
}
