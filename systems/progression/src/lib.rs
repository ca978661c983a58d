#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Civic stage progression driven by construction and demolition notifications.

use hamlet_core::{ConfigId, Event, Faction, Stage};
use hamlet_world::{query, World};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Identifiers of the buildings that unlock each stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionTuning {
    /// Unlocks the chiefdom once no enemy building remains.
    pub plaza: ConfigId,
    /// Unlocks the proto-state.
    pub palace: ConfigId,
    /// Unlocks the dynasty.
    pub mausoleum: ConfigId,
}

impl Default for ProgressionTuning {
    fn default() -> Self {
        Self {
            plaza: ConfigId::new("plaza"),
            palace: ConfigId::new("palace"),
            mausoleum: ConfigId::new("mausoleum"),
        }
    }
}

/// Pure system that tracks the civic stage of the player settlement.
#[derive(Debug, Default)]
pub struct Progression {
    tuning: ProgressionTuning,
    stage: Stage,
    plaza_built: bool,
    palace_built: bool,
    mausoleum_built: bool,
    enemy_buildings: u32,
}

impl Progression {
    /// Creates the system at the first stage.
    #[must_use]
    pub fn new(tuning: ProgressionTuning) -> Self {
        Self {
            tuning,
            ..Self::default()
        }
    }

    /// Stage currently reached.
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Enemy buildings believed to be standing.
    #[must_use]
    pub fn enemy_buildings(&self) -> u32 {
        self.enemy_buildings
    }

    /// Consumes world events and emits a `StageAdvanced` for every stage reached.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Event>) {
        for event in events {
            match event {
                Event::BuildingConstructed {
                    config, faction, ..
                } => {
                    if *faction == Faction::Enemy {
                        self.enemy_buildings += 1;
                        continue;
                    }
                    self.mark_key_building(config);
                    self.try_advance(out);
                }
                Event::BuildingDemolished {
                    faction: Faction::Enemy,
                    was_constructed: true,
                    ..
                } => {
                    self.enemy_buildings = self.enemy_buildings.saturating_sub(1);
                    self.try_advance(out);
                }
                _ => {}
            }
        }
    }

    /// Restores the stage of a loaded settlement and recounts its buildings.
    ///
    /// No `StageAdvanced` events are emitted for the restored stage.
    pub fn restore(&mut self, stage: Stage, world: &World) {
        self.stage = stage;
        self.plaza_built = false;
        self.palace_built = false;
        self.mausoleum_built = false;
        self.enemy_buildings = 0;
        for building in query::buildings(world)
            .into_iter()
            .filter(|building| building.constructed)
        {
            if building.faction == Faction::Enemy {
                self.enemy_buildings += 1;
            } else {
                self.mark_key_building(&building.config.id);
            }
        }
    }

    fn mark_key_building(&mut self, config: &ConfigId) {
        if *config == self.tuning.plaza {
            self.plaza_built = true;
        }
        if *config == self.tuning.palace {
            self.palace_built = true;
        }
        if *config == self.tuning.mausoleum {
            self.mausoleum_built = true;
        }
    }

    fn try_advance(&mut self, out: &mut Vec<Event>) {
        while let Some(next) = self.next_stage() {
            self.stage = next;
            info!(stage = ?next, "settlement advanced");
            out.push(Event::StageAdvanced { stage: next });
        }
    }

    fn next_stage(&self) -> Option<Stage> {
        match self.stage {
            Stage::Tribe if self.plaza_built && self.enemy_buildings == 0 => Some(Stage::Chiefdom),
            Stage::Chiefdom if self.palace_built => Some(Stage::ProtoState),
            Stage::ProtoState if self.mausoleum_built => Some(Stage::Dynasty),
            _ => None,
        }
    }
}
