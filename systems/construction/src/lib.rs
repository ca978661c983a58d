#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Construction settlement: build progress and per-building maintenance.

use hamlet_core::{Command, SpendReason};
use hamlet_world::{query, World};
use tracing::debug;

/// Pure system that advances construction and charges upkeep at the end of a turn.
#[derive(Debug, Default)]
pub struct Construction;

impl Construction {
    /// Emits construction and maintenance commands for every building.
    ///
    /// Buildings that complete during this pass are charged maintenance in the
    /// same turn.
    pub fn handle(&mut self, world: &World, out: &mut Vec<Command>) {
        for building in query::buildings(world) {
            let completes = if building.constructed {
                true
            } else {
                out.push(Command::AdvanceConstruction {
                    building: building.id,
                });
                building.progress.saturating_add(1) >= building.config.build_turns
            };

            if !completes {
                continue;
            }

            let upkeep = maintenance_charge(building.config.maintenance_gold);
            if upkeep > 0 {
                debug!(building = %building.id, upkeep, "charging maintenance");
                out.push(Command::SpendGold {
                    amount: upkeep,
                    reason: SpendReason::Maintenance {
                        building: building.id,
                    },
                });
            }
        }
    }
}

/// Gold charged per turn for the configured maintenance, rounded to the nearest coin.
#[must_use]
pub fn maintenance_charge(maintenance_gold: f32) -> u32 {
    if maintenance_gold.is_finite() && maintenance_gold > 0.0 {
        maintenance_gold.round() as u32
    } else {
        0
    }
}
