#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Experience and level ladders of upgradable buildings.
//!
//! Buildings whose definition carries an [`UpgradeProfile`] gain experience at
//! the end of every turn their [`XpMode`] allows. Crossing a rung promotes the
//! building and emits the rung's overrides: a definition swap first, then the
//! job slot and population ceilings, so the overrides outlive the swap.

use hamlet_core::{BuildingId, Command, LevelStep, UpgradeProfile, XpMode};
use hamlet_world::{
    query::{self, BuildingSnapshot},
    World,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Level and experience after experience was added.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Promotion<'a> {
    /// Level reached.
    pub level: u32,
    /// Experience left over toward the next level.
    pub experience: u32,
    /// Rungs arrived at, in ascending order.
    pub reached: Vec<&'a LevelStep>,
}

/// Adds experience and climbs every rung it pays for.
///
/// A level without a rung, or a rung with `experience_to_next == 0`, is the top
/// of the ladder; experience keeps accumulating there.
#[must_use]
pub fn promote(profile: &UpgradeProfile, level: u32, experience: u32) -> Promotion<'_> {
    let mut promotion = Promotion {
        level,
        experience,
        reached: Vec::new(),
    };
    while let Some(step) = profile.step(promotion.level) {
        if step.experience_to_next == 0 || promotion.experience < step.experience_to_next {
            break;
        }
        promotion.experience -= step.experience_to_next;
        promotion.level = promotion.level.saturating_add(1);
        if let Some(next) = profile.step(promotion.level) {
            promotion.reached.push(next);
        }
    }
    promotion
}

/// Pure system that grows experience and promotes upgradable buildings.
#[derive(Debug)]
pub struct Leveling<R = ChaCha8Rng> {
    rng: R,
}

impl Leveling<ChaCha8Rng> {
    /// Creates the system with a ChaCha generator seeded from `seed`.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(ChaCha8Rng::seed_from_u64(seed))
    }

    /// Position of the random stream, in 32-bit words.
    #[must_use]
    pub fn stream_position(&self) -> u128 {
        self.rng.get_word_pos()
    }

    /// Moves the random stream to a position reported by [`Self::stream_position`].
    pub fn seek(&mut self, position: u128) {
        self.rng.set_word_pos(position);
    }
}

impl<R: Rng> Leveling<R> {
    /// Creates the system with an explicit random source.
    #[must_use]
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Grants per-turn experience to every eligible constructed building.
    pub fn handle(&mut self, world: &World, out: &mut Vec<Command>) {
        for building in query::buildings(world) {
            if !building.constructed {
                continue;
            }
            let Some(profile) = building.config.upgrade.as_ref() else {
                continue;
            };
            if !gains_experience(world, &building, profile.xp_mode) {
                continue;
            }
            let (low, high) = profile.gain_range();
            let gained = self.rng.gen_range(low..=high);
            settle(&building, profile, gained, out);
        }
    }

    /// Grants experience outside the per-turn rules, whatever the mode.
    ///
    /// Returns `false` when the building is missing or has no upgrade profile.
    pub fn grant(
        &mut self,
        world: &World,
        building: BuildingId,
        experience: u32,
        out: &mut Vec<Command>,
    ) -> bool {
        let Some(snapshot) = query::building(world, building) else {
            return false;
        };
        let Some(profile) = snapshot.config.upgrade.as_ref() else {
            return false;
        };
        settle(&snapshot, profile, experience, out);
        true
    }
}

fn gains_experience(world: &World, building: &BuildingSnapshot, mode: XpMode) -> bool {
    match mode {
        XpMode::AlwaysPerTurn => true,
        XpMode::PerTurnWhenEmployees => {
            query::job_provider(world, building.id).is_some_and(|jobs| jobs.occupied > 0)
        }
        XpMode::PerTurnWhenHouseFull => query::housing(world, building.id)
            .is_some_and(|house| house.population >= house.max_population),
        XpMode::ManualOnly => false,
    }
}

fn settle(
    building: &BuildingSnapshot,
    profile: &UpgradeProfile,
    gained: u32,
    out: &mut Vec<Command>,
) {
    let promotion = promote(
        profile,
        building.level,
        building.experience.saturating_add(gained),
    );
    debug!(
        building = %building.id,
        gained,
        level = promotion.level,
        experience = promotion.experience,
        "experience settled"
    );
    out.push(Command::SettleLeveling {
        building: building.id,
        level: promotion.level,
        experience: promotion.experience,
    });

    let mut config = building.config.id.clone();
    for step in promotion.reached {
        if let Some(replacement) = step.replace_config.as_ref().filter(|id| **id != config) {
            out.push(Command::ReplaceConfig {
                building: building.id,
                config: replacement.clone(),
            });
            config = replacement.clone();
        }
        if step.job_slots.is_some() || step.max_population.is_some() {
            out.push(Command::OverrideCapacity {
                building: building.id,
                job_slots: step.job_slots,
                max_population: step.max_population,
            });
        }
    }
}
