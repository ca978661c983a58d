//! Level rules that decide how many residents a house can hold.

use std::collections::BTreeSet;

use hamlet_core::{EffectChannel, FoodTier, ResourceType, ServiceLevels};
use serde::{Deserialize, Serialize};

/// Capacity and promotion parameters of a single house level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HousingLevelRule {
    /// Population ceiling at this level.
    pub max_population: u32,
    /// Food tiers residents accept.
    pub food_tiers: Vec<FoodTier>,
    /// Capacity granted when at least one accepted food is reachable.
    pub food_capacity: u32,
    /// Capacity granted for each further distinct food kind.
    pub capacity_per_extra_food_kind: u32,
    /// Minimum medical level at the house, zero when not required.
    pub medical_requirement: i16,
    /// Minimum security level at the house, zero when not required.
    pub security_requirement: i16,
    /// Minimum beautification level at the house, zero when not required.
    pub beauty_requirement: i16,
    /// Capacity granted for each satisfied service requirement.
    pub service_capacity: u32,
    /// Global happiness that must be exceeded.
    pub happiness_threshold: i32,
    /// Capacity granted while happiness exceeds the threshold.
    pub happiness_capacity: u32,
    /// Capacity granted for each distinct reachable luxury good.
    pub capacity_per_luxury_kind: u32,
}

impl Default for HousingLevelRule {
    fn default() -> Self {
        Self {
            max_population: 8,
            food_tiers: vec![FoodTier::One],
            food_capacity: 6,
            capacity_per_extra_food_kind: 0,
            medical_requirement: 0,
            security_requirement: 0,
            beauty_requirement: 0,
            service_capacity: 0,
            happiness_threshold: 20,
            happiness_capacity: 2,
            capacity_per_luxury_kind: 0,
        }
    }
}

impl HousingLevelRule {
    /// Reports whether residents at this level eat the resource.
    #[must_use]
    pub fn accepts(&self, resource: ResourceType) -> bool {
        resource
            .food_tier()
            .is_some_and(|tier| self.food_tiers.contains(&tier))
    }

    /// Accepted foods in catalogue order.
    #[must_use]
    pub fn accepted_foods(&self) -> Vec<ResourceType> {
        ResourceType::ALL
            .into_iter()
            .filter(|resource| self.accepts(*resource))
            .collect()
    }

    fn requirement(&self, channel: EffectChannel) -> i16 {
        match channel {
            EffectChannel::Medical => self.medical_requirement,
            EffectChannel::Security => self.security_requirement,
            EffectChannel::Beauty => self.beauty_requirement,
        }
    }

    /// Residents the house can support under the observed conditions.
    #[must_use]
    pub fn capacity(&self, conditions: &Conditions) -> u32 {
        let food_kinds = conditions
            .available_goods
            .iter()
            .filter(|resource| self.accepts(**resource))
            .count() as u32;
        let mut capacity = 0_u32;
        if food_kinds > 0 {
            capacity += self.food_capacity;
            capacity += self.capacity_per_extra_food_kind * (food_kinds - 1);
        }

        for channel in EffectChannel::ALL {
            let required = self.requirement(channel);
            if required > 0 && conditions.service_levels.get(channel) >= required {
                capacity += self.service_capacity;
            }
        }

        if conditions.happiness > self.happiness_threshold {
            capacity += self.happiness_capacity;
        }

        let luxury_kinds = conditions
            .available_goods
            .iter()
            .filter(|resource| resource.is_luxury())
            .count() as u32;
        capacity + self.capacity_per_luxury_kind * luxury_kinds
    }
}

/// What a house can observe about its surroundings during settlement.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Conditions {
    /// Distinct goods with stock at reachable providers.
    pub available_goods: BTreeSet<ResourceType>,
    /// Service levels at the house origin.
    pub service_levels: ServiceLevels,
    /// Global happiness.
    pub happiness: i32,
}

/// Tunable parameters of the housing system.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HousingTuning {
    /// Rules for levels one and up; the length sets the highest level.
    pub levels: Vec<HousingLevelRule>,
    /// Smallest experience gained per full turn.
    pub experience_min: u32,
    /// Largest experience gained per full turn.
    pub experience_max: u32,
    /// Multiplier applied to the experience requirement after each promotion.
    pub experience_growth: f32,
}

impl Default for HousingTuning {
    fn default() -> Self {
        Self {
            levels: vec![
                HousingLevelRule::default(),
                HousingLevelRule {
                    max_population: 17,
                    food_tiers: vec![FoodTier::One, FoodTier::Two],
                    food_capacity: 10,
                    capacity_per_extra_food_kind: 2,
                    medical_requirement: 1,
                    service_capacity: 2,
                    happiness_threshold: 30,
                    happiness_capacity: 3,
                    ..HousingLevelRule::default()
                },
                HousingLevelRule {
                    max_population: 32,
                    food_tiers: vec![FoodTier::One, FoodTier::Two, FoodTier::Three],
                    food_capacity: 16,
                    capacity_per_extra_food_kind: 3,
                    medical_requirement: 2,
                    security_requirement: 1,
                    service_capacity: 3,
                    happiness_threshold: 40,
                    happiness_capacity: 4,
                    capacity_per_luxury_kind: 2,
                    ..HousingLevelRule::default()
                },
                HousingLevelRule {
                    max_population: 50,
                    food_tiers: vec![FoodTier::One, FoodTier::Two, FoodTier::Three],
                    food_capacity: 24,
                    capacity_per_extra_food_kind: 4,
                    medical_requirement: 3,
                    security_requirement: 2,
                    beauty_requirement: 2,
                    service_capacity: 4,
                    happiness_threshold: 50,
                    happiness_capacity: 6,
                    capacity_per_luxury_kind: 3,
                    ..HousingLevelRule::default()
                },
            ],
            experience_min: 3,
            experience_max: 6,
            experience_growth: 1.8,
        }
    }
}

impl HousingTuning {
    /// Rule for the provided level, falling back to the nearest defined one.
    #[must_use]
    pub fn rule(&self, level: u8) -> Option<&HousingLevelRule> {
        let index = usize::from(level.max(1)) - 1;
        self.levels.get(index).or_else(|| self.levels.last())
    }

    /// Highest reachable level.
    #[must_use]
    pub fn max_level(&self) -> u8 {
        u8::try_from(self.levels.len()).unwrap_or(u8::MAX).max(1)
    }

    /// Experience requirement that follows `current` after a promotion.
    #[must_use]
    pub fn next_requirement(&self, current: u32) -> u32 {
        (current as f32 * self.experience_growth).round() as u32
    }
}
