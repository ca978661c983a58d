//! Immutable building definitions and the catalogue that owns them.

use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CellCoord, CellRect, ConfigId, EffectChannel, MAX_SERVICE_LEVEL};

/// Broad category of a building definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    /// Residential building with a population.
    House,
    /// Food storage.
    Granary,
    /// General storage.
    Warehouse,
    /// Building providing jobs or area services.
    Service,
    /// Landmark used by stage progression.
    Civic,
}

impl BuildingKind {
    /// Reports whether buildings of this kind own an inventory.
    #[must_use]
    pub const fn is_storage(self) -> bool {
        matches!(self, Self::Granary | Self::Warehouse)
    }
}

/// Single area-effect ring of a building.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ring {
    /// Manhattan radius measured from the building origin.
    pub radius: u32,
    /// Service level granted inside the radius.
    pub level: u8,
}

impl Ring {
    /// Level clamped into the tracked range, `None` when the ring has no effect.
    #[must_use]
    pub fn effective_level(&self) -> Option<u8> {
        if self.radius == 0 || self.level == 0 {
            None
        } else {
            Some(self.level.min(MAX_SERVICE_LEVEL))
        }
    }
}

/// Job slots offered by a building.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSlots {
    /// Number of workers the building employs.
    pub slots: u32,
    /// Higher priorities are filled first among equally distant providers.
    pub priority: u32,
    /// Longest commute the provider accepts.
    pub commute_max_cost: f32,
}

impl Default for JobSlots {
    fn default() -> Self {
        Self {
            slots: 5,
            priority: 1,
            commute_max_cost: 10.0,
        }
    }
}

/// Which storage kinds a house may fetch food from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodSourceMode {
    /// Only granaries feed the house.
    #[default]
    GranaryOnly,
    /// Granaries and warehouses feed the house.
    GranaryOrWarehouse,
}

/// Residential parameters of a house definition.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HousingParams {
    /// Population ceiling at level one.
    pub max_population: u32,
    /// Share of residents able to work, in percent.
    pub employment_percent: u32,
    /// Residents gained per turn while below capacity.
    pub fill_per_turn: u32,
    /// Residents lost per turn while above capacity.
    pub drain_per_turn: u32,
    /// Food eaten per resident per turn.
    pub food_per_capita: f32,
    /// Movement budget for fetching food.
    pub fetch_move_points: f32,
    /// Movement budget for commuting to work.
    pub commute_move_points: f32,
    /// Storage kinds the house may fetch food from.
    pub food_source: FoodSourceMode,
}

impl Default for HousingParams {
    fn default() -> Self {
        Self {
            max_population: 8,
            employment_percent: 50,
            fill_per_turn: 2,
            drain_per_turn: 1,
            food_per_capita: 0.5,
            fetch_move_points: 3.0,
            commute_move_points: 10.0,
            food_source: FoodSourceMode::GranaryOnly,
        }
    }
}

/// Condition under which a building gains experience at the end of a turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XpMode {
    /// Every constructed building gains experience.
    #[default]
    AlwaysPerTurn,
    /// Only buildings with at least one filled job slot gain experience.
    PerTurnWhenEmployees,
    /// Only houses at their population ceiling gain experience.
    PerTurnWhenHouseFull,
    /// Experience is granted explicitly, never per turn.
    ManualOnly,
}

/// One rung of an upgrade ladder.
///
/// The overrides apply when a building arrives at `level`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelStep {
    /// Level this rung describes.
    pub level: u32,
    /// Experience needed to leave this level; zero marks the top of the ladder.
    #[serde(default)]
    pub experience_to_next: u32,
    /// Population ceiling of houses reaching this level.
    #[serde(default)]
    pub max_population: Option<u32>,
    /// Job slots of providers reaching this level.
    #[serde(default)]
    pub job_slots: Option<u32>,
    /// Definition swapped in when reaching this level.
    #[serde(default)]
    pub replace_config: Option<ConfigId>,
}

impl LevelStep {
    /// Plain rung without overrides.
    #[must_use]
    pub fn new(level: u32, experience_to_next: u32) -> Self {
        Self {
            level,
            experience_to_next,
            max_population: None,
            job_slots: None,
            replace_config: None,
        }
    }
}

/// Experience rules and level ladder of an upgradable building.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeProfile {
    /// When experience accrues.
    pub xp_mode: XpMode,
    /// Smallest experience gain per turn.
    pub xp_gain_min: u32,
    /// Largest experience gain per turn, inclusive.
    pub xp_gain_max: u32,
    /// Rungs of the ladder.
    pub levels: Vec<LevelStep>,
}

impl Default for UpgradeProfile {
    fn default() -> Self {
        Self {
            xp_mode: XpMode::AlwaysPerTurn,
            xp_gain_min: 3,
            xp_gain_max: 6,
            levels: vec![
                LevelStep::new(1, 60),
                LevelStep::new(2, 120),
                LevelStep::new(3, 200),
                LevelStep::new(4, 0),
            ],
        }
    }
}

impl UpgradeProfile {
    /// Rung describing the provided level.
    #[must_use]
    pub fn step(&self, level: u32) -> Option<&LevelStep> {
        self.levels.iter().find(|step| step.level == level)
    }

    /// Inclusive experience gain range with the bounds in order.
    #[must_use]
    pub fn gain_range(&self) -> (u32, u32) {
        (
            self.xp_gain_min.min(self.xp_gain_max),
            self.xp_gain_min.max(self.xp_gain_max),
        )
    }
}

/// Shared immutable definition of a building type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildingConfig {
    /// Unique identifier of the definition.
    pub id: ConfigId,
    /// Name shown to players.
    #[serde(default)]
    pub display_name: String,
    /// Broad category.
    pub kind: BuildingKind,
    /// Side length of the square footprint.
    #[serde(default = "default_size")]
    pub size: u32,
    /// Turns of construction required; zero completes on placement.
    #[serde(default = "default_build_turns")]
    pub build_turns: u32,
    /// Gold charged every turn once constructed.
    #[serde(default)]
    pub maintenance_gold: f32,
    /// Storage or service level of the definition.
    #[serde(default = "default_level")]
    pub level: u32,
    /// Medical coverage rings.
    #[serde(default)]
    pub medical_rings: Vec<Ring>,
    /// Security coverage rings.
    #[serde(default)]
    pub security_rings: Vec<Ring>,
    /// Beautification rings.
    #[serde(default)]
    pub beauty_rings: Vec<Ring>,
    /// Jobs offered once constructed.
    #[serde(default)]
    pub jobs: Option<JobSlots>,
    /// Residential parameters, required for houses.
    #[serde(default)]
    pub housing: Option<HousingParams>,
    /// Level ladder driven by the levelling system.
    #[serde(default)]
    pub upgrade: Option<UpgradeProfile>,
}

fn default_size() -> u32 {
    1
}

fn default_build_turns() -> u32 {
    1
}

fn default_level() -> u32 {
    1
}

impl BuildingConfig {
    /// Creates a minimal definition with defaults for every optional field.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: BuildingKind) -> Self {
        Self {
            id: ConfigId::new(id),
            display_name: String::new(),
            kind,
            size: default_size(),
            build_turns: default_build_turns(),
            maintenance_gold: 0.0,
            level: default_level(),
            medical_rings: Vec::new(),
            security_rings: Vec::new(),
            beauty_rings: Vec::new(),
            jobs: None,
            housing: (kind == BuildingKind::House).then(HousingParams::default),
            upgrade: None,
        }
    }

    /// Rings declared for the provided channel.
    #[must_use]
    pub fn rings(&self, channel: EffectChannel) -> &[Ring] {
        match channel {
            EffectChannel::Medical => &self.medical_rings,
            EffectChannel::Security => &self.security_rings,
            EffectChannel::Beauty => &self.beauty_rings,
        }
    }

    /// Largest effective radius across every channel, zero without rings.
    #[must_use]
    pub fn max_ring_radius(&self) -> u32 {
        EffectChannel::ALL
            .iter()
            .flat_map(|channel| self.rings(*channel))
            .filter(|ring| ring.effective_level().is_some())
            .map(|ring| ring.radius)
            .max()
            .unwrap_or(0)
    }

    /// Footprint covered when anchored at the provided origin.
    #[must_use]
    pub fn footprint(&self, origin: CellCoord) -> CellRect {
        CellRect::square(origin, self.size)
    }
}

/// Errors raised while assembling a [`BuildingCatalog`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// Two definitions share an identifier.
    #[error("duplicate building config id `{0}`")]
    DuplicateId(ConfigId),
    /// A definition declares a zero-sized footprint.
    #[error("building config `{0}` declares a zero-sized footprint")]
    ZeroSize(ConfigId),
    /// A house definition lacks residential parameters.
    #[error("house config `{0}` is missing housing parameters")]
    MissingHousing(ConfigId),
    /// An upgrade ladder swaps in a definition absent from the catalogue.
    #[error("building config `{config}` upgrades into unknown config `{target}`")]
    UnknownUpgradeTarget {
        /// Definition declaring the ladder.
        config: ConfigId,
        /// Missing replacement.
        target: ConfigId,
    },
}

/// Registry of every known building definition.
#[derive(Clone, Debug, Default)]
pub struct BuildingCatalog {
    entries: BTreeMap<ConfigId, Arc<BuildingConfig>>,
}

impl BuildingCatalog {
    /// Builds a catalogue from the provided definitions.
    pub fn from_configs(
        configs: impl IntoIterator<Item = BuildingConfig>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();
        for config in configs {
            catalog.insert(config)?;
        }
        catalog.validate_upgrades()?;
        Ok(catalog)
    }

    /// Adds a definition, rejecting duplicates and malformed entries.
    pub fn insert(&mut self, config: BuildingConfig) -> Result<(), CatalogError> {
        if config.size == 0 {
            return Err(CatalogError::ZeroSize(config.id));
        }
        if config.kind == BuildingKind::House && config.housing.is_none() {
            return Err(CatalogError::MissingHousing(config.id));
        }
        if self.entries.contains_key(&config.id) {
            return Err(CatalogError::DuplicateId(config.id));
        }
        let _ = self.entries.insert(config.id.clone(), Arc::new(config));
        Ok(())
    }

    fn validate_upgrades(&self) -> Result<(), CatalogError> {
        for config in self.entries.values() {
            let Some(profile) = &config.upgrade else {
                continue;
            };
            for target in profile.levels.iter().filter_map(|step| step.replace_config.as_ref()) {
                if !self.entries.contains_key(target) {
                    return Err(CatalogError::UnknownUpgradeTarget {
                        config: config.id.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Looks up a definition by identifier.
    #[must_use]
    pub fn get(&self, id: &ConfigId) -> Option<&Arc<BuildingConfig>> {
        self.entries.get(id)
    }

    /// Iterates the definitions in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<BuildingConfig>> {
        self.entries.values()
    }

    /// Number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the catalogue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
