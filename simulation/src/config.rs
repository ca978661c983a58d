//! Scenario configuration loaded from TOML.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use hamlet_core::{
    BuildingCatalog, BuildingConfig, BuildingKind, CatalogError, CellCoord, ConfigId, Faction,
    HousingParams, JobSlots, LevelStep, ResourceType, Ring, UpgradeProfile, XpMode,
};
use hamlet_system_employment::EmploymentTuning;
use hamlet_system_housing::HousingTuning;
use hamlet_system_progression::ProgressionTuning;
use hamlet_system_transport::TransportTuning;
use hamlet_world::{snapshot::StockRecord, Treasury};
use serde::{Deserialize, Serialize};

use crate::pipeline::TurnPipeline;

/// Everything needed to start a settlement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed of every random source.
    pub seed: u64,
    /// Starting kingdom statistics.
    pub treasury: Treasury,
    /// ASCII map: `.` ground, `=` road, `#` block, anything else is void.
    pub map: String,
    /// Building definitions.
    pub buildings: Vec<BuildingConfig>,
    /// Handler order of each turn phase.
    pub pipeline: TurnPipeline,
    /// Employment tuning.
    pub employment: EmploymentTuning,
    /// Housing level rules.
    pub housing: HousingTuning,
    /// Transport formulas.
    pub transport: TransportTuning,
    /// Key buildings of stage progression.
    pub progression: ProgressionTuning,
    /// Buildings placed before the first turn.
    pub placements: Vec<PlacementSpec>,
    /// Routes declared before the first turn.
    pub routes: Vec<RouteSpec>,
}

/// Building placed when the scenario starts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacementSpec {
    /// Definition to place.
    pub config: ConfigId,
    /// Anchor cell.
    pub origin: CellCoord,
    /// Owning faction.
    #[serde(default)]
    pub faction: Faction,
    /// Completes construction immediately.
    #[serde(default)]
    pub constructed: bool,
    /// Goods stocked in storage buildings.
    #[serde(default)]
    pub inventory: Vec<StockRecord>,
    /// Initial residents of houses.
    #[serde(default)]
    pub population: Option<u32>,
}

/// Route declared when the scenario starts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    /// Index of the source storage in `placements`.
    pub source: usize,
    /// Index of the target storage in `placements`.
    pub target: usize,
    /// Allowed resources; empty allows every resource.
    #[serde(default)]
    pub whitelist: Vec<ResourceType>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            treasury: Treasury {
                gold: 200,
                ..Treasury::default()
            },
            map: default_map(),
            buildings: default_buildings(),
            pipeline: TurnPipeline::default(),
            employment: EmploymentTuning::default(),
            housing: HousingTuning::default(),
            transport: TransportTuning::default(),
            progression: ProgressionTuning::default(),
            placements: Vec::new(),
            routes: Vec::new(),
        }
    }
}

impl SimulationConfig {
    /// Parses a scenario from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("scenario is not valid TOML")
    }

    /// Reads and parses a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("failed to parse scenario {}", path.display()))
    }

    /// Builds the catalogue of the declared definitions.
    pub fn catalog(&self) -> Result<BuildingCatalog, CatalogError> {
        BuildingCatalog::from_configs(self.buildings.iter().cloned())
    }
}

fn default_map() -> String {
    let ground = ".".repeat(24);
    let road = "=".repeat(24);
    let mut rows = vec![ground.clone(); 16];
    rows[8] = road;
    rows.join("\n")
}

fn named(id: &str, display_name: &str, kind: BuildingKind) -> BuildingConfig {
    let mut config = BuildingConfig::new(id, kind);
    config.display_name = display_name.to_owned();
    config
}

/// Definitions available when a scenario declares none.
#[must_use]
pub fn default_buildings() -> Vec<BuildingConfig> {
    let hut = named("hut", "Hut", BuildingKind::House);

    let mut granary = named("granary", "Granary", BuildingKind::Granary);
    granary.build_turns = 2;
    granary.maintenance_gold = 1.0;

    let mut warehouse = named("warehouse", "Warehouse", BuildingKind::Warehouse);
    warehouse.size = 2;
    warehouse.build_turns = 3;
    warehouse.maintenance_gold = 1.5;
    warehouse.upgrade = Some(UpgradeProfile::default());

    let mut clinic = named("clinic", "Clinic", BuildingKind::Service);
    clinic.build_turns = 2;
    clinic.maintenance_gold = 2.0;
    clinic.medical_rings = vec![Ring { radius: 3, level: 2 }, Ring { radius: 6, level: 1 }];
    clinic.jobs = Some(JobSlots {
        slots: 3,
        priority: 2,
        commute_max_cost: 8.0,
    });
    clinic.upgrade = Some(medical_ladder());

    let mut infirmary = clinic.clone();
    infirmary.id = ConfigId::new("infirmary");
    infirmary.display_name = "Infirmary".to_owned();
    infirmary.maintenance_gold = 3.0;
    infirmary.medical_rings = vec![Ring { radius: 4, level: 3 }, Ring { radius: 8, level: 1 }];

    let mut watchtower = named("watchtower", "Watchtower", BuildingKind::Service);
    watchtower.build_turns = 2;
    watchtower.maintenance_gold = 1.0;
    watchtower.security_rings = vec![Ring { radius: 5, level: 1 }];
    watchtower.jobs = Some(JobSlots {
        slots: 2,
        ..JobSlots::default()
    });

    let mut garden = named("garden", "Garden", BuildingKind::Service);
    garden.beauty_rings = vec![Ring { radius: 2, level: 2 }];

    let mut farm = named("farm", "Farm", BuildingKind::Service);
    farm.size = 2;
    farm.build_turns = 2;
    farm.jobs = Some(JobSlots::default());

    let mut plaza = named("plaza", "Plaza", BuildingKind::Civic);
    plaza.size = 2;
    plaza.build_turns = 3;
    plaza.beauty_rings = vec![Ring { radius: 4, level: 1 }];

    let mut palace = named("palace", "Palace", BuildingKind::Civic);
    palace.size = 3;
    palace.build_turns = 6;
    palace.maintenance_gold = 5.0;

    let mut mausoleum = named("mausoleum", "Mausoleum", BuildingKind::Civic);
    mausoleum.size = 3;
    mausoleum.build_turns = 8;

    let mut camp = named("camp", "Raider camp", BuildingKind::Civic);
    camp.build_turns = 0;

    let mut manor = named("manor", "Manor", BuildingKind::House);
    manor.size = 2;
    manor.build_turns = 3;
    manor.housing = Some(HousingParams {
        max_population: 12,
        ..HousingParams::default()
    });

    vec![
        hut, manor, granary, warehouse, clinic, infirmary, watchtower, garden, farm, plaza,
        palace, mausoleum, camp,
    ]
}

/// Staffed clinics grow into infirmaries and then hire more staff.
fn medical_ladder() -> UpgradeProfile {
    UpgradeProfile {
        xp_mode: XpMode::PerTurnWhenEmployees,
        levels: vec![
            LevelStep::new(1, 40),
            LevelStep {
                job_slots: Some(4),
                replace_config: Some(ConfigId::new("infirmary")),
                ..LevelStep::new(2, 90)
            },
            LevelStep {
                job_slots: Some(5),
                ..LevelStep::new(3, 0)
            },
        ],
        ..UpgradeProfile::default()
    }
}
