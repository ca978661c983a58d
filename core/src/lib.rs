#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Hamlet colony simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure per-turn systems. Callers submit [`Command`]
//! values describing desired mutations, the world executes those commands via
//! its `apply` entry point, and then reports [`Event`] values describing what
//! actually happened. Systems query immutable world state and respond
//! exclusively with new command batches.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod config;
pub mod placement;
pub mod resources;

pub use config::{
    BuildingCatalog, BuildingConfig, BuildingKind, CatalogError, FoodSourceMode, HousingParams,
    JobSlots, LevelStep, Ring, UpgradeProfile, XpMode,
};
pub use placement::{PlacementFlags, PlacementIssue};
pub use resources::{FoodTier, ResourceType};

/// Highest service level tracked by the area-effect aggregate.
pub const MAX_SERVICE_LEVEL: u8 = 5;

/// Movement budget used for "whole map" searches such as storage-to-storage routing.
pub const UNBOUNDED_BUDGET: f32 = 99_999.0;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Requests placement of a building anchored at the provided origin cell.
    PlaceBuilding {
        /// Identifier of the building definition to instantiate.
        config: ConfigId,
        /// Lower-left cell that anchors the footprint.
        origin: CellCoord,
        /// Faction that owns the new building.
        faction: Faction,
    },
    /// Requests removal of an existing building.
    DemolishBuilding {
        /// Identifier of the building targeted for removal.
        building: BuildingId,
    },
    /// Swaps the definition backing a building, for example after a level-up.
    ReplaceConfig {
        /// Building whose definition changes.
        building: BuildingId,
        /// Identifier of the replacement definition.
        config: ConfigId,
    },
    /// Advances construction of an unfinished building by one turn.
    AdvanceConstruction {
        /// Building under construction.
        building: BuildingId,
    },
    /// Debits gold from the treasury on a best-effort basis.
    SpendGold {
        /// Amount of gold requested.
        amount: u32,
        /// Reason recorded alongside the debit.
        reason: SpendReason,
    },
    /// Adjusts global happiness by the provided signed delta.
    AdjustHappiness {
        /// Signed change applied before clamping.
        delta: i32,
    },
    /// Replaces every job and housing employment counter with the provided plan.
    ApplyEmployment {
        /// Assignment computed for the current turn.
        plan: EmploymentPlan,
    },
    /// Writes the outcome of a housing settlement pass.
    SettleHousing(HousingSettlement),
    /// Writes the level and experience of an upgradable building.
    SettleLeveling {
        /// Building that gained experience.
        building: BuildingId,
        /// Level after any promotion.
        level: u32,
        /// Experience carried toward the next level.
        experience: u32,
    },
    /// Overrides the job slots or population ceiling of a building.
    OverrideCapacity {
        /// Building whose capacity changes.
        building: BuildingId,
        /// Replacement job slot count of providers.
        job_slots: Option<u32>,
        /// Replacement population ceiling of houses.
        max_population: Option<u32>,
    },
    /// Removes goods from a storage building, failing atomically when short.
    WithdrawGoods {
        /// Storage building providing the goods.
        building: BuildingId,
        /// Resource being withdrawn.
        resource: ResourceType,
        /// Units requested.
        quantity: u32,
    },
    /// Adds goods to a storage building.
    DepositGoods {
        /// Storage building receiving the goods.
        building: BuildingId,
        /// Resource being deposited.
        resource: ResourceType,
        /// Units added.
        quantity: u32,
    },
    /// Moves goods along a declared route from its source to its target.
    TransferGoods {
        /// Route carrying the goods.
        route: RouteId,
        /// Resource being moved.
        resource: ResourceType,
        /// Units moved.
        quantity: u32,
    },
    /// Records the per-turn cost and moved quantity of a route.
    RecordRouteOutcome {
        /// Route that was settled.
        route: RouteId,
        /// Path cost computed this turn.
        cost: f32,
        /// Units moved this turn.
        moved: u32,
    },
    /// Declares a transport route between two storage buildings.
    DeclareRoute {
        /// Storage the goods leave from.
        source: BuildingId,
        /// Storage the goods arrive at.
        target: BuildingId,
        /// Resources allowed on the route; empty allows every resource.
        whitelist: Vec<ResourceType>,
    },
    /// Removes a declared route.
    RemoveRoute {
        /// Route to remove.
        route: RouteId,
    },
    /// Clears every area-effect aggregate and replays all constructed buildings.
    RebuildAreaEffects,
    /// Registers a reason that prevents the turn from ending.
    AddTurnBlocker {
        /// Identity of the owner registering the blocker.
        owner: String,
        /// Human readable explanation.
        reason: String,
    },
    /// Removes a blocker previously registered by the owner.
    RemoveTurnBlocker {
        /// Identity of the owner that registered the blocker.
        owner: String,
    },
    /// Announces the start of the current turn.
    BeginTurn,
    /// Attempts to close the current turn, refused while blockers remain.
    CloseTurn,
    /// Increments the turn counter after a successful close.
    AdvanceTurn,
}

/// Events reported by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A new turn started.
    TurnBegan {
        /// Number of the turn that started.
        turn: u32,
    },
    /// The current turn is about to end and settlement should run.
    BeforeTurnEnd {
        /// Number of the turn being closed.
        turn: u32,
    },
    /// A turn finished and the counter advanced.
    TurnEnded {
        /// Number of the turn that finished.
        turn: u32,
    },
    /// A request to end the turn was refused because blockers remain.
    EndTurnRefused {
        /// Turn that remains active.
        turn: u32,
        /// Blockers that prevented the turn from ending.
        blockers: Vec<TurnBlocker>,
    },
    /// A blocker was registered.
    TurnBlockerAdded {
        /// Owner of the blocker.
        owner: String,
    },
    /// A blocker was removed.
    TurnBlockerRemoved {
        /// Owner of the blocker.
        owner: String,
    },
    /// A building was placed into the world.
    BuildingPlaced {
        /// Identifier allocated to the building.
        building: BuildingId,
        /// Definition backing the building.
        config: ConfigId,
        /// Faction owning the building.
        faction: Faction,
        /// Cells occupied by the building.
        region: CellRect,
    },
    /// A placement request was rejected.
    PlacementRejected {
        /// Definition requested for placement.
        config: ConfigId,
        /// Origin provided in the request.
        origin: CellCoord,
        /// Reason the placement failed.
        reason: PlacementError,
    },
    /// A building finished construction.
    BuildingConstructed {
        /// Building that completed.
        building: BuildingId,
        /// Definition backing the building.
        config: ConfigId,
        /// Faction owning the building.
        faction: Faction,
    },
    /// Construction advanced without completing.
    ConstructionProgressed {
        /// Building under construction.
        building: BuildingId,
        /// Turns of progress accumulated.
        progress: u32,
        /// Turns required to complete.
        required: u32,
    },
    /// A building was removed from the world.
    BuildingDemolished {
        /// Building that was removed.
        building: BuildingId,
        /// Definition that backed the building.
        config: ConfigId,
        /// Faction that owned the building.
        faction: Faction,
        /// Whether the building had finished construction.
        was_constructed: bool,
        /// Cells the building occupied.
        region: CellRect,
    },
    /// A demolition request was rejected.
    DemolitionRejected {
        /// Building targeted by the request.
        building: BuildingId,
    },
    /// A building definition was replaced.
    ConfigReplaced {
        /// Building whose definition changed.
        building: BuildingId,
        /// Previous definition.
        from: ConfigId,
        /// New definition.
        to: ConfigId,
    },
    /// A config replacement was rejected.
    ConfigReplacementRejected {
        /// Building targeted by the request.
        building: BuildingId,
        /// Definition requested.
        config: ConfigId,
    },
    /// Gold was debited from the treasury.
    GoldSpent {
        /// Amount requested.
        requested: u32,
        /// Amount actually debited.
        spent: u32,
        /// Reason supplied with the request.
        reason: SpendReason,
    },
    /// Global happiness changed.
    HappinessChanged {
        /// Happiness before the change.
        from: i32,
        /// Happiness after the change.
        to: i32,
    },
    /// Employment counters were replaced for the turn.
    EmploymentAssigned {
        /// Workers available across every housing unit.
        employable: u32,
        /// Workers that found a job.
        employed: u32,
    },
    /// A housing unit finished its settlement pass.
    HousingSettled {
        /// Housing building that settled.
        building: BuildingId,
        /// Population after settlement.
        population: u32,
    },
    /// A housing unit reached a new level.
    HousingLeveledUp {
        /// Housing building that levelled up.
        building: BuildingId,
        /// Level reached.
        level: u8,
    },
    /// An upgradable building recorded its experience.
    LevelingSettled {
        /// Building that gained experience.
        building: BuildingId,
        /// Level after settlement.
        level: u32,
        /// Experience carried toward the next level.
        experience: u32,
    },
    /// An upgradable building reached a new level.
    BuildingLeveledUp {
        /// Building that levelled up.
        building: BuildingId,
        /// Level reached.
        level: u32,
    },
    /// Capacity overrides were written to a building.
    CapacityOverridden {
        /// Building whose capacity changed.
        building: BuildingId,
        /// Job slots after the override, for providers.
        job_slots: Option<u32>,
        /// Population ceiling after the override, for houses.
        max_population: Option<u32>,
    },
    /// Goods left a storage building.
    GoodsWithdrawn {
        /// Storage building.
        building: BuildingId,
        /// Resource withdrawn.
        resource: ResourceType,
        /// Units withdrawn.
        quantity: u32,
    },
    /// Goods entered a storage building.
    GoodsDeposited {
        /// Storage building.
        building: BuildingId,
        /// Resource deposited.
        resource: ResourceType,
        /// Units deposited.
        quantity: u32,
    },
    /// A withdrawal or transfer failed because the stock was insufficient.
    WithdrawalRejected {
        /// Storage building.
        building: BuildingId,
        /// Resource requested.
        resource: ResourceType,
        /// Units requested.
        requested: u32,
        /// Units available at the time of the request.
        available: u32,
    },
    /// Goods moved along a route.
    GoodsTransferred {
        /// Route carrying the goods.
        route: RouteId,
        /// Resource moved.
        resource: ResourceType,
        /// Units moved.
        quantity: u32,
    },
    /// A route was declared.
    RouteDeclared {
        /// Identifier allocated to the route.
        route: RouteId,
        /// Source storage.
        source: BuildingId,
        /// Target storage.
        target: BuildingId,
    },
    /// A route declaration was rejected.
    RouteRejected {
        /// Requested source.
        source: BuildingId,
        /// Requested target.
        target: BuildingId,
        /// Reason the route was rejected.
        reason: RouteError,
    },
    /// A route was removed.
    RouteRemoved {
        /// Route that was removed.
        route: RouteId,
    },
    /// A route finished its per-turn execution.
    RouteSettled {
        /// Route that was settled.
        route: RouteId,
        /// Path cost used this turn.
        cost: f32,
        /// Units moved this turn.
        moved: u32,
    },
    /// Every area-effect aggregate was rebuilt from scratch.
    AreaEffectsRebuilt,
    /// The settlement reached a new civic stage.
    StageAdvanced {
        /// Stage that became active.
        stage: Stage,
    },
}

/// Reasons a placement request may be rejected by the world.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementError {
    /// No building definition with the requested identifier exists.
    UnknownConfig,
    /// One or more footprint cells are illegal; every failing cell is listed.
    Obstructed(Vec<PlacementIssue>),
}

/// Reasons a route declaration may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouteError {
    /// An endpoint does not exist.
    MissingEndpoint,
    /// An endpoint is not a storage building.
    NotStorage,
    /// Source and target are the same building.
    SameEndpoint,
}

/// Reason attached to a gold debit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpendReason {
    /// Per-turn upkeep of a constructed building.
    Maintenance {
        /// Building charged.
        building: BuildingId,
    },
    /// Per-turn upkeep of a transport route.
    RouteUpkeep {
        /// Route charged.
        route: RouteId,
    },
}

/// Named reason preventing the turn from ending.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnBlocker {
    /// Identity of the owner that registered the blocker.
    pub owner: String,
    /// Human readable explanation.
    pub reason: String,
}

/// Employment assignment computed for a single turn.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmploymentPlan {
    /// Per-housing labour outcome.
    pub housing: Vec<HousingEmployment>,
    /// Per-provider slot usage.
    pub providers: Vec<ProviderOccupancy>,
}

/// Labour outcome of a single housing unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HousingEmployment {
    /// Housing building.
    pub building: BuildingId,
    /// Residents able to work this turn.
    pub employable: u32,
    /// Residents that found a job.
    pub employed: u32,
}

/// Slot usage of a single job provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderOccupancy {
    /// Job-providing building.
    pub building: BuildingId,
    /// Slots filled this turn.
    pub occupied: u32,
}

/// Outcome of a housing settlement pass for one building.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HousingSettlement {
    /// Housing building.
    pub building: BuildingId,
    /// Population after drift.
    pub population: u32,
    /// Level after any promotion.
    pub level: u8,
    /// Population ceiling for the level.
    pub max_population: u32,
    /// Experience accumulated toward the next level.
    pub experience: u32,
    /// Experience required for the next level.
    pub experience_to_next: u32,
}

/// Owning faction of a building.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    /// Buildings owned by the player.
    #[default]
    Player,
    /// Hostile buildings that must be cleared to progress.
    Enemy,
}

/// Civic stage of the settlement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Starting stage.
    #[default]
    Tribe,
    /// Reached once a plaza stands and no enemy building remains.
    Chiefdom,
    /// Reached once a palace stands.
    ProtoState,
    /// Reached once a mausoleum stands.
    Dynasty,
}

/// Area-effect channels written to the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectChannel {
    /// Medical coverage.
    Medical,
    /// Security coverage.
    Security,
    /// Beautification.
    Beauty,
}

impl EffectChannel {
    /// Every channel in canonical order.
    pub const ALL: [EffectChannel; 3] = [Self::Medical, Self::Security, Self::Beauty];
}

/// Effective service levels of a single cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceLevels {
    /// Medical level.
    pub medical: i16,
    /// Security level.
    pub security: i16,
    /// Beautification level.
    pub beauty: i16,
}

impl ServiceLevels {
    /// Level recorded for the provided channel.
    #[must_use]
    pub const fn get(&self, channel: EffectChannel) -> i16 {
        match channel {
            EffectChannel::Medical => self.medical,
            EffectChannel::Security => self.security,
            EffectChannel::Beauty => self.beauty,
        }
    }
}

/// Unique identifier assigned to a building.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildingId(u32);

impl BuildingId {
    /// Creates a new building identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for BuildingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unique identifier assigned to a transport route.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteId(u32);

impl RouteId {
    /// Creates a new route identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a building definition.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigId(String);

impl ConfigId {
    /// Creates a new definition identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrowed string form of the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConfigId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for ConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Location of a single grid cell expressed as `x` and `y` coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    x: i32,
    y: i32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Horizontal coordinate of the cell.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Vertical coordinate of the cell.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Returns the cell displaced by the provided offsets.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// The eight surrounding cells, without any bounds filtering.
    pub fn neighbors8(self) -> impl Iterator<Item = CellCoord> {
        NEIGHBOR_OFFSETS
            .iter()
            .map(move |&(dx, dy)| self.offset(dx, dy))
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned rectangle expressed in cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRect {
    origin: CellCoord,
    size: CellRectSize,
}

impl CellRect {
    /// Constructs a rectangle from an origin cell and size.
    #[must_use]
    pub const fn from_origin_and_size(origin: CellCoord, size: CellRectSize) -> Self {
        Self { origin, size }
    }

    /// Constructs a square footprint with the provided side length.
    #[must_use]
    pub const fn square(origin: CellCoord, side: u32) -> Self {
        Self::from_origin_and_size(origin, CellRectSize::new(side, side))
    }

    /// Lower-left cell that anchors the rectangle.
    #[must_use]
    pub const fn origin(&self) -> CellCoord {
        self.origin
    }

    /// Dimensions of the rectangle measured in whole cells.
    #[must_use]
    pub const fn size(&self) -> CellRectSize {
        self.size
    }

    /// Reports whether the rectangle covers the provided cell.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        let dx = i64::from(cell.x()) - i64::from(self.origin.x());
        let dy = i64::from(cell.y()) - i64::from(self.origin.y());
        dx >= 0 && dy >= 0 && dx < i64::from(self.size.width()) && dy < i64::from(self.size.height())
    }

    /// Every covered cell, columns first.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> {
        let origin = self.origin;
        let height = self.size.height();
        (0..self.size.width()).flat_map(move |dx| {
            (0..height).map(move |dy| origin.offset(dx as i32, dy as i32))
        })
    }

    /// Geometric centre of the rectangle in cell units.
    #[must_use]
    pub fn center(&self) -> (f32, f32) {
        let half_width = self.size.width().saturating_sub(1) as f32 * 0.5;
        let half_height = self.size.height().saturating_sub(1) as f32 * 0.5;
        (
            self.origin.x() as f32 + half_width,
            self.origin.y() as f32 + half_height,
        )
    }
}

/// Size of a [`CellRect`] measured in whole cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRectSize {
    width: u32,
    height: u32,
}

impl CellRectSize {
    /// Creates a new size descriptor with explicit dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width of the rectangle in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the rectangle in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }
}
