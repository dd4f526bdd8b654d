#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Emberspire engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and the orchestrator submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to deterministically. Systems consume event streams,
//! query immutable snapshots, and respond exclusively with new command
//! batches.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Number of rows immediately above the exit band where towers may never be
/// placed, guaranteeing enemies an unobstructed final approach.
pub const NO_BUILD_BUFFER_ROWS: u32 = 2;

/// Interval between periodic path recomputations for a live enemy.
pub const REPLAN_INTERVAL: Duration = Duration::from_millis(2_000);

/// Distance in world units at which a waypoint counts as reached.
pub const WAYPOINT_EPSILON: f32 = 0.1;

/// Margin in world units subtracted from the far edge of the grid when
/// deciding that an enemy has arrived at the exit band.
pub const ARRIVAL_MARGIN: f32 = 1.5;

/// Upper bound on alternate exit cells tried before the planner degrades to a
/// direct fallback path.
pub const MAX_EXIT_RETRIES: usize = 3;

/// Upper bound on live enemies sampled during placement connectivity checks.
pub const MAX_SAMPLED_ENEMIES: usize = 3;

/// Wall-clock budget granted to a single path search before it is abandoned.
pub const SEARCH_DEADLINE: Duration = Duration::from_secs(3);

/// Delay between the first and second projectile of a double shot.
pub const DOUBLE_SHOT_DELAY: Duration = Duration::from_millis(150);

/// Simulated lifetime budget granted to a projectile before it expires.
pub const PROJECTILE_LIFETIME: Duration = Duration::from_secs(3);

/// Travel speed of every projectile in world units per second.
pub const PROJECTILE_SPEED: f32 = 9.0;

/// Interval between periodic burn damage ticks.
pub const BURN_TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Probability that an ember-element impact lands a critical hit.
pub const EMBER_CRIT_CHANCE: f32 = 0.15;

/// Damage multiplier applied by an ember-element critical hit.
pub const EMBER_CRIT_MULTIPLIER: f32 = 2.0;

/// Unique identifier assigned to an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
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

/// Unique identifier assigned to a tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TowerId(u32);

impl TowerId {
    /// Creates a new tower identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the tower identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectileId(u32);

impl ProjectileId {
    /// Creates a new projectile identifier with the provided numeric value.
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

/// Identifier of a wave within a running campaign.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WaveId(u32);

impl WaveId {
    /// Creates a new wave identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the wave identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }
}

/// Walkability state held by a single grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellState {
    /// Enemies may traverse the cell and towers may be placed on it.
    Walkable,
    /// The cell is blocked by a tower and impassable to enemies.
    Obstacle,
}

/// Read-only view into the dense walkability grid.
///
/// Systems receive this view instead of the authoritative grid so they can
/// query walkability without any ability to mutate it.
#[derive(Clone, Copy, Debug)]
pub struct GridView<'a> {
    cells: &'a [CellState],
    columns: u32,
    rows: u32,
}

impl<'a> GridView<'a> {
    /// Captures a new grid view backed by the provided cell slice.
    #[must_use]
    pub fn new(cells: &'a [CellState], columns: u32, rows: u32) -> Self {
        Self {
            cells,
            columns,
            rows,
        }
    }

    /// Returns the state of the provided cell, or `None` when out of bounds.
    #[must_use]
    pub fn state(&self, cell: CellCoord) -> Option<CellState> {
        self.index(cell).and_then(|index| self.cells.get(index)).copied()
    }

    /// Reports whether the cell lies in bounds and is currently walkable.
    #[must_use]
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        matches!(self.state(cell), Some(CellState::Walkable))
    }

    /// Reports whether the cell lies within the configured grid bounds.
    #[must_use]
    pub fn in_bounds(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Provides the dimensions of the underlying grid as `(columns, rows)`.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Row index of the entry band where enemies appear.
    #[must_use]
    pub const fn entry_row(&self) -> u32 {
        0
    }

    /// Row index of the exit band that enemies must reach.
    #[must_use]
    pub fn exit_row(&self) -> u32 {
        self.rows.saturating_sub(1)
    }

    /// Reports whether the provided row belongs to the entry band.
    #[must_use]
    pub fn is_entry_row(&self, row: u32) -> bool {
        row == self.entry_row()
    }

    /// Reports whether the provided row belongs to the exit band.
    #[must_use]
    pub fn is_exit_row(&self, row: u32) -> bool {
        self.rows > 0 && row == self.exit_row()
    }

    /// Reports whether tower placement is forbidden at the provided cell.
    ///
    /// The entry band, the exit band, and the no-build buffer directly above
    /// the exit band are all restricted.
    #[must_use]
    pub fn is_build_restricted(&self, cell: CellCoord) -> bool {
        if !self.in_bounds(cell) {
            return true;
        }
        let row = cell.row();
        if self.is_entry_row(row) || self.is_exit_row(row) {
            return true;
        }
        let buffer_start = self.exit_row().saturating_sub(NO_BUILD_BUFFER_ROWS);
        row >= buffer_start
    }

    /// Enumerates the cells composing the entry band.
    pub fn entry_cells(&self) -> impl Iterator<Item = CellCoord> + 'a {
        let row = self.entry_row();
        (0..self.columns).map(move |column| CellCoord::new(column, row))
    }

    /// Enumerates the cells composing the exit band.
    pub fn exit_cells(&self) -> impl Iterator<Item = CellCoord> + 'a {
        let row = self.exit_row();
        (0..self.columns).map(move |column| CellCoord::new(column, row))
    }

    /// Dense cell states stored in row-major order.
    #[must_use]
    pub const fn cells(&self) -> &'a [CellState] {
        self.cells
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.in_bounds(cell) {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        Some(row * width + column)
    }
}

/// Elemental alignment carried by enemies, towers, and projectiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Element {
    /// Fire-aligned; the only element capable of critical hits.
    Ember,
    /// Cold-aligned; impacts may slow the target.
    Frost,
    /// Toxin-aligned; impacts may weaken the target.
    Venom,
    /// Earth-aligned; favors raw damage and blast radii.
    Stone,
}

impl Element {
    /// Damage multiplier applied when this element strikes `defender`.
    ///
    /// Ember dominates Venom, Venom dominates Stone, Stone dominates Frost,
    /// and Frost dominates Ember, with a 1.5 bonus along the cycle and a
    /// 0.75 penalty against it. Matching or unrelated pairings deal
    /// unmodified damage.
    #[must_use]
    pub fn advantage_multiplier(self, defender: Element) -> f32 {
        if self.dominates(defender) {
            1.5
        } else if defender.dominates(self) {
            0.75
        } else {
            1.0
        }
    }

    const fn dominates(self, other: Element) -> bool {
        matches!(
            (self, other),
            (Element::Ember, Element::Venom)
                | (Element::Venom, Element::Stone)
                | (Element::Stone, Element::Frost)
                | (Element::Frost, Element::Ember)
        )
    }
}

/// Species of enemies that can be spawned into the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Fast, fragile swarm unit.
    Mite,
    /// Slow unit with a deep health pool.
    Brute,
    /// Very fast ember-aligned skirmisher.
    Wisp,
    /// Armored mid-speed unit.
    Shellback,
}

impl EnemyKind {
    /// Base health pool before difficulty scaling.
    #[must_use]
    pub const fn base_health(self) -> f32 {
        match self {
            Self::Mite => 20.0,
            Self::Brute => 70.0,
            Self::Wisp => 14.0,
            Self::Shellback => 45.0,
        }
    }

    /// Base movement speed in world units per second.
    #[must_use]
    pub const fn base_speed(self) -> f32 {
        match self {
            Self::Mite => 1.6,
            Self::Brute => 0.8,
            Self::Wisp => 2.2,
            Self::Shellback => 1.1,
        }
    }

    /// Gold awarded when the enemy dies, before difficulty scaling.
    #[must_use]
    pub const fn bounty(self) -> u32 {
        match self {
            Self::Mite => 4,
            Self::Brute => 10,
            Self::Wisp => 5,
            Self::Shellback => 8,
        }
    }

    /// Elemental alignment of the species.
    #[must_use]
    pub const fn element(self) -> Element {
        match self {
            Self::Mite => Element::Venom,
            Self::Brute => Element::Stone,
            Self::Wisp => Element::Ember,
            Self::Shellback => Element::Frost,
        }
    }
}

/// Types of towers that can be constructed on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TowerKind {
    /// Ember tower that burns targets and can land critical hits.
    Flamecaster,
    /// Frost tower that slows targets on impact.
    Frostspire,
    /// Venom tower with a high fire rate that weakens targets.
    Venomspit,
    /// Stone tower dealing heavy area damage at a low cadence.
    Stonewarden,
}

impl TowerKind {
    /// Base projectile damage before multipliers.
    #[must_use]
    pub const fn base_damage(self) -> f32 {
        match self {
            Self::Flamecaster => 12.0,
            Self::Frostspire => 8.0,
            Self::Venomspit => 6.0,
            Self::Stonewarden => 20.0,
        }
    }

    /// Targeting range measured in world units.
    #[must_use]
    pub const fn range(self) -> f32 {
        match self {
            Self::Flamecaster => 3.5,
            Self::Frostspire => 3.0,
            Self::Venomspit => 3.0,
            Self::Stonewarden => 2.5,
        }
    }

    /// Base fire rate measured in shots per second.
    #[must_use]
    pub const fn fire_rate(self) -> f32 {
        match self {
            Self::Flamecaster => 1.2,
            Self::Frostspire => 1.0,
            Self::Venomspit => 1.6,
            Self::Stonewarden => 0.6,
        }
    }

    /// Blast radius in world units for area-of-effect towers.
    #[must_use]
    pub const fn blast_radius(self) -> Option<f32> {
        match self {
            Self::Stonewarden => Some(1.5),
            _ => None,
        }
    }

    /// Elemental alignment of the tower and its projectiles.
    #[must_use]
    pub const fn element(self) -> Element {
        match self {
            Self::Flamecaster => Element::Ember,
            Self::Frostspire => Element::Frost,
            Self::Venomspit => Element::Venom,
            Self::Stonewarden => Element::Stone,
        }
    }

    /// Gold cost charged when the tower is placed.
    #[must_use]
    pub const fn cost(self) -> u32 {
        match self {
            Self::Flamecaster => 40,
            Self::Frostspire => 35,
            Self::Venomspit => 30,
            Self::Stonewarden => 60,
        }
    }

    /// Probability that an impact applies the element's status effect.
    #[must_use]
    pub const fn on_hit_chance(self) -> f32 {
        match self {
            Self::Flamecaster => 0.35,
            Self::Frostspire => 0.5,
            Self::Venomspit => 0.4,
            Self::Stonewarden => 0.0,
        }
    }

    /// Probability that a shot is followed by a delayed second shot.
    #[must_use]
    pub const fn double_shot_chance(self) -> f32 {
        match self {
            Self::Flamecaster => 0.15,
            Self::Frostspire => 0.1,
            Self::Venomspit => 0.1,
            Self::Stonewarden => 0.05,
        }
    }

    /// Status effect applied by this tower's element on a successful roll.
    #[must_use]
    pub fn on_hit_effect(self) -> Option<StatusEffect> {
        match self.element() {
            Element::Ember => Some(StatusEffect::Burn {
                damage_per_second: 4.0,
            }),
            Element::Frost => Some(StatusEffect::Slow { multiplier: 0.6 }),
            Element::Venom => Some(StatusEffect::Weaken { multiplier: 1.3 }),
            Element::Stone => None,
        }
    }

    /// Duration granted to this tower's on-hit status effect.
    #[must_use]
    pub fn on_hit_duration(self) -> Duration {
        match self.element() {
            Element::Ember | Element::Frost => Duration::from_secs(2),
            Element::Venom => Duration::from_secs(3),
            Element::Stone => Duration::ZERO,
        }
    }
}

/// Time-bound modifier applied to an enemy by projectile impacts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StatusEffect {
    /// Periodic damage applied on a fixed sub-interval.
    Burn {
        /// Damage dealt per second of burning, applied in half-second ticks.
        damage_per_second: f32,
    },
    /// Multiplies effective movement speed while active.
    Slow {
        /// Speed multiplier in `(0, 1)`.
        multiplier: f32,
    },
    /// Multiplies damage taken while active.
    Weaken {
        /// Damage-taken multiplier greater than 1.
        multiplier: f32,
    },
}

impl StatusEffect {
    /// Discriminant used when refreshing an effect of the same kind.
    #[must_use]
    pub const fn kind(&self) -> StatusEffectKind {
        match self {
            Self::Burn { .. } => StatusEffectKind::Burn,
            Self::Slow { .. } => StatusEffectKind::Slow,
            Self::Weaken { .. } => StatusEffectKind::Weaken,
        }
    }
}

/// Discriminant identifying a status effect family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusEffectKind {
    /// Periodic fire damage.
    Burn,
    /// Movement speed reduction.
    Slow,
    /// Increased damage taken.
    Weaken,
}

/// Families of time-bound buffs a tower may carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TowerBuffKind {
    /// Multiplies effective fire rate while active.
    Haste,
    /// Multiplies outgoing damage while active.
    Damage,
}

/// Cause recorded when an enemy dies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeathCause {
    /// Killed by a projectile impact of the given element.
    Impact(Element),
    /// Killed by accumulated burn ticks.
    Burn,
}

/// Reasons a tower placement request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementError {
    /// The requested cell lies outside the configured grid bounds.
    OutOfBounds,
    /// The requested cell is already blocked by an obstacle.
    Occupied,
    /// The cell lies in the entry band, exit band, or no-build buffer.
    Restricted,
    /// Placing the tower would sever every route to the exit band for at
    /// least one checked enemy or entry point.
    RouteBlocked,
}

/// Reasons a tower removal request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemovalError {
    /// No tower with the provided identifier exists.
    MissingTower,
}

/// Terminal state reported when a projectile leaves the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectileOutcome {
    /// The projectile reached its target and applied damage.
    Impact,
    /// The projectile exceeded its lifetime budget.
    Expired,
    /// The projectile's target died or arrived before impact.
    TargetLost,
    /// The projectile left the world bounds implied by the grid.
    OutOfBounds,
}

/// Global difficulty multipliers consumed by the world as plain data.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifficultyConfig {
    /// Multiplier applied to enemy health at spawn.
    pub enemy_health: f32,
    /// Multiplier applied to enemy base speed at spawn.
    pub enemy_speed: f32,
    /// Multiplier applied to gold rewards.
    pub gold: f32,
    /// Multiplier applied to tower damage.
    pub tower_damage: f32,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            enemy_health: 1.0,
            enemy_speed: 1.0,
            gold: 1.0,
            tower_damage: 1.0,
        }
    }
}

/// Clamps a derived reward to a sane per-kind default.
///
/// Rewards flow through several floating-point multipliers; a non-finite or
/// non-positive result would silently corrupt the economy, so it is replaced
/// by the unscaled base value instead.
#[must_use]
pub fn clamp_reward(scaled: f32, base: u32) -> u32 {
    if !scaled.is_finite() || scaled <= 0.0 {
        return base;
    }
    scaled.round().min(u32::MAX as f32) as u32
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Configures the world's walkability grid using the provided dimensions.
    ConfigureGrid {
        /// Number of cell columns laid out in the grid.
        columns: u32,
        /// Number of cell rows laid out in the grid.
        rows: u32,
    },
    /// Advances the simulation clock and every global timer.
    Tick {
        /// Duration of simulated time that elapsed since the previous frame.
        dt: Duration,
    },
    /// Requests that an enemy of the given kind enter at the provided cell.
    SpawnEnemy {
        /// Species of enemy to create.
        kind: EnemyKind,
        /// Entry-band cell the enemy appears on.
        cell: CellCoord,
    },
    /// Delivers a freshly planned path for an enemy.
    AssignPath {
        /// Enemy the path was computed for.
        enemy: EnemyId,
        /// Planned cell sequence from the enemy's cell to an exit cell.
        cells: Vec<CellCoord>,
        /// Indicates the path is a degrade-gracefully fallback that may
        /// cross obstacles.
        fallback: bool,
    },
    /// Requests that a tower fire a projectile at the given enemy.
    FireProjectile {
        /// Tower attempting to fire.
        tower: TowerId,
        /// Enemy the projectile should home toward.
        target: EnemyId,
    },
    /// Advances every enemy: status effects, movement, arrival detection.
    AdvanceEnemies {
        /// Duration of simulated time to integrate.
        dt: Duration,
    },
    /// Advances every projectile: movement, collision, damage application.
    AdvanceProjectiles {
        /// Duration of simulated time to integrate.
        dt: Duration,
    },
    /// Removes dead, arrived, and resolved entities from the collections.
    Reap,
    /// Commits a validated tower placement, mutating the grid.
    PlaceTower {
        /// Type of tower to construct.
        kind: TowerKind,
        /// Cell the tower occupies.
        cell: CellCoord,
    },
    /// Removes an existing tower, reverting its cell to walkable.
    RemoveTower {
        /// Identifier of the tower targeted for removal.
        tower: TowerId,
    },
    /// Applies a time-bound buff to a single tower.
    BuffTower {
        /// Tower receiving the buff.
        tower: TowerId,
        /// Family of the buff.
        kind: TowerBuffKind,
        /// Multiplier folded into the affected stat while active.
        multiplier: f32,
        /// Duration the buff remains active.
        duration: Duration,
    },
    /// Applies a time-boxed global damage/fire-rate empowerment.
    Empower {
        /// Multiplier folded into tower damage and fire rate while active.
        multiplier: f32,
        /// Duration the empowerment remains active.
        duration: Duration,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the walkability grid was reconfigured.
    GridConfigured {
        /// Number of cell columns in the new grid.
        columns: u32,
        /// Number of cell rows in the new grid.
        rows: u32,
    },
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that an enemy entered the grid.
    EnemySpawned {
        /// Identifier assigned to the new enemy.
        enemy: EnemyId,
        /// Species of the spawned enemy.
        kind: EnemyKind,
        /// Entry cell the enemy appeared on.
        cell: CellCoord,
    },
    /// Requests that the pathing system plan a route for an enemy.
    ///
    /// The world sets the enemy's in-flight flag before emitting this event
    /// and will not emit a second request until a path is assigned.
    PathRequested {
        /// Enemy awaiting a path.
        enemy: EnemyId,
        /// Cell the enemy currently occupies.
        from: CellCoord,
        /// Exit cell the enemy would prefer to reach.
        preferred_exit: CellCoord,
    },
    /// Confirms that a planned path was accepted for an enemy.
    PathAssigned {
        /// Enemy that received the path.
        enemy: EnemyId,
        /// Number of waypoints in the accepted path.
        length: usize,
        /// Indicates the accepted path was a direct fallback.
        fallback: bool,
    },
    /// Reports damage applied to an enemy.
    EnemyDamaged {
        /// Enemy that took damage.
        enemy: EnemyId,
        /// Amount of damage applied after all multipliers.
        amount: f32,
        /// Health remaining after the damage.
        remaining: f32,
    },
    /// Announces that an enemy died.
    EnemyDied {
        /// Enemy that died.
        enemy: EnemyId,
        /// Cause recorded for the death.
        cause: DeathCause,
        /// Gold awarded for the kill after clamping.
        bounty: u32,
    },
    /// Announces that an enemy reached the exit band.
    EnemyArrived {
        /// Enemy that arrived.
        enemy: EnemyId,
    },
    /// Confirms that a reaped entity's external resources may be released.
    EnemyRemoved {
        /// Enemy removed from the authoritative collections.
        enemy: EnemyId,
    },
    /// Reports gold granted to the player.
    GoldAwarded {
        /// Amount granted by this award.
        amount: u32,
        /// Player total after the award.
        total: u32,
    },
    /// Confirms that a tower was placed and the grid mutated.
    TowerPlaced {
        /// Identifier assigned to the tower by the world.
        tower: TowerId,
        /// Type of tower that was placed.
        kind: TowerKind,
        /// Cell now occupied by the tower.
        cell: CellCoord,
    },
    /// Confirms that a tower was removed and its cell reverted.
    TowerRemoved {
        /// Identifier of the removed tower.
        tower: TowerId,
        /// Cell the tower previously occupied.
        cell: CellCoord,
    },
    /// Reports that a tower placement request was rejected.
    TowerPlacementRejected {
        /// Type of tower requested for placement.
        kind: TowerKind,
        /// Cell provided in the placement request.
        cell: CellCoord,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Reports that a tower removal request was rejected.
    TowerRemovalRejected {
        /// Identifier of the tower targeted for removal.
        tower: TowerId,
        /// Specific reason the removal failed.
        reason: RemovalError,
    },
    /// Confirms that a buff was applied to a tower.
    TowerBuffed {
        /// Tower that received the buff.
        tower: TowerId,
        /// Family of the applied buff.
        kind: TowerBuffKind,
    },
    /// Confirms that a projectile entered the simulation.
    ProjectileSpawned {
        /// Identifier assigned to the projectile.
        projectile: ProjectileId,
        /// Tower that fired the projectile.
        tower: TowerId,
        /// Enemy the projectile homes toward.
        target: EnemyId,
    },
    /// Announces that a projectile left the simulation.
    ProjectileResolved {
        /// Identifier of the resolved projectile.
        projectile: ProjectileId,
        /// Terminal state the projectile reached.
        outcome: ProjectileOutcome,
    },
    /// Announces that a wave began spawning.
    WaveStarted {
        /// Identifier of the wave.
        wave: WaveId,
    },
    /// Announces that a wave finished: quota spawned and no survivor alive.
    WaveCompleted {
        /// Identifier of the wave.
        wave: WaveId,
    },
}

/// Immutable representation of a single enemy's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Unique identifier assigned to the enemy.
    pub id: EnemyId,
    /// Species of the enemy.
    pub kind: EnemyKind,
    /// Elemental alignment of the enemy.
    pub element: Element,
    /// Grid cell currently occupied by the enemy.
    pub cell: CellCoord,
    /// Continuous world-space position.
    pub position: Vec2,
    /// Current health.
    pub health: f32,
    /// Health the enemy spawned with.
    pub max_health: f32,
    /// Speed after folding active slow effects, in world units per second.
    pub effective_speed: f32,
    /// Indicates the enemy reached the exit band.
    pub arrived: bool,
    /// Indicates a path computation is outstanding for the enemy.
    pub path_pending: bool,
    /// Number of waypoints remaining on the current path.
    pub waypoints_remaining: usize,
    /// Kinds of status effects currently active on the enemy.
    pub active_effects: Vec<StatusEffectKind>,
}

/// Read-only snapshot describing all enemies in deterministic order.
#[derive(Clone, Debug, Default)]
pub struct EnemyView {
    snapshots: Vec<EnemySnapshot>,
}

impl EnemyView {
    /// Creates a new enemy view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EnemySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured enemy snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<EnemySnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single tower's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct TowerSnapshot {
    /// Identifier allocated to the tower by the world.
    pub id: TowerId,
    /// Kind of tower that was constructed.
    pub kind: TowerKind,
    /// Cell occupied by the tower.
    pub cell: CellCoord,
    /// World-space center of the tower.
    pub position: Vec2,
    /// Time remaining until the tower may fire again.
    pub ready_in: Duration,
}

/// Read-only snapshot describing all towers in deterministic order.
#[derive(Clone, Debug, Default)]
pub struct TowerView {
    snapshots: Vec<TowerSnapshot>,
}

impl TowerView {
    /// Creates a new tower view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TowerSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured tower snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &TowerSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<TowerSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single projectile used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectileSnapshot {
    /// Identifier assigned to the projectile.
    pub id: ProjectileId,
    /// Continuous world-space position.
    pub position: Vec2,
    /// Enemy the projectile homes toward.
    pub target: EnemyId,
    /// Elemental alignment of the projectile.
    pub element: Element,
}

/// Read-only snapshot describing all projectiles in deterministic order.
#[derive(Clone, Debug, Default)]
pub struct ProjectileView {
    snapshots: Vec<ProjectileSnapshot>,
}

impl ProjectileView {
    /// Creates a new projectile view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<ProjectileSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &ProjectileSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<ProjectileSnapshot> {
        self.snapshots
    }
}
