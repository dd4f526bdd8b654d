#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Emberspire.
//!
//! The world owns the walkability grid and every live entity. All mutation
//! flows through [`apply`], which executes one [`Command`] at a time and
//! broadcasts [`Event`] values describing what actually happened. Read access
//! goes through the [`query`] module, which hands out immutable snapshots so
//! systems and renderers can never reach into live state.

mod grid;

pub use grid::ClampedCell;

use std::collections::BTreeMap;
use std::time::Duration;

use emberspire_core::{
    clamp_reward, CellCoord, CellState, Command, DeathCause, DifficultyConfig, Element, EnemyId,
    EnemyKind, Event, ProjectileId, ProjectileOutcome, RemovalError,
    StatusEffect, TowerBuffKind, TowerId, TowerKind, BURN_TICK_INTERVAL,
    DOUBLE_SHOT_DELAY, EMBER_CRIT_CHANCE, EMBER_CRIT_MULTIPLIER, PROJECTILE_LIFETIME,
    PROJECTILE_SPEED, REPLAN_INTERVAL, WAYPOINT_EPSILON,
};
use glam::Vec2;
use tracing::debug;

const DEFAULT_COLUMNS: u32 = 15;
const DEFAULT_ROWS: u32 = 25;
const DEFAULT_RNG_SEED: u64 = 0x7c8d_9a01_52fb_e6d3;
const DEFAULT_STARTING_GOLD: u32 = 120;

/// Distance at which a projectile counts as having struck its target.
const IMPACT_RADIUS: f32 = 0.15;

/// Configuration consumed by the world at construction time, as plain data.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Number of cell columns in the walkability grid.
    pub columns: u32,
    /// Number of cell rows in the walkability grid.
    pub rows: u32,
    /// Seed for the world's deterministic random stream.
    pub rng_seed: u64,
    /// Global difficulty multipliers.
    pub difficulty: DifficultyConfig,
    /// Gold the player starts with.
    pub starting_gold: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            rows: DEFAULT_ROWS,
            rng_seed: DEFAULT_RNG_SEED,
            difficulty: DifficultyConfig::default(),
            starting_gold: DEFAULT_STARTING_GOLD,
        }
    }
}

/// Represents the authoritative Emberspire world state.
#[derive(Debug)]
pub struct World {
    grid: grid::Grid,
    clock: Duration,
    enemies: Vec<Enemy>,
    towers: BTreeMap<TowerId, Tower>,
    projectiles: Vec<Projectile>,
    pending_shots: Vec<PendingShot>,
    next_enemy_id: u32,
    next_tower_id: u32,
    next_projectile_id: u32,
    gold: u32,
    empowerment: Option<Empowerment>,
    difficulty: DifficultyConfig,
    rng: SplitMix64,
}

impl World {
    /// Creates a new world with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a new world from the provided configuration.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            grid: grid::Grid::new(config.columns, config.rows),
            clock: Duration::ZERO,
            enemies: Vec::new(),
            towers: BTreeMap::new(),
            projectiles: Vec::new(),
            pending_shots: Vec::new(),
            next_enemy_id: 0,
            next_tower_id: 0,
            next_projectile_id: 0,
            gold: config.starting_gold,
            empowerment: None,
            difficulty: config.difficulty,
            rng: SplitMix64::new(config.rng_seed),
        }
    }

    fn allocate_enemy_id(&mut self) -> EnemyId {
        let id = EnemyId::new(self.next_enemy_id);
        self.next_enemy_id = self.next_enemy_id.wrapping_add(1);
        id
    }

    fn allocate_tower_id(&mut self) -> TowerId {
        let id = TowerId::new(self.next_tower_id);
        self.next_tower_id = self.next_tower_id.wrapping_add(1);
        id
    }

    fn allocate_projectile_id(&mut self) -> ProjectileId {
        let id = ProjectileId::new(self.next_projectile_id);
        self.next_projectile_id = self.next_projectile_id.wrapping_add(1);
        id
    }

    fn empowerment_multiplier(&self) -> f32 {
        self.empowerment.map_or(1.0, |empowerment| empowerment.multiplier)
    }

    /// Picks a walkable exit cell deterministically from the rng stream.
    fn choose_exit(&mut self) -> CellCoord {
        let exits: Vec<CellCoord> = self
            .grid
            .view()
            .exit_cells()
            .filter(|cell| self.grid.view().is_walkable(*cell))
            .collect();
        if exits.is_empty() {
            let row = self.grid.rows().saturating_sub(1);
            return CellCoord::new(self.grid.columns() / 2, row);
        }
        let index = (self.rng.next_u64() % exits.len() as u64) as usize;
        exits[index]
    }

    /// Flags every live enemy for a forced replan after a grid mutation.
    ///
    /// Enemies with a computation already outstanding keep their in-flight
    /// guard; the periodic replan picks them up within one interval.
    fn invalidate_paths(&mut self, out_events: &mut Vec<Event>) {
        for enemy in self.enemies.iter_mut() {
            if !enemy.is_live() || enemy.path_pending {
                continue;
            }
            enemy.path_pending = true;
            out_events.push(Event::PathRequested {
                enemy: enemy.id,
                from: self.grid.world_to_grid(enemy.position).cell,
                preferred_exit: enemy.preferred_exit,
            });
        }
    }

    fn fire_projectile(
        &mut self,
        tower_id: TowerId,
        target: EnemyId,
        out_events: &mut Vec<Event>,
    ) {
        let empowerment = self.empowerment_multiplier();
        let difficulty = self.difficulty;
        let Some(tower) = self.towers.get(&tower_id) else {
            return;
        };
        let kind = tower.kind;
        let damage = kind.base_damage()
            * empowerment
            * difficulty.tower_damage
            * tower.damage_multiplier();
        let position = tower.position;
        let projectile = Projectile {
            id: self.allocate_projectile_id(),
            kind,
            position,
            target,
            damage,
            remaining: PROJECTILE_LIFETIME,
            resolved: None,
        };
        out_events.push(Event::ProjectileSpawned {
            projectile: projectile.id,
            tower: tower_id,
            target,
        });
        self.projectiles.push(projectile);
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureGrid { columns, rows } => {
            world.grid = grid::Grid::new(columns, rows);
            world.enemies.clear();
            world.towers.clear();
            world.projectiles.clear();
            world.pending_shots.clear();
            out_events.push(Event::GridConfigured { columns, rows });
        }
        Command::Tick { dt } => {
            world.clock = world.clock.saturating_add(dt);
            out_events.push(Event::TimeAdvanced { dt });

            if let Some(empowerment) = world.empowerment.as_mut() {
                empowerment.remaining = empowerment.remaining.saturating_sub(dt);
                if empowerment.remaining.is_zero() {
                    world.empowerment = None;
                }
            }

            for tower in world.towers.values_mut() {
                for buff in tower.buffs.iter_mut() {
                    buff.remaining = buff.remaining.saturating_sub(dt);
                }
                tower.buffs.retain(|buff| !buff.remaining.is_zero());
            }

            let now = world.clock;
            let due: Vec<PendingShot> = {
                let (ready, waiting): (Vec<PendingShot>, Vec<PendingShot>) = world
                    .pending_shots
                    .drain(..)
                    .partition(|shot| shot.due <= now);
                world.pending_shots = waiting;
                ready
            };
            for shot in due {
                let target_live = world
                    .enemies
                    .iter()
                    .any(|enemy| enemy.id == shot.target && enemy.is_live());
                if target_live {
                    world.fire_projectile(shot.tower, shot.target, out_events);
                }
            }

            // Periodic replans: movement continues along the stale path while
            // the request is outstanding.
            let clock = world.clock;
            let mut requests = Vec::new();
            for enemy in world.enemies.iter_mut() {
                if !enemy.is_live() || enemy.path_pending {
                    continue;
                }
                if clock.saturating_sub(enemy.last_planned) >= REPLAN_INTERVAL {
                    enemy.path_pending = true;
                    requests.push((enemy.id, enemy.position, enemy.preferred_exit));
                }
            }
            for (enemy, position, preferred_exit) in requests {
                out_events.push(Event::PathRequested {
                    enemy,
                    from: world.grid.world_to_grid(position).cell,
                    preferred_exit,
                });
            }
        }
        Command::SpawnEnemy { kind, cell } => {
            if !world.grid.view().is_walkable(cell) {
                return;
            }
            let id = world.allocate_enemy_id();
            let preferred_exit = world.choose_exit();
            let difficulty = world.difficulty;
            let health = scaled_stat(kind.base_health(), difficulty.enemy_health);
            let speed = scaled_stat(kind.base_speed(), difficulty.enemy_speed);
            let position = world.grid.grid_to_world(cell);
            world.enemies.push(Enemy {
                id,
                kind,
                element: kind.element(),
                position,
                health,
                max_health: health,
                base_speed: speed,
                effects: Vec::new(),
                waypoints: Vec::new(),
                cursor: 0,
                path_pending: true,
                last_planned: world.clock,
                preferred_exit,
                arrived: false,
                death: None,
            });
            out_events.push(Event::EnemySpawned { enemy: id, kind, cell });
            out_events.push(Event::PathRequested {
                enemy: id,
                from: cell,
                preferred_exit,
            });
        }
        Command::AssignPath {
            enemy,
            cells,
            fallback,
        } => {
            let clock = world.clock;
            let current_cell = |grid: &grid::Grid, position: Vec2| grid.world_to_grid(position).cell;
            let Some(target) = world
                .enemies
                .iter_mut()
                .find(|candidate| candidate.id == enemy)
            else {
                debug!(enemy = enemy.get(), "discarding path for missing enemy");
                return;
            };
            if !target.is_live() {
                // Stale continuation: the enemy died or arrived while the
                // computation was outstanding.
                target.path_pending = false;
                debug!(enemy = enemy.get(), "discarding stale path result");
                return;
            }

            target.path_pending = false;
            target.last_planned = clock;
            let occupied = current_cell(&world.grid, target.position);
            let skip_leading = cells.first().copied() == Some(occupied);
            target.waypoints = cells
                .iter()
                .skip(usize::from(skip_leading))
                .map(|cell| world.grid.grid_to_world(*cell))
                .collect();
            target.cursor = 0;
            out_events.push(Event::PathAssigned {
                enemy,
                length: target.waypoints.len(),
                fallback,
            });
        }
        Command::FireProjectile { tower, target } => {
            let now = world.clock;
            let empowerment = world.empowerment_multiplier();
            let ready = world
                .towers
                .get(&tower)
                .is_some_and(|state| state.can_fire(now, empowerment));
            if !ready {
                return;
            }
            let target_live = world
                .enemies
                .iter()
                .any(|enemy| enemy.id == target && enemy.is_live());
            if !target_live {
                return;
            }

            if let Some(state) = world.towers.get_mut(&tower) {
                state.last_fired = Some(now);
            }
            world.fire_projectile(tower, target, out_events);

            let double_chance = world
                .towers
                .get(&tower)
                .map_or(0.0, |state| state.kind.double_shot_chance());
            if world.rng.next_f32() < double_chance {
                world.pending_shots.push(PendingShot {
                    due: now.saturating_add(DOUBLE_SHOT_DELAY),
                    tower,
                    target,
                });
            }
        }
        Command::AdvanceEnemies { dt } => {
            advance_enemies(world, dt, out_events);
        }
        Command::AdvanceProjectiles { dt } => {
            advance_projectiles(world, dt, out_events);
        }
        Command::Reap => {
            for enemy in world
                .enemies
                .iter()
                .filter(|enemy| !enemy.is_live())
            {
                out_events.push(Event::EnemyRemoved { enemy: enemy.id });
            }
            world.enemies.retain(Enemy::is_live);
            world.projectiles.retain(|projectile| projectile.resolved.is_none());
        }
        Command::PlaceTower { kind, cell } => {
            let enemies = query::enemy_view(world);
            match emberspire_system_placement::validate(world.grid.view(), &enemies, cell) {
                Ok(()) => {
                    world.grid.set_cell(cell, CellState::Obstacle);
                    let id = world.allocate_tower_id();
                    let position = world.grid.grid_to_world(cell);
                    let _ = world.towers.insert(
                        id,
                        Tower {
                            id,
                            kind,
                            cell,
                            position,
                            last_fired: None,
                            buffs: Vec::new(),
                        },
                    );
                    world.gold = world.gold.saturating_sub(kind.cost());
                    out_events.push(Event::TowerPlaced {
                        tower: id,
                        kind,
                        cell,
                    });
                    world.invalidate_paths(out_events);
                }
                Err(reason) => {
                    out_events.push(Event::TowerPlacementRejected { kind, cell, reason });
                }
            }
        }
        Command::RemoveTower { tower } => match world.towers.remove(&tower) {
            Some(state) => {
                world.grid.set_cell(state.cell, CellState::Walkable);
                out_events.push(Event::TowerRemoved {
                    tower,
                    cell: state.cell,
                });
                world.invalidate_paths(out_events);
            }
            None => {
                out_events.push(Event::TowerRemovalRejected {
                    tower,
                    reason: RemovalError::MissingTower,
                });
            }
        },
        Command::BuffTower {
            tower,
            kind,
            multiplier,
            duration,
        } => {
            if let Some(state) = world.towers.get_mut(&tower) {
                state.apply_buff(kind, multiplier, duration);
                out_events.push(Event::TowerBuffed { tower, kind });
            }
        }
        Command::Empower {
            multiplier,
            duration,
        } => {
            world.empowerment = Some(Empowerment {
                multiplier: if multiplier.is_finite() && multiplier > 0.0 {
                    multiplier
                } else {
                    1.0
                },
                remaining: duration,
            });
        }
    }
}

fn advance_enemies(world: &mut World, dt: Duration, out_events: &mut Vec<Event>) {
    let difficulty = world.difficulty;
    let arrival = world.grid.arrival_threshold();
    let mut requests = Vec::new();

    for enemy in world.enemies.iter_mut() {
        if !enemy.is_live() {
            continue;
        }

        tick_status_effects(enemy, dt, difficulty, &mut world.gold, out_events);
        if !enemy.is_live() {
            continue;
        }

        let mut travel = enemy.effective_speed() * dt.as_secs_f32();
        while travel > 0.0 && enemy.cursor < enemy.waypoints.len() {
            let target = enemy.waypoints[enemy.cursor];
            let delta = target - enemy.position;
            let distance = delta.length();
            if distance <= WAYPOINT_EPSILON {
                enemy.cursor += 1;
                continue;
            }
            if travel >= distance {
                enemy.position = target;
                travel -= distance;
                enemy.cursor += 1;
            } else {
                enemy.position += delta / distance * travel;
                travel = 0.0;
            }
        }

        // Defensive invariant, independent of pathfinding correctness.
        enemy.position = world.grid.clamp_world(enemy.position);

        if enemy.position.y > arrival {
            enemy.arrived = true;
            out_events.push(Event::EnemyArrived { enemy: enemy.id });
            continue;
        }

        if enemy.cursor >= enemy.waypoints.len() && !enemy.path_pending {
            enemy.path_pending = true;
            requests.push((enemy.id, enemy.position, enemy.preferred_exit));
        }
    }

    for (enemy, position, preferred_exit) in requests {
        out_events.push(Event::PathRequested {
            enemy,
            from: world.grid.world_to_grid(position).cell,
            preferred_exit,
        });
    }
}

fn tick_status_effects(
    enemy: &mut Enemy,
    dt: Duration,
    difficulty: DifficultyConfig,
    gold: &mut u32,
    out_events: &mut Vec<Event>,
) {
    let mut burn_damage = 0.0f32;
    // Weaken multiplies all damage taken, burn ticks included.
    let weaken = enemy.weaken_multiplier();

    for active in enemy.effects.iter_mut() {
        let lived = dt.min(active.remaining);
        active.remaining = active.remaining.saturating_sub(dt);

        if let StatusEffect::Burn { damage_per_second } = active.effect {
            active.tick = active.tick.saturating_add(lived);
            while active.tick >= BURN_TICK_INTERVAL {
                active.tick -= BURN_TICK_INTERVAL;
                burn_damage += damage_per_second * BURN_TICK_INTERVAL.as_secs_f32();
            }
        }
    }
    enemy.effects.retain(|active| !active.remaining.is_zero());

    if burn_damage > 0.0 {
        apply_damage(
            enemy,
            burn_damage * weaken,
            DeathCause::Burn,
            difficulty,
            gold,
            out_events,
        );
    }
}

fn advance_projectiles(world: &mut World, dt: Duration, out_events: &mut Vec<Event>) {
    let difficulty = world.difficulty;
    let step = PROJECTILE_SPEED * dt.as_secs_f32();

    for index in 0..world.projectiles.len() {
        if world.projectiles[index].resolved.is_some() {
            continue;
        }

        let (target_position, target_live) = {
            let target = world.projectiles[index].target;
            match world.enemies.iter().find(|enemy| enemy.id == target) {
                Some(enemy) if enemy.is_live() => (enemy.position, true),
                _ => (Vec2::ZERO, false),
            }
        };

        let projectile = &mut world.projectiles[index];
        if !target_live {
            projectile.resolved = Some(ProjectileOutcome::TargetLost);
            out_events.push(Event::ProjectileResolved {
                projectile: projectile.id,
                outcome: ProjectileOutcome::TargetLost,
            });
            continue;
        }

        projectile.remaining = projectile.remaining.saturating_sub(dt);
        if projectile.remaining.is_zero() {
            projectile.resolved = Some(ProjectileOutcome::Expired);
            out_events.push(Event::ProjectileResolved {
                projectile: projectile.id,
                outcome: ProjectileOutcome::Expired,
            });
            continue;
        }

        let delta = target_position - projectile.position;
        let distance = delta.length();
        if distance > IMPACT_RADIUS && step < distance {
            projectile.position += delta / distance * step;
        } else {
            projectile.position = target_position;
        }

        if world.grid.out_of_bounds(projectile.position) {
            projectile.resolved = Some(ProjectileOutcome::OutOfBounds);
            out_events.push(Event::ProjectileResolved {
                projectile: projectile.id,
                outcome: ProjectileOutcome::OutOfBounds,
            });
            continue;
        }

        if projectile.position.distance(target_position) <= IMPACT_RADIUS {
            resolve_impact(world, index, difficulty, out_events);
        }
    }
}

fn resolve_impact(
    world: &mut World,
    projectile_index: usize,
    difficulty: DifficultyConfig,
    out_events: &mut Vec<Event>,
) {
    let (id, kind, impact_point, target, base_damage) = {
        let projectile = &world.projectiles[projectile_index];
        (
            projectile.id,
            projectile.kind,
            projectile.position,
            projectile.target,
            projectile.damage,
        )
    };
    let element = kind.element();

    let crit = element == Element::Ember && world.rng.next_f32() < EMBER_CRIT_CHANCE;
    let crit_multiplier = if crit { EMBER_CRIT_MULTIPLIER } else { 1.0 };
    let apply_effect = world.rng.next_f32() < kind.on_hit_chance();

    match kind.blast_radius() {
        Some(radius) => {
            // Area damage falls off linearly from the blast center and is
            // applied to every enemy inside the radius independently.
            for enemy in world.enemies.iter_mut() {
                if !enemy.is_live() {
                    continue;
                }
                let distance = enemy.position.distance(impact_point);
                if distance > radius {
                    continue;
                }
                let falloff = 1.0 - distance / radius;
                let amount = base_damage
                    * falloff
                    * crit_multiplier
                    * element.advantage_multiplier(enemy.element)
                    * enemy.weaken_multiplier();
                apply_damage(
                    enemy,
                    amount,
                    DeathCause::Impact(element),
                    difficulty,
                    &mut world.gold,
                    out_events,
                );
            }
        }
        None => {
            if let Some(enemy) = world
                .enemies
                .iter_mut()
                .find(|enemy| enemy.id == target && enemy.is_live())
            {
                let amount = base_damage
                    * crit_multiplier
                    * element.advantage_multiplier(enemy.element)
                    * enemy.weaken_multiplier();
                apply_damage(
                    enemy,
                    amount,
                    DeathCause::Impact(element),
                    difficulty,
                    &mut world.gold,
                    out_events,
                );
            }
        }
    }

    if apply_effect {
        if let Some(effect) = kind.on_hit_effect() {
            if let Some(enemy) = world
                .enemies
                .iter_mut()
                .find(|enemy| enemy.id == target && enemy.is_live())
            {
                enemy.apply_effect(effect, kind.on_hit_duration());
            }
        }
    }

    let projectile = &mut world.projectiles[projectile_index];
    projectile.resolved = Some(ProjectileOutcome::Impact);
    out_events.push(Event::ProjectileResolved {
        projectile: id,
        outcome: ProjectileOutcome::Impact,
    });
}

fn apply_damage(
    enemy: &mut Enemy,
    amount: f32,
    cause: DeathCause,
    difficulty: DifficultyConfig,
    gold: &mut u32,
    out_events: &mut Vec<Event>,
) {
    if amount <= 0.0 || !amount.is_finite() {
        return;
    }
    enemy.health -= amount;
    out_events.push(Event::EnemyDamaged {
        enemy: enemy.id,
        amount,
        remaining: enemy.health.max(0.0),
    });

    if enemy.health <= 0.0 {
        enemy.death = Some(cause);
        let base = enemy.kind.bounty();
        let bounty = clamp_reward(base as f32 * difficulty.gold, base);
        *gold = gold.saturating_add(bounty);
        out_events.push(Event::EnemyDied {
            enemy: enemy.id,
            cause,
            bounty,
        });
        out_events.push(Event::GoldAwarded {
            amount: bounty,
            total: *gold,
        });
    }
}

fn scaled_stat(base: f32, multiplier: f32) -> f32 {
    let scaled = base * multiplier;
    if scaled.is_finite() && scaled > 0.0 {
        scaled
    } else {
        base
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::{grid, World};
    use emberspire_core::{
        CellCoord, EnemySnapshot, EnemyView, GridView, ProjectileSnapshot, ProjectileView,
        TowerId, TowerSnapshot, TowerView,
    };
    use glam::Vec2;
    use std::time::Duration;

    /// Exposes a read-only view of the dense walkability grid.
    #[must_use]
    pub fn grid_view(world: &World) -> GridView<'_> {
        world.grid.view()
    }

    /// Simulated time elapsed since the world was created.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }

    /// Gold currently held by the player.
    #[must_use]
    pub fn gold(world: &World) -> u32 {
        world.gold
    }

    /// Captures a read-only view of every enemy, sorted by identifier.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        let snapshots: Vec<EnemySnapshot> = world
            .enemies
            .iter()
            .map(|enemy| EnemySnapshot {
                id: enemy.id,
                kind: enemy.kind,
                element: enemy.element,
                cell: world.grid.world_to_grid(enemy.position).cell,
                position: enemy.position,
                health: enemy.health.max(0.0),
                max_health: enemy.max_health,
                effective_speed: enemy.effective_speed(),
                arrived: enemy.arrived,
                path_pending: enemy.path_pending,
                waypoints_remaining: enemy.waypoints.len().saturating_sub(enemy.cursor),
                active_effects: enemy
                    .effects
                    .iter()
                    .map(|active| active.effect.kind())
                    .collect(),
            })
            .collect();
        EnemyView::from_snapshots(snapshots)
    }

    /// Captures a read-only view of every tower, sorted by identifier.
    #[must_use]
    pub fn tower_view(world: &World) -> TowerView {
        let now = world.clock;
        let empowerment = world.empowerment_multiplier();
        let snapshots: Vec<TowerSnapshot> = world
            .towers
            .values()
            .map(|tower| TowerSnapshot {
                id: tower.id,
                kind: tower.kind,
                cell: tower.cell,
                position: tower.position,
                ready_in: tower.ready_in(now, empowerment),
            })
            .collect();
        TowerView::from_snapshots(snapshots)
    }

    /// Captures a read-only view of every in-flight projectile.
    #[must_use]
    pub fn projectile_view(world: &World) -> ProjectileView {
        let snapshots: Vec<ProjectileSnapshot> = world
            .projectiles
            .iter()
            .filter(|projectile| projectile.resolved.is_none())
            .map(|projectile| ProjectileSnapshot {
                id: projectile.id,
                position: projectile.position,
                target: projectile.target,
                element: projectile.kind.element(),
            })
            .collect();
        ProjectileView::from_snapshots(snapshots)
    }

    /// Returns the tower occupying the provided cell, if any.
    #[must_use]
    pub fn tower_at(world: &World, cell: CellCoord) -> Option<TowerId> {
        world
            .towers
            .values()
            .find(|tower| tower.cell == cell)
            .map(|tower| tower.id)
    }

    /// Enumerates the walkable entry-band cells enemies may spawn on.
    #[must_use]
    pub fn spawn_cells(world: &World) -> Vec<CellCoord> {
        let view = world.grid.view();
        view.entry_cells().filter(|cell| view.is_walkable(*cell)).collect()
    }

    /// Remaining world-space waypoints of an enemy's planned path.
    ///
    /// Development aid for path visualization; `None` when the enemy is gone.
    #[must_use]
    pub fn planned_path(world: &World, enemy: emberspire_core::EnemyId) -> Option<Vec<Vec2>> {
        world
            .enemies
            .iter()
            .find(|candidate| candidate.id == enemy)
            .map(|candidate| candidate.waypoints[candidate.cursor.min(candidate.waypoints.len())..].to_vec())
    }

    /// Converts a world-space point to its nearest grid cell.
    #[must_use]
    pub fn locate(world: &World, point: Vec2) -> grid::ClampedCell {
        world.grid.world_to_grid(point)
    }
}

#[derive(Clone, Debug)]
struct Enemy {
    id: EnemyId,
    kind: EnemyKind,
    element: Element,
    position: Vec2,
    health: f32,
    max_health: f32,
    base_speed: f32,
    effects: Vec<ActiveEffect>,
    waypoints: Vec<Vec2>,
    cursor: usize,
    path_pending: bool,
    last_planned: Duration,
    preferred_exit: CellCoord,
    arrived: bool,
    death: Option<DeathCause>,
}

impl Enemy {
    fn is_live(&self) -> bool {
        self.death.is_none() && !self.arrived
    }

    /// Base speed with every active slow folded in multiplicatively.
    fn effective_speed(&self) -> f32 {
        let mut speed = self.base_speed;
        for active in &self.effects {
            if let StatusEffect::Slow { multiplier } = active.effect {
                speed *= multiplier;
            }
        }
        speed
    }

    /// Damage-taken multiplier from every active weaken effect.
    fn weaken_multiplier(&self) -> f32 {
        let mut multiplier = 1.0;
        for active in &self.effects {
            if let StatusEffect::Weaken {
                multiplier: weaken, ..
            } = active.effect
            {
                multiplier *= weaken;
            }
        }
        multiplier
    }

    /// Applies a status effect, refreshing the duration when an effect of the
    /// same kind is already active instead of stacking a second instance.
    fn apply_effect(&mut self, effect: StatusEffect, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        let kind = effect.kind();
        if let Some(existing) = self
            .effects
            .iter_mut()
            .find(|active| active.effect.kind() == kind)
        {
            existing.effect = effect;
            existing.remaining = duration;
            return;
        }
        self.effects.push(ActiveEffect {
            effect,
            remaining: duration,
            tick: Duration::ZERO,
        });
    }
}

#[derive(Clone, Copy, Debug)]
struct ActiveEffect {
    effect: StatusEffect,
    remaining: Duration,
    tick: Duration,
}

#[derive(Clone, Debug)]
struct Tower {
    id: TowerId,
    kind: TowerKind,
    cell: CellCoord,
    position: Vec2,
    last_fired: Option<Duration>,
    buffs: Vec<TowerBuffState>,
}

impl Tower {
    fn effective_fire_rate(&self, empowerment: f32) -> f32 {
        let mut rate = self.kind.fire_rate() * empowerment;
        for buff in &self.buffs {
            if buff.kind == TowerBuffKind::Haste {
                rate *= buff.multiplier;
            }
        }
        rate
    }

    fn damage_multiplier(&self) -> f32 {
        let mut multiplier = 1.0;
        for buff in &self.buffs {
            if buff.kind == TowerBuffKind::Damage {
                multiplier *= buff.multiplier;
            }
        }
        multiplier
    }

    /// Cooldown gate: firing is monotonic against `1 / effective_fire_rate`.
    fn can_fire(&self, now: Duration, empowerment: f32) -> bool {
        self.ready_in(now, empowerment).is_zero()
    }

    fn ready_in(&self, now: Duration, empowerment: f32) -> Duration {
        let Some(last) = self.last_fired else {
            return Duration::ZERO;
        };
        let rate = self.effective_fire_rate(empowerment);
        if !rate.is_finite() || rate <= 0.0 {
            return Duration::MAX;
        }
        let cooldown = Duration::from_secs_f32(1.0 / rate);
        cooldown.saturating_sub(now.saturating_sub(last))
    }

    fn apply_buff(&mut self, kind: TowerBuffKind, multiplier: f32, duration: Duration) {
        if !multiplier.is_finite() || multiplier <= 0.0 || duration.is_zero() {
            return;
        }
        if let Some(existing) = self.buffs.iter_mut().find(|buff| buff.kind == kind) {
            existing.multiplier = multiplier;
            existing.remaining = duration;
            return;
        }
        self.buffs.push(TowerBuffState {
            kind,
            multiplier,
            remaining: duration,
        });
    }
}

#[derive(Clone, Copy, Debug)]
struct TowerBuffState {
    kind: TowerBuffKind,
    multiplier: f32,
    remaining: Duration,
}

#[derive(Clone, Debug)]
struct Projectile {
    id: ProjectileId,
    kind: TowerKind,
    position: Vec2,
    target: EnemyId,
    damage: f32,
    remaining: Duration,
    resolved: Option<ProjectileOutcome>,
}

#[derive(Clone, Copy, Debug)]
struct PendingShot {
    due: Duration,
    tower: TowerId,
    target: EnemyId,
}

#[derive(Clone, Copy, Debug)]
struct Empowerment {
    multiplier: f32,
    remaining: Duration,
}

/// SplitMix64 stream used for exit selection and combat rolls.
#[derive(Clone, Copy, Debug)]
struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    const fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    /// Uniform sample in `[0, 1)`.
    fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn(world: &mut World, kind: EnemyKind, cell: CellCoord) -> EnemyId {
        let mut events = Vec::new();
        apply(world, Command::SpawnEnemy { kind, cell }, &mut events);
        match events.first() {
            Some(Event::EnemySpawned { enemy, .. }) => *enemy,
            other => panic!("expected spawn event, got {other:?}"),
        }
    }

    fn assign_straight_path(world: &mut World, enemy: EnemyId) {
        let view = query::enemy_view(world);
        let snapshot = view
            .iter()
            .find(|candidate| candidate.id == enemy)
            .expect("enemy")
            .clone();
        let (_, rows) = query::grid_view(world).dimensions();
        let cells: Vec<CellCoord> = (snapshot.cell.row()..rows)
            .map(|row| CellCoord::new(snapshot.cell.column(), row))
            .collect();
        let mut events = Vec::new();
        apply(
            world,
            Command::AssignPath {
                enemy,
                cells,
                fallback: false,
            },
            &mut events,
        );
    }

    #[test]
    fn spawn_emits_path_request_with_in_flight_guard() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnEnemy {
                kind: EnemyKind::Mite,
                cell: CellCoord::new(7, 0),
            },
            &mut events,
        );

        assert!(matches!(events[0], Event::EnemySpawned { .. }));
        assert!(matches!(events[1], Event::PathRequested { .. }));

        // No second request while the first is outstanding.
        events.clear();
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_secs(5),
            },
            &mut events,
        );
        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::PathRequested { .. })));
    }

    #[test]
    fn periodic_replan_fires_once_the_interval_elapses() {
        let mut world = World::new();
        let enemy = spawn(&mut world, EnemyKind::Mite, CellCoord::new(7, 0));
        assign_straight_path(&mut world, enemy);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(1900),
            },
            &mut events,
        );
        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::PathRequested { .. })));

        events.clear();
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(200),
            },
            &mut events,
        );
        let requests = events
            .iter()
            .filter(|event| matches!(event, Event::PathRequested { enemy: id, .. } if *id == enemy))
            .count();
        assert_eq!(requests, 1);
    }

    #[test]
    fn slow_refreshes_instead_of_stacking() {
        let mut world = World::new();
        let enemy = spawn(&mut world, EnemyKind::Brute, CellCoord::new(7, 0));

        let base = EnemyKind::Brute.base_speed();
        {
            let state = world.enemies.iter_mut().find(|e| e.id == enemy).unwrap();
            state.apply_effect(StatusEffect::Slow { multiplier: 0.6 }, Duration::from_secs(2));
            state.apply_effect(StatusEffect::Slow { multiplier: 0.6 }, Duration::from_secs(2));
            assert_eq!(state.effects.len(), 1);
            assert!((state.effective_speed() - base * 0.6).abs() < 1e-6);
            assert_eq!(state.effects[0].remaining, Duration::from_secs(2));
        }
    }

    #[test]
    fn burn_ticks_damage_on_sub_interval() {
        let mut world = World::new();
        let enemy = spawn(&mut world, EnemyKind::Brute, CellCoord::new(7, 0));
        {
            let state = world.enemies.iter_mut().find(|e| e.id == enemy).unwrap();
            state.apply_effect(
                StatusEffect::Burn {
                    damage_per_second: 4.0,
                },
                Duration::from_secs(2),
            );
        }

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::AdvanceEnemies {
                dt: Duration::from_secs(1),
            },
            &mut events,
        );

        let damaged = events.iter().find_map(|event| match event {
            Event::EnemyDamaged { amount, .. } => Some(*amount),
            _ => None,
        });
        // Two half-second ticks at 4 dps.
        assert!((damaged.expect("burn damage") - 4.0).abs() < 1e-6);
    }

    #[test]
    fn weaken_amplifies_burn_ticks() {
        let mut world = World::new();
        let enemy = spawn(&mut world, EnemyKind::Brute, CellCoord::new(7, 0));
        {
            let state = world.enemies.iter_mut().find(|e| e.id == enemy).unwrap();
            state.apply_effect(
                StatusEffect::Burn {
                    damage_per_second: 4.0,
                },
                Duration::from_secs(2),
            );
            state.apply_effect(StatusEffect::Weaken { multiplier: 1.3 }, Duration::from_secs(2));
        }

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::AdvanceEnemies {
                dt: Duration::from_secs(1),
            },
            &mut events,
        );

        let damaged = events.iter().find_map(|event| match event {
            Event::EnemyDamaged { amount, .. } => Some(*amount),
            _ => None,
        });
        assert!((damaged.expect("burn damage") - 4.0 * 1.3).abs() < 1e-5);
    }

    #[test]
    fn stale_path_result_is_discarded() {
        let mut world = World::new();
        let enemy = spawn(&mut world, EnemyKind::Mite, CellCoord::new(7, 0));
        {
            let state = world.enemies.iter_mut().find(|e| e.id == enemy).unwrap();
            state.death = Some(DeathCause::Burn);
        }

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::AssignPath {
                enemy,
                cells: vec![CellCoord::new(7, 0), CellCoord::new(7, 1)],
                fallback: false,
            },
            &mut events,
        );
        assert!(events.is_empty());
    }

    #[test]
    fn enemy_advances_toward_exit_and_arrives() {
        let mut world = World::new();
        let enemy = spawn(&mut world, EnemyKind::Wisp, CellCoord::new(7, 0));
        assign_straight_path(&mut world, enemy);

        let mut events = Vec::new();
        let mut last_z = f32::MIN;
        for _ in 0..400 {
            apply(
                &mut world,
                Command::AdvanceEnemies {
                    dt: Duration::from_millis(100),
                },
                &mut events,
            );
            let view = query::enemy_view(&world);
            let Some(snapshot) = view.iter().find(|candidate| candidate.id == enemy) else {
                break;
            };
            assert!(snapshot.position.y >= last_z - 1e-4, "z must not regress");
            last_z = snapshot.position.y;
            if snapshot.arrived {
                break;
            }
        }

        assert!(events
            .iter()
            .any(|event| matches!(event, Event::EnemyArrived { .. })));
    }

    #[test]
    fn fire_rate_gates_consecutive_shots() {
        let mut world = World::new();
        let enemy = spawn(&mut world, EnemyKind::Brute, CellCoord::new(7, 0));

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Frostspire,
                cell: CellCoord::new(6, 1),
            },
            &mut events,
        );
        let tower = events
            .iter()
            .find_map(|event| match event {
                Event::TowerPlaced { tower, .. } => Some(*tower),
                _ => None,
            })
            .expect("tower placed");

        events.clear();
        apply(
            &mut world,
            Command::FireProjectile { tower, target: enemy },
            &mut events,
        );
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::ProjectileSpawned { .. })));

        // 999 ms later the cooldown (fire rate 1.0) must still gate the shot.
        events.clear();
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(999),
            },
            &mut events,
        );
        events.clear();
        apply(
            &mut world,
            Command::FireProjectile { tower, target: enemy },
            &mut events,
        );
        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::ProjectileSpawned { .. })));

        // At 1000 ms the tower may fire again.
        events.clear();
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(1),
            },
            &mut events,
        );
        events.clear();
        apply(
            &mut world,
            Command::FireProjectile { tower, target: enemy },
            &mut events,
        );
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::ProjectileSpawned { .. })));
    }

    #[test]
    fn tower_placement_mutates_grid_and_forces_replans() {
        let mut world = World::new();
        let enemy = spawn(&mut world, EnemyKind::Mite, CellCoord::new(7, 0));
        assign_straight_path(&mut world, enemy);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Stonewarden,
                cell: CellCoord::new(7, 5),
            },
            &mut events,
        );

        assert!(events
            .iter()
            .any(|event| matches!(event, Event::TowerPlaced { .. })));
        assert!(events.iter().any(|event| matches!(
            event,
            Event::PathRequested { enemy: requested, .. } if *requested == enemy
        )));
        assert_eq!(
            query::grid_view(&world).state(CellCoord::new(7, 5)),
            Some(CellState::Obstacle)
        );
    }

    #[test]
    fn restricted_zone_placement_is_rejected_without_mutation() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Flamecaster,
                cell: CellCoord::new(7, 24),
            },
            &mut events,
        );

        assert!(events.iter().any(|event| matches!(
            event,
            Event::TowerPlacementRejected {
                reason: emberspire_core::PlacementError::Restricted,
                ..
            }
        )));
        assert_eq!(
            query::grid_view(&world).state(CellCoord::new(7, 24)),
            Some(CellState::Walkable)
        );
    }

    #[test]
    fn removal_reverts_cell_and_requests_replans() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Venomspit,
                cell: CellCoord::new(3, 4),
            },
            &mut events,
        );
        let tower = events
            .iter()
            .find_map(|event| match event {
                Event::TowerPlaced { tower, .. } => Some(*tower),
                _ => None,
            })
            .expect("tower placed");

        events.clear();
        apply(&mut world, Command::RemoveTower { tower }, &mut events);
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::TowerRemoved { .. })));
        assert_eq!(
            query::grid_view(&world).state(CellCoord::new(3, 4)),
            Some(CellState::Walkable)
        );
    }

    #[test]
    fn reap_releases_dead_and_arrived_enemies() {
        let mut world = World::new();
        let dead = spawn(&mut world, EnemyKind::Mite, CellCoord::new(3, 0));
        let arrived = spawn(&mut world, EnemyKind::Mite, CellCoord::new(4, 0));
        {
            let state = world.enemies.iter_mut().find(|e| e.id == dead).unwrap();
            state.death = Some(DeathCause::Burn);
            let state = world.enemies.iter_mut().find(|e| e.id == arrived).unwrap();
            state.arrived = true;
        }

        let mut events = Vec::new();
        apply(&mut world, Command::Reap, &mut events);
        assert_eq!(
            events
                .iter()
                .filter(|event| matches!(event, Event::EnemyRemoved { .. }))
                .count(),
            2
        );
        assert!(world.enemies.is_empty());
    }

    #[test]
    fn configure_grid_clears_entities_and_resizes() {
        let mut world = World::new();
        let _ = spawn(&mut world, EnemyKind::Mite, CellCoord::new(7, 0));

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ConfigureGrid {
                columns: 9,
                rows: 12,
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![Event::GridConfigured {
                columns: 9,
                rows: 12
            }]
        );
        assert_eq!(query::grid_view(&world).dimensions(), (9, 12));
        assert!(query::enemy_view(&world).iter().next().is_none());
    }

    #[test]
    fn splitmix_stream_is_deterministic() {
        let mut first = SplitMix64::new(42);
        let mut second = SplitMix64::new(42);
        for _ in 0..16 {
            assert_eq!(first.next_u64(), second.next_u64());
        }
    }
}
