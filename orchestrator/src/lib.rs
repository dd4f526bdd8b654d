#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fixed-order frame driver.
//!
//! A [`Session`] owns the world plus every pure system and executes one frame
//! at a time in a strict phase order: timers, tower fire decisions, enemy
//! advancement, projectile advancement, reaping, then queued grid mutations
//! and the path planning they force. Player input never mutates the world
//! mid-frame; it is queued and applied at the mutation phase, so two frames
//! with the same inputs always produce the same event stream.

use std::time::Duration;

use emberspire_core::{CellCoord, Command, EnemyKind, Event, TowerId, TowerKind, WaveId};
use emberspire_system_combat::Combat;
use emberspire_system_pathing::{Pathing, SearchBudget};
use emberspire_system_waves::Waves;
use emberspire_world::{query, World};
use tracing::debug;

/// Construction inputs for a [`Session`], as plain data.
#[derive(Clone, Copy, Debug, Default)]
pub struct SessionConfig {
    /// World construction parameters.
    pub world: emberspire_world::Config,
    /// Wave scheduler parameters; `None` disables automatic waves.
    pub waves: Option<emberspire_system_waves::Config>,
}

/// Owns the world and systems and advances them one frame at a time.
#[derive(Debug)]
pub struct Session {
    world: World,
    pathing: Pathing,
    combat: Combat,
    waves: Option<Waves>,
    queued: Vec<Command>,
    events: Vec<Event>,
    frame: u64,
}

impl Session {
    /// Creates a session from the provided configuration.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            world: World::with_config(config.world),
            pathing: Pathing::new(SearchBudget::default()),
            combat: Combat::new(),
            waves: config.waves.map(Waves::new),
            queued: Vec::new(),
            events: Vec::new(),
            frame: 0,
        }
    }

    /// Queues a tower placement for the next mutation phase.
    pub fn place_tower(&mut self, kind: TowerKind, cell: CellCoord) {
        self.queued.push(Command::PlaceTower { kind, cell });
    }

    /// Queues a tower removal for the next mutation phase.
    pub fn remove_tower(&mut self, tower: TowerId) {
        self.queued.push(Command::RemoveTower { tower });
    }

    /// Queues a global empowerment for the next mutation phase.
    pub fn empower(&mut self, multiplier: f32, duration: Duration) {
        self.queued.push(Command::Empower {
            multiplier,
            duration,
        });
    }

    /// Queues a single-tower buff for the next mutation phase.
    pub fn buff_tower(
        &mut self,
        tower: TowerId,
        kind: emberspire_core::TowerBuffKind,
        multiplier: f32,
        duration: Duration,
    ) {
        self.queued.push(Command::BuffTower {
            tower,
            kind,
            multiplier,
            duration,
        });
    }

    /// Development hook: spawns one enemy on demand through the normal
    /// lifecycle.
    pub fn debug_spawn_enemy(&mut self, kind: EnemyKind, cell: CellCoord) {
        self.queued.push(Command::SpawnEnemy { kind, cell });
    }

    /// Development hook: the wave scheduler skips ahead to the given wave.
    pub fn debug_jump_to_wave(&mut self, wave: u32) {
        if let Some(waves) = self.waves.as_mut() {
            waves.jump_to(wave);
        }
    }

    /// Development hook: stops spawning the current wave immediately.
    pub fn debug_complete_wave(&mut self) {
        if let Some(waves) = self.waves.as_mut() {
            waves.complete_current();
        }
    }

    /// Wave currently scheduled, when automatic waves are enabled.
    #[must_use]
    pub fn current_wave(&self) -> Option<WaveId> {
        self.waves.as_ref().map(Waves::current_wave)
    }

    /// Read-only access to the authoritative world, for snapshot queries.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Events broadcast during the most recent frame.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Advances the simulation by one frame of `dt` simulated time.
    ///
    /// Returns the events broadcast during the frame.
    pub fn frame(&mut self, dt: Duration) -> &[Event] {
        self.frame += 1;
        let mut events = Vec::new();
        let mut commands = Vec::new();

        // Phase 1: clock and global timers.
        emberspire_world::apply(&mut self.world, Command::Tick { dt }, &mut events);

        // Phase 2: wave scheduling, fed last frame's event stream.
        if let Some(waves) = self.waves.as_mut() {
            let spawn_cells = query::spawn_cells(&self.world);
            waves.handle(dt, &self.events, &spawn_cells, &mut commands, &mut events);
            for command in commands.drain(..) {
                emberspire_world::apply(&mut self.world, command, &mut events);
            }
        }

        // Phase 3: towers decide targets and fire.
        {
            let towers = query::tower_view(&self.world);
            let enemies = query::enemy_view(&self.world);
            self.combat.handle(&towers, &enemies, &mut commands);
        }
        for command in commands.drain(..) {
            emberspire_world::apply(&mut self.world, command, &mut events);
        }

        // Phases 4 and 5: entity advancement.
        emberspire_world::apply(&mut self.world, Command::AdvanceEnemies { dt }, &mut events);
        emberspire_world::apply(
            &mut self.world,
            Command::AdvanceProjectiles { dt },
            &mut events,
        );

        // Phase 6: release dead, arrived, and resolved entities.
        emberspire_world::apply(&mut self.world, Command::Reap, &mut events);

        // Phase 7: queued grid mutations; invalid requests reject without
        // mutating, valid ones force replans.
        for command in std::mem::take(&mut self.queued) {
            emberspire_world::apply(&mut self.world, command, &mut events);
        }

        // Phase 8: answer every path request raised this frame.
        {
            let grid = query::grid_view(&self.world);
            self.pathing.handle(&events, grid, &mut commands);
        }
        if !commands.is_empty() {
            debug!(frame = self.frame, paths = commands.len(), "assigning planned paths");
        }
        for command in commands.drain(..) {
            emberspire_world::apply(&mut self.world, command, &mut events);
        }

        self.events = events;
        &self.events
    }
}
