#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that picks tower targets from world snapshots and emits fire
//! commands.
//!
//! Targeting is deterministic: each tower attacks the nearest live enemy
//! inside its range, breaking distance ties by the lower enemy identifier.
//! Only towers whose cooldown has fully elapsed produce a command; the world
//! re-checks the gate when it executes the command, so a stale snapshot can
//! never make a tower fire early.

use emberspire_core::{Command, EnemyId, EnemySnapshot, EnemyView, TowerView};

/// Tower combat system that reuses a scratch buffer between frames.
#[derive(Debug, Default)]
pub struct Combat {
    candidates: Vec<Candidate>,
}

impl Combat {
    /// Creates a new combat system with an empty scratch buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits one [`Command::FireProjectile`] per ready tower with a target in
    /// range.
    pub fn handle(&mut self, towers: &TowerView, enemies: &EnemyView, out: &mut Vec<Command>) {
        self.candidates.clear();
        self.candidates.extend(
            enemies
                .iter()
                .filter(|enemy| is_targetable(enemy))
                .map(|enemy| Candidate {
                    id: enemy.id,
                    position: (enemy.position.x, enemy.position.y),
                }),
        );
        if self.candidates.is_empty() {
            return;
        }

        for tower in towers.iter() {
            if !tower.ready_in.is_zero() {
                continue;
            }

            let range_sq = tower.kind.range() * tower.kind.range();
            let mut best: Option<Best> = None;
            for candidate in &self.candidates {
                let dx = candidate.position.0 - tower.position.x;
                let dy = candidate.position.1 - tower.position.y;
                let distance_sq = dx * dx + dy * dy;
                if distance_sq > range_sq {
                    continue;
                }
                let current = Best {
                    distance_sq,
                    enemy: candidate.id,
                };
                match &mut best {
                    Some(existing) => {
                        if current.precedes(existing) {
                            *existing = current;
                        }
                    }
                    None => best = Some(current),
                }
            }

            if let Some(target) = best {
                out.push(Command::FireProjectile {
                    tower: tower.id,
                    target: target.enemy,
                });
            }
        }
    }
}

fn is_targetable(enemy: &EnemySnapshot) -> bool {
    !enemy.arrived && enemy.health > 0.0
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    id: EnemyId,
    position: (f32, f32),
}

#[derive(Clone, Copy, Debug)]
struct Best {
    distance_sq: f32,
    enemy: EnemyId,
}

impl Best {
    fn precedes(&self, other: &Self) -> bool {
        if self.distance_sq != other.distance_sq {
            return self.distance_sq < other.distance_sq;
        }
        self.enemy < other.enemy
    }
}
