#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic wave scheduler.
//!
//! Each wave has a spawn quota and a kind mix derived purely from the wave
//! index and a global seed. Spawn timing uses a duration accumulator, spawn
//! cells and enemy kinds are sampled from per-wave SplitMix64 streams whose
//! seeds go through sha256 label derivation, so two runs with the same seed
//! schedule identical waves.

use std::collections::BTreeSet;
use std::time::Duration;

use emberspire_core::{CellCoord, Command, EnemyId, EnemyKind, Event, WaveId};
use sha2::{Digest, Sha256};

const RNG_STREAM_SPAWN_CELLS: &str = "wave/spawn-cells";
const RNG_STREAM_KIND_MIX: &str = "wave/kind-mix";

/// Tuning knobs for the wave scheduler, as plain data.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Seed shared by every per-wave stream.
    pub global_seed: u64,
    /// Spawn quota of the first wave.
    pub base_count: u32,
    /// Additional enemies per subsequent wave.
    pub count_growth: u32,
    /// Simulated time between consecutive spawns within a wave.
    pub spawn_interval: Duration,
    /// Simulated pause between a wave completing and the next one starting.
    pub intermission: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            global_seed: 0,
            base_count: 6,
            count_growth: 3,
            spawn_interval: Duration::from_millis(800),
            intermission: Duration::from_secs(4),
        }
    }
}

/// Wave scheduling system driving enemy spawns across consecutive waves.
#[derive(Debug)]
pub struct Waves {
    config: Config,
    wave: u32,
    state: State,
    spawned: u32,
    quota: u32,
    in_flight: u32,
    live: BTreeSet<EnemyId>,
    accumulator: Duration,
    cell_rng: SplitMix64,
    kind_rng: SplitMix64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Intermission,
    Spawning,
    Draining,
}

impl Waves {
    /// Creates a scheduler that begins its first wave after one intermission.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let mut waves = Self {
            config,
            wave: 0,
            state: State::Intermission,
            spawned: 0,
            quota: 0,
            in_flight: 0,
            live: BTreeSet::new(),
            accumulator: config.intermission,
            cell_rng: SplitMix64::new(0),
            kind_rng: SplitMix64::new(0),
        };
        waves.arm_wave(1);
        waves
    }

    /// Wave currently being scheduled.
    #[must_use]
    pub fn current_wave(&self) -> WaveId {
        WaveId::new(self.wave)
    }

    /// Skips ahead so the given wave is the next to start.
    ///
    /// Enemies already alive keep counting toward the abandoned wave's drain,
    /// so the jump takes effect once the field is clear.
    pub fn jump_to(&mut self, wave: u32) {
        self.arm_wave(wave.max(1));
        self.state = if self.live.is_empty() {
            State::Intermission
        } else {
            State::Draining
        };
        self.accumulator = self.config.intermission;
    }

    /// Stops spawning the current wave immediately and waits for the drain.
    pub fn complete_current(&mut self) {
        if self.state == State::Spawning {
            self.quota = self.spawned;
            self.state = State::Draining;
        }
    }

    /// Advances the scheduler by one frame.
    ///
    /// Consumes spawn and removal events to track wave survivors, emits
    /// [`Command::SpawnEnemy`] while the quota lasts, and announces wave
    /// boundaries through `out_events`.
    pub fn handle(
        &mut self,
        dt: Duration,
        events: &[Event],
        spawn_cells: &[CellCoord],
        out_commands: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) {
        for event in events {
            match event {
                Event::EnemySpawned { enemy, .. } => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    let _ = self.live.insert(*enemy);
                }
                Event::EnemyRemoved { enemy } => {
                    let _ = self.live.remove(enemy);
                }
                _ => {}
            }
        }

        if spawn_cells.is_empty() {
            return;
        }

        match self.state {
            State::Intermission => {
                self.accumulator = self.accumulator.saturating_sub(dt);
                if self.accumulator.is_zero() {
                    self.state = State::Spawning;
                    self.accumulator = Duration::ZERO;
                    out_events.push(Event::WaveStarted {
                        wave: WaveId::new(self.wave),
                    });
                }
            }
            State::Spawning => {
                self.accumulator = self.accumulator.saturating_add(dt);
                while self.spawned < self.quota && self.accumulator >= self.config.spawn_interval {
                    self.accumulator -= self.config.spawn_interval;
                    let cell = spawn_cells
                        [(self.cell_rng.next_u64() % spawn_cells.len() as u64) as usize];
                    let kind = sample_kind(self.wave, &mut self.kind_rng);
                    out_commands.push(Command::SpawnEnemy { kind, cell });
                    self.spawned += 1;
                    self.in_flight += 1;
                }
                if self.spawned >= self.quota {
                    self.state = State::Draining;
                }
            }
            State::Draining => {
                // Spawn commands still in flight keep the wave open.
                if self.in_flight == 0 && self.live.is_empty() {
                    out_events.push(Event::WaveCompleted {
                        wave: WaveId::new(self.wave),
                    });
                    self.arm_wave(self.wave + 1);
                    self.state = State::Intermission;
                    self.accumulator = self.config.intermission;
                }
            }
        }
    }

    fn arm_wave(&mut self, wave: u32) {
        self.wave = wave;
        self.spawned = 0;
        self.in_flight = 0;
        self.quota = self
            .config
            .base_count
            .saturating_add(self.config.count_growth.saturating_mul(wave.saturating_sub(1)));
        let base = derive_wave_seed(self.config.global_seed, wave);
        self.cell_rng = SplitMix64::new(derive_labeled_seed(base, RNG_STREAM_SPAWN_CELLS));
        self.kind_rng = SplitMix64::new(derive_labeled_seed(base, RNG_STREAM_KIND_MIX));
    }
}

/// Weighted kind sample; later waves shift toward the tougher species.
fn sample_kind(wave: u32, rng: &mut SplitMix64) -> EnemyKind {
    let weights = [
        (EnemyKind::Mite, 6),
        (EnemyKind::Wisp, 2 + wave),
        (EnemyKind::Shellback, wave),
        (EnemyKind::Brute, wave / 2),
    ];
    let total: u64 = weights.iter().map(|(_, weight)| u64::from(*weight)).sum();
    let mut roll = rng.next_u64() % total.max(1);
    for (kind, weight) in weights {
        let weight = u64::from(weight);
        if roll < weight {
            return kind;
        }
        roll -= weight;
    }
    EnemyKind::Mite
}

fn derive_wave_seed(global_seed: u64, wave: u32) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(global_seed.to_le_bytes());
    hasher.update(wave.to_le_bytes());
    finalize_seed(hasher)
}

fn derive_labeled_seed(base: u64, label: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(base.to_le_bytes());
    hasher.update(label.as_bytes());
    finalize_seed(hasher)
}

fn finalize_seed(hasher: Sha256) -> u64 {
    let digest = hasher.finalize();
    let bytes: [u8; 8] = digest[0..8].try_into().expect("sha256 digest slice length");
    u64::from_le_bytes(bytes)
}

#[derive(Clone, Copy, Debug)]
struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    fn new(seed: u64) -> Self {
        let seed = if seed == 0 { 0x9e37_79b9_7f4a_7c15 } else { seed };
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_cells() -> Vec<CellCoord> {
        (0..15).map(|column| CellCoord::new(column, 0)).collect()
    }

    fn run_frames(
        waves: &mut Waves,
        frames: u32,
        dt: Duration,
        feedback: &[Event],
    ) -> (Vec<Command>, Vec<Event>) {
        let cells = spawn_cells();
        let mut commands = Vec::new();
        let mut events = Vec::new();
        for _ in 0..frames {
            waves.handle(dt, feedback, &cells, &mut commands, &mut events);
        }
        (commands, events)
    }

    #[test]
    fn first_wave_starts_after_intermission_and_meets_quota() {
        let config = Config::default();
        let mut waves = Waves::new(config);

        // 4 s intermission plus 6 spawns at 800 ms each.
        let (commands, events) =
            run_frames(&mut waves, 100, Duration::from_millis(100), &[]);

        assert!(events
            .iter()
            .any(|event| matches!(event, Event::WaveStarted { wave } if wave.get() == 1)));
        let spawns = commands
            .iter()
            .filter(|command| matches!(command, Command::SpawnEnemy { .. }))
            .count();
        assert_eq!(spawns, config.base_count as usize);
    }

    #[test]
    fn identical_seeds_schedule_identical_waves() {
        let config = Config {
            global_seed: 99,
            ..Config::default()
        };
        let mut first = Waves::new(config);
        let mut second = Waves::new(config);

        let (commands_a, _) = run_frames(&mut first, 120, Duration::from_millis(100), &[]);
        let (commands_b, _) = run_frames(&mut second, 120, Duration::from_millis(100), &[]);
        assert_eq!(commands_a, commands_b);
        assert!(!commands_a.is_empty());
    }

    #[test]
    fn wave_completes_only_after_survivors_are_removed() {
        let config = Config {
            base_count: 1,
            count_growth: 0,
            ..Config::default()
        };
        let mut waves = Waves::new(config);
        let (commands, _) = run_frames(&mut waves, 100, Duration::from_millis(100), &[]);
        assert_eq!(commands.len(), 1);

        // Report the spawn; the wave must stay open while the enemy lives.
        let spawned = Event::EnemySpawned {
            enemy: EnemyId::new(0),
            kind: EnemyKind::Mite,
            cell: CellCoord::new(0, 0),
        };
        let (_, events) = run_frames(
            &mut waves,
            10,
            Duration::from_millis(100),
            std::slice::from_ref(&spawned),
        );
        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::WaveCompleted { .. })));

        let removed = Event::EnemyRemoved {
            enemy: EnemyId::new(0),
        };
        let (_, events) = run_frames(
            &mut waves,
            1,
            Duration::from_millis(100),
            std::slice::from_ref(&removed),
        );
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::WaveCompleted { wave } if wave.get() == 1)));
        assert_eq!(waves.current_wave(), WaveId::new(2));
    }

    #[test]
    fn jump_to_rearms_quota_for_target_wave() {
        let config = Config::default();
        let mut waves = Waves::new(config);
        waves.jump_to(5);

        let (commands, events) =
            run_frames(&mut waves, 400, Duration::from_millis(100), &[]);
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::WaveStarted { wave } if wave.get() == 5)));
        let spawns = commands
            .iter()
            .filter(|command| matches!(command, Command::SpawnEnemy { .. }))
            .count();
        assert_eq!(
            spawns,
            (config.base_count + config.count_growth * 4) as usize
        );
    }

    #[test]
    fn later_waves_include_tougher_kinds() {
        let mut rng = SplitMix64::new(7);
        let mut saw_brute = false;
        for _ in 0..256 {
            if sample_kind(10, &mut rng) == EnemyKind::Brute {
                saw_brute = true;
                break;
            }
        }
        assert!(saw_brute);

        let mut rng = SplitMix64::new(7);
        for _ in 0..256 {
            assert_ne!(sample_kind(1, &mut rng), EnemyKind::Brute, "wave 1 weight is zero");
        }
    }
}
