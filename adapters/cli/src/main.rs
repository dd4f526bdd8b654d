#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless command-line adapter that runs the Emberspire simulation and
//! prints the event stream.

use std::time::Duration;

use anyhow::{ensure, Result};
use clap::Parser;
use emberspire_core::Event;
use emberspire_orchestrator::{Session, SessionConfig};
use emberspire_world::query;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless Emberspire simulation runner", long_about = None)]
struct Args {
    /// Number of cell columns in the grid.
    #[arg(long, default_value_t = 15)]
    columns: u32,

    /// Number of cell rows in the grid.
    #[arg(long, default_value_t = 25)]
    rows: u32,

    /// Seed shared by the world and the wave scheduler.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Number of frames to simulate.
    #[arg(long, default_value_t = 600)]
    frames: u32,

    /// Simulated milliseconds per frame.
    #[arg(long, default_value_t = 100)]
    frame_ms: u64,

    /// Print every event instead of wave and death milestones only.
    #[arg(long)]
    verbose_events: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    ensure!(args.columns > 0 && args.rows > 0, "grid must be non-empty");
    ensure!(args.frame_ms > 0, "frame duration must be positive");

    let mut session = Session::new(SessionConfig {
        world: emberspire_world::Config {
            columns: args.columns,
            rows: args.rows,
            rng_seed: args.seed,
            ..emberspire_world::Config::default()
        },
        waves: Some(emberspire_system_waves::Config {
            global_seed: args.seed,
            ..emberspire_system_waves::Config::default()
        }),
    });

    let dt = Duration::from_millis(args.frame_ms);
    for frame in 0..args.frames {
        for event in session.frame(dt) {
            if args.verbose_events || is_milestone(event) {
                println!("[{frame:>5}] {event:?}");
            }
        }
    }

    let world = session.world();
    println!(
        "simulated {} frames: clock {:?}, gold {}, wave {:?}",
        args.frames,
        query::clock(world),
        query::gold(world),
        session.current_wave(),
    );
    Ok(())
}

fn is_milestone(event: &Event) -> bool {
    matches!(
        event,
        Event::WaveStarted { .. }
            | Event::WaveCompleted { .. }
            | Event::EnemyDied { .. }
            | Event::EnemyArrived { .. }
            | Event::TowerPlaced { .. }
            | Event::TowerPlacementRejected { .. }
    )
}
