#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Placement validation rules for tower construction.
//!
//! The validator only predicts: it inspects immutable views and reports
//! whether a placement would be legal. Committing the mutation is a separate,
//! explicit `Command::PlaceTower` step performed by the caller, so that
//! speculative preview checks while the cursor moves never touch world state.

use emberspire_core::{
    CellCoord, EnemyView, GridView, PlacementError, MAX_SAMPLED_ENEMIES,
};
use emberspire_system_pathing::is_route_open;

/// Decides whether placing a tower at `candidate` is legal.
///
/// Checks run in a fixed order: bounds, cell occupancy, build zone, and
/// finally connectivity on a hypothetical grid with the candidate cell marked
/// as an obstacle. With no live enemies the representative entry cells must
/// keep a route to the exit band; with live enemies a bounded, deterministic
/// sample of not-yet-arrived enemies is checked instead.
///
/// # Errors
///
/// Returns the first violated rule as a [`PlacementError`].
pub fn validate(
    grid: GridView<'_>,
    enemies: &EnemyView,
    candidate: CellCoord,
) -> Result<(), PlacementError> {
    if !grid.in_bounds(candidate) {
        return Err(PlacementError::OutOfBounds);
    }
    if !grid.is_walkable(candidate) {
        return Err(PlacementError::Occupied);
    }
    if grid.is_build_restricted(candidate) {
        return Err(PlacementError::Restricted);
    }

    let exits: Vec<CellCoord> = grid
        .exit_cells()
        .filter(|cell| grid.is_walkable(*cell))
        .collect();
    if exits.is_empty() {
        return Err(PlacementError::RouteBlocked);
    }

    let mut sampled = 0usize;
    for enemy in enemies.iter() {
        if enemy.arrived {
            continue;
        }
        if sampled >= MAX_SAMPLED_ENEMIES {
            break;
        }
        sampled += 1;

        if enemy.cell == candidate {
            return Err(PlacementError::Occupied);
        }
        if !is_route_open(grid, enemy.cell, &exits, Some(candidate)) {
            return Err(PlacementError::RouteBlocked);
        }
    }

    if sampled == 0 {
        // No live enemies: a representative entry cell must stay connected.
        let open = grid.entry_cells().any(|entry| {
            entry != candidate && is_route_open(grid, entry, &exits, Some(candidate))
        });
        if !open {
            return Err(PlacementError::RouteBlocked);
        }
    }

    Ok(())
}
