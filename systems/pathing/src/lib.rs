#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic grid path planner and the pathing system built on top of it.
//!
//! The planner runs a 4-directional A* search over walkable cells with a
//! Manhattan heuristic. Node scores and came-from data live in dense `Vec`s
//! indexed by cell offset for O(1) access and deterministic behavior; the open
//! set is a `BinaryHeap` ordered by f-score with column/row tie-breaks so the
//! same grid and endpoints always yield the same cell sequence.
//!
//! Failure is never fatal: when no route to the chosen exit exists the caller
//! retries alternate exit cells up to a small bound and then degrades to a
//! direct fallback path that ignores obstacles.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use emberspire_core::{
    CellCoord, Command, Event, GridView, MAX_EXIT_RETRIES, SEARCH_DEADLINE,
};
use thiserror::Error;
use tracing::{debug, warn};

/// Default cap on node expansions per search, a secondary guard alongside the
/// wall-clock deadline.
pub const MAX_EXPANSIONS: usize = 100_000;

/// Reasons a single path search may fail to produce a route.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PlanFailure {
    /// Every frontier was exhausted without reaching the goal.
    #[error("no walkable route to the requested goal")]
    NoRoute,
    /// The search exceeded its wall-clock deadline or expansion cap.
    #[error("search budget exhausted before reaching the goal")]
    BudgetExhausted,
}

/// Bounded budget granted to a single search.
///
/// The wall-clock allowance is measured from the moment each search starts,
/// so one budget value can be reused across many searches.
#[derive(Clone, Copy, Debug)]
pub struct SearchBudget {
    wall_clock: Option<Duration>,
    max_expansions: usize,
}

impl SearchBudget {
    /// Creates a budget with an explicit wall-clock allowance and expansion cap.
    #[must_use]
    pub const fn new(wall_clock: Duration, max_expansions: usize) -> Self {
        Self {
            wall_clock: Some(wall_clock),
            max_expansions,
        }
    }

    /// Creates a budget with no wall-clock deadline, useful under test.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            wall_clock: None,
            max_expansions: usize::MAX,
        }
    }

    fn start(&self) -> ActiveBudget {
        ActiveBudget {
            deadline: self
                .wall_clock
                .and_then(|allowance| Instant::now().checked_add(allowance)),
            max_expansions: self.max_expansions,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct ActiveBudget {
    deadline: Option<Instant>,
    max_expansions: usize,
}

impl ActiveBudget {
    fn exhausted(&self, expansions: usize) -> bool {
        if expansions >= self.max_expansions {
            return true;
        }
        match self.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self::new(SEARCH_DEADLINE, MAX_EXPANSIONS)
    }
}

/// Route produced by [`plan_to_exit`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedRoute {
    /// Cell sequence from the start cell (inclusive) to the goal cell.
    pub cells: Vec<CellCoord>,
    /// Indicates the route is a direct fallback that may cross obstacles.
    pub fallback: bool,
}

/// Entry in the A* open set; the heap is a min-heap via reversed ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OpenEntry {
    f_score: u32,
    cell: CellCoord,
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap behavior; column/row keep pops deterministic.
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| other.cell.column().cmp(&self.cell.column()))
            .then_with(|| other.cell.row().cmp(&self.cell.row()))
    }
}

/// Finds the shortest walkable path from `start` to `goal`.
///
/// The returned sequence includes both endpoints. The start cell is treated
/// as passable even when marked as an obstacle so that an entity standing on
/// a freshly blocked cell can still plan its way out.
pub fn find_path(
    grid: GridView<'_>,
    start: CellCoord,
    goal: CellCoord,
    budget: &SearchBudget,
) -> Result<Vec<CellCoord>, PlanFailure> {
    let (columns, rows) = grid.dimensions();
    if !grid.in_bounds(start) || !grid.in_bounds(goal) {
        return Err(PlanFailure::NoRoute);
    }
    if !grid.is_walkable(goal) {
        return Err(PlanFailure::NoRoute);
    }
    if start == goal {
        return Ok(vec![start]);
    }

    let cell_count = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);
    if cell_count == 0 {
        return Err(PlanFailure::NoRoute);
    }

    let width = columns as usize;
    let mut g_score = vec![u32::MAX; cell_count];
    let mut came_from: Vec<Option<CellCoord>> = vec![None; cell_count];
    let mut closed = vec![false; cell_count];

    let start_index = offset(width, start);
    g_score[start_index] = 0;

    let mut open = BinaryHeap::new();
    open.push(OpenEntry {
        f_score: start.manhattan_distance(goal),
        cell: start,
    });

    let budget = budget.start();
    let mut expansions = 0usize;
    while let Some(entry) = open.pop() {
        let current = entry.cell;
        let current_index = offset(width, current);

        if current == goal {
            return Ok(reconstruct(&came_from, width, start, goal));
        }

        if closed[current_index] {
            continue;
        }
        closed[current_index] = true;

        expansions += 1;
        if budget.exhausted(expansions) {
            return Err(PlanFailure::BudgetExhausted);
        }

        let current_g = g_score[current_index];
        let next_g = current_g.saturating_add(1);

        for neighbor in cardinal_neighbors(current, columns, rows) {
            if !grid.is_walkable(neighbor) {
                continue;
            }
            let neighbor_index = offset(width, neighbor);
            if closed[neighbor_index] || g_score[neighbor_index] <= next_g {
                continue;
            }
            g_score[neighbor_index] = next_g;
            came_from[neighbor_index] = Some(current);
            open.push(OpenEntry {
                f_score: next_g.saturating_add(neighbor.manhattan_distance(goal)),
                cell: neighbor,
            });
        }
    }

    Err(PlanFailure::NoRoute)
}

/// Plans a route from `start` to the exit band, retrying alternate exit cells
/// and degrading to a direct fallback path when every attempt fails.
///
/// The retry bound and the fallback guarantee that this function terminates
/// with a non-empty route for any in-bounds start cell.
#[must_use]
pub fn plan_to_exit(
    grid: GridView<'_>,
    start: CellCoord,
    preferred_exit: CellCoord,
    budget: &SearchBudget,
) -> PlannedRoute {
    match find_path(grid, start, preferred_exit, budget) {
        Ok(cells) => {
            return PlannedRoute {
                cells,
                fallback: false,
            }
        }
        Err(failure) => {
            debug!(?failure, ?start, ?preferred_exit, "primary exit unreachable");
        }
    }

    for exit in alternate_exits(grid, preferred_exit).take(MAX_EXIT_RETRIES) {
        match find_path(grid, start, exit, budget) {
            Ok(cells) => {
                debug!(?start, ?exit, "alternate exit accepted");
                return PlannedRoute {
                    cells,
                    fallback: false,
                };
            }
            Err(_) => continue,
        }
    }

    let cells = fallback_path(grid, start);
    warn!(?start, "all exits unreachable, degrading to direct fallback path");
    PlannedRoute {
        cells,
        fallback: true,
    }
}

/// Produces a direct cell line from `start` to the nearest exit cell,
/// ignoring obstacles entirely.
///
/// This is the degrade-gracefully terminal state of planning: visually wrong
/// but guaranteed non-empty and finite, so the simulation never stalls.
#[must_use]
pub fn fallback_path(grid: GridView<'_>, start: CellCoord) -> Vec<CellCoord> {
    let (columns, rows) = grid.dimensions();
    if columns == 0 || rows == 0 {
        return vec![start];
    }

    let exit_row = grid.exit_row();
    let target_column = start.column().min(columns.saturating_sub(1));
    let mut cells = vec![start];
    let mut cursor = start;

    while cursor.row() < exit_row || cursor.column() != target_column {
        cursor = if cursor.column() < target_column {
            CellCoord::new(cursor.column() + 1, cursor.row())
        } else if cursor.column() > target_column {
            CellCoord::new(cursor.column() - 1, cursor.row())
        } else {
            CellCoord::new(cursor.column(), cursor.row() + 1)
        };
        cells.push(cursor);
    }

    cells
}

/// Reports whether any goal cell is reachable from `start` on the grid with
/// an optional hypothetical obstacle overlaid.
///
/// Used by the placement validator to predict connectivity without mutating
/// the grid. The search is a plain breadth-first flood so no path needs to be
/// reconstructed.
#[must_use]
pub fn is_route_open(
    grid: GridView<'_>,
    start: CellCoord,
    goals: &[CellCoord],
    overlay_obstacle: Option<CellCoord>,
) -> bool {
    let (columns, rows) = grid.dimensions();
    if !grid.in_bounds(start) || goals.is_empty() {
        return false;
    }
    if overlay_obstacle == Some(start) {
        return false;
    }
    if goals.contains(&start) {
        return true;
    }

    let width = columns as usize;
    let cell_count = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);
    let mut visited = vec![false; cell_count];
    visited[offset(width, start)] = true;

    let mut queue = std::collections::VecDeque::new();
    queue.push_back(start);

    while let Some(cell) = queue.pop_front() {
        for neighbor in cardinal_neighbors(cell, columns, rows) {
            if overlay_obstacle == Some(neighbor) || !grid.is_walkable(neighbor) {
                continue;
            }
            let index = offset(width, neighbor);
            if visited[index] {
                continue;
            }
            visited[index] = true;
            if goals.contains(&neighbor) {
                return true;
            }
            queue.push_back(neighbor);
        }
    }

    false
}

/// Pure system that answers the world's path requests with planned routes.
#[derive(Debug)]
pub struct Pathing {
    budget: SearchBudget,
}

impl Pathing {
    /// Creates a pathing system using the provided per-search budget.
    #[must_use]
    pub const fn new(budget: SearchBudget) -> Self {
        Self { budget }
    }

    /// Consumes `PathRequested` events and emits `AssignPath` commands.
    ///
    /// The world guards against overlapping requests per enemy, so every
    /// event received here is answered exactly once.
    pub fn handle(&mut self, events: &[Event], grid: GridView<'_>, out: &mut Vec<Command>) {
        for event in events {
            let Event::PathRequested {
                enemy,
                from,
                preferred_exit,
            } = event
            else {
                continue;
            };

            let route = plan_to_exit(grid, *from, *preferred_exit, &self.budget);
            out.push(Command::AssignPath {
                enemy: *enemy,
                cells: route.cells,
                fallback: route.fallback,
            });
        }
    }
}

impl Default for Pathing {
    fn default() -> Self {
        Self::new(SearchBudget::default())
    }
}

fn alternate_exits<'a>(
    grid: GridView<'a>,
    preferred: CellCoord,
) -> impl Iterator<Item = CellCoord> + 'a {
    let mut exits: Vec<CellCoord> = grid
        .exit_cells()
        .filter(move |cell| *cell != preferred)
        .collect();
    exits.sort_by_key(|cell| (cell.column().abs_diff(preferred.column()), cell.column()));
    exits.into_iter()
}

fn reconstruct(
    came_from: &[Option<CellCoord>],
    width: usize,
    start: CellCoord,
    goal: CellCoord,
) -> Vec<CellCoord> {
    let mut cells = vec![goal];
    let mut cursor = goal;
    while cursor != start {
        match came_from[offset(width, cursor)] {
            Some(previous) => {
                cells.push(previous);
                cursor = previous;
            }
            None => break,
        }
    }
    cells.reverse();
    cells
}

fn cardinal_neighbors(cell: CellCoord, columns: u32, rows: u32) -> NeighborIter {
    let mut neighbors = NeighborIter::default();

    if cell.row() > 0 {
        neighbors.push(CellCoord::new(cell.column(), cell.row() - 1));
    }
    if cell.column() > 0 {
        neighbors.push(CellCoord::new(cell.column() - 1, cell.row()));
    }
    if cell.column() + 1 < columns {
        neighbors.push(CellCoord::new(cell.column() + 1, cell.row()));
    }
    if cell.row() + 1 < rows {
        neighbors.push(CellCoord::new(cell.column(), cell.row() + 1));
    }

    neighbors
}

#[derive(Clone, Debug, Default)]
struct NeighborIter {
    buffer: [Option<CellCoord>; 4],
    len: usize,
    cursor: usize,
}

impl NeighborIter {
    fn push(&mut self, cell: CellCoord) {
        if self.len < self.buffer.len() {
            self.buffer[self.len] = Some(cell);
            self.len += 1;
        }
    }
}

impl Iterator for NeighborIter {
    type Item = CellCoord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.len {
            return None;
        }
        let value = self.buffer[self.cursor];
        self.cursor += 1;
        value
    }
}

fn offset(width: usize, cell: CellCoord) -> usize {
    cell.row() as usize * width + cell.column() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use emberspire_core::CellState;

    fn open_grid(columns: u32, rows: u32) -> Vec<CellState> {
        vec![CellState::Walkable; (columns * rows) as usize]
    }

    fn block(cells: &mut [CellState], columns: u32, cell: CellCoord) {
        cells[(cell.row() * columns + cell.column()) as usize] = CellState::Obstacle;
    }

    #[test]
    fn straight_corridor_path_is_shortest() {
        let cells = open_grid(1, 5);
        let grid = GridView::new(&cells, 1, 5);
        let path = find_path(
            grid,
            CellCoord::new(0, 0),
            CellCoord::new(0, 4),
            &SearchBudget::unbounded(),
        )
        .expect("path");
        assert_eq!(path.len(), 5);
        assert_eq!(path[0], CellCoord::new(0, 0));
        assert_eq!(path[4], CellCoord::new(0, 4));
    }

    #[test]
    fn path_routes_around_obstacles() {
        let columns = 3;
        let mut cells = open_grid(columns, 4);
        block(&mut cells, columns, CellCoord::new(1, 1));
        block(&mut cells, columns, CellCoord::new(2, 1));
        let grid = GridView::new(&cells, columns, 4);

        let path = find_path(
            grid,
            CellCoord::new(2, 0),
            CellCoord::new(2, 3),
            &SearchBudget::unbounded(),
        )
        .expect("path");

        assert!(path.contains(&CellCoord::new(0, 1)));
        assert_eq!(*path.last().expect("goal"), CellCoord::new(2, 3));
    }

    #[test]
    fn blocked_goal_reports_no_route() {
        let columns = 3;
        let mut cells = open_grid(columns, 3);
        block(&mut cells, columns, CellCoord::new(1, 2));
        let grid = GridView::new(&cells, columns, 3);

        assert_eq!(
            find_path(
                grid,
                CellCoord::new(1, 0),
                CellCoord::new(1, 2),
                &SearchBudget::unbounded(),
            ),
            Err(PlanFailure::NoRoute)
        );
    }

    #[test]
    fn expansion_cap_reports_budget_exhausted() {
        let cells = open_grid(20, 20);
        let grid = GridView::new(&cells, 20, 20);
        let budget = SearchBudget::new(Duration::from_secs(3), 2);

        assert_eq!(
            find_path(grid, CellCoord::new(0, 0), CellCoord::new(19, 19), &budget),
            Err(PlanFailure::BudgetExhausted)
        );
    }

    #[test]
    fn fallback_path_reaches_exit_row_through_obstacles() {
        let columns = 3;
        let mut cells = open_grid(columns, 5);
        for column in 0..columns {
            block(&mut cells, columns, CellCoord::new(column, 3));
        }
        let grid = GridView::new(&cells, columns, 5);

        let route = plan_to_exit(
            grid,
            CellCoord::new(1, 0),
            CellCoord::new(1, 4),
            &SearchBudget::unbounded(),
        );

        assert!(route.fallback);
        assert!(!route.cells.is_empty());
        assert_eq!(route.cells.last().expect("goal").row(), 4);
    }

    #[test]
    fn repeated_searches_return_identical_paths() {
        let columns = 9;
        let mut cells = open_grid(columns, 12);
        block(&mut cells, columns, CellCoord::new(4, 5));
        block(&mut cells, columns, CellCoord::new(5, 5));
        block(&mut cells, columns, CellCoord::new(4, 6));
        let grid = GridView::new(&cells, columns, 12);

        let first = find_path(
            grid,
            CellCoord::new(4, 0),
            CellCoord::new(4, 11),
            &SearchBudget::unbounded(),
        )
        .expect("path");
        for _ in 0..8 {
            let next = find_path(
                grid,
                CellCoord::new(4, 0),
                CellCoord::new(4, 11),
                &SearchBudget::unbounded(),
            )
            .expect("path");
            assert_eq!(first, next);
        }
    }

    #[test]
    fn route_open_respects_overlay_obstacle() {
        let cells = open_grid(1, 4);
        let grid = GridView::new(&cells, 1, 4);
        let goals = [CellCoord::new(0, 3)];

        assert!(is_route_open(grid, CellCoord::new(0, 0), &goals, None));
        assert!(!is_route_open(
            grid,
            CellCoord::new(0, 0),
            &goals,
            Some(CellCoord::new(0, 2))
        ));
    }
}
