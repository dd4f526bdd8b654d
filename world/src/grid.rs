//! Walkability grid and the mapping between cell and world coordinates.

use emberspire_core::{CellCoord, CellState, GridView};
use glam::Vec2;

/// Dense walkability grid owned by the world.
///
/// The grid is the single piece of truly shared mutable state in the
/// simulation. Mutation is crate-private and reachable only through the
/// committed placement and removal paths in `apply`, which re-run the
/// placement validator before touching a cell.
#[derive(Clone, Debug)]
pub(crate) struct Grid {
    columns: u32,
    rows: u32,
    cells: Vec<CellState>,
}

/// Result of converting a world-space point into a grid cell.
///
/// Out-of-bounds inputs are pulled to the nearest valid cell rather than
/// rejected; `clamped` lets callers notice that it happened for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClampedCell {
    /// Nearest in-bounds cell for the provided point.
    pub cell: CellCoord,
    /// Indicates the point fell outside the grid and was clamped.
    pub clamped: bool,
}

impl Grid {
    pub(crate) fn new(columns: u32, rows: u32) -> Self {
        let capacity = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);
        Self {
            columns,
            rows,
            cells: vec![CellState::Walkable; capacity],
        }
    }

    pub(crate) fn view(&self) -> GridView<'_> {
        GridView::new(&self.cells, self.columns, self.rows)
    }

    pub(crate) fn columns(&self) -> u32 {
        self.columns
    }

    pub(crate) fn rows(&self) -> u32 {
        self.rows
    }

    pub(crate) fn set_cell(&mut self, cell: CellCoord, state: CellState) {
        if let Some(index) = self.index(cell) {
            if let Some(slot) = self.cells.get_mut(index) {
                *slot = state;
            }
        }
    }

    /// Center of the provided cell in continuous world coordinates.
    ///
    /// The mapping is affine: the grid is centered on the origin with one
    /// world unit per cell, so cell `(c, r)` maps to
    /// `(c - columns/2 + 0.5, r - rows/2 + 0.5)`.
    pub(crate) fn grid_to_world(&self, cell: CellCoord) -> Vec2 {
        let half = self.half_extent();
        Vec2::new(
            cell.column() as f32 - half.x + 0.5,
            cell.row() as f32 - half.y + 0.5,
        )
    }

    /// Inverse of [`Grid::grid_to_world`] with clamping at the boundaries.
    pub(crate) fn world_to_grid(&self, point: Vec2) -> ClampedCell {
        let half = self.half_extent();
        let raw_column = (point.x + half.x).floor();
        let raw_row = (point.y + half.y).floor();

        let max_column = self.columns.saturating_sub(1) as f32;
        let max_row = self.rows.saturating_sub(1) as f32;
        let column = raw_column.clamp(0.0, max_column);
        let row = raw_row.clamp(0.0, max_row);

        ClampedCell {
            cell: CellCoord::new(column as u32, row as u32),
            clamped: raw_column != column || raw_row != row,
        }
    }

    /// Pulls a world-space position back inside the grid's world bounds.
    pub(crate) fn clamp_world(&self, point: Vec2) -> Vec2 {
        let half = self.half_extent();
        Vec2::new(
            point.x.clamp(-half.x, half.x),
            point.y.clamp(-half.y, half.y),
        )
    }

    /// Reports whether a world-space position lies outside the grid bounds.
    pub(crate) fn out_of_bounds(&self, point: Vec2) -> bool {
        let half = self.half_extent();
        point.x < -half.x || point.x > half.x || point.y < -half.y || point.y > half.y
    }

    /// World-space z threshold past which an enemy counts as arrived.
    pub(crate) fn arrival_threshold(&self) -> f32 {
        self.rows as f32 / 2.0 - emberspire_core::ARRIVAL_MARGIN
    }

    fn half_extent(&self) -> Vec2 {
        Vec2::new(self.columns as f32 / 2.0, self.rows as f32 / 2.0)
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() < self.columns && cell.row() < self.rows {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}
