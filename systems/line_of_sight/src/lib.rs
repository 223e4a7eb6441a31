#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Grid-resolution line of sight over the area's terrain targeting layer.
//!
//! The raycaster owns one immutable [`VisibilityGrid`] per area and answers
//! whether the straight line between two grid points crosses an impassable
//! cell. Lines are discretised with an incremental DDA walk, so results are
//! an approximation at grid resolution: fractional inputs are truncated
//! towards zero before walking. Until a grid is loaded every query answers
//! "visible".

use glam::Vec2;
use rotation_assist_core::GridCell;

/// Terrain values at or below this threshold block line of sight.
pub const PASSABILITY_THRESHOLD: i32 = 2;

/// Size of an area's terrain grid measured in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridDimensions {
    width: u32,
    height: u32,
}

impl GridDimensions {
    /// Creates a new dimension descriptor.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }
}

/// Reasons a terrain grid could not be loaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// The host did not report the area dimensions.
    #[error("area dimensions are unavailable")]
    MissingDimensions,
    /// The host did not report the terrain targeting rows.
    #[error("terrain targeting data is unavailable")]
    MissingTerrain,
    /// The reported dimensions describe an empty grid.
    #[error("area dimensions {width}x{height} contain no cells")]
    Empty {
        /// Reported width.
        width: u32,
        /// Reported height.
        height: u32,
    },
}

/// Host collaborator that exposes the current area's terrain.
pub trait TerrainSource {
    /// Dimensions of the current area, when known.
    fn dimensions(&self) -> Option<GridDimensions>;

    /// Terrain targeting values indexed `[row][column]`, when known.
    fn targeting_rows(&self) -> Option<&[Vec<i32>]>;
}

/// Dense passability grid stored in row-major order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisibilityGrid {
    width: u32,
    height: u32,
    cells: Vec<i32>,
}

impl VisibilityGrid {
    /// Builds a grid from raw rows clipped or padded to the provided dimensions.
    ///
    /// Cells missing from short rows are stored as impassable.
    pub fn from_rows(rows: &[Vec<i32>], dimensions: GridDimensions) -> Result<Self, GridError> {
        let width = usize::try_from(dimensions.width()).unwrap_or(0);
        let height = usize::try_from(dimensions.height()).unwrap_or(0);
        let cell_count = width.checked_mul(height).unwrap_or(0);
        if cell_count == 0 {
            return Err(GridError::Empty {
                width: dimensions.width(),
                height: dimensions.height(),
            });
        }

        let mut cells = vec![0; cell_count];
        for (row_index, row) in rows.iter().take(height).enumerate() {
            let start = row_index * width;
            let copied = row.len().min(width);
            cells[start..start + copied].copy_from_slice(&row[..copied]);
        }

        Ok(Self {
            width: dimensions.width(),
            height: dimensions.height(),
            cells,
        })
    }

    /// Dimensions of the grid.
    #[must_use]
    pub const fn dimensions(&self) -> GridDimensions {
        GridDimensions::new(self.width, self.height)
    }

    /// Terrain value stored for the cell, if it lies within the grid.
    #[must_use]
    pub fn value(&self, cell: GridCell) -> Option<i32> {
        let column = u32::try_from(cell.column()).ok()?;
        let row = u32::try_from(cell.row()).ok()?;
        if column >= self.width || row >= self.height {
            return None;
        }

        let width = usize::try_from(self.width).ok()?;
        let index = usize::try_from(row)
            .ok()?
            .checked_mul(width)?
            .checked_add(usize::try_from(column).ok()?)?;
        self.cells.get(index).copied()
    }

    /// Reports whether the cell is in bounds and see-through.
    #[must_use]
    pub fn is_passable(&self, cell: GridCell) -> bool {
        self.value(cell)
            .map_or(false, |value| value > PASSABILITY_THRESHOLD)
    }

    /// Reports whether every cell visited between `start` and `end` is passable.
    ///
    /// The start cell itself is never tested.
    #[must_use]
    pub fn has_line_of_sight(&self, start: GridCell, end: GridCell) -> bool {
        LineWalk::new(start, end).all(|cell| self.is_passable(cell))
    }
}

/// Iterator over the cells visited when walking from one cell to another.
///
/// The walk advances one cell per step along the dominant axis (columns win
/// ties) and accumulates the minor/major slope as error; once the error
/// reaches one half the minor axis advances and the error drops by one. The
/// error is kept in integers scaled by twice the major delta, so a completed
/// walk always takes exactly `min(dx, dy)` minor steps. Axis-aligned walks
/// never accumulate error. The start cell is not yielded; the end cell is.
#[derive(Clone, Debug)]
pub struct LineWalk {
    current: GridCell,
    step_column: i32,
    step_row: i32,
    column_major: bool,
    major_delta: i64,
    minor_delta: i64,
    error: i64,
    remaining: u32,
}

impl LineWalk {
    /// Prepares a walk between the provided cells.
    #[must_use]
    pub fn new(start: GridCell, end: GridCell) -> Self {
        let dx = i64::from(end.column()) - i64::from(start.column());
        let dy = i64::from(end.row()) - i64::from(start.row());
        let column_major = dx.abs() >= dy.abs();
        let (major_delta, minor_delta) = if column_major {
            (dx.abs(), dy.abs())
        } else {
            (dy.abs(), dx.abs())
        };

        Self {
            current: start,
            step_column: if dx < 0 { -1 } else { 1 },
            step_row: if dy < 0 { -1 } else { 1 },
            column_major,
            major_delta,
            minor_delta,
            error: 0,
            remaining: u32::try_from(major_delta).unwrap_or(u32::MAX),
        }
    }
}

impl Iterator for LineWalk {
    type Item = GridCell;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let mut column = self.current.column();
        let mut row = self.current.row();
        if self.column_major {
            column += self.step_column;
        } else {
            row += self.step_row;
        }

        self.error += 2 * self.minor_delta;
        if self.error >= self.major_delta {
            if self.column_major {
                row += self.step_row;
            } else {
                column += self.step_column;
            }
            self.error -= 2 * self.major_delta;
        }

        self.current = GridCell::new(column, row);
        Some(self.current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

/// Line-of-sight oracle anchored at the observer's grid position.
#[derive(Clone, Debug, Default)]
pub struct Raycaster {
    grid: Option<VisibilityGrid>,
    observer: Vec2,
}

impl Raycaster {
    /// Creates a raycaster without terrain; every query reports visible.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the grid with one built from raw host data.
    ///
    /// When the data is unavailable or empty the previous grid stays active
    /// and the reason is returned.
    pub fn load_grid(
        &mut self,
        rows: Option<&[Vec<i32>]>,
        dimensions: Option<GridDimensions>,
    ) -> Result<(), GridError> {
        let dimensions = dimensions.ok_or(GridError::MissingDimensions)?;
        let rows = rows.ok_or(GridError::MissingTerrain)?;
        let grid = VisibilityGrid::from_rows(rows, dimensions)?;
        tracing::debug!(
            width = dimensions.width(),
            height = dimensions.height(),
            "loaded visibility grid"
        );
        self.grid = Some(grid);
        Ok(())
    }

    /// Replaces the grid with the terrain currently exposed by the source.
    pub fn load_from(&mut self, source: &dyn TerrainSource) -> Result<(), GridError> {
        self.load_grid(source.targeting_rows(), source.dimensions())
    }

    /// Reports whether a grid has been loaded.
    #[must_use]
    pub fn has_grid(&self) -> bool {
        self.grid.is_some()
    }

    /// Currently loaded grid, if any.
    #[must_use]
    pub fn grid(&self) -> Option<&VisibilityGrid> {
        self.grid.as_ref()
    }

    /// Moves the ray origin used by [`Raycaster::is_visible`].
    pub fn set_observer(&mut self, observer: Vec2) {
        self.observer = observer;
    }

    /// Current ray origin.
    #[must_use]
    pub const fn observer(&self) -> Vec2 {
        self.observer
    }

    /// Reports whether the observer can see the target grid position.
    #[must_use]
    pub fn is_visible(&self, target: Vec2) -> bool {
        self.has_line_of_sight(self.observer, target)
    }

    /// Reports whether the line between two grid positions is unobstructed.
    ///
    /// Without a grid the answer is always `true`.
    #[must_use]
    pub fn has_line_of_sight(&self, start: Vec2, end: Vec2) -> bool {
        self.grid.as_ref().map_or(true, |grid| {
            grid.has_line_of_sight(
                GridCell::from_grid_position(start),
                GridCell::from_grid_position(end),
            )
        })
    }
}
