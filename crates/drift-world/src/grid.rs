//! The cell grid: particle types plus per-cell bookkeeping.
//!
//! The grid is stored row-major as a single `Vec<Cell>`. Every accessor is
//! bounds-checked and treats out-of-range coordinates as an absent cell,
//! so neighborhood scans near the border need no special cases.
//!
//! # Invariants
//!
//! - Every cell holds exactly one [`ParticleType`].
//! - Whenever a cell becomes [`ParticleType::Empty`], its variant,
//!   stationary counter, and existence counter are zeroed.
//! - A move copies type, variant, and existence to the destination and
//!   vacates the source in one call; the destination's stationary counter
//!   starts over at zero.

use drift_types::{GridDimensions, ParticleCounts, ParticleType};
use tracing::debug;

use crate::error::WorldError;

/// Contents of a single grid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cell {
    /// The occupant's compaction stage.
    pub particle: ParticleType,
    /// Glyph/mass variant, meaningful only for [`ParticleType::SnowFlake`].
    pub variant: usize,
    /// Consecutive ticks the occupant has been blocked or floor-resting.
    pub stationary_ticks: u32,
    /// Ticks since the flake was spawned, carried across moves.
    pub existence_ticks: u32,
    /// Color shade picked when the flake spawned, carried across moves.
    pub tint: u8,
}

impl Cell {
    /// A cell holding nothing.
    pub const EMPTY: Self = Self {
        particle: ParticleType::Empty,
        variant: 0,
        stationary_ticks: 0,
        existence_ticks: 0,
        tint: 0,
    };
}

/// Rectangular particle grid with viewport and floor geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    /// Size of the grid and the visible/floor regions inside it.
    dims: GridDimensions,
    /// Row-major cells, `dims.width * dims.height` long.
    cells: Vec<Cell>,
}

impl Grid {
    /// Create an empty grid with the given geometry.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError`] if the visible or floor region extends past
    /// the grid width, or the cell count overflows.
    pub fn new(dims: GridDimensions) -> Result<Self, WorldError> {
        validate_dimensions(&dims)?;
        Ok(Self {
            dims,
            cells: vec![Cell::EMPTY; dims.cell_count()],
        })
    }

    /// Return the grid geometry.
    pub const fn dimensions(&self) -> GridDimensions {
        self.dims
    }

    /// Number of columns.
    pub const fn width(&self) -> usize {
        self.dims.width
    }

    /// Number of rows.
    pub const fn height(&self) -> usize {
        self.dims.height
    }

    // -----------------------------------------------------------------------
    // Addressing
    // -----------------------------------------------------------------------

    /// Row-major index of `(y, x)`, or `None` if out of range.
    fn index(&self, y: usize, x: usize) -> Option<usize> {
        if y >= self.dims.height || x >= self.dims.width {
            return None;
        }
        y.checked_mul(self.dims.width)?.checked_add(x)
    }

    /// Coordinates of the cell at signed offset `(dy, dx)` from `(y, x)`,
    /// or `None` if that cell lies off the grid.
    pub fn offset(&self, y: usize, x: usize, dy: isize, dx: isize) -> Option<(usize, usize)> {
        let ny = y.checked_add_signed(dy)?;
        let nx = x.checked_add_signed(dx)?;
        (ny < self.dims.height && nx < self.dims.width).then_some((ny, nx))
    }

    /// Borrow the cell at `(y, x)`.
    pub fn cell(&self, y: usize, x: usize) -> Option<&Cell> {
        self.index(y, x).and_then(|i| self.cells.get(i))
    }

    fn cell_mut(&mut self, y: usize, x: usize) -> Option<&mut Cell> {
        let i = self.index(y, x)?;
        self.cells.get_mut(i)
    }

    /// Borrow one full row of cells.
    pub fn row(&self, y: usize) -> Option<&[Cell]> {
        let start = self.index(y, 0)?;
        let end = start.checked_add(self.dims.width)?;
        self.cells.get(start..end)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Particle type at `(y, x)`, or `None` when out of bounds.
    pub fn get(&self, y: usize, x: usize) -> Option<ParticleType> {
        self.cell(y, x).map(|c| c.particle)
    }

    /// Particle type at signed offset `(dy, dx)` from `(y, x)`.
    pub fn neighbor(&self, y: usize, x: usize, dy: isize, dx: isize) -> Option<ParticleType> {
        let (ny, nx) = self.offset(y, x, dy, dx)?;
        self.get(ny, nx)
    }

    /// Whether `(y, x)` is in bounds and holds no particle.
    pub fn is_empty_at(&self, y: usize, x: usize) -> bool {
        self.get(y, x) == Some(ParticleType::Empty)
    }

    /// Whether `(y, x)` is in bounds and holds a solid particle.
    pub fn is_solid_at(&self, y: usize, x: usize) -> bool {
        self.get(y, x).is_some_and(ParticleType::is_solid)
    }

    /// Glyph/mass variant at `(y, x)`, or `None` when out of bounds.
    pub fn variant(&self, y: usize, x: usize) -> Option<usize> {
        self.cell(y, x).map(|c| c.variant)
    }

    /// Stationary counter at `(y, x)`; 0 when out of bounds.
    pub fn stationary_ticks(&self, y: usize, x: usize) -> u32 {
        self.cell(y, x).map_or(0, |c| c.stationary_ticks)
    }

    /// Existence counter at `(y, x)`; 0 when out of bounds.
    pub fn existence_ticks(&self, y: usize, x: usize) -> u32 {
        self.cell(y, x).map_or(0, |c| c.existence_ticks)
    }

    /// Whether `(y, x)` lies in the floor region of the second-to-last row.
    pub const fn is_floor(&self, y: usize, x: usize) -> bool {
        match self.dims.floor_row() {
            Some(row) => y == row && x >= self.dims.floor_start && x < self.dims.floor_end(),
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Set the particle type at `(y, x)`.
    ///
    /// Setting [`ParticleType::Empty`] clears every auxiliary attribute.
    /// Setting any other type keeps the existing counters, so a promotion
    /// in place preserves how long the particle has been resting.
    /// Returns `false` if the coordinates are out of bounds.
    pub fn set(&mut self, y: usize, x: usize, particle: ParticleType) -> bool {
        let Some(cell) = self.cell_mut(y, x) else {
            return false;
        };
        if particle == ParticleType::Empty {
            *cell = Cell::EMPTY;
        } else {
            cell.particle = particle;
        }
        true
    }

    /// Place a new flake with the given variant and fresh counters.
    pub fn spawn_flake(&mut self, y: usize, x: usize, variant: usize) -> bool {
        self.spawn_tinted_flake(y, x, variant, 0)
    }

    /// Place a new flake with the given variant and color shade.
    pub fn spawn_tinted_flake(&mut self, y: usize, x: usize, variant: usize, tint: u8) -> bool {
        let Some(cell) = self.cell_mut(y, x) else {
            return false;
        };
        *cell = Cell {
            particle: ParticleType::SnowFlake,
            variant,
            stationary_ticks: 0,
            existence_ticks: 0,
            tint,
        };
        true
    }

    /// Move the occupant of `from` to `to`.
    ///
    /// Type, variant, tint, and existence counter travel with the particle; the
    /// source is cleared as if set to `Empty`. Returns `false` (and leaves
    /// the grid untouched) if either coordinate is out of bounds.
    pub fn move_particle(&mut self, from: (usize, usize), to: (usize, usize)) -> bool {
        let (Some(src), Some(dst)) = (self.index(from.0, from.1), self.index(to.0, to.1)) else {
            return false;
        };
        if src == dst {
            return true;
        }
        let Some(moving) = self.cells.get(src).copied() else {
            return false;
        };
        if let Some(cell) = self.cells.get_mut(dst) {
            *cell = Cell {
                stationary_ticks: 0,
                ..moving
            };
        }
        if let Some(cell) = self.cells.get_mut(src) {
            *cell = Cell::EMPTY;
        }
        true
    }

    /// Add one tick to the stationary counter at `(y, x)`.
    pub fn increment_stationary(&mut self, y: usize, x: usize) {
        if let Some(cell) = self.cell_mut(y, x) {
            cell.stationary_ticks = cell.stationary_ticks.saturating_add(1);
        }
    }

    /// Reset the stationary counter at `(y, x)` to zero.
    pub fn reset_stationary(&mut self, y: usize, x: usize) {
        if let Some(cell) = self.cell_mut(y, x) {
            cell.stationary_ticks = 0;
        }
    }

    /// Overwrite the stationary counter at `(y, x)`.
    pub fn set_stationary(&mut self, y: usize, x: usize, ticks: u32) {
        if let Some(cell) = self.cell_mut(y, x) {
            cell.stationary_ticks = ticks;
        }
    }

    /// Advance the existence counter of every flake by one tick.
    pub fn age_flakes(&mut self) {
        for cell in &mut self.cells {
            if cell.particle == ParticleType::SnowFlake {
                cell.existence_ticks = cell.existence_ticks.saturating_add(1);
            }
        }
    }

    /// Empty every cell of the last row that lies outside the viewport.
    ///
    /// Returns the number of particles removed.
    pub fn clear_bottom_outside_visible(&mut self) -> usize {
        let Some(last) = self.dims.height.checked_sub(1) else {
            return 0;
        };
        let mut cleared: usize = 0;
        for x in 0..self.dims.width {
            if self.dims.is_visible_column(x) {
                continue;
            }
            if self.get(last, x).is_some_and(ParticleType::is_particle) {
                self.set(last, x, ParticleType::Empty);
                cleared = cleared.saturating_add(1);
            }
        }
        cleared
    }

    /// Empty every cell.
    pub fn clear(&mut self) {
        self.cells.fill(Cell::EMPTY);
    }

    // -----------------------------------------------------------------------
    // Aggregates
    // -----------------------------------------------------------------------

    /// Number of cells holding `particle`.
    pub fn count(&self, particle: ParticleType) -> usize {
        self.cells.iter().filter(|c| c.particle == particle).count()
    }

    /// Per-type particle counts.
    pub fn counts(&self) -> ParticleCounts {
        let mut counts = ParticleCounts::default();
        for cell in &self.cells {
            counts.record(cell.particle);
        }
        counts
    }

    /// Number of solid cells in row `y` (0 when out of bounds).
    pub fn solid_count_in_row(&self, y: usize) -> usize {
        self.row(y)
            .map_or(0, |row| row.iter().filter(|c| c.particle.is_solid()).count())
    }

    // -----------------------------------------------------------------------
    // Reshaping
    // -----------------------------------------------------------------------

    /// Change the grid size, keeping the visible and floor bounds.
    ///
    /// The overlapping top-left rectangle of every cell (type, variant,
    /// and both counters) is preserved exactly; new cells start empty.
    /// Region bounds that no longer fit are clipped to the new width.
    pub fn resize(&mut self, width: usize, height: usize) {
        let mut dims = self.dims;
        dims.width = width;
        dims.height = height;
        dims.visible_start = dims.visible_start.min(width);
        dims.visible_width = dims.visible_width.min(width.saturating_sub(dims.visible_start));
        dims.floor_start = dims.floor_start.min(width);
        dims.floor_width = dims.floor_width.min(width.saturating_sub(dims.floor_start));
        self.reshape_cells(dims);
    }

    /// Change the grid size and region bounds in one step.
    ///
    /// Content is preserved exactly as in [`resize`](Self::resize).
    ///
    /// # Errors
    ///
    /// Returns [`WorldError`] if the new regions do not fit the new width;
    /// the grid is left unchanged in that case.
    pub fn apply_dimensions(&mut self, dims: GridDimensions) -> Result<(), WorldError> {
        validate_dimensions(&dims)?;
        if dims == self.dims {
            return Ok(());
        }
        self.reshape_cells(dims);
        Ok(())
    }

    fn reshape_cells(&mut self, dims: GridDimensions) {
        let old = self.dims;
        let mut cells = vec![Cell::EMPTY; dims.cell_count()];
        let copy_height = old.height.min(dims.height);
        let copy_width = old.width.min(dims.width);
        for y in 0..copy_height {
            let (Some(src_start), Some(dst_start)) = (
                y.checked_mul(old.width),
                y.checked_mul(dims.width),
            ) else {
                continue;
            };
            let src = self
                .cells
                .get(src_start..src_start.saturating_add(copy_width));
            let dst = cells.get_mut(dst_start..dst_start.saturating_add(copy_width));
            if let (Some(src), Some(dst)) = (src, dst) {
                dst.copy_from_slice(src);
            }
        }
        debug!(
            old_width = old.width,
            old_height = old.height,
            new_width = dims.width,
            new_height = dims.height,
            "Grid reshaped"
        );
        self.dims = dims;
        self.cells = cells;
    }
}

fn validate_dimensions(dims: &GridDimensions) -> Result<(), WorldError> {
    if dims.width.checked_mul(dims.height).is_none() {
        return Err(WorldError::GridTooLarge {
            width: dims.width,
            height: dims.height,
        });
    }
    if dims.visible_end() > dims.width {
        return Err(WorldError::VisibleOutOfBounds {
            start: dims.visible_start,
            end: dims.visible_end(),
            width: dims.width,
        });
    }
    if dims.floor_end() > dims.width {
        return Err(WorldError::FloorOutOfBounds {
            start: dims.floor_start,
            end: dims.floor_end(),
            width: dims.width,
        });
    }
    Ok(())
}
