//! Pointer-driven edits applied to a square patch of the grid.
//!
//! Both brushes only touch columns inside the visible viewport, so a click
//! near the edge of the screen never reaches into the off-screen margins.

use drift_types::ParticleType;

use crate::grid::Grid;

/// What a [`toggle_patch`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrushOutcome {
    /// Solid cells removed from the patch.
    Removed(usize),
    /// Empty cells filled with settled snow.
    Placed(usize),
    /// The clicked cell was off the grid.
    Missed,
}

/// Place or remove snow in a `(2 * radius + 1)` square centred on `(y, x)`.
///
/// If the clicked cell is solid, every solid cell in the patch is cleared.
/// Otherwise every empty cell in the patch becomes [`ParticleType::Settled`].
pub fn toggle_patch(grid: &mut Grid, y: usize, x: usize, radius: usize) -> BrushOutcome {
    let Some(clicked) = grid.get(y, x) else {
        return BrushOutcome::Missed;
    };
    let remove = clicked.is_solid();
    let mut touched: usize = 0;

    for (py, px) in patch_cells(grid, y, x, radius) {
        let Some(current) = grid.get(py, px) else {
            continue;
        };
        if remove && current.is_solid() {
            grid.set(py, px, ParticleType::Empty);
            touched = touched.saturating_add(1);
        } else if !remove && current == ParticleType::Empty {
            grid.set(py, px, ParticleType::Settled);
            touched = touched.saturating_add(1);
        }
    }

    if remove {
        BrushOutcome::Removed(touched)
    } else {
        BrushOutcome::Placed(touched)
    }
}

/// Push every particle in the patch one cell along the drag direction.
///
/// `(dir_y, dir_x)` is normalized and rounded to a unit grid step, so a
/// mostly-horizontal drag pushes sideways and a diagonal drag pushes
/// diagonally. A particle only moves when its target is empty and visible.
/// Cells are visited from the leading edge backwards so a particle is
/// never pushed twice by one call. Returns the number of particles moved.
pub fn push_patch(
    grid: &mut Grid,
    y: usize,
    x: usize,
    dir_y: f64,
    dir_x: f64,
    radius: usize,
) -> usize {
    let Some((step_y, step_x)) = unit_step(dir_y, dir_x) else {
        return 0;
    };
    let dims = grid.dimensions();

    let mut cells = patch_cells(grid, y, x, radius);
    // leading edge first
    cells.sort_by_key(|&(py, px)| {
        let ky = if step_y > 0 { usize::MAX.saturating_sub(py) } else { py };
        let kx = if step_x > 0 { usize::MAX.saturating_sub(px) } else { px };
        (ky, kx)
    });

    let mut moved: usize = 0;
    for (py, px) in cells {
        if !grid.get(py, px).is_some_and(ParticleType::is_particle) {
            continue;
        }
        let Some((ty, tx)) = grid.offset(py, px, step_y, step_x) else {
            continue;
        };
        if dims.is_visible_column(tx) && grid.is_empty_at(ty, tx) {
            grid.move_particle((py, px), (ty, tx));
            moved = moved.saturating_add(1);
        }
    }
    moved
}

/// In-bounds, visible cells of the square patch around `(y, x)`.
fn patch_cells(grid: &Grid, y: usize, x: usize, radius: usize) -> Vec<(usize, usize)> {
    let dims = grid.dimensions();
    let y0 = y.saturating_sub(radius);
    let y1 = y.saturating_add(radius).min(dims.height.saturating_sub(1));
    let x0 = x.saturating_sub(radius).max(dims.visible_start);
    let x1 = x
        .saturating_add(radius)
        .min(dims.visible_end().saturating_sub(1));

    let mut cells = Vec::new();
    if dims.height == 0 || dims.visible_width == 0 {
        return cells;
    }
    for py in y0..=y1 {
        for px in x0..=x1 {
            cells.push((py, px));
        }
    }
    cells
}

/// Round a drag direction to a single-cell step, or `None` for no motion.
#[allow(clippy::cast_possible_truncation)]
fn unit_step(dir_y: f64, dir_x: f64) -> Option<(isize, isize)> {
    let magnitude = dir_y.hypot(dir_x);
    if !magnitude.is_finite() || magnitude <= 0.0 {
        return None;
    }
    // Both components are in [-1, 1] after normalizing, so rounding
    // yields -1, 0, or 1.
    let sy = (dir_y / magnitude).round() as isize;
    let sx = (dir_x / magnitude).round() as isize;
    (sy != 0 || sx != 0).then_some((sy, sx))
}
