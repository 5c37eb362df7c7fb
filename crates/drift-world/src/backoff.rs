//! Coverage-based backoff for compaction timers.
//!
//! Once the pile rises above a target fraction of the grid height, the
//! minimum resting time required to pack snow or form ice is multiplied by
//! a factor that grows quadratically with the excess. This keeps the pile
//! from solidifying faster than it visibly grows.
//!
//! ```text
//! coverage <= target:  1.0
//! coverage >  target:  1.0 + k * ((coverage - target) / target)^2
//! ```

use serde::Deserialize;

use crate::grid::Grid;

/// Tunables for the backoff controller.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BackoffSettings {
    /// Coverage (fraction of grid height) below which no backoff applies.
    #[serde(default = "default_target_coverage")]
    pub target_coverage: f64,

    /// Quadratic steepness `k`.
    #[serde(default = "default_steepness")]
    pub steepness: f64,

    /// Fraction of the grid width a row must exceed in solid cells to
    /// count as the top of the pile.
    #[serde(default = "default_row_density")]
    pub row_density: f64,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            target_coverage: default_target_coverage(),
            steepness: default_steepness(),
            row_density: default_row_density(),
        }
    }
}

const fn default_target_coverage() -> f64 {
    0.33
}

const fn default_steepness() -> f64 {
    8.0
}

const fn default_row_density() -> f64 {
    0.1
}

/// Holds the most recently computed backoff multiplier.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffController {
    settings: BackoffSettings,
    current: f64,
}

impl BackoffController {
    /// Create a controller with a neutral multiplier of `1.0`.
    pub const fn new(settings: BackoffSettings) -> Self {
        Self {
            settings,
            current: 1.0,
        }
    }

    /// The multiplier computed by the last [`recompute`](Self::recompute).
    pub const fn current(&self) -> f64 {
        self.current
    }

    /// The settings this controller was built with.
    pub const fn settings(&self) -> &BackoffSettings {
        &self.settings
    }

    /// Measure the pile in `grid` and store the resulting multiplier.
    pub fn recompute(&mut self, grid: &Grid) -> f64 {
        self.current = self.multiplier(self.coverage(grid));
        self.current
    }

    /// Fraction of the grid height covered by the pile.
    ///
    /// Rows are scanned top-down; the first row whose solid count exceeds
    /// `row_density * width` marks the top of the pile.
    pub fn coverage(&self, grid: &Grid) -> f64 {
        let height = grid.height();
        if height == 0 {
            return 0.0;
        }
        let threshold = as_f64(grid.width()) * self.settings.row_density;
        let top = (0..height).find(|&y| as_f64(grid.solid_count_in_row(y)) > threshold);
        top.map_or(0.0, |y| as_f64(height.saturating_sub(y)) / as_f64(height))
    }

    /// Multiplier for a given coverage.
    ///
    /// Exactly `1.0` at or below the target, strictly increasing above it.
    pub fn multiplier(&self, coverage: f64) -> f64 {
        let target = self.settings.target_coverage;
        if coverage <= target || target <= 0.0 {
            return 1.0;
        }
        let excess = (coverage - target) / target;
        excess.mul_add(excess * self.settings.steepness, 1.0)
    }
}

/// Grid sizes are far below 2^52, so the conversion is exact.
#[allow(clippy::cast_precision_loss)]
fn as_f64(n: usize) -> f64 {
    n as f64
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use drift_types::{GridDimensions, ParticleType};

    use super::*;

    fn grid(width: usize, height: usize) -> Grid {
        Grid::new(GridDimensions {
            width,
            height,
            visible_start: 0,
            visible_width: width,
            floor_start: 0,
            floor_width: width,
        })
        .unwrap()
    }

    fn fill_rows(grid: &mut Grid, from_row: usize) {
        for y in from_row..grid.height() {
            for x in 0..grid.width() {
                grid.set(y, x, ParticleType::Packed);
            }
        }
    }

    #[test]
    fn empty_grid_has_no_coverage() {
        let controller = BackoffController::new(BackoffSettings::default());
        let g = grid(20, 10);
        assert!(controller.coverage(&g).abs() < f64::EPSILON);
    }

    #[test]
    fn coverage_from_first_dense_row() {
        let controller = BackoffController::new(BackoffSettings::default());
        let mut g = grid(20, 10);
        fill_rows(&mut g, 6);
        // rows 6..10 are full, so height covered is 4 of 10
        assert!((controller.coverage(&g) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn sparse_rows_do_not_count() {
        let controller = BackoffController::new(BackoffSettings::default());
        let mut g = grid(20, 10);
        // two solids in a 20-wide row is exactly 10%, not above it
        g.set(2, 0, ParticleType::Settled);
        g.set(2, 1, ParticleType::Settled);
        fill_rows(&mut g, 8);
        assert!((controller.coverage(&g) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn flakes_are_not_pile() {
        let controller = BackoffController::new(BackoffSettings::default());
        let mut g = grid(10, 10);
        for x in 0..10 {
            g.spawn_flake(0, x, 0);
        }
        assert!(controller.coverage(&g).abs() < f64::EPSILON);
    }

    #[test]
    fn multiplier_is_one_at_or_below_target() {
        let controller = BackoffController::new(BackoffSettings::default());
        for coverage in [0.0, 0.1, 0.2, 0.33] {
            assert!((controller.multiplier(coverage) - 1.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn multiplier_strictly_increases_above_target() {
        let controller = BackoffController::new(BackoffSettings::default());
        let mut previous = controller.multiplier(0.33);
        let mut coverage = 0.34;
        while coverage <= 1.0 {
            let m = controller.multiplier(coverage);
            assert!(m > previous, "{m} <= {previous} at {coverage}");
            previous = m;
            coverage += 0.01;
        }
    }

    #[test]
    fn multiplier_matches_quadratic() {
        let controller = BackoffController::new(BackoffSettings {
            target_coverage: 0.25,
            steepness: 8.0,
            row_density: 0.1,
        });
        // excess = (0.5 - 0.25) / 0.25 = 1.0 -> 1 + 8
        assert!((controller.multiplier(0.5) - 9.0).abs() < 1e-9);
    }

    #[test]
    fn recompute_stores_current() {
        let mut controller = BackoffController::new(BackoffSettings::default());
        let mut g = grid(10, 10);
        assert!((controller.recompute(&g) - 1.0).abs() < f64::EPSILON);
        fill_rows(&mut g, 2);
        let m = controller.recompute(&g);
        assert!(m > 1.0);
        assert!((controller.current() - m).abs() < f64::EPSILON);
    }
}
