//! Plain data structs shared across the Drift workspace.

use serde::{Deserialize, Serialize};

use crate::enums::ParticleType;

/// Dimensions of the simulation grid and the regions within it.
///
/// The grid is wider than the visible viewport so particles can be blown
/// off-screen without vanishing at the render boundary. The floor is a
/// horizontal span of the second-to-last row that acts as a permanent
/// support surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDimensions {
    /// Total number of columns.
    pub width: usize,
    /// Total number of rows.
    pub height: usize,
    /// First column shown by the renderer.
    pub visible_start: usize,
    /// Number of columns shown by the renderer.
    pub visible_width: usize,
    /// First column of the floor region.
    pub floor_start: usize,
    /// Number of columns in the floor region.
    pub floor_width: usize,
}

impl GridDimensions {
    /// One past the last visible column.
    pub const fn visible_end(&self) -> usize {
        self.visible_start.saturating_add(self.visible_width)
    }

    /// One past the last floor column.
    pub const fn floor_end(&self) -> usize {
        self.floor_start.saturating_add(self.floor_width)
    }

    /// Whether column `x` lies inside the visible viewport.
    pub const fn is_visible_column(&self, x: usize) -> bool {
        x >= self.visible_start && x < self.visible_end()
    }

    /// The row index of the floor (`height - 2`), if the grid has one.
    pub const fn floor_row(&self) -> Option<usize> {
        self.height.checked_sub(2)
    }

    /// Total number of cells.
    pub const fn cell_count(&self) -> usize {
        self.width.saturating_mul(self.height)
    }
}

/// Number of cells holding each particle type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticleCounts {
    /// Falling flakes.
    pub snow_flakes: usize,
    /// Settled snow.
    pub settled: usize,
    /// Packed snow.
    pub packed: usize,
    /// Ice.
    pub ice: usize,
}

impl ParticleCounts {
    /// Record one more particle of the given type. `Empty` is ignored.
    pub const fn record(&mut self, particle: ParticleType) {
        match particle {
            ParticleType::Empty => {}
            ParticleType::SnowFlake => self.snow_flakes = self.snow_flakes.saturating_add(1),
            ParticleType::Settled => self.settled = self.settled.saturating_add(1),
            ParticleType::Packed => self.packed = self.packed.saturating_add(1),
            ParticleType::Ice => self.ice = self.ice.saturating_add(1),
        }
    }

    /// Cells in the accumulated pile (`Settled + Packed + Ice`).
    pub const fn solids(&self) -> usize {
        self.settled.saturating_add(self.packed).saturating_add(self.ice)
    }

    /// All non-empty cells.
    pub const fn total(&self) -> usize {
        self.solids().saturating_add(self.snow_flakes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_helpers() {
        let dims = GridDimensions {
            width: 160,
            height: 37,
            visible_start: 40,
            visible_width: 80,
            floor_start: 20,
            floor_width: 120,
        };
        assert_eq!(dims.visible_end(), 120);
        assert_eq!(dims.floor_end(), 140);
        assert_eq!(dims.floor_row(), Some(35));
        assert!(dims.is_visible_column(40));
        assert!(!dims.is_visible_column(120));
        assert_eq!(dims.cell_count(), 160 * 37);
    }

    #[test]
    fn tiny_grid_has_no_floor_row() {
        let dims = GridDimensions {
            height: 1,
            ..GridDimensions::default()
        };
        assert_eq!(dims.floor_row(), None);
    }

    #[test]
    fn counts_accumulate() {
        let mut counts = ParticleCounts::default();
        for p in ParticleType::ALL {
            counts.record(p);
        }
        counts.record(ParticleType::SnowFlake);
        assert_eq!(counts.snow_flakes, 2);
        assert_eq!(counts.solids(), 3);
        assert_eq!(counts.total(), 5);
    }
}
