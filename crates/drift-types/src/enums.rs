//! Enumeration types for the Drift simulation.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Particle stages
// ---------------------------------------------------------------------------

/// The compaction stage of a cell's occupant.
///
/// Variants are declared in compaction order, so the derived [`Ord`]
/// reflects how far a particle has solidified: `Empty < SnowFlake <
/// Settled < Packed < Ice`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ParticleType {
    /// No particle occupies the cell.
    #[default]
    Empty,
    /// A freshly spawned, falling flake.
    SnowFlake,
    /// Loose snow that has come to rest.
    Settled,
    /// Compressed snow.
    Packed,
    /// Fully solidified ice. Immobile.
    Ice,
}

impl ParticleType {
    /// All particle types in compaction order.
    pub const ALL: [Self; 5] = [
        Self::Empty,
        Self::SnowFlake,
        Self::Settled,
        Self::Packed,
        Self::Ice,
    ];

    /// Whether the cell is occupied by any particle.
    pub const fn is_particle(self) -> bool {
        !matches!(self, Self::Empty)
    }

    /// Whether the particle is part of the accumulated pile
    /// (`Settled`, `Packed`, or `Ice`).
    pub const fn is_solid(self) -> bool {
        matches!(self, Self::Settled | Self::Packed | Self::Ice)
    }

    /// Whether the particle can be displaced by the movement model.
    ///
    /// Ice never moves; empty cells have nothing to move.
    pub const fn is_mobile(self) -> bool {
        matches!(self, Self::SnowFlake | Self::Settled | Self::Packed)
    }

    /// The next denser stage, or `None` for `Empty` and `Ice`.
    pub const fn next_stage(self) -> Option<Self> {
        match self {
            Self::SnowFlake => Some(Self::Settled),
            Self::Settled => Some(Self::Packed),
            Self::Packed => Some(Self::Ice),
            Self::Empty | Self::Ice => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Directions
// ---------------------------------------------------------------------------

/// A horizontal direction, used for wind gusts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Toward column 0.
    Left,
    /// Toward the last column.
    Right,
}

impl Direction {
    /// The sign applied to a wind magnitude blowing in this direction.
    pub const fn sign(self) -> f64 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }
}
