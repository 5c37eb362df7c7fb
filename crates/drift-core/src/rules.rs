//! Transition rules: compression, packing, ice formation, and melting.
//!
//! Rules are evaluated for one cell at a time in a fixed order. The first
//! rule that fires ends the cell's turn, so a cell changes stage at most
//! once per tick. The caller has already updated the cell's stationary
//! counter for this tick.
//!
//! | From        | To          | Rule                              |
//! |-------------|-------------|-----------------------------------|
//! | `SnowFlake` | `Settled`   | compression                       |
//! | `Settled`   | `Packed`    | packing (time x backoff)          |
//! | `Packed`    | `Ice`       | ice formation (time x backoff)    |
//! | any         | lower/Empty | melting (temperature-scaled draw) |

use drift_types::ParticleType;
use drift_world::Grid;
use rand::Rng;

use crate::config::{CompressionConfig, IceConfig, MeltConfig, PackingConfig, PhysicsConfig};

/// The eight neighbours of a cell.
const NEIGHBORS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Left, right, up, down.
const ORTHOGONAL: [(isize, isize); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];

/// What a rule did to a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The particle advanced one compaction stage.
    Promoted {
        /// Stage before the rule fired.
        from: ParticleType,
        /// Stage after the rule fired.
        to: ParticleType,
    },
    /// The melt draw succeeded and changed the cell.
    Melted {
        /// Stage before melting.
        from: ParticleType,
        /// Resulting stage (`Empty` when the particle evaporated).
        to: ParticleType,
    },
    /// The melt draw succeeded but both follow-up draws failed.
    MeltHeld,
}

/// Per-tick inputs shared by every rule evaluation.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// Compaction and melt thresholds.
    pub physics: &'a PhysicsConfig,
    /// Current backoff multiplier (>= 1.0).
    pub backoff: f64,
    /// Current temperature.
    pub temperature: i32,
}

impl RuleContext<'_> {
    /// Probability that a cell attempts to melt this tick.
    pub fn melt_chance(&self) -> f64 {
        self.physics.melt.base_chance * 2.0_f64.powf(f64::from(self.temperature) / 2.0)
    }
}

/// Run the rules for the particle at `(y, x)` in priority order.
///
/// Returns the transition that fired, or `None` when no rule applied and
/// the particle should try to move.
pub fn apply(
    grid: &mut Grid,
    y: usize,
    x: usize,
    ctx: &RuleContext<'_>,
    rng: &mut impl Rng,
) -> Option<Transition> {
    let particle = grid.get(y, x)?;
    let promoted = match particle {
        ParticleType::Empty => return None,
        ParticleType::SnowFlake => compresses(grid, y, x, &ctx.physics.compression),
        ParticleType::Settled => packs(grid, y, x, &ctx.physics.packing, ctx.backoff),
        ParticleType::Packed => freezes(grid, y, x, &ctx.physics.ice, ctx.backoff),
        ParticleType::Ice => false,
    };

    if promoted {
        let to = particle.next_stage()?;
        grid.set(y, x, to);
        return Some(Transition::Promoted { from: particle, to });
    }

    melt(grid, y, x, particle, ctx, rng)
}

/// Whether the flake at `(y, x)` should become settled snow.
pub fn compresses(grid: &Grid, y: usize, x: usize, cfg: &CompressionConfig) -> bool {
    let at_floor = grid.is_floor(y, x);
    if at_floor && grid.neighbor(y, x, -1, 0).is_some_and(ParticleType::is_solid) {
        return true;
    }

    let mut in_bounds: u32 = 0;
    let mut solid_sides: u32 = 0;
    for (dy, dx) in ORTHOGONAL {
        if let Some(p) = grid.neighbor(y, x, dy, dx) {
            in_bounds = in_bounds.saturating_add(1);
            if p.is_solid() {
                solid_sides = solid_sides.saturating_add(1);
            }
        }
    }
    if in_bounds >= 3 && solid_sides >= cfg.enclosed_solid_neighbors {
        return true;
    }

    let flakes = count_neighbors(grid, y, x, |p| p == ParticleType::SnowFlake);
    let supported = at_floor || grid.neighbor(y, x, 1, 0).is_some_and(ParticleType::is_solid);

    let (needed, ticks) = if solid_sides >= cfg.crowded_solid_neighbors {
        (cfg.crowded_neighbors, cfg.crowded_ticks)
    } else if supported {
        (cfg.supported_neighbors, cfg.supported_ticks)
    } else {
        (cfg.base_neighbors, cfg.base_ticks)
    };

    flakes >= needed && grid.stationary_ticks(y, x) > ticks
}

/// Whether the settled cell at `(y, x)` should become packed snow.
pub fn packs(grid: &Grid, y: usize, x: usize, cfg: &PackingConfig, backoff: f64) -> bool {
    if u64::from(grid.stationary_ticks(y, x)) <= scaled_ticks(cfg.base_time, backoff) {
        return false;
    }
    if !grid.neighbor(y, x, 1, 0).is_some_and(ParticleType::is_solid) {
        return false;
    }
    let loose = |p: ParticleType| matches!(p, ParticleType::Settled | ParticleType::Packed);
    count_block(grid, y, x, loose) >= cfg.neighbor_threshold
        || column_depth(grid, y, x, loose) >= cfg.column_depth
}

/// Whether the packed cell at `(y, x)` should become ice.
pub fn freezes(grid: &Grid, y: usize, x: usize, cfg: &IceConfig, backoff: f64) -> bool {
    if u64::from(grid.stationary_ticks(y, x)) <= scaled_ticks(cfg.base_time, backoff) {
        return false;
    }
    let dense = |p: ParticleType| matches!(p, ParticleType::Packed | ParticleType::Ice);
    if !grid.neighbor(y, x, 1, 0).is_some_and(dense) {
        return false;
    }
    count_block(grid, y, x, dense) >= cfg.neighbor_threshold
        || column_depth(grid, y, x, dense) >= cfg.column_depth
}

/// Try to melt the particle at `(y, x)`.
///
/// Floor cells never melt. Solids also need an escape path: a non-floor
/// cell in the 3x3 block that is empty or holds a flake.
fn melt(
    grid: &mut Grid,
    y: usize,
    x: usize,
    particle: ParticleType,
    ctx: &RuleContext<'_>,
    rng: &mut impl Rng,
) -> Option<Transition> {
    if rng.random::<f64>() >= ctx.melt_chance() {
        return None;
    }
    if grid.is_floor(y, x) {
        return None;
    }
    if particle != ParticleType::SnowFlake && !has_escape_path(grid, y, x) {
        return None;
    }

    let m: &MeltConfig = &ctx.physics.melt;
    let to = match particle {
        ParticleType::Empty => return None,
        ParticleType::SnowFlake => Some(ParticleType::Empty),
        ParticleType::Settled => {
            if rng.random::<f64>() < m.settled_to_packed {
                Some(ParticleType::Packed)
            } else if rng.random::<f64>() < m.settled_to_empty {
                Some(ParticleType::Empty)
            } else {
                None
            }
        }
        ParticleType::Packed => {
            if rng.random::<f64>() < m.packed_to_ice {
                Some(ParticleType::Ice)
            } else if rng.random::<f64>() < m.packed_to_empty {
                Some(ParticleType::Empty)
            } else {
                None
            }
        }
        ParticleType::Ice => (rng.random::<f64>() < m.ice_to_empty).then_some(ParticleType::Empty),
    };

    match to {
        Some(to) => {
            grid.set(y, x, to);
            Some(Transition::Melted { from: particle, to })
        }
        None => Some(Transition::MeltHeld),
    }
}

fn has_escape_path(grid: &Grid, y: usize, x: usize) -> bool {
    NEIGHBORS.iter().any(|&(dy, dx)| {
        grid.offset(y, x, dy, dx).is_some_and(|(ny, nx)| {
            !grid.is_floor(ny, nx)
                && grid
                    .get(ny, nx)
                    .is_some_and(|p| matches!(p, ParticleType::Empty | ParticleType::SnowFlake))
        })
    })
}

/// Neighbours of `(y, x)` (center excluded) matching `pred`.
fn count_neighbors(grid: &Grid, y: usize, x: usize, pred: impl Fn(ParticleType) -> bool) -> u32 {
    let n = NEIGHBORS
        .iter()
        .filter(|&&(dy, dx)| grid.neighbor(y, x, dy, dx).is_some_and(&pred))
        .count();
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Cells of the 3x3 block around `(y, x)` (center included) matching `pred`.
fn count_block(grid: &Grid, y: usize, x: usize, pred: impl Fn(ParticleType) -> bool) -> u32 {
    let center = u32::from(grid.get(y, x).is_some_and(&pred));
    count_neighbors(grid, y, x, pred).saturating_add(center)
}

/// Length of the unbroken run of `pred` cells directly below `(y, x)`.
fn column_depth(grid: &Grid, y: usize, x: usize, pred: impl Fn(ParticleType) -> bool) -> u32 {
    let mut depth: u32 = 0;
    let mut row = y;
    loop {
        row = match row.checked_add(1) {
            Some(r) => r,
            None => return depth,
        };
        if !grid.get(row, x).is_some_and(&pred) {
            return depth;
        }
        depth = depth.saturating_add(1);
    }
}

/// `floor(base * backoff)` as a tick count.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scaled_ticks(base: f64, backoff: f64) -> u64 {
    // Saturating float-to-int cast; negative and NaN become 0.
    (base * backoff).floor() as u64
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::unreachable,
    clippy::arithmetic_side_effects
)]
mod tests {
    use drift_types::GridDimensions;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn grid() -> Grid {
        Grid::new(GridDimensions {
            width: 20,
            height: 12,
            visible_start: 5,
            visible_width: 10,
            floor_start: 4,
            floor_width: 12,
        })
        .unwrap()
    }

    fn no_melt() -> PhysicsConfig {
        let mut physics = PhysicsConfig::default();
        physics.melt.base_chance = 0.0;
        physics
    }

    fn always_melt() -> PhysicsConfig {
        let mut physics = PhysicsConfig::default();
        physics.melt.base_chance = 1.0;
        physics
    }

    fn ctx(physics: &PhysicsConfig) -> RuleContext<'_> {
        RuleContext {
            physics,
            backoff: 1.0,
            temperature: 0,
        }
    }

    #[test]
    fn floor_flake_under_solid_compresses_immediately() {
        let mut g = grid();
        // floor row is 10
        g.spawn_flake(10, 8, 0);
        g.set(9, 8, ParticleType::Settled);
        let physics = no_melt();
        let mut rng = StdRng::seed_from_u64(1);
        let t = apply(&mut g, 10, 8, &ctx(&physics), &mut rng);
        assert_eq!(
            t,
            Some(Transition::Promoted {
                from: ParticleType::SnowFlake,
                to: ParticleType::Settled
            })
        );
        assert_eq!(g.get(10, 8), Some(ParticleType::Settled));
    }

    #[test]
    fn enclosed_flake_compresses_immediately() {
        let mut g = grid();
        g.spawn_flake(5, 8, 0);
        g.set(5, 7, ParticleType::Settled);
        g.set(5, 9, ParticleType::Packed);
        g.set(6, 8, ParticleType::Ice);
        assert!(compresses(&g, 5, 8, &CompressionConfig::default()));
    }

    #[test]
    fn unsupported_cluster_needs_four_flakes_and_time() {
        let mut g = grid();
        for (y, x) in [(4, 7), (4, 8), (4, 9), (5, 7), (5, 9), (5, 8)] {
            g.spawn_flake(y, x, 0);
        }
        let cfg = CompressionConfig::default();
        g.set_stationary(5, 8, 15);
        assert!(!compresses(&g, 5, 8, &cfg));
        g.set_stationary(5, 8, 16);
        assert!(compresses(&g, 5, 8, &cfg));
    }

    #[test]
    fn supported_flake_uses_lower_tier() {
        let mut g = grid();
        g.spawn_flake(5, 8, 0);
        g.spawn_flake(5, 7, 0);
        g.spawn_flake(4, 8, 0);
        g.spawn_flake(4, 9, 0);
        g.set(6, 8, ParticleType::Settled);
        let cfg = CompressionConfig::default();
        g.set_stationary(5, 8, 8);
        assert!(!compresses(&g, 5, 8, &cfg));
        g.set_stationary(5, 8, 9);
        assert!(compresses(&g, 5, 8, &cfg));
    }

    #[test]
    fn crowded_flake_uses_lowest_tier() {
        let mut g = grid();
        g.spawn_flake(5, 8, 0);
        g.set(5, 7, ParticleType::Settled);
        g.set(6, 8, ParticleType::Settled);
        g.spawn_flake(4, 7, 0);
        g.spawn_flake(4, 9, 0);
        g.set_stationary(5, 8, 5);
        assert!(compresses(&g, 5, 8, &CompressionConfig::default()));
    }

    #[test]
    fn isolated_flake_never_compresses() {
        let mut g = grid();
        g.spawn_flake(5, 8, 0);
        g.set_stationary(5, 8, 1000);
        assert!(!compresses(&g, 5, 8, &CompressionConfig::default()));
    }

    #[test]
    fn packing_requires_time_support_and_density() {
        let mut g = grid();
        for y in 6..=10 {
            g.set(y, 8, ParticleType::Settled);
        }
        let cfg = PackingConfig::default();
        g.set_stationary(6, 8, 1000);
        assert!(!packs(&g, 6, 8, &cfg, 1.0));
        g.set_stationary(6, 8, 1001);
        // column of 4 below
        assert!(packs(&g, 6, 8, &cfg, 1.0));
        // backoff raises the bar
        assert!(!packs(&g, 6, 8, &cfg, 2.0));
    }

    #[test]
    fn packing_by_neighbourhood() {
        let mut g = grid();
        for y in 4..=6 {
            for x in 7..=9 {
                g.set(y, x, ParticleType::Settled);
            }
        }
        g.set(4, 7, ParticleType::Empty);
        g.set(4, 9, ParticleType::Empty);
        g.set_stationary(5, 8, 1001);
        // 7 settled cells in the block, settled below, column depth 1
        assert!(packs(&g, 5, 8, &PackingConfig::default(), 1.0));
        g.set(6, 7, ParticleType::Empty);
        assert!(!packs(&g, 5, 8, &PackingConfig::default(), 1.0));
    }

    #[test]
    fn ice_requires_dense_support() {
        let mut g = grid();
        for y in 4..=9 {
            g.set(y, 8, ParticleType::Packed);
        }
        let cfg = IceConfig::default();
        g.set_stationary(4, 8, 2001);
        assert!(freezes(&g, 4, 8, &cfg, 1.0));
        g.set(5, 8, ParticleType::Settled);
        assert!(!freezes(&g, 4, 8, &cfg, 1.0));
    }

    #[test]
    fn floor_cells_never_melt() {
        let mut g = grid();
        g.set(10, 8, ParticleType::Settled);
        g.spawn_flake(10, 9, 0);
        let physics = always_melt();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            assert_eq!(apply(&mut g, 10, 8, &ctx(&physics), &mut rng), None);
        }
        assert_eq!(g.get(10, 8), Some(ParticleType::Settled));
    }

    #[test]
    fn airborne_flake_melts_on_success() {
        let mut g = grid();
        g.spawn_flake(3, 8, 0);
        let physics = always_melt();
        let mut rng = StdRng::seed_from_u64(4);
        let t = apply(&mut g, 3, 8, &ctx(&physics), &mut rng);
        assert_eq!(
            t,
            Some(Transition::Melted {
                from: ParticleType::SnowFlake,
                to: ParticleType::Empty
            })
        );
        assert_eq!(g.get(3, 8), Some(ParticleType::Empty));
    }

    #[test]
    fn buried_solid_cannot_melt() {
        let mut g = grid();
        for y in 2..=6 {
            for x in 6..=10 {
                g.set(y, x, ParticleType::Ice);
            }
        }
        g.set(4, 8, ParticleType::Settled);
        let physics = always_melt();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            assert_eq!(apply(&mut g, 4, 8, &ctx(&physics), &mut rng), None);
        }
    }

    #[test]
    fn exposed_solid_melt_consumes_turn() {
        let mut g = grid();
        g.set(5, 8, ParticleType::Ice);
        let mut physics = always_melt();
        physics.melt.ice_to_empty = 0.0;
        let mut rng = StdRng::seed_from_u64(6);
        assert_eq!(
            apply(&mut g, 5, 8, &ctx(&physics), &mut rng),
            Some(Transition::MeltHeld)
        );
        assert_eq!(g.get(5, 8), Some(ParticleType::Ice));

        physics.melt.ice_to_empty = 1.0;
        assert_eq!(
            apply(&mut g, 5, 8, &ctx(&physics), &mut rng),
            Some(Transition::Melted {
                from: ParticleType::Ice,
                to: ParticleType::Empty
            })
        );
    }

    #[test]
    fn melting_settled_can_refreeze() {
        let mut g = grid();
        g.set(5, 8, ParticleType::Settled);
        let mut physics = always_melt();
        physics.melt.settled_to_packed = 1.0;
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(
            apply(&mut g, 5, 8, &ctx(&physics), &mut rng),
            Some(Transition::Melted {
                from: ParticleType::Settled,
                to: ParticleType::Packed
            })
        );
    }

    #[test]
    fn melting_settled_evaporates_when_refreeze_draw_fails() {
        let mut g = grid();
        g.set(5, 8, ParticleType::Settled);
        let mut physics = always_melt();
        physics.melt.settled_to_packed = 0.0;
        physics.melt.settled_to_empty = 1.0;
        let mut rng = StdRng::seed_from_u64(8);
        assert_eq!(
            apply(&mut g, 5, 8, &ctx(&physics), &mut rng),
            Some(Transition::Melted {
                from: ParticleType::Settled,
                to: ParticleType::Empty
            })
        );
        assert_eq!(g.get(5, 8), Some(ParticleType::Empty));
    }

    #[test]
    fn melting_packed_branches() {
        let mut physics = always_melt();
        physics.melt.packed_to_ice = 1.0;
        let mut g = grid();
        g.set(5, 8, ParticleType::Packed);
        let mut rng = StdRng::seed_from_u64(9);
        assert_eq!(
            apply(&mut g, 5, 8, &ctx(&physics), &mut rng),
            Some(Transition::Melted {
                from: ParticleType::Packed,
                to: ParticleType::Ice
            })
        );

        physics.melt.packed_to_ice = 0.0;
        physics.melt.packed_to_empty = 1.0;
        let mut g = grid();
        g.set(5, 8, ParticleType::Packed);
        assert_eq!(
            apply(&mut g, 5, 8, &ctx(&physics), &mut rng),
            Some(Transition::Melted {
                from: ParticleType::Packed,
                to: ParticleType::Empty
            })
        );
        assert_eq!(g.get(5, 8), Some(ParticleType::Empty));
    }

    #[test]
    fn melt_branches_draw_independently() {
        let mut physics = always_melt();
        physics.melt.packed_to_ice = 0.5;
        physics.melt.packed_to_empty = 0.5;
        let mut rng = StdRng::seed_from_u64(10);
        let (mut ice, mut empty, mut held) = (0_u32, 0_u32, 0_u32);
        let trials = 20_000_u32;
        for _ in 0..trials {
            let mut g = grid();
            g.set(5, 8, ParticleType::Packed);
            match apply(&mut g, 5, 8, &ctx(&physics), &mut rng) {
                Some(Transition::Melted {
                    to: ParticleType::Ice,
                    ..
                }) => ice += 1,
                Some(Transition::Melted {
                    to: ParticleType::Empty,
                    ..
                }) => empty += 1,
                Some(Transition::MeltHeld) => held += 1,
                other => unreachable!("unexpected outcome {other:?}"),
            }
        }
        let share = |n: u32| f64::from(n) / f64::from(trials);
        // the second draw only happens when the first fails: 1/2, 1/4, 1/4
        assert!((share(ice) - 0.5).abs() < 0.02, "ice {ice}");
        assert!((share(empty) - 0.25).abs() < 0.02, "empty {empty}");
        assert!((share(held) - 0.25).abs() < 0.02, "held {held}");
    }

    #[test]
    fn solid_beside_floor_needs_a_non_floor_opening() {
        let mut g = grid();
        // floor row is 10; wall in (9, 8) with ice except one floor cell
        for y in 8..=10 {
            for x in 7..=9 {
                g.set(y, x, ParticleType::Ice);
            }
        }
        g.set(9, 8, ParticleType::Settled);
        g.set(10, 7, ParticleType::Empty);
        assert!(g.is_floor(10, 7));
        let physics = always_melt();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            assert_eq!(apply(&mut g, 9, 8, &ctx(&physics), &mut rng), None);
        }
        assert_eq!(g.get(9, 8), Some(ParticleType::Settled));

        g.set(8, 8, ParticleType::Empty);
        assert!(apply(&mut g, 9, 8, &ctx(&physics), &mut rng).is_some());
    }

    #[test]
    fn melt_chance_doubles_every_two_degrees() {
        let physics = PhysicsConfig::default();
        let mut c = ctx(&physics);
        let base = c.melt_chance();
        assert!((base - 0.001).abs() < 1e-12);
        c.temperature = 2;
        assert!((c.melt_chance() - 0.002).abs() < 1e-12);
        c.temperature = -4;
        assert!((c.melt_chance() - 0.000_25).abs() < 1e-12);
    }

    #[test]
    fn scaled_ticks_floors() {
        assert_eq!(scaled_ticks(1000.0, 1.0), 1000);
        assert_eq!(scaled_ticks(1000.0, 1.0005), 1000);
        assert_eq!(scaled_ticks(1000.0, 2.5), 2500);
    }
}
