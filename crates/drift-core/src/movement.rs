//! Weighted random movement for falling and settling particles.
//!
//! A particle collects candidate destinations, each with a weight, and one
//! is drawn by cumulative weight. Only empty, in-bounds cells are ever
//! candidates, so a move can never overwrite another particle.

use drift_types::ParticleType;
use drift_world::Grid;
use rand::Rng;

/// Base weight of a flake falling straight down.
pub const FLAKE_DOWN: f64 = 0.6;
/// Extra downward weight per unit of flake mass.
pub const FLAKE_DOWN_PER_MASS: f64 = 0.2;
/// Diagonal weight for a flake of mass 1 in still air.
pub const FLAKE_DIAGONAL: f64 = 0.1;
/// Scale of the sideways drift caused by wind.
pub const FLAKE_SIDEWAYS: f64 = 0.5;
/// Weight of settled or packed snow sliding straight down.
pub const SOLID_DOWN: f64 = 0.9;
/// Weight of settled or packed snow sliding diagonally.
pub const SOLID_DIAGONAL: f64 = 0.05;

/// A possible destination with its unnormalized weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Destination row.
    pub y: usize,
    /// Destination column.
    pub x: usize,
    /// Positive, unnormalized weight.
    pub weight: f64,
}

/// Candidate moves for the particle at `(y, x)`.
///
/// Floor-resting particles, ice, and empty cells have no candidates.
/// `mass` is the flake's variant mass; `wind` is the current wind force.
pub fn candidates(grid: &Grid, y: usize, x: usize, mass: f64, wind: f64) -> Vec<Candidate> {
    let mut out = Vec::with_capacity(4);
    if grid.is_floor(y, x) {
        return out;
    }
    let Some(particle) = grid.get(y, x) else {
        return out;
    };

    let mut push = |dy: isize, dx: isize, weight: f64| {
        if weight <= 0.0 || !weight.is_finite() {
            return;
        }
        let target = grid
            .offset(y, x, dy, dx)
            .filter(|&(ny, nx)| grid.is_empty_at(ny, nx));
        if let Some((ny, nx)) = target {
            out.push(Candidate { y: ny, x: nx, weight });
        }
    };

    match particle {
        ParticleType::SnowFlake => {
            let mass = if mass.is_finite() && mass > 0.0 { mass } else { 1.0 };
            let bias = wind / mass;
            push(1, 0, FLAKE_DOWN_PER_MASS.mul_add(mass, FLAKE_DOWN));
            push(1, -1, FLAKE_DIAGONAL / mass - bias);
            push(1, 1, FLAKE_DIAGONAL / mass + bias);
            let drift = bias.abs() * FLAKE_SIDEWAYS / mass;
            if bias < 0.0 {
                push(0, -1, drift);
            } else if bias > 0.0 {
                push(0, 1, drift);
            }
        }
        ParticleType::Settled | ParticleType::Packed => {
            push(1, 0, SOLID_DOWN);
            push(1, -1, SOLID_DIAGONAL);
            push(1, 1, SOLID_DIAGONAL);
        }
        ParticleType::Empty | ParticleType::Ice => {}
    }
    out
}

/// Pick a candidate by cumulative weight.
///
/// `draw` is a uniform sample in `[0, 1)`. Returns `None` when there are
/// no candidates.
pub fn choose(candidates: &[Candidate], draw: f64) -> Option<(usize, usize)> {
    let total: f64 = candidates.iter().map(|c| c.weight).sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }
    let target = draw.clamp(0.0, 1.0) * total;
    let mut cumulative = 0.0;
    for c in candidates {
        cumulative += c.weight;
        if target < cumulative {
            return Some((c.y, c.x));
        }
    }
    candidates.last().map(|c| (c.y, c.x))
}

/// Move the particle at `(y, x)` to a randomly chosen candidate.
///
/// Returns the destination, or `None` if the particle stayed put.
pub fn step(
    grid: &mut Grid,
    y: usize,
    x: usize,
    mass: f64,
    wind: f64,
    rng: &mut impl Rng,
) -> Option<(usize, usize)> {
    let options = candidates(grid, y, x, mass, wind);
    if options.is_empty() {
        return None;
    }
    let to = choose(&options, rng.random::<f64>())?;
    grid.move_particle((y, x), to).then_some(to)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use drift_types::GridDimensions;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn grid() -> Grid {
        Grid::new(GridDimensions {
            width: 12,
            height: 10,
            visible_start: 2,
            visible_width: 8,
            floor_start: 2,
            floor_width: 8,
        })
        .unwrap()
    }

    fn weight_to(cands: &[Candidate], y: usize, x: usize) -> Option<f64> {
        cands.iter().find(|c| c.y == y && c.x == x).map(|c| c.weight)
    }

    #[test]
    fn still_air_flake_weights() {
        let mut g = grid();
        g.spawn_flake(3, 5, 0);
        let cands = candidates(&g, 3, 5, 1.0, 0.0);
        assert_eq!(cands.len(), 3);
        assert!((weight_to(&cands, 4, 5).unwrap() - 0.8).abs() < 1e-12);
        assert!((weight_to(&cands, 4, 4).unwrap() - 0.1).abs() < 1e-12);
        assert!((weight_to(&cands, 4, 6).unwrap() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn wind_skews_and_adds_sideways() {
        let mut g = grid();
        g.spawn_flake(3, 5, 0);
        let cands = candidates(&g, 3, 5, 1.0, 0.5);
        // left diagonal weight 0.1 - 0.5 is discarded
        assert!(weight_to(&cands, 4, 4).is_none());
        assert!((weight_to(&cands, 4, 6).unwrap() - 0.6).abs() < 1e-12);
        assert!((weight_to(&cands, 3, 6).unwrap() - 0.25).abs() < 1e-12);
        assert!(weight_to(&cands, 3, 4).is_none());
    }

    #[test]
    fn only_empty_destinations() {
        let mut g = grid();
        g.spawn_flake(3, 5, 0);
        g.set(4, 5, ParticleType::Settled);
        g.spawn_flake(4, 4, 0);
        let cands = candidates(&g, 3, 5, 1.0, 0.0);
        assert_eq!(cands.len(), 1);
        assert!(weight_to(&cands, 4, 6).is_some());
    }

    #[test]
    fn floor_and_ice_do_not_move() {
        let mut g = grid();
        g.spawn_flake(8, 5, 0);
        assert!(candidates(&g, 8, 5, 1.0, 0.0).is_empty());
        g.set(3, 5, ParticleType::Ice);
        assert!(candidates(&g, 3, 5, 1.0, 0.0).is_empty());
    }

    #[test]
    fn off_floor_particle_in_floor_row_can_fall() {
        let mut g = grid();
        g.set(8, 0, ParticleType::Settled);
        let cands = candidates(&g, 8, 0, 1.0, 0.0);
        assert!(weight_to(&cands, 9, 0).is_some());
    }

    #[test]
    fn solid_weights_ignore_wind() {
        let mut g = grid();
        g.set(3, 5, ParticleType::Packed);
        let cands = candidates(&g, 3, 5, 1.0, 0.8);
        assert!((weight_to(&cands, 4, 5).unwrap() - 0.9).abs() < 1e-12);
        assert!((weight_to(&cands, 4, 4).unwrap() - 0.05).abs() < 1e-12);
        assert!((weight_to(&cands, 4, 6).unwrap() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn choose_by_cumulative_weight() {
        let cands = [
            Candidate { y: 1, x: 0, weight: 0.8 },
            Candidate { y: 1, x: 1, weight: 0.2 },
        ];
        assert_eq!(choose(&cands, 0.0), Some((1, 0)));
        assert_eq!(choose(&cands, 0.79), Some((1, 0)));
        assert_eq!(choose(&cands, 0.81), Some((1, 1)));
        assert_eq!(choose(&cands, 0.999_999), Some((1, 1)));
        assert_eq!(choose(&[], 0.5), None);
    }

    #[test]
    fn step_moves_into_chosen_cell() {
        let mut g = grid();
        g.spawn_flake(3, 5, 2);
        let mut rng = StdRng::seed_from_u64(9);
        let to = step(&mut g, 3, 5, 1.0, 0.0, &mut rng).unwrap();
        assert_eq!(g.get(3, 5), Some(ParticleType::Empty));
        assert_eq!(g.get(to.0, to.1), Some(ParticleType::SnowFlake));
        assert_eq!(g.variant(to.0, to.1), Some(2));
    }
}
