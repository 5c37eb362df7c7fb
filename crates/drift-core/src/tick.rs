//! Tick cycle: one step of the snow simulation.
//!
//! Each tick runs these phases in order while the caller holds exclusive
//! access to the [`SimulationState`]:
//!
//! 1. **Spawn** -- drop new flakes into random empty top-row columns of
//!    the viewport, unless spawning is off or the flake cap is reached.
//!
//! 2. **Wind** -- advance the wind controller one tick.
//!
//! 3. **Backoff** -- recompute the compaction-time multiplier from the
//!    current pile height.
//!
//! 4. **Relief** -- near the flake cap, clear the off-screen part of the
//!    bottom row.
//!
//! 5. **Age** -- advance every flake's existence counter.
//!
//! 6. **Main pass** -- visit rows bottom-up (from the floor row to the
//!    top), columns left to right. Each particle updates its stationary
//!    counter, runs the transition rules, and moves if no rule fired.
//!
//! Given the same state and random sequence, a tick is deterministic.

use drift_types::{Direction, GridDimensions, ParticleType};
use drift_world::{BackoffController, Grid, WindController, WorldError};
use rand::Rng;
use rand::seq::index;
use tracing::debug;

use crate::config::{PhysicsConfig, SimulationConfig, WorldConfig};
use crate::movement;
use crate::params::SimulationParameters;
use crate::rules::{self, RuleContext, Transition};

/// Mass used for a flake whose variant has no configured mass.
const DEFAULT_MASS: f64 = 1.0;

/// Errors that can occur during tick execution.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// The tick counter cannot be advanced further.
    #[error("tick counter overflow at tick {tick}")]
    TickOverflow {
        /// The last tick that completed.
        tick: u64,
    },
}

/// Summary of a single tick's execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickSummary {
    /// The tick number that was executed.
    pub tick: u64,
    /// Flakes spawned this tick.
    pub spawned: usize,
    /// Forward compaction promotions (compression, packing, ice).
    pub promotions: usize,
    /// Successful melt draws, including ones that changed nothing.
    pub melts: usize,
    /// Particles that moved.
    pub moves: usize,
    /// Flakes removed at the outermost columns.
    pub blown_off: usize,
    /// Particles removed by the relief valve.
    pub relieved: usize,
    /// Falling flakes at the end of the tick.
    pub flakes: usize,
    /// Settled, packed, and ice cells at the end of the tick.
    pub solids: usize,
    /// Wind force applied this tick.
    pub wind: f64,
    /// Backoff multiplier applied this tick.
    pub backoff: f64,
}

/// The mutable simulation state passed through the tick cycle.
///
/// Shared between the tick loop and the front-end behind a lock; the
/// input methods below are what the front-end calls while holding it.
#[derive(Debug, Clone)]
pub struct SimulationState {
    /// The particle grid.
    pub grid: Grid,
    /// Horizontal wind.
    pub wind: WindController,
    /// Compaction-time backoff.
    pub backoff: BackoffController,
    /// Live spawn and temperature settings.
    pub params: SimulationParameters,
    /// Rule thresholds.
    pub physics: PhysicsConfig,
    /// Population cap and spawn sampling.
    pub world: WorldConfig,
    /// Mass of each flake variant.
    pub masses: Vec<f64>,
    /// Number of ticks completed.
    pub tick: u64,
}

impl SimulationState {
    /// Build a fresh state with an empty grid of the given geometry.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError`] if the geometry is inconsistent.
    pub fn new(config: &SimulationConfig, dims: GridDimensions) -> Result<Self, WorldError> {
        Ok(Self {
            grid: Grid::new(dims)?,
            wind: WindController::new(config.wind),
            backoff: BackoffController::new(config.backoff),
            params: SimulationParameters::from_config(&config.parameters),
            physics: config.physics.clone(),
            world: config.world.clone(),
            masses: config.flake_masses(),
            tick: 0,
        })
    }

    /// Mass of a flake variant, `1.0` when the variant is unknown.
    pub fn mass(&self, variant: usize) -> f64 {
        self.masses.get(variant).copied().unwrap_or(DEFAULT_MASS)
    }

    /// Enable or disable spawning.
    pub const fn set_spawn_enabled(&mut self, enabled: bool) {
        self.params.set_spawn_enabled(enabled);
    }

    /// Flip spawning and return the new state.
    pub const fn toggle_spawning(&mut self) -> bool {
        self.params.toggle_spawning()
    }

    /// Change the spawn rate by `delta`, clamped to its bounds.
    pub fn adjust_spawn_rate(&mut self, delta: f64) -> f64 {
        self.params.adjust_spawn_rate(delta)
    }

    /// Set the wind target (clamped), scheduling its expiry.
    pub fn set_wind_target(&mut self, force: f64, rng: &mut impl Rng) {
        self.wind.set_target(force, rng);
    }

    /// Start a gust in the given direction.
    pub fn gust(&mut self, direction: Direction, rng: &mut impl Rng) {
        self.wind.gust(direction, rng);
    }

    /// Change the temperature by `delta`, clamped to its bounds.
    pub fn adjust_temperature(&mut self, delta: i32) -> i32 {
        self.params.adjust_temperature(delta)
    }

    /// Set one cell's particle type. Out-of-range writes return `false`.
    pub fn set(&mut self, y: usize, x: usize, particle: ParticleType) -> bool {
        self.grid.set(y, x, particle)
    }

    /// Reshape the grid for a new viewport, keeping overlapping content.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError`] if the new geometry is inconsistent.
    pub fn resize(&mut self, dims: GridDimensions) -> Result<(), WorldError> {
        self.grid.apply_dimensions(dims)
    }
}

/// Execute one tick of the simulation.
///
/// # Errors
///
/// Returns [`TickError::TickOverflow`] if the tick counter is exhausted.
pub fn run_tick(
    state: &mut SimulationState,
    rng: &mut impl Rng,
) -> Result<TickSummary, TickError> {
    let tick = state
        .tick
        .checked_add(1)
        .ok_or(TickError::TickOverflow { tick: state.tick })?;

    // Phase 1: spawn
    let spawned = spawn(state, rng);

    // Phase 2-3: environment
    state.wind.tick();
    let backoff = state.backoff.recompute(&state.grid);

    // Phase 4: relief valve
    let relieved = if relief_due(&state.grid, &state.world) {
        state.grid.clear_bottom_outside_visible()
    } else {
        0
    };

    // Phase 5: age
    state.grid.age_flakes();

    // Phase 6: main pass
    let ctx = RuleContext {
        physics: &state.physics,
        backoff,
        temperature: state.params.temperature,
    };
    let pass = main_pass(&mut state.grid, &ctx, &state.masses, state.wind.current(), rng);

    state.tick = tick;
    let counts = state.grid.counts();
    let summary = TickSummary {
        tick,
        spawned,
        promotions: pass.promotions,
        melts: pass.melts,
        moves: pass.moves,
        blown_off: pass.blown_off,
        relieved,
        flakes: counts.snow_flakes,
        solids: counts.solids(),
        wind: state.wind.current(),
        backoff,
    };

    debug!(
        tick,
        spawned,
        promotions = summary.promotions,
        melts = summary.melts,
        moves = summary.moves,
        flakes = summary.flakes,
        "Tick complete"
    );

    Ok(summary)
}

/// Spawn flakes into sampled top-row columns of the viewport.
fn spawn(state: &mut SimulationState, rng: &mut impl Rng) -> usize {
    if !state.params.spawn_enabled {
        return 0;
    }
    let cap = state.world.max_snowflakes;
    let mut flakes = state.grid.count(ParticleType::SnowFlake);
    if flakes >= cap {
        return 0;
    }

    let dims = state.grid.dimensions();
    if dims.height == 0 || dims.visible_width == 0 || state.masses.is_empty() {
        return 0;
    }

    let sampled = dims
        .visible_width
        .checked_div(state.world.spawn_column_divisor)
        .unwrap_or(dims.visible_width)
        .max(state.world.min_spawn_columns)
        .min(dims.visible_width);

    let mut spawned: usize = 0;
    for offset in index::sample(rng, dims.visible_width, sampled) {
        if flakes >= cap {
            break;
        }
        let x = dims.visible_start.saturating_add(offset);
        if !state.grid.is_empty_at(0, x) || rng.random::<f64>() >= state.params.spawn_rate {
            continue;
        }
        let variant = rng.random_range(0..state.masses.len());
        let tint = rng.random::<u8>();
        if state.grid.spawn_tinted_flake(0, x, variant, tint) {
            spawned = spawned.saturating_add(1);
            flakes = flakes.saturating_add(1);
        }
    }
    spawned
}

/// Whether the flake population is close enough to the cap to relieve.
#[allow(clippy::cast_precision_loss)]
fn relief_due(grid: &Grid, world: &WorldConfig) -> bool {
    // Populations are far below 2^52.
    let flakes = grid.count(ParticleType::SnowFlake) as f64;
    flakes >= world.max_snowflakes as f64 * world.relief_fraction
}

/// Counts gathered by the main pass.
#[derive(Debug, Default)]
struct PassTotals {
    promotions: usize,
    melts: usize,
    moves: usize,
    blown_off: usize,
}

/// Cells that received a particle earlier in the current pass.
struct Visited {
    width: usize,
    marks: Vec<bool>,
}

impl Visited {
    fn new(dims: GridDimensions) -> Self {
        Self {
            width: dims.width,
            marks: vec![false; dims.cell_count()],
        }
    }

    fn slot(&self, y: usize, x: usize) -> Option<usize> {
        y.checked_mul(self.width)?.checked_add(x)
    }

    fn mark(&mut self, y: usize, x: usize) {
        if let Some(mark) = self.slot(y, x).and_then(|i| self.marks.get_mut(i)) {
            *mark = true;
        }
    }

    fn contains(&self, y: usize, x: usize) -> bool {
        self.slot(y, x)
            .and_then(|i| self.marks.get(i))
            .copied()
            .unwrap_or(false)
    }
}

fn main_pass(
    grid: &mut Grid,
    ctx: &RuleContext<'_>,
    masses: &[f64],
    wind: f64,
    rng: &mut impl Rng,
) -> PassTotals {
    let mut totals = PassTotals::default();
    let dims = grid.dimensions();
    let Some(floor_row) = dims.floor_row() else {
        return totals;
    };
    let last_column = dims.width.saturating_sub(1);
    let mut visited = Visited::new(dims);

    for y in (0..=floor_row).rev() {
        for x in 0..dims.width {
            let Some(cell) = grid.cell(y, x).copied() else {
                continue;
            };
            if cell.particle == ParticleType::Empty || visited.contains(y, x) {
                continue;
            }

            if cell.particle == ParticleType::SnowFlake
                && (x == 0 || x == last_column)
                && !dims.is_visible_column(x)
            {
                grid.set(y, x, ParticleType::Empty);
                totals.blown_off = totals.blown_off.saturating_add(1);
                continue;
            }

            let below_blocked = y == floor_row
                || y.checked_add(1)
                    .and_then(|below| grid.get(below, x))
                    .is_some_and(ParticleType::is_particle);
            let at_floor = grid.is_floor(y, x);
            let resting = below_blocked || at_floor;
            if resting {
                grid.increment_stationary(y, x);
            }

            if let Some(transition) = rules::apply(grid, y, x, ctx, rng) {
                match transition {
                    Transition::Promoted { .. } => {
                        totals.promotions = totals.promotions.saturating_add(1);
                    }
                    Transition::Melted { .. } | Transition::MeltHeld => {
                        totals.melts = totals.melts.saturating_add(1);
                    }
                }
                continue;
            }

            let mass = if cell.particle == ParticleType::SnowFlake {
                masses.get(cell.variant).copied().unwrap_or(DEFAULT_MASS)
            } else {
                DEFAULT_MASS
            };
            if let Some((ty, tx)) = movement::step(grid, y, x, mass, wind, rng) {
                visited.mark(ty, tx);
                totals.moves = totals.moves.saturating_add(1);
            } else if !resting {
                grid.reset_stationary(y, x);
            }
        }
    }
    totals
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn quiet_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.parameters.spawn_enabled = false;
        config.physics.melt.base_chance = 0.0;
        config
    }

    fn dims() -> GridDimensions {
        GridDimensions {
            width: 40,
            height: 20,
            visible_start: 10,
            visible_width: 20,
            floor_start: 5,
            floor_width: 30,
        }
    }

    #[test]
    fn tick_advances_counter() {
        let mut state = SimulationState::new(&quiet_config(), dims()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let s1 = run_tick(&mut state, &mut rng).unwrap();
        let s2 = run_tick(&mut state, &mut rng).unwrap();
        assert_eq!(s1.tick, 1);
        assert_eq!(s2.tick, 2);
        assert_eq!(state.tick, 2);
    }

    #[test]
    fn tick_overflow_is_an_error() {
        let mut state = SimulationState::new(&quiet_config(), dims()).unwrap();
        state.tick = u64::MAX;
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            run_tick(&mut state, &mut rng),
            Err(TickError::TickOverflow { tick: u64::MAX })
        ));
    }

    #[test]
    fn spawn_only_in_visible_top_row() {
        let mut config = quiet_config();
        config.parameters.spawn_enabled = true;
        config.parameters.spawn_rate = 1.0;
        config.parameters.max_spawn_rate = 1.0;
        config.world.min_spawn_columns = 20;
        let mut state = SimulationState::new(&config, dims()).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let spawned = spawn(&mut state, &mut rng);
        assert_eq!(spawned, 20);
        for x in 0..40 {
            if state.grid.get(0, x) == Some(ParticleType::SnowFlake) {
                assert!((10..30).contains(&x));
                assert!(state.grid.variant(0, x).unwrap() < 12);
            }
        }
        assert_eq!(state.grid.count(ParticleType::SnowFlake), spawned);
    }

    #[test]
    fn spawn_respects_cap_and_toggle() {
        let mut config = quiet_config();
        config.parameters.spawn_enabled = true;
        config.world.max_snowflakes = 2;
        let mut state = SimulationState::new(&config, dims()).unwrap();
        state.params.adjust_spawn_rate(1.0);
        let mut rng = StdRng::seed_from_u64(3);
        assert!(spawn(&mut state, &mut rng) <= 2);
        state.grid.clear();
        state.set_spawn_enabled(false);
        assert_eq!(spawn(&mut state, &mut rng), 0);
    }

    #[test]
    fn flake_on_edge_is_blown_off() {
        let mut state = SimulationState::new(&quiet_config(), dims()).unwrap();
        state.grid.spawn_flake(5, 0, 0);
        state.grid.spawn_flake(5, 39, 0);
        let mut rng = StdRng::seed_from_u64(4);
        let summary = run_tick(&mut state, &mut rng).unwrap();
        assert_eq!(summary.blown_off, 2);
        assert_eq!(state.grid.count(ParticleType::SnowFlake), 0);
    }

    #[test]
    fn visible_edge_flake_is_kept() {
        let mut state = SimulationState::new(
            &quiet_config(),
            GridDimensions {
                width: 20,
                height: 20,
                visible_start: 0,
                visible_width: 20,
                floor_start: 0,
                floor_width: 20,
            },
        )
        .unwrap();
        state.grid.spawn_flake(5, 0, 0);
        state.grid.spawn_flake(5, 19, 0);
        let mut rng = StdRng::seed_from_u64(4);
        let summary = run_tick(&mut state, &mut rng).unwrap();
        assert_eq!(summary.blown_off, 0);
        assert_eq!(state.grid.count(ParticleType::SnowFlake), 2);
    }

    #[test]
    fn relief_clears_offscreen_bottom_row() {
        let mut config = quiet_config();
        config.world.max_snowflakes = 1;
        let mut state = SimulationState::new(&config, dims()).unwrap();
        state.grid.set(19, 2, ParticleType::Packed);
        state.grid.set(19, 15, ParticleType::Packed);
        state.grid.spawn_flake(3, 15, 0);
        let mut rng = StdRng::seed_from_u64(5);
        let summary = run_tick(&mut state, &mut rng).unwrap();
        assert_eq!(summary.relieved, 1);
        assert_eq!(state.grid.get(19, 2), Some(ParticleType::Empty));
        assert_eq!(state.grid.get(19, 15), Some(ParticleType::Packed));
    }

    #[test]
    fn resting_particle_accumulates_stationary_time() {
        let mut state = SimulationState::new(&quiet_config(), dims()).unwrap();
        // floor row is 18; (18, 20) lies on the floor
        state.grid.set(18, 20, ParticleType::Settled);
        let mut rng = StdRng::seed_from_u64(6);
        for _ in 0..5 {
            run_tick(&mut state, &mut rng).unwrap();
        }
        assert_eq!(state.grid.stationary_ticks(18, 20), 5);
    }

    #[test]
    fn flake_ages_every_tick() {
        let mut state = SimulationState::new(&quiet_config(), dims()).unwrap();
        state.grid.spawn_flake(2, 20, 0);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..3 {
            run_tick(&mut state, &mut rng).unwrap();
        }
        let aged = (0..20)
            .flat_map(|y| (0..40).map(move |x| (y, x)))
            .find(|&(y, x)| state.grid.get(y, x) == Some(ParticleType::SnowFlake))
            .unwrap();
        assert_eq!(state.grid.existence_ticks(aged.0, aged.1), 3);
    }

    #[test]
    fn falling_flake_moves_at_most_one_row_per_tick() {
        let mut state = SimulationState::new(&quiet_config(), dims()).unwrap();
        state.grid.spawn_flake(0, 20, 0);
        let mut rng = StdRng::seed_from_u64(8);
        let summary = run_tick(&mut state, &mut rng).unwrap();
        assert_eq!(summary.moves, 1);
        assert_eq!(state.grid.get(0, 20), Some(ParticleType::Empty));
        let landed = [(1, 19), (1, 20), (1, 21)]
            .iter()
            .filter(|&&(y, x)| state.grid.get(y, x) == Some(ParticleType::SnowFlake))
            .count();
        assert_eq!(landed, 1);
    }

    #[test]
    fn input_methods_clamp() {
        let mut state = SimulationState::new(&quiet_config(), dims()).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        assert_eq!(state.adjust_temperature(50), 10);
        assert!((state.adjust_spawn_rate(-1.0) - 0.01).abs() < 1e-12);
        state.set_wind_target(3.0, &mut rng);
        assert!((state.wind.target() - 0.8).abs() < 1e-12);
        state.gust(Direction::Left, &mut rng);
        assert!(state.wind.target() < 0.0);
        assert!(state.toggle_spawning());
        assert!(state.set(0, 0, ParticleType::Ice));
        assert!(!state.set(99, 0, ParticleType::Ice));
    }

    #[test]
    fn unknown_variant_mass_defaults() {
        let state = SimulationState::new(&quiet_config(), dims()).unwrap();
        assert!((state.mass(0) - 1.0).abs() < 1e-12);
        assert!((state.mass(500) - DEFAULT_MASS).abs() < 1e-12);
    }
}
