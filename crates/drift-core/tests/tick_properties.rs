//! Whole-tick properties of the snow simulation: conservation, floor
//! stability, single-step compaction, fall statistics, and resize.

#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

use drift_core::config::{FlakeVariant, SimulationConfig};
use drift_core::rules::{self, RuleContext};
use drift_core::tick::{SimulationState, run_tick};
use drift_types::{GridDimensions, ParticleType};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn dims(width: usize, height: usize) -> GridDimensions {
    GridDimensions {
        width,
        height,
        visible_start: width / 4,
        visible_width: width / 2,
        floor_start: width / 8,
        floor_width: width * 3 / 4,
    }
}

/// No spawning and no melting.
fn quiet() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.parameters.spawn_enabled = false;
    config.physics.melt.base_chance = 0.0;
    config
}

/// Quiet, and no rule can promote a particle.
fn frozen_rules() -> SimulationConfig {
    let mut config = quiet();
    let c = &mut config.physics.compression;
    c.base_neighbors = 99;
    c.supported_neighbors = 99;
    c.crowded_neighbors = 99;
    c.enclosed_solid_neighbors = 99;
    config.physics.packing.base_time = 1e9;
    config.physics.ice.base_time = 1e9;
    config
}

fn total_particles(state: &SimulationState) -> usize {
    state.grid.counts().total()
}

#[test]
fn particles_are_conserved_without_spawn_or_transitions() {
    let mut state = SimulationState::new(&frozen_rules(), dims(40, 20)).unwrap();
    let mut rng = StdRng::seed_from_u64(11);
    for y in 2..8 {
        for x in 15..25 {
            match rng.random_range(0..4) {
                0 => {
                    state.grid.spawn_flake(y, x, rng.random_range(0..12));
                }
                1 => {
                    state.grid.set(y, x, ParticleType::Settled);
                }
                2 => {
                    state.grid.set(y, x, ParticleType::Packed);
                }
                _ => {}
            }
        }
    }
    let before = total_particles(&state);
    assert!(before > 0);

    for _ in 0..8 {
        let summary = run_tick(&mut state, &mut rng).unwrap();
        assert_eq!(summary.promotions, 0);
        assert_eq!(summary.melts, 0);
        assert_eq!(summary.blown_off, 0);
        assert_eq!(total_particles(&state), before);
    }
}

#[test]
fn floor_particles_never_move_or_melt() {
    let mut config = SimulationConfig::default();
    config.parameters.spawn_enabled = false;
    config.physics.melt.base_chance = 1.0;
    let mut state = SimulationState::new(&config, dims(40, 20)).unwrap();
    state.adjust_temperature(10);

    let floor = state.grid.dimensions().floor_row().unwrap();
    let kinds = [
        ParticleType::Settled,
        ParticleType::Packed,
        ParticleType::Ice,
    ];
    let floor_cells: Vec<(usize, ParticleType)> = (5..35)
        .zip(kinds.iter().cycle().copied())
        .collect();
    for &(x, kind) in &floor_cells {
        state.grid.set(floor, x, kind);
    }

    let mut rng = StdRng::seed_from_u64(12);
    for _ in 0..50 {
        run_tick(&mut state, &mut rng).unwrap();
    }
    for &(x, kind) in &floor_cells {
        assert_eq!(state.grid.get(floor, x), Some(kind), "floor cell {x} changed");
    }
}

#[test]
fn rules_advance_one_stage_or_empty() {
    let mut config = SimulationConfig::default();
    config.physics.melt.base_chance = 0.5;
    config.physics.packing.base_time = 2.0;
    config.physics.ice.base_time = 2.0;
    let mut rng = StdRng::seed_from_u64(13);

    for round in 0..20 {
        let mut state = SimulationState::new(&config, dims(24, 14)).unwrap();
        for y in 0..14 {
            for x in 0..24 {
                let kind = ParticleType::ALL[rng.random_range(0..ParticleType::ALL.len())];
                state.grid.set(y, x, kind);
                if kind.is_particle() {
                    state.grid.set_stationary(y, x, rng.random_range(0..40));
                }
            }
        }
        let ctx = RuleContext {
            physics: &config.physics,
            backoff: 1.0,
            temperature: 4,
        };
        for y in 0..14 {
            for x in 0..24 {
                let before = state.grid.get(y, x).unwrap();
                rules::apply(&mut state.grid, y, x, &ctx, &mut rng);
                let after = state.grid.get(y, x).unwrap();
                assert!(
                    after == before
                        || after == ParticleType::Empty
                        || before.next_stage() == Some(after),
                    "round {round}: {before:?} -> {after:?} at ({y}, {x})"
                );
            }
        }
    }
}

#[test]
fn single_flake_falls_straight_with_expected_probability() {
    let mut config = quiet();
    config.visual.flake_variants = vec![
        FlakeVariant {
            glyph: "*".to_owned(),
            mass: 1.0,
        },
        FlakeVariant {
            glyph: "o".to_owned(),
            mass: 2.0,
        },
    ];
    let mut rng = StdRng::seed_from_u64(14);

    for (variant, mass) in [(0_usize, 1.0_f64), (1, 2.0)] {
        let down = 0.2_f64.mul_add(mass, 0.6);
        let expected = down / (down + 0.2 / mass);

        let trials = 4000;
        let mut straight = 0_u32;
        for _ in 0..trials {
            let mut state = SimulationState::new(&config, dims(16, 10)).unwrap();
            state.grid.spawn_flake(0, 8, variant);
            run_tick(&mut state, &mut rng).unwrap();
            if state.grid.get(1, 8) == Some(ParticleType::SnowFlake) {
                straight += 1;
            }
        }
        let observed = f64::from(straight) / f64::from(trials);
        assert!(
            (observed - expected).abs() < 0.03,
            "mass {mass}: observed {observed}, expected {expected}"
        );
    }
}

#[test]
fn unsupported_cluster_center_compresses() {
    let mut state = SimulationState::new(&quiet(), dims(40, 20)).unwrap();
    for (y, x) in [(5, 19), (5, 20), (5, 21), (6, 19), (6, 20), (6, 21)] {
        state.grid.spawn_flake(y, x, 0);
    }
    state.grid.set_stationary(6, 20, 21);

    let mut rng = StdRng::seed_from_u64(15);
    let summary = run_tick(&mut state, &mut rng).unwrap();

    assert_eq!(state.grid.get(6, 20), Some(ParticleType::Settled));
    assert!(summary.promotions >= 1);
}

#[test]
fn resize_keeps_retained_rectangle() {
    let (height, width) = (18, 40);
    let mut state = SimulationState::new(&quiet(), dims(width, height)).unwrap();
    let mut rng = StdRng::seed_from_u64(16);
    for y in 0..height {
        for x in 0..width {
            let kind = ParticleType::ALL[rng.random_range(0..ParticleType::ALL.len())];
            if kind == ParticleType::SnowFlake {
                state.grid.spawn_flake(y, x, rng.random_range(0..12));
            } else {
                state.grid.set(y, x, kind);
            }
            if kind != ParticleType::Empty {
                state.grid.set_stationary(y, x, rng.random_range(0..100));
            }
        }
    }
    for _ in 0..3 {
        state.grid.age_flakes();
    }
    let before = state.grid.clone();

    let mut next = before.dimensions();
    next.width = width - 5;
    next.floor_width = next.floor_width.min(next.width - next.floor_start);
    state.resize(next).unwrap();

    assert_eq!(state.grid.width(), width - 5);
    for y in 0..height {
        for x in 0..width - 5 {
            assert_eq!(state.grid.cell(y, x), before.cell(y, x), "cell ({y}, {x})");
        }
    }
    assert_eq!(state.grid.get(0, width - 5), None);
}

#[test]
fn configured_run_keeps_flakes_on_grid() {
    let yaml = r"
parameters:
  spawn_rate: 0.5
world:
  max_snowflakes: 50
";
    let config = SimulationConfig::parse(yaml).unwrap();
    let grid_dims = config.geometry.dimensions(30, 16);
    let mut state = SimulationState::new(&config, grid_dims).unwrap();
    let mut rng = StdRng::seed_from_u64(17);

    let mut spawned = 0;
    for _ in 0..200 {
        let summary = run_tick(&mut state, &mut rng).unwrap();
        spawned += summary.spawned;
        assert!(summary.flakes <= 50);
        assert!(summary.backoff >= 1.0);
    }
    assert!(spawned > 0);
    assert_eq!(state.tick, 200);
}
