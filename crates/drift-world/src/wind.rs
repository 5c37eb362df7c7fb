//! Horizontal wind force acting on falling flakes.
//!
//! The controller keeps a `current` force that ramps toward a `target` by a
//! fixed step each tick, never overshooting. Any non-zero target expires
//! after a randomized number of ticks, after which the wind dies down on
//! its own.

use drift_types::Direction;
use rand::Rng;
use serde::Deserialize;
use tracing::debug;

/// Tunables for the wind controller.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct WindSettings {
    /// Largest absolute force a target may have.
    #[serde(default = "default_max_strength")]
    pub max_strength: f64,

    /// Change in `current` per tick while ramping.
    #[serde(default = "default_ramp_speed")]
    pub ramp_speed: f64,

    /// Shortest gust, in ticks.
    #[serde(default = "default_min_duration_ticks")]
    pub min_duration_ticks: u64,

    /// Longest gust, in ticks.
    #[serde(default = "default_max_duration_ticks")]
    pub max_duration_ticks: u64,

    /// Lower bound of the random fraction of `max_strength` used by
    /// [`WindController::gust`].
    #[serde(default = "default_gust_min_factor")]
    pub gust_min_factor: f64,
}

impl Default for WindSettings {
    fn default() -> Self {
        Self {
            max_strength: default_max_strength(),
            ramp_speed: default_ramp_speed(),
            min_duration_ticks: default_min_duration_ticks(),
            max_duration_ticks: default_max_duration_ticks(),
            gust_min_factor: default_gust_min_factor(),
        }
    }
}

const fn default_max_strength() -> f64 {
    0.8
}

const fn default_ramp_speed() -> f64 {
    0.05
}

const fn default_min_duration_ticks() -> u64 {
    40
}

const fn default_max_duration_ticks() -> u64 {
    160
}

const fn default_gust_min_factor() -> f64 {
    0.7
}

/// Current and target wind with an expiry deadline.
#[derive(Debug, Clone, PartialEq)]
pub struct WindController {
    settings: WindSettings,
    /// Force applied this tick. Negative blows left.
    current: f64,
    /// Force `current` is ramping toward.
    target: f64,
    /// Ticks this controller has advanced.
    ticks: u64,
    /// Tick at which a non-zero target is forced back to zero.
    stop_at: Option<u64>,
}

impl WindController {
    /// Create a calm controller.
    pub const fn new(settings: WindSettings) -> Self {
        Self {
            settings,
            current: 0.0,
            target: 0.0,
            ticks: 0,
            stop_at: None,
        }
    }

    /// Force applied to flakes this tick.
    pub const fn current(&self) -> f64 {
        self.current
    }

    /// Force the wind is ramping toward.
    pub const fn target(&self) -> f64 {
        self.target
    }

    /// Tick at which the current gust expires, if one is active.
    pub const fn stop_at(&self) -> Option<u64> {
        self.stop_at
    }

    /// Number of ticks the controller has advanced.
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The settings this controller was built with.
    pub const fn settings(&self) -> &WindSettings {
        &self.settings
    }

    /// Set a new target force, clamped to `±max_strength`.
    ///
    /// A non-zero target schedules its own expiry a random number of
    /// ticks from now; a zero target cancels any pending expiry.
    pub fn set_target(&mut self, target: f64, rng: &mut impl Rng) {
        let max = self.settings.max_strength.abs();
        let target = if target.is_finite() {
            target.clamp(-max, max)
        } else {
            0.0
        };
        self.target = target;

        if target == 0.0 {
            self.stop_at = None;
            return;
        }

        let lo = self.settings.min_duration_ticks;
        let hi = self.settings.max_duration_ticks;
        let duration = if lo >= hi {
            lo
        } else {
            rng.random_range(lo..=hi)
        };
        self.stop_at = Some(self.ticks.saturating_add(duration));
        debug!(target, duration, "Wind target set");
    }

    /// Start a gust in `direction` at a random fraction of full strength.
    pub fn gust(&mut self, direction: Direction, rng: &mut impl Rng) {
        let lo = self.settings.gust_min_factor.clamp(0.0, 1.0);
        let factor = if lo >= 1.0 {
            1.0
        } else {
            rng.random_range(lo..=1.0)
        };
        let force = direction.sign() * self.settings.max_strength * factor;
        self.set_target(force, rng);
    }

    /// Advance one tick: expire the target if due, then ramp `current`.
    pub fn tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);

        if self.stop_at.is_some_and(|deadline| self.ticks >= deadline) {
            self.target = 0.0;
            self.stop_at = None;
            debug!(tick = self.ticks, "Wind gust expired");
        }

        let step = self.settings.ramp_speed.abs();
        if self.current < self.target {
            self.current = (self.current + step).min(self.target);
        } else if self.current > self.target {
            self.current = (self.current - step).max(self.target);
        }
    }
}
