//! User-adjustable simulation parameters.
//!
//! These are the knobs the front-end turns while the simulation runs.
//! Every setter clamps to the configured bounds, so a held key can never
//! push a value out of range.

use crate::config::ParametersConfig;

/// Spawn and temperature settings read by the tick driver every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParameters {
    /// Whether new flakes appear at the top of the grid.
    pub spawn_enabled: bool,
    /// Per-column spawn probability.
    pub spawn_rate: f64,
    /// Ambient temperature; higher values melt faster.
    pub temperature: i32,
    min_spawn_rate: f64,
    max_spawn_rate: f64,
    spawn_rate_step: f64,
    min_temperature: i32,
    max_temperature: i32,
}

impl SimulationParameters {
    /// Build parameters from their configured initial values and bounds.
    pub fn from_config(config: &ParametersConfig) -> Self {
        Self {
            spawn_enabled: config.spawn_enabled,
            spawn_rate: config
                .spawn_rate
                .clamp(config.min_spawn_rate, config.max_spawn_rate),
            temperature: config
                .temperature
                .clamp(config.min_temperature, config.max_temperature),
            min_spawn_rate: config.min_spawn_rate,
            max_spawn_rate: config.max_spawn_rate,
            spawn_rate_step: config.spawn_rate_step,
            min_temperature: config.min_temperature,
            max_temperature: config.max_temperature,
        }
    }

    /// Enable or disable spawning.
    pub const fn set_spawn_enabled(&mut self, enabled: bool) {
        self.spawn_enabled = enabled;
    }

    /// Flip spawning and return the new state.
    pub const fn toggle_spawning(&mut self) -> bool {
        self.spawn_enabled = !self.spawn_enabled;
        self.spawn_enabled
    }

    /// Add `delta` to the spawn rate, clamped to its bounds.
    ///
    /// A non-finite delta is ignored. Returns the new rate.
    pub fn adjust_spawn_rate(&mut self, delta: f64) -> f64 {
        if delta.is_finite() {
            self.spawn_rate = (self.spawn_rate + delta).clamp(self.min_spawn_rate, self.max_spawn_rate);
        }
        self.spawn_rate
    }

    /// The configured spawn-rate change per key press.
    pub const fn spawn_rate_step(&self) -> f64 {
        self.spawn_rate_step
    }

    /// Add `delta` degrees to the temperature, clamped to its bounds.
    ///
    /// Returns the new temperature.
    pub fn adjust_temperature(&mut self, delta: i32) -> i32 {
        self.temperature = self
            .temperature
            .saturating_add(delta)
            .clamp(self.min_temperature, self.max_temperature);
        self.temperature
    }
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self::from_config(&ParametersConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_config() {
        let params = SimulationParameters::default();
        assert!(params.spawn_enabled);
        assert!((params.spawn_rate - 0.1).abs() < 1e-12);
        assert_eq!(params.temperature, 0);
    }

    #[test]
    fn spawn_rate_is_clamped() {
        let mut params = SimulationParameters::default();
        for _ in 0..20 {
            params.adjust_spawn_rate(params.spawn_rate_step());
        }
        assert!((params.spawn_rate - 0.5).abs() < 1e-12);
        for _ in 0..20 {
            params.adjust_spawn_rate(-params.spawn_rate_step());
        }
        assert!((params.spawn_rate - 0.01).abs() < 1e-12);
        params.adjust_spawn_rate(f64::NAN);
        assert!((params.spawn_rate - 0.01).abs() < 1e-12);
    }

    #[test]
    fn temperature_is_clamped() {
        let mut params = SimulationParameters::default();
        assert_eq!(params.adjust_temperature(25), 10);
        assert_eq!(params.adjust_temperature(-3), 7);
        assert_eq!(params.adjust_temperature(i32::MIN), -10);
    }

    #[test]
    fn toggle_flips_spawning() {
        let mut params = SimulationParameters::default();
        assert!(!params.toggle_spawning());
        assert!(params.toggle_spawning());
        params.set_spawn_enabled(false);
        assert!(!params.spawn_enabled);
    }
}
