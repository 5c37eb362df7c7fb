//! Tick callback that writes periodic summaries to the log.

use drift_core::runner::TickCallback;
use drift_core::tick::{SimulationState, TickSummary};
use tracing::info;

/// Logs one summary line every `interval` ticks.
pub struct TickLogger {
    interval: u64,
}

impl TickLogger {
    /// Create a logger; an interval of 0 disables it.
    pub const fn new(interval: u64) -> Self {
        Self { interval }
    }

    const fn is_due(&self, tick: u64) -> bool {
        matches!(tick.checked_rem(self.interval), Some(0))
    }
}

impl TickCallback for TickLogger {
    fn on_tick(&mut self, summary: &TickSummary, state: &SimulationState) {
        if !self.is_due(summary.tick) {
            return;
        }
        let counts = state.grid.counts();
        info!(
            tick = summary.tick,
            flakes = counts.snow_flakes,
            settled = counts.settled,
            packed = counts.packed,
            ice = counts.ice,
            wind = summary.wind,
            backoff = summary.backoff,
            spawn_enabled = state.params.spawn_enabled,
            spawn_rate = state.params.spawn_rate,
            temperature = state.params.temperature,
            "Tick summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_never_fires() {
        let logger = TickLogger::new(0);
        assert!(!logger.is_due(0));
        assert!(!logger.is_due(100));
    }

    #[test]
    fn fires_on_multiples() {
        let logger = TickLogger::new(25);
        assert!(logger.is_due(25));
        assert!(logger.is_due(50));
        assert!(!logger.is_due(51));
    }
}
