//! Simulation loop runner with operator controls.
//!
//! This module provides [`run_simulation`], the async loop that drives
//! ticks against the shared state with support for:
//!
//! - **Bounded simulation**: stop after `max_ticks` or `max_real_time_seconds`
//! - **Pause/resume**: the front-end can halt and continue the tick loop
//! - **Clean shutdown**: a stop request interrupts the inter-tick sleep
//!
//! The runner wraps the single-tick [`run_tick`] function and adds the
//! control plane around it. Each tick holds the write lock from spawn to
//! the end of the main pass, so readers never see a half-moved particle.
//!
//! [`run_tick`]: crate::tick::run_tick

use std::sync::Arc;

use rand::Rng;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::operator::{OperatorState, SimulationEndReason};
use crate::tick::{self, SimulationState, TickError, TickSummary};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick execution failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },
}

/// Result of the simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The reason the simulation ended.
    pub end_reason: SimulationEndReason,
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Total number of ticks executed.
    pub total_ticks: u64,
}

/// Callback invoked after each tick completes.
///
/// Called while the write lock is still held, so implementations should
/// only read from the state and return quickly.
pub trait TickCallback: Send {
    /// Called after a tick completes successfully.
    fn on_tick(&mut self, summary: &TickSummary, state: &SimulationState);
}

/// A no-op tick callback for testing.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _state: &SimulationState) {}
}

/// Run the simulation loop until a termination condition is met.
///
/// # Arguments
///
/// * `state` - Shared simulation state
/// * `operator` - Shared run-control state
/// * `callback` - Called after each tick
/// * `rng` - Randomness source for every tick
///
/// # Errors
///
/// Returns [`RunnerError`] if a tick execution fails.
pub async fn run_simulation<R: Rng + Send>(
    state: &Arc<RwLock<SimulationState>>,
    operator: &Arc<OperatorState>,
    callback: &mut dyn TickCallback,
    rng: &mut R,
) -> Result<SimulationResult, RunnerError> {
    let mut last_summary: Option<TickSummary> = None;
    let mut total_ticks: u64 = 0;

    info!(
        max_ticks = operator.max_ticks(),
        max_real_time_seconds = operator.max_real_time_seconds(),
        tick_interval_ms = u64::try_from(operator.tick_interval().as_millis()).unwrap_or(u64::MAX),
        "Simulation starting"
    );

    let end_reason = loop {
        // --- Check pause ---
        if operator.is_paused() {
            info!("Simulation paused");
            operator.wait_if_paused().await;
            info!("Simulation resumed");
        }

        // --- Check stop request (before tick) ---
        if operator.is_stop_requested() {
            info!("Operator stop requested");
            break SimulationEndReason::OperatorStop;
        }

        // --- Check time limit (before tick) ---
        if operator.time_limit_reached() {
            info!(
                max_seconds = operator.max_real_time_seconds(),
                elapsed = operator.elapsed_seconds(),
                "Real-time limit reached"
            );
            break SimulationEndReason::MaxRealTimeReached;
        }

        // --- Execute tick under the write lock ---
        let summary = {
            let mut guard = state.write().await;
            let summary = tick::run_tick(&mut guard, rng)?;
            callback.on_tick(&summary, &guard);
            summary
        };
        total_ticks = total_ticks.saturating_add(1);

        // --- Check tick limit (after tick) ---
        let limit_hit = operator.tick_limit_reached(summary.tick);
        last_summary = Some(summary);
        if limit_hit {
            info!(max_ticks = operator.max_ticks(), "Tick limit reached");
            break SimulationEndReason::MaxTicksReached;
        }

        // --- Sleep for tick interval (interrupted by stop) ---
        operator.sleep_tick().await;
    };

    operator.set_end_reason(end_reason).await;
    Ok(SimulationResult {
        end_reason,
        final_summary: last_summary,
        total_ticks,
    })
}

/// Log the simulation end sequence.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        "Simulation ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            tick = summary.tick,
            flakes = summary.flakes,
            solids = summary.solids,
            wind = summary.wind,
            backoff = summary.backoff,
            "Final tick summary"
        );
    } else {
        warn!("Simulation ended with no ticks executed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use drift_types::GridDimensions;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::config::{SimulationBoundsConfig, SimulationConfig};

    fn shared_state() -> Arc<RwLock<SimulationState>> {
        let config = SimulationConfig::default();
        let dims = config.geometry.dimensions(40, 20);
        Arc::new(RwLock::new(SimulationState::new(&config, dims).unwrap()))
    }

    fn dims_of(state: &SimulationState) -> GridDimensions {
        state.grid.dimensions()
    }

    struct Counter(u64);

    impl TickCallback for Counter {
        fn on_tick(&mut self, summary: &TickSummary, state: &SimulationState) {
            self.0 = self.0.saturating_add(1);
            assert_eq!(summary.tick, state.tick);
            assert_eq!(dims_of(state).visible_width, 40);
        }
    }

    #[tokio::test]
    async fn stops_at_tick_limit() {
        let state = shared_state();
        let bounds = SimulationBoundsConfig {
            max_ticks: 5,
            max_real_time_seconds: 0,
        };
        let operator = Arc::new(OperatorState::new(0, &bounds));
        let mut callback = Counter(0);
        let mut rng = StdRng::seed_from_u64(1);

        let result = run_simulation(&state, &operator, &mut callback, &mut rng)
            .await
            .unwrap();

        assert_eq!(result.end_reason, SimulationEndReason::MaxTicksReached);
        assert_eq!(result.total_ticks, 5);
        assert_eq!(result.final_summary.unwrap().tick, 5);
        assert_eq!(callback.0, 5);
        assert_eq!(state.read().await.tick, 5);
        assert_eq!(
            operator.end_reason().await,
            Some(SimulationEndReason::MaxTicksReached)
        );
    }

    #[tokio::test]
    async fn stop_before_start_runs_no_ticks() {
        let state = shared_state();
        let operator = Arc::new(OperatorState::new(50, &SimulationBoundsConfig::default()));
        operator.request_stop();
        let mut rng = StdRng::seed_from_u64(2);

        let result = run_simulation(&state, &operator, &mut NoOpCallback, &mut rng)
            .await
            .unwrap();

        assert_eq!(result.end_reason, SimulationEndReason::OperatorStop);
        assert_eq!(result.total_ticks, 0);
        assert!(result.final_summary.is_none());
    }

    #[tokio::test]
    async fn stop_ends_running_loop_promptly() {
        let state = shared_state();
        let operator = Arc::new(OperatorState::new(10_000, &SimulationBoundsConfig::default()));
        let loop_state = Arc::clone(&state);
        let loop_operator = Arc::clone(&operator);

        let handle = tokio::spawn(async move {
            let mut rng = StdRng::seed_from_u64(3);
            run_simulation(&loop_state, &loop_operator, &mut NoOpCallback, &mut rng).await
        });

        // Let the first tick run, then stop during the long sleep.
        tokio::time::sleep(Duration::from_millis(50)).await;
        operator.request_stop();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(result.end_reason, SimulationEndReason::OperatorStop);
        assert_eq!(result.total_ticks, 1);
    }

    #[test]
    fn log_end_without_ticks() {
        log_simulation_end(&SimulationResult {
            end_reason: SimulationEndReason::OperatorStop,
            final_summary: None,
            total_ticks: 0,
        });
    }
}
