//! Drift binary: a falling-snow simulation in the terminal.
//!
//! This is the main entry point that wires together configuration,
//! logging, the shared simulation state, the async tick loop, and the
//! terminal front-end. Without a terminal (`frontend.headless` or
//! `DRIFT_HEADLESS=1`) the tick loop runs alone and logs summaries to
//! stderr until a run bound is reached or the process is interrupted.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `drift-config.yaml` (or `DRIFT_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Size the grid from the terminal or the headless viewport
//! 4. Create the shared simulation state
//! 5. Create operator state from simulation bounds
//! 6. Start the tick loop
//! 7. Run the terminal session, or wait headless
//! 8. Log the result

mod error;
mod frontend;
mod palette;
mod render;
mod tick_logger;

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use drift_core::config::{LoggingConfig, SimulationConfig};
use drift_core::operator::OperatorState;
use drift_core::runner::{self, RunnerError, SimulationResult};
use drift_core::tick::SimulationState;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::frontend::Session;
use crate::tick_logger::TickLogger;

/// Config file read when `DRIFT_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "drift-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step, the terminal session,
/// or the simulation itself fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, source) = load_config()?;
    let headless = config.frontend.headless;

    // 2. Initialize structured logging.
    init_logging(&config.logging, headless)?;
    info!(headless, "drift starting");
    match source {
        Some(path) => info!(
            path = %path.display(),
            tick_interval_ms = config.world.tick_interval_ms,
            max_snowflakes = config.world.max_snowflakes,
            variants = config.visual.flake_variants.len(),
            "Configuration loaded"
        ),
        None => info!("Config file not found, using defaults"),
    }

    // 3. Size the grid.
    let (columns, rows) = if headless {
        (
            config.frontend.headless_columns,
            config.frontend.headless_rows,
        )
    } else {
        crossterm::terminal::size()?
    };
    let dims = config.geometry.dimensions(columns, rows);
    info!(
        columns,
        rows,
        width = dims.width,
        height = dims.height,
        visible_start = dims.visible_start,
        floor_start = dims.floor_start,
        floor_width = dims.floor_width,
        "Grid sized"
    );

    // 4. Create the shared simulation state.
    let state = Arc::new(RwLock::new(
        SimulationState::new(&config, dims).map_err(EngineError::from)?,
    ));

    // 5. Create operator state.
    let operator = Arc::new(OperatorState::new(
        config.world.tick_interval_ms,
        &config.simulation,
    ));
    info!(
        max_ticks = config.simulation.max_ticks,
        max_real_time_seconds = config.simulation.max_real_time_seconds,
        "Operator state initialized"
    );

    // 6. Start the tick loop.
    let runner = spawn_runner(
        Arc::clone(&state),
        Arc::clone(&operator),
        config.logging.summary_interval_ticks,
    );

    // 7. Run the terminal session, or wait headless.
    let session_outcome = if headless {
        wait_headless(&operator).await;
        Ok(())
    } else {
        let session = Session::new(state, Arc::clone(&operator), &config);
        let outcome = match tokio::task::spawn_blocking(move || session.run()).await {
            Ok(outcome) => outcome,
            Err(e) => Err(EngineError::from(e)),
        };
        operator.request_stop();
        outcome
    };

    // 8. Wait for the tick loop and log the result.
    let result = join_runner(runner).await?;
    runner::log_simulation_end(&result);
    session_outcome?;

    info!("drift exiting");
    Ok(())
}

/// Load configuration from `DRIFT_CONFIG` or `drift-config.yaml`.
///
/// Returns the path that was read, or `None` when the file does not exist
/// and defaults are used. Logging is not set up yet, so the caller
/// reports which case applied.
fn load_config() -> Result<(SimulationConfig, Option<PathBuf>), EngineError> {
    let config_path = std::env::var("DRIFT_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if config_path.exists() {
        let config = SimulationConfig::from_file(&config_path)?;
        Ok((config, Some(config_path)))
    } else {
        let mut config = SimulationConfig::default();
        config.frontend.apply_env_overrides();
        Ok((config, None))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. The terminal
/// session owns stdout, so interactive runs log to `logging.file`.
fn init_logging(logging: &LoggingConfig, headless: bool) -> Result<(), EngineError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let installed = if headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init()
    } else {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&logging.file)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init()
    };
    installed.map_err(|e| EngineError::Logging {
        message: e.to_string(),
    })
}

/// Spawn the tick loop. It requests a stop when it ends so the front-end
/// exits too.
fn spawn_runner(
    state: Arc<RwLock<SimulationState>>,
    operator: Arc<OperatorState>,
    summary_interval_ticks: u64,
) -> JoinHandle<Result<SimulationResult, RunnerError>> {
    tokio::spawn(async move {
        let mut rng = StdRng::from_os_rng();
        let mut callback = TickLogger::new(summary_interval_ticks);
        let result = runner::run_simulation(&state, &operator, &mut callback, &mut rng).await;
        operator.request_stop();
        result
    })
}

/// Await the tick loop task.
async fn join_runner(
    handle: JoinHandle<Result<SimulationResult, RunnerError>>,
) -> Result<SimulationResult, EngineError> {
    Ok(handle.await??)
}

/// Block until the tick loop stops or the process is interrupted.
async fn wait_headless(operator: &OperatorState) {
    tokio::select! {
        () = operator.stopped() => {}
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("Interrupt received, stopping"),
                Err(e) => {
                    warn!(error = %e, "Could not listen for interrupts");
                    operator.stopped().await;
                }
            }
            operator.request_stop();
        }
    }
}
