//! Error types for the Drift binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during startup, the terminal session, and the run.

/// Top-level error for the Drift binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: drift_core::config::ConfigError,
    },

    /// Grid construction or resize failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: drift_world::WorldError,
    },

    /// Simulation runner failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: drift_core::runner::RunnerError,
    },

    /// Terminal or log file I/O failed.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A spawned task panicked or was cancelled.
    #[error("task error: {source}")]
    Task {
        /// The underlying join error.
        #[from]
        source: tokio::task::JoinError,
    },

    /// The tracing subscriber could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the logging failure.
        message: String,
    },
}
