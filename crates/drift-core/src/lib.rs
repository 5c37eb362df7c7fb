//! Transition rules, movement, and the tick cycle for the Drift simulation.
//!
//! This crate owns everything that happens inside one tick, plus the async
//! loop that drives ticks at a fixed interval against shared state.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `drift-config.yaml` into
//!   strongly-typed structs.
//! - [`params`] -- [`SimulationParameters`] adjusted live by the user.
//! - [`rules`] -- Compression, packing, ice formation, and melting.
//! - [`movement`] -- Weighted candidate moves and cumulative selection.
//! - [`tick`] -- [`SimulationState`] and the single-tick [`run_tick`].
//! - [`operator`] -- Pause, resume, stop, and run bounds.
//! - [`runner`] -- The async tick loop and [`TickCallback`].
//!
//! [`SimulationParameters`]: params::SimulationParameters
//! [`SimulationState`]: tick::SimulationState
//! [`run_tick`]: tick::run_tick
//! [`TickCallback`]: runner::TickCallback

pub mod config;
pub mod movement;
pub mod operator;
pub mod params;
pub mod rules;
pub mod runner;
pub mod tick;
