//! Grid store and environmental controllers for the Drift simulation.
//!
//! This crate models the physical world the particle rules operate on:
//! the cell grid with its per-cell bookkeeping, the wind that pushes
//! falling flakes sideways, and the coverage-based backoff that slows
//! compaction once the pile grows tall.
//!
//! # Modules
//!
//! - [`grid`] -- [`Grid`] cell store with bounded reads, moves, and
//!   content-preserving resize.
//! - [`wind`] -- [`WindController`] ramping toward a target force that
//!   expires after a randomized number of ticks.
//! - [`backoff`] -- [`BackoffController`] turning pile coverage into a
//!   compaction-time multiplier.
//! - [`brush`] -- Pointer-driven placement, removal, and pushing of
//!   particles in a square patch.
//! - [`error`] -- Error types for grid construction.

pub mod backoff;
pub mod brush;
pub mod error;
pub mod grid;
pub mod wind;

// Re-export primary types at crate root.
pub use backoff::{BackoffController, BackoffSettings};
pub use brush::{BrushOutcome, push_patch, toggle_patch};
pub use error::WorldError;
pub use grid::{Cell, Grid};
pub use wind::{WindController, WindSettings};
