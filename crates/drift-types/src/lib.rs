//! Shared type definitions for the Drift particle simulation.
//!
//! This crate is the single source of truth for the value types that flow
//! between the grid store, the physics engine, and the terminal front-end.
//!
//! # Modules
//!
//! - [`enums`] -- Particle compaction stages and horizontal directions
//! - [`structs`] -- Grid dimensions and per-type particle counts

pub mod enums;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{Direction, ParticleType};
pub use structs::{GridDimensions, ParticleCounts};
