//! Error types for the `drift-world` crate.
//!
//! Reads and writes on the grid never fail: out-of-range coordinates read
//! as absent and writes to them are ignored. Only constructing or
//! reshaping a grid with inconsistent geometry returns [`WorldError`].

/// Errors that can occur when building or reshaping a grid.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The visible viewport extends past the right edge of the grid.
    #[error("visible region {start}..{end} exceeds grid width {width}")]
    VisibleOutOfBounds {
        /// First visible column.
        start: usize,
        /// One past the last visible column.
        end: usize,
        /// Grid width.
        width: usize,
    },

    /// The floor region extends past the right edge of the grid.
    #[error("floor region {start}..{end} exceeds grid width {width}")]
    FloorOutOfBounds {
        /// First floor column.
        start: usize,
        /// One past the last floor column.
        end: usize,
        /// Grid width.
        width: usize,
    },

    /// The requested cell count does not fit in memory addressing.
    #[error("grid of {width}x{height} cells is too large")]
    GridTooLarge {
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
    },
}
