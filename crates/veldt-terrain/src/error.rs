//! Terrain error types.

/// Errors reported when constructing a terrain from an invalid configuration.
///
/// Everything else in this crate is either infallible, a transient condition
/// retried next tick (height source not ready), or a programmer error that
/// panics (adjacent blocks differing by more than one size level).
#[derive(Debug, thiserror::Error)]
pub enum TerrainError {
    /// The smallest allowed block is larger than the largest.
    #[error("smallest block shift {smallest} exceeds largest block shift {largest}")]
    ShiftOrder {
        /// Configured smallest shift.
        smallest: u32,
        /// Configured largest shift.
        largest: u32,
    },

    /// Block widths are computed as `1 << shift` in `i32`, so shifts of 31
    /// or more would wrap.
    #[error("block shift {0} exceeds the maximum of 30")]
    ShiftTooLarge(u32),

    /// The vertex grid must have at least 2 cells per side so a stitched
    /// boundary can pair its border cells.
    #[error("block vertex shift must be at least 1, got {0}")]
    VertexShift(u32),

    /// The subdivision threshold must be a positive clip-space width.
    #[error("block screen width threshold must be positive, got {0}")]
    ScreenWidthThreshold(f32),

    /// The expiration window must cover at least one tick.
    #[error("expiration window must be at least 1 tick")]
    ExpirationWindow,

    /// The view distance bounds the root sweep and must be positive.
    #[error("view distance must be positive, got {0}")]
    ViewDistance(f32),

    /// The fallback height range must be ordered.
    #[error("fallback height range is inverted: min {min} > max {max}")]
    FallbackHeightRange {
        /// Configured fallback minimum.
        min: f32,
        /// Configured fallback maximum.
        max: f32,
    },
}
