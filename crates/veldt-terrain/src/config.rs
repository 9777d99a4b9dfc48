//! Terrain configuration with validated construction.

use crate::TerrainError;

/// Tuning parameters for quadtree traversal, geometry build, and expiration.
///
/// The defaults target a 60 Hz tick: the expiration window of 120 ticks is
/// the empirically chosen 2000 ms of the original tuning, and the close-dot
/// threshold of 0.1 is likewise scene-dependent rather than derived, so both
/// are configuration instead of constants.
#[derive(Clone, Debug)]
pub struct TerrainConfig {
    /// Log2 side length of root blocks (the coarsest level).
    pub largest_block_shift: u32,
    /// Log2 side length below which blocks are never subdivided.
    pub smallest_block_shift: u32,
    /// Log2 of the number of grid cells per block edge.
    pub block_vertex_shift: u32,
    /// Clip-space width of one block above which it subdivides.
    pub block_screen_width_threshold: f32,
    /// World-space height of the water plane.
    pub water_level: f32,
    /// Forward-dot threshold of the close-distance visibility override: a
    /// frustum-culled block still counts as visible when the normalized
    /// camera-to-center direction dotted with the camera forward exceeds it.
    pub close_dot_threshold: f32,
    /// Ticks a block may go unseen before its resources are released.
    pub expiration_ticks: u64,
    /// Horizontal distance around the camera within which root blocks are
    /// visited each tick.
    pub view_distance: f32,
    /// Vertical AABB bounds assumed for a block whose parent heights are not
    /// known yet (root blocks on their first visit).
    pub fallback_min_height: f32,
    /// See `fallback_min_height`.
    pub fallback_max_height: f32,
    /// Vertical scale applied when positioning physics bodies.
    pub physics_height_scale: f32,
    /// Build geometry on the worker pool instead of synchronously.
    pub async_build: bool,
    /// Worker threads for async builds; 0 picks a count from the CPU.
    pub build_threads: usize,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            largest_block_shift: 6,
            smallest_block_shift: 0,
            block_vertex_shift: 4,
            block_screen_width_threshold: 0.6,
            water_level: 0.0,
            close_dot_threshold: 0.1,
            expiration_ticks: 120,
            view_distance: 512.0,
            fallback_min_height: -1024.0,
            fallback_max_height: 1024.0,
            physics_height_scale: 1.0,
            async_build: false,
            build_threads: 0,
        }
    }
}

impl TerrainConfig {
    /// Grid cells per block edge.
    #[must_use]
    pub fn vertices_per_edge(&self) -> usize {
        1 << self.block_vertex_shift
    }

    /// Check configuration invariants.
    pub fn validate(&self) -> Result<(), TerrainError> {
        if self.smallest_block_shift > self.largest_block_shift {
            return Err(TerrainError::ShiftOrder {
                smallest: self.smallest_block_shift,
                largest: self.largest_block_shift,
            });
        }
        if self.largest_block_shift > 30 {
            return Err(TerrainError::ShiftTooLarge(self.largest_block_shift));
        }
        if self.block_vertex_shift < 1 {
            return Err(TerrainError::VertexShift(self.block_vertex_shift));
        }
        if self.block_vertex_shift > 30 {
            return Err(TerrainError::ShiftTooLarge(self.block_vertex_shift));
        }
        if !(self.block_screen_width_threshold > 0.0) {
            return Err(TerrainError::ScreenWidthThreshold(
                self.block_screen_width_threshold,
            ));
        }
        if self.expiration_ticks == 0 {
            return Err(TerrainError::ExpirationWindow);
        }
        if !(self.view_distance > 0.0) {
            return Err(TerrainError::ViewDistance(self.view_distance));
        }
        if self.fallback_min_height > self.fallback_max_height {
            return Err(TerrainError::FallbackHeightRange {
                min: self.fallback_min_height,
                max: self.fallback_max_height,
            });
        }
        Ok(())
    }
}
