//! Per-tick render output of the terrain traversal.

use veldt_mesh::EdgeMask;

use crate::BlockCoord;

/// Render attributes of a visible block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderFlags(u8);

impl RenderFlags {
    /// Opaque terrain surface.
    pub const OPAQUE: Self = Self(1);
    /// Water plane overlays this block.
    pub const WATER: Self = Self(2);
    /// Block passed the frustum test (as opposed to the close-distance
    /// override).
    pub const FRUSTUM_VISIBLE: Self = Self(4);

    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// One visible block, resolved to a stitching mask.
///
/// The renderer draws `coord`'s vertex buffer with the index buffer selected
/// by `edge_mask`.
#[derive(Clone, Copy, Debug)]
pub struct RenderEntry {
    pub coord: BlockCoord,
    /// Sides that must stitch down to a larger neighbor.
    pub edge_mask: EdgeMask,
    pub flags: RenderFlags,
    /// Height bounds for depth sorting and culling downstream.
    pub min_height: f32,
    pub max_height: f32,
}
