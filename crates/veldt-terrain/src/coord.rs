//! Block coordinates on the terrain grid.

use veldt_math::GridRect;

/// Identifies the square region `[x, x + 2^size_shift) x [y, y + 2^size_shift)`
/// of the terrain grid.
///
/// Coordinates produced by subdivision are always aligned: `x` and `y` are
/// multiples of `2^size_shift`, so the four children of a coordinate tile its
/// square exactly without overlap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockCoord {
    /// Minimum corner along the x axis.
    pub x: i32,
    /// Minimum corner along the y axis (world z).
    pub y: i32,
    /// Log2 of the side length.
    pub size_shift: u32,
}

impl BlockCoord {
    /// Construct a coordinate, checking quadtree alignment.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `x` or `y` is not a multiple of
    /// `2^size_shift`.
    #[must_use]
    pub fn new(x: i32, y: i32, size_shift: u32) -> Self {
        debug_assert!(size_shift < 31, "size shift {size_shift} too large");
        let mask = (1i32 << size_shift) - 1;
        debug_assert!(
            x & mask == 0 && y & mask == 0,
            "coordinate ({x}, {y}) not aligned to size 2^{size_shift}"
        );
        Self { x, y, size_shift }
    }

    /// Side length of the square.
    #[must_use]
    pub fn width(&self) -> i32 {
        1 << self.size_shift
    }

    /// Minimum corner.
    #[must_use]
    pub fn min(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Maximum corner (exclusive).
    #[must_use]
    pub fn max(&self) -> (i32, i32) {
        (self.x + self.width(), self.y + self.width())
    }

    /// Center of the square in continuous grid space.
    #[must_use]
    pub fn center(&self) -> (f32, f32) {
        let half = self.width() as f32 * 0.5;
        (self.x as f32 + half, self.y as f32 + half)
    }

    /// Integer bounding rectangle, used for spatial bucketing and physics
    /// region tests.
    #[must_use]
    pub fn rect(&self) -> GridRect {
        GridRect::new(self.min(), self.max())
    }

    /// The child coordinate for the given quadrant.
    ///
    /// Quadrants are ordered \[bottom-left, bottom-right, top-left,
    /// top-right\]: bit 0 selects the +x half, bit 1 the +y half.
    ///
    /// # Panics
    ///
    /// Panics if `quadrant >= 4` or the coordinate is already at the minimum
    /// size; the traversal never subdivides below the smallest allowed shift.
    #[must_use]
    pub fn child(&self, quadrant: usize) -> BlockCoord {
        assert!(quadrant < 4, "quadrant {quadrant} out of range");
        assert!(self.size_shift > 0, "cannot subdivide a minimum-size block");
        let half = 1i32 << (self.size_shift - 1);
        BlockCoord {
            x: self.x + (quadrant as i32 & 1) * half,
            y: self.y + ((quadrant as i32 >> 1) & 1) * half,
            size_shift: self.size_shift - 1,
        }
    }

    /// Which quadrant of `self` contains the (strictly smaller, aligned)
    /// coordinate `inner`.
    ///
    /// # Panics
    ///
    /// Panics if `inner` does not lie inside `self`.
    #[must_use]
    pub fn quadrant_of(&self, inner: &BlockCoord) -> usize {
        assert!(
            inner.size_shift < self.size_shift && self.rect().contains(inner.x, inner.y),
            "{inner:?} is not a descendant of {self:?}"
        );
        let half = 1i32 << (self.size_shift - 1);
        let qx = usize::from(inner.x - self.x >= half);
        let qy = usize::from(inner.y - self.y >= half);
        (qy << 1) | qx
    }
}
