use glam::Vec3;

/// An axis-aligned bounding box in world f32 space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Vec3,
    /// Maximum corner of the bounding box.
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Returns the center point of the AABB.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the half-extents (half-size along each axis).
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Returns true if the AABBs overlap (touching faces count).
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }
}

/// An axis-aligned rectangle on the integer terrain grid, `[min, max)` on
/// both axes. Used for physics update regions and root-block bucketing.
///
/// Invariant: `min_x <= max_x` and `min_y <= max_y`. The constructor sorts
/// components to enforce it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridRect {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl GridRect {
    /// Create a rect from two opposite corners, sorting components so that
    /// min <= max on both axes.
    pub fn new(a: (i32, i32), b: (i32, i32)) -> Self {
        Self {
            min_x: a.0.min(b.0),
            min_y: a.1.min(b.1),
            max_x: a.0.max(b.0),
            max_y: a.1.max(b.1),
        }
    }

    /// Returns true if the half-open rects overlap.
    pub fn intersects(&self, other: &GridRect) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// Returns true if the point lies inside the half-open rect.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x && x < self.max_x && y >= self.min_y && y < self.max_y
    }

    /// Width along the x axis.
    pub fn width(&self) -> i64 {
        i64::from(self.max_x) - i64::from(self.min_x)
    }

    /// Height along the y axis.
    pub fn height(&self) -> i64 {
        i64::from(self.max_y) - i64::from(self.min_y)
    }
}
