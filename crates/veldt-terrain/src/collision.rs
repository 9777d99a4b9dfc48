//! Collision hooks for physics-backed terrain.
//!
//! The terrain itself never talks to a physics engine directly; it drives a
//! [`CollisionFactory`] that creates and releases shapes and bodies. The
//! factory implementation lives in a separate crate so the core stays free
//! of the physics dependency.

use glam::Vec3;

/// Opaque handle to a collision shape owned by the factory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShapeHandle(pub u64);

/// Opaque handle to a rigid body owned by the factory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub u64);

/// Collision objects owned by one terrain block.
#[derive(Debug)]
pub struct BlockCollision {
    /// Heightfield shape for the terrain surface.
    pub shape: ShapeHandle,
    /// Static body the heightfield is attached to.
    pub body: BodyHandle,
    /// Sensor volume for the water surface, present when the block dips
    /// below the water level.
    pub water: Option<WaterCollision>,
}

/// Sensor shape and body for the water volume over a submerged block.
#[derive(Debug)]
pub struct WaterCollision {
    pub shape: ShapeHandle,
    pub body: BodyHandle,
}

/// Bridge between terrain blocks and a physics engine.
///
/// Every `create_*` call transfers ownership of the returned handle to the
/// caller, which must hand it back through the matching `release_*` exactly
/// once.
pub trait CollisionFactory {
    /// Create a heightfield shape from a row-major grid of `rows x cols`
    /// heights. `scale` spans the field across the block in world units.
    fn create_heightfield(&mut self, heights: &[f32], rows: usize, cols: usize, scale: Vec3)
    -> ShapeHandle;

    /// Create a box shape with the given half extents.
    fn create_box(&mut self, half_extents: Vec3) -> ShapeHandle;

    /// Create a fixed body at `translation` carrying `shape`. A `sensor`
    /// body detects overlap without colliding.
    fn create_static_body(&mut self, shape: ShapeHandle, translation: Vec3, sensor: bool)
    -> BodyHandle;

    fn release_shape(&mut self, shape: ShapeHandle);

    fn release_body(&mut self, body: BodyHandle);
}

/// Factory that records every call without touching a physics engine.
///
/// Used by tests to assert that each created handle is released exactly
/// once.
#[derive(Debug, Default)]
pub struct NullCollisionFactory {
    next_handle: u64,
    /// Shapes created and not yet released.
    pub live_shapes: Vec<ShapeHandle>,
    /// Bodies created and not yet released.
    pub live_bodies: Vec<BodyHandle>,
    /// Total shapes created over the factory's lifetime.
    pub shapes_created: u64,
    /// Total bodies created over the factory's lifetime.
    pub bodies_created: u64,
    /// How many of the created bodies were sensors.
    pub sensors_created: u64,
}

impl NullCollisionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when every created handle has been released.
    pub fn is_drained(&self) -> bool {
        self.live_shapes.is_empty() && self.live_bodies.is_empty()
    }

    fn next(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl CollisionFactory for NullCollisionFactory {
    fn create_heightfield(
        &mut self,
        heights: &[f32],
        rows: usize,
        cols: usize,
        _scale: Vec3,
    ) -> ShapeHandle {
        assert_eq!(
            heights.len(),
            rows * cols,
            "heightfield grid is {} values but {rows}x{cols} was declared",
            heights.len()
        );
        let handle = ShapeHandle(self.next());
        self.live_shapes.push(handle);
        self.shapes_created += 1;
        handle
    }

    fn create_box(&mut self, _half_extents: Vec3) -> ShapeHandle {
        let handle = ShapeHandle(self.next());
        self.live_shapes.push(handle);
        self.shapes_created += 1;
        handle
    }

    fn create_static_body(
        &mut self,
        _shape: ShapeHandle,
        _translation: Vec3,
        sensor: bool,
    ) -> BodyHandle {
        let handle = BodyHandle(self.next());
        self.live_bodies.push(handle);
        self.bodies_created += 1;
        if sensor {
            self.sensors_created += 1;
        }
        handle
    }

    fn release_shape(&mut self, shape: ShapeHandle) {
        let index = self
            .live_shapes
            .iter()
            .position(|&s| s == shape)
            .unwrap_or_else(|| panic!("shape {shape:?} released twice or never created"));
        self.live_shapes.swap_remove(index);
    }

    fn release_body(&mut self, body: BodyHandle) {
        let index = self
            .live_bodies
            .iter()
            .position(|&b| b == body)
            .unwrap_or_else(|| panic!("body {body:?} released twice or never created"));
        self.live_bodies.swap_remove(index);
    }
}
