//! The Rapier-backed collision factory the terrain drives.

use std::cell::RefCell;
use std::rc::Rc;

use rapier3d::parry::utils::Array2;
use rapier3d::prelude::*;
use rustc_hash::FxHashMap;
use veldt_terrain::{BodyHandle, CollisionFactory, ShapeHandle};

use crate::PhysicsWorld;

/// Creates and releases terrain colliders inside a shared [`PhysicsWorld`].
///
/// The world is shared so the caller can keep stepping the simulation while
/// the terrain owns the factory through its backend. Handle values are never
/// reused, so a stale release is caught instead of freeing someone else's
/// collider.
pub struct RapierCollisionFactory {
    world: Rc<RefCell<PhysicsWorld>>,
    shapes: FxHashMap<u64, SharedShape>,
    bodies: FxHashMap<u64, RigidBodyHandle>,
    next_handle: u64,
    friction: f32,
}

impl RapierCollisionFactory {
    pub fn new(world: Rc<RefCell<PhysicsWorld>>) -> Self {
        Self {
            world,
            shapes: FxHashMap::default(),
            bodies: FxHashMap::default(),
            next_handle: 0,
            friction: 0.7,
        }
    }

    fn next(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl CollisionFactory for RapierCollisionFactory {
    fn create_heightfield(
        &mut self,
        heights: &[f32],
        rows: usize,
        cols: usize,
        scale: glam::Vec3,
    ) -> ShapeHandle {
        assert_eq!(
            heights.len(),
            rows * cols,
            "heightfield grid is {} values but {rows}x{cols} was declared",
            heights.len()
        );
        // Rapier centers a heightfield vertically on its body, so the grid
        // is recentered here and the body translation carries the offset.
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for &h in heights {
            min = min.min(h);
            max = max.max(h);
        }
        let mid = (min + max) * 0.5;
        let grid = Array2::from_fn(rows, cols, |r, c| heights[r * cols + c] - mid);
        let shape = SharedShape::heightfield(grid, Vector::new(scale.x, scale.y, scale.z));

        let id = self.next();
        self.shapes.insert(id, shape);
        ShapeHandle(id)
    }

    fn create_box(&mut self, half_extents: glam::Vec3) -> ShapeHandle {
        let shape = SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z);
        let id = self.next();
        self.shapes.insert(id, shape);
        ShapeHandle(id)
    }

    fn create_static_body(
        &mut self,
        shape: ShapeHandle,
        translation: glam::Vec3,
        sensor: bool,
    ) -> BodyHandle {
        let shared = self
            .shapes
            .get(&shape.0)
            .unwrap_or_else(|| panic!("body references unknown shape {shape:?}"))
            .clone();
        let id = self.next();

        let mut world = self.world.borrow_mut();
        let body = RigidBodyBuilder::fixed()
            .translation(Vector::new(translation.x, translation.y, translation.z))
            .build();
        let body_handle = world.rigid_body_set.insert(body);

        let collider = ColliderBuilder::new(shared)
            .friction(self.friction)
            .restitution(0.0)
            .sensor(sensor)
            .build();
        let world = &mut *world;
        world
            .collider_set
            .insert_with_parent(collider, body_handle, &mut world.rigid_body_set);

        self.bodies.insert(id, body_handle);
        tracing::trace!(body = id, sensor, "terrain body created");
        BodyHandle(id)
    }

    fn release_shape(&mut self, shape: ShapeHandle) {
        if self.shapes.remove(&shape.0).is_none() {
            tracing::warn!(?shape, "released unknown shape");
        }
    }

    fn release_body(&mut self, body: BodyHandle) {
        let Some(handle) = self.bodies.remove(&body.0) else {
            tracing::warn!(?body, "released unknown body");
            return;
        };
        let mut world = self.world.borrow_mut();
        let world = &mut *world;
        // Removing the body also removes its attached collider.
        world.rigid_body_set.remove(
            handle,
            &mut world.island_manager,
            &mut world.collider_set,
            &mut world.impulse_joint_set,
            &mut world.multibody_joint_set,
            true,
        );
    }
}
