//! Physics integration for terrain collision.
//!
//! Wraps the Rapier 3D physics engine behind a single [`PhysicsWorld`] that
//! owns all simulation state, and provides [`RapierCollisionFactory`], the
//! bridge the terrain drives to keep heightfield colliders in sync with its
//! quadtree.

mod terrain_factory;

pub use terrain_factory::RapierCollisionFactory;

use rapier3d::prelude::*;

/// Central physics simulation owning all Rapier state.
pub struct PhysicsWorld {
    /// World-space gravity vector.
    pub gravity: Vector,
    /// Timestep and solver configuration.
    pub integration_parameters: IntegrationParameters,
    /// The main simulation pipeline.
    pub physics_pipeline: PhysicsPipeline,
    /// Tracks sleeping/awake body islands.
    pub island_manager: IslandManager,
    /// Broad-phase collision detection (also provides query pipeline).
    pub broad_phase: BroadPhaseBvh,
    /// Narrow-phase collision detection (contact manifolds).
    pub narrow_phase: NarrowPhase,
    /// All rigid bodies in the simulation.
    pub rigid_body_set: RigidBodySet,
    /// All colliders in the simulation.
    pub collider_set: ColliderSet,
    /// Impulse-based joints.
    pub impulse_joint_set: ImpulseJointSet,
    /// Multibody joints.
    pub multibody_joint_set: MultibodyJointSet,
    /// Continuous collision detection solver.
    pub ccd_solver: CCDSolver,
}

impl PhysicsWorld {
    /// Creates a new physics world with default gravity `(0, -9.81, 0)` and
    /// a timestep of `1/60` seconds.
    pub fn new() -> Self {
        let integration_parameters = IntegrationParameters {
            dt: 1.0 / 60.0,
            ..Default::default()
        };

        Self {
            gravity: Vector::new(0.0, -9.81, 0.0),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
        }
    }

    /// Advances the simulation by one fixed timestep.
    pub fn step(&mut self) {
        self.physics_pipeline.step(
            self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            &(),
            &(),
        );
    }

    /// Number of colliders currently in the simulation.
    pub fn collider_count(&self) -> usize {
        self.collider_set.len()
    }

    /// Number of sensor colliders currently in the simulation.
    pub fn sensor_count(&self) -> usize {
        self.collider_set
            .iter()
            .filter(|(_, collider)| collider.is_sensor())
            .count()
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}
