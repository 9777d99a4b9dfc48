//! A single quadtree node and its lifecycle state machine.

use crossbeam_channel::{Receiver, TryRecvError};

use crate::collision::{BlockCollision, CollisionFactory};
use crate::coord::BlockCoord;
use crate::geometry::BuiltGeometry;

/// Lifecycle state of a block.
///
/// Blocks move forward through `Initializing -> Initialized ->
/// PendingSubdivision -> Subdivided` and can be demoted from either
/// subdivision state back to `Initialized` when detail is no longer wanted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockState {
    /// Geometry build requested but not yet delivered.
    Initializing,
    /// Geometry present; the block can render.
    Initialized,
    /// Subdivision wanted; waiting for all children to initialize.
    PendingSubdivision,
    /// Children render in place of this block.
    Subdivided,
}

/// One node of the terrain quadtree.
pub struct Block {
    pub coord: BlockCoord,
    pub state: BlockState,
    /// Child order matches [`BlockCoord::child`]: bit 0 selects +x, bit 1
    /// selects +y.
    pub children: [Option<Box<Block>>; 4],
    /// Lowest sampled height, valid once initialized.
    pub min_height: f32,
    /// Highest sampled height, valid once initialized.
    pub max_height: f32,
    /// Last tick the traversal visited this block.
    pub last_seen_tick: u64,
    /// Last tick this block appeared in the render list.
    pub last_rendered_tick: u64,
    /// Tick the block entered `Subdivided`, for the one-frame handover
    /// where parent and children both render.
    pub subdivided_tick: u64,
    pub geometry: Option<BuiltGeometry>,
    pub collision: Option<BlockCollision>,
    /// Channel an in-flight async build will deliver on.
    pub pending: Option<Receiver<BuiltGeometry>>,
}

impl Block {
    pub fn new(coord: BlockCoord, tick: u64) -> Self {
        Self {
            coord,
            state: BlockState::Initializing,
            children: [None, None, None, None],
            min_height: 0.0,
            max_height: 0.0,
            last_seen_tick: tick,
            last_rendered_tick: 0,
            subdivided_tick: 0,
            geometry: None,
            collision: None,
            pending: None,
        }
    }

    /// Attach finished geometry and move out of `Initializing`.
    pub fn install_geometry(&mut self, built: BuiltGeometry) {
        self.min_height = built.min_height;
        self.max_height = built.max_height;
        self.geometry = Some(built);
        self.pending = None;
        if self.state == BlockState::Initializing {
            self.state = BlockState::Initialized;
        }
    }

    pub fn install_collision(&mut self, collision: BlockCollision) {
        self.collision = Some(collision);
    }

    /// Poll the pending build channel and promote to `Initialized` when
    /// the geometry arrives. Returns whether the block has geometry.
    pub fn poll_initialized(&mut self) -> bool {
        if self.state != BlockState::Initializing {
            return true;
        }
        let Some(receiver) = &self.pending else {
            return false;
        };
        match receiver.try_recv() {
            Ok(built) => {
                self.install_geometry(built);
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                tracing::error!(coord = ?self.coord, "geometry build channel disconnected");
                self.pending = None;
                false
            }
        }
    }

    /// Collapse back to a single rendering block.
    pub fn demote(&mut self) {
        debug_assert!(
            matches!(
                self.state,
                BlockState::PendingSubdivision | BlockState::Subdivided
            ),
            "demote from {:?}",
            self.state
        );
        self.state = BlockState::Initialized;
    }

    pub fn child_slot_mut(&mut self, quadrant: usize) -> &mut Option<Box<Block>> {
        &mut self.children[quadrant]
    }

    /// Release this block's collision objects and those of its whole
    /// subtree. Returns the number of blocks torn down, including self.
    pub fn terminate(
        &mut self,
        factory: &mut Option<&mut (dyn CollisionFactory + 'static)>,
    ) -> u64 {
        let mut released = 1;
        for slot in &mut self.children {
            if let Some(child) = slot.as_deref_mut() {
                released += child.terminate(factory);
            }
            *slot = None;
        }
        if let Some(collision) = self.collision.take() {
            if let Some(factory) = factory.as_deref_mut() {
                factory.release_body(collision.body);
                factory.release_shape(collision.shape);
                if let Some(water) = collision.water {
                    factory.release_body(water.body);
                    factory.release_shape(water.shape);
                }
            }
        }
        released
    }

    /// Drop children whose last visit is at or before `cutoff`, releasing
    /// their resources. Recurses into surviving children. Returns the
    /// number of blocks released.
    pub fn expire_children(
        &mut self,
        cutoff: u64,
        factory: &mut Option<&mut (dyn CollisionFactory + 'static)>,
    ) -> u64 {
        let mut released = 0;
        let mut any_left = false;
        for slot in &mut self.children {
            let Some(child) = slot.as_deref_mut() else {
                continue;
            };
            if child.last_seen_tick <= cutoff {
                released += child.terminate(factory);
                *slot = None;
            } else {
                released += child.expire_children(cutoff, factory);
                any_left = true;
            }
        }
        // Losing every child invalidates a subdivided state.
        if !any_left
            && matches!(
                self.state,
                BlockState::PendingSubdivision | BlockState::Subdivided
            )
        {
            self.demote();
        }
        released
    }
}
