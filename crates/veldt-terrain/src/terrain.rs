//! The terrain manager: root bookkeeping, the per-tick traversal, and
//! resource expiration.
//!
//! Each call to [`Terrain::update`] walks the quadtree under every root
//! block near the camera, subdividing where a block's projected width
//! exceeds the configured threshold and merging where it no longer does.
//! A block whose subdivision is granted stops rendering only once all of
//! its children hold geometry, so the surface never shows a hole during
//! the handover. Blocks that go unvisited for the expiration window give
//! their geometry and collision objects back.

use std::cmp::Reverse;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec3;
use hashbrown::HashMap;
use veldt_math::{Aabb, GridRect};
use veldt_mesh::EdgeMask;

use crate::block::{Block, BlockState};
use crate::collision::{BlockCollision, CollisionFactory, WaterCollision};
use crate::config::TerrainConfig;
use crate::coord::BlockCoord;
use crate::edges::EdgeResolver;
use crate::error::TerrainError;
use crate::geometry::{AsyncGeometryBuilder, BuildMode, BuiltGeometry, build_geometry};
use crate::render_list::{RenderEntry, RenderFlags};
use crate::sampler::HeightSource;
use crate::view::ViewState;

/// What the terrain produces blocks for.
pub enum Backend {
    /// Visual terrain: vertex buffers and a render list.
    Render,
    /// Collision terrain: heightfields handed to the given factory.
    Physics(Box<dyn CollisionFactory>),
}

/// Adaptive quadtree terrain over a height source.
pub struct Terrain {
    config: TerrainConfig,
    sampler: Arc<dyn HeightSource>,
    backend: Backend,
    builder: Option<AsyncGeometryBuilder>,
    roots: HashMap<(i32, i32), Box<Block>>,
    render_list: Vec<RenderEntry>,
    live_blocks: AtomicU64,
    lowest_shift: u32,
}

impl Terrain {
    /// Create a terrain over `sampler`.
    ///
    /// Returns an error if the configuration fails validation. The worker
    /// pool is only spawned for async render terrains; physics terrains
    /// always build synchronously so colliders exist when `update_region`
    /// returns.
    pub fn new(
        config: TerrainConfig,
        sampler: Arc<dyn HeightSource>,
        backend: Backend,
    ) -> Result<Self, TerrainError> {
        config.validate()?;
        let builder = (config.async_build && matches!(backend, Backend::Render))
            .then(|| AsyncGeometryBuilder::new(config.build_threads));
        Ok(Self {
            config,
            sampler,
            backend,
            builder,
            roots: HashMap::new(),
            render_list: Vec::new(),
            live_blocks: AtomicU64::new(0),
            lowest_shift: u32::MAX,
        })
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Blocks currently held anywhere in the tree.
    pub fn live_block_count(&self) -> u64 {
        self.live_blocks.load(Ordering::Relaxed)
    }

    /// The render list produced by the last `update`, sorted by descending
    /// block size with edge masks resolved.
    pub fn render_list(&self) -> &[RenderEntry] {
        &self.render_list
    }

    /// Smallest block size the last tick's traversal reached, `None`
    /// before the first update.
    pub fn lowest_shift(&self) -> Option<u32> {
        (self.lowest_shift != u32::MAX).then_some(self.lowest_shift)
    }

    /// Advance the visual terrain one tick for the given camera.
    ///
    /// Calling this again with the same `view` and `tick` is a no-op on
    /// the tree and reproduces the same render list.
    pub fn update(&mut self, view: &ViewState, tick: u64) {
        let _span = tracing::debug_span!("terrain_update", tick).entered();
        let cutoff = tick.saturating_sub(self.config.expiration_ticks);
        self.render_list.clear();

        let root_width = 1i32 << self.config.largest_block_shift;
        let min_x = align_down((view.position.x - self.config.view_distance).floor() as i32, root_width);
        let max_x = align_down((view.position.x + self.config.view_distance).floor() as i32, root_width);
        let min_y = align_down((view.position.z - self.config.view_distance).floor() as i32, root_width);
        let max_y = align_down((view.position.z + self.config.view_distance).floor() as i32, root_width);

        let Terrain {
            config,
            sampler,
            backend,
            builder,
            roots,
            render_list,
            live_blocks,
            lowest_shift,
        } = self;
        let factory = match backend {
            Backend::Physics(factory) => Some(factory.as_mut()),
            Backend::Render => None,
        };
        let mut ctx = TickCtx {
            config,
            sampler,
            builder: builder.as_ref(),
            factory,
            view: Some(view),
            region: None,
            mode: BuildMode::Render,
            tick,
            cutoff,
            render_list,
            live_blocks,
        };

        let fallback = (config.fallback_min_height, config.fallback_max_height);
        let mut lowest = u32::MAX;
        let mut x = min_x;
        while x <= max_x {
            let mut y = min_y;
            while y <= max_y {
                let coord = BlockCoord::new(x, y, config.largest_block_shift);
                let mut slot = roots.remove(&(x, y));
                lowest = lowest.min(ctx.test_block(&mut slot, coord, fallback, true));
                if let Some(root) = slot {
                    roots.insert((x, y), root);
                }
                y += root_width;
            }
            x += root_width;
        }
        *lowest_shift = lowest;

        sweep_roots(roots, cutoff, &mut ctx.factory, live_blocks);

        render_list.sort_unstable_by_key(|e| {
            (Reverse(e.coord.size_shift), e.coord.x, e.coord.y)
        });
        EdgeResolver::resolve(render_list, config.largest_block_shift);
    }

    /// Advance the physics terrain one tick, subdividing every block that
    /// overlaps `region` down to the smallest size and keeping a collider
    /// on each smallest block.
    pub fn update_region(&mut self, region: GridRect, tick: u64) {
        let _span = tracing::debug_span!("terrain_update_region", tick).entered();
        let cutoff = tick.saturating_sub(self.config.expiration_ticks);
        self.render_list.clear();

        let root_width = 1i32 << self.config.largest_block_shift;
        let min_x = align_down(region.min_x, root_width);
        let max_x = align_down(region.max_x - 1, root_width);
        let min_y = align_down(region.min_y, root_width);
        let max_y = align_down(region.max_y - 1, root_width);

        let Terrain {
            config,
            sampler,
            backend,
            builder: _,
            roots,
            render_list,
            live_blocks,
            lowest_shift,
        } = self;
        let factory = match backend {
            Backend::Physics(factory) => Some(factory.as_mut()),
            Backend::Render => None,
        };
        let mut ctx = TickCtx {
            config,
            sampler,
            builder: None,
            factory,
            view: None,
            region: Some(region),
            mode: BuildMode::Physics,
            tick,
            cutoff,
            render_list,
            live_blocks,
        };

        let fallback = (config.fallback_min_height, config.fallback_max_height);
        let mut lowest = u32::MAX;
        let mut x = min_x;
        while x <= max_x {
            let mut y = min_y;
            while y <= max_y {
                let coord = BlockCoord::new(x, y, config.largest_block_shift);
                if region.intersects(&coord.rect()) {
                    let mut slot = roots.remove(&(x, y));
                    lowest = lowest.min(ctx.test_block(&mut slot, coord, fallback, true));
                    if let Some(root) = slot {
                        roots.insert((x, y), root);
                    }
                }
                y += root_width;
            }
            x += root_width;
        }
        *lowest_shift = lowest;

        sweep_roots(roots, cutoff, &mut ctx.factory, live_blocks);
    }

    /// Height of the terrain surface at a point, interpolated from the
    /// finest block holding geometry there. Falls back to sampling the
    /// height source directly when no built block covers the point yet.
    pub fn query_height(&self, x: f64, z: f64) -> f32 {
        match self.built_height(x, z) {
            Some(height) => height,
            None => self.sampler.sample(x, z).height,
        }
    }

    fn built_height(&self, x: f64, z: f64) -> Option<f32> {
        let root_width = 1i32 << self.config.largest_block_shift;
        let rx = align_down(x.floor() as i32, root_width);
        let ry = align_down(z.floor() as i32, root_width);
        let mut block: &Block = self.roots.get(&(rx, ry))?;
        let mut best = block.geometry.as_ref().map(|g| (block.coord, g));
        loop {
            let next = block.children.iter().flatten().find(|child| {
                let r = child.coord.rect();
                r.contains(x.floor() as i32, z.floor() as i32)
            });
            match next {
                Some(child) => {
                    block = child;
                    if let Some(geometry) = block.geometry.as_ref() {
                        best = Some((block.coord, geometry));
                    }
                }
                None => break,
            }
        }
        let (coord, geometry) = best?;
        Some(interpolate_height(coord, geometry, x, z))
    }

    /// Look up a block's lifecycle state.
    pub fn block_state(&self, coord: BlockCoord) -> Option<BlockState> {
        self.find_block(coord).map(|block| block.state)
    }

    /// Borrow a block's built geometry, if present.
    pub fn block_geometry(&self, coord: BlockCoord) -> Option<&BuiltGeometry> {
        self.find_block(coord).and_then(|block| block.geometry.as_ref())
    }

    fn find_block(&self, coord: BlockCoord) -> Option<&Block> {
        let root_width = 1i32 << self.config.largest_block_shift;
        let rx = align_down(coord.x, root_width);
        let ry = align_down(coord.y, root_width);
        let mut block: &Block = self.roots.get(&(rx, ry))?;
        while block.coord != coord {
            let quadrant = block.coord.quadrant_of(&coord);
            block = block.children[quadrant].as_deref()?;
        }
        Some(block)
    }
}

fn align_down(value: i32, width: i32) -> i32 {
    value & !(width - 1)
}

/// Bilinear interpolation of a block's height grid at a world point.
fn interpolate_height(coord: BlockCoord, geometry: &BuiltGeometry, x: f64, z: f64) -> f32 {
    let n = geometry.grid_size;
    let w = f64::from(coord.width());
    let fx = ((x - f64::from(coord.x)) / w * n as f64).clamp(0.0, n as f64);
    let fz = ((z - f64::from(coord.y)) / w * n as f64).clamp(0.0, n as f64);
    let i = (fx.floor() as usize).min(n - 1);
    let j = (fz.floor() as usize).min(n - 1);
    let tx = (fx - i as f64) as f32;
    let tz = (fz - j as f64) as f32;
    let stride = n + 1;
    let h00 = geometry.heights[j * stride + i];
    let h10 = geometry.heights[j * stride + i + 1];
    let h01 = geometry.heights[(j + 1) * stride + i];
    let h11 = geometry.heights[(j + 1) * stride + i + 1];
    let bottom = h00 + (h10 - h00) * tx;
    let top = h01 + (h11 - h01) * tx;
    bottom + (top - bottom) * tz
}

fn sweep_roots(
    roots: &mut HashMap<(i32, i32), Box<Block>>,
    cutoff: u64,
    factory: &mut Option<&mut (dyn CollisionFactory + 'static)>,
    live_blocks: &AtomicU64,
) {
    roots.retain(|_, root| {
        if root.last_seen_tick <= cutoff {
            let released = root.terminate(factory);
            live_blocks.fetch_sub(released, Ordering::Relaxed);
            tracing::debug!(coord = ?root.coord, released, "root block expired");
            false
        } else {
            true
        }
    });
}

/// Borrows for one traversal tick.
struct TickCtx<'a> {
    config: &'a TerrainConfig,
    sampler: &'a Arc<dyn HeightSource>,
    builder: Option<&'a AsyncGeometryBuilder>,
    factory: Option<&'a mut (dyn CollisionFactory + 'static)>,
    view: Option<&'a ViewState>,
    region: Option<GridRect>,
    mode: BuildMode,
    tick: u64,
    cutoff: u64,
    render_list: &'a mut Vec<RenderEntry>,
    live_blocks: &'a AtomicU64,
}

impl TickCtx<'_> {
    /// Visit one block slot: create, initialize, subdivide or merge, and
    /// recurse. Returns the smallest `size_shift` reached under this slot.
    ///
    /// `parent_bounds` supplies the vertical extent assumed before the
    /// block has sampled its own heights. `parent_subdivided` is false
    /// while the parent still renders in this block's place, which
    /// includes the tick the parent hands over so a repeated update of
    /// the same tick reproduces the same render list.
    fn test_block(
        &mut self,
        slot: &mut Option<Box<Block>>,
        coord: BlockCoord,
        parent_bounds: (f32, f32),
        parent_subdivided: bool,
    ) -> u32 {
        let width = coord.width() as f32;
        let (min_h, max_h) = match slot.as_deref() {
            Some(block) if block.geometry.is_some() => (block.min_height, block.max_height),
            _ => parent_bounds,
        };
        let aabb = Aabb::new(
            Vec3::new(coord.x as f32, min_h, coord.y as f32),
            Vec3::new(coord.x as f32 + width, max_h, coord.y as f32 + width),
        );
        let center = aabb.center();

        let mut frustum_visible = false;
        if let Some(view) = self.view {
            frustum_visible = view.frustum.is_visible(&aabb);
            let visible =
                frustum_visible || view.facing_dot(center) > self.config.close_dot_threshold;
            if !visible {
                // Children of an invisible block go stale and drop off once
                // the window passes.
                if let Some(block) = slot.as_deref_mut() {
                    let released = block.expire_children(self.cutoff, &mut self.factory);
                    self.live_blocks.fetch_sub(released, Ordering::Relaxed);
                }
                return coord.size_shift;
            }
        }

        if slot.is_none() {
            if !self.sampler.is_ready(&coord.rect()) {
                return coord.size_shift;
            }
            let mut block = Block::new(coord, self.tick);
            match self.builder {
                Some(builder) => {
                    block.pending = Some(builder.submit(
                        coord,
                        self.config.clone(),
                        Arc::clone(self.sampler),
                    ));
                }
                None => {
                    block.install_geometry(build_geometry(
                        self.config,
                        coord,
                        self.sampler.as_ref(),
                        self.mode,
                    ));
                }
            }
            self.live_blocks.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(?coord, "block created");
            *slot = Some(Box::new(block));
        }
        let Some(block) = slot.as_deref_mut() else {
            return coord.size_shift;
        };
        block.last_seen_tick = self.tick;

        if !block.poll_initialized() {
            return coord.size_shift;
        }

        if self.mode == BuildMode::Physics
            && block.collision.is_none()
            && coord.size_shift <= self.config.smallest_block_shift
        {
            Self::install_collision(self.config, self.factory.as_deref_mut(), block);
        }

        let wants_subdivide = coord.size_shift > self.config.smallest_block_shift
            && match (self.view, self.region) {
                (Some(view), _) => {
                    view.block_screen_width(center, width)
                        > self.config.block_screen_width_threshold
                }
                (None, Some(region)) => region.intersects(&coord.rect()),
                (None, None) => false,
            };

        match block.state {
            BlockState::Initialized => {
                if wants_subdivide {
                    block.state = BlockState::PendingSubdivision;
                    tracing::trace!(?coord, "subdivision requested");
                }
            }
            BlockState::PendingSubdivision | BlockState::Subdivided => {
                if !wants_subdivide {
                    block.demote();
                    tracing::trace!(?coord, "merged");
                }
            }
            BlockState::Initializing => {}
        }

        let renders = parent_subdivided
            && match block.state {
                BlockState::Initialized | BlockState::PendingSubdivision => true,
                // The handover frame: the parent renders one final time
                // alongside nothing (children start next tick).
                BlockState::Subdivided => block.subdivided_tick == self.tick,
                BlockState::Initializing => false,
            };
        if renders && self.mode == BuildMode::Render {
            block.last_rendered_tick = self.tick;
            let mut flags = RenderFlags::OPAQUE;
            if block.min_height < self.config.water_level {
                flags = flags.with(RenderFlags::WATER);
            }
            if frustum_visible {
                flags = flags.with(RenderFlags::FRUSTUM_VISIBLE);
            }
            self.render_list.push(RenderEntry {
                coord,
                edge_mask: EdgeMask::EMPTY,
                flags,
                min_height: block.min_height,
                max_height: block.max_height,
            });
        }

        let mut lowest = coord.size_shift;
        match block.state {
            BlockState::PendingSubdivision => {
                let bounds = (block.min_height, block.max_height);
                lowest = lowest.min(self.recurse_children(block, coord, bounds, false));
                let mut any = false;
                let mut all_initialized = true;
                for child in block.children.iter().flatten() {
                    any = true;
                    if child.state == BlockState::Initializing {
                        all_initialized = false;
                    }
                }
                if any && all_initialized {
                    block.state = BlockState::Subdivided;
                    block.subdivided_tick = self.tick;
                    tracing::trace!(?coord, "subdivided");
                }
            }
            BlockState::Subdivided => {
                let bounds = (block.min_height, block.max_height);
                let handover = block.subdivided_tick == self.tick;
                lowest = lowest.min(self.recurse_children(block, coord, bounds, !handover));
            }
            BlockState::Initializing | BlockState::Initialized => {}
        }

        let released = block.expire_children(self.cutoff, &mut self.factory);
        self.live_blocks.fetch_sub(released, Ordering::Relaxed);
        lowest
    }

    /// Visits the four child slots and returns the smallest size reached,
    /// `u32::MAX` when the region filter skipped all of them.
    fn recurse_children(
        &mut self,
        block: &mut Block,
        coord: BlockCoord,
        bounds: (f32, f32),
        parent_subdivided: bool,
    ) -> u32 {
        let mut lowest = u32::MAX;
        for quadrant in 0..4 {
            let child_coord = coord.child(quadrant);
            if let Some(region) = self.region {
                if !region.intersects(&child_coord.rect()) {
                    continue;
                }
            }
            lowest = lowest.min(self.test_block(
                block.child_slot_mut(quadrant),
                child_coord,
                bounds,
                parent_subdivided,
            ));
        }
        lowest
    }

    /// Build the heightfield collider (and water sensor, when the block
    /// dips below the water level) for a smallest-size block.
    fn install_collision(
        config: &TerrainConfig,
        factory: Option<&mut (dyn CollisionFactory + 'static)>,
        block: &mut Block,
    ) {
        let Some(factory) = factory else { return };
        let Some(geometry) = block.geometry.as_ref() else {
            return;
        };
        let coord = block.coord;
        let width = coord.width() as f32;
        let (cx, cy) = coord.center();
        let n = geometry.grid_size;
        let scale = Vec3::new(width, config.physics_height_scale, width);
        let shape = factory.create_heightfield(&geometry.heights, n + 1, n + 1, scale);
        let body_y = (block.min_height + block.max_height) * 0.5 * config.physics_height_scale;
        let body = factory.create_static_body(shape, Vec3::new(cx, body_y, cy), false);

        let water = if block.min_height < config.water_level {
            let half_depth =
                (config.water_level - block.min_height) * 0.5 * config.physics_height_scale;
            let water_shape = factory.create_box(Vec3::new(width * 0.5, half_depth, width * 0.5));
            let water_y =
                (config.water_level + block.min_height) * 0.5 * config.physics_height_scale;
            let water_body =
                factory.create_static_body(water_shape, Vec3::new(cx, water_y, cy), true);
            Some(WaterCollision {
                shape: water_shape,
                body: water_body,
            })
        } else {
            None
        };

        tracing::trace!(?coord, water = water.is_some(), "collider created");
        block.install_collision(BlockCollision { shape, body, water });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::NullCollisionFactory;
    use crate::sampler::ConstantHeightSource;
    use glam::Mat4;
    use std::cell::RefCell;
    use std::f32::consts::FRAC_PI_2;
    use std::rc::Rc;
    use std::time::{Duration, Instant};
    use veldt_mesh::Side;

    /// Null factory behind shared ownership so tests can inspect it while
    /// the terrain owns the backend.
    #[derive(Clone, Default)]
    struct SharedFactory(Rc<RefCell<NullCollisionFactory>>);

    impl CollisionFactory for SharedFactory {
        fn create_heightfield(
            &mut self,
            heights: &[f32],
            rows: usize,
            cols: usize,
            scale: Vec3,
        ) -> crate::ShapeHandle {
            self.0.borrow_mut().create_heightfield(heights, rows, cols, scale)
        }

        fn create_box(&mut self, half_extents: Vec3) -> crate::ShapeHandle {
            self.0.borrow_mut().create_box(half_extents)
        }

        fn create_static_body(
            &mut self,
            shape: crate::ShapeHandle,
            translation: Vec3,
            sensor: bool,
        ) -> crate::BodyHandle {
            self.0.borrow_mut().create_static_body(shape, translation, sensor)
        }

        fn release_shape(&mut self, shape: crate::ShapeHandle) {
            self.0.borrow_mut().release_shape(shape);
        }

        fn release_body(&mut self, body: crate::BodyHandle) {
            self.0.borrow_mut().release_body(body);
        }
    }

    fn small_config() -> TerrainConfig {
        TerrainConfig {
            largest_block_shift: 2,
            smallest_block_shift: 0,
            block_vertex_shift: 2,
            view_distance: 1.0,
            expiration_ticks: 2,
            fallback_min_height: -16.0,
            fallback_max_height: 16.0,
            ..Default::default()
        }
    }

    /// Camera straight above the origin root, looking down. With a square
    /// 90 degree frustum the screen-width metric of a block is exactly
    /// width / distance.
    fn overhead_view(height: f32) -> ViewState {
        ViewState::new(
            Vec3::new(2.0, height, 2.0),
            Vec3::NEG_Y,
            Vec3::Z,
            Mat4::perspective_rh(FRAC_PI_2, 1.0, 0.1, 1000.0),
        )
    }

    fn render_terrain(config: TerrainConfig) -> Terrain {
        Terrain::new(
            config,
            Arc::new(ConstantHeightSource::new(0.0)),
            Backend::Render,
        )
        .unwrap()
    }

    /// One root at distance 4: the root (width 4, metric 1.0) subdivides,
    /// its children (metric ~0.47) do not. The root renders its handover
    /// frame on the first tick and the four children take over on the
    /// second.
    #[test]
    fn test_subdivision_handover() {
        let mut terrain = render_terrain(small_config());
        let view = overhead_view(4.0);
        let root = BlockCoord::new(0, 0, 2);

        terrain.update(&view, 1);
        assert_eq!(terrain.render_list().len(), 1);
        assert_eq!(terrain.render_list()[0].coord, root);
        assert_eq!(terrain.block_state(root), Some(BlockState::Subdivided));
        assert_eq!(terrain.live_block_count(), 5);

        terrain.update(&view, 2);
        let list = terrain.render_list();
        assert_eq!(list.len(), 4);
        for entry in list {
            assert_eq!(entry.coord.size_shift, 1);
            assert!(entry.edge_mask.is_empty());
            assert!(entry.flags.contains(RenderFlags::OPAQUE));
        }
        assert_eq!(terrain.live_block_count(), 5);
        assert!(terrain.block_geometry(root).is_some());
    }

    /// Rendering stamps `last_rendered_tick`; ticks where the children
    /// render in a block's place leave it untouched.
    #[test]
    fn test_render_tick_is_recorded() {
        let mut terrain = render_terrain(small_config());
        let view = overhead_view(4.0);
        let root = BlockCoord::new(0, 0, 2);

        terrain.update(&view, 7);
        let block = terrain.find_block(root).unwrap();
        assert_eq!(block.last_rendered_tick, 7, "handover frame renders");
        assert_eq!(block.last_seen_tick, 7);

        terrain.update(&view, 8);
        let block = terrain.find_block(root).unwrap();
        assert_eq!(block.last_rendered_tick, 7, "children render instead");
        assert_eq!(block.last_seen_tick, 8);
        for entry in terrain.render_list() {
            let child = terrain.find_block(entry.coord).unwrap();
            assert_eq!(child.last_rendered_tick, 8);
        }
    }

    /// The traversal reports the smallest block size it reached.
    #[test]
    fn test_lowest_shift_tracks_traversal() {
        let mut terrain = render_terrain(small_config());
        assert_eq!(terrain.lowest_shift(), None);

        terrain.update(&overhead_view(100.0), 1);
        assert_eq!(terrain.lowest_shift(), Some(2), "roots only from afar");

        terrain.update(&overhead_view(4.0), 2);
        assert_eq!(terrain.lowest_shift(), Some(1), "children created");
    }

    /// Re-running the same tick leaves the tree and render list unchanged.
    #[test]
    fn test_update_is_idempotent() {
        let mut terrain = render_terrain(small_config());
        let view = overhead_view(4.0);

        for tick in [1, 2] {
            terrain.update(&view, tick);
            let first: Vec<(BlockCoord, EdgeMask)> = terrain
                .render_list()
                .iter()
                .map(|e| (e.coord, e.edge_mask))
                .collect();
            let live = terrain.live_block_count();

            terrain.update(&view, tick);
            let second: Vec<(BlockCoord, EdgeMask)> = terrain
                .render_list()
                .iter()
                .map(|e| (e.coord, e.edge_mask))
                .collect();
            assert_eq!(first, second, "render list changed on repeat of tick {tick}");
            assert_eq!(terrain.live_block_count(), live);
        }
    }

    /// Pulling the camera away merges the root and expires its children
    /// after the window, leaving a single live block.
    #[test]
    fn test_merge_then_child_expiration() {
        let mut terrain = render_terrain(small_config());
        let near = overhead_view(4.0);
        let far = overhead_view(100.0);
        let root = BlockCoord::new(0, 0, 2);
        let child = BlockCoord::new(0, 0, 1);

        terrain.update(&near, 1);
        terrain.update(&near, 2);
        assert_eq!(terrain.live_block_count(), 5);

        terrain.update(&far, 3);
        assert_eq!(terrain.block_state(root), Some(BlockState::Initialized));
        assert_eq!(terrain.render_list().len(), 1);
        assert_eq!(terrain.render_list()[0].coord, root);
        // children linger inside the expiration window
        assert_eq!(terrain.block_state(child), Some(BlockState::Initialized));

        terrain.update(&far, 4);
        terrain.update(&far, 5);
        assert_eq!(terrain.block_state(child), None, "child should expire");
        assert_eq!(terrain.live_block_count(), 1);
    }

    /// Blocks entirely behind the camera are never created.
    #[test]
    fn test_no_blocks_behind_camera() {
        let mut terrain = render_terrain(small_config());
        // Looking straight up from well above the fallback height bounds:
        // the terrain is entirely behind the camera.
        let view = ViewState::new(
            Vec3::new(2.0, 40.0, 2.0),
            Vec3::Y,
            Vec3::Z,
            Mat4::perspective_rh(FRAC_PI_2, 1.0, 0.1, 1000.0),
        );
        terrain.update(&view, 1);
        assert_eq!(terrain.live_block_count(), 0);
        assert!(terrain.render_list().is_empty());
    }

    /// Submerged blocks carry the water flag.
    #[test]
    fn test_water_flag() {
        let mut terrain = Terrain::new(
            small_config(),
            Arc::new(ConstantHeightSource::new(-5.0)),
            Backend::Render,
        )
        .unwrap();
        let view = overhead_view(100.0);
        terrain.update(&view, 1);
        assert!(!terrain.render_list().is_empty());
        for entry in terrain.render_list() {
            assert!(entry.flags.contains(RenderFlags::WATER));
        }
    }

    /// A camera low over a block corner drives its quadrant two levels
    /// deeper than a diagonal sibling, and the resulting 2:1 borders get
    /// stitch bits on the smaller side only.
    #[test]
    fn test_stitching_across_lod_boundary() {
        let mut terrain = render_terrain(small_config());
        let view = ViewState::new(
            Vec3::new(0.5, 1.0, 0.5),
            Vec3::NEG_Y,
            Vec3::Z,
            Mat4::perspective_rh(FRAC_PI_2, 1.0, 0.1, 1000.0),
        );
        terrain.update(&view, 1);
        terrain.update(&view, 2);

        let list = terrain.render_list();
        assert!(
            list.windows(2)
                .all(|w| w[0].coord.size_shift >= w[1].coord.size_shift),
            "render list must be sorted by descending size"
        );
        assert!(list.iter().all(|e| e.coord.size_shift < 2));

        let entry = |x, y, shift| {
            list.iter()
                .find(|e| e.coord == BlockCoord::new(x, y, shift))
                .unwrap_or_else(|| panic!("({x}, {y}, {shift}) not rendered"))
        };

        // The diagonal child stays at size 2 and never stitches.
        assert!(entry(2, 2, 1).edge_mask.is_empty());
        // Its smaller neighbors stitch toward it.
        assert!(entry(1, 2, 0).edge_mask.contains(Side::Right));
        assert!(entry(1, 3, 0).edge_mask.contains(Side::Right));
        assert!(entry(2, 1, 0).edge_mask.contains(Side::Top));
        assert!(entry(3, 1, 0).edge_mask.contains(Side::Top));
    }

    /// Height queries interpolate the stored grids and fall back to the
    /// sampler where no block has been built.
    #[test]
    fn test_query_height() {
        let mut terrain = Terrain::new(
            small_config(),
            Arc::new(ConstantHeightSource::new(7.0)),
            Backend::Render,
        )
        .unwrap();
        assert_eq!(terrain.query_height(1.0, 1.0), 7.0, "sampler fallback");
        terrain.update(&overhead_view(4.0), 1);
        assert_eq!(terrain.query_height(1.0, 1.0), 7.0);
        assert_eq!(terrain.query_height(3.5, 0.5), 7.0);
        assert_eq!(terrain.query_height(1e6, 1e6), 7.0, "outside every root");
    }

    /// A physics region subdivides only the overlapped quadrants down to
    /// the smallest size and puts a collider on each smallest block.
    #[test]
    fn test_physics_region_subdivision() {
        let shared = SharedFactory::default();
        let mut terrain = Terrain::new(
            small_config(),
            Arc::new(ConstantHeightSource::new(0.0)),
            Backend::Physics(Box::new(shared.clone())),
        )
        .unwrap();

        terrain.update_region(GridRect::new((0, 0), (2, 2)), 1);
        // root + one size-2 child + its four smallest children
        assert_eq!(terrain.live_block_count(), 6);
        let factory = shared.0.borrow();
        assert_eq!(factory.shapes_created, 4, "one heightfield per smallest block");
        assert_eq!(factory.bodies_created, 4);
        assert_eq!(factory.sensors_created, 0);
        drop(factory);

        assert_eq!(
            terrain.block_state(BlockCoord::new(0, 0, 2)),
            Some(BlockState::Subdivided)
        );
        assert_eq!(
            terrain.block_state(BlockCoord::new(2, 0, 1)),
            None,
            "quadrants outside the region are not created"
        );
    }

    /// Blocks below the water level also get a sensor volume.
    #[test]
    fn test_physics_water_sensor() {
        let shared = SharedFactory::default();
        let mut terrain = Terrain::new(
            small_config(),
            Arc::new(ConstantHeightSource::new(-5.0)),
            Backend::Physics(Box::new(shared.clone())),
        )
        .unwrap();

        terrain.update_region(GridRect::new((0, 0), (1, 1)), 1);
        let factory = shared.0.borrow();
        // one smallest block: heightfield + water box, terrain body +
        // water sensor body
        assert_eq!(factory.shapes_created, 2);
        assert_eq!(factory.bodies_created, 2);
        assert_eq!(factory.sensors_created, 1);
    }

    /// Moving the physics region away releases every collider of the old
    /// region exactly once.
    #[test]
    fn test_physics_expiration_releases_colliders() {
        let shared = SharedFactory::default();
        let mut terrain = Terrain::new(
            small_config(),
            Arc::new(ConstantHeightSource::new(0.0)),
            Backend::Physics(Box::new(shared.clone())),
        )
        .unwrap();

        terrain.update_region(GridRect::new((0, 0), (2, 2)), 1);
        assert_eq!(shared.0.borrow().live_shapes.len(), 4);

        let elsewhere = GridRect::new((16, 16), (18, 18));
        terrain.update_region(elsewhere, 2);
        terrain.update_region(elsewhere, 3);
        terrain.update_region(elsewhere, 4);

        // Only the colliders of the new region remain; the null factory
        // panics on double release, so getting here proves exactly-once.
        let factory = shared.0.borrow();
        assert_eq!(factory.shapes_created, 8);
        assert_eq!(factory.live_shapes.len(), 4);
        assert_eq!(factory.live_bodies.len(), 4);
        assert_eq!(terrain.live_block_count(), 6);
    }

    /// Async builds deliver off-thread and the tree settles into the same
    /// shape the synchronous path produces.
    #[test]
    fn test_async_build_settles() {
        let config = TerrainConfig {
            async_build: true,
            build_threads: 1,
            ..small_config()
        };
        let mut terrain = render_terrain(config);
        let view = overhead_view(4.0);

        let deadline = Instant::now() + Duration::from_secs(10);
        let mut tick = 0;
        loop {
            tick += 1;
            terrain.update(&view, tick);
            if terrain.render_list().len() == 4 {
                break;
            }
            assert!(Instant::now() < deadline, "async terrain never settled");
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(terrain.live_block_count(), 5);
        for entry in terrain.render_list() {
            assert_eq!(entry.coord.size_shift, 1);
        }
    }

    /// Invalid configurations are rejected at construction.
    #[test]
    fn test_new_validates_config() {
        let config = TerrainConfig {
            expiration_ticks: 0,
            ..Default::default()
        };
        let result = Terrain::new(
            config,
            Arc::new(ConstantHeightSource::new(0.0)),
            Backend::Render,
        );
        assert!(matches!(result, Err(TerrainError::ExpirationWindow)));
    }
}
