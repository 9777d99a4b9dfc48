//! Headless demo: flies a camera over procedurally generated terrain and
//! reports what the quadtree does each second.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI
//! flags. Run with `cargo run -p veldt-demo`, or
//! `cargo run -p veldt-demo -- --ticks 1200 --physics` to also drive a
//! collision region under the camera with a probe ball dropped onto it.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use clap::Parser;
use glam::{Mat4, Vec3};
use rapier3d::prelude::{ColliderBuilder, RigidBodyBuilder, Vector};
use tracing::info;
use veldt_config::{CliArgs, Config};
use veldt_math::GridRect;
use veldt_mesh::{EdgeMask, StitchIndexBuffers};
use veldt_physics::{PhysicsWorld, RapierCollisionFactory};
use veldt_terrain::{
    Backend, FbmHeightSource, RenderFlags, Terrain, TerrainConfig, ViewState,
};

#[derive(Parser, Debug)]
#[command(name = "veldt-demo", about = "Headless terrain fly-over")]
struct DemoArgs {
    #[command(flatten)]
    config: CliArgs,

    /// Number of simulation ticks to run.
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// Also maintain a physics region under the camera and drop a probe
    /// ball onto it.
    #[arg(long)]
    physics: bool,
}

fn main() {
    let args = DemoArgs::parse();

    let config_dir = args
        .config
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("./config"));
    let mut config = match Config::load_or_create(&config_dir) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            std::process::exit(1);
        }
    };
    config.apply_cli_overrides(&args.config);

    veldt_log::init_logging(Some(&config_dir.join("logs")), cfg!(debug_assertions), Some(&config));

    let terrain_config = match config.terrain_config() {
        Ok(terrain_config) => terrain_config,
        Err(err) => {
            eprintln!("config error: {err}");
            std::process::exit(1);
        }
    };

    info!(ticks = args.ticks, physics = args.physics, "starting fly-over");
    run(&config, terrain_config, args.ticks, args.physics);
}

fn run(config: &Config, terrain_config: TerrainConfig, ticks: u64, with_physics: bool) {
    let sampler = Arc::new(FbmHeightSource::new(config.fbm_params()));
    let cruise_height = sampler.max_amplitude() as f32 + 40.0;

    let mut terrain = Terrain::new(terrain_config.clone(), sampler.clone(), Backend::Render)
        .expect("validated config was rejected");

    // One index buffer per edge-mask variant, shared by every block.
    let stitch_buffers = StitchIndexBuffers::build(terrain_config.vertices_per_edge());
    info!(
        variants = EdgeMask::VARIANTS,
        indices_per_regular_grid = stitch_buffers.get(EdgeMask::EMPTY).len(),
        "stitching index buffers built"
    );

    let mut physics = with_physics.then(|| PhysicsDemo::new(config, &terrain_config, &sampler));

    let projection = Mat4::perspective_rh(60f32.to_radians(), 16.0 / 9.0, 0.5, 4000.0);
    let speed = 6.0;

    for tick in 1..=ticks {
        // A shallow descending glide across the grain of the noise field.
        let t = tick as f32;
        let position = Vec3::new(t * speed, cruise_height - (t * 0.02).min(25.0), t * speed * 0.6);
        let forward = Vec3::new(1.0, -0.25, 0.6).normalize();
        let view = ViewState::new(position, forward, Vec3::Y, projection);

        terrain.update(&view, tick);

        if let Some(physics) = physics.as_mut() {
            physics.tick(position, tick);
        }

        if config.debug.tick_stats || tick % 60 == 0 {
            report(&terrain, tick, physics.as_ref());
        }
    }

    let ground = terrain.query_height(
        f64::from(ticks as f32 * speed),
        f64::from(ticks as f32 * speed * 0.6),
    );
    info!(ground, live = terrain.live_block_count(), "fly-over finished");
}

fn report(terrain: &Terrain, tick: u64, physics: Option<&PhysicsDemo>) {
    let list = terrain.render_list();
    let mut mask_histogram = [0usize; EdgeMask::VARIANTS];
    let mut water = 0usize;
    for entry in list {
        mask_histogram[entry.edge_mask.index()] += 1;
        if entry.flags.contains(RenderFlags::WATER) {
            water += 1;
        }
    }
    let stitched: usize = mask_histogram[1..].iter().sum();

    info!(
        tick,
        rendered = list.len(),
        stitched,
        water,
        lowest_shift = ?terrain.lowest_shift(),
        live = terrain.live_block_count(),
        "tick stats"
    );
    if stitched > 0 {
        tracing::debug!(?mask_histogram, "edge mask histogram");
    }
    if let Some(physics) = physics {
        info!(
            colliders = physics.world.borrow().collider_count(),
            probe_y = physics.probe_height(),
            "physics stats"
        );
    }
}

/// Collision terrain following the camera, with one dynamic ball dropped
/// onto it as a probe.
struct PhysicsDemo {
    terrain: Terrain,
    world: Rc<RefCell<PhysicsWorld>>,
    probe: rapier3d::prelude::RigidBodyHandle,
}

impl PhysicsDemo {
    fn new(config: &Config, terrain_config: &TerrainConfig, sampler: &Arc<FbmHeightSource>) -> Self {
        let world = Rc::new(RefCell::new(PhysicsWorld::new()));
        let factory = RapierCollisionFactory::new(Rc::clone(&world));
        let terrain = Terrain::new(
            terrain_config.clone(),
            sampler.clone(),
            Backend::Physics(Box::new(factory)),
        )
        .expect("validated config was rejected");

        let probe = {
            let mut world = world.borrow_mut();
            let start_y = sampler.max_amplitude() as f32 + 20.0;
            let body = RigidBodyBuilder::dynamic()
                .translation(Vector::new(8.0, start_y, 8.0))
                .build();
            let handle = world.rigid_body_set.insert(body);
            let ball = ColliderBuilder::ball(0.5).build();
            let world = &mut *world;
            world
                .collider_set
                .insert_with_parent(ball, handle, &mut world.rigid_body_set);
            handle
        };
        info!(water_level = config.physics.water_level, "physics demo ready");

        Self { terrain, world, probe }
    }

    fn tick(&mut self, camera: Vec3, tick: u64) {
        // Keep colliders in a window under the camera and around the probe.
        let probe = {
            let world = self.world.borrow();
            let t = world.rigid_body_set[self.probe].translation();
            Vec3::new(t.x, t.y, t.z)
        };
        let min_x = (camera.x.min(probe.x) - 16.0).floor() as i32;
        let min_y = (camera.z.min(probe.z) - 16.0).floor() as i32;
        let max_x = (camera.x.max(probe.x) + 16.0).ceil() as i32;
        let max_y = (camera.z.max(probe.z) + 16.0).ceil() as i32;
        self.terrain
            .update_region(GridRect::new((min_x, min_y), (max_x, max_y)), tick);
        self.world.borrow_mut().step();
    }

    fn probe_height(&self) -> f32 {
        self.world.borrow().rigid_body_set[self.probe].translation().y
    }
}
