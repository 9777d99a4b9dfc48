//! Block geometry construction, synchronous and on a worker pool.
//!
//! A block samples its height source on an `(n+1) x (n+1)` vertex grid with a
//! one-texel border used only for central-difference normals at the edges;
//! the border samples are never stored and never contribute to the height
//! bounds.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use veldt_mesh::TerrainVertex;

use crate::{BlockCoord, HeightSource, TerrainConfig};

/// Whether a build produces render or physics data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildMode {
    /// Produce the vertex buffer (GPU device present).
    Render,
    /// Produce only the height grid for collision (no GPU device).
    Physics,
}

/// The product of one block geometry build.
#[derive(Debug)]
pub struct BuiltGeometry {
    /// Vertex buffer, empty in physics mode.
    pub vertices: Vec<TerrainVertex>,
    /// `(n+1)^2` heights, row-major with x varying fastest.
    pub heights: Vec<f32>,
    /// Cells per block edge.
    pub grid_size: usize,
    /// Lowest sampled height inside the block.
    pub min_height: f32,
    /// Highest sampled height inside the block.
    pub max_height: f32,
}

/// Sample the height source over a block and build its geometry.
pub fn build_geometry(
    config: &TerrainConfig,
    coord: BlockCoord,
    sampler: &dyn HeightSource,
    mode: BuildMode,
) -> BuiltGeometry {
    let n = config.vertices_per_edge();
    let step = f64::from(coord.width()) / n as f64;
    let x0 = f64::from(coord.x);
    let z0 = f64::from(coord.y);

    // Scratch grid including the 1-texel border: index 0 is one step outside
    // the block on each axis.
    let scratch = n + 3;
    let mut grid = vec![0.0f32; scratch * scratch];
    let mut materials = vec![0.0f32; (n + 1) * (n + 1)];
    let mut min_height = f32::INFINITY;
    let mut max_height = f32::NEG_INFINITY;

    for j in 0..scratch {
        for i in 0..scratch {
            let x = x0 + (i as f64 - 1.0) * step;
            let z = z0 + (j as f64 - 1.0) * step;
            let sample = sampler.sample(x, z);
            grid[j * scratch + i] = sample.height;

            let interior = (1..=n + 1).contains(&i) && (1..=n + 1).contains(&j);
            if interior {
                min_height = min_height.min(sample.height);
                max_height = max_height.max(sample.height);
                materials[(j - 1) * (n + 1) + (i - 1)] = sample.material_blend;
            }
        }
    }

    let mut heights = vec![0.0f32; (n + 1) * (n + 1)];
    for j in 0..=n {
        for i in 0..=n {
            heights[j * (n + 1) + i] = grid[(j + 1) * scratch + (i + 1)];
        }
    }

    let vertices = match mode {
        BuildMode::Physics => Vec::new(),
        BuildMode::Render => {
            let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
            let inv_2step = (0.5 / step) as f32;
            for j in 0..=n {
                for i in 0..=n {
                    let gi = i + 1;
                    let gj = j + 1;
                    let dx = (grid[gj * scratch + gi + 1] - grid[gj * scratch + gi - 1]) * inv_2step;
                    let dz = (grid[(gj + 1) * scratch + gi] - grid[(gj - 1) * scratch + gi])
                        * inv_2step;
                    let normal = glam::Vec3::new(-dx, 1.0, -dz).normalize();
                    vertices.push(TerrainVertex::new(
                        [
                            (i as f64 * step) as f32,
                            heights[j * (n + 1) + i],
                            (j as f64 * step) as f32,
                        ],
                        normal.to_array(),
                        materials[j * (n + 1) + i],
                    ));
                }
            }
            vertices
        }
    };

    BuiltGeometry {
        vertices,
        heights,
        grid_size: n,
        min_height,
        max_height,
    }
}

struct BuildTask {
    coord: BlockCoord,
    config: TerrainConfig,
    sampler: Arc<dyn HeightSource>,
    result: Sender<BuiltGeometry>,
}

/// Worker pool for off-thread geometry builds.
///
/// A submitted build delivers its result through a single-slot channel that
/// the owning block polls from `is_initialized`. Submission never blocks and
/// there is no cancellation: dropping the receiver simply discards the
/// completed build when the worker tries to deliver it.
pub struct AsyncGeometryBuilder {
    task_sender: Sender<BuildTask>,
    in_flight: Arc<AtomicU64>,
}

impl AsyncGeometryBuilder {
    /// Spawn the worker pool. `thread_count == 0` derives a count from the
    /// CPU, leaving one core for the tick thread.
    pub fn new(thread_count: usize) -> Self {
        let threads = if thread_count == 0 {
            (num_cpus::get().saturating_sub(1)).max(1)
        } else {
            thread_count
        };
        let (task_sender, task_receiver) = unbounded::<BuildTask>();
        let in_flight = Arc::new(AtomicU64::new(0));

        for _ in 0..threads {
            let receiver = task_receiver.clone();
            let in_flight = Arc::clone(&in_flight);
            std::thread::Builder::new()
                .name("geometry-worker".into())
                .spawn(move || {
                    while let Ok(task) = receiver.recv() {
                        let built = build_geometry(
                            &task.config,
                            task.coord,
                            task.sampler.as_ref(),
                            BuildMode::Render,
                        );
                        // The block may have been released meanwhile; a
                        // failed send just discards the build.
                        let _ = task.result.send(built);
                        in_flight.fetch_sub(1, Ordering::Relaxed);
                        tracing::trace!(coord = ?task.coord, "geometry build complete");
                    }
                })
                .expect("failed to spawn geometry worker thread");
        }

        Self {
            task_sender,
            in_flight,
        }
    }

    /// Queue a build and return the receiver the block will poll.
    pub(crate) fn submit(
        &self,
        coord: BlockCoord,
        config: TerrainConfig,
        sampler: Arc<dyn HeightSource>,
    ) -> Receiver<BuiltGeometry> {
        let (result, receiver) = bounded(1);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        if self
            .task_sender
            .send(BuildTask {
                coord,
                config,
                sampler,
                result,
            })
            .is_err()
        {
            // Worker pool already shut down; the receiver will report
            // disconnected and the block stays uninitialized.
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
        }
        receiver
    }

    /// Number of builds submitted but not yet completed.
    pub fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }
}
