//! Adaptive quadtree terrain: view-dependent subdivision into square blocks,
//! block lifecycle management, and crack-free edge stitching between
//! neighbors rendered at different levels of detail.

mod block;
mod collision;
mod config;
mod coord;
mod edges;
mod error;
mod geometry;
mod render_list;
mod sampler;
mod terrain;
mod view;

pub use block::{Block, BlockState};
pub use collision::{
    BlockCollision, BodyHandle, CollisionFactory, NullCollisionFactory, ShapeHandle,
    WaterCollision,
};
pub use config::TerrainConfig;
pub use coord::BlockCoord;
pub use edges::EdgeResolver;
pub use error::TerrainError;
pub use geometry::{AsyncGeometryBuilder, BuildMode, BuiltGeometry, build_geometry};
pub use render_list::{RenderEntry, RenderFlags};
pub use sampler::{ConstantHeightSource, FbmHeightSource, FbmParams, HeightSample, HeightSource};
pub use terrain::{Backend, Terrain};
pub use view::ViewState;
