//! Terrain mesh building blocks: the GPU vertex format, the 4-bit edge mask
//! describing which block sides border a coarser neighbor, and the generator
//! for the 16 pre-built stitching index-buffer variants.

mod edge_mask;
mod stitching;
mod vertex;

pub use edge_mask::{EdgeMask, Side};
pub use stitching::{StitchIndexBuffers, generate_stitch_indices};
pub use vertex::TerrainVertex;
