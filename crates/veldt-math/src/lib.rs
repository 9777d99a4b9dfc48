//! Math primitives for terrain culling: f32 AABBs, integer grid rectangles,
//! and view-frustum containment classification.

mod aabb;
mod frustum;

pub use aabb::{Aabb, GridRect};
pub use frustum::{Containment, Frustum};
