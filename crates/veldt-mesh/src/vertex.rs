/// Vertex layout for terrain block meshes.
///
/// Positions are relative to the block's minimum corner so the same layout
/// works for every block regardless of world position; the per-block world
/// offset goes into a uniform.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TerrainVertex {
    /// Block-relative position (x, height, z).
    pub position: [f32; 3],
    /// Surface normal from central differences of the height grid.
    pub normal: [f32; 3],
    /// Material blend factor in [0, 1] supplied by the height source.
    pub material_blend: f32,
}

impl TerrainVertex {
    /// Construct a vertex.
    pub fn new(position: [f32; 3], normal: [f32; 3], material_blend: f32) -> Self {
        Self {
            position,
            normal,
            material_blend,
        }
    }
}
