//! Pre-built index buffers for crack-free stitching between blocks whose
//! neighbors render at twice their size.
//!
//! Every block mesh shares one `(n+1) x (n+1)` vertex grid. For each of the
//! 16 edge-mask variants this module triangulates the same grid differently:
//! on a stitched side the odd vertices of the outer row are skipped and each
//! pair of border cells becomes one spanning triangle anchored on the coarse
//! outer row plus filler triangles into the inner row. Where two stitched
//! sides meet, the filler that would reference a skipped corner vertex is
//! omitted and the adjacent side's spanning triangle covers the gap.
//!
//! All triangles wind counter-clockwise in grid space (+x right, +y up).

use crate::{EdgeMask, Side};

/// The full 16-variant index-buffer set for one grid resolution.
pub struct StitchIndexBuffers {
    n: usize,
    buffers: Vec<Vec<u32>>,
}

impl StitchIndexBuffers {
    /// Build all 16 variants for an `n x n` cell grid.
    ///
    /// # Panics
    ///
    /// Panics if `n` is odd or smaller than 2; stitched sides pair up border
    /// cells, so the grid must halve evenly.
    pub fn build(n: usize) -> Self {
        assert!(n >= 2 && n % 2 == 0, "grid size must be even and >= 2, got {n}");
        let buffers = (0..16u8)
            .map(|bits| generate_stitch_indices(n, EdgeMask::from_bits(bits)))
            .collect();
        Self { n, buffers }
    }

    /// Cells per grid axis.
    pub fn grid_size(&self) -> usize {
        self.n
    }

    /// The index buffer for the given mask.
    pub fn get(&self, mask: EdgeMask) -> &[u32] {
        &self.buffers[mask.index()]
    }
}

fn vertex_index(n: usize, x: usize, y: usize) -> u32 {
    (y * (n + 1) + x) as u32
}

fn push_tri(out: &mut Vec<u32>, n: usize, a: (usize, usize), b: (usize, usize), c: (usize, usize)) {
    out.push(vertex_index(n, a.0, a.1));
    out.push(vertex_index(n, b.0, b.1));
    out.push(vertex_index(n, c.0, c.1));
}

fn push_cell(out: &mut Vec<u32>, n: usize, x: usize, y: usize) {
    push_tri(out, n, (x, y), (x + 1, y), (x + 1, y + 1));
    push_tri(out, n, (x, y), (x + 1, y + 1), (x, y + 1));
}

/// Triangulate the `n x n` cell grid for one edge-mask variant.
pub fn generate_stitch_indices(n: usize, mask: EdgeMask) -> Vec<u32> {
    assert!(n >= 2 && n % 2 == 0, "grid size must be even and >= 2, got {n}");
    let mut out = Vec::with_capacity(n * n * 6);

    let top = mask.contains(Side::Top);
    let right = mask.contains(Side::Right);
    let bottom = mask.contains(Side::Bottom);
    let left = mask.contains(Side::Left);

    // Interior cells: untouched by any stitching variant.
    for y in 1..n - 1 {
        for x in 1..n - 1 {
            push_cell(&mut out, n, x, y);
        }
    }

    // Bottom border (outer row y = 0, inner row y = 1).
    if bottom {
        for x in (0..n).step_by(2) {
            push_tri(&mut out, n, (x, 0), (x + 2, 0), (x + 1, 1));
            if !(x == 0 && left) {
                push_tri(&mut out, n, (x, 0), (x + 1, 1), (x, 1));
            }
            if !(x + 2 == n && right) {
                push_tri(&mut out, n, (x + 2, 0), (x + 2, 1), (x + 1, 1));
            }
        }
    } else {
        let start = usize::from(left);
        let end = n - usize::from(right);
        for x in start..end {
            push_cell(&mut out, n, x, 0);
        }
    }

    // Top border (outer row y = n, inner row y = n - 1).
    if top {
        for x in (0..n).step_by(2) {
            push_tri(&mut out, n, (x, n), (x + 1, n - 1), (x + 2, n));
            if !(x == 0 && left) {
                push_tri(&mut out, n, (x, n), (x, n - 1), (x + 1, n - 1));
            }
            if !(x + 2 == n && right) {
                push_tri(&mut out, n, (x + 2, n), (x + 1, n - 1), (x + 2, n - 1));
            }
        }
    } else {
        let start = usize::from(left);
        let end = n - usize::from(right);
        for x in start..end {
            push_cell(&mut out, n, x, n - 1);
        }
    }

    // Left border (outer column x = 0, inner column x = 1). The corner cells
    // always belong to the horizontal borders unless this side is stitched.
    if left {
        for y in (0..n).step_by(2) {
            push_tri(&mut out, n, (0, y), (1, y + 1), (0, y + 2));
            if !(y == 0 && bottom) {
                push_tri(&mut out, n, (0, y), (1, y), (1, y + 1));
            }
            if !(y + 2 == n && top) {
                push_tri(&mut out, n, (0, y + 2), (1, y + 1), (1, y + 2));
            }
        }
    } else {
        for y in 1..n - 1 {
            push_cell(&mut out, n, 0, y);
        }
    }

    // Right border (outer column x = n, inner column x = n - 1).
    if right {
        for y in (0..n).step_by(2) {
            push_tri(&mut out, n, (n, y), (n, y + 2), (n - 1, y + 1));
            if !(y == 0 && bottom) {
                push_tri(&mut out, n, (n, y), (n - 1, y + 1), (n - 1, y));
            }
            if !(y + 2 == n && top) {
                push_tri(&mut out, n, (n, y + 2), (n - 1, y + 2), (n - 1, y + 1));
            }
        }
    } else {
        for y in 1..n - 1 {
            push_cell(&mut out, n, n - 1, y);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_pos(n: usize, index: u32) -> (i64, i64) {
        let stride = (n + 1) as u32;
        ((index % stride) as i64, (index / stride) as i64)
    }

    /// Twice the signed area of a triangle in grid coordinates.
    fn doubled_signed_area(a: (i64, i64), b: (i64, i64), c: (i64, i64)) -> i64 {
        (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
    }

    fn all_masks() -> impl Iterator<Item = EdgeMask> {
        (0..16u8).map(EdgeMask::from_bits)
    }

    /// Every variant must tile the full grid: the signed triangle areas of a
    /// crack-free, overlap-free, consistently wound triangulation sum to the
    /// grid area exactly.
    #[test]
    fn test_every_variant_covers_grid_area_exactly() {
        for n in [2usize, 4, 8, 16] {
            for mask in all_masks() {
                let indices = generate_stitch_indices(n, mask);
                let doubled: i64 = indices
                    .chunks(3)
                    .map(|t| {
                        doubled_signed_area(
                            grid_pos(n, t[0]),
                            grid_pos(n, t[1]),
                            grid_pos(n, t[2]),
                        )
                    })
                    .sum();
                assert_eq!(
                    doubled,
                    2 * (n * n) as i64,
                    "variant {:?} at n={n} does not tile the grid",
                    mask
                );
            }
        }
    }

    /// All triangles wind the same way and none are degenerate.
    #[test]
    fn test_consistent_winding_no_degenerates() {
        for mask in all_masks() {
            let indices = generate_stitch_indices(8, mask);
            for t in indices.chunks(3) {
                let area = doubled_signed_area(
                    grid_pos(8, t[0]),
                    grid_pos(8, t[1]),
                    grid_pos(8, t[2]),
                );
                assert!(area > 0, "non-CCW or degenerate triangle in {mask:?}: {t:?}");
            }
        }
    }

    /// Indices always stay inside the vertex grid.
    #[test]
    fn test_indices_in_range() {
        for mask in all_masks() {
            let indices = generate_stitch_indices(4, mask);
            let vertex_count = 5 * 5;
            for &i in &indices {
                assert!(i < vertex_count, "index {i} out of range for {mask:?}");
            }
        }
    }

    /// The unstitched variant is the plain two-triangle grid.
    #[test]
    fn test_empty_mask_triangle_count() {
        let indices = generate_stitch_indices(8, EdgeMask::EMPTY);
        assert_eq!(indices.len(), 8 * 8 * 2 * 3);
    }

    /// A stitched side must never reference the odd (dropped) vertices of its
    /// outer row, otherwise the coarse neighbor's edge would not match.
    #[test]
    fn test_stitched_side_skips_odd_outer_vertices() {
        let n = 8usize;
        for mask in all_masks() {
            let indices = generate_stitch_indices(n, mask);
            for &i in &indices {
                let (x, y) = grid_pos(n, i);
                if mask.contains(Side::Bottom) && y == 0 {
                    assert_eq!(x % 2, 0, "odd bottom-row vertex {x} used by {mask:?}");
                }
                if mask.contains(Side::Top) && y == n as i64 {
                    assert_eq!(x % 2, 0, "odd top-row vertex {x} used by {mask:?}");
                }
                if mask.contains(Side::Left) && x == 0 {
                    assert_eq!(y % 2, 0, "odd left-column vertex {y} used by {mask:?}");
                }
                if mask.contains(Side::Right) && x == n as i64 {
                    assert_eq!(y % 2, 0, "odd right-column vertex {y} used by {mask:?}");
                }
            }
        }
    }

    /// An unstitched side must use every vertex of its outer row, so two
    /// same-size neighbors share every edge vertex.
    #[test]
    fn test_unstitched_side_uses_full_outer_row() {
        let n = 8usize;
        let indices = generate_stitch_indices(n, EdgeMask::EMPTY);
        let mut bottom_used = vec![false; n + 1];
        for &i in &indices {
            let (x, y) = grid_pos(n, i);
            if y == 0 {
                bottom_used[x as usize] = true;
            }
        }
        assert!(bottom_used.iter().all(|&u| u), "unused bottom-row vertex");
    }

    /// The builder produces all 16 variants and returns them by mask.
    #[test]
    fn test_buffer_set_lookup() {
        let set = StitchIndexBuffers::build(4);
        assert_eq!(set.grid_size(), 4);
        assert_eq!(set.get(EdgeMask::EMPTY).len(), 4 * 4 * 2 * 3);
        let mut mask = EdgeMask::EMPTY;
        mask.insert(Side::Top);
        assert_ne!(set.get(mask), set.get(EdgeMask::EMPTY));
    }

    /// Odd grid sizes cannot pair border cells.
    #[test]
    #[should_panic(expected = "must be even")]
    fn test_odd_grid_rejected() {
        StitchIndexBuffers::build(3);
    }
}
