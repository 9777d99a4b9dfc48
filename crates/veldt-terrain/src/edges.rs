//! Crack detection between adjacent blocks of different sizes.
//!
//! After the traversal produces the render list, every block border is
//! registered against a shared edge table keyed by its line in grid space.
//! An edge whose two sides disagree about block size marks the smaller
//! side's blocks for stitching toward that border. Only a 2:1 size ratio is
//! representable; the traversal's promotion order keeps neighbors within
//! one level of each other, and anything wider is a bug.

use hashbrown::HashMap;
use veldt_mesh::Side;

use crate::coord::BlockCoord;
use crate::render_list::RenderEntry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Orientation {
    /// Edge runs along the x axis; `perp` is a y coordinate.
    Horizontal,
    /// Edge runs along the y axis; `perp` is an x coordinate.
    Vertical,
}

/// An edge is identified by its line and the start of the span its owning
/// (largest) block covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct EdgeKey {
    orientation: Orientation,
    perp: i32,
    start: i32,
}

/// One side of an edge: up to two half-span blocks, or a single block
/// spanning the whole edge (`solo`).
#[derive(Clone, Copy, Debug, Default)]
struct EdgeSide {
    slots: [Option<usize>; 2],
    solo: bool,
}

impl EdgeSide {
    fn occupied(&self) -> bool {
        self.slots.iter().any(Option::is_some)
    }
}

/// Occupancy of both sides of one edge line segment.
#[derive(Debug)]
struct EdgeRecord {
    /// Size of the block that created the edge; the span length is
    /// `2^shift`.
    shift: u32,
    /// The side at lesser `perp` (left of a vertical edge, below a
    /// horizontal one).
    near: EdgeSide,
    /// The side at greater `perp`.
    far: EdgeSide,
}

/// Resolves the render list's edge masks for one tick.
pub struct EdgeResolver {
    edges: HashMap<EdgeKey, EdgeRecord>,
    largest_shift: u32,
}

impl EdgeResolver {
    /// Register every entry's borders and write the resulting stitch masks
    /// back into the list.
    ///
    /// `entries` must be sorted by descending block size so an edge is
    /// always created by its largest block.
    pub fn resolve(entries: &mut [RenderEntry], largest_shift: u32) {
        debug_assert!(
            entries
                .windows(2)
                .all(|w| w[0].coord.size_shift >= w[1].coord.size_shift),
            "render list not sorted by descending block size"
        );
        let mut resolver = Self {
            edges: HashMap::with_capacity(entries.len() * 4),
            largest_shift,
        };
        for (index, entry) in entries.iter().enumerate() {
            resolver.register(index, entry.coord);
        }
        resolver.apply(entries);
    }

    fn register(&mut self, index: usize, coord: BlockCoord) {
        let w = coord.width();
        let s = coord.size_shift;
        // (orientation, perp, start, block on far side of the line)
        let borders = [
            (Orientation::Vertical, coord.x, coord.y, true),
            (Orientation::Vertical, coord.x + w, coord.y, false),
            (Orientation::Horizontal, coord.y, coord.x, true),
            (Orientation::Horizontal, coord.y + w, coord.x, false),
        ];
        for (orientation, perp, start, is_far) in borders {
            self.register_border(index, s, orientation, perp, start, is_far);
        }
    }

    fn register_border(
        &mut self,
        index: usize,
        shift: u32,
        orientation: Orientation,
        perp: i32,
        start: i32,
        is_far: bool,
    ) {
        let exact = EdgeKey {
            orientation,
            perp,
            start,
        };
        if let Some(record) = self.edges.get_mut(&exact) {
            if record.shift == shift {
                // Same-size neighbor across the line.
                let side = if is_far {
                    &mut record.far
                } else {
                    &mut record.near
                };
                debug_assert!(!side.occupied(), "edge side registered twice at {exact:?}");
                side.slots[0] = Some(index);
                side.solo = true;
            } else if record.shift == shift + 1 {
                // We are the lower half of a neighbor twice our size.
                let side = if is_far {
                    &mut record.far
                } else {
                    &mut record.near
                };
                side.slots[0] = Some(index);
                side.solo = false;
            } else {
                panic!(
                    "blocks more than one size level apart share an edge \
                     (shift {} vs {shift})",
                    record.shift
                );
            }
            return;
        }

        // Our start may sit halfway along a larger neighbor's span.
        let parent_start = start & !((1i32 << (shift + 1)) - 1);
        if parent_start != start {
            if let Some(record) = self.edges.get_mut(&EdgeKey {
                orientation,
                perp,
                start: parent_start,
            }) {
                if record.shift == shift + 1 {
                    let side = if is_far {
                        &mut record.far
                    } else {
                        &mut record.near
                    };
                    side.slots[1] = Some(index);
                    side.solo = false;
                    return;
                }
                if record.shift > shift + 1 {
                    panic!(
                        "blocks more than one size level apart share an edge \
                         (shift {} vs {shift})",
                        record.shift
                    );
                }
                // A same-size edge on an adjacent span; fall through.
            }
        }

        // Catch a neighbor two or more levels larger whose span contains
        // our start.
        for level in shift + 2..=self.largest_shift {
            let aligned = start & !((1i32 << level) - 1);
            if let Some(record) = self.edges.get(&EdgeKey {
                orientation,
                perp,
                start: aligned,
            }) {
                if record.shift == level {
                    panic!(
                        "blocks more than one size level apart share an edge \
                         (shift {level} vs {shift})"
                    );
                }
            }
        }

        let mut side = EdgeSide::default();
        side.slots[0] = Some(index);
        side.solo = true;
        let (near, far) = if is_far {
            (EdgeSide::default(), side)
        } else {
            (side, EdgeSide::default())
        };
        self.edges.insert(exact, EdgeRecord { shift, near, far });
    }

    fn apply(self, entries: &mut [RenderEntry]) {
        for (key, record) in &self.edges {
            if !record.near.occupied() || !record.far.occupied() {
                continue;
            }
            if record.near.solo == record.far.solo {
                continue;
            }
            // The non-solo side holds the smaller blocks; they stitch
            // toward the line.
            let (small, stitch_side) = if record.near.solo {
                let side = match key.orientation {
                    Orientation::Vertical => Side::Left,
                    Orientation::Horizontal => Side::Bottom,
                };
                (&record.far, side)
            } else {
                let side = match key.orientation {
                    Orientation::Vertical => Side::Right,
                    Orientation::Horizontal => Side::Top,
                };
                (&record.near, side)
            };
            for slot in small.slots.into_iter().flatten() {
                entries[slot].edge_mask.insert(stitch_side);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_list::RenderFlags;
    use veldt_mesh::EdgeMask;

    fn entry(x: i32, y: i32, shift: u32) -> RenderEntry {
        RenderEntry {
            coord: BlockCoord::new(x, y, shift),
            edge_mask: EdgeMask::EMPTY,
            flags: RenderFlags::OPAQUE,
            min_height: 0.0,
            max_height: 0.0,
        }
    }

    fn sort(entries: &mut [RenderEntry]) {
        entries.sort_by_key(|e| {
            (
                std::cmp::Reverse(e.coord.size_shift),
                e.coord.x,
                e.coord.y,
            )
        });
    }

    /// Same-size neighbors never stitch.
    #[test]
    fn test_uniform_grid_no_stitching() {
        let mut entries = vec![
            entry(0, 0, 2),
            entry(4, 0, 2),
            entry(0, 4, 2),
            entry(4, 4, 2),
        ];
        sort(&mut entries);
        EdgeResolver::resolve(&mut entries, 6);
        for e in &entries {
            assert!(e.edge_mask.is_empty(), "unexpected mask on {:?}", e.coord);
        }
    }

    /// Two half-size blocks against one full block stitch toward it, and
    /// the full block stays unmarked.
    #[test]
    fn test_two_small_against_one_large() {
        // Large block [0,8)x[0,8); two small blocks to its right.
        let mut entries = vec![entry(0, 0, 3), entry(8, 0, 2), entry(8, 4, 2)];
        sort(&mut entries);
        EdgeResolver::resolve(&mut entries, 6);

        let large = entries.iter().find(|e| e.coord.size_shift == 3).unwrap();
        assert!(large.edge_mask.is_empty());
        for small in entries.iter().filter(|e| e.coord.size_shift == 2) {
            assert!(
                small.edge_mask.contains(Side::Left),
                "{:?} must stitch left",
                small.coord
            );
            assert!(!small.edge_mask.contains(Side::Right));
            assert!(!small.edge_mask.contains(Side::Top));
            assert!(!small.edge_mask.contains(Side::Bottom));
        }
    }

    /// A small block boxed in by larger neighbors on two sides collects
    /// both bits.
    #[test]
    fn test_corner_block_two_sides() {
        // Large below and large to the left of a small block at (8, 8).
        let mut entries = vec![
            entry(8, 0, 3),  // below
            entry(0, 8, 3),  // left
            entry(8, 8, 2),
            entry(12, 8, 2),
            entry(8, 12, 2),
            entry(12, 12, 2),
        ];
        sort(&mut entries);
        EdgeResolver::resolve(&mut entries, 6);

        let corner = entries
            .iter()
            .find(|e| e.coord == BlockCoord::new(8, 8, 2))
            .unwrap();
        assert!(corner.edge_mask.contains(Side::Bottom));
        assert!(corner.edge_mask.contains(Side::Left));
        assert!(!corner.edge_mask.contains(Side::Top));
        assert!(!corner.edge_mask.contains(Side::Right));

        // Its siblings only border one large block each.
        let right_sib = entries
            .iter()
            .find(|e| e.coord == BlockCoord::new(12, 8, 2))
            .unwrap();
        assert!(right_sib.edge_mask.contains(Side::Bottom));
        assert!(!right_sib.edge_mask.contains(Side::Left));
    }

    /// The upper-half small block registers into the second slot of the
    /// large edge and still gets its bit.
    #[test]
    fn test_upper_half_slot() {
        let mut entries = vec![entry(0, 0, 3), entry(8, 4, 2)];
        sort(&mut entries);
        EdgeResolver::resolve(&mut entries, 6);
        let small = entries.iter().find(|e| e.coord.size_shift == 2).unwrap();
        assert!(small.edge_mask.contains(Side::Left));
    }

    /// An edge with an empty far side marks nothing.
    #[test]
    fn test_world_border_unmarked() {
        let mut entries = vec![entry(0, 0, 3)];
        EdgeResolver::resolve(&mut entries, 6);
        assert!(entries[0].edge_mask.is_empty());
    }

    /// A 4:1 size ratio across an edge is unsupported and must fail loudly.
    #[test]
    #[should_panic(expected = "more than one size level apart")]
    fn test_ratio_beyond_two_to_one_panics() {
        let mut entries = vec![entry(0, 0, 4), entry(16, 0, 2)];
        sort(&mut entries);
        EdgeResolver::resolve(&mut entries, 6);
    }

    /// Stitching is symmetric across a horizontal edge: small blocks above
    /// a large one stitch their bottoms.
    #[test]
    fn test_horizontal_edge_bits() {
        let mut entries = vec![entry(0, 0, 3), entry(0, 8, 2), entry(4, 8, 2)];
        sort(&mut entries);
        EdgeResolver::resolve(&mut entries, 6);
        for small in entries.iter().filter(|e| e.coord.size_shift == 2) {
            assert!(small.edge_mask.contains(Side::Bottom));
            assert!(!small.edge_mask.contains(Side::Top));
        }
        let large = entries.iter().find(|e| e.coord.size_shift == 3).unwrap();
        assert!(large.edge_mask.is_empty());
    }
}
