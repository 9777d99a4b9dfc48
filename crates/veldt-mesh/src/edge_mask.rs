//! The 4-bit per-block edge mask.
//!
//! Each bit marks one side of a block whose neighbor across that boundary is
//! rendered at twice the block's size. The mask value (0..16) indexes the
//! pre-built stitching index-buffer set.

/// One side of a square terrain block, in grid space (+y up, +x right).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// The +y boundary.
    Top,
    /// The +x boundary.
    Right,
    /// The -y boundary.
    Bottom,
    /// The -x boundary.
    Left,
}

impl Side {
    /// All four sides, in bit order.
    pub const ALL: [Side; 4] = [Side::Top, Side::Right, Side::Bottom, Side::Left];

    /// The bit assigned to this side.
    pub fn bit(self) -> u8 {
        match self {
            Side::Top => 1,
            Side::Right => 2,
            Side::Bottom => 4,
            Side::Left => 8,
        }
    }
}

/// Set of sides needing stitching geometry. Wraps the raw 4-bit value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct EdgeMask(u8);

impl EdgeMask {
    /// No stitched sides: the regular two-triangle grid.
    pub const EMPTY: EdgeMask = EdgeMask(0);

    /// Number of distinct mask values.
    pub const VARIANTS: usize = 16;

    /// Build a mask from a raw 4-bit value.
    ///
    /// # Panics
    ///
    /// Panics if bits above the low four are set.
    pub fn from_bits(bits: u8) -> Self {
        assert!(bits < 16, "edge mask out of range: {bits:#x}");
        EdgeMask(bits)
    }

    /// Mark one side as stitched.
    pub fn insert(&mut self, side: Side) {
        self.0 |= side.bit();
    }

    /// Returns true if the side is marked.
    pub fn contains(self, side: Side) -> bool {
        self.0 & side.bit() != 0
    }

    /// Returns true if no side is marked.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The index of this mask into the 16-variant index-buffer set.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Inserting sides sets exactly their bits.
    #[test]
    fn test_insert_and_contains() {
        let mut mask = EdgeMask::EMPTY;
        assert!(mask.is_empty());
        mask.insert(Side::Top);
        mask.insert(Side::Left);
        assert!(mask.contains(Side::Top));
        assert!(mask.contains(Side::Left));
        assert!(!mask.contains(Side::Right));
        assert!(!mask.contains(Side::Bottom));
        assert_eq!(mask.index(), 1 | 8);
    }

    /// Every combination of sides maps to a distinct variant index.
    #[test]
    fn test_all_variants_distinct() {
        let mut seen = [false; EdgeMask::VARIANTS];
        for bits in 0..16u8 {
            let idx = EdgeMask::from_bits(bits).index();
            assert!(!seen[idx], "duplicate variant index {idx}");
            seen[idx] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    /// Raw values above 4 bits are rejected.
    #[test]
    #[should_panic(expected = "out of range")]
    fn test_from_bits_rejects_high_bits() {
        EdgeMask::from_bits(16);
    }
}
