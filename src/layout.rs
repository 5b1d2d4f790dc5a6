//! Leaf layout of the sparse grid - how index space is divided into 8³ leaves

use crate::types::Coord;
use serde::{Deserialize, Serialize};

/// log2 of the leaf edge length
pub const LEAF_LOG2DIM: u32 = 3;

/// Leaf edge length in voxels
pub const LEAF_DIM: i32 = 1 << LEAF_LOG2DIM;

/// Voxels per leaf
pub const LEAF_VOXELS: usize = 1 << (3 * LEAF_LOG2DIM);

const LOCAL_MASK: i32 = LEAF_DIM - 1;
const MASK_WORDS: usize = LEAF_VOXELS / 64;

/// Origin of the leaf containing `c`
#[inline]
pub fn leaf_origin(c: Coord) -> Coord {
    Coord::new(c.x & !LOCAL_MASK, c.y & !LOCAL_MASK, c.z & !LOCAL_MASK)
}

/// Linear offset of `c` inside its leaf (x-major, z fastest)
#[inline]
pub fn leaf_offset(c: Coord) -> usize {
    (((c.x & LOCAL_MASK) as usize) << (2 * LEAF_LOG2DIM))
        | (((c.y & LOCAL_MASK) as usize) << LEAF_LOG2DIM)
        | ((c.z & LOCAL_MASK) as usize)
}

/// Local coordinate inside a leaf for a linear offset
#[inline]
pub fn offset_to_local(offset: usize) -> Coord {
    let mask = LOCAL_MASK as usize;
    Coord::new(
        ((offset >> (2 * LEAF_LOG2DIM)) & mask) as i32,
        ((offset >> LEAF_LOG2DIM) & mask) as i32,
        (offset & mask) as i32,
    )
}

/// One bit per voxel of a leaf, set for active voxels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeMask {
    words: [u64; MASK_WORDS],
}

impl NodeMask {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn set_on(&mut self, offset: usize) {
        self.words[offset >> 6] |= 1u64 << (offset & 63);
    }

    #[inline]
    pub fn is_on(&self, offset: usize) -> bool {
        self.words[offset >> 6] & (1u64 << (offset & 63)) != 0
    }

    pub fn count_on(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Offsets of active voxels in ascending order
    pub fn iter_on(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let bit = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(i * 64 + bit)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_origin() {
        assert_eq!(leaf_origin(Coord::new(0, 7, 8)), Coord::new(0, 0, 8));
        assert_eq!(leaf_origin(Coord::new(-1, -8, -9)), Coord::new(-8, -8, -16));
        assert_eq!(leaf_origin(Coord::new(17, -3, 100)), Coord::new(16, -8, 96));
    }

    #[test]
    fn test_offset_roundtrip() {
        for c in [Coord::new(-1, -2, -3), Coord::new(5, 0, 7), Coord::new(-8, 9, 12)] {
            let origin = leaf_origin(c);
            let offset = leaf_offset(c);
            assert!(offset < LEAF_VOXELS);
            assert_eq!(origin + offset_to_local(offset), c);
        }
    }

    #[test]
    fn test_node_mask() {
        let mut mask = NodeMask::new();
        assert!(mask.is_empty());

        mask.set_on(0);
        mask.set_on(63);
        mask.set_on(64);
        mask.set_on(511);
        assert_eq!(mask.count_on(), 4);
        assert!(mask.is_on(64));
        assert!(!mask.is_on(62));
        assert_eq!(mask.iter_on().collect::<Vec<_>>(), vec![0, 63, 64, 511]);
    }
}
