//! Slice-to-grid accumulation

use crate::grid::FloatGrid;
use crate::slice::SliceBuffer;
use crate::types::Coord;

/// Value written for occupied voxels
pub const OCCUPIED: f32 = 1.0;

/// Depth coordinate of the zero-based slice `z` in a stack of `slice_count`.
///
/// The stack is centered on zero: depths run over `[-n/2, n - n/2)`.
pub fn depth_index(z: usize, slice_count: usize) -> i32 {
    z as i32 - (slice_count / 2) as i32
}

/// Centered grid coordinate of sample `(x, y)` in a `width` × `height` slice
#[inline]
pub fn slice_coord(x: usize, y: usize, width: usize, height: usize, depth: i32) -> Coord {
    Coord::new(
        x as i32 - (width / 2) as i32,
        y as i32 - (height / 2) as i32,
        depth,
    )
}

/// Mark every nonzero sample of `slice` as occupied at depth `depth`.
///
/// Zero samples leave the grid untouched. Returns the number of voxels set.
pub fn accumulate(grid: &mut FloatGrid, slice: &SliceBuffer, depth: i32) -> usize {
    let (width, height) = (slice.width(), slice.height());
    let mut set = 0;

    for ((x, y), &sample) in slice.samples().indexed_iter() {
        if sample != 0 {
            grid.set_value(slice_coord(x, y, width, height, depth), OCCUPIED);
            set += 1;
        }
    }

    set
}
