//! Tile-major payload reorder.
//!
//! A run of `group` consecutive block slots forms one tile. Block-major order
//! stores each block whole before the next; tile-major order stores physical
//! row `i` of every block in the run back to back, then row `i + 1`, so a tile
//! load reads one full-width row at a time:
//!
//! ```text
//! block-major (group 2, 3x1 blocks):  a0 a1 a2 | b0 b1 b2
//! tile-major:                         a0 b0 | a1 b1 | a2 b2
//! ```

use crate::dense::BlockShape;

/// Rewrite a block-major payload of `slots` blocks into tile-major order.
///
/// # Panics
/// Panics if `slots` is not a multiple of `group` or `data` does not hold
/// exactly `slots` blocks.
pub fn tile<T: Copy>(data: &[T], slots: usize, group: usize, block: BlockShape) -> Vec<T> {
    check_layout(data.len(), slots, group, block);
    let block_size = block.size();
    let mut out = Vec::with_capacity(data.len());

    for run in (0..slots).step_by(group) {
        for row in 0..block.rows {
            for slot in run..run + group {
                let start = slot * block_size + row * block.cols;
                out.extend_from_slice(&data[start..start + block.cols]);
            }
        }
    }
    out
}

/// Invert [`tile`]: gather a tile-major payload back into block-major order.
///
/// # Panics
/// Panics under the same conditions as [`tile`].
pub fn untile<T: Copy + Default>(data: &[T], slots: usize, group: usize, block: BlockShape) -> Vec<T> {
    check_layout(data.len(), slots, group, block);
    let block_size = block.size();
    let mut out = vec![T::default(); data.len()];

    let mut src = 0;
    for run in (0..slots).step_by(group) {
        for row in 0..block.rows {
            for slot in run..run + group {
                let dst = slot * block_size + row * block.cols;
                out[dst..dst + block.cols].copy_from_slice(&data[src..src + block.cols]);
                src += block.cols;
            }
        }
    }
    out
}

fn check_layout(len: usize, slots: usize, group: usize, block: BlockShape) {
    assert!(group > 0, "group must be at least 1");
    assert_eq!(slots % group, 0, "{} slots do not fill whole groups of {}", slots, group);
    assert_eq!(
        len,
        slots * block.size(),
        "payload length {} does not match {} blocks of {:?}",
        len,
        slots,
        block
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_interleaves_rows() {
        // two 3x1 blocks: a = [1, 2, 3], b = [4, 5, 6]
        let data = [1i8, 2, 3, 4, 5, 6];
        let tiled = tile(&data, 2, 2, BlockShape::new(3, 1));
        assert_eq!(tiled, vec![1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn test_tile_runs_are_independent() {
        // four 2x1 blocks, group 2 -> two runs
        let data = [1i8, 2, 3, 4, 5, 6, 7, 8];
        let tiled = tile(&data, 4, 2, BlockShape::new(2, 1));
        assert_eq!(tiled, vec![1, 3, 2, 4, 5, 7, 6, 8]);
    }

    #[test]
    fn test_tile_wide_blocks() {
        // two 2x2 blocks: rows stay contiguous within each block
        let data = [1i8, 2, 3, 4, 5, 6, 7, 8];
        let tiled = tile(&data, 2, 2, BlockShape::new(2, 2));
        assert_eq!(tiled, vec![1, 2, 5, 6, 3, 4, 7, 8]);
    }

    #[test]
    fn test_untile_inverts_tile() {
        let block = BlockShape::new(16, 1);
        let data: Vec<i8> = (0..(16 * 64 * 2)).map(|i| (i % 251) as i8).collect();
        let tiled = tile(&data, 128, 64, block);
        assert_ne!(tiled, data);
        assert_eq!(untile(&tiled, 128, 64, block), data);
    }

    #[test]
    fn test_group_of_one_is_identity() {
        let data = [1i8, 2, 3, 4];
        assert_eq!(tile(&data, 2, 1, BlockShape::new(2, 1)), data.to_vec());
    }

    #[test]
    #[should_panic(expected = "do not fill whole groups")]
    fn test_tile_partial_group() {
        let _ = tile(&[0i8; 3], 3, 2, BlockShape::new(1, 1));
    }
}
