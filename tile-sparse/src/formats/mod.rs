//! Compressed block-sparse formats (BSR and BSC).
//!
//! Both encoders walk the dense matrix twice: the first pass records which
//! blocks hold a nonzero element, the second copies those blocks row-major
//! into one contiguous payload in the same order as the index array.

mod bsc;
mod bsr;

pub use bsc::{to_bsc, BscMatrix};
pub use bsr::{to_bsr, BsrMatrix};

use crate::dense::BlockShape;

/// Copy one row-major block from `src` into its place in a dense row-major `out`.
pub(crate) fn scatter_block<T: Copy>(
    out: &mut [T],
    cols: usize,
    block: BlockShape,
    (block_row, block_col): (usize, usize),
    src: &[T],
) {
    for (i, src_row) in src.chunks_exact(block.cols).take(block.rows).enumerate() {
        let start = (block_row * block.rows + i) * cols + block_col * block.cols;
        out[start..start + block.cols].copy_from_slice(src_row);
    }
}

/// Assert that `ptr` is a valid offset table ending at `len`.
pub(crate) fn assert_pointer(ptr: &[usize], expected_len: usize, end: usize, name: &str) {
    assert_eq!(
        ptr.len(),
        expected_len,
        "{} must have length {}, got {}",
        name,
        expected_len,
        ptr.len()
    );
    assert_eq!(ptr.first().copied(), Some(0), "{} must start at 0", name);
    assert!(
        ptr.windows(2).all(|w| w[0] <= w[1]),
        "{} must be non-decreasing",
        name
    );
    assert_eq!(ptr.last().copied(), Some(end), "{} must end at {}", name, end);
}
