//! Block Sparse Row (BSR) format.

use std::ops::Range;

use super::{assert_pointer, scatter_block};
use crate::dense::{BlockShape, DenseView};
use crate::element::Element;
use crate::error::Result;
use crate::tile::{real_count, untile};

/// Block Sparse Row matrix.
///
/// Stores only the blocks that contain a nonzero element. `row_ptr` holds, for
/// each block-row, the offset of its first entry in `col_indices`; the payload
/// keeps each block contiguous and row-major, in `col_indices` order.
///
/// When `group > 1` the matrix has been tile-grouped: `row_ptr` counts groups
/// of `group` column slots instead of single blocks, padding slots repeat the
/// preceding column index, and `data` is stored tile-major (see [`crate::tile`]).
///
/// # Example Structure
/// For a 4x4 matrix with 2x2 blocks and a zero bottom-right block:
/// ```text
/// [1 2 | 3 0]
/// [4 5 | 0 6]
/// [-----+----]
/// [7 0 | 0 0]
/// [0 8 | 0 0]
/// ```
///
/// - row_ptr: [0, 2, 3]
/// - col_indices: [0, 1, 0]
/// - data: [1, 2, 4, 5,  3, 0, 0, 6,  7, 0, 0, 8]
#[derive(Debug, Clone, PartialEq)]
pub struct BsrMatrix<T> {
    block_shape: BlockShape,
    shape: (usize, usize),
    row_ptr: Vec<usize>,
    col_indices: Vec<usize>,
    data: Vec<T>,
    group: usize,
}

impl<T: Element> BsrMatrix<T> {
    /// Assemble a BSR matrix from its parts.
    ///
    /// # Panics
    /// Panics if invariants are violated:
    /// - shape is not divisible by block_shape
    /// - row_ptr is not a non-decreasing table of length block_rows + 1
    ///   ending at the number of stored groups
    /// - col_indices.len() is not a multiple of group
    /// - a column index is out of range
    /// - when grouped, a group's genuine indices are not strictly increasing
    /// - data.len() != col_indices.len() * block size
    pub fn new(
        block_shape: BlockShape,
        shape: (usize, usize),
        row_ptr: Vec<usize>,
        col_indices: Vec<usize>,
        data: Vec<T>,
        group: usize,
    ) -> Self {
        assert!(group > 0, "group must be at least 1");
        assert!(
            block_shape.check_divides(shape).is_ok(),
            "shape {:?} is not divisible by block shape {:?}",
            shape,
            block_shape
        );
        assert_eq!(
            col_indices.len() % group,
            0,
            "col_indices length {} is not a multiple of group {}",
            col_indices.len(),
            group
        );
        let block_rows = shape.0 / block_shape.rows;
        let block_cols = shape.1 / block_shape.cols;
        assert_pointer(&row_ptr, block_rows + 1, col_indices.len() / group, "row_ptr");
        assert!(
            col_indices.iter().all(|&c| c < block_cols),
            "column index out of range for {} block-columns",
            block_cols
        );
        if group > 1 {
            for (idx, slots) in col_indices.chunks_exact(group).enumerate() {
                let real = real_count(slots);
                assert!(
                    slots[..real].windows(2).all(|w| w[0] < w[1]),
                    "group {} column indices must be strictly increasing",
                    idx
                );
                assert!(
                    slots[real..].iter().all(|&c| c == slots[real - 1]),
                    "group {} padding must repeat its last genuine column index",
                    idx
                );
            }
        }
        assert_eq!(
            data.len(),
            col_indices.len() * block_shape.size(),
            "data must hold one block per column index"
        );

        Self {
            block_shape,
            shape,
            row_ptr,
            col_indices,
            data,
            group,
        }
    }

    /// Encode a dense matrix, keeping every block that holds a nonzero element.
    ///
    /// Blocks come out row-major over block-rows and in ascending block-column
    /// order within each block-row. The result is ungrouped (`group == 1`).
    pub fn from_dense(view: DenseView<'_, T>, block_shape: BlockShape) -> Result<Self> {
        block_shape.check_divides(view.shape())?;
        let block_rows = view.rows() / block_shape.rows;
        let block_cols = view.cols() / block_shape.cols;

        let mut row_ptr = Vec::with_capacity(block_rows + 1);
        let mut col_indices = Vec::new();
        for block_row in 0..block_rows {
            row_ptr.push(col_indices.len());
            col_indices.extend(
                (0..block_cols).filter(|&block_col| !view.is_zero_block(block_row, block_col, block_shape)),
            );
        }
        row_ptr.push(col_indices.len());

        let mut data = Vec::with_capacity(col_indices.len() * block_shape.size());
        for block_row in 0..block_rows {
            for &block_col in &col_indices[row_ptr[block_row]..row_ptr[block_row + 1]] {
                for row in view.block_rows_iter(block_row, block_col, block_shape) {
                    data.extend_from_slice(row);
                }
            }
        }

        Ok(Self {
            block_shape,
            shape: view.shape(),
            row_ptr,
            col_indices,
            data,
            group: 1,
        })
    }

    #[inline]
    pub fn block_shape(&self) -> BlockShape {
        self.block_shape
    }

    /// Matrix dimensions (rows, cols).
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    #[inline]
    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    #[inline]
    pub fn col_indices(&self) -> &[usize] {
        &self.col_indices
    }

    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Tile group size (1 when ungrouped).
    #[inline]
    pub fn group(&self) -> usize {
        self.group
    }

    #[inline]
    pub fn is_grouped(&self) -> bool {
        self.group > 1
    }

    /// Number of block-rows.
    #[inline]
    pub fn block_rows(&self) -> usize {
        self.shape.0 / self.block_shape.rows
    }

    /// Number of block-columns.
    #[inline]
    pub fn block_cols(&self) -> usize {
        self.shape.1 / self.block_shape.cols
    }

    /// Range of `row_ptr` units (blocks, or groups when grouped) in a block-row.
    #[inline]
    pub fn block_row_range(&self, block_row: usize) -> Range<usize> {
        self.row_ptr[block_row]..self.row_ptr[block_row + 1]
    }

    /// Number of stored block slots, padding included.
    #[inline]
    pub fn nnz_blocks(&self) -> usize {
        self.col_indices.len()
    }

    /// Number of stored groups (equals `nnz_blocks` when ungrouped).
    #[inline]
    pub fn nnz_groups(&self) -> usize {
        self.col_indices.len() / self.group
    }

    /// Number of genuine (non-padding) blocks.
    pub fn real_blocks(&self) -> usize {
        if !self.is_grouped() {
            return self.col_indices.len();
        }
        self.col_indices.chunks_exact(self.group).map(real_count).sum()
    }

    /// Ratio of genuine blocks to all blocks of the matrix.
    /// Returns 1.0 for a fully dense matrix, 0.0 for an all-zeros matrix.
    pub fn density(&self) -> f32 {
        let total = self.block_rows() * self.block_cols();
        if total == 0 {
            return 0.0;
        }
        self.real_blocks() as f32 / total as f32
    }

    /// Calculate total memory usage in bytes (payload plus index arrays).
    pub fn memory_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<T>()
            + (self.row_ptr.len() + self.col_indices.len()) * std::mem::size_of::<usize>()
    }

    /// Iterate stored blocks as `(block_row, block_col, block)`.
    ///
    /// # Panics
    /// Panics on a grouped matrix, whose payload is tile-major rather than
    /// block-contiguous.
    pub fn iter_blocks(&self) -> impl Iterator<Item = (usize, usize, &[T])> + '_ {
        assert!(!self.is_grouped(), "iter_blocks requires an ungrouped matrix");
        let block_size = self.block_shape.size();
        (0..self.block_rows()).flat_map(move |block_row| {
            self.block_row_range(block_row).map(move |idx| {
                let start = idx * block_size;
                (block_row, self.col_indices[idx], &self.data[start..start + block_size])
            })
        })
    }

    /// Expand back to a dense row-major matrix, zero outside stored blocks.
    ///
    /// Grouped matrices are untiled first and their padding slots skipped.
    pub fn to_dense(&self) -> Vec<T> {
        let (rows, cols) = self.shape;
        let mut out = vec![T::default(); rows * cols];
        let block_size = self.block_shape.size();

        if !self.is_grouped() {
            for (block_row, block_col, block) in self.iter_blocks() {
                scatter_block(&mut out, cols, self.block_shape, (block_row, block_col), block);
            }
            return out;
        }

        let staged = untile(&self.data, self.col_indices.len(), self.group, self.block_shape);
        for block_row in 0..self.block_rows() {
            for group_idx in self.block_row_range(block_row) {
                let first = group_idx * self.group;
                let slots = &self.col_indices[first..first + self.group];
                for (k, &block_col) in slots.iter().take(real_count(slots)).enumerate() {
                    let start = (first + k) * block_size;
                    scatter_block(
                        &mut out,
                        cols,
                        self.block_shape,
                        (block_row, block_col),
                        &staged[start..start + block_size],
                    );
                }
            }
        }
        out
    }
}

/// Encode a dense matrix into ungrouped BSR form.
pub fn to_bsr<T: Element>(view: DenseView<'_, T>, block_shape: BlockShape) -> Result<BsrMatrix<T>> {
    BsrMatrix::from_dense(view, block_shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SparseError;

    fn sample_4x4() -> Vec<i8> {
        vec![
            1, 2, 3, 0, //
            4, 5, 0, 6, //
            7, 0, 0, 0, //
            0, 8, 0, 0,
        ]
    }

    #[test]
    fn test_from_dense_three_of_four_blocks() {
        let data = sample_4x4();
        let view = DenseView::new(&data, (4, 4)).unwrap();
        let bsr = to_bsr(view, BlockShape::new(2, 2)).unwrap();

        assert_eq!(bsr.row_ptr(), &[0, 2, 3]);
        assert_eq!(bsr.col_indices(), &[0, 1, 0]);
        assert_eq!(bsr.data(), &[1, 2, 4, 5, 3, 0, 0, 6, 7, 0, 0, 8]);
        assert_eq!(bsr.group(), 1);
        assert_eq!(bsr.nnz_blocks(), 3);
        assert_eq!(bsr.density(), 0.75);
    }

    #[test]
    fn test_from_dense_all_zeros() {
        let data = vec![0i8; 32];
        let view = DenseView::new(&data, (4, 8)).unwrap();
        let bsr = to_bsr(view, BlockShape::new(2, 2)).unwrap();

        assert_eq!(bsr.row_ptr(), &[0, 0, 0]);
        assert!(bsr.col_indices().is_empty());
        assert!(bsr.data().is_empty());
        assert_eq!(bsr.density(), 0.0);
        assert_eq!(bsr.to_dense(), data);
    }

    #[test]
    fn test_from_dense_fully_dense() {
        let data: Vec<f32> = (1..=16).map(|x| x as f32).collect();
        let view = DenseView::new(&data, (4, 4)).unwrap();
        let bsr = to_bsr(view, BlockShape::new(2, 2)).unwrap();

        assert_eq!(bsr.row_ptr(), &[0, 2, 4]);
        assert_eq!(bsr.col_indices(), &[0, 1, 0, 1]);
        assert_eq!(bsr.density(), 1.0);
        assert_eq!(bsr.to_dense(), data);
    }

    #[test]
    fn test_from_dense_column_blocks() {
        // (2, 1) blocks: column 1 is zero in the top block-row
        let data = vec![1i8, 0, 2, 0, 0, 3];
        let view = DenseView::new(&data, (2, 3)).unwrap();
        let bsr = to_bsr(view, BlockShape::new(2, 1)).unwrap();

        assert_eq!(bsr.row_ptr(), &[0, 2]);
        assert_eq!(bsr.col_indices(), &[0, 2]);
        assert_eq!(bsr.data(), &[1, 0, 2, 3]);
    }

    #[test]
    fn test_from_dense_indivisible_shape() {
        let data = vec![1i8; 12];
        let view = DenseView::new(&data, (3, 4)).unwrap();
        let err = to_bsr(view, BlockShape::new(2, 2)).unwrap_err();
        assert_eq!(
            err,
            SparseError::IndivisibleShape { rows: 3, cols: 4, block_rows: 2, block_cols: 2 }
        );
    }

    #[test]
    fn test_round_trip() {
        let data = sample_4x4();
        let view = DenseView::new(&data, (4, 4)).unwrap();
        let bsr = to_bsr(view, BlockShape::new(2, 2)).unwrap();
        assert_eq!(bsr.to_dense(), data);
    }

    #[test]
    fn test_iter_blocks() {
        let data = sample_4x4();
        let view = DenseView::new(&data, (4, 4)).unwrap();
        let bsr = to_bsr(view, BlockShape::new(2, 2)).unwrap();

        let coords: Vec<(usize, usize)> = bsr.iter_blocks().map(|(r, c, _)| (r, c)).collect();
        assert_eq!(coords, vec![(0, 0), (0, 1), (1, 0)]);
    }

    #[test]
    fn test_new_valid() {
        let bsr = BsrMatrix::new(
            BlockShape::new(1, 1),
            (2, 2),
            vec![0, 1, 2],
            vec![1, 0],
            vec![5i8, 6],
            1,
        );
        assert_eq!(bsr.to_dense(), vec![0, 5, 6, 0]);
    }

    #[test]
    #[should_panic(expected = "row_ptr must end at")]
    fn test_new_bad_row_ptr() {
        let _ = BsrMatrix::new(
            BlockShape::new(1, 1),
            (2, 2),
            vec![0, 1, 1],
            vec![1, 0],
            vec![5i8, 6],
            1,
        );
    }

    #[test]
    fn test_new_grouped_valid() {
        let bsr = BsrMatrix::new(
            BlockShape::new(1, 1),
            (1, 4),
            vec![0, 1],
            vec![1, 1],
            vec![5i8, 0],
            2,
        );
        assert_eq!(bsr.real_blocks(), 1);
        assert_eq!(bsr.to_dense(), vec![0, 5, 0, 0]);
    }

    #[test]
    #[should_panic(expected = "must be strictly increasing")]
    fn test_new_grouped_decreasing_indices() {
        let _ = BsrMatrix::new(
            BlockShape::new(1, 1),
            (1, 4),
            vec![0, 1],
            vec![3, 1],
            vec![5i8, 6],
            2,
        );
    }

    #[test]
    #[should_panic(expected = "padding must repeat")]
    fn test_new_grouped_bad_padding() {
        let _ = BsrMatrix::new(
            BlockShape::new(1, 1),
            (1, 4),
            vec![0, 1],
            vec![1, 2, 2, 0],
            vec![5i8, 6, 0, 0],
            4,
        );
    }

    #[test]
    #[should_panic(expected = "column index out of range")]
    fn test_new_column_out_of_range() {
        let _ = BsrMatrix::new(
            BlockShape::new(1, 1),
            (1, 2),
            vec![0, 1],
            vec![2],
            vec![5i8],
            1,
        );
    }
}
