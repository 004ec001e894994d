//! Block Sparse Column (BSC) format.

use std::ops::Range;

use super::{assert_pointer, scatter_block};
use crate::dense::{BlockShape, DenseView};
use crate::element::Element;
use crate::error::Result;

/// Block Sparse Column matrix, the column-axis dual of [`BsrMatrix`](super::BsrMatrix).
///
/// `col_ptr` holds, for each block-column, the offset of its first entry in
/// `row_indices`. Blocks are stored row-major and contiguous, ordered by
/// block-column and then ascending block-row.
#[derive(Debug, Clone, PartialEq)]
pub struct BscMatrix<T> {
    block_shape: BlockShape,
    shape: (usize, usize),
    col_ptr: Vec<usize>,
    row_indices: Vec<usize>,
    data: Vec<T>,
}

impl<T: Element> BscMatrix<T> {
    /// Assemble a BSC matrix from its parts.
    ///
    /// # Panics
    /// Panics if shape is not divisible by block_shape, col_ptr is not a valid
    /// offset table over row_indices, a row index is out of range, or
    /// data.len() != row_indices.len() * block size.
    pub fn new(
        block_shape: BlockShape,
        shape: (usize, usize),
        col_ptr: Vec<usize>,
        row_indices: Vec<usize>,
        data: Vec<T>,
    ) -> Self {
        assert!(
            block_shape.check_divides(shape).is_ok(),
            "shape {:?} is not divisible by block shape {:?}",
            shape,
            block_shape
        );
        let block_rows = shape.0 / block_shape.rows;
        let block_cols = shape.1 / block_shape.cols;
        assert_pointer(&col_ptr, block_cols + 1, row_indices.len(), "col_ptr");
        assert!(
            row_indices.iter().all(|&r| r < block_rows),
            "row index out of range for {} block-rows",
            block_rows
        );
        assert_eq!(
            data.len(),
            row_indices.len() * block_shape.size(),
            "data must hold one block per row index"
        );

        Self {
            block_shape,
            shape,
            col_ptr,
            row_indices,
            data,
        }
    }

    /// Encode a dense matrix, scanning block-columns left to right and
    /// block-rows top to bottom within each.
    pub fn from_dense(view: DenseView<'_, T>, block_shape: BlockShape) -> Result<Self> {
        block_shape.check_divides(view.shape())?;
        let block_rows = view.rows() / block_shape.rows;
        let block_cols = view.cols() / block_shape.cols;

        let mut col_ptr = Vec::with_capacity(block_cols + 1);
        let mut row_indices = Vec::new();
        for block_col in 0..block_cols {
            col_ptr.push(row_indices.len());
            row_indices.extend(
                (0..block_rows).filter(|&block_row| !view.is_zero_block(block_row, block_col, block_shape)),
            );
        }
        col_ptr.push(row_indices.len());

        let mut data = Vec::with_capacity(row_indices.len() * block_shape.size());
        for block_col in 0..block_cols {
            for &block_row in &row_indices[col_ptr[block_col]..col_ptr[block_col + 1]] {
                for row in view.block_rows_iter(block_row, block_col, block_shape) {
                    data.extend_from_slice(row);
                }
            }
        }

        Ok(Self {
            block_shape,
            shape: view.shape(),
            col_ptr,
            row_indices,
            data,
        })
    }

    #[inline]
    pub fn block_shape(&self) -> BlockShape {
        self.block_shape
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    #[inline]
    pub fn col_ptr(&self) -> &[usize] {
        &self.col_ptr
    }

    #[inline]
    pub fn row_indices(&self) -> &[usize] {
        &self.row_indices
    }

    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn block_rows(&self) -> usize {
        self.shape.0 / self.block_shape.rows
    }

    #[inline]
    pub fn block_cols(&self) -> usize {
        self.shape.1 / self.block_shape.cols
    }

    #[inline]
    pub fn block_col_range(&self, block_col: usize) -> Range<usize> {
        self.col_ptr[block_col]..self.col_ptr[block_col + 1]
    }

    #[inline]
    pub fn nnz_blocks(&self) -> usize {
        self.row_indices.len()
    }

    /// Ratio of stored blocks to all blocks of the matrix.
    pub fn density(&self) -> f32 {
        let total = self.block_rows() * self.block_cols();
        if total == 0 {
            return 0.0;
        }
        self.nnz_blocks() as f32 / total as f32
    }

    pub fn memory_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<T>()
            + (self.col_ptr.len() + self.row_indices.len()) * std::mem::size_of::<usize>()
    }

    /// Iterate stored blocks as `(block_row, block_col, block)`.
    pub fn iter_blocks(&self) -> impl Iterator<Item = (usize, usize, &[T])> + '_ {
        let block_size = self.block_shape.size();
        (0..self.block_cols()).flat_map(move |block_col| {
            self.block_col_range(block_col).map(move |idx| {
                let start = idx * block_size;
                (self.row_indices[idx], block_col, &self.data[start..start + block_size])
            })
        })
    }

    /// Expand back to a dense row-major matrix, zero outside stored blocks.
    pub fn to_dense(&self) -> Vec<T> {
        let (rows, cols) = self.shape;
        let mut out = vec![T::default(); rows * cols];
        for (block_row, block_col, block) in self.iter_blocks() {
            scatter_block(&mut out, cols, self.block_shape, (block_row, block_col), block);
        }
        out
    }
}

/// Encode a dense matrix into BSC form.
pub fn to_bsc<T: Element>(view: DenseView<'_, T>, block_shape: BlockShape) -> Result<BscMatrix<T>> {
    BscMatrix::from_dense(view, block_shape)
}
