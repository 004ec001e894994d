//! Dense input views and the zero-block test.

use crate::element::Element;
use crate::error::{Result, SparseError};

/// Block granularity (rows x cols) used for sparsity detection and packing.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct BlockShape {
    pub rows: usize,
    pub cols: usize,
}

impl BlockShape {
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Number of elements in one block.
    #[inline]
    pub fn size(&self) -> usize {
        self.rows * self.cols
    }

    /// Check that `shape` tiles exactly into blocks of this shape.
    pub fn check_divides(&self, shape: (usize, usize)) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(SparseError::EmptyBlockShape {
                rows: self.rows,
                cols: self.cols,
            });
        }
        let (rows, cols) = shape;
        if rows % self.rows != 0 || cols % self.cols != 0 {
            return Err(SparseError::IndivisibleShape {
                rows,
                cols,
                block_rows: self.rows,
                block_cols: self.cols,
            });
        }
        Ok(())
    }
}

impl From<(usize, usize)> for BlockShape {
    fn from((rows, cols): (usize, usize)) -> Self {
        Self::new(rows, cols)
    }
}

/// Read-only row-major view over a caller-owned dense matrix.
#[derive(Clone, Copy, Debug)]
pub struct DenseView<'a, T> {
    data: &'a [T],
    rows: usize,
    cols: usize,
}

impl<'a, T: Element> DenseView<'a, T> {
    /// Wrap `data` as a `rows x cols` matrix.
    pub fn new(data: &'a [T], shape: (usize, usize)) -> Result<Self> {
        let (rows, cols) = shape;
        let expected = rows
            .checked_mul(cols)
            .ok_or(SparseError::ShapeOverflow { rows, cols })?;
        if data.len() != expected {
            return Err(SparseError::DataLength {
                rows,
                cols,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, rows, cols })
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Sub-view over `count` full rows starting at `start`.
    ///
    /// # Panics
    /// Panics if the range runs past the last row.
    pub fn row_chunk(&self, start: usize, count: usize) -> DenseView<'a, T> {
        assert!(
            start + count <= self.rows,
            "row chunk {}..{} out of bounds for {} rows",
            start,
            start + count,
            self.rows
        );
        let begin = start * self.cols;
        DenseView {
            data: &self.data[begin..begin + count * self.cols],
            rows: count,
            cols: self.cols,
        }
    }

    /// Whether the block at (`block_row`, `block_col`) is entirely zero.
    #[inline]
    pub fn is_zero_block(&self, block_row: usize, block_col: usize, block: BlockShape) -> bool {
        let offset = block_row * block.rows * self.cols + block_col * block.cols;
        is_zero_block(&self.data[offset..], self.cols, block)
    }

    /// Iterate the rows of one block as slices of `block.cols` elements.
    pub(crate) fn block_rows_iter(
        &self,
        block_row: usize,
        block_col: usize,
        block: BlockShape,
    ) -> impl Iterator<Item = &'a [T]> + 'a {
        let cols = self.cols;
        let data = self.data;
        let base = block_row * block.rows * cols + block_col * block.cols;
        (0..block.rows).map(move |i| {
            let start = base + i * cols;
            &data[start..start + block.cols]
        })
    }
}

/// Test whether the `block.rows x block.cols` rectangle starting at `data[0]`
/// is entirely zero, where consecutive matrix rows are `stride` elements apart.
///
/// Stops at the first nonzero element.
///
/// # Panics
/// Panics if the rectangle extends past the end of `data`.
#[inline]
pub fn is_zero_block<T: Element>(data: &[T], stride: usize, block: BlockShape) -> bool {
    (0..block.rows).all(|i| {
        let row = &data[i * stride..i * stride + block.cols];
        row.iter().all(T::is_zero)
    })
}
