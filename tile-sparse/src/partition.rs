//! Micro-row partitioning: independent tile-grouped BSR per row chunk.

use rayon::prelude::*;

use crate::dense::DenseView;
use crate::element::Element;
use crate::error::{Result, SparseError};
use crate::formats::BsrMatrix;
use crate::tile::{to_tile_bsr, validate_group, TileElement, TILE_BLOCK_SHAPE};

/// Tile-grouped BSR matrices for consecutive `micro_rows x cols` chunks of one
/// matrix, in chunk order.
///
/// Each chunk is self-contained (its own shape is `micro_rows x cols`), so a
/// consumer may schedule chunks on separate workers.
#[derive(Debug, Clone, PartialEq)]
pub struct TileChunks<T> {
    shape: (usize, usize),
    micro_rows: usize,
    group: usize,
    chunks: Vec<BsrMatrix<T>>,
}

impl<T: TileElement> TileChunks<T> {
    /// Partition and encode with the group of `T`'s tile format.
    pub fn encode(view: DenseView<'_, T>, micro_rows: usize) -> Result<Self> {
        reorder_to_tile_chunks(view, micro_rows, T::FORMAT.group())
    }
}

impl<T: Element> TileChunks<T> {
    /// Full matrix dimensions (rows, cols).
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    #[inline]
    pub fn micro_rows(&self) -> usize {
        self.micro_rows
    }

    #[inline]
    pub fn group(&self) -> usize {
        self.group
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&BsrMatrix<T>> {
        self.chunks.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BsrMatrix<T>> {
        self.chunks.iter()
    }

    /// Take ownership of the per-chunk matrices.
    pub fn into_chunks(self) -> Vec<BsrMatrix<T>> {
        self.chunks
    }

    /// Stored block slots across all chunks, padding included.
    pub fn nnz_blocks(&self) -> usize {
        self.chunks.iter().map(BsrMatrix::nnz_blocks).sum()
    }

    /// Genuine blocks across all chunks.
    pub fn real_blocks(&self) -> usize {
        self.chunks.iter().map(BsrMatrix::real_blocks).sum()
    }

    pub fn nnz_groups(&self) -> usize {
        self.chunks.iter().map(BsrMatrix::nnz_groups).sum()
    }

    /// Ratio of genuine blocks to all blocks of the full matrix.
    pub fn density(&self) -> f32 {
        let total = (self.shape.0 / TILE_BLOCK_SHAPE.rows) * (self.shape.1 / TILE_BLOCK_SHAPE.cols);
        if total == 0 {
            return 0.0;
        }
        self.real_blocks() as f32 / total as f32
    }

    pub fn memory_bytes(&self) -> usize {
        self.chunks.iter().map(BsrMatrix::memory_bytes).sum()
    }

    /// Reassemble the full dense matrix from its chunks.
    pub fn to_dense(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.shape.0 * self.shape.1);
        for chunk in &self.chunks {
            out.extend(chunk.to_dense());
        }
        out
    }
}

impl<T> IntoIterator for TileChunks<T> {
    type Item = BsrMatrix<T>;
    type IntoIter = std::vec::IntoIter<BsrMatrix<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a TileChunks<T> {
    type Item = &'a BsrMatrix<T>;
    type IntoIter = std::slice::Iter<'a, BsrMatrix<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.iter()
    }
}

/// Split `view` into `rows / micro_rows` row chunks and encode each one into a
/// tile-grouped BSR with block shape (16, 1).
///
/// Chunks are encoded in parallel on the rayon pool; the result keeps chunk
/// order. Any failing chunk fails the whole call.
pub fn reorder_to_tile_chunks<T: Element>(
    view: DenseView<'_, T>,
    micro_rows: usize,
    group: usize,
) -> Result<TileChunks<T>> {
    let (rows, cols) = view.shape();
    if micro_rows == 0 || rows % micro_rows != 0 || micro_rows % TILE_BLOCK_SHAPE.rows != 0 {
        return Err(SparseError::IndivisibleMicroRows {
            rows,
            micro_rows,
            block_rows: TILE_BLOCK_SHAPE.rows,
        });
    }
    validate_group::<T>(group)?;

    let chunks = (0..rows / micro_rows)
        .into_par_iter()
        .map(|chunk| to_tile_bsr(view.row_chunk(chunk * micro_rows, micro_rows), TILE_BLOCK_SHAPE, group))
        .collect::<Result<Vec<_>>>()?;

    Ok(TileChunks {
        shape: (rows, cols),
        micro_rows,
        group,
        chunks,
    })
}
