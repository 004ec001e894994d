//! Configuration and type-erased entry points for tile encoding.

use half::bf16;

use crate::dense::DenseView;
use crate::element::{Element, ElementType};
use crate::error::{Result, SparseError};
use crate::formats::BsrMatrix;
use crate::partition::{reorder_to_tile_chunks, TileChunks};
use crate::tile::TileFormat;

/// Default chunk height for micro-row partitioning.
pub const DEFAULT_MICRO_ROWS: usize = 64;

/// Configuration for tile-grouped encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileConfig {
    format: TileFormat,
    micro_rows: usize,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            format: TileFormat::default(),
            micro_rows: DEFAULT_MICRO_ROWS,
        }
    }
}

impl TileConfig {
    /// Create a new TileConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tile format.
    pub fn format(mut self, format: TileFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the micro-row chunk height.
    pub fn micro_rows(mut self, micro_rows: usize) -> Self {
        self.micro_rows = micro_rows;
        self
    }

    /// Get the tile format.
    pub fn get_format(&self) -> TileFormat {
        self.format
    }

    /// Get the micro-row chunk height.
    pub fn get_micro_rows(&self) -> usize {
        self.micro_rows
    }
}

/// Dense view of any supported element type.
#[derive(Debug, Clone, Copy)]
pub enum AnyDenseView<'a> {
    I8(DenseView<'a, i8>),
    Bf16(DenseView<'a, bf16>),
    F32(DenseView<'a, f32>),
}

impl<'a> AnyDenseView<'a> {
    pub fn element_type(&self) -> ElementType {
        match self {
            Self::I8(_) => ElementType::I8,
            Self::Bf16(_) => ElementType::Bf16,
            Self::F32(_) => ElementType::F32,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        match self {
            Self::I8(v) => v.shape(),
            Self::Bf16(v) => v.shape(),
            Self::F32(v) => v.shape(),
        }
    }
}

impl<'a> From<DenseView<'a, i8>> for AnyDenseView<'a> {
    fn from(view: DenseView<'a, i8>) -> Self {
        Self::I8(view)
    }
}

impl<'a> From<DenseView<'a, bf16>> for AnyDenseView<'a> {
    fn from(view: DenseView<'a, bf16>) -> Self {
        Self::Bf16(view)
    }
}

impl<'a> From<DenseView<'a, f32>> for AnyDenseView<'a> {
    fn from(view: DenseView<'a, f32>) -> Self {
        Self::F32(view)
    }
}

/// Type-erased wrapper for tile chunks of any tile format.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyTileChunks {
    Int8(TileChunks<i8>),
    Bf16(TileChunks<bf16>),
}

impl AnyTileChunks {
    /// Partition and tile-encode `view` as configured.
    ///
    /// The view's element type must match the configured format.
    pub fn encode(view: AnyDenseView<'_>, config: &TileConfig) -> Result<Self> {
        let format = config.format;
        match (format, view) {
            (TileFormat::Int8, AnyDenseView::I8(v)) => {
                reorder_to_tile_chunks(v, config.micro_rows, format.group()).map(Self::Int8)
            }
            (TileFormat::Bf16, AnyDenseView::Bf16(v)) => {
                reorder_to_tile_chunks(v, config.micro_rows, format.group()).map(Self::Bf16)
            }
            (_, other) => Err(SparseError::ElementTypeMismatch {
                format,
                expected: format.element_type(),
                actual: other.element_type(),
            }),
        }
    }

    /// Get the tile format of these chunks.
    pub fn format(&self) -> TileFormat {
        match self {
            Self::Int8(_) => TileFormat::Int8,
            Self::Bf16(_) => TileFormat::Bf16,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        match self {
            Self::Int8(c) => c.shape(),
            Self::Bf16(c) => c.shape(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Int8(c) => c.len(),
            Self::Bf16(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn real_blocks(&self) -> usize {
        match self {
            Self::Int8(c) => c.real_blocks(),
            Self::Bf16(c) => c.real_blocks(),
        }
    }

    pub fn nnz_blocks(&self) -> usize {
        match self {
            Self::Int8(c) => c.nnz_blocks(),
            Self::Bf16(c) => c.nnz_blocks(),
        }
    }

    pub fn nnz_groups(&self) -> usize {
        match self {
            Self::Int8(c) => c.nnz_groups(),
            Self::Bf16(c) => c.nnz_groups(),
        }
    }

    pub fn density(&self) -> f32 {
        match self {
            Self::Int8(c) => c.density(),
            Self::Bf16(c) => c.density(),
        }
    }

    pub fn memory_bytes(&self) -> usize {
        match self {
            Self::Int8(c) => c.memory_bytes(),
            Self::Bf16(c) => c.memory_bytes(),
        }
    }

    // Type accessors - Option versions

    pub fn try_as_int8(&self) -> Option<&TileChunks<i8>> {
        match self {
            Self::Int8(c) => Some(c),
            _ => None,
        }
    }

    pub fn try_as_bf16(&self) -> Option<&TileChunks<bf16>> {
        match self {
            Self::Bf16(c) => Some(c),
            _ => None,
        }
    }

    /// Index arrays of one chunk, independent of element type.
    pub fn chunk_indices(&self, index: usize) -> Option<(&[usize], &[usize])> {
        fn parts<T: Element>(m: &BsrMatrix<T>) -> (&[usize], &[usize]) {
            (m.row_ptr(), m.col_indices())
        }
        match self {
            Self::Int8(c) => c.get(index).map(parts),
            Self::Bf16(c) => c.get(index).map(parts),
        }
    }
}
