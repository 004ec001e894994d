//! Error types for tile-sparse encoding.

use thiserror::Error;

use crate::element::ElementType;
use crate::tile::TileFormat;

/// Precondition violations raised by the encoders.
///
/// Encoding is pure and deterministic, so every error is reproducible and
/// surfaces before any partial structure is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SparseError {
    /// Dense buffer length does not match the declared shape.
    #[error("data length mismatch: expected {expected} elements for {rows}x{cols}, got {actual}")]
    DataLength {
        rows: usize,
        cols: usize,
        expected: usize,
        actual: usize,
    },

    /// Element count of the declared shape does not fit in `usize`.
    #[error("matrix shape {rows}x{cols} overflows the addressable element count")]
    ShapeOverflow { rows: usize, cols: usize },

    /// Block shape with a zero dimension.
    #[error("block shape must be non-empty, got {rows}x{cols}")]
    EmptyBlockShape { rows: usize, cols: usize },

    /// Matrix shape is not an exact multiple of the block shape.
    #[error("matrix {rows}x{cols} is not divisible into {block_rows}x{block_cols} blocks")]
    IndivisibleShape {
        rows: usize,
        cols: usize,
        block_rows: usize,
        block_cols: usize,
    },

    /// Rows cannot be split into whole micro-row chunks of whole tile blocks.
    #[error("{rows} rows cannot be split into micro-row chunks of {micro_rows} (chunk height must divide rows and be a multiple of {block_rows})")]
    IndivisibleMicroRows {
        rows: usize,
        micro_rows: usize,
        block_rows: usize,
    },

    /// Group size that does not fill one tile row for this element type.
    #[error("group {group} is not supported for {dtype} elements")]
    UnsupportedGroup { dtype: ElementType, group: usize },

    /// Element type with no tile pairing.
    #[error("{dtype} elements cannot be tile-grouped")]
    UntileableElement { dtype: ElementType },

    /// Dense data whose element type does not match the requested tile format.
    #[error("tile format {format} expects {expected} elements, got {actual}")]
    ElementTypeMismatch {
        format: TileFormat,
        expected: ElementType,
        actual: ElementType,
    },

    /// Column indices within a block-row are not strictly increasing.
    #[error("block-row {block_row} has non-increasing column indices at position {position}")]
    NonIncreasingIndices { block_row: usize, position: usize },

    /// Tile grouping applied to an already grouped matrix.
    #[error("matrix is already grouped (group {group})")]
    AlreadyGrouped { group: usize },
}

/// Result type for tile-sparse operations.
pub type Result<T> = std::result::Result<T, SparseError>;
