//! Tile Sparse - Block-sparse encoding for tile-based matmul units.
//!
//! Converts dense weight matrices into compressed block-sparse structures laid
//! out for CPU tile instructions. All operations are pure: they borrow the
//! dense input and return owned structures.
//!
//! # Formats
//! - `BsrMatrix`: Block Sparse Row, optionally tile-grouped
//! - `BscMatrix`: Block Sparse Column
//! - `TileChunks`: one tile-grouped BSR per micro-row chunk
//!
//! # Tile Formats
//! - `TileFormat::Int8`: `i8` elements, 64 block-columns per group
//! - `TileFormat::Bf16`: `bf16` elements, 32 block-columns per group
//!
//! # Usage
//! ```
//! use tile_sparse::{DenseView, TileChunks, BlockShape, to_bsr};
//!
//! let data = vec![1i8; 32 * 4];
//! let view = DenseView::new(&data, (32, 4)).unwrap();
//!
//! // Plain BSR with 2x2 blocks
//! let bsr = to_bsr(view, BlockShape::new(2, 2)).unwrap();
//! assert_eq!(bsr.nnz_blocks(), 32);
//!
//! // Tile-grouped BSR per 16-row chunk
//! let chunks = TileChunks::encode(view, 16).unwrap();
//! assert_eq!(chunks.len(), 2);
//! assert_eq!(chunks.group(), 64);
//! ```

pub mod config;
pub mod dense;
pub mod element;
pub mod error;
pub mod formats;
pub mod partition;
pub mod tile;

#[cfg(test)]
mod tile_tests;

// Re-exports
pub use config::{AnyDenseView, AnyTileChunks, TileConfig, DEFAULT_MICRO_ROWS};
pub use dense::{is_zero_block, BlockShape, DenseView};
pub use element::{Element, ElementType, TILE_WIDTH_BYTES};
pub use error::{Result, SparseError};
pub use formats::{to_bsc, to_bsr, BscMatrix, BsrMatrix};
pub use partition::{reorder_to_tile_chunks, TileChunks};
pub use tile::{real_count, to_tile_bsr, to_tile_groups, validate_group, TileElement, TileFormat, TILE_BLOCK_SHAPE};
