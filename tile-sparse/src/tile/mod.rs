//! Tile grouping of BSR matrices.
//!
//! Repacks an ungrouped [`BsrMatrix`] for a tile matmul unit in three stages:
//! 1. Group each block-row's column indices `group` at a time, padding the
//!    last group by repeating its final genuine index.
//! 2. Copy each group's genuine blocks into `group` block slots, zero-filling
//!    the padding slots.
//! 3. Reorder every run of `group` slots into tile-major order.
//!
//! `group` is the number of elements in one tile row: 64 for `i8`, 32 for `bf16`.

mod group;
mod reorder;

use std::fmt;
use std::str::FromStr;

use half::bf16;

use crate::dense::{BlockShape, DenseView};
use crate::element::{Element, ElementType};
use crate::error::{Result, SparseError};
use crate::formats::BsrMatrix;

pub use group::real_count;
pub use reorder::{tile, untile};

/// Block shape used for tile-grouped BSR: one 16-row column strip per block.
pub const TILE_BLOCK_SHAPE: BlockShape = BlockShape::new(16, 1);

/// Supported (element type, group) pairings for tile grouping.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash)]
pub enum TileFormat {
    /// `i8` elements, 64 block-columns per tile row
    #[default]
    Int8,
    /// `bf16` elements, 32 block-columns per tile row
    Bf16,
}

impl TileFormat {
    /// Element type carried by this format.
    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Int8 => ElementType::I8,
            Self::Bf16 => ElementType::Bf16,
        }
    }

    /// Block-columns per group.
    pub fn group(&self) -> usize {
        match self {
            Self::Int8 => 64,
            Self::Bf16 => 32,
        }
    }

    /// Tile format for an element type, if it can be tiled.
    pub fn for_element(dtype: ElementType) -> Result<Self> {
        match dtype {
            ElementType::I8 => Ok(Self::Int8),
            ElementType::Bf16 => Ok(Self::Bf16),
            ElementType::F32 => Err(SparseError::UntileableElement { dtype }),
        }
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int8 => f.write_str("int8"),
            Self::Bf16 => f.write_str("bf16"),
        }
    }
}

impl FromStr for TileFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "int8" | "i8" => Ok(Self::Int8),
            "bf16" => Ok(Self::Bf16),
            _ => Err(format!("Unknown tile format: {}. Valid formats: int8, bf16", s)),
        }
    }
}

/// Element types that can be tile-grouped.
pub trait TileElement: Element {
    const FORMAT: TileFormat;
}

impl TileElement for i8 {
    const FORMAT: TileFormat = TileFormat::Int8;
}

impl TileElement for bf16 {
    const FORMAT: TileFormat = TileFormat::Bf16;
}

/// Check that `group` is 1 or exactly fills a tile row of `T` elements.
pub fn validate_group<T: Element>(group: usize) -> Result<()> {
    if group == 1 || T::DTYPE.tile_group() == Some(group) {
        Ok(())
    } else {
        Err(SparseError::UnsupportedGroup {
            dtype: T::DTYPE,
            group,
        })
    }
}

/// Repack an ungrouped BSR matrix into tile-grouped form.
///
/// `group == 1` returns the input unchanged. Otherwise the result's `row_ptr`
/// counts groups per block-row, its `col_indices` are padded to whole groups,
/// and its payload is tile-major.
pub fn to_tile_groups<T: Element>(bsr: BsrMatrix<T>, group: usize) -> Result<BsrMatrix<T>> {
    if bsr.is_grouped() {
        return Err(SparseError::AlreadyGrouped { group: bsr.group() });
    }
    validate_group::<T>(group)?;
    if group == 1 {
        return Ok(bsr);
    }

    let block = bsr.block_shape();
    let grouped = group::group_indices(bsr.row_ptr(), bsr.col_indices(), group)?;
    let staged = group::compact_payload(bsr.data(), bsr.row_ptr(), &grouped, group, block);
    let slots = grouped.col_indices.len();
    let data = tile(&staged, slots, group, block);

    Ok(BsrMatrix::new(
        block,
        bsr.shape(),
        grouped.group_row_ptr,
        grouped.col_indices,
        data,
        group,
    ))
}

/// Encode a dense matrix to BSR and tile-group it in one step.
pub fn to_tile_bsr<T: Element>(view: DenseView<'_, T>, block_shape: BlockShape, group: usize) -> Result<BsrMatrix<T>> {
    validate_group::<T>(group)?;
    let bsr = BsrMatrix::from_dense(view, block_shape)?;
    to_tile_groups(bsr, group)
}
