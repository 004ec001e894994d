//! Encode configuration for SafeTensors to block-sparse conversion.

use serde::{Deserialize, Serialize};
use tile_sparse::{BlockShape, ElementType, DEFAULT_MICRO_ROWS};

/// Configuration for encoding a model's tensors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeConfig {
    /// Chunk height for tile layout (multiple of 16, must divide tensor rows)
    #[serde(default = "default_micro_rows")]
    pub micro_rows: usize,

    /// Block shape [rows, cols] for BSC layout
    #[serde(default = "default_bsc_block")]
    pub bsc_block: [usize; 2],

    /// Tensors to encode
    pub tensors: Vec<TensorSelection>,
}

/// Target layout for one tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Micro-row chunks of tile-grouped BSR (i8 / bf16 only)
    Tile,
    /// Block Sparse Column with `bsc_block` blocks
    Bsc,
}

impl Layout {
    /// Default layout for a source element type.
    pub fn for_element(dtype: ElementType) -> Self {
        match dtype.tile_group() {
            Some(_) => Self::Tile,
            None => Self::Bsc,
        }
    }
}

/// One tensor entry in the config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TensorSelection {
    /// Tensor name in the source safetensors file
    pub name: String,

    /// Target layout
    pub layout: Layout,

    /// Whether to include this tensor
    #[serde(default = "default_include")]
    pub include: bool,
}

impl EncodeConfig {
    pub fn bsc_block_shape(&self) -> BlockShape {
        BlockShape::new(self.bsc_block[0], self.bsc_block[1])
    }
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            micro_rows: default_micro_rows(),
            bsc_block: default_bsc_block(),
            tensors: Vec::new(),
        }
    }
}

fn default_micro_rows() -> usize {
    DEFAULT_MICRO_ROWS
}

fn default_bsc_block() -> [usize; 2] {
    [16, 1]
}

fn default_include() -> bool {
    true
}
