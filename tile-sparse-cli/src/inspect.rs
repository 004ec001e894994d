//! Inspect module - block sparsity report for SafeTensors models.

use anyhow::{Context, Result};
use rayon::prelude::*;
use safetensors::SafeTensors;
use std::fs;
use std::path::Path;
use tile_sparse::{to_bsr, AnyDenseView, AnyTileChunks, TileConfig, TileFormat, TILE_BLOCK_SHAPE};

use crate::common::{bytes_to_dense, discover_safetensor_files, element_count, element_type, matrix_shape};

/// Sparsity statistics for one 2-D tensor.
#[derive(Debug, Clone, PartialEq)]
struct TensorReport {
    name: String,
    shape: (usize, usize),
    dtype: String,
    /// Nonzero 16x1 blocks
    nnz_blocks: usize,
    block_density: f32,
    /// Tile statistics, or the reason the tensor cannot be tiled
    tile: std::result::Result<TileReport, String>,
}

#[derive(Debug, Clone, PartialEq)]
struct TileReport {
    chunks: usize,
    groups: usize,
    stored_blocks: usize,
    memory_bytes: usize,
}

/// Print block sparsity of every 2-D tensor in a model.
pub fn run(model_path: &str, micro_rows: usize) -> Result<()> {
    let safetensor_files = discover_safetensor_files(Path::new(model_path))?;
    println!("Found {} safetensors file(s)", safetensor_files.len());

    for file_path in &safetensor_files {
        let data = fs::read(file_path)
            .with_context(|| format!("Failed to read: {}", file_path.display()))?;
        let st = SafeTensors::deserialize(&data)
            .with_context(|| format!("Failed to parse: {}", file_path.display()))?;

        let mut tensors = st.tensors();
        tensors.sort_by(|a, b| a.0.cmp(&b.0));

        println!("\n{}", file_path.display());
        let reports: Vec<std::result::Result<TensorReport, String>> = tensors
            .par_iter()
            .map(|(name, view)| {
                inspect_tensor(name, view.shape(), view.dtype(), view.data(), micro_rows)
                    .map_err(|e| format!("  - {} skipped: {:#}", name, e))
            })
            .collect();

        for report in reports {
            match report {
                Ok(r) => print_report(&r),
                Err(line) => println!("{}", line),
            }
        }
    }

    Ok(())
}

fn inspect_tensor(
    name: &str,
    shape: &[usize],
    dtype: safetensors::Dtype,
    bytes: &[u8],
    micro_rows: usize,
) -> Result<TensorReport> {
    let (rows, cols) = matrix_shape(shape)
        .ok_or_else(|| anyhow::anyhow!("not a 2-D tensor (shape {:?})", shape))?;
    if element_type(dtype).is_none() {
        anyhow::bail!("unsupported dtype {:?}", dtype);
    }

    let tensor = bytes_to_dense(bytes, dtype, element_count((rows, cols))?)?;
    let view = tensor.view((rows, cols))?;

    let (nnz_blocks, block_density) = match view {
        AnyDenseView::I8(v) => to_bsr(v, TILE_BLOCK_SHAPE).map(|m| (m.nnz_blocks(), m.density()))?,
        AnyDenseView::Bf16(v) => to_bsr(v, TILE_BLOCK_SHAPE).map(|m| (m.nnz_blocks(), m.density()))?,
        AnyDenseView::F32(v) => to_bsr(v, TILE_BLOCK_SHAPE).map(|m| (m.nnz_blocks(), m.density()))?,
    };

    let tile = TileFormat::for_element(view.element_type())
        .and_then(|format| {
            let config = TileConfig::new().format(format).micro_rows(micro_rows);
            AnyTileChunks::encode(view, &config)
        })
        .map(|chunks| TileReport {
            chunks: chunks.len(),
            groups: chunks.nnz_groups(),
            stored_blocks: chunks.nnz_blocks(),
            memory_bytes: chunks.memory_bytes(),
        })
        .map_err(|e| e.to_string());

    Ok(TensorReport {
        name: name.to_string(),
        shape: (rows, cols),
        dtype: tensor.element_type().to_string(),
        nnz_blocks,
        block_density,
        tile,
    })
}

fn print_report(report: &TensorReport) {
    println!(
        "  - {} [{}x{}] {}: nnz_blocks={} density={:.1}%",
        report.name,
        report.shape.0,
        report.shape.1,
        report.dtype,
        report.nnz_blocks,
        report.block_density * 100.0
    );
    match &report.tile {
        Ok(t) => {
            let padding = t.stored_blocks - report.nnz_blocks;
            println!(
                "      tile: chunks={} groups={} stored_blocks={} padding={} bytes={}",
                t.chunks, t.groups, t.stored_blocks, padding, t.memory_bytes
            );
        }
        Err(reason) => println!("      tile: n/a ({})", reason),
    }
}
