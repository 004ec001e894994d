//! Encode module - SafeTensors to tile-grouped block-sparse conversion.
//!
//! Selected tensors are decoded from every source file, encoded in parallel
//! and written together into one `encoded.safetensors` container.

mod writer;

use anyhow::{Context, Result};
use rayon::prelude::*;
use safetensors::SafeTensors;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tile_sparse::{
    to_bsc, AnyDenseView, AnyTileChunks, BlockShape, BscMatrix, DenseView, TileConfig, TileFormat, DEFAULT_MICRO_ROWS,
    TILE_BLOCK_SHAPE,
};

use crate::common::runtime::ProgressTracker;
use crate::common::{
    bytes_to_dense, discover_safetensor_files, element_count, element_type, load_config, matrix_shape, DenseTensor,
};
use crate::config::encode_config::{EncodeConfig, Layout, TensorSelection};
use writer::{bsc_arrays, tile_chunk_arrays, write_output, EncodedTensor, StorableElement, TensorSummary};

/// Tensor decoded from a source file, ready for encoding.
struct SourceTensor {
    name: String,
    shape: (usize, usize),
    layout: Layout,
    tensor: DenseTensor,
}

/// Generate an encode config template from a model file.
pub fn generate_config_template(model_path: &str) -> Result<()> {
    let path = Path::new(model_path);
    let safetensor_files = discover_safetensor_files(path)?;

    println!("Found {} safetensors file(s)", safetensor_files.len());

    let mut listed: Vec<(TensorSelection, usize)> = safetensor_files
        .par_iter()
        .map(|file_path| -> Result<Vec<(TensorSelection, usize)>> {
            let data = fs::read(file_path)
                .with_context(|| format!("Failed to read: {}", file_path.display()))?;

            let st = SafeTensors::deserialize(&data)
                .with_context(|| format!("Failed to parse: {}", file_path.display()))?;

            let selections = st
                .tensors()
                .into_iter()
                .filter_map(|(name, tensor_view)| {
                    let shape = tensor_view.shape();
                    let (rows, dtype) = match (matrix_shape(shape), element_type(tensor_view.dtype())) {
                        (Some((rows, _)), Some(dtype)) => (rows, dtype),
                        _ => {
                            println!("  - {} (shape: {:?}, {:?}) skipped", name, shape, tensor_view.dtype());
                            return None;
                        }
                    };
                    println!("  - {} (shape: {:?}, {})", name, shape, dtype);
                    let selection = TensorSelection {
                        name,
                        layout: Layout::for_element(dtype),
                        include: true,
                    };
                    Some((selection, rows))
                })
                .collect();

            Ok(selections)
        })
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .flatten()
        .collect();
    listed.sort_by(|a, b| a.0.name.cmp(&b.0.name));

    let tile_rows: Vec<usize> = listed
        .iter()
        .filter(|(selection, _)| selection.layout == Layout::Tile)
        .map(|&(_, rows)| rows)
        .collect();
    let micro_rows = suggest_micro_rows(&tile_rows).unwrap_or_else(|| {
        println!(
            "\nNote: no chunk height of 16, 32, 48 or 64 divides every tile tensor's rows; \
             using {}. Edit micro_rows or switch those tensors to \"bsc\".",
            DEFAULT_MICRO_ROWS
        );
        DEFAULT_MICRO_ROWS
    });

    let config = EncodeConfig {
        micro_rows,
        tensors: listed.into_iter().map(|(selection, _)| selection).collect(),
        ..EncodeConfig::default()
    };

    let json = serde_json::to_string_pretty(&config)?;
    fs::write("encode_config.json", json)?;

    println!("\n=== Generated encode_config.json ===");
    println!("Tensors: {}", config.tensors.len());
    println!("Micro rows: {}", config.micro_rows);
    println!("\nEdit the config, then run:");
    println!("  tsparse encode --model {} --config encode_config.json", model_path);

    Ok(())
}

/// Run the encode process.
pub fn run(model_path: &str, config_path: Option<&str>, output_path: Option<&str>) -> Result<()> {
    let config: EncodeConfig = load_config(config_path, "encode_config.json")?;

    let output_dir = Path::new(output_path.unwrap_or("output"));
    println!("Output: {}", output_dir.display());
    println!("Micro rows: {}, BSC block: {:?}", config.micro_rows, config.bsc_block);

    let safetensor_files = discover_safetensor_files(Path::new(model_path))?;
    println!("Found {} safetensors file(s)", safetensor_files.len());

    let selected: HashMap<&str, Layout> = config
        .tensors
        .iter()
        .filter(|t| t.include)
        .map(|t| (t.name.as_str(), t.layout))
        .collect();

    let mut sources = Vec::new();
    let mut origins: HashMap<String, PathBuf> = HashMap::new();
    for file_path in &safetensor_files {
        for source in load_selected(file_path, &selected)? {
            if let Some(first) = origins.insert(source.name.clone(), file_path.clone()) {
                anyhow::bail!(
                    "Tensor '{}' appears in both {} and {}",
                    source.name,
                    first.display(),
                    file_path.display()
                );
            }
            sources.push(source);
        }
    }

    let missing: BTreeSet<&str> = selected
        .keys()
        .copied()
        .filter(|n| !origins.contains_key(*n))
        .collect();
    if !missing.is_empty() {
        anyhow::bail!("Tensors not found in model: {:?}", missing);
    }
    sources.sort_by(|a, b| a.name.cmp(&b.name));

    println!("Encoding {} tensors...", sources.len());
    let progress = ProgressTracker::new(sources.len(), "Encoding");

    let encoded: Vec<(Vec<EncodedTensor>, TensorSummary)> = sources
        .par_iter()
        .map(|source| {
            let result = encode_tensor(source, &config)
                .with_context(|| format!("Failed to encode tensor '{}'", source.name));
            progress.increment_with_extra(&source.name);
            result
        })
        .collect::<Result<Vec<_>>>()?;
    progress.finish();

    let mut arrays = Vec::new();
    let mut summaries = Vec::with_capacity(encoded.len());
    for (tensor_arrays, summary) in encoded {
        println!(
            "{} [{}x{}] {:?}: real_blocks={}, stored_blocks={}, density={:.1}%",
            summary.name,
            summary.shape[0],
            summary.shape[1],
            summary.layout,
            summary.real_blocks,
            summary.stored_blocks,
            summary.density * 100.0
        );
        arrays.extend(tensor_arrays);
        summaries.push(summary);
    }

    write_output(output_dir, &arrays, &summaries, config.micro_rows)?;

    println!("\n=== Encode Complete: {} tensors ===", progress.processed());
    Ok(())
}

/// Largest chunk height of at most 64 rows that divides every tile tensor.
fn suggest_micro_rows(tile_rows: &[usize]) -> Option<usize> {
    [64, 48, 32, 16]
        .into_iter()
        .find(|&micro_rows| tile_rows.iter().all(|&rows| rows % micro_rows == 0))
}

/// Decode the selected tensors of one safetensors file.
fn load_selected(file_path: &Path, selected: &HashMap<&str, Layout>) -> Result<Vec<SourceTensor>> {
    let data = fs::read(file_path)
        .with_context(|| format!("Failed to read: {}", file_path.display()))?;
    let st = SafeTensors::deserialize(&data)
        .with_context(|| format!("Failed to parse: {}", file_path.display()))?;

    let mut sources = Vec::new();
    for (name, tensor_view) in st.tensors() {
        let layout = match selected.get(name.as_str()) {
            Some(&layout) => layout,
            None => continue,
        };

        let (rows, cols) = matrix_shape(tensor_view.shape()).ok_or_else(|| {
            anyhow::anyhow!("Tensor '{}' must be 2D, got {:?}", name, tensor_view.shape())
        })?;
        let count = element_count((rows, cols))?;
        let tensor = bytes_to_dense(tensor_view.data(), tensor_view.dtype(), count)
            .with_context(|| format!("Failed to decode tensor '{}'", name))?;

        sources.push(SourceTensor {
            name,
            shape: (rows, cols),
            layout,
            tensor,
        });
    }
    Ok(sources)
}

/// Encode one tensor into its flat arrays and summary.
fn encode_tensor(source: &SourceTensor, config: &EncodeConfig) -> Result<(Vec<EncodedTensor>, TensorSummary)> {
    let view = source.tensor.view(source.shape)?;
    let (rows, cols) = source.shape;
    let dtype = view.element_type().to_string();

    match source.layout {
        Layout::Tile => {
            let format = TileFormat::for_element(view.element_type())?;
            let tile_config = TileConfig::new().format(format).micro_rows(config.micro_rows);
            let chunks = AnyTileChunks::encode(view, &tile_config)?;

            let arrays = match &chunks {
                AnyTileChunks::Int8(c) => tile_chunk_arrays(&source.name, c),
                AnyTileChunks::Bf16(c) => tile_chunk_arrays(&source.name, c),
            };
            let summary = TensorSummary {
                name: source.name.clone(),
                layout: Layout::Tile,
                dtype,
                shape: [rows, cols],
                block: [TILE_BLOCK_SHAPE.rows, TILE_BLOCK_SHAPE.cols],
                chunks: chunks.len(),
                real_blocks: chunks.real_blocks(),
                stored_blocks: chunks.nnz_blocks(),
                density: chunks.density(),
                memory_bytes: chunks.memory_bytes(),
            };
            Ok((arrays, summary))
        }
        Layout::Bsc => {
            let block = config.bsc_block_shape();
            let result = match view {
                AnyDenseView::I8(v) => encode_bsc(&source.name, v, block, dtype)?,
                AnyDenseView::Bf16(v) => encode_bsc(&source.name, v, block, dtype)?,
                AnyDenseView::F32(v) => encode_bsc(&source.name, v, block, dtype)?,
            };
            Ok(result)
        }
    }
}

fn encode_bsc<T: StorableElement>(
    name: &str,
    view: DenseView<'_, T>,
    block: BlockShape,
    dtype: String,
) -> Result<(Vec<EncodedTensor>, TensorSummary)> {
    let bsc: BscMatrix<T> = to_bsc(view, block)?;
    let (rows, cols) = bsc.shape();
    let summary = TensorSummary {
        name: name.to_string(),
        layout: Layout::Bsc,
        dtype,
        shape: [rows, cols],
        block: [block.rows, block.cols],
        chunks: 1,
        real_blocks: bsc.nnz_blocks(),
        stored_blocks: bsc.nnz_blocks(),
        density: bsc.density(),
        memory_bytes: bsc.memory_bytes(),
    };
    Ok((bsc_arrays(name, &bsc), summary))
}
