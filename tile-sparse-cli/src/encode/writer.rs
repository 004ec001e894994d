//! Serialization of encoded tensors into a safetensors container.

use anyhow::{Context, Result};
use half::bf16;
use safetensors::{Dtype, View};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tile_sparse::{BscMatrix, BsrMatrix, Element, TileChunks};

use crate::config::encode_config::Layout;

/// Element types that can be written as little-endian safetensors payloads.
pub trait StorableElement: Element {
    const SAFETENSORS_DTYPE: Dtype;

    fn extend_le(values: &[Self], out: &mut Vec<u8>);
}

impl StorableElement for i8 {
    const SAFETENSORS_DTYPE: Dtype = Dtype::I8;

    fn extend_le(values: &[Self], out: &mut Vec<u8>) {
        out.extend(values.iter().map(|&v| v as u8));
    }
}

impl StorableElement for bf16 {
    const SAFETENSORS_DTYPE: Dtype = Dtype::BF16;

    fn extend_le(values: &[Self], out: &mut Vec<u8>) {
        out.extend(values.iter().flat_map(|v| v.to_le_bytes()));
    }
}

impl StorableElement for f32 {
    const SAFETENSORS_DTYPE: Dtype = Dtype::F32;

    fn extend_le(values: &[Self], out: &mut Vec<u8>) {
        out.extend(values.iter().flat_map(|v| v.to_le_bytes()));
    }
}

/// One flat array ready for serialization.
#[derive(Debug, Clone)]
pub struct EncodedTensor {
    pub name: String,
    pub dtype: Dtype,
    pub shape: Vec<usize>,
    pub bytes: Vec<u8>,
}

impl EncodedTensor {
    /// Index array stored as I64.
    pub fn indices(name: String, values: &[usize]) -> Self {
        let bytes = values.iter().flat_map(|&v| (v as i64).to_le_bytes()).collect();
        Self {
            name,
            dtype: Dtype::I64,
            shape: vec![values.len()],
            bytes,
        }
    }

    /// Block payload stored in its element dtype.
    pub fn payload<T: StorableElement>(name: String, values: &[T]) -> Self {
        let mut bytes = Vec::with_capacity(std::mem::size_of_val(values));
        T::extend_le(values, &mut bytes);
        Self {
            name,
            dtype: T::SAFETENSORS_DTYPE,
            shape: vec![values.len()],
            bytes,
        }
    }
}

impl View for &EncodedTensor {
    fn dtype(&self) -> Dtype {
        self.dtype
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn data(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.bytes)
    }

    fn data_len(&self) -> usize {
        self.bytes.len()
    }
}

/// Per-tensor statistics written to summary.json.
#[derive(Debug, Clone, Serialize)]
pub struct TensorSummary {
    pub name: String,
    pub layout: Layout,
    pub dtype: String,
    pub shape: [usize; 2],
    pub block: [usize; 2],
    /// Micro-row chunk count (1 for BSC)
    pub chunks: usize,
    /// Genuine nonzero blocks
    pub real_blocks: usize,
    /// Stored block slots including group padding
    pub stored_blocks: usize,
    pub density: f32,
    pub memory_bytes: usize,
}

/// Flatten every chunk of a tile encoding into `{name}.chunk{i}.*` arrays.
pub fn tile_chunk_arrays<T: StorableElement>(name: &str, chunks: &TileChunks<T>) -> Vec<EncodedTensor> {
    chunks
        .iter()
        .enumerate()
        .flat_map(|(i, chunk)| bsr_arrays(&format!("{}.chunk{}", name, i), chunk))
        .collect()
}

fn bsr_arrays<T: StorableElement>(prefix: &str, bsr: &BsrMatrix<T>) -> [EncodedTensor; 3] {
    [
        EncodedTensor::indices(format!("{}.row_ptr", prefix), bsr.row_ptr()),
        EncodedTensor::indices(format!("{}.col_indices", prefix), bsr.col_indices()),
        EncodedTensor::payload(format!("{}.data", prefix), bsr.data()),
    ]
}

/// Flatten a BSC encoding into `{name}.*` arrays.
pub fn bsc_arrays<T: StorableElement>(name: &str, bsc: &BscMatrix<T>) -> Vec<EncodedTensor> {
    vec![
        EncodedTensor::indices(format!("{}.col_ptr", name), bsc.col_ptr()),
        EncodedTensor::indices(format!("{}.row_indices", name), bsc.row_indices()),
        EncodedTensor::payload(format!("{}.data", name), bsc.data()),
    ]
}

/// Container-level metadata describing how each tensor was encoded.
pub fn container_metadata(summaries: &[TensorSummary], micro_rows: usize) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    metadata.insert("format".to_string(), "tile-sparse".to_string());
    metadata.insert("micro_rows".to_string(), micro_rows.to_string());

    for summary in summaries {
        let layout = match summary.layout {
            Layout::Tile => "tile",
            Layout::Bsc => "bsc",
        };
        metadata.insert(format!("{}.layout", summary.name), layout.to_string());
        metadata.insert(
            format!("{}.shape", summary.name),
            format!("{}x{}", summary.shape[0], summary.shape[1]),
        );
        metadata.insert(
            format!("{}.block", summary.name),
            format!("{}x{}", summary.block[0], summary.block[1]),
        );
        metadata.insert(format!("{}.chunks", summary.name), summary.chunks.to_string());
    }
    metadata
}

/// Write arrays to `encoded.safetensors` and statistics to `summary.json`.
pub fn write_output(
    output_dir: &Path,
    arrays: &[EncodedTensor],
    summaries: &[TensorSummary],
    micro_rows: usize,
) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let metadata = container_metadata(summaries, micro_rows);
    let tensor_path = output_dir.join("encoded.safetensors");
    safetensors::serialize_to_file(
        arrays.iter().map(|t| (t.name.as_str(), t)),
        &Some(metadata),
        &tensor_path,
    )
    .with_context(|| format!("Failed to write: {}", tensor_path.display()))?;

    let summary_path = output_dir.join("summary.json");
    fs::write(&summary_path, serde_json::to_string_pretty(summaries)?)
        .with_context(|| format!("Failed to write: {}", summary_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use safetensors::SafeTensors;
    use tempfile::TempDir;
    use tile_sparse::{to_bsc, BlockShape, DenseView};

    #[test]
    fn test_indices_are_i64_le() {
        let t = EncodedTensor::indices("x.row_ptr".to_string(), &[0, 2, 3]);
        assert_eq!(t.dtype, Dtype::I64);
        assert_eq!(t.shape, vec![3]);
        assert_eq!(t.bytes.len(), 24);
        assert_eq!(&t.bytes[8..16], &2i64.to_le_bytes());
    }

    #[test]
    fn test_payload_bf16_bytes() {
        let values = [bf16::from_f32(1.0), bf16::from_f32(-0.5)];
        let t = EncodedTensor::payload("x.data".to_string(), &values);
        assert_eq!(t.dtype, Dtype::BF16);
        assert_eq!(t.bytes.len(), 4);
        assert_eq!(&t.bytes[..2], &values[0].to_le_bytes());
    }

    #[test]
    fn test_tile_chunk_array_names() {
        let data = vec![1i8; 32 * 4];
        let view = DenseView::new(&data, (32, 4)).unwrap();
        let chunks = TileChunks::encode(view, 16).unwrap();

        let names: Vec<String> = tile_chunk_arrays("w", &chunks).into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "w.chunk0.row_ptr",
                "w.chunk0.col_indices",
                "w.chunk0.data",
                "w.chunk1.row_ptr",
                "w.chunk1.col_indices",
                "w.chunk1.data",
            ]
        );
    }

    #[test]
    fn test_write_output_readable() {
        let dir = TempDir::new().unwrap();
        let data = [1.0f32, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 2.0];
        let view = DenseView::new(&data, (2, 4)).unwrap();
        let bsc = to_bsc(view, BlockShape::new(1, 2)).unwrap();

        let arrays = bsc_arrays("w", &bsc);
        let summaries = vec![TensorSummary {
            name: "w".to_string(),
            layout: Layout::Bsc,
            dtype: "f32".to_string(),
            shape: [2, 4],
            block: [1, 2],
            chunks: 1,
            real_blocks: bsc.nnz_blocks(),
            stored_blocks: bsc.nnz_blocks(),
            density: bsc.density(),
            memory_bytes: bsc.memory_bytes(),
        }];
        write_output(dir.path(), &arrays, &summaries, 64).unwrap();

        let bytes = fs::read(dir.path().join("encoded.safetensors")).unwrap();
        let st = SafeTensors::deserialize(&bytes).unwrap();
        let col_ptr = st.tensor("w.col_ptr").unwrap();
        assert_eq!(col_ptr.dtype(), Dtype::I64);
        assert_eq!(col_ptr.shape(), &[3]);
        let payload = st.tensor("w.data").unwrap();
        assert_eq!(payload.dtype(), Dtype::F32);
        assert_eq!(payload.shape(), &[4]);

        let (_, header) = SafeTensors::read_metadata(&bytes).unwrap();
        let meta = header.metadata().as_ref().unwrap();
        assert_eq!(meta.get("w.layout").map(String::as_str), Some("bsc"));
        assert_eq!(meta.get("format").map(String::as_str), Some("tile-sparse"));

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("summary.json")).unwrap()).unwrap();
        assert_eq!(summary[0]["layout"], "bsc");
        assert_eq!(summary[0]["real_blocks"], 2);
    }
}
