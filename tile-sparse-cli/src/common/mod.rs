//! Common utilities shared between the encode and inspect commands.

pub mod runtime;

use anyhow::{Context, Result};
use half::bf16;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tile_sparse::{AnyDenseView, DenseView, ElementType};

/// Discover safetensor files from a path (file or directory).
pub fn discover_safetensor_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        match path.extension().and_then(|s| s.to_str()) {
            Some("safetensors") => Ok(vec![path.to_path_buf()]),
            _ => anyhow::bail!("Expected .safetensors file, got: {}", path.display()),
        }
    } else if path.is_dir() {
        let mut files: Vec<PathBuf> = fs::read_dir(path)
            .with_context(|| format!("Failed to read directory: {}", path.display()))?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("safetensors"))
            .collect();

        if files.is_empty() {
            anyhow::bail!("No .safetensors files found in: {}", path.display());
        }
        files.sort_unstable();
        Ok(files)
    } else {
        anyhow::bail!("Path does not exist: {}", path.display())
    }
}

/// Load a JSON config file, requiring it to exist.
pub fn load_config<T: DeserializeOwned>(config_path: Option<&str>, config_name: &str) -> Result<T> {
    let path = config_path.ok_or_else(|| {
        anyhow::anyhow!("--config is required. Use --generate-config to create {}", config_name)
    })?;

    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path))?;

    serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse config: {}", path))
}

/// Map a safetensors dtype onto an encodable element type.
pub fn element_type(dtype: safetensors::Dtype) -> Option<ElementType> {
    use safetensors::Dtype;

    match dtype {
        Dtype::I8 => Some(ElementType::I8),
        Dtype::BF16 => Some(ElementType::Bf16),
        Dtype::F32 => Some(ElementType::F32),
        _ => None,
    }
}

/// Row-major tensor contents decoded from safetensors bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum DenseTensor {
    I8(Vec<i8>),
    Bf16(Vec<bf16>),
    F32(Vec<f32>),
}

impl DenseTensor {
    pub fn element_type(&self) -> ElementType {
        match self {
            Self::I8(_) => ElementType::I8,
            Self::Bf16(_) => ElementType::Bf16,
            Self::F32(_) => ElementType::F32,
        }
    }

    /// Borrow as a typed view of the given shape.
    pub fn view(&self, shape: (usize, usize)) -> Result<AnyDenseView<'_>> {
        let view = match self {
            Self::I8(data) => DenseView::new(data, shape)?.into(),
            Self::Bf16(data) => DenseView::new(data, shape)?.into(),
            Self::F32(data) => DenseView::new(data, shape)?.into(),
        };
        Ok(view)
    }
}

/// Decode little-endian tensor bytes into owned elements.
pub fn bytes_to_dense(data: &[u8], dtype: safetensors::Dtype, count: usize) -> Result<DenseTensor> {
    use safetensors::Dtype;

    let width = match dtype {
        Dtype::I8 => 1,
        Dtype::BF16 => 2,
        Dtype::F32 => 4,
        _ => anyhow::bail!("Unsupported dtype: {:?}. Only I8, BF16, F32 supported.", dtype),
    };
    let expected = count
        .checked_mul(width)
        .ok_or_else(|| anyhow::anyhow!("{:?} tensor of {} elements is too large", dtype, count))?;
    if data.len() != expected {
        anyhow::bail!("{:?} size mismatch: expected {} bytes, got {}", dtype, expected, data.len());
    }

    let tensor = match dtype {
        Dtype::I8 => DenseTensor::I8(data.iter().map(|&b| b as i8).collect()),
        Dtype::BF16 => DenseTensor::Bf16(
            data.chunks_exact(2)
                .map(|c| bf16::from_le_bytes([c[0], c[1]]))
                .collect(),
        ),
        _ => DenseTensor::F32(
            data.chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
    };
    Ok(tensor)
}

/// Shape of a safetensors tensor as (rows, cols), or None when it is not 2-D.
pub fn matrix_shape(shape: &[usize]) -> Option<(usize, usize)> {
    match shape {
        [rows, cols] => Some((*rows, *cols)),
        _ => None,
    }
}

/// Number of elements in a (rows, cols) matrix, rejecting overflow.
pub fn element_count((rows, cols): (usize, usize)) -> Result<usize> {
    rows.checked_mul(cols)
        .ok_or_else(|| anyhow::anyhow!("Tensor shape {}x{} is too large", rows, cols))
}
