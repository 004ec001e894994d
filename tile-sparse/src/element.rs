//! Scalar element types accepted by the encoders.

use half::bf16;
use std::fmt;

/// Row width of one hardware tile, in bytes.
pub const TILE_WIDTH_BYTES: usize = 64;

/// Element type identifier.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum ElementType {
    /// 8-bit signed integer
    I8,
    /// 16-bit brain float
    Bf16,
    /// 32-bit IEEE float
    F32,
}

impl ElementType {
    /// Size of one element in bytes.
    pub fn size_bytes(&self) -> usize {
        match self {
            Self::I8 => 1,
            Self::Bf16 => 2,
            Self::F32 => 4,
        }
    }

    /// Number of block-columns that fill one tile row, if this type can be tiled.
    ///
    /// 32-bit floats only travel the ungrouped BSC path.
    pub fn tile_group(&self) -> Option<usize> {
        match self {
            Self::I8 | Self::Bf16 => Some(TILE_WIDTH_BYTES / self.size_bytes()),
            Self::F32 => None,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::I8 => "i8",
            Self::Bf16 => "bf16",
            Self::F32 => "f32",
        };
        f.write_str(name)
    }
}

/// Scalar that can be stored in a block-sparse structure.
pub trait Element: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Runtime tag for this type.
    const DTYPE: ElementType;

    /// Exact numeric comparison against zero.
    fn is_zero(&self) -> bool;
}

impl Element for i8 {
    const DTYPE: ElementType = ElementType::I8;

    #[inline]
    fn is_zero(&self) -> bool {
        *self == 0
    }
}

impl Element for bf16 {
    const DTYPE: ElementType = ElementType::Bf16;

    // IEEE comparison: -0.0 is zero, NaN is not.
    #[inline]
    fn is_zero(&self) -> bool {
        *self == bf16::ZERO
    }
}

impl Element for f32 {
    const DTYPE: ElementType = ElementType::F32;

    #[inline]
    fn is_zero(&self) -> bool {
        *self == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_groups() {
        assert_eq!(ElementType::I8.tile_group(), Some(64));
        assert_eq!(ElementType::Bf16.tile_group(), Some(32));
        assert_eq!(ElementType::F32.tile_group(), None);
    }

    #[test]
    fn test_is_zero() {
        assert!(0i8.is_zero());
        assert!(!(-1i8).is_zero());
        assert!(bf16::ZERO.is_zero());
        assert!(bf16::NEG_ZERO.is_zero());
        assert!(!bf16::NAN.is_zero());
        assert!(!bf16::from_f32(1e-3).is_zero());
        assert!((-0.0f32).is_zero());
        assert!(!f32::MIN_POSITIVE.is_zero());
    }

    #[test]
    fn test_display() {
        assert_eq!(ElementType::Bf16.to_string(), "bf16");
        assert_eq!(<i8 as Element>::DTYPE, ElementType::I8);
    }
}
