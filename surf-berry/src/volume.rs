//! 参考标签体数据.
//!
//! 体素标量类型在数据进入时以 [`VoxelData`] 封闭枚举固定下来. 每次插值只在构建
//! [`LabelMask`] 时分派一次, 之后的采样全部在 `bool` 掩膜上完成.

use ndarray::{Array3, ArrayView, Ix3};
use num::ToPrimitive;
use thiserror::Error;

use crate::geometry::{Point3, VolumeGeometry};
use crate::{Idx3d, Label};

/// 创建体数据几何或参考体数据时的错误.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VolumeError {
    /// 体素分辨率存在非正值或非有限值.
    #[error("invalid voxel spacing {0:?}")]
    InvalidSpacing([f64; 3]),

    /// 形状某一维为 0.
    #[error("empty volume shape {0:?}")]
    EmptyShape(Idx3d),

    /// 体素数据形状与几何描述不一致.
    #[error("voxel data shape {found:?} does not match geometry shape {expected:?}")]
    ShapeMismatch {
        /// 几何描述中的形状.
        expected: Idx3d,
        /// 体素数据的实际形状.
        found: Idx3d,
    },
}

/// 支持的体素标量类型. 数据按 `(z, h, w)` 组织.
#[derive(Debug, Clone)]
pub enum VoxelData {
    /// 8 位无符号标签.
    U8(Array3<u8>),

    /// 16 位无符号标签.
    U16(Array3<u16>),

    /// 16 位有符号标签.
    I16(Array3<i16>),

    /// 32 位有符号标签.
    I32(Array3<i32>),
}

macro_rules! impl_from_array {
    ($($t: ty => $variant: ident),* $(,)?) => {
        $(
            impl From<Array3<$t>> for VoxelData {
                #[inline]
                fn from(data: Array3<$t>) -> Self {
                    Self::$variant(data)
                }
            }
        )*
    };
}

impl_from_array!(u8 => U8, u16 => U16, i16 => I16, i32 => I32);

/// 收集值为 `label` 的体素掩膜.
fn mask_of<T: ToPrimitive + Copy>(data: ArrayView<'_, T, Ix3>, label: Label) -> Array3<bool> {
    let label = i64::from(label);
    data.mapv(|v| v.to_i64() == Some(label))
}

/// 统计值为 `label` 的体素个数.
fn count_of<T: ToPrimitive + Copy>(data: ArrayView<'_, T, Ix3>, label: Label) -> usize {
    let label = i64::from(label);
    data.iter().filter(|v| v.to_i64() == Some(label)).count()
}

impl VoxelData {
    /// 数据形状 `(z, h, w)`.
    pub fn shape(&self) -> Idx3d {
        match self {
            Self::U8(a) => a.dim(),
            Self::U16(a) => a.dim(),
            Self::I16(a) => a.dim(),
            Self::I32(a) => a.dim(),
        }
    }

    /// 构建值为 `label` 的体素掩膜.
    fn mask(&self, label: Label) -> Array3<bool> {
        match self {
            Self::U8(a) => mask_of(a.view(), label),
            Self::U16(a) => mask_of(a.view(), label),
            Self::I16(a) => mask_of(a.view(), label),
            Self::I32(a) => mask_of(a.view(), label),
        }
    }

    /// 值为 `label` 的体素个数.
    fn count(&self, label: Label) -> usize {
        match self {
            Self::U8(a) => count_of(a.view(), label),
            Self::U16(a) => count_of(a.view(), label),
            Self::I16(a) => count_of(a.view(), label),
            Self::I32(a) => count_of(a.view(), label),
        }
    }
}

/// 宿主程序提供的分割体数据 (只读), 包括体素标签和几何信息.
#[derive(Debug, Clone)]
pub struct ReferenceVolume {
    geometry: VolumeGeometry,
    data: VoxelData,
}

impl ReferenceVolume {
    /// 创建参考体数据. 若 `data` 形状与 `geometry` 不一致, 则返回 `Err`.
    pub fn new(geometry: VolumeGeometry, data: impl Into<VoxelData>) -> Result<Self, VolumeError> {
        let data = data.into();
        if data.shape() != geometry.shape() {
            return Err(VolumeError::ShapeMismatch {
                expected: geometry.shape(),
                found: data.shape(),
            });
        }
        Ok(Self { geometry, data })
    }

    /// 以原点 `(0, 0, 0)` 和给定分辨率 `[x, y, z]` 直接从体素数据创建.
    pub fn with_spacing(data: impl Into<VoxelData>, spacing: [f64; 3]) -> Result<Self, VolumeError> {
        let data = data.into();
        let geometry = VolumeGeometry::new([0.0; 3], spacing, data.shape())?;
        Ok(Self { geometry, data })
    }

    /// 几何信息.
    #[inline]
    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    /// 体素数据.
    #[inline]
    pub fn data(&self) -> &VoxelData {
        &self.data
    }

    /// 值为 `label` 的体素个数.
    #[inline]
    pub fn count(&self, label: Label) -> usize {
        self.data.count(label)
    }

    /// 构建 `label` 的体素掩膜.
    pub fn label_mask(&self, label: Label) -> LabelMask {
        LabelMask {
            geometry: self.geometry,
            data: self.data.mask(label),
        }
    }
}

/// 单个 label 的体素掩膜, 附带几何信息以支持按世界坐标采样.
#[derive(Debug, Clone)]
pub struct LabelMask {
    geometry: VolumeGeometry,
    data: Array3<bool>,
}

impl LabelMask {
    /// 几何信息.
    #[inline]
    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    /// 世界坐标 `p` 所在体素是否属于该 label. 越界时返回 `None`.
    #[inline]
    pub fn contains(&self, p: &Point3) -> Option<bool> {
        self.geometry.world_to_index(p).map(|idx| self.data[idx])
    }

    /// 掩膜中是否一个前景体素都没有.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|v| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_dispatch_variants() {
        let mut a = Array3::<u8>::zeros((2, 3, 4));
        a[(1, 2, 3)] = 7;
        let v = ReferenceVolume::with_spacing(a, [1.0; 3]).unwrap();
        assert_eq!(v.count(7), 1);
        let m = v.label_mask(7);
        assert_eq!(m.contains(&[3.0, 2.0, 1.0]), Some(true));
        assert_eq!(m.contains(&[0.0, 0.0, 0.0]), Some(false));
        assert_eq!(m.contains(&[9.0, 0.0, 0.0]), None);

        let mut b = Array3::<i32>::zeros((2, 2, 2));
        b[(0, 0, 0)] = 70_000;
        let v = ReferenceVolume::with_spacing(b, [1.0; 3]).unwrap();
        assert_eq!(v.count(70_000), 1);
        assert!(!v.label_mask(70_000).is_empty());
        assert!(v.label_mask(1).is_empty());

        // 负值永远不会匹配任何 label.
        let c = Array3::<i16>::from_elem((1, 1, 1), -1);
        let v = ReferenceVolume::with_spacing(c, [1.0; 3]).unwrap();
        assert_eq!(v.count(u32::MAX), 0);
    }

    #[test]
    fn test_shape_mismatch() {
        let g = VolumeGeometry::new([0.0; 3], [1.0; 3], (2, 2, 2)).unwrap();
        let e = ReferenceVolume::new(g, Array3::<u16>::zeros((2, 2, 3))).unwrap_err();
        assert_eq!(
            e,
            VolumeError::ShapeMismatch {
                expected: (2, 2, 2),
                found: (2, 2, 3)
            }
        );
    }
}
