//! 插值参数.

use crate::consts::DEFAULT_DISTANCE_IMAGE_VOLUME;

/// 插值流水线的全部可调参数.
///
/// 一般情况下宿主程序应使用 [`Self::from_voxel_spacing`], 以参考体数据的体素分辨率推导精简边界.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InterpolationConfig {
    /// 精简后相邻顶点的最小间距, 以毫米为单位.
    pub min_spacing: f64,

    /// 精简后相邻顶点的最大间距, 以毫米为单位. 同时决定法向采样偏移.
    pub max_spacing: f64,

    /// 距离场网格的体素预算 (体素个数上限).
    pub distance_image_volume: usize,

    /// 法向偏移距离 (采样与离面约束) 相对 `max_spacing` 的倍率.
    pub normal_offset_factor: f64,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            min_spacing: 0.5,
            max_spacing: 1.0,
            distance_image_volume: DEFAULT_DISTANCE_IMAGE_VOLUME,
            normal_offset_factor: 1.0,
        }
    }
}

impl InterpolationConfig {
    /// 以参考体数据的体素分辨率 `[x, y, z]` 创建参数:
    /// `min_spacing` 取最小分辨率, `max_spacing` 取最大分辨率.
    ///
    /// 如果分辨率中存在非正值或非有限值, 则返回 `None`.
    pub fn from_voxel_spacing(spacing: [f64; 3]) -> Option<Self> {
        if !spacing.iter().all(|s| s.is_finite() && *s > 0.0) {
            return None;
        }
        let min_spacing = spacing.iter().copied().fold(f64::INFINITY, f64::min);
        let max_spacing = spacing.iter().copied().fold(0.0, f64::max);
        Some(Self {
            min_spacing,
            max_spacing,
            ..Default::default()
        })
    }

    /// 法向偏移距离, 以毫米为单位.
    #[inline]
    pub fn normal_offset(&self) -> f64 {
        self.max_spacing * self.normal_offset_factor
    }
}

#[cfg(test)]
mod tests {
    use super::InterpolationConfig;

    #[test]
    fn test_from_voxel_spacing() {
        let c = InterpolationConfig::from_voxel_spacing([0.7, 0.7, 2.5]).unwrap();
        assert_eq!(c.min_spacing, 0.7);
        assert_eq!(c.max_spacing, 2.5);
        assert_eq!(c.distance_image_volume, 50_000);
        assert_eq!(c.normal_offset(), 2.5);

        assert!(InterpolationConfig::from_voxel_spacing([0.0, 1.0, 1.0]).is_none());
        assert!(InterpolationConfig::from_voxel_spacing([f64::NAN, 1.0, 1.0]).is_none());
    }
}
