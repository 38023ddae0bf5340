//! 合成体数据: 轴对齐椭球 label, 以及它在轴向切面上的截面轮廓.

use std::env;
use std::f64::consts::PI;

use ndarray::Array3;
use surf_berry::prelude::*;

/// 椭球体模.
#[derive(Copy, Clone, Debug)]
pub struct Ellipsoid {
    /// 体数据形状 `(z, h, w)`.
    pub shape: Idx3d,

    /// 体素分辨率 `[x, y, z]`.
    pub spacing: [f64; 3],

    /// 椭球中心 (世界坐标).
    pub center: Point3,

    /// 三个半轴长 `[x, y, z]`, 以毫米为单位.
    pub radii: [f64; 3],

    /// 椭球内部体素的标签值.
    pub label: Label,
}

impl Ellipsoid {
    /// 以 `(2r + 8)^3` 体数据为背景, 中心位于体数据中心的球.
    pub fn sphere(radius: f64) -> Self {
        let len = (2.0 * radius).ceil() as usize + 8;
        let c = (len - 1) as f64 / 2.0;
        Self {
            shape: (len, len, len),
            spacing: [1.0; 3],
            center: [c; 3],
            radii: [radius; 3],
            label: 1,
        }
    }

    /// 世界坐标 `p` 是否位于椭球内 (含边界).
    pub fn contains(&self, p: &Point3) -> bool {
        (0..3)
            .map(|k| ((p[k] - self.center[k]) / self.radii[k]).powi(2))
            .sum::<f64>()
            <= 1.0
    }

    /// 生成参考体数据.
    pub fn volume(&self) -> ReferenceVolume {
        let geometry = VolumeGeometry::new([0.0; 3], self.spacing, self.shape)
            .expect("Invalid phantom geometry");
        let label = self.label as u8;
        let data = Array3::<u8>::from_shape_fn(self.shape, |idx| {
            if self.contains(&geometry.index_to_world(idx)) {
                label
            } else {
                0
            }
        });
        ReferenceVolume::new(geometry, data).expect("Phantom shape mismatch")
    }

    /// 世界坐标 `z` 处的轴向截面轮廓, 共 `n` 个顶点. 不与椭球相交时返回 `None`.
    pub fn section(&self, z: f64, n: usize) -> Option<Contour> {
        let dz = (z - self.center[2]) / self.radii[2];
        let k = 1.0 - dz * dz;
        if k <= 0.0 {
            return None;
        }
        let (a, b) = (self.radii[0] * k.sqrt(), self.radii[1] * k.sqrt());
        let points = (0..n)
            .map(|i| {
                let t = 2.0 * PI * i as f64 / n as f64;
                [self.center[0] + a * t.cos(), self.center[1] + b * t.sin(), z]
            })
            .collect();
        Some(Contour::closed(points))
    }

    /// `z` 处的轴向切面标识.
    pub fn axial_plane(&self, z: f64) -> PlaneGeometry {
        let (_, h, w) = self.shape;
        PlaneGeometry::new(
            AffineTransform::translation([0.0, 0.0, z]),
            (w as u32, h as u32),
            self.spacing,
            (z / self.spacing[2]).round() as u32,
        )
    }

    /// 沿 z 轴均匀分布的 `count` 个截面, 不含椭球两极.
    pub fn sections(&self, count: usize, n: usize) -> Vec<(Contour, PlaneGeometry)> {
        let rz = self.radii[2];
        (1..=count)
            .map(|i| self.center[2] - rz + 2.0 * rz * i as f64 / (count + 1) as f64)
            .filter_map(|z| self.section(z, n).map(|c| (c, self.axial_plane(z))))
            .collect()
    }
}

/// 从 `$SURF_PHANTOM_RADIUS` 读取球体模半径, 未设置或非法时使用 `default`.
pub fn radius_from_env_or(default: f64) -> f64 {
    env::var("SURF_PHANTOM_RADIUS")
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|r| r.is_finite() && *r > 0.0)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use surf_berry::geometry::distance;

    #[test]
    fn test_sphere_sections() {
        let s = Ellipsoid::sphere(6.0);
        assert_eq!(s.shape, (20, 20, 20));
        let volume = s.volume();
        assert!(volume.count(1) > 0);

        let sections = s.sections(3, 24);
        assert_eq!(sections.len(), 3);
        for (c, plane) in sections.iter() {
            let z = c.points()[0][2];
            assert!(c
                .points()
                .iter()
                .all(|p| (distance(p, &s.center) - 6.0).abs() < 1e-9 && p[2] == z));
            assert_eq!(plane.transform.offset, [0.0, 0.0, z]);
        }
        assert!(s.section(s.center[2] + 7.0, 24).is_none());
    }
}
