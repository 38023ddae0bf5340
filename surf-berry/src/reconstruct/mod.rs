//! 有符号距离场重建.
//!
//! 对每个带法向的轮廓顶点 `p` (法向 `n`, 偏移 `d`) 施加三个约束:
//! `f(p) = 0`, `f(p + d n) = +d`, `f(p - d n) = -d`. 也即 label 内部为负, 外部为正.
//! 求解径向基插值函数后, 在覆盖全部约束点 (并裁剪到参考几何内) 的规则网格上求值.
//! 网格体素数不超过给定预算.

mod error;
mod rbf;

use std::collections::HashSet;

use log::{debug, warn};
use nalgebra::Matrix3;
use ndarray::Array3;

pub use error::{ReconstructError, ReconstructResult};
pub use rbf::RbfInterpolant;

use crate::consts::{COPLANAR_RATIO, DUPLICATE_EPS, GRID_PADDING_FACTOR, MIN_CONTOURS};
use crate::geometry::{add, centroid, scale, sub, Point3, VolumeGeometry};
use crate::normals::OrientedContour;
use crate::Idx3d;

/// 网格间距逐步放大的倍率, 用于把体素个数压到预算以内.
const GRID_GROWTH: f64 = 1.05;

/// 有符号距离体数据. 值按 `(z, h, w)` 组织, 内部为负, 外部为正.
#[derive(Clone, Debug)]
pub struct DistanceVolume {
    geometry: VolumeGeometry,
    data: Array3<f64>,
}

impl DistanceVolume {
    /// 由几何与数据直接创建. 如果形状不一致则返回 `None`.
    pub fn new(geometry: VolumeGeometry, data: Array3<f64>) -> Option<Self> {
        (geometry.shape() == data.dim()).then_some(Self { geometry, data })
    }

    /// 几何信息.
    #[inline]
    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    /// 距离值.
    #[inline]
    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    /// 某一体素的值. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, idx: Idx3d) -> Option<f64> {
        self.geometry.check(&idx).then(|| self.data[idx])
    }

    /// 世界坐标 `p` 所在 (最近) 体素的值. 越界时返回 `None`.
    #[inline]
    pub fn sample(&self, p: &Point3) -> Option<f64> {
        self.geometry.world_to_index(p).and_then(|idx| self.get(idx))
    }
}

/// 距离场重建器. 相同输入总是得到相同输出.
#[derive(Copy, Clone, Debug)]
pub struct SurfaceReconstructor {
    budget: usize,
    offset: f64,
}

impl SurfaceReconstructor {
    /// 初始化. `budget` 为网格体素个数上限, `offset` 为离面约束的法向偏移 (毫米).
    ///
    /// `offset` 必须为正的有限值, 否则返回 `None`.
    #[inline]
    pub fn new(budget: usize, offset: f64) -> Option<Self> {
        (offset.is_finite() && offset > 0.0).then_some(Self { budget, offset })
    }

    /// 重建距离场. 任何失败都以 `None` 表示, 并以 `warn` 级别记录原因.
    pub fn reconstruct(
        &self,
        contours: &[OrientedContour],
        reference: &VolumeGeometry,
    ) -> Option<DistanceVolume> {
        self.try_reconstruct(contours, reference)
            .map_err(|e| warn!("Reconstruction yields no result: {e}"))
            .ok()
    }

    /// 重建距离场, 返回失败原因.
    pub fn try_reconstruct(
        &self,
        contours: &[OrientedContour],
        reference: &VolumeGeometry,
    ) -> ReconstructResult<DistanceVolume> {
        let usable: Vec<&OrientedContour> = contours.iter().filter(|c| c.is_usable()).collect();
        if usable.len() < MIN_CONTOURS {
            return Err(ReconstructError::TooFewContours(usable.len()));
        }

        let (centers, values) = self.constraints(&usable);
        if is_coplanar(&centers) {
            return Err(ReconstructError::Degenerate);
        }
        let geometry = self.grid_geometry(&centers, reference)?;
        debug!(
            "Reconstructing from {} contours, {} constraints, grid {:?}",
            usable.len(),
            centers.len(),
            geometry.shape()
        );

        let rbf = RbfInterpolant::fit(centers, &values)?;
        let data = evaluate_grid(&rbf, &geometry);
        Ok(DistanceVolume { geometry, data })
    }

    /// 收集约束点与约束值. 重合的点只保留第一次出现的约束.
    fn constraints(&self, contours: &[&OrientedContour]) -> (Vec<Point3>, Vec<f64>) {
        let d = self.offset;
        let mut seen = HashSet::new();
        let mut centers = Vec::new();
        let mut values = Vec::new();

        let mut push = |p: Point3, v: f64| {
            let key = p.map(|c| (c / DUPLICATE_EPS).round() as i64);
            if seen.insert(key) {
                centers.push(p);
                values.push(v);
            }
        };
        for c in contours {
            for (p, n) in c.iter().filter(|(_, n)| **n != [0.0; 3]) {
                push(*p, 0.0);
                push(add(p, &scale(n, d)), d);
                push(add(p, &scale(n, -d)), -d);
            }
        }
        (centers, values)
    }

    /// 计算采样网格几何: 约束点包围盒外扩 `GRID_PADDING_FACTOR * offset`,
    /// 裁剪到参考几何范围内, 再在预算内选取尽量细的间距.
    fn grid_geometry(
        &self,
        centers: &[Point3],
        reference: &VolumeGeometry,
    ) -> ReconstructResult<VolumeGeometry> {
        let pad = GRID_PADDING_FACTOR * self.offset;
        let (ref_lo, ref_hi) = reference.bounds();
        let mut lo = [f64::INFINITY; 3];
        let mut hi = [f64::NEG_INFINITY; 3];
        for p in centers {
            for k in 0..3 {
                lo[k] = lo[k].min(p[k]);
                hi[k] = hi[k].max(p[k]);
            }
        }
        for k in 0..3 {
            lo[k] = (lo[k] - pad).max(ref_lo[k]);
            hi[k] = (hi[k] + pad).min(ref_hi[k]);
        }
        let extent = sub(&hi, &lo);
        if !extent.iter().all(|e| e.is_finite() && *e > 0.0) {
            return Err(ReconstructError::EmptyGrid);
        }
        if self.budget < 8 {
            return Err(ReconstructError::BudgetTooSmall(self.budget));
        }

        let dims_for = |h: f64| extent.map(|e| ((e / h).floor() as usize + 1).max(2));
        let mut h = (extent.iter().product::<f64>() / self.budget as f64).cbrt();
        let mut dims = dims_for(h);
        while dims.iter().product::<usize>() > self.budget {
            h *= GRID_GROWTH;
            dims = dims_for(h);
        }

        // 各轴间距略作调整, 使网格恰好覆盖整个范围.
        let spacing = [0, 1, 2].map(|k| extent[k] / (dims[k] - 1) as f64);
        let [dx, dy, dz] = dims;
        VolumeGeometry::new(lo, spacing, (dz, dy, dx)).map_err(|_| ReconstructError::EmptyGrid)
    }
}

/// 约束点是否 (近似) 共面: 协方差矩阵最小特征值相对最大特征值可以忽略.
fn is_coplanar(points: &[Point3]) -> bool {
    let Some(c) = centroid(points) else {
        return true;
    };
    let mut cov = Matrix3::<f64>::zeros();
    for p in points {
        let d = sub(p, &c);
        for i in 0..3 {
            for j in 0..3 {
                cov[(i, j)] += d[i] * d[j];
            }
        }
    }
    let eig = cov.symmetric_eigenvalues();
    let max = eig.max();
    max <= 0.0 || eig.min() <= max * COPLANAR_RATIO
}

/// 在网格每个体素中心求值.
fn evaluate_grid(rbf: &RbfInterpolant, geometry: &VolumeGeometry) -> Array3<f64> {
    let mut data = Array3::<f64>::zeros(geometry.shape());
    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            ndarray::Zip::indexed(&mut data)
                .par_for_each(|idx, v| *v = rbf.evaluate(&geometry.index_to_world(idx)));
        } else {
            ndarray::Zip::indexed(&mut data)
                .for_each(|idx, v| *v = rbf.evaluate(&geometry.index_to_world(idx)));
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::Contour;
    use crate::normals::NormalComputer;
    use crate::volume::ReferenceVolume;
    use std::f64::consts::PI;

    fn circle(r: f64, n: usize, z: f64) -> Contour {
        Contour::closed(
            (0..n)
                .map(|i| {
                    let t = 2.0 * PI * i as f64 / n as f64;
                    [10.0 + r * t.cos(), 10.0 + r * t.sin(), z]
                })
                .collect(),
        )
    }

    fn sphere() -> ReferenceVolume {
        let data = ndarray::Array3::<u8>::from_shape_fn((20, 20, 20), |(z, h, w)| {
            let d2 = [z, h, w]
                .iter()
                .map(|v| (*v as f64 - 10.0).powi(2))
                .sum::<f64>();
            u8::from(d2 <= 36.0)
        });
        ReferenceVolume::with_spacing(data, [1.0; 3]).unwrap()
    }

    fn oriented(contours: &[Contour], volume: &ReferenceVolume) -> Vec<OrientedContour> {
        NormalComputer::new(1.0).unwrap().compute(contours, &volume.label_mask(1))
    }

    #[test]
    fn test_two_parallel_circles() {
        let volume = sphere();
        let contours = oriented(&[circle(5.0, 24, 8.0), circle(5.0, 24, 12.0)], &volume);
        let rec = SurfaceReconstructor::new(8_000, 1.0).unwrap();
        let dv = rec.try_reconstruct(&contours, volume.geometry()).unwrap();

        let (z, h, w) = dv.geometry().shape();
        assert!(z * h * w <= 8_000);
        assert!(z >= 2 && h >= 2 && w >= 2);

        // 包围盒外扩后被裁剪到参考几何 [0, 19]^3 以内.
        let (lo, hi) = dv.geometry().bounds();
        assert!(lo.iter().all(|v| *v >= 0.0));
        assert!(hi.iter().all(|v| *v <= 19.0 + 1e-9));

        // 内部为负, 外部为正.
        assert!(dv.sample(&[10.0, 10.0, 10.0]).unwrap() < 0.0);
        assert!(dv.sample(&[10.0, 10.0, 8.0]).unwrap() < 0.0);
        assert!(dv.sample(&[17.0, 10.0, 8.0]).unwrap() > 0.0);

        assert_eq!(dv.get((0, 0, 0)), Some(dv.data()[(0, 0, 0)]));
        assert!(dv.get((z, 0, 0)).is_none());

        // 纯函数: 相同输入得到相同输出.
        let again = rec.try_reconstruct(&contours, volume.geometry()).unwrap();
        assert_eq!(dv.data(), again.data());
    }

    #[test]
    fn test_too_few_contours() {
        let volume = sphere();
        let rec = SurfaceReconstructor::new(8_000, 1.0).unwrap();

        let one = oriented(&[circle(5.0, 24, 8.0)], &volume);
        assert_eq!(
            rec.try_reconstruct(&one, volume.geometry()).unwrap_err(),
            ReconstructError::TooFewContours(1)
        );

        // 不可用的轮廓不计数.
        let with_tiny = oriented(
            &[circle(5.0, 24, 8.0), Contour::closed(vec![[1.0; 3], [2.0; 3]])],
            &volume,
        );
        assert!(rec.reconstruct(&with_tiny, volume.geometry()).is_none());
    }

    #[test]
    fn test_coplanar_contours_are_degenerate() {
        let volume = sphere();
        let a = circle(2.0, 16, 10.0);
        let b = Contour::closed(a.points().iter().map(|p| [p[0] + 1.0, p[1], p[2]]).collect());
        let contours = oriented(&[a, b], &volume);
        let rec = SurfaceReconstructor::new(8_000, 1.0).unwrap();
        assert_eq!(
            rec.try_reconstruct(&contours, volume.geometry()).unwrap_err(),
            ReconstructError::Degenerate
        );
    }

    #[test]
    fn test_invalid_offset() {
        assert!(SurfaceReconstructor::new(8_000, 0.0).is_none());
        assert!(SurfaceReconstructor::new(8_000, -1.0).is_none());
        assert!(SurfaceReconstructor::new(8_000, f64::NAN).is_none());
    }

    #[test]
    fn test_budget_too_small() {
        let volume = sphere();
        let contours = oriented(&[circle(5.0, 24, 8.0), circle(5.0, 24, 12.0)], &volume);
        let rec = SurfaceReconstructor::new(7, 1.0).unwrap();
        assert_eq!(
            rec.try_reconstruct(&contours, volume.geometry()).unwrap_err(),
            ReconstructError::BudgetTooSmall(7)
        );
    }

    #[test]
    fn test_outside_reference_is_empty_grid() {
        let volume = sphere();
        let far = [circle(5.0, 24, 8.0), circle(5.0, 24, 12.0)]
            .map(|c| Contour::closed(c.points().iter().map(|p| add(p, &[100.0; 3])).collect()));
        let contours = oriented(&far, &volume);
        let rec = SurfaceReconstructor::new(8_000, 1.0).unwrap();
        assert_eq!(
            rec.try_reconstruct(&contours, volume.geometry()).unwrap_err(),
            ReconstructError::EmptyGrid
        );
    }
}
