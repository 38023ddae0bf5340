//! 轮廓顶点法向.
//!
//! 每个顶点的法向位于轮廓所在平面内, 由 "切向 × 平面法向" 得到. 平面法向以 Newell
//! 方法计算, 它总是与顶点绕向一致, 因此初始法向总是几何意义上指向多边形外侧.
//!
//! 随后以参考标签掩膜投票确定每条轮廓的最终朝向: 在 `p ± offset * n` 两处采样,
//! 正确的朝向应当是 "内侧为该 label, 外侧不是". 所有轮廓都以同一掩膜为准,
//! 因此同一 label 的轮廓之间不会出现相互矛盾的朝向. 掩膜提供不了任何信息时
//! (轮廓完全落在 label 内部或外部), 保留绕向推导出的朝向: 结果任意但稳定.

use itertools::izip;

use crate::consts::MIN_CONTOUR_POINTS;
use crate::contour::Contour;
use crate::geometry::{add, centroid, cross, newell_normal, normalize, scale, sub, Point3, Vec3};
use crate::volume::LabelMask;

/// 带逐顶点法向的轮廓.
#[derive(Clone, Debug, PartialEq)]
pub struct OrientedContour {
    points: Vec<Point3>,
    normals: Vec<Vec3>,
}

impl OrientedContour {
    /// 顶点.
    #[inline]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// 逐顶点单位法向. 无法确定法向的顶点为零向量.
    #[inline]
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    /// 依次获取 (顶点, 法向) 对.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&Point3, &Vec3)> + '_ {
        self.points.iter().zip(self.normals.iter())
    }

    /// 是否能参与重建: 顶点足够, 且至少有一个有效法向.
    pub fn is_usable(&self) -> bool {
        self.points.len() >= MIN_CONTOUR_POINTS && self.normals.iter().any(|n| *n != [0.0; 3])
    }

    /// 法向全部置零的轮廓 (不可用).
    fn unusable(contour: &Contour) -> Self {
        Self {
            points: contour.points().to_vec(),
            normals: vec![[0.0; 3]; contour.len()],
        }
    }
}

/// 法向计算器.
#[derive(Copy, Clone, Debug)]
pub struct NormalComputer {
    offset: f64,
}

impl NormalComputer {
    /// 初始化. `offset` 为采样点到顶点的距离 (毫米), 通常取最大间距.
    /// 不是正的有限值时返回 `None`.
    #[inline]
    pub fn new(offset: f64) -> Option<Self> {
        (offset.is_finite() && offset > 0.0).then_some(Self { offset })
    }

    /// 为每条轮廓计算法向. 第 `i` 个输出对应第 `i` 个输入.
    pub fn compute<'a, I>(&self, contours: I, mask: &LabelMask) -> Vec<OrientedContour>
    where
        I: IntoIterator<Item = &'a Contour>,
    {
        contours
            .into_iter()
            .map(|c| self.compute_one(c, mask))
            .collect()
    }

    /// 为单条轮廓计算法向.
    pub fn compute_one(&self, contour: &Contour, mask: &LabelMask) -> OrientedContour {
        if contour.len() < MIN_CONTOUR_POINTS {
            return OrientedContour::unusable(contour);
        }
        let Some(plane_normal) = normalize(&newell_normal(contour.points())) else {
            // 顶点共线, 不存在平面.
            return OrientedContour::unusable(contour);
        };

        let mut normals = winding_normals(contour, &plane_normal);
        if self.vote(contour.points(), &normals, mask) < 0 {
            normals.iter_mut().for_each(|n| *n = scale(n, -1.0));
        }
        OrientedContour {
            points: contour.points().to_vec(),
            normals,
        }
    }

    /// 朝向投票. 正数表示当前朝向正确, 负数表示应当翻转, 0 表示没有信息.
    fn vote(&self, points: &[Point3], normals: &[Vec3], mask: &LabelMask) -> i64 {
        izip!(points, normals)
            .filter(|(_, n)| **n != [0.0; 3])
            .map(|(p, n)| {
                let outer = mask.contains(&add(p, &scale(n, self.offset)));
                let inner = mask.contains(&add(p, &scale(n, -self.offset)));
                match (inner, outer) {
                    (Some(true), Some(false) | None) => 1,
                    (Some(false) | None, Some(true)) => -1,
                    _ => 0,
                }
            })
            .sum()
    }
}

/// 由绕向得到的几何外侧法向.
fn winding_normals(contour: &Contour, plane_normal: &Vec3) -> Vec<Vec3> {
    let points = contour.points();
    let n = points.len();
    let center = centroid(points).unwrap_or([0.0; 3]);

    let mut normals = Vec::with_capacity(n);
    for i in 0..n {
        let (prev, next) = match (contour.is_closed(), i) {
            (false, 0) => (&points[0], &points[1]),
            (false, i) if i == n - 1 => (&points[i - 1], &points[i]),
            _ => (&points[(i + n - 1) % n], &points[(i + 1) % n]),
        };
        let normal = normalize(&sub(next, prev))
            .and_then(|t| normalize(&cross(&t, plane_normal)))
            // 切向退化时, 退回到质心指向顶点的方向 (投影到平面内).
            .or_else(|| {
                let radial = sub(&points[i], &center);
                let along = crate::geometry::dot(&radial, plane_normal);
                normalize(&sub(&radial, &scale(plane_normal, along)))
            })
            .unwrap_or([0.0; 3]);
        normals.push(normal);
    }
    normals
}
