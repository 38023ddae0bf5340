//! 几何基础类型.
//!
//! 世界坐标以 `[x, y, z]` 表示 (毫米). 体数据索引沿用 `(z, h, w)`,
//! 其中 `h` 对应 `y`, `w` 对应 `x`.

use crate::consts::PLANE_TOLERANCE;
use crate::Idx3d;

/// 世界坐标系下的点.
pub type Point3 = [f64; 3];

/// 世界坐标系下的向量.
pub type Vec3 = [f64; 3];

/// `a - b`.
#[inline]
pub fn sub(a: &Point3, b: &Point3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// `a + b`.
#[inline]
pub fn add(a: &Point3, b: &Vec3) -> Point3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

/// `k * v`.
#[inline]
pub fn scale(v: &Vec3, k: f64) -> Vec3 {
    [v[0] * k, v[1] * k, v[2] * k]
}

/// 点积.
#[inline]
pub fn dot(a: &Vec3, b: &Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// 叉积.
#[inline]
pub fn cross(a: &Vec3, b: &Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// 向量的模.
#[inline]
pub fn norm(v: &Vec3) -> f64 {
    dot(v, v).sqrt()
}

/// 两点欧氏距离.
#[inline]
pub fn distance(a: &Point3, b: &Point3) -> f64 {
    norm(&sub(a, b))
}

/// 单位化. 零向量 (或含非有限分量) 返回 `None`.
#[inline]
pub fn normalize(v: &Vec3) -> Option<Vec3> {
    let n = norm(v);
    (n.is_finite() && n > f64::EPSILON).then(|| scale(v, 1.0 / n))
}

/// 线性插值 `a + t * (b - a)`.
#[inline]
pub fn lerp(a: &Point3, b: &Point3, t: f64) -> Point3 {
    add(a, &scale(&sub(b, a), t))
}

/// 点 `p` 到线段 `ab` 的距离. 线段退化为点时返回到该点的距离.
pub fn point_segment_distance(p: &Point3, a: &Point3, b: &Point3) -> f64 {
    let ab = sub(b, a);
    let len2 = dot(&ab, &ab);
    if len2 <= f64::EPSILON {
        return distance(p, a);
    }
    let t = num::clamp(dot(&sub(p, a), &ab) / len2, 0.0, 1.0);
    distance(p, &lerp(a, b, t))
}

/// 点集质心. 空点集返回 `None`.
pub fn centroid<'a, I: IntoIterator<Item = &'a Point3>>(it: I) -> Option<Point3> {
    let mut count = 0usize;
    let mut acc = [0.0; 3];
    for p in it {
        count += 1;
        acc = add(&acc, p);
    }
    (count != 0).then(|| scale(&acc, 1.0 / count as f64))
}

/// 以 Newell 方法计算闭合多边形的 (未单位化) 法向.
///
/// 方向遵循右手定则: 从法向看去, 多边形顶点逆时针排列.
pub fn newell_normal(points: &[Point3]) -> Vec3 {
    let mut n = [0.0; 3];
    for (i, cur) in points.iter().enumerate() {
        let next = &points[(i + 1) % points.len()];
        n[0] += (cur[1] - next[1]) * (cur[2] + next[2]);
        n[1] += (cur[2] - next[2]) * (cur[0] + next[0]);
        n[2] += (cur[0] - next[0]) * (cur[1] + next[1]);
    }
    n
}

/// 三维仿射变换 (旋转 + 缩放矩阵, 以及偏移).
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AffineTransform {
    /// 行优先 3x3 矩阵.
    pub matrix: [[f64; 3]; 3],

    /// 偏移向量.
    pub offset: Vec3,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform {
    /// 创建变换.
    #[inline]
    pub const fn new(matrix: [[f64; 3]; 3], offset: Vec3) -> Self {
        Self { matrix, offset }
    }

    /// 单位变换.
    #[inline]
    pub const fn identity() -> Self {
        Self::new([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]], [0.0; 3])
    }

    /// 单位矩阵 + 给定偏移.
    #[inline]
    pub const fn translation(offset: Vec3) -> Self {
        Self::new(Self::identity().matrix, offset)
    }

    /// 矩阵与偏移是否逐分量相差都小于 `tol`.
    pub fn approx_eq(&self, other: &Self, tol: f64) -> bool {
        let matrix_eq = self
            .matrix
            .iter()
            .flatten()
            .zip(other.matrix.iter().flatten())
            .all(|(a, b)| (a - b).abs() < tol);
        let offset_eq = self
            .offset
            .iter()
            .zip(other.offset.iter())
            .all(|(a, b)| (a - b).abs() < tol);
        matrix_eq && offset_eq
    }
}

/// 斜切面标识: 轮廓是在哪一个切面上勾画的.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlaneGeometry {
    /// 切面索引坐标到世界坐标的变换.
    pub transform: AffineTransform,

    /// 切面宽度 (像素).
    pub width: u32,

    /// 切面高度 (像素).
    pub height: u32,

    /// 像素分辨率 `[x, y, z]`, 以毫米为单位.
    pub spacing: [f64; 3],

    /// 切片索引.
    pub slice_index: u32,
}

impl PlaneGeometry {
    /// 创建切面标识.
    #[inline]
    pub fn new(
        transform: AffineTransform,
        (width, height): (u32, u32),
        spacing: [f64; 3],
        slice_index: u32,
    ) -> Self {
        Self {
            transform,
            width,
            height,
            spacing,
            slice_index,
        }
    }

    /// 两个切面标识是否指向同一切面.
    ///
    /// 判定条件: 切片索引相同, 且变换矩阵与偏移逐分量相差都小于 [`PLANE_TOLERANCE`].
    /// 尺寸与分辨率不参与判定.
    #[inline]
    pub fn is_same_plane(&self, other: &Self) -> bool {
        self.slice_index == other.slice_index
            && self.transform.approx_eq(&other.transform, PLANE_TOLERANCE)
    }
}

/// 轴对齐的规则体数据几何: 原点 + 分辨率 + 形状.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VolumeGeometry {
    origin: Point3,
    spacing: [f64; 3],
    shape: Idx3d,
}

impl VolumeGeometry {
    /// 创建几何. `origin` 为索引 `(0, 0, 0)` 体素中心的世界坐标,
    /// `spacing` 按 `[x, y, z]` 给出, `shape` 按 `(z, h, w)` 给出.
    ///
    /// 如果分辨率存在非正值或非有限值, 或者形状某一维为 0, 则返回 `Err`.
    pub fn new(
        origin: Point3,
        spacing: [f64; 3],
        shape: Idx3d,
    ) -> Result<Self, crate::VolumeError> {
        if !spacing.iter().all(|s| s.is_finite() && *s > 0.0) {
            return Err(crate::VolumeError::InvalidSpacing(spacing));
        }
        if shape.0 == 0 || shape.1 == 0 || shape.2 == 0 {
            return Err(crate::VolumeError::EmptyShape(shape));
        }
        Ok(Self {
            origin,
            spacing,
            shape,
        })
    }

    /// 原点.
    #[inline]
    pub fn origin(&self) -> Point3 {
        self.origin
    }

    /// 体素分辨率 `[x, y, z]`.
    #[inline]
    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    /// 形状 `(z, h, w)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.shape
    }

    /// 体素个数.
    #[inline]
    pub fn size(&self) -> usize {
        let (z, h, w) = self.shape;
        z * h * w
    }

    /// 检查索引是否合法.
    #[inline]
    pub fn check(&self, (z0, h0, w0): &Idx3d) -> bool {
        let (z, h, w) = self.shape;
        *z0 < z && *h0 < h && *w0 < w
    }

    /// 体素中心的世界坐标. 不检查越界.
    #[inline]
    pub fn index_to_world(&self, (z, h, w): Idx3d) -> Point3 {
        let [ox, oy, oz] = self.origin;
        let [sx, sy, sz] = self.spacing;
        [
            ox + w as f64 * sx,
            oy + h as f64 * sy,
            oz + z as f64 * sz,
        ]
    }

    /// 包含世界坐标 `p` 的体素索引 (最近体素中心). 越界时返回 `None`.
    pub fn world_to_index(&self, p: &Point3) -> Option<Idx3d> {
        let (z, h, w) = self.shape;
        let axis = |i: usize, len: usize| {
            let f = ((p[i] - self.origin[i]) / self.spacing[i]).round();
            (f.is_finite() && f >= 0.0 && f < len as f64).then_some(f as usize)
        };
        Some((axis(2, z)?, axis(1, h)?, axis(0, w)?))
    }

    /// 体素中心构成的包围盒 `(min, max)`.
    pub fn bounds(&self) -> (Point3, Point3) {
        let (z, h, w) = self.shape;
        (self.origin, self.index_to_world((z - 1, h - 1, w - 1)))
    }
}
