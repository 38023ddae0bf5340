//! 通用常量.

/// 判断两个切面是否相同时, 变换矩阵与偏移量逐分量允许的绝对误差.
///
/// 同一斜切面在不同交互事件中重新推导得到的浮点值不会逐位相等.
pub const PLANE_TOLERANCE: f64 = 1e-4;

/// 插值至少需要的 (非空) 轮廓个数.
pub const MIN_CONTOURS: usize = 2;

/// 一个可用轮廓至少需要的顶点个数. 少于该值的轮廓不参与精简与重建.
pub const MIN_CONTOUR_POINTS: usize = 3;

/// 距离场网格默认体素预算.
pub const DEFAULT_DISTANCE_IMAGE_VOLUME: usize = 50_000;

/// 提取表面时使用的默认等值.
pub const ISO_VALUE: f64 = 0.0;

/// 轮廓精简时, 近似共线判定阈值相对 `min_spacing` 的比例.
pub const COLLINEAR_FACTOR: f64 = 0.25;

/// 距离场网格相对约束点包围盒的外扩量, 以法向偏移距离为单位.
pub const GRID_PADDING_FACTOR: f64 = 2.0;

/// 内存估计中每个标量所占字节数 (`f64`).
pub const BYTES_PER_SCALAR: f64 = 8.0;

/// 视为同一约束点的最小距离. 重复约束点会使方程组奇异.
pub(crate) const DUPLICATE_EPS: f64 = 1e-9;

/// 约束点协方差最小/最大特征值之比低于该值时, 认为约束点共面.
pub(crate) const COPLANAR_RATIO: f64 = 1e-10;
