//! 重建运行时错误.

use thiserror::Error;

/// 距离场重建失败的原因.
///
/// 控制器把所有变体一律视为 "没有插值结果", 该类型仅用于日志与测试.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconstructError {
    /// 可用轮廓不足. 参数为实际可用的轮廓个数.
    #[error("at least 2 usable contours are required, got {0}")]
    TooFewContours(usize),

    /// 约束点全部共面 (或重合), 不足以确定三维场.
    #[error("constraint points are coplanar")]
    Degenerate,

    /// 约束点包围盒与参考几何没有体积上的交集.
    #[error("sampling grid is empty")]
    EmptyGrid,

    /// 体素预算连最小的 `2 x 2 x 2` 网格都放不下. 参数为预算值.
    #[error("distance image volume budget {0} is too small")]
    BudgetTooSmall(usize),

    /// 插值方程组奇异或解不是有限值.
    #[error("interpolation system is singular")]
    SingularSystem,

    /// 插值中心与函数值个数不一致. 参数依次为中心个数与函数值个数.
    #[error("{0} centers but {1} values")]
    ValueCountMismatch(usize, usize),
}

/// 重建结果.
pub type ReconstructResult<T> = Result<T, ReconstructError>;
