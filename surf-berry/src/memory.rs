//! 内存占用估计.
//!
//! 插值需要求解稠密线性方程组, 其规模随约束点个数平方增长. 宿主程序在调用插值前
//! 先查询估计值, 必要时提示用户.

use crate::consts::BYTES_PER_SCALAR;

/// 宿主程序提供的物理内存查询.
pub trait MemoryInfo: Send {
    /// 物理内存总量 (字节).
    fn total_physical_memory(&self) -> u64;
}

/// 固定大小的物理内存. 常用于测试或无法查询系统信息的环境.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FixedMemory(pub u64);

impl MemoryInfo for FixedMemory {
    #[inline]
    fn total_physical_memory(&self) -> u64 {
        self.0
    }
}

impl<F: Fn() -> u64 + Send> MemoryInfo for F {
    #[inline]
    fn total_physical_memory(&self) -> u64 {
        self()
    }
}

/// 以 `points` 个轮廓顶点插值所需内存占物理内存 `total` 的比例, 取值范围 `[0, 1]`.
///
/// 每个顶点产生 3 个约束, 方程组共 `(3 n)^2` 个 `f64`. `total` 为 0 时视为内存耗尽.
pub fn estimate_memory_portion(points: usize, total: u64) -> f64 {
    if points == 0 {
        return 0.0;
    }
    if total == 0 {
        return 1.0;
    }
    let constraints = 3.0 * points as f64;
    let bytes = constraints * constraints * BYTES_PER_SCALAR;
    (bytes / total as f64).min(1.0)
}
