#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 根据用户在任意斜切面上勾画的稀疏二维轮廓, 插值重建分割目标的三维表面.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 该 crate 不负责任何医学图像格式的读写. 标签体数据与切面几何均由宿主程序直接传入.
//! 2. 可预期的失败 (轮廓不足, 几何退化, 方程组奇异) 一律表现为 "没有插值结果",
//!   不会 panic, 也不会向调用方返回错误.
//!
//! # 处理流程
//!
//! ### 轮廓存储 ✅
//!
//! 以 `(label, 切面标识)` 为键保存轮廓. 同一切面 (在 `1e-4` 容差内) 的新轮廓原位覆盖旧轮廓,
//! 保持槽位顺序不变.
//!
//! 实现位于 `surf-berry/src/contour.rs`.
//!
//! ### 轮廓精简 ✅
//!
//! 合并过近的点, 借助优先队列删除近似共线的点, 并细分过长的边.
//!
//! 实现位于 `surf-berry/src/reduce.rs`.
//!
//! ### 法向计算 ✅
//!
//! 法向位于轮廓所在平面内. 朝向由参考标签体数据投票决定, 因此同一 label
//! 的所有轮廓朝向一致.
//!
//! 实现位于 `surf-berry/src/normals.rs`.
//!
//! ### 有符号距离场重建 & 等值面提取 ✅
//!
//! 径向基函数 `φ(r) = r` + 一次多项式插值, 在受体素预算约束的网格上求值,
//! 随后以 marching tetrahedra 提取零等值面.
//!
//! 实现位于 `surf-berry/src/reconstruct` 与 `surf-berry/src/mesh`.
//!
//! ### 控制器 ✅
//!
//! 串联上述步骤, 维护每个 label 的轮廓以及当前 label 的缓存结果.
//!
//! 实现位于 `surf-berry/src/controller`.

/// 三维索引, 按 `(z, h, w)` 组织. 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 分割标签值.
pub type Label = u32;

pub mod consts;

mod config;

pub use config::InterpolationConfig;

pub mod geometry;

pub use geometry::{AffineTransform, PlaneGeometry, Point3, Vec3, VolumeGeometry};

mod volume;

pub use volume::{LabelMask, ReferenceVolume, VolumeError, VoxelData};

pub mod contour;

pub use contour::{Contour, ContourRecord, ContourStore, SlotChange};

pub mod reduce;

pub mod normals;

pub mod reconstruct;

pub mod mesh;

pub use mesh::Surface;

pub mod memory;

pub mod controller;

pub use controller::{ControllerState, SurfaceInterpolationController};

pub mod prelude;
