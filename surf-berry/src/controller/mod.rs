//! 表面插值控制器.
//!
//! 控制器独占轮廓存储, 并为当前 label 维护派生缓存:
//!
//! 1. 精简轮廓: 与存储槽位一一对齐, 写入某个槽位只会使该槽位的缓存失效;
//! 2. 插值结果, 轮廓可视化网格与距离场: 三者总是同时存在或同时失效.
//!
//! 所有可预期的失败 (没有选中 label, 轮廓不足, 几何退化, 方程组奇异) 都只表现为
//! "没有插值结果", 原因以 `warn` 级别写入日志.
//!
//! 控制器本身是单线程的. 多线程宿主需要把整个控制器放进同一把锁里,
//! 使写入, 缓存失效与插值构成一个整体.

mod observer;

pub use observer::{InterpolationEvent, InterpolationObserver, ObserverId};

use log::{debug, info, warn};

use observer::Observers;

use crate::consts::{ISO_VALUE, MIN_CONTOURS};
use crate::contour::{Contour, ContourRecord, ContourStore, SlotChange};
use crate::geometry::PlaneGeometry;
use crate::memory::{estimate_memory_portion, MemoryInfo};
use crate::mesh::{extract_surface, Surface};
use crate::normals::NormalComputer;
use crate::reconstruct::{DistanceVolume, SurfaceReconstructor};
use crate::reduce::{number_of_points, ContourReducer, SpacingBounds};
use crate::volume::ReferenceVolume;
use crate::{InterpolationConfig, Label};

/// 控制器所处的状态.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ControllerState {
    /// 没有选中 label.
    Idle,

    /// 已选中 label, 但没有有效的插值结果.
    LabelSelected(Label),

    /// 已选中 label, 且插值结果有效.
    Interpolated(Label),
}

/// 表面插值控制器. 由宿主程序的分割会话持有, 随会话创建与销毁.
pub struct SurfaceInterpolationController {
    config: InterpolationConfig,
    store: ContourStore,
    active: Option<Label>,
    reference: Option<ReferenceVolume>,

    /// 当前 label 每个槽位的精简结果, `None` 表示需要重新精简.
    reduced: Vec<Option<Contour>>,
    result: Option<Surface>,
    contours_surface: Option<Surface>,
    distance: Option<DistanceVolume>,

    observers: Observers,
    memory: Box<dyn MemoryInfo>,
}

impl SurfaceInterpolationController {
    /// 创建控制器. `memory` 用于查询物理内存总量.
    pub fn new(config: InterpolationConfig, memory: impl MemoryInfo + 'static) -> Self {
        Self {
            config,
            store: ContourStore::new(),
            active: None,
            reference: None,
            reduced: vec![],
            result: None,
            contours_surface: None,
            distance: None,
            observers: Observers::default(),
            memory: Box::new(memory),
        }
    }

    /// 当前参数.
    #[inline]
    pub fn config(&self) -> &InterpolationConfig {
        &self.config
    }

    /// 当前状态.
    pub fn state(&self) -> ControllerState {
        match (self.active, &self.result) {
            (None, _) => ControllerState::Idle,
            (Some(label), None) => ControllerState::LabelSelected(label),
            (Some(label), Some(_)) => ControllerState::Interpolated(label),
        }
    }

    /// 当前 label.
    #[inline]
    pub fn active_label(&self) -> Option<Label> {
        self.active
    }

    /// 切换当前 label. 与当前 label 相同时不做任何事.
    ///
    /// 切换会丢弃全部派生缓存, 但不会改动任何 label 的轮廓. 新 label 的轮廓在下一次
    /// 插值时才重新精简.
    pub fn set_active_label(&mut self, label: Label) {
        if self.active == Some(label) {
            return;
        }
        debug!("Active label {:?} -> {label}", self.active);
        self.active = Some(label);
        self.reduced = vec![None; self.store.len(label)];
        self.invalidate_result();
        self.observers
            .emit(InterpolationEvent::ActiveLabelChanged { label });
    }

    /// 为当前 label 写入轮廓. 没有选中 label 时轮廓被丢弃.
    pub fn add_new_contour(&mut self, contour: Contour, plane: PlaneGeometry) -> SlotChange {
        match self.active {
            Some(label) => self.add_contour(label, contour, plane),
            None => {
                debug!("No active label, contour dropped");
                SlotChange::Ignored
            }
        }
    }

    /// 为任意 label 写入轮廓. 未知 label 会自动创建.
    ///
    /// 同一切面的旧轮廓被原位覆盖, 否则非空轮廓被追加. 写入当前 label 时,
    /// 只有对应槽位的精简缓存失效, 插值结果整体失效.
    pub fn add_contour(&mut self, label: Label, contour: Contour, plane: PlaneGeometry) -> SlotChange {
        let points = contour.len();
        let change = self.store.insert_or_replace(label, contour, plane);
        debug!("Label {label}: contour with {points} points, {change:?}");

        let slot = match change {
            SlotChange::Appended(i) | SlotChange::Replaced(i) => i,
            SlotChange::Ignored => return change,
        };
        if self.active == Some(label) {
            if self.reduced.len() <= slot {
                self.reduced.resize(slot + 1, None);
            }
            self.reduced[slot] = None;
            self.invalidate_result();
        }
        self.observers
            .emit(InterpolationEvent::ContoursModified { label, change });
        change
    }

    /// 设置参考体数据 (当前分割结果). 法向朝向与重建网格范围都以它为准.
    pub fn set_reference_volume(&mut self, volume: ReferenceVolume) {
        debug!("Reference volume {:?}", volume.geometry());
        self.reference = Some(volume);
        self.invalidate_result();
    }

    /// 参考体数据.
    #[inline]
    pub fn reference_volume(&self) -> Option<&ReferenceVolume> {
        self.reference.as_ref()
    }

    /// 设置最小间距. 当前 label 的精简缓存全部失效.
    pub fn set_min_spacing(&mut self, min_spacing: f64) {
        self.config.min_spacing = min_spacing;
        self.invalidate_reduced();
    }

    /// 设置最大间距. 当前 label 的精简缓存全部失效.
    pub fn set_max_spacing(&mut self, max_spacing: f64) {
        self.config.max_spacing = max_spacing;
        self.invalidate_reduced();
    }

    /// 设置距离场体素预算.
    pub fn set_distance_image_volume(&mut self, budget: usize) {
        self.config.distance_image_volume = budget;
        self.invalidate_result();
    }

    /// 对当前 label 执行插值, 返回结果网格.
    ///
    /// 结果有效时直接返回缓存. 任何一步失败都会清空插值结果, 轮廓网格与距离场,
    /// 并返回 `None`.
    pub fn interpolate(&mut self) -> Option<&Surface> {
        if self.result.is_none() {
            self.invalidate_result();
            if let Some((distance, surface, contours)) = self.run_pipeline() {
                let event = InterpolationEvent::Interpolated {
                    label: self.active.unwrap_or_default(),
                    vertices: surface.vertex_count(),
                    faces: surface.face_count(),
                };
                info!(
                    "Interpolation done: {} vertices, {} faces",
                    surface.vertex_count(),
                    surface.face_count()
                );
                self.distance = Some(distance);
                self.result = Some(surface);
                self.contours_surface = Some(contours);
                self.observers.emit(event);
            }
        }
        self.result.as_ref()
    }

    /// 精简 -> 法向 -> 重建 -> 提取表面.
    fn run_pipeline(&mut self) -> Option<(DistanceVolume, Surface, Surface)> {
        let label = self.active?;
        let count = self.store.non_empty_len(label);
        if count < MIN_CONTOURS {
            warn!("Label {label} has {count} contours, at least {MIN_CONTOURS} are required");
            return None;
        }
        if self.reference.is_none() {
            warn!("No reference volume, interpolation skipped");
            return None;
        }
        let reducer = self.reducer()?;
        let offset = self.config.normal_offset();
        let budget = self.config.distance_image_volume;
        let (Some(normals), Some(reconstructor)) = (
            NormalComputer::new(offset),
            SurfaceReconstructor::new(budget, offset),
        ) else {
            warn!("Invalid normal offset {offset}");
            return None;
        };

        self.refresh_reduced(&reducer);
        let reduced: Vec<&Contour> = self
            .reduced
            .iter()
            .flatten()
            .filter(|c| !c.is_empty())
            .collect();
        debug!(
            "Label {label}: {} contours reduced to {} points",
            reduced.len(),
            number_of_points(reduced.iter().copied())
        );

        let reference = self.reference.as_ref()?;
        let mask = reference.label_mask(label);
        if mask.is_empty() {
            debug!("Label {label} is absent from the reference volume");
        }
        let oriented = normals.compute(reduced.iter().copied(), &mask);
        let distance = reconstructor.reconstruct(&oriented, reference.geometry())?;
        let surface = extract_surface(&distance, ISO_VALUE);
        let contours = Surface::from_contours(reduced.iter().copied());
        Some((distance, surface, contours))
    }

    /// 当前参数对应的精简器. 间距参数非法时返回 `None`.
    fn reducer(&self) -> Option<ContourReducer> {
        let (min, max) = (self.config.min_spacing, self.config.max_spacing);
        let bounds = SpacingBounds::new(min, max);
        if bounds.is_none() {
            warn!("Invalid spacing bounds [{min}, {max}]");
        }
        bounds.map(ContourReducer::new)
    }

    /// 重新精简缓存失效的槽位.
    fn refresh_reduced(&mut self, reducer: &ContourReducer) {
        let Some(label) = self.active else {
            return;
        };
        let records = self.store.records(label);
        self.reduced.resize(records.len(), None);
        let stale: Vec<Contour> = records
            .iter()
            .zip(self.reduced.iter())
            .filter(|(_, r)| r.is_none())
            .map(|(record, _)| record.contour.clone())
            .collect();
        if stale.is_empty() {
            return;
        }
        debug!("Label {label}: reducing {} of {} contours", stale.len(), records.len());

        let mut fresh = reducer.reduce(&stale).into_iter();
        for slot in self.reduced.iter_mut().filter(|r| r.is_none()) {
            *slot = fresh.next();
        }
    }

    /// 最近一次成功的插值结果.
    #[inline]
    pub fn interpolation_result(&self) -> Option<&Surface> {
        self.result.as_ref()
    }

    /// 最近一次成功插值时使用的精简轮廓, 以折线网格表示.
    #[inline]
    pub fn contours_as_surface(&self) -> Option<&Surface> {
        self.contours_surface.as_ref()
    }

    /// 最近一次成功插值时使用的距离场.
    #[inline]
    pub fn distance_volume(&self) -> Option<&DistanceVolume> {
        self.distance.as_ref()
    }

    /// 当前 label 的全部轮廓精简后的顶点总数. 没有选中 label 或间距参数非法时为 0.
    pub fn number_of_points_after_reduction(&mut self) -> usize {
        if self.active.is_none() {
            return 0;
        }
        let Some(reducer) = self.reducer() else {
            return 0;
        };
        self.refresh_reduced(&reducer);
        number_of_points(self.reduced.iter().flatten())
    }

    /// 当前 label 第 `slot` 个槽位的精简缓存. 未精简或越界时返回 `None`.
    #[inline]
    pub fn reduced_contour(&self, slot: usize) -> Option<&Contour> {
        self.reduced.get(slot).and_then(Option::as_ref)
    }

    /// `label` 的轮廓槽位个数.
    #[inline]
    pub fn contour_count(&self, label: Label) -> usize {
        self.store.len(label)
    }

    /// `label` 的全部轮廓, 按写入顺序排列.
    #[inline]
    pub fn records(&self, label: Label) -> &[ContourRecord] {
        self.store.records(label)
    }

    /// 存储中出现过的全部 label.
    #[inline]
    pub fn labels(&self) -> impl Iterator<Item = Label> + '_ {
        self.store.labels()
    }

    /// 删除 `label` 的全部轮廓. 宿主程序在分割中删除某个 label 时调用.
    ///
    /// 删除当前 label 时控制器回到 [`ControllerState::Idle`]. 返回是否确实删除了轮廓.
    pub fn remove_label(&mut self, label: Label) -> bool {
        let removed = self.store.remove(label).is_some();
        if self.active == Some(label) {
            self.active = None;
            self.reduced.clear();
            self.invalidate_result();
        }
        if removed {
            debug!("Label {label} removed");
            self.observers.emit(InterpolationEvent::LabelRemoved { label });
        }
        removed
    }

    /// 删除全部 label 的全部轮廓. 当前 label 保持选中.
    pub fn clear(&mut self) {
        let labels: Vec<Label> = self.store.labels().collect();
        self.store.clear();
        self.reduced.clear();
        self.invalidate_result();
        for label in labels {
            self.observers.emit(InterpolationEvent::LabelRemoved { label });
        }
    }

    /// 估计插值所需内存占物理内存的比例. 没有选中 label 时为 0.
    ///
    /// 重建的方程组由精简后的顶点构成, 因此按精简后的顶点数估计 (会先补齐失效的精简缓存).
    /// 间距参数非法, 无法精简时退回使用原始顶点数.
    pub fn estimate_memory_portion(&mut self) -> f64 {
        let Some(label) = self.active else {
            return 0.0;
        };
        let points = match self.reducer() {
            Some(reducer) => {
                self.refresh_reduced(&reducer);
                number_of_points(self.reduced.iter().flatten())
            }
            None => self.store.point_count(label),
        };
        estimate_memory_portion(points, self.memory.total_physical_memory())
    }

    /// 订阅事件.
    pub fn subscribe(&mut self, observer: impl InterpolationObserver + 'static) -> ObserverId {
        self.observers.subscribe(Box::new(observer))
    }

    /// 取消订阅. 返回该订阅是否存在.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// 订阅者个数.
    #[inline]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    fn invalidate_reduced(&mut self) {
        self.reduced.iter_mut().for_each(|r| *r = None);
        self.invalidate_result();
    }

    fn invalidate_result(&mut self) {
        self.result = None;
        self.contours_surface = None;
        self.distance = None;
    }
}

impl std::fmt::Debug for SurfaceInterpolationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceInterpolationController")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("labels", &self.store.labels().collect::<Vec<_>>())
            .field("observers", &self.observers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::AffineTransform;
    use crate::memory::FixedMemory;
    use std::sync::{Arc, Mutex};

    fn plane(z: f64) -> PlaneGeometry {
        PlaneGeometry::new(
            AffineTransform::translation([0.0, 0.0, z]),
            (32, 32),
            [1.0; 3],
            z as u32,
        )
    }

    fn square(z: f64, side: f64) -> Contour {
        Contour::closed(vec![[0.0, 0.0, z], [side, 0.0, z], [side, side, z], [0.0, side, z]])
    }

    fn controller() -> SurfaceInterpolationController {
        SurfaceInterpolationController::new(InterpolationConfig::default(), FixedMemory(1 << 30))
    }

    #[test]
    fn test_state_machine() {
        let mut c = controller();
        assert_eq!(c.state(), ControllerState::Idle);
        assert_eq!(c.add_new_contour(square(0.0, 4.0), plane(0.0)), SlotChange::Ignored);
        assert!(c.labels().next().is_none());
        assert!(c.interpolate().is_none());

        c.set_active_label(3);
        assert_eq!(c.state(), ControllerState::LabelSelected(3));
        assert_eq!(c.add_new_contour(square(0.0, 4.0), plane(0.0)), SlotChange::Appended(0));
        assert_eq!(c.contour_count(3), 1);

        // 只有一条轮廓.
        assert!(c.interpolate().is_none());
        assert_eq!(c.state(), ControllerState::LabelSelected(3));

        assert!(c.remove_label(3));
        assert_eq!(c.state(), ControllerState::Idle);
        assert!(!c.remove_label(3));
    }

    /// 覆盖写入只使对应槽位的精简缓存失效.
    #[test]
    fn test_incremental_reduction() {
        let mut c = controller();
        c.set_active_label(1);
        c.add_new_contour(square(0.0, 4.0), plane(0.0));
        c.add_new_contour(square(2.0, 4.0), plane(2.0));
        assert_eq!(c.number_of_points_after_reduction(), 32);
        assert!(c.reduced_contour(0).is_some() && c.reduced_contour(1).is_some());

        assert_eq!(c.add_new_contour(square(2.0, 2.0), plane(2.0)), SlotChange::Replaced(1));
        assert!(c.reduced_contour(0).is_some());
        assert!(c.reduced_contour(1).is_none());
        assert_eq!(c.number_of_points_after_reduction(), 16 + 8);
        assert_eq!(c.reduced_contour(1).unwrap().points()[0], [0.0, 0.0, 2.0]);

        // 间距变化使全部缓存失效.
        c.set_max_spacing(2.0);
        assert!(c.reduced_contour(0).is_none());
        assert_eq!(c.number_of_points_after_reduction(), 8 + 4);

        c.set_min_spacing(5.0);
        assert_eq!(c.number_of_points_after_reduction(), 0);
    }

    #[test]
    fn test_label_switch_keeps_store() {
        let mut c = controller();
        c.set_active_label(1);
        c.add_new_contour(square(0.0, 4.0), plane(0.0));
        c.set_active_label(2);
        c.add_new_contour(square(0.0, 8.0), plane(0.0));
        c.set_active_label(1);
        assert_eq!(c.records(1).len(), 1);
        assert_eq!(c.records(1)[0].contour, square(0.0, 4.0));
        assert_eq!(c.records(2)[0].contour, square(0.0, 8.0));

        // 写入非当前 label 不影响当前 label 的缓存.
        assert_eq!(c.number_of_points_after_reduction(), 16);
        c.add_contour(2, square(1.0, 8.0), plane(1.0));
        assert!(c.reduced_contour(0).is_some());
        assert_eq!(c.contour_count(2), 2);

        c.clear();
        assert_eq!(c.contour_count(1), 0);
        assert_eq!(c.state(), ControllerState::LabelSelected(1));
    }

    #[test]
    fn test_observers() {
        let events = Arc::new(Mutex::new(vec![]));
        let mut c = controller();
        let sink = events.clone();
        let id = c.subscribe(move |e: &InterpolationEvent| sink.lock().unwrap().push(e.clone()));
        assert_eq!(c.observer_count(), 1);

        c.add_new_contour(square(0.0, 4.0), plane(0.0));
        c.set_active_label(1);
        c.set_active_label(1);
        c.add_new_contour(square(0.0, 4.0), plane(0.0));
        c.add_new_contour(square(0.0, 4.0), plane(0.0));
        c.add_new_contour(Contour::default(), plane(9.0));
        c.remove_label(1);

        assert!(c.unsubscribe(id));
        assert!(!c.unsubscribe(id));
        c.set_active_label(2);

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                InterpolationEvent::ActiveLabelChanged { label: 1 },
                InterpolationEvent::ContoursModified {
                    label: 1,
                    change: SlotChange::Appended(0)
                },
                InterpolationEvent::ContoursModified {
                    label: 1,
                    change: SlotChange::Replaced(0)
                },
                InterpolationEvent::LabelRemoved { label: 1 },
            ]
        );
    }

    #[test]
    fn test_memory_estimate() {
        let mut c = controller();
        assert_eq!(c.estimate_memory_portion(), 0.0);
        c.set_active_label(1);
        assert_eq!(c.estimate_memory_portion(), 0.0);
        c.add_new_contour(square(0.0, 4.0), plane(0.0));
        let one = c.estimate_memory_portion();
        // 精简后 16 个顶点: (3 * 16)^2 * 8 / 2^30
        assert!((one - 18432.0 / (1u64 << 30) as f64).abs() < 1e-15);
        c.add_new_contour(square(1.0, 4.0), plane(1.0));
        assert!(c.estimate_memory_portion() > one);
    }

    /// 稀疏勾画的多边形精简时被细分, 内存估计以细分后的顶点数为准.
    #[test]
    fn test_memory_estimate_follows_reduction() {
        let mut c = controller();
        c.set_active_label(1);
        c.add_new_contour(square(8.0, 15.0), plane(8.0));
        c.add_new_contour(square(12.0, 15.0), plane(12.0));
        assert_eq!(c.records(1).iter().map(|r| r.contour.len()).sum::<usize>(), 8);

        let portion = c.estimate_memory_portion();
        let reduced = c.number_of_points_after_reduction();
        assert_eq!(reduced, 120);
        assert_eq!(portion, estimate_memory_portion(reduced, 1 << 30));
        assert!(portion > 200.0 * estimate_memory_portion(8, 1 << 30));

        // 间距参数非法时按原始顶点数估计.
        c.set_min_spacing(-1.0);
        assert_eq!(c.estimate_memory_portion(), estimate_memory_portion(8, 1 << 30));
    }
}
