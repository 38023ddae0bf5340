//! 轮廓与轮廓存储.

use std::collections::BTreeMap;

use crate::geometry::{PlaneGeometry, Point3};
use crate::Label;

/// 三维折线轮廓. 一般是闭合的 (首尾顶点之间隐含一条边).
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Contour {
    points: Vec<Point3>,
    closed: bool,
}

impl Contour {
    /// 创建闭合轮廓.
    #[inline]
    pub fn closed(points: Vec<Point3>) -> Self {
        Self {
            points,
            closed: true,
        }
    }

    /// 创建开放折线.
    #[inline]
    pub fn open(points: Vec<Point3>) -> Self {
        Self {
            points,
            closed: false,
        }
    }

    /// 以相同的闭合属性创建新轮廓.
    #[inline]
    pub(crate) fn with_points(&self, points: Vec<Point3>) -> Self {
        Self {
            points,
            closed: self.closed,
        }
    }

    /// 顶点.
    #[inline]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// 是否闭合.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// 顶点个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// 是否没有任何顶点.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 依次获取每条边的两个端点. 闭合轮廓包含最后一个顶点到第一个顶点的边.
    pub fn edges(&self) -> impl Iterator<Item = (&Point3, &Point3)> + '_ {
        let n = self.points.len();
        let edge_cnt = match (self.closed, n) {
            (_, 0 | 1) => 0,
            (true, 2) => 1,
            (true, n) => n,
            (false, n) => n - 1,
        };
        (0..edge_cnt).map(move |i| (&self.points[i], &self.points[(i + 1) % n]))
    }
}

/// 已保存的轮廓及其所在切面.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContourRecord {
    /// 轮廓.
    pub contour: Contour,

    /// 切面标识.
    pub plane: PlaneGeometry,
}

/// 一次写入对轮廓存储的影响.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SlotChange {
    /// 追加到第 `0` 个槽位.
    Appended(usize),

    /// 原位覆盖第 `0` 个槽位.
    Replaced(usize),

    /// 没有任何改动 (空轮廓且没有同一切面的旧轮廓, 或者没有选中 label).
    Ignored,
}

/// label -> 有序轮廓列表.
///
/// 下游各个处理阶段按槽位位置 (而非切面标识) 对齐, 因此覆盖写入必须保持原位置.
#[derive(Clone, Debug, Default)]
pub struct ContourStore {
    lists: BTreeMap<Label, Vec<ContourRecord>>,
}

impl ContourStore {
    /// 创建空存储.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 在 `label` 的轮廓列表中查找与 `plane` 为同一切面的槽位.
    pub fn find_slot(&self, label: Label, plane: &PlaneGeometry) -> Option<usize> {
        self.records(label)
            .iter()
            .position(|r| r.plane.is_same_plane(plane))
    }

    /// 写入轮廓.
    ///
    /// 1. 若存在同一切面的槽位, 则原位覆盖 (空轮廓同样覆盖);
    /// 2. 否则若轮廓非空, 则追加新槽位 (未知 label 会自动创建列表);
    /// 3. 否则不做任何改动.
    pub fn insert_or_replace(
        &mut self,
        label: Label,
        contour: Contour,
        plane: PlaneGeometry,
    ) -> SlotChange {
        if let Some(pos) = self.find_slot(label, &plane) {
            // `find_slot` 命中意味着列表存在.
            if let Some(record) = self.lists.get_mut(&label).and_then(|l| l.get_mut(pos)) {
                record.contour = contour;
            }
            return SlotChange::Replaced(pos);
        }
        if contour.is_empty() {
            return SlotChange::Ignored;
        }
        let list = self.lists.entry(label).or_default();
        list.push(ContourRecord { contour, plane });
        SlotChange::Appended(list.len() - 1)
    }

    /// `label` 的全部轮廓, 按写入顺序排列. 未知 label 返回空切片.
    #[inline]
    pub fn records(&self, label: Label) -> &[ContourRecord] {
        self.lists.get(&label).map(Vec::as_slice).unwrap_or_default()
    }

    /// `label` 的轮廓槽位个数 (包括被清空的槽位).
    #[inline]
    pub fn len(&self, label: Label) -> usize {
        self.records(label).len()
    }

    /// `label` 的非空轮廓个数.
    #[inline]
    pub fn non_empty_len(&self, label: Label) -> usize {
        self.records(label)
            .iter()
            .filter(|r| !r.contour.is_empty())
            .count()
    }

    /// `label` 的全部轮廓顶点个数.
    #[inline]
    pub fn point_count(&self, label: Label) -> usize {
        self.records(label).iter().map(|r| r.contour.len()).sum()
    }

    /// 存储中是否没有任何 label.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// 存储中出现过的全部 label, 升序.
    #[inline]
    pub fn labels(&self) -> impl Iterator<Item = Label> + '_ {
        self.lists.keys().copied()
    }

    /// 删除 `label` 的全部轮廓, 返回被删除的列表.
    #[inline]
    pub fn remove(&mut self, label: Label) -> Option<Vec<ContourRecord>> {
        self.lists.remove(&label)
    }

    /// 清空全部 label.
    #[inline]
    pub fn clear(&mut self) {
        self.lists.clear();
    }
}
