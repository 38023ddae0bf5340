//! 轮廓精简.
//!
//! 对每条轮廓独立处理, 输出与输入一一对应 (数量与顺序均不变):
//!
//! 1. 合并过近的点: 与上一个保留点的距离小于 `min_spacing` 的点被丢弃;
//! 2. 删除近似共线的点: 借助小顶堆, 反复删除偏离 (到相邻两点弦的距离) 最小的点,
//!   直到最小偏离不小于 `min_spacing * COLLINEAR_FACTOR`. 删除后产生的新边不得长于 `max_spacing`;
//! 3. 细分过长的边: 长于 `max_spacing` 的边被等分, 每段长度落在 `(max_spacing / 2, max_spacing]`.
//!
//! 少于 3 个点的轮廓 (精简前或精简后) 原样输出.

use binary_heap_plus::BinaryHeap;
use ordered_float::OrderedFloat;

use crate::consts::{COLLINEAR_FACTOR, MIN_CONTOUR_POINTS};
use crate::contour::Contour;
use crate::geometry::{distance, lerp, point_segment_distance, Point3};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
    }
}

/// 精简后相邻顶点间距的取值范围.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SpacingBounds {
    min: f64,
    max: f64,
}

impl SpacingBounds {
    /// 创建间距范围. 要求 `0 < min <= max` 且均为有限值, 否则返回 `None`.
    pub fn new(min: f64, max: f64) -> Option<Self> {
        (min.is_finite() && max.is_finite() && min > 0.0 && min <= max)
            .then_some(Self { min, max })
    }

    /// 最小间距.
    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大间距.
    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }
}

/// 轮廓精简器. 结果只依赖输入顺序与间距范围, 不含任何随机性.
#[derive(Copy, Clone, Debug)]
pub struct ContourReducer {
    bounds: SpacingBounds,
}

impl ContourReducer {
    /// 初始化.
    #[inline]
    pub fn new(bounds: SpacingBounds) -> Self {
        Self { bounds }
    }

    /// 间距范围.
    #[inline]
    pub fn bounds(&self) -> SpacingBounds {
        self.bounds
    }

    /// 精简一组轮廓. 第 `i` 个输出对应第 `i` 个输入.
    pub fn reduce(&self, contours: &[Contour]) -> Vec<Contour> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "rayon")] {
                contours.par_iter().map(|c| self.reduce_one(c)).collect()
            } else {
                contours.iter().map(|c| self.reduce_one(c)).collect()
            }
        }
    }

    /// 精简单条轮廓.
    pub fn reduce_one(&self, contour: &Contour) -> Contour {
        if contour.len() < MIN_CONTOUR_POINTS {
            return contour.clone();
        }
        let closed = contour.is_closed();
        let merged = merge_close(contour.points(), self.bounds.min, closed);
        let simplified = remove_collinear(
            merged,
            self.bounds.min * COLLINEAR_FACTOR,
            self.bounds.max,
            closed,
        );
        let densified = subdivide(&simplified, self.bounds.max, closed);
        if densified.len() < MIN_CONTOUR_POINTS {
            return contour.clone();
        }
        contour.with_points(densified)
    }
}

/// 精简结果的总顶点个数.
#[inline]
pub fn number_of_points<'a, I: IntoIterator<Item = &'a Contour>>(contours: I) -> usize {
    contours.into_iter().map(Contour::len).sum()
}

/// 丢弃与上一个保留点距离小于 `min` 的点. 闭合轮廓的末点还需与首点保持距离.
///
/// 开放折线保留原终点, 并删除终点之前与它距离小于 `min` 的保留点 (首点除外).
fn merge_close(points: &[Point3], min: f64, closed: bool) -> Vec<Point3> {
    let mut kept: Vec<Point3> = Vec::with_capacity(points.len());
    for p in points {
        match kept.last() {
            Some(last) if distance(last, p) < min => {}
            _ => kept.push(*p),
        }
    }
    if closed {
        while kept.len() > 1 && distance(&kept[0], &kept[kept.len() - 1]) < min {
            kept.pop();
        }
    } else if let Some(end) = points.last() {
        if kept.len() > 1 {
            kept.pop();
        }
        while kept.len() > 1 && distance(&kept[kept.len() - 1], end) < min {
            kept.pop();
        }
        kept.push(*end);
    }
    kept
}

/// 双向链表 + 小顶堆删除近似共线点.
fn remove_collinear(points: Vec<Point3>, tol: f64, max_gap: f64, closed: bool) -> Vec<Point3> {
    let n = points.len();
    if n <= MIN_CONTOUR_POINTS {
        return points;
    }

    let mut prev: Vec<usize> = (0..n).map(|i| (i + n - 1) % n).collect();
    let mut next: Vec<usize> = (0..n).map(|i| (i + 1) % n).collect();
    let mut alive = vec![true; n];
    let mut version = vec![0u32; n];
    let removable = |i: usize| closed || (i != 0 && i != n - 1);

    let score = |i: usize, prev: &[usize], next: &[usize]| {
        let (a, b) = (&points[prev[i]], &points[next[i]]);
        (point_segment_distance(&points[i], a, b), distance(a, b))
    };

    // 堆顶偏离最小. 偏离相同时下标小者优先, 保证结果稳定.
    let mut heap = BinaryHeap::new_min();
    heap.reserve(n);
    for i in (0..n).filter(|&i| removable(i)) {
        let (dev, _) = score(i, &prev, &next);
        heap.push((OrderedFloat(dev), i, 0u32));
    }

    let mut remaining = n;
    while let Some((OrderedFloat(dev), i, ver)) = heap.pop() {
        if !alive[i] || ver != version[i] {
            continue;
        }
        if dev >= tol || remaining <= MIN_CONTOUR_POINTS {
            break;
        }
        let (_, gap) = score(i, &prev, &next);
        if gap > max_gap {
            // 邻居只会越删越远, 该点之后也不可能被删除.
            continue;
        }

        alive[i] = false;
        remaining -= 1;
        let (p, q) = (prev[i], next[i]);
        next[p] = q;
        prev[q] = p;
        for j in [p, q].into_iter().filter(|&j| removable(j)) {
            version[j] += 1;
            let (dev, _) = score(j, &prev, &next);
            heap.push((OrderedFloat(dev), j, version[j]));
        }
    }

    // 删除不改变相对顺序, 按下标收集即可.
    points
        .into_iter()
        .zip(alive)
        .filter_map(|(p, a)| a.then_some(p))
        .collect()
}

/// 将长于 `max` 的边等分.
fn subdivide(points: &[Point3], max: f64, closed: bool) -> Vec<Point3> {
    let n = points.len();
    let edge_cnt = if closed { n } else { n.saturating_sub(1) };
    let mut ans = Vec::with_capacity(n);
    for i in 0..n {
        let a = &points[i];
        ans.push(*a);
        if i >= edge_cnt {
            continue;
        }
        let b = &points[(i + 1) % n];
        let gap = distance(a, b);
        if gap > max {
            let pieces = (gap / max).ceil() as usize;
            ans.extend((1..pieces).map(|k| lerp(a, b, k as f64 / pieces as f64)));
        }
    }
    ans
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn reducer(min: f64, max: f64) -> ContourReducer {
        ContourReducer::new(SpacingBounds::new(min, max).unwrap())
    }

    fn circle(r: f64, n: usize, z: f64) -> Contour {
        Contour::closed(
            (0..n)
                .map(|i| {
                    let t = 2.0 * PI * i as f64 / n as f64;
                    [r * t.cos(), r * t.sin(), z]
                })
                .collect(),
        )
    }

    fn gaps(c: &Contour) -> Vec<f64> {
        c.edges().map(|(a, b)| distance(a, b)).collect()
    }

    #[test]
    fn test_spacing_bounds() {
        assert!(SpacingBounds::new(1.0, 0.5).is_none());
        assert!(SpacingBounds::new(0.0, 1.0).is_none());
        assert!(SpacingBounds::new(1.0, f64::INFINITY).is_none());
        assert!(SpacingBounds::new(1.0, 1.0).is_some());
    }

    /// 输出数量与顺序与输入一致.
    #[test]
    fn test_order_and_count() {
        let r = reducer(0.5, 1.0);
        let input = vec![
            circle(5.0, 200, 0.0),
            Contour::closed(vec![[0.0; 3], [1.0, 0.0, 0.0]]),
            circle(3.0, 100, 4.0),
        ];
        let out = r.reduce(&input);
        assert_eq!(out.len(), 3);
        assert!(out[0].points().iter().all(|p| p[2] == 0.0));
        assert_eq!(out[1], input[1]);
        assert!(out[2].points().iter().all(|p| p[2] == 4.0));
        assert_eq!(out, r.reduce(&input));
    }

    /// 稠密圆: 近重复点被合并, 相邻间距不超过 `max`.
    #[test]
    fn test_dense_circle() {
        let r = reducer(0.5, 1.0);
        let c = circle(5.0, 400, 0.0);
        let out = r.reduce_one(&c);
        assert!(out.len() < c.len());
        assert!(out.len() >= 32);
        assert!(out.is_closed());
        assert!(gaps(&out).iter().all(|g| *g <= 1.0 + 1e-9));
        assert!(gaps(&out).iter().all(|g| *g >= 0.5 - 1e-9));
    }

    /// 稀疏多边形: 长边被细分.
    #[test]
    fn test_sparse_square() {
        let r = reducer(0.5, 1.0);
        let c = Contour::closed(vec![
            [0.0, 0.0, 0.0],
            [4.0, 0.0, 0.0],
            [4.0, 4.0, 0.0],
            [0.0, 4.0, 0.0],
        ]);
        let out = r.reduce_one(&c);
        assert_eq!(out.len(), 16);
        assert!(gaps(&out).iter().all(|g| (*g - 1.0).abs() < 1e-9));
        assert_eq!(out.points()[0], [0.0, 0.0, 0.0]);
        assert_eq!(out.points()[4], [4.0, 0.0, 0.0]);
    }

    /// 共线点被删除, 但删除不会让边长超过 `max`.
    #[test]
    fn test_collinear_removed_within_max() {
        let r = reducer(0.2, 1.0);
        let points = (0..=20).map(|i| [i as f64 * 0.25, 0.0, 0.0]).collect();
        let out = r.reduce_one(&Contour::open(points));
        assert_eq!(out.points().first(), Some(&[0.0, 0.0, 0.0]));
        assert_eq!(out.points().last(), Some(&[5.0, 0.0, 0.0]));
        assert!(gaps(&out).iter().all(|g| *g <= 1.0 + 1e-9));
        assert!(out.len() < 21);
    }

    /// 末端折返的开放折线: 恢复原终点后, 相邻顶点仍不近于 `min`.
    #[test]
    fn test_open_end_doubling_back() {
        let r = reducer(0.5, 2.0);
        let points = [0.0, 1.0, 2.0, 2.6, 2.2].map(|x| [x, 0.0, 0.0]).to_vec();
        let out = r.reduce_one(&Contour::open(points));
        assert_eq!(
            out.points(),
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.2, 0.0, 0.0]]
        );
        assert!(gaps(&out).iter().all(|g| *g >= 0.5 && *g <= 2.0));
    }

    /// 精简后不足三个点则原样输出.
    #[test]
    fn test_degenerate_pass_through() {
        let r = reducer(1.0, 2.0);
        let tiny = Contour::closed(vec![[0.0; 3], [0.1, 0.0, 0.0], [0.0, 0.1, 0.0]]);
        assert_eq!(r.reduce_one(&tiny), tiny);
        assert_eq!(r.reduce_one(&Contour::default()), Contour::default());
        assert_eq!(number_of_points([&tiny, &tiny]), 6);
    }
}
