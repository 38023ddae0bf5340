//! 多边形网格.
//!
//! 插值结果 (三角面片) 与轮廓可视化结果 (折线) 共用同一结构.

mod marching;

pub use marching::extract_surface;

use crate::contour::Contour;
use crate::geometry::{cross, norm, sub, Point3};

/// 顶点 + 三角面片 + 折线.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Surface {
    vertices: Vec<Point3>,
    triangles: Vec<[u32; 3]>,
    polylines: Vec<Vec<u32>>,
}

impl Surface {
    /// 空网格.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 由三角面片创建. 调用方保证索引不越界.
    pub(crate) fn from_triangles(vertices: Vec<Point3>, triangles: Vec<[u32; 3]>) -> Self {
        debug_assert!(triangles
            .iter()
            .flatten()
            .all(|i| (*i as usize) < vertices.len()));
        Self {
            vertices,
            triangles,
            polylines: vec![],
        }
    }

    /// 把一组轮廓合并为一个只含折线的网格. 闭合轮廓的折线以首顶点收尾.
    ///
    /// 空轮廓被跳过.
    pub fn from_contours<'a, I>(contours: I) -> Self
    where
        I: IntoIterator<Item = &'a Contour>,
    {
        let mut ans = Self::new();
        for c in contours.into_iter().filter(|c| !c.is_empty()) {
            let base = ans.vertices.len() as u32;
            ans.vertices.extend_from_slice(c.points());
            let mut line: Vec<u32> = (0..c.len() as u32).map(|i| base + i).collect();
            if c.is_closed() && c.len() > 1 {
                line.push(base);
            }
            ans.polylines.push(line);
        }
        ans
    }

    /// 顶点.
    #[inline]
    pub fn vertices(&self) -> &[Point3] {
        &self.vertices
    }

    /// 三角面片, 法向 (右手) 指向距离场增大的方向, 即 label 外侧.
    #[inline]
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// 折线.
    #[inline]
    pub fn polylines(&self) -> &[Vec<u32>] {
        &self.polylines
    }

    /// 顶点个数.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// 三角面片个数.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.triangles.len()
    }

    /// 是否既没有面片也没有折线.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty() && self.polylines.is_empty()
    }

    /// 三角面片总面积.
    pub fn area(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| {
                let [a, b, c] = t.map(|i| self.vertices[i as usize]);
                norm(&cross(&sub(&b, &a), &sub(&c, &a))) * 0.5
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_contours() {
        let a = Contour::closed(vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let b = Contour::open(vec![[0.0, 0.0, 1.0], [1.0, 0.0, 1.0]]);
        let s = Surface::from_contours([&a, &Contour::default(), &b]);
        assert_eq!(s.vertex_count(), 5);
        assert_eq!(s.face_count(), 0);
        assert_eq!(s.polylines(), &[vec![0, 1, 2, 0], vec![3, 4]]);
        assert!(!s.is_empty());
        assert!(Surface::from_contours([&Contour::default()]).is_empty());
    }

    #[test]
    fn test_area() {
        let s = Surface::from_triangles(
            vec![[0.0; 3], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [2.0, 2.0, 0.0]],
            vec![[0, 1, 2], [1, 3, 2]],
        );
        assert_eq!(s.face_count(), 2);
        assert!((s.area() - 4.0).abs() < 1e-12);
        assert_eq!(Surface::new().area(), 0.0);
    }
}
