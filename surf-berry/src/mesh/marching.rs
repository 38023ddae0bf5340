//! Marching tetrahedra 等值面提取.
//!
//! 每个网格单元沿对角线 `0 - 7` 剖分为 6 个四面体 (相邻单元的剖分在公共面上一致),
//! 因此不存在 marching cubes 的歧义情形. 单元角点编号: `x` 方向为 bit 0,
//! `y` 方向为 bit 1, `z` 方向为 bit 2.
//!
//! 四面体与等值面的交:
//!
//! - 0 或 4 个角点在内侧: 无交;
//! - 1 或 3 个角点在内侧: 一个三角形;
//! - 2 个角点在内侧: 一个四边形, 拆为两个三角形.
//!
//! 同一条网格边上的交点只生成一次, 相邻三角形共享顶点.

use std::collections::HashMap;

use log::debug;

use super::Surface;
use crate::geometry::{centroid, cross, dot, lerp, sub, Point3};
use crate::reconstruct::DistanceVolume;

/// 单元内 6 个四面体的角点编号.
const TETRAHEDRA: [[usize; 4]; 6] = [
    [0, 1, 3, 7],
    [0, 3, 2, 7],
    [0, 2, 6, 7],
    [0, 6, 4, 7],
    [0, 4, 5, 7],
    [0, 5, 1, 7],
];

/// 网格节点.
#[derive(Copy, Clone)]
struct Node {
    id: usize,
    pos: Point3,
    value: f64,
}

/// 提取 `volume` 中值为 `iso` 的等值面. 值小于 `iso` 的节点视为内侧.
///
/// 三角形按右手法则的法向指向场值增大的方向 (外侧). 任何合法输入都能得到结果,
/// 等值面不穿过网格时结果为空网格.
pub fn extract_surface(volume: &DistanceVolume, iso: f64) -> Surface {
    let geometry = volume.geometry();
    let data = volume.data();
    let (z_len, h_len, w_len) = geometry.shape();
    let node = |z: usize, h: usize, w: usize| Node {
        id: (z * h_len + h) * w_len + w,
        pos: geometry.index_to_world((z, h, w)),
        value: data[(z, h, w)],
    };

    let mut builder = Builder::new(iso);
    for z in 0..z_len.saturating_sub(1) {
        for h in 0..h_len.saturating_sub(1) {
            for w in 0..w_len.saturating_sub(1) {
                let corners: [Node; 8] = std::array::from_fn(|bit| {
                    node(z + ((bit >> 2) & 1), h + ((bit >> 1) & 1), w + (bit & 1))
                });
                for tet in TETRAHEDRA.iter() {
                    builder.tetrahedron(tet.map(|c| corners[c]));
                }
            }
        }
    }

    debug!(
        "Extracted iso-surface {iso}: {} vertices, {} triangles",
        builder.vertices.len(),
        builder.triangles.len()
    );
    Surface::from_triangles(builder.vertices, builder.triangles)
}

/// 增量构建网格.
struct Builder {
    iso: f64,
    vertices: Vec<Point3>,
    triangles: Vec<[u32; 3]>,
    edges: HashMap<(usize, usize), u32>,
}

impl Builder {
    fn new(iso: f64) -> Self {
        Self {
            iso,
            vertices: vec![],
            triangles: vec![],
            edges: HashMap::new(),
        }
    }

    fn tetrahedron(&mut self, nodes: [Node; 4]) {
        let (inside, outside): (Vec<Node>, Vec<Node>) =
            nodes.into_iter().partition(|n| n.value < self.iso);
        let towards_outside = match (
            centroid(inside.iter().map(|n| &n.pos)),
            centroid(outside.iter().map(|n| &n.pos)),
        ) {
            (Some(i), Some(o)) => sub(&o, &i),
            _ => return,
        };

        match (inside.as_slice(), outside.as_slice()) {
            ([lone], others) | (others, [lone]) => {
                let [a, b, c] = [0, 1, 2].map(|k| self.edge_vertex(lone, &others[k]));
                self.push_oriented([a, b, c], &towards_outside);
            }
            ([i1, i2], [o1, o2]) => {
                let q = [
                    self.edge_vertex(o1, i1),
                    self.edge_vertex(o1, i2),
                    self.edge_vertex(o2, i2),
                    self.edge_vertex(o2, i1),
                ];
                self.push_oriented([q[0], q[1], q[2]], &towards_outside);
                self.push_oriented([q[0], q[2], q[3]], &towards_outside);
            }
            _ => {}
        }
    }

    /// 网格边 `(a, b)` 上的交点. 同一条边只插值一次, 且与端点顺序无关.
    fn edge_vertex(&mut self, a: &Node, b: &Node) -> u32 {
        let (a, b) = if a.id < b.id { (a, b) } else { (b, a) };
        if let Some(idx) = self.edges.get(&(a.id, b.id)) {
            return *idx;
        }
        let t = num::clamp((self.iso - a.value) / (b.value - a.value), 0.0, 1.0);
        let idx = self.vertices.len() as u32;
        self.vertices.push(lerp(&a.pos, &b.pos, t));
        self.edges.insert((a.id, b.id), idx);
        idx
    }

    /// 按需翻转三角形, 使其法向与 `dir` 同向. 面积为 0 的三角形被丢弃.
    fn push_oriented(&mut self, [a, b, c]: [u32; 3], dir: &[f64; 3]) {
        let [pa, pb, pc] = [a, b, c].map(|i| self.vertices[i as usize]);
        let normal = cross(&sub(&pb, &pa), &sub(&pc, &pa));
        let side = dot(&normal, dir);
        if side > 0.0 {
            self.triangles.push([a, b, c]);
        } else if side < 0.0 {
            self.triangles.push([a, c, b]);
        }
    }
}
