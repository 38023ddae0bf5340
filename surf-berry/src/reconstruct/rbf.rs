//! 径向基函数插值.
//!
//! 核函数 `φ(r) = r` (三维双调和), 附加一次多项式 `c0 + c1 x + c2 y + c3 z`.
//! 方程组:
//!
//! ```text
//! | Φ   P | | w |   | f |
//! | Pᵀ  0 | | c | = | 0 |
//! ```
//!
//! 其中 `Φ_ij = |x_i - x_j|`, `P_i = [1, x_i, y_i, z_i]`.

use nalgebra::{DMatrix, DVector};

use super::error::{ReconstructError, ReconstructResult};
use crate::geometry::{distance, Point3};

/// 多项式项个数.
const POLY_TERMS: usize = 4;

#[inline]
fn poly_basis(p: &Point3, k: usize) -> f64 {
    match k {
        0 => 1.0,
        k => p[k - 1],
    }
}

/// 已求解的插值函数.
#[derive(Clone, Debug)]
pub struct RbfInterpolant {
    centers: Vec<Point3>,
    weights: Vec<f64>,
    poly: [f64; POLY_TERMS],
}

impl RbfInterpolant {
    /// 以插值中心 `centers` 及其函数值 `values` 求解插值函数.
    ///
    /// 调用方需保证中心两两不重合且不全共面, 否则返回 `Err(SingularSystem)`.
    pub fn fit(centers: Vec<Point3>, values: &[f64]) -> ReconstructResult<Self> {
        let n = centers.len();
        if n != values.len() {
            return Err(ReconstructError::ValueCountMismatch(n, values.len()));
        }
        let m = n + POLY_TERMS;

        let a = DMatrix::<f64>::from_fn(m, m, |i, j| match (i < n, j < n) {
            (true, true) => distance(&centers[i], &centers[j]),
            (true, false) => poly_basis(&centers[i], j - n),
            (false, true) => poly_basis(&centers[j], i - n),
            (false, false) => 0.0,
        });
        let b = DVector::<f64>::from_fn(m, |i, _| if i < n { values[i] } else { 0.0 });

        let x = a.lu().solve(&b).ok_or(ReconstructError::SingularSystem)?;
        if !x.iter().all(|v| v.is_finite()) {
            return Err(ReconstructError::SingularSystem);
        }

        let weights = x.rows(0, n).iter().copied().collect();
        let mut poly = [0.0; POLY_TERMS];
        poly.iter_mut()
            .zip(x.rows(n, POLY_TERMS).iter())
            .for_each(|(c, v)| *c = *v);

        Ok(Self {
            centers,
            weights,
            poly,
        })
    }

    /// 插值中心个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    /// 是否没有任何中心.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    /// 在 `p` 处求值.
    pub fn evaluate(&self, p: &Point3) -> f64 {
        let radial: f64 = self
            .centers
            .iter()
            .zip(self.weights.iter())
            .map(|(c, w)| w * distance(c, p))
            .sum();
        let linear: f64 = (0..POLY_TERMS)
            .map(|k| self.poly[k] * poly_basis(p, k))
            .sum();
        radial + linear
    }
}
