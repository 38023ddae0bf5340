//! 集成测试共用的合成数据.

#![allow(dead_code)]

use std::f64::consts::PI;
use std::sync::Once;

use ndarray::Array3;
use surf_berry::prelude::*;

/// 球心.
pub const CENTER: Point3 = [10.0, 10.0, 10.0];

/// 球半径.
pub const RADIUS: f64 = 6.0;

static LOGGER: Once = Once::new();

pub fn init_logger() {
    LOGGER.call_once(|| {
        let _ = simple_logger::SimpleLogger::new()
            .with_level(log::LevelFilter::Warn)
            .init();
    });
}

/// 20^3, 分辨率 1 mm, 以 `CENTER` 为中心, 半径 `RADIUS` 的球为 label 1.
pub fn sphere_volume() -> ReferenceVolume {
    let data = Array3::<u8>::from_shape_fn((20, 20, 20), |(z, h, w)| {
        let d2 = (w as f64 - CENTER[0]).powi(2)
            + (h as f64 - CENTER[1]).powi(2)
            + (z as f64 - CENTER[2]).powi(2);
        u8::from(d2 <= RADIUS * RADIUS)
    });
    ReferenceVolume::with_spacing(data, [1.0; 3]).unwrap()
}

/// 位于 `z` 平面, 以 `(CENTER.x, CENTER.y)` 为圆心的圆.
pub fn circle(r: f64, n: usize, z: f64) -> Contour {
    Contour::closed(
        (0..n)
            .map(|i| {
                let t = 2.0 * PI * i as f64 / n as f64;
                [CENTER[0] + r * t.cos(), CENTER[1] + r * t.sin(), z]
            })
            .collect(),
    )
}

/// 球在 `z` 平面上的截面轮廓.
pub fn sphere_section(z: f64) -> Contour {
    let dz = z - CENTER[2];
    circle((RADIUS * RADIUS - dz * dz).sqrt(), 48, z)
}

/// 轴向切面 `z`.
pub fn axial(z: f64, slice_index: u32) -> PlaneGeometry {
    PlaneGeometry::new(
        AffineTransform::translation([0.0, 0.0, z]),
        (20, 20),
        [1.0; 3],
        slice_index,
    )
}

pub fn controller() -> SurfaceInterpolationController {
    init_logger();
    SurfaceInterpolationController::new(InterpolationConfig::default(), FixedMemory(1 << 32))
}
