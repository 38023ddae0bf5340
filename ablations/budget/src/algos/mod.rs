mod profile;

use surf_berry::prelude::*;

pub use profile::Profile;

/// 每个预算重复插值的次数.
const ROUNDS: usize = 3;

/// 以体素预算 `budget` 对 `sections` 重复插值, 统计耗时与结果规模.
pub fn with_budget(
    budget: usize,
    volume: &ReferenceVolume,
    sections: &[(Contour, PlaneGeometry)],
) -> Profile {
    let mut profile = Profile::new();
    let config = InterpolationConfig::from_voxel_spacing(volume.geometry().spacing())
        .expect("Invalid phantom spacing");
    let mut controller = SurfaceInterpolationController::new(config, FixedMemory(16 << 30));
    controller.set_reference_volume(volume.clone());
    controller.set_active_label(1);
    for (contour, plane) in sections {
        controller.add_new_contour(contour.clone(), *plane);
    }
    profile.set_memory_portion(controller.estimate_memory_portion());
    profile.set_reduced_points(controller.number_of_points_after_reduction());

    for _ in 0..ROUNDS {
        // 预算不变, 但会使缓存的结果失效.
        controller.set_distance_image_volume(budget);
        profile.count_run(true);
        let surface = controller.interpolate().cloned();
        profile.run_elapsed();
        match (surface, controller.distance_volume()) {
            (Some(s), Some(dv)) => profile.count_result(dv.geometry().size(), &s),
            _ => profile.count_failed(),
        }
    }
    profile.finish()
}
