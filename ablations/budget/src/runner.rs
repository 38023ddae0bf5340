//! 程序运行函数.

use crate::result::AblationResult;
use std::thread;
use utils::phantom::{self, Ellipsoid};

/// 参与比较的体素预算.
const BUDGETS: [usize; 5] = [2_000, 10_000, 50_000, 100_000, 200_000];

/// 实际运行.
pub fn run() -> AblationResult {
    let sphere = Ellipsoid::sphere(phantom::radius_from_env_or(12.0));
    let sections = sphere.sections(5, 96);

    // 短路判断
    assert!(sections.len() >= 2, "Phantom yields too few sections");

    let cpus = utils::cpus().max(1);
    println!("Running ablation studies on {cpus} threads...");
    let volume = sphere.volume();
    let mut ans = Vec::with_capacity(BUDGETS.len());
    for batch in BUDGETS.chunks(cpus) {
        thread::scope(|s| {
            use super::algos::with_budget;

            let handles: Vec<_> = batch
                .iter()
                .map(|b| {
                    let (v, c) = (&volume, &sections);
                    s.spawn(move || (*b, with_budget(*b, v, c)))
                })
                .collect();
            ans.extend(
                handles
                    .into_iter()
                    .map(|th| th.join().expect("Thread joining error")),
            );
        });
    }
    AblationResult::from_iter(ans)
}
