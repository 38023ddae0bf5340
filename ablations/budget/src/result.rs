//! 实验结果.

use crate::algos::Profile;
use std::io::{self, Write};

/// 将 `profile` 的结果写进 `w` 中.
fn describe_into<W: Write>(budget: usize, p: &Profile, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    #[inline]
    fn f64_to_display(f: Option<f64>) -> String {
        match f {
            Some(f) => format!("{f:.6}"),
            None => "/".to_string(),
        }
    }

    writeln!(w, "Budget `{budget}` voxels:")?;
    writeln!(w, "{S4}Runs: {} ({} without result)", p.get_runs(), p.get_failed())?;
    writeln!(w, "{S4}Reduced contour points: {}", p.get_reduced_points())?;
    writeln!(w, "{S4}Estimated memory portion: {:.6}", p.get_memory_portion())?;
    writeln!(w, "{S4}Grid voxels: {}", p.get_voxels())?;
    writeln!(
        w,
        "{S4}Surface: {} vertices, {} faces, area {:.3} mm^2",
        p.get_vertices(),
        p.get_faces(),
        p.get_area()
    )?;
    writeln!(w, "{S4}Interpolation total time: {} us", p.get_run_time_us())?;
    writeln!(
        w,
        "{S4}Interpolation average time: {} us",
        f64_to_display(p.get_avg_run_time_us())
    )?;
    writeln!(w, "{S4}Total machine time: {} us", p.get_real_time_us())?;
    let t = p.get_most_time_consuming().map(|d| d.as_micros() as f64);
    write!(w, "{S4}Most time-consuming run costs {} us", f64_to_display(t))?;
    Ok(())
}

/// 消融实验最终结果.
pub struct AblationResult {
    data: Vec<(usize, Profile)>,
}

impl AblationResult {
    pub fn from_iter<I: IntoIterator<Item = (usize, Profile)>>(it: I) -> Self {
        Self {
            data: it.into_iter().collect(),
        }
    }

    /// 分析运行结果.
    pub fn analyze(&self) {
        utils::sep();
        let mut buf = Vec::with_capacity(512);

        for (budget, profile) in self.data.iter() {
            describe_into(*budget, profile, &mut buf).unwrap();
            println!("{}", std::str::from_utf8(&buf).unwrap());
            buf.clear();

            utils::sep();
        }
    }
}
