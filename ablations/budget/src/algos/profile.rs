//! 算法运行统计.

use std::time::{Duration, Instant};
use surf_berry::Surface;

/// ablation/benchmark 计时器.
///
/// 该计时器支持 "中途中断" 与 "结束中断, 继续开始计时".
#[derive(Clone, Debug)]
struct AccTimer {
    consumed: Duration,
    since: Instant,
}

impl AccTimer {
    /// 初始化计时器. 初始化时会视为已经开始计时 (`self.start()`).
    #[inline]
    pub fn new() -> Self {
        Self {
            consumed: Duration::from_secs(0),
            since: Instant::now(),
        }
    }

    /// 开始计时.
    #[inline]
    pub fn start(&mut self) {
        self.since = Instant::now();
    }

    /// 结束计时, 并将这一区间的时间累加. 返回本轮计时时长.
    ///
    /// # 注意
    ///
    /// 上一次调用必须是 `self.start()`, 否则计算时间值无意义.
    #[inline]
    pub fn elapsed(&mut self) -> Duration {
        let d = self.since.elapsed();
        self.consumed += d;
        d
    }

    /// 获得总共累计下来的时间 (以微秒为单位).
    #[inline]
    pub fn get_total_us(&self) -> u64 {
        self.consumed.as_micros() as u64
    }
}

impl Default for AccTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// ablation/benchmark 数据统计.
#[derive(Clone, Debug)]
pub struct Profile {
    /// 插值次数.
    runs: u64,

    /// 没有得到结果的插值次数.
    failed: u64,

    /// 插值花费的总时间.
    run_time: AccTimer,

    /// 整个任务花费的总时间 (包括准备轮廓与参考体数据).
    real_time: AccTimer,

    /// 最耗时的一次插值.
    most: Option<Duration>,

    /// 最近一次结果的距离场体素个数.
    voxels: usize,

    /// 最近一次结果的顶点个数.
    vertices: usize,

    /// 最近一次结果的三角面片个数.
    faces: usize,

    /// 最近一次结果的表面积.
    area: f64,

    /// 精简后轮廓顶点总数.
    reduced_points: usize,

    /// 内存估计.
    memory_portion: f64,
}

impl Profile {
    /// 初始化.
    #[inline]
    pub fn new() -> Self {
        Self {
            runs: 0,
            failed: 0,
            run_time: AccTimer::default(),
            real_time: AccTimer::default(),
            most: None,
            voxels: 0,
            vertices: 0,
            faces: 0,
            area: 0.0,
            reduced_points: 0,
            memory_portion: 0.0,
        }
    }

    /// 记录一次插值. `start` 表明是否同时开始计时.
    #[inline]
    pub fn count_run(&mut self, start: bool) {
        self.runs += 1;
        if start {
            self.run_time.start();
        }
    }

    /// 结束一次插值计时.
    #[inline]
    pub fn run_elapsed(&mut self) {
        let d = self.run_time.elapsed();
        self.most = Some(self.most.map_or(d, |m| m.max(d)));
    }

    /// 记录一次失败的插值.
    #[inline]
    pub fn count_failed(&mut self) {
        self.failed += 1;
    }

    /// 记录一次成功插值的结果规模.
    pub fn count_result(&mut self, voxels: usize, surface: &Surface) {
        self.voxels = voxels;
        self.vertices = surface.vertex_count();
        self.faces = surface.face_count();
        self.area = surface.area();
    }

    /// 记录精简后轮廓顶点总数.
    #[inline]
    pub fn set_reduced_points(&mut self, n: usize) {
        self.reduced_points = n;
    }

    /// 记录内存估计.
    #[inline]
    pub fn set_memory_portion(&mut self, portion: f64) {
        self.memory_portion = portion;
    }

    /// 结束全部计时.
    #[inline]
    pub fn finish(mut self) -> Self {
        self.real_time.elapsed();
        self
    }

    #[inline]
    pub fn get_runs(&self) -> u64 {
        self.runs
    }

    #[inline]
    pub fn get_failed(&self) -> u64 {
        self.failed
    }

    /// 以微秒为单位获得插值总时间.
    #[inline]
    pub fn get_run_time_us(&self) -> u64 {
        self.run_time.get_total_us()
    }

    /// 以微秒为单位获得任务总自然时间.
    #[inline]
    pub fn get_real_time_us(&self) -> u64 {
        self.real_time.get_total_us()
    }

    /// 以微秒为单位获得平均插值时间.
    #[inline]
    pub fn get_avg_run_time_us(&self) -> Option<f64> {
        match self.runs {
            0 => None,
            runs => Some(self.get_run_time_us() as f64 / runs as f64),
        }
    }

    /// 获取最耗时的一次插值所消耗的时间. 如果不存在任务, 则返回 `None`.
    #[inline]
    pub fn get_most_time_consuming(&self) -> Option<Duration> {
        self.most
    }

    #[inline]
    pub fn get_voxels(&self) -> usize {
        self.voxels
    }

    #[inline]
    pub fn get_vertices(&self) -> usize {
        self.vertices
    }

    #[inline]
    pub fn get_faces(&self) -> usize {
        self.faces
    }

    #[inline]
    pub fn get_area(&self) -> f64 {
        self.area
    }

    #[inline]
    pub fn get_reduced_points(&self) -> usize {
        self.reduced_points
    }

    #[inline]
    pub fn get_memory_portion(&self) -> f64 {
        self.memory_portion
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}
