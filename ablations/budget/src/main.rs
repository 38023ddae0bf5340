//! 距离场体素预算消融实验: 同一体模在不同预算下的耗时与网格规模.

mod algos;
mod result;
mod runner;

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Warn)
        .init()
        .unwrap();
    runner::run().analyze();
}
