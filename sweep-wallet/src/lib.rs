mod pool;
mod report;
mod runner;

pub use pool::WorkerPool;
pub use report::{ReportSinks, ResultSink};
pub use runner::{SweepOptions, SweepRunner};

#[cfg(feature = "backend-electrum")]
pub use runner::electrum_connector;

// re-export libraries for consumers
pub use sweep_core;
pub use sweep_core::bitcoin;
