//! # Pipeline Profiler: in-process call latency profiling
//!
//! Measures the per-call overhead of pipeline stages with:
//! - An exact duration histogram guarded by a single mutex
//! - Scoped measurements that record on every exit path
//! - Percentiles by call count and by observed time range

pub mod config;
pub mod pipeline;

pub use latency_profiler;
pub use latency_profiler::{
    Histogram, PercentileMode, Profiler, ProfilerError, ProfilerReport, ScopedMeasurement,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
