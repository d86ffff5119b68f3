//! Call latency profiler.
//!
//! A [`Profiler`] keeps an exact histogram of recorded durations behind a
//! mutex. [`Profiler::track`] hands out a [`ScopedMeasurement`] that records
//! the time since its creation when it goes out of scope.

pub mod error;
pub mod histogram;
pub mod metrics;
pub mod profiler;

pub use error::ProfilerError;
pub use histogram::{Histogram, HistogramPercentiles, PercentileMode};
pub use metrics::{format_duration, format_duration_ns, ProfilerReport};
pub use profiler::{Profiler, ScopedMeasurement};

pub type Result<T> = std::result::Result<T, ProfilerError>;
