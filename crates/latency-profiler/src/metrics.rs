use std::time::Duration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ProfilerError;
use crate::histogram::{Histogram, HistogramPercentiles, PercentileMode};
use crate::Result;

/// Point-in-time summary of a profiler, suitable for logging or handing to an
/// exporter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilerReport {
    pub count: u64,
    pub total: Duration,
    pub average_ns: f64,
    pub min: Duration,
    pub max: Duration,
    pub by_calls: HistogramPercentiles,
    pub by_time: HistogramPercentiles,
    pub timestamp: DateTime<Utc>,
}

impl ProfilerReport {
    pub fn from_histogram(histogram: &Histogram) -> Result<Self> {
        let (min, max) = histogram
            .min()
            .zip(histogram.max())
            .ok_or(ProfilerError::EmptyHistogram)?;

        Ok(Self {
            count: histogram.count(),
            total: histogram.total_duration(),
            average_ns: histogram.average_duration()?,
            min,
            max,
            by_calls: histogram.percentiles(PercentileMode::ByCalls)?,
            by_time: histogram.percentiles(PercentileMode::ByTime)?,
            timestamp: Utc::now(),
        })
    }

    #[inline]
    pub fn average_us(&self) -> f64 {
        self.average_ns / 1000.0
    }

    pub fn log(&self, name: &str) {
        info!(
            "{}: calls={}, total={}, avg={}, min={}, max={}",
            name,
            self.count,
            format_duration(self.total),
            format_duration_ns(self.average_ns as u64),
            format_duration(self.min),
            format_duration(self.max),
        );
        for (mode, percentiles) in [
            (PercentileMode::ByCalls, &self.by_calls),
            (PercentileMode::ByTime, &self.by_time),
        ] {
            info!(
                "{} [{}]: p50={}, p75={}, p90={}, p95={}, p99={}, p99.9={}",
                name,
                mode.as_str(),
                format_duration(percentiles.p50),
                format_duration(percentiles.p75),
                format_duration(percentiles.p90),
                format_duration(percentiles.p95),
                format_duration(percentiles.p99),
                format_duration(percentiles.p99_9),
            );
        }
    }
}

pub fn format_duration_ns(nanos: u64) -> String {
    if nanos < 1_000 {
        format!("{}ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.2}μs", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.2}ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.2}s", nanos as f64 / 1_000_000_000.0)
    }
}

#[inline]
pub fn format_duration(duration: Duration) -> String {
    format_duration_ns(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX))
}
