use std::collections::BTreeMap;
use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ProfilerError;
use crate::Result;

/// Tolerance used when a bucket's position in the observed value range is
/// compared against the requested percentile.
const BY_TIME_TOLERANCE: f64 = 0.00005;
/// Tolerance used when a bucket's cumulative call share is compared against
/// the requested percentile.
const BY_CALLS_TOLERANCE: f64 = 0.0005;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// How a percentile is resolved against the recorded buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PercentileMode {
    /// Percentile over the normalized range of observed duration values.
    ByTime,
    /// Conventional percentile over the distribution of calls.
    ByCalls,
}

impl PercentileMode {
    #[inline]
    pub fn from_by_time(by_time: bool) -> Self {
        if by_time {
            PercentileMode::ByTime
        } else {
            PercentileMode::ByCalls
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PercentileMode::ByTime => "by_time",
            PercentileMode::ByCalls => "by_calls",
        }
    }
}

#[inline]
fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
    a == b || (a >= b - tolerance && a <= b + tolerance)
}

/// Builds a `Duration` from a nanosecond total that may exceed `u64`.
#[inline]
pub(crate) fn duration_from_nanos(nanos: u128) -> Duration {
    let secs = u64::try_from(nanos / NANOS_PER_SEC).unwrap_or(u64::MAX);
    Duration::new(secs, (nanos % NANOS_PER_SEC) as u32)
}

/// Exact-value histogram of durations.
///
/// Each distinct duration owns one bucket holding the number of times it was
/// recorded. Buckets are kept in ascending order so percentile lookups can
/// walk them front to back. Every statistic returns an observed duration, no
/// interpolation is performed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Histogram {
    buckets: BTreeMap<Duration, u64>,
}

impl Histogram {
    #[inline]
    pub fn new() -> Self {
        Self {
            buckets: BTreeMap::new(),
        }
    }

    /// Adds one occurrence of `duration`, creating its bucket if needed.
    #[inline]
    pub fn record(&mut self, duration: Duration) {
        *self.buckets.entry(duration).or_insert(0) += 1;
    }

    /// Total number of recorded durations.
    #[inline]
    pub fn count(&self) -> u64 {
        self.buckets.values().sum()
    }

    #[inline]
    pub fn total_nanos(&self) -> u128 {
        self.buckets
            .iter()
            .map(|(duration, &count)| duration.as_nanos() * u128::from(count))
            .sum()
    }

    #[inline]
    pub fn total_duration(&self) -> Duration {
        duration_from_nanos(self.total_nanos())
    }

    /// Mean duration in nanoseconds.
    ///
    /// The mean of an empty histogram is undefined and reported as
    /// [`ProfilerError::EmptyHistogram`].
    pub fn average_duration(&self) -> Result<f64> {
        let count = self.count();
        if count == 0 {
            return Err(ProfilerError::EmptyHistogram);
        }
        Ok(self.total_nanos() as f64 / count as f64)
    }

    #[inline]
    pub fn min(&self) -> Option<Duration> {
        self.buckets.keys().next().copied()
    }

    #[inline]
    pub fn max(&self) -> Option<Duration> {
        self.buckets.keys().next_back().copied()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Number of distinct durations.
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Buckets as `(duration, occurrences)` in ascending duration order.
    pub fn buckets(&self) -> impl Iterator<Item = (Duration, u64)> + '_ {
        self.buckets.iter().map(|(&duration, &count)| (duration, count))
    }

    #[inline]
    pub fn reset(&mut self) {
        self.buckets.clear();
    }

    /// Adds every bucket of `other` into this histogram.
    pub fn merge(&mut self, other: &Histogram) {
        for (&duration, &count) in &other.buckets {
            *self.buckets.entry(duration).or_insert(0) += count;
        }
    }

    /// Resolves `percentile` (a fraction in `[0, 1]`) to a recorded duration.
    pub fn percentile(&self, percentile: f64, mode: PercentileMode) -> Result<Duration> {
        if self.is_empty() {
            return Err(ProfilerError::EmptyHistogram);
        }
        if !(0.0..=1.0).contains(&percentile) {
            return Err(ProfilerError::InvalidPercentile { percentile });
        }

        let found = match mode {
            PercentileMode::ByTime => self.find_by_time(percentile),
            PercentileMode::ByCalls => self.find_by_calls(percentile),
        };

        found.ok_or(ProfilerError::PercentileNotFound { percentile })
    }

    fn find_by_time(&self, percentile: f64) -> Option<Duration> {
        let smallest = self.min()?;
        let largest = self.max()?;
        let variance = (largest - smallest).as_nanos() as f64;

        // A single distinct value spans no range; it is every percentile.
        if variance == 0.0 {
            return Some(smallest);
        }

        self.buckets.keys().copied().find(|&duration| {
            let position = (duration - smallest).as_nanos() as f64 / variance;
            approx_eq(position, percentile, BY_TIME_TOLERANCE) || position > percentile
        })
    }

    fn find_by_calls(&self, percentile: f64) -> Option<Duration> {
        if percentile == 0.0 {
            return self.min();
        }

        let calls = self.count() as f64;
        let mut accumulated = 0u64;

        for (&duration, &count) in &self.buckets {
            let before = accumulated as f64 / calls;
            accumulated += count;
            let through = accumulated as f64 / calls;

            if approx_eq(percentile, through, BY_CALLS_TOLERANCE)
                || (before < percentile && percentile < through)
            {
                return Some(duration);
            }
        }

        None
    }

    pub fn percentiles(&self, mode: PercentileMode) -> Result<HistogramPercentiles> {
        Ok(HistogramPercentiles {
            p50: self.percentile(0.50, mode)?,
            p75: self.percentile(0.75, mode)?,
            p90: self.percentile(0.90, mode)?,
            p95: self.percentile(0.95, mode)?,
            p99: self.percentile(0.99, mode)?,
            p99_9: self.percentile(0.999, mode)?,
        })
    }
}

impl FromIterator<Duration> for Histogram {
    fn from_iter<I: IntoIterator<Item = Duration>>(iter: I) -> Self {
        let mut histogram = Histogram::new();
        for duration in iter {
            histogram.record(duration);
        }
        histogram
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramPercentiles {
    pub p50: Duration,
    pub p75: Duration,
    pub p90: Duration,
    pub p95: Duration,
    pub p99: Duration,
    pub p99_9: Duration,
}

impl HistogramPercentiles {
    #[inline]
    pub fn p50_us(&self) -> f64 {
        self.p50.as_nanos() as f64 / 1000.0
    }

    #[inline]
    pub fn p99_us(&self) -> f64 {
        self.p99.as_nanos() as f64 / 1000.0
    }

    #[inline]
    pub fn p99_9_us(&self) -> f64 {
        self.p99_9.as_nanos() as f64 / 1000.0
    }
}
