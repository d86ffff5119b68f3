use crate::histogram::{Histogram, PercentileMode};
use crate::metrics::ProfilerReport;
use crate::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Thread-safe store of call durations.
///
/// Recording takes the lock only long enough to bump one bucket. Every query
/// copies the buckets under the lock and computes over the copy once the lock
/// has been released, so readers never stall recorders for longer than a
/// clone of the bucket map.
#[derive(Debug, Default)]
pub struct Profiler {
    timings: Mutex<Histogram>,
}

impl Profiler {
    #[inline]
    pub fn new() -> Self {
        Self {
            timings: Mutex::new(Histogram::new()),
        }
    }

    /// Convenience constructor for the usual shared form.
    #[inline]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Starts timing an operation. The elapsed time is recorded into this
    /// profiler when the returned measurement is dropped.
    #[inline]
    pub fn track(self: &Arc<Self>) -> ScopedMeasurement {
        ScopedMeasurement::new(Arc::clone(self))
    }

    #[inline]
    pub fn record(&self, duration: Duration) {
        self.timings.lock().record(duration);
    }

    /// Copy of the current buckets.
    #[inline]
    pub fn snapshot(&self) -> Histogram {
        self.timings.lock().clone()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.timings.lock().is_empty()
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.snapshot().count()
    }

    #[inline]
    pub fn total_duration(&self) -> Duration {
        self.snapshot().total_duration()
    }

    /// Mean duration in nanoseconds. Fails with `EmptyHistogram` when nothing
    /// has been recorded.
    #[inline]
    pub fn average_duration(&self) -> Result<f64> {
        self.snapshot().average_duration()
    }

    /// Resolves `percentile` (in `[0, 1]`) to a recorded duration, either over
    /// the observed value range (`by_time`) or over the call distribution.
    #[inline]
    pub fn percentile(&self, percentile: f64, by_time: bool) -> Result<Duration> {
        self.percentile_with(percentile, PercentileMode::from_by_time(by_time))
    }

    #[inline]
    pub fn percentile_with(&self, percentile: f64, mode: PercentileMode) -> Result<Duration> {
        self.snapshot().percentile(percentile, mode)
    }

    #[inline]
    pub fn percentile_by_time(&self, percentile: f64) -> Result<Duration> {
        self.percentile_with(percentile, PercentileMode::ByTime)
    }

    #[inline]
    pub fn percentile_by_calls(&self, percentile: f64) -> Result<Duration> {
        self.percentile_with(percentile, PercentileMode::ByCalls)
    }

    pub fn report(&self) -> Result<ProfilerReport> {
        ProfilerReport::from_histogram(&self.snapshot())
    }

    pub fn reset(&self) {
        let mut timings = self.timings.lock();
        debug!(buckets = timings.bucket_count(), "resetting profiler");
        timings.reset();
    }
}

/// Times a scope and records the elapsed duration on drop.
///
/// Dropping happens on every exit path, including early returns, `?` and
/// unwinding, so the recording cannot be skipped. A canceled measurement
/// records nothing.
#[derive(Debug)]
#[must_use = "the measurement records when dropped; binding it to `_` drops it immediately"]
pub struct ScopedMeasurement {
    profiler: Option<Arc<Profiler>>,
    start: Instant,
}

impl ScopedMeasurement {
    #[inline]
    pub fn new(profiler: Arc<Profiler>) -> Self {
        Self {
            profiler: Some(profiler),
            start: Instant::now(),
        }
    }

    /// Stops this measurement from recording. Calling it again has no effect.
    #[inline]
    pub fn cancel(&mut self) {
        if self.profiler.take().is_some() {
            trace!("measurement canceled");
        }
    }

    /// Sends the eventual recording to `profiler` instead. A canceled
    /// measurement becomes active again.
    #[inline]
    pub fn reparent(&mut self, profiler: Arc<Profiler>) {
        trace!(was_canceled = self.profiler.is_none(), "measurement reparented");
        self.profiler = Some(profiler);
    }

    #[inline]
    pub fn is_canceled(&self) -> bool {
        self.profiler.is_none()
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for ScopedMeasurement {
    #[inline]
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        if let Some(profiler) = self.profiler.take() {
            profiler.record(elapsed);
        }
    }
}

#[macro_export]
macro_rules! measure {
    ($profiler:expr, $code:block) => {{
        let _measurement = $crate::profiler::Profiler::track($profiler);
        $code
    }};
}

#[macro_export]
macro_rules! measure_async {
    ($profiler:expr, $future:expr) => {{
        let _measurement = $crate::profiler::Profiler::track($profiler);
        $future.await
    }};
}
