//! Simulated media pipeline used to exercise the profiler end to end.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use latency_profiler::{measure, Profiler, ProfilerReport};
use rand::Rng;
use tracing::{debug, warn};

use crate::config::{DemoConfig, WorkRange};

/// One profiler per pipeline stage plus one for the whole frame.
#[derive(Debug)]
pub struct PipelineProfilers {
    stages: Vec<(String, Arc<Profiler>)>,
    frame: Arc<Profiler>,
}

impl PipelineProfilers {
    pub fn new(stage_names: &[String]) -> Self {
        Self {
            stages: stage_names
                .iter()
                .map(|name| (name.clone(), Profiler::shared()))
                .collect(),
            frame: Profiler::shared(),
        }
    }

    pub fn stage(&self, name: &str) -> Option<&Arc<Profiler>> {
        self.stages
            .iter()
            .find(|(stage, _)| stage == name)
            .map(|(_, profiler)| profiler)
    }

    pub fn frame(&self) -> &Arc<Profiler> {
        &self.frame
    }

    /// The frame profiler followed by every stage profiler, with their names.
    pub fn named(&self) -> impl Iterator<Item = (&str, &Arc<Profiler>)> + '_ {
        std::iter::once(("frame", &self.frame))
            .chain(self.stages.iter().map(|(name, p)| (name.as_str(), p)))
    }

    /// Processes `frames` frames, timing every stage and the frame as a whole.
    /// Fails without recording anything if `config` does not validate.
    pub fn run_worker<R: Rng>(
        &self,
        config: &DemoConfig,
        frames: u64,
        rng: &mut R,
    ) -> Result<()> {
        config.validate()?;

        for _ in 0..frames {
            measure!(&self.frame, {
                for (name, profiler) in &self.stages {
                    let mut measurement = profiler.track();
                    spin_for(sample_work(&config.work, rng));

                    if rng.gen_bool(config.cancel_ratio) {
                        debug!(stage = %name, "dropping stage sample");
                        measurement.cancel();
                    }
                }
            });
        }

        Ok(())
    }

    /// Reports for the frame profiler followed by every stage, skipping
    /// profilers that never recorded anything.
    pub fn reports(&self) -> Result<Vec<(String, ProfilerReport)>> {
        let mut reports = Vec::with_capacity(self.stages.len() + 1);

        for (name, profiler) in self.named() {
            if profiler.is_empty() {
                warn!(stage = name, "no samples recorded");
                continue;
            }
            reports.push((name.to_string(), profiler.report()?));
        }

        Ok(reports)
    }
}

fn sample_work<R: Rng>(work: &WorkRange, rng: &mut R) -> Duration {
    Duration::from_micros(rng.gen_range(work.min_us..=work.max_us))
}

/// Busy-waits so the simulated work is not subject to timer granularity.
fn spin_for(duration: Duration) {
    let start = Instant::now();
    while start.elapsed() < duration {
        std::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_config() -> DemoConfig {
        DemoConfig {
            workers: 1,
            frames_per_worker: 20,
            stages: vec!["decode".to_string(), "scale".to_string()],
            cancel_ratio: 0.0,
            percentiles: vec![0.5, 0.99],
            work: crate::config::WorkRange { min_us: 1, max_us: 5 },
        }
    }

    #[test]
    fn test_worker_records_every_stage() {
        let config = small_config();
        let profilers = PipelineProfilers::new(&config.stages);
        let mut rng = StdRng::seed_from_u64(7);

        profilers.run_worker(&config, config.frames_per_worker, &mut rng).unwrap();

        assert_eq!(profilers.frame().count(), 20);
        assert_eq!(profilers.stage("decode").unwrap().count(), 20);
        assert_eq!(profilers.stage("scale").unwrap().count(), 20);
        assert!(profilers.stage("missing").is_none());

        let min = profilers.stage("decode").unwrap().percentile(0.0, false).unwrap();
        assert!(min >= Duration::from_micros(1));
    }

    #[test]
    fn test_canceled_samples_are_not_recorded() {
        let mut config = small_config();
        config.cancel_ratio = 1.0;
        let profilers = PipelineProfilers::new(&config.stages);
        let mut rng = StdRng::seed_from_u64(7);

        profilers.run_worker(&config, 5, &mut rng).unwrap();

        assert_eq!(profilers.frame().count(), 5);
        assert!(profilers.stage("decode").unwrap().is_empty());

        let reports = profilers.reports().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, "frame");
    }

    #[test]
    fn test_frame_time_covers_stages() {
        let config = small_config();
        let profilers = PipelineProfilers::new(&config.stages);
        let mut rng = StdRng::seed_from_u64(11);

        profilers.run_worker(&config, 10, &mut rng).unwrap();

        let stage_total: Duration = ["decode", "scale"]
            .iter()
            .map(|name| profilers.stage(name).unwrap().total_duration())
            .sum();
        assert!(profilers.frame().total_duration() >= stage_total);
    }

    #[test]
    fn test_invalid_config_is_rejected_before_recording() {
        let mut rng = StdRng::seed_from_u64(3);

        let mut config = small_config();
        config.cancel_ratio = 1.5;
        let profilers = PipelineProfilers::new(&config.stages);
        assert!(profilers.run_worker(&config, 5, &mut rng).is_err());
        assert!(profilers.frame().is_empty());

        let mut config = small_config();
        config.work = crate::config::WorkRange { min_us: 10, max_us: 1 };
        assert!(profilers.run_worker(&config, 5, &mut rng).is_err());

        let mut config = small_config();
        config.cancel_ratio = f64::NAN;
        assert!(profilers.run_worker(&config, 5, &mut rng).is_err());
        assert!(profilers.frame().is_empty());
    }

    #[test]
    fn test_named_lists_frame_then_stages() {
        let config = small_config();
        let profilers = PipelineProfilers::new(&config.stages);
        let names: Vec<_> = profilers.named().map(|(name, _)| name).collect();

        assert_eq!(names, vec!["frame", "decode", "scale"]);
    }
}
