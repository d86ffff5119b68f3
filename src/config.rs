//! Configuration management

use serde::{Deserialize, Serialize};
use anyhow::{bail, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoConfig {
    pub workers: usize,
    pub frames_per_worker: u64,
    pub stages: Vec<String>,
    /// Fraction of stage measurements that are canceled before completion.
    pub cancel_ratio: f64,
    /// Percentile levels, as fractions in `[0, 1]`, logged for every profiler.
    pub percentiles: Vec<f64>,
    pub work: WorkRange,
}

/// Simulated per-stage work, in microseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRange {
    pub min_us: u64,
    pub max_us: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            frames_per_worker: 500,
            stages: vec![
                "capture".to_string(),
                "convert".to_string(),
                "filter".to_string(),
                "encode".to_string(),
            ],
            cancel_ratio: 0.01,
            percentiles: vec![0.5, 0.75, 0.9, 0.95, 0.99, 0.999],
            work: WorkRange {
                min_us: 5,
                max_us: 250,
            },
        }
    }
}

impl DemoConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DemoConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            bail!("workers must be greater than zero");
        }
        if self.stages.is_empty() {
            bail!("at least one stage is required");
        }
        if self.work.min_us > self.work.max_us {
            bail!(
                "work.min_us ({}) exceeds work.max_us ({})",
                self.work.min_us,
                self.work.max_us
            );
        }
        if !(0.0..=1.0).contains(&self.cancel_ratio) {
            bail!("cancel_ratio must be within [0, 1], got {}", self.cancel_ratio);
        }
        if let Some(level) = self
            .percentiles
            .iter()
            .find(|level| !(0.0..=1.0).contains(*level))
        {
            bail!("percentile levels must be within [0, 1], got {}", level);
        }
        Ok(())
    }
}
