use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfilerError {
    #[error("No durations have been recorded")]
    EmptyHistogram,
    #[error("Invalid percentile: {percentile} (expected a value in [0, 1])")]
    InvalidPercentile { percentile: f64 },
    #[error("No recorded duration matches percentile {percentile}")]
    PercentileNotFound { percentile: f64 },
}
