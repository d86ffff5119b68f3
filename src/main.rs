use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use pipeline_profiler::config::DemoConfig;
use pipeline_profiler::latency_profiler::format_duration;
use pipeline_profiler::pipeline::PipelineProfilers;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting {} v{}", pipeline_profiler::NAME, pipeline_profiler::VERSION);

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading configuration from {}", path);
            DemoConfig::load_from_file(&path)?
        }
        None => DemoConfig::default(),
    };
    config.validate()?;

    let config = Arc::new(config);
    let profilers = Arc::new(PipelineProfilers::new(&config.stages));

    info!(
        "Running {} workers x {} frames through stages {:?}",
        config.workers, config.frames_per_worker, config.stages
    );

    let started = Instant::now();
    let mut workers = Vec::with_capacity(config.workers);
    for _ in 0..config.workers {
        let config = Arc::clone(&config);
        let profilers = Arc::clone(&profilers);
        workers.push(tokio::task::spawn_blocking(move || {
            let mut rng = rand::thread_rng();
            profilers.run_worker(&config, config.frames_per_worker, &mut rng)
        }));
    }
    for worker in workers {
        worker.await??;
    }
    info!("Workload finished in {:?}", started.elapsed());

    info!("=== Performance Statistics ===");
    for (name, report) in profilers.reports()? {
        report.log(&name);
        debug!("{}", serde_json::to_string(&report)?);
    }

    info!("=== Configured Percentiles ===");
    for (name, profiler) in profilers.named() {
        if profiler.is_empty() {
            continue;
        }
        for &level in &config.percentiles {
            let by_calls = profiler.percentile(level, false)?;
            let by_time = profiler.percentile(level, true)?;
            info!(
                "{} p{}: by_calls={}, by_time={}",
                name,
                level * 100.0,
                format_duration(by_calls),
                format_duration(by_time),
            );
        }
    }

    Ok(())
}
