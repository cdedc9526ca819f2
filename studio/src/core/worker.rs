use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::{self, Duration};

use crate::core::podcast::JobInput;
use crate::core::runner::PodcastJobRunner;

/// Hands out pending jobs, one claim at a time.
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn claim(&self) -> Result<Option<JobInput>>;
}

/// Finishes jobs that were in flight when the worker last stopped.
pub async fn resume_inflight(runner: &PodcastJobRunner) -> Result<usize> {
    let jobs = runner.journal().inflight()?;
    if !jobs.is_empty() {
        log::info!("Resuming {} unfinished job(s)", jobs.len());
    }
    for job in &jobs {
        if let Err(e) = runner.run(job).await {
            log::warn!("Resumed job {} ended with error: {:#}", job.id, e);
        }
    }
    Ok(jobs.len())
}

/// Claims and runs jobs until the source has nothing left. Returns how many
/// jobs were run.
pub async fn drain_queue(runner: &PodcastJobRunner, source: &dyn JobSource) -> Result<usize> {
    let mut processed = 0;
    while let Some(job) = source.claim().await? {
        log::info!("Claimed job {}", job.id);
        if let Err(e) = runner.run(&job).await {
            log::warn!("Job {} ended with error: {:#}", job.id, e);
        }
        processed += 1;
    }
    Ok(processed)
}

pub async fn run_worker_loop(runner: Arc<PodcastJobRunner>, source: Arc<dyn JobSource>, poll_interval: Duration) {
    if let Err(e) = resume_inflight(&runner).await {
        log::error!("Failed to resume unfinished jobs: {:#}", e);
    }

    let mut interval = time::interval(poll_interval);
    loop {
        interval.tick().await;
        match drain_queue(&runner, source.as_ref()).await {
            Ok(0) => log::debug!("No pending jobs"),
            Ok(n) => log::info!("Processed {} job(s)", n),
            Err(e) => log::warn!("Failed to claim jobs: {:#}", e),
        }
    }
}
