use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::core::podcast::{JobInput, JobRecord, JobStatus, PodcastResult};

/// Keyed job-status records. Last write wins; one writer per job.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_job(&self, input: &JobInput) -> Result<()>;

    async fn update_status(
        &self,
        job_id: &str,
        status: JobStatus,
        result: Option<&PodcastResult>,
        error: Option<&str>,
    ) -> Result<()>;

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>>;
}

/// In-process store. Backs tests and single-process runs.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<String, JobRecord>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create_job(&self, input: &JobInput) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(&input.id) {
            return Err(anyhow!("Job {} already exists", input.id));
        }
        jobs.insert(
            input.id.clone(),
            JobRecord {
                id: input.id.clone(),
                status: JobStatus::Pending,
                result: None,
                error: None,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }

    async fn update_status(
        &self,
        job_id: &str,
        status: JobStatus,
        result: Option<&PodcastResult>,
        error: Option<&str>,
    ) -> Result<()> {
        let mut jobs = self.jobs.lock().await;
        let record = jobs
            .get_mut(job_id)
            .ok_or_else(|| anyhow!("Job {} not found", job_id))?;

        if !record.status.can_transition_to(status) {
            log::warn!(
                "Ignoring status update for job {}: {} -> {}",
                job_id,
                record.status,
                status
            );
            return Ok(());
        }

        record.status = status;
        record.result = result.cloned();
        record.error = error.map(str::to_string);
        record.updated_at = chrono::Utc::now().timestamp_millis();
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>> {
        Ok(self.jobs.lock().await.get(job_id).cloned())
    }
}
