use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::core::job_store::JobStore;
use crate::core::podcast::{JobInput, JobRecord, JobStatus, PodcastResult};
use crate::core::switchboard::{StatusReport, SwitchboardClient};

/// Terminal status reports that could not be delivered, keyed by job id.
///
/// A newer report for the same job replaces the queued one.
pub struct Outbox {
    tree: sled::Tree,
    switchboard: Arc<SwitchboardClient>,
}

impl Outbox {
    pub fn open(db: &sled::Db, switchboard: Arc<SwitchboardClient>) -> Result<Self> {
        Ok(Self {
            tree: db.open_tree("outbox")?,
            switchboard,
        })
    }

    pub fn enqueue(&self, report: &StatusReport) -> Result<()> {
        let val = serde_json::to_vec(report)?;
        self.tree.insert(report.job_id.as_bytes(), val)?;
        self.tree.flush()?;
        log::info!("Queued status '{}' for job {} for redelivery", report.status, report.job_id);
        Ok(())
    }

    pub fn pending(&self) -> Result<Vec<StatusReport>> {
        let mut reports = Vec::new();
        for item in self.tree.iter() {
            let (_, val) = item?;
            reports.push(serde_json::from_slice(&val)?);
        }
        Ok(reports)
    }

    /// Re-sends every queued report. Returns how many were delivered.
    pub async fn process_queue(&self) -> Result<usize> {
        let mut delivered = 0;
        for item in self.tree.iter() {
            let (key, val) = item?;
            let report: StatusReport = serde_json::from_slice(&val)?;

            log::info!("Redelivering status for job {}", report.job_id);

            match self.switchboard.report_status(&report).await {
                Ok(_) => {
                    self.tree.remove(&key)?;
                    delivered += 1;
                }
                Err(e) => {
                    log::warn!("Redelivery failed again: {}. Keeping in queue.", e);
                }
            }
        }
        self.tree.flush()?;
        Ok(delivered)
    }

    pub async fn run_loop(self: Arc<Self>, interval: std::time::Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(e) = self.process_queue().await {
                log::error!("Error processing outbox: {}", e);
            }
        }
    }
}

#[async_trait]
impl JobStore for Outbox {
    async fn create_job(&self, input: &JobInput) -> Result<()> {
        self.switchboard.submit_job(input).await
    }

    async fn update_status(
        &self,
        job_id: &str,
        status: JobStatus,
        result: Option<&PodcastResult>,
        error: Option<&str>,
    ) -> Result<()> {
        let report = StatusReport {
            job_id: job_id.to_string(),
            status,
            result: result.cloned(),
            error: error.map(str::to_string),
        };

        match self.switchboard.report_status(&report).await {
            Ok(()) => Ok(()),
            Err(e) if status.is_terminal() => {
                log::warn!("Could not deliver final status for job {}: {}", job_id, e);
                self.enqueue(&report)
            }
            Err(e) => {
                log::warn!("Could not report '{}' for job {}: {}", status, job_id, e);
                Ok(())
            }
        }
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>> {
        self.switchboard.fetch_job(job_id).await
    }
}
