//! Durable step journal. A job is a sequence of named steps; each step's
//! output is persisted in sled once it succeeds, so a restarted worker picks
//! a job up at the first step without a stored result.

use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::time::Duration;

use crate::core::podcast::JobInput;

pub struct StepJournal {
    _db: sled::Db,
    steps: sled::Tree,
    inflight: sled::Tree,
}

impl StepJournal {
    pub fn open(db: &sled::Db) -> Result<Self> {
        Ok(Self {
            _db: db.clone(),
            steps: db.open_tree("steps")?,
            inflight: db.open_tree("inflight")?,
        })
    }

    /// Journal backed by a throwaway database, removed on drop.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::open(&db)
    }

    fn key(job_id: &str, name: &str) -> String {
        format!("{}#{}", job_id, name)
    }

    pub fn load<T: DeserializeOwned>(&self, job_id: &str, name: &str) -> Result<Option<T>> {
        match self.steps.get(Self::key(job_id, name))? {
            Some(val) => Ok(Some(serde_json::from_slice(&val)?)),
            None => Ok(None),
        }
    }

    pub fn store<T: Serialize>(&self, job_id: &str, name: &str, value: &T) -> Result<()> {
        let val = serde_json::to_vec(value)?;
        self.steps.insert(Self::key(job_id, name), val)?;
        self.steps.flush()?;
        Ok(())
    }

    pub fn clear_job(&self, job_id: &str) -> Result<()> {
        let prefix = format!("{}#", job_id);
        for item in self.steps.scan_prefix(prefix.as_bytes()) {
            let (key, _) = item?;
            self.steps.remove(key)?;
        }
        self.steps.flush()?;
        Ok(())
    }

    /// Records that a job was claimed so it can be resumed after a crash.
    pub fn begin(&self, input: &JobInput) -> Result<()> {
        self.inflight.insert(input.id.as_bytes(), serde_json::to_vec(input)?)?;
        self.inflight.flush()?;
        Ok(())
    }

    /// Drops the job's steps once its final status has been recorded.
    pub fn finish(&self, job_id: &str) -> Result<()> {
        self.clear_job(job_id)?;
        self.inflight.remove(job_id.as_bytes())?;
        self.inflight.flush()?;
        Ok(())
    }

    pub fn inflight(&self) -> Result<Vec<JobInput>> {
        let mut jobs = Vec::new();
        for item in self.inflight.iter() {
            let (_, val) = item?;
            jobs.push(serde_json::from_slice(&val)?);
        }
        Ok(jobs)
    }

    pub fn for_job(self: &Arc<Self>, job_id: &str) -> Steps {
        Steps {
            journal: self.clone(),
            job_id: job_id.to_string(),
        }
    }
}

/// Step executor bound to one job.
#[derive(Clone)]
pub struct Steps {
    journal: Arc<StepJournal>,
    job_id: String,
}

impl Steps {
    /// Runs `step` unless `name` already has a stored output, in which case
    /// the stored output is returned and `step` is never called.
    pub async fn run<T, E, F, Fut>(&self, name: &str, step: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        E: Into<anyhow::Error>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(done) = self.journal.load(&self.job_id, name)? {
            log::info!("[{}] step '{}' already done, skipping", self.job_id, name);
            return Ok(done);
        }

        log::info!("[{}] running step '{}'", self.job_id, name);
        let output = step().await.map_err(Into::<anyhow::Error>::into)?;
        self.journal.store(&self.job_id, name, &output)?;
        Ok(output)
    }

    /// Crash-safe pause. The wake-up time is persisted, so a resumed job only
    /// waits for whatever is left of the original delay.
    pub async fn sleep(&self, name: &str, duration: Duration) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        let remaining = match self.journal.load::<i64>(&self.job_id, name)? {
            Some(wake_at) => Duration::from_millis((wake_at - now).max(0) as u64),
            None => {
                let wake_at = now + duration.as_millis() as i64;
                self.journal.store(&self.job_id, name, &wake_at)?;
                duration
            }
        };

        if !remaining.is_zero() {
            log::debug!("[{}] step '{}' sleeping {:?}", self.job_id, name, remaining);
            tokio::time::sleep(remaining).await;
        }
        Ok(())
    }
}
