use async_trait::async_trait;
use sqlx::FromRow;

use studio::core::job_store::JobStore;
use studio::core::podcast::{JobInput, JobRecord, JobStatus, PodcastResult};

use crate::db::DbPool;

#[derive(Debug, FromRow)]
struct JobRow {
    id: String,
    status: String,
    result: Option<String>,
    error: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl JobRow {
    fn into_record(self) -> Result<JobRecord, sqlx::Error> {
        let status: JobStatus = self.status.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?;
        let result = match self.result {
            Some(json) => Some(serde_json::from_str(&json).map_err(|e| sqlx::Error::Decode(Box::new(e)))?),
            None => None,
        };
        Ok(JobRecord {
            id: self.id,
            status,
            result,
            error: self.error,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    Applied,
    NotFound,
    /// The job is in `current` and cannot move to the requested status.
    Rejected { current: JobStatus },
}

/// Job records in the `jobs` table.
#[derive(Clone)]
pub struct SqliteJobStore {
    pool: DbPool,
}

impl SqliteJobStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, input: &JobInput) -> Result<(), sqlx::Error> {
        let now = chrono::Utc::now().timestamp_millis();
        sqlx::query(
            "INSERT INTO jobs (id, status, content, title, language, created_at, updated_at) VALUES (?, 'pending', ?, ?, ?, ?, ?)",
        )
        .bind(&input.id)
        .bind(&input.content)
        .bind(&input.title)
        .bind(&input.language)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find(&self, id: &str) -> Result<Option<JobRecord>, sqlx::Error> {
        let row = sqlx::query_as::<_, JobRow>(
            "SELECT id, status, result, error, created_at, updated_at FROM jobs WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(JobRow::into_record).transpose()
    }

    /// Moves the oldest pending job to `processing` in one statement, so two
    /// workers can never claim the same job.
    pub async fn claim_next(&self) -> Result<Option<JobInput>, sqlx::Error> {
        let now = chrono::Utc::now().timestamp_millis();
        let row = sqlx::query_as::<_, (String, String, String, String)>(
            r#"
            UPDATE jobs SET status = 'processing', updated_at = ?
            WHERE id = (
                SELECT id FROM jobs WHERE status = 'pending' ORDER BY created_at, rowid LIMIT 1
            )
            RETURNING id, content, title, language
            "#,
        )
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, content, title, language)| JobInput { id, content, title, language }))
    }

    pub async fn apply_status(
        &self,
        id: &str,
        status: JobStatus,
        result: Option<&PodcastResult>,
        error: Option<&str>,
    ) -> Result<StatusUpdate, sqlx::Error> {
        let current = match self.find(id).await? {
            Some(record) => record.status,
            None => return Ok(StatusUpdate::NotFound),
        };
        if !current.can_transition_to(status) {
            return Ok(StatusUpdate::Rejected { current });
        }

        let result_json = match result {
            Some(r) => Some(serde_json::to_string(r).map_err(|e| sqlx::Error::Encode(Box::new(e)))?),
            None => None,
        };

        // The status guard keeps a concurrent terminal write from being overwritten
        let updated = sqlx::query(
            "UPDATE jobs SET status = ?, result = ?, error = ?, updated_at = ? WHERE id = ? AND status NOT IN ('completed', 'failed')",
        )
        .bind(status.as_str())
        .bind(result_json)
        .bind(error)
        .bind(chrono::Utc::now().timestamp_millis())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            let current = self.find(id).await?.map(|r| r.status).unwrap_or(current);
            return Ok(StatusUpdate::Rejected { current });
        }
        tracing::info!("Job {} is now {}", id, status);
        Ok(StatusUpdate::Applied)
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn create_job(&self, input: &JobInput) -> anyhow::Result<()> {
        Ok(self.insert(input).await?)
    }

    async fn update_status(
        &self,
        job_id: &str,
        status: JobStatus,
        result: Option<&PodcastResult>,
        error: Option<&str>,
    ) -> anyhow::Result<()> {
        match self.apply_status(job_id, status, result, error).await? {
            StatusUpdate::Applied => Ok(()),
            StatusUpdate::NotFound => Err(anyhow::anyhow!("Job {} not found", job_id)),
            StatusUpdate::Rejected { current } => {
                tracing::warn!("Ignoring '{}' for job {}: already {}", status, job_id, current);
                Ok(())
            }
        }
    }

    async fn get(&self, job_id: &str) -> anyhow::Result<Option<JobRecord>> {
        Ok(self.find(job_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;

    async fn store() -> SqliteJobStore {
        SqliteJobStore::new(init_db("sqlite::memory:").await.unwrap())
    }

    fn input(id: &str) -> JobInput {
        JobInput {
            id: id.to_string(),
            content: format!("content of {}", id),
            title: "Title".to_string(),
            language: "en-IN".to_string(),
        }
    }

    #[tokio::test]
    async fn claims_oldest_pending_job_once() {
        let store = store().await;
        store.insert(&input("first")).await.unwrap();
        store.insert(&input("second")).await.unwrap();

        let claimed = store.claim_next().await.unwrap().unwrap();
        assert_eq!(claimed, input("first"));
        assert_eq!(store.find("first").await.unwrap().unwrap().status, JobStatus::Processing);

        assert_eq!(store.claim_next().await.unwrap().unwrap().id, "second");
        assert!(store.claim_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn terminal_status_is_final() {
        let store = store().await;
        store.insert(&input("job")).await.unwrap();

        assert_eq!(
            store.apply_status("job", JobStatus::Failed, None, Some("boom")).await.unwrap(),
            StatusUpdate::Applied
        );
        assert_eq!(
            store.apply_status("job", JobStatus::Completed, None, None).await.unwrap(),
            StatusUpdate::Rejected { current: JobStatus::Failed }
        );
        assert_eq!(
            store.apply_status("nope", JobStatus::Failed, None, None).await.unwrap(),
            StatusUpdate::NotFound
        );

        let record = store.get("job").await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("boom"));
    }
}
