use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{multipart, Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::core::config::SwitchboardConfig;
use crate::core::job_store::JobStore;
use crate::core::podcast::{JobInput, JobRecord, JobStatus, PodcastResult};
use crate::core::synth::AudioSink;
use crate::core::worker::JobSource;

pub const AUTH_HEADER: &str = "X-SWITCHBOARD-KEY";

/// Status change sent to the switchboard. Also the unit stored in the outbox.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StatusReport {
    #[serde(rename = "jobId")]
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<PodcastResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// HTTP client for the switchboard's internal API.
pub struct SwitchboardClient {
    client: Client,
    config: SwitchboardConfig,
}

impl SwitchboardClient {
    pub fn new(config: SwitchboardConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(300)) // large audio uploads
                .connect_timeout(std::time::Duration::from_secs(10))
                .pool_idle_timeout(Some(std::time::Duration::from_secs(30)))
                .tcp_keepalive(Some(std::time::Duration::from_secs(60)))
                .build()
                .unwrap_or_else(|_| Client::new()),
            config,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    pub async fn upload_file(&self, data: Vec<u8>, filename: &str, mime: &str) -> Result<String> {
        let part = multipart::Part::bytes(data)
            .file_name(filename.to_string())
            .mime_str(mime)?;

        let form = multipart::Form::new().part("file", part);

        let res = self
            .client
            .post(self.endpoint("/api/internal/upload"))
            .header(AUTH_HEADER, &self.config.auth_key)
            .multipart(form)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow!("Failed to upload file: {} - {}", status, text));
        }

        let json: serde_json::Value = res.json().await?;
        let url = json["url"]
            .as_str()
            .ok_or_else(|| anyhow!("Invalid upload response"))?
            .to_string();
        Ok(url)
    }

    pub async fn upload_audio(&self, audio_data: Vec<u8>, filename: &str) -> Result<String> {
        self.upload_file(audio_data, filename, "audio/wav").await
    }

    pub async fn submit_job(&self, input: &JobInput) -> Result<()> {
        let res = self
            .client
            .post(self.endpoint("/api/internal/jobs"))
            .header(AUTH_HEADER, &self.config.auth_key)
            .json(input)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(anyhow!("Failed to create job {}: {}", input.id, res.status()));
        }
        Ok(())
    }

    /// Takes the oldest pending job, if any. The switchboard marks it
    /// `processing` before answering.
    pub async fn claim_job(&self) -> Result<Option<JobInput>> {
        let res = self
            .client
            .post(self.endpoint("/api/internal/jobs/claim"))
            .header(AUTH_HEADER, &self.config.auth_key)
            .send()
            .await?;

        match res.status() {
            StatusCode::NO_CONTENT => Ok(None),
            status if status.is_success() => Ok(Some(res.json().await?)),
            status => Err(anyhow!("Failed to claim job: {}", status)),
        }
    }

    pub async fn report_status(&self, report: &StatusReport) -> Result<()> {
        let path = format!("/api/internal/jobs/{}/status", report.job_id);
        let res = self
            .client
            .post(self.endpoint(&path))
            .header(AUTH_HEADER, &self.config.auth_key)
            .json(report)
            .send()
            .await?;

        match res.status() {
            StatusCode::CONFLICT => {
                log::warn!(
                    "Job {} is already finished; switchboard ignored '{}'",
                    report.job_id,
                    report.status
                );
                Ok(())
            }
            status if status.is_success() => Ok(()),
            status => {
                let text = res.text().await.unwrap_or_default();
                Err(anyhow!("Failed to report status for job {}: {} - {}", report.job_id, status, text))
            }
        }
    }

    pub async fn fetch_job(&self, job_id: &str) -> Result<Option<JobRecord>> {
        let res = self
            .client
            .get(self.endpoint(&format!("/api/job-status/{}", job_id)))
            .send()
            .await?;

        match res.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(res.json().await?)),
            status => Err(anyhow!("Failed to fetch job {}: {}", job_id, status)),
        }
    }
}

#[async_trait]
impl AudioSink for SwitchboardClient {
    async fn store_audio(&self, data: Vec<u8>, filename: &str) -> Result<String> {
        self.upload_audio(data, filename).await
    }
}

#[async_trait]
impl JobSource for SwitchboardClient {
    async fn claim(&self) -> Result<Option<JobInput>> {
        self.claim_job().await
    }
}

#[async_trait]
impl JobStore for SwitchboardClient {
    async fn create_job(&self, input: &JobInput) -> Result<()> {
        self.submit_job(input).await
    }

    async fn update_status(
        &self,
        job_id: &str,
        status: JobStatus,
        result: Option<&PodcastResult>,
        error: Option<&str>,
    ) -> Result<()> {
        self.report_status(&StatusReport {
            job_id: job_id.to_string(),
            status,
            result: result.cloned(),
            error: error.map(str::to_string),
        })
        .await
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>> {
        self.fetch_job(job_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Multipart, Path},
        http::{HeaderMap, StatusCode as AxumStatus},
        response::IntoResponse,
        routing::{get, post},
        Json, Router,
    };

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get(AUTH_HEADER).and_then(|v| v.to_str().ok()) == Some("secret")
    }

    async fn claim(headers: HeaderMap) -> axum::response::Response {
        if !authorized(&headers) {
            return AxumStatus::UNAUTHORIZED.into_response();
        }
        Json(serde_json::json!({
            "id": "job-1",
            "content": "Some text.",
            "title": "Doc",
            "language": "hi-IN"
        }))
        .into_response()
    }

    async fn status(Path(id): Path<String>) -> AxumStatus {
        if id == "done" {
            AxumStatus::CONFLICT
        } else if id == "ghost" {
            AxumStatus::NOT_FOUND
        } else {
            AxumStatus::OK
        }
    }

    async fn create(headers: HeaderMap, Json(input): Json<JobInput>) -> AxumStatus {
        if !authorized(&headers) {
            AxumStatus::UNAUTHORIZED
        } else if input.content.trim().is_empty() {
            AxumStatus::BAD_REQUEST
        } else {
            AxumStatus::CREATED
        }
    }

    async fn upload(mut multipart: Multipart) -> Json<serde_json::Value> {
        let mut name = String::new();
        while let Ok(Some(field)) = multipart.next_field().await {
            name = field.file_name().unwrap_or_default().to_string();
        }
        Json(serde_json::json!({ "url": format!("/audio/{}", name), "filename": name }))
    }

    async fn start_mock_switchboard(has_work: bool) -> SwitchboardClient {
        let app = if has_work {
            Router::new().route("/api/internal/jobs/claim", post(claim))
        } else {
            Router::new().route("/api/internal/jobs/claim", post(|| async { AxumStatus::NO_CONTENT }))
        }
        .route("/api/internal/jobs", post(create))
        .route("/api/internal/jobs/{id}/status", post(status))
        .route("/api/internal/upload", post(upload))
        .route("/api/job-status/{id}", get(|| async { AxumStatus::NOT_FOUND }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        SwitchboardClient::new(SwitchboardConfig {
            api_url: format!("http://{}", addr),
            auth_key: "secret".to_string(),
        })
    }

    fn report(job_id: &str) -> StatusReport {
        StatusReport {
            job_id: job_id.to_string(),
            status: JobStatus::Failed,
            result: None,
            error: Some("boom".to_string()),
        }
    }

    #[tokio::test]
    async fn claim_returns_job_input() {
        let client = start_mock_switchboard(true).await;
        let job = client.claim_job().await.unwrap().unwrap();
        assert_eq!(job.id, "job-1");
        assert_eq!(job.language, "hi-IN");
    }

    #[tokio::test]
    async fn claim_with_empty_queue_is_none() {
        let client = start_mock_switchboard(false).await;
        assert!(client.claim_job().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn conflict_on_finished_job_is_not_an_error() {
        let client = start_mock_switchboard(false).await;
        client.report_status(&report("done")).await.unwrap();
        client.report_status(&report("job-2")).await.unwrap();
        assert!(client.report_status(&report("ghost")).await.is_err());
    }

    #[tokio::test]
    async fn upload_returns_served_url() {
        let client = start_mock_switchboard(false).await;
        let url = client
            .upload_audio(b"RIFF".to_vec(), "podcast-job-1-segment-1-host.wav")
            .await
            .unwrap();
        assert_eq!(url, "/audio/podcast-job-1-segment-1-host.wav");
    }

    #[tokio::test]
    async fn submitted_job_is_created() {
        let client = start_mock_switchboard(false).await;
        let mut input = JobInput {
            id: "job-3".to_string(),
            content: "Some text.".to_string(),
            title: "Doc".to_string(),
            language: "en-IN".to_string(),
        };
        client.submit_job(&input).await.unwrap();

        input.content = "  ".to_string();
        assert!(client.submit_job(&input).await.is_err());
    }

    #[tokio::test]
    async fn unknown_job_fetches_as_none() {
        let client = start_mock_switchboard(false).await;
        assert!(client.fetch_job("missing").await.unwrap().is_none());
    }
}
