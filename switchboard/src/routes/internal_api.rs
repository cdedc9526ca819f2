use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::json;

use studio::core::podcast::{JobInput, JobStatus, PodcastResult};

use crate::routes::authorized;
use crate::store::StatusUpdate;
use crate::AppState;

pub async fn create_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<JobInput>,
) -> impl IntoResponse {
    if !authorized(&state, &headers) {
        return (StatusCode::UNAUTHORIZED, "Invalid API Key").into_response();
    }
    if input.content.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "Content is required" }))).into_response();
    }

    match state.jobs.insert(&input).await {
        Ok(()) => (StatusCode::CREATED, Json(json!({ "jobId": input.id }))).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub async fn claim_job(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if !authorized(&state, &headers) {
        return (StatusCode::UNAUTHORIZED, "Invalid API Key").into_response();
    }

    match state.jobs.claim_next().await {
        Ok(Some(job)) => {
            tracing::info!("Handed job {} to a worker", job.id);
            Json(job).into_response()
        }
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[derive(Deserialize)]
pub struct StatusUpdateRequest {
    pub status: JobStatus,
    pub result: Option<PodcastResult>,
    pub error: Option<String>,
}

pub async fn update_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<StatusUpdateRequest>,
) -> impl IntoResponse {
    if !authorized(&state, &headers) {
        return (StatusCode::UNAUTHORIZED, "Invalid API Key").into_response();
    }

    let result = state
        .jobs
        .apply_status(&id, payload.status, payload.result.as_ref(), payload.error.as_deref())
        .await;

    match result {
        Ok(StatusUpdate::Applied) => Json(json!({ "jobId": id, "status": payload.status })).into_response(),
        Ok(StatusUpdate::NotFound) => {
            (StatusCode::NOT_FOUND, Json(json!({ "error": "Job not found" }))).into_response()
        }
        Ok(StatusUpdate::Rejected { current }) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": format!("Job is already {}", current) })),
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
