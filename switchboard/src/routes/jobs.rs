use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use studio::core::job_store::JobStore;
use studio::core::language::{is_supported, DEFAULT_LANGUAGE};
use studio::core::podcast::JobInput;

use crate::AppState;

pub const DEFAULT_TITLE: &str = "Untitled Document";

#[derive(Deserialize)]
pub struct GeneratePodcastRequest {
    #[serde(default)]
    pub content: String,
    pub title: Option<String>,
    pub language: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub async fn generate_podcast(
    State(state): State<AppState>,
    Json(payload): Json<GeneratePodcastRequest>,
) -> impl IntoResponse {
    if payload.content.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "Content is required" }))).into_response();
    }

    let language = non_blank(payload.language).unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
    if !is_supported(&language) {
        tracing::warn!("Unknown language '{}', prompts will fall back to English", language);
    }

    let input = JobInput {
        id: Uuid::new_v4().to_string(),
        content: payload.content,
        title: non_blank(payload.title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        language,
    };

    match state.jobs.create_job(&input).await {
        Ok(()) => {
            tracing::info!("Created podcast job {} ('{}')", input.id, input.title);
            Json(json!({
                "jobId": input.id,
                "status": "pending",
                "message": "Podcast generation started. Poll the status URL for progress.",
                "statusUrl": format!("/api/job-status/{}", input.id),
            }))
            .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to create job: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to start podcast generation" })),
            )
                .into_response()
        }
    }
}

pub async fn job_status(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.jobs.get(&id).await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, Json(json!({ "error": "Job not found" }))).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() }))).into_response(),
    }
}
