use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use studio::core::ocr::OcrClient;

pub mod db;
pub mod routes;
pub mod store;

use store::SqliteJobStore;

#[derive(Clone)]
pub struct AppState {
    pub jobs: SqliteJobStore,
    pub api_key: String,
    pub audio_dir: String,
    pub ocr: Option<Arc<OcrClient>>,
}

pub fn app(state: AppState) -> Router {
    let audio_dir = state.audio_dir.clone();

    Router::new()
        .route("/api/generate-podcast", post(routes::jobs::generate_podcast))
        .route("/api/job-status/{id}", get(routes::jobs::job_status))
        .route("/api/parse-pdf", post(routes::ocr::parse_pdf))
        .route("/api/internal/jobs", post(routes::internal_api::create_job))
        .route("/api/internal/jobs/claim", post(routes::internal_api::claim_job))
        .route("/api/internal/jobs/{id}/status", post(routes::internal_api::update_status))
        .route("/api/internal/upload", post(routes::upload::upload_audio))
        .nest_service("/audio", ServeDir::new(audio_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024))
        .with_state(state)
}
