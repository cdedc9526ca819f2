use std::net::SocketAddr;
use std::sync::Arc;
use tokio::fs;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use studio::core::config::{default_ocr_model, OcrConfig};
use studio::core::ocr::OcrClient;
use switchboard::db::{self, DEFAULT_DATABASE_URL};
use switchboard::store::SqliteJobStore;
use switchboard::{app, AppState};

fn ocr_from_env() -> Option<Arc<OcrClient>> {
    let api_key = std::env::var("OCR_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let config = OcrConfig {
        api_url: std::env::var("OCR_API_URL").unwrap_or_else(|_| "https://api.mistral.ai/v1".to_string()),
        api_key,
        model: std::env::var("OCR_MODEL").unwrap_or_else(|_| default_ocr_model()),
    };
    Some(Arc::new(OcrClient::new(config)))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "switchboard=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
    let db_pool = db::init_db(&database_url).await.expect("Failed to initialize DB");

    // Ensure audio directory exists
    let audio_dir = std::env::var("AUDIO_DIR").unwrap_or_else(|_| "audio".to_string());
    fs::create_dir_all(&audio_dir).await.expect("Failed to create audio dir");

    let api_key = std::env::var("SWITCHBOARD_KEY").unwrap_or_else(|_| "my-secret-key-123".to_string());

    let ocr = ocr_from_env();
    if ocr.is_none() {
        tracing::warn!("OCR_API_KEY not set, /api/parse-pdf will answer 503");
    }

    let state = AppState {
        jobs: SqliteJobStore::new(db_pool),
        api_key,
        audio_dir,
        ocr,
    };

    let port = std::env::var("PORT").unwrap_or_else(|_| "8899".to_string()).parse::<u16>().unwrap_or(8899);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app(state)).await.unwrap();
}
