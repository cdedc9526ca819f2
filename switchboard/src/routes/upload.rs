use axum::{
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde_json::json;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::routes::authorized;
use crate::AppState;

const DEFAULT_FILENAME: &str = "audio.wav";

pub async fn upload_audio(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> impl IntoResponse {
    if !authorized(&state, &headers) {
        return (StatusCode::UNAUTHORIZED, "Invalid API Key").into_response();
    }

    loop {
        match multipart.next_field().await {
            Ok(Some(mut field)) => {
                if field.name() != Some("file") {
                    continue;
                }

                // Keep only the final path component
                let file_name = field.file_name().unwrap_or(DEFAULT_FILENAME).to_string();
                let sanitized_file_name = Path::new(&file_name)
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or(DEFAULT_FILENAME)
                    .to_string();

                let filepath = Path::new(&state.audio_dir).join(&sanitized_file_name);

                let mut file = match fs::File::create(&filepath).await {
                    Ok(f) => f,
                    Err(e) => {
                        return (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to create file: {}", e))
                            .into_response()
                    }
                };

                loop {
                    match field.chunk().await {
                        Ok(Some(chunk)) => {
                            if let Err(e) = file.write_all(&chunk).await {
                                return (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to write chunk: {}", e))
                                    .into_response();
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            return (StatusCode::BAD_REQUEST, format!("Multipart error: {}", e)).into_response()
                        }
                    }
                }
                if let Err(e) = file.flush().await {
                    return (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to write file: {}", e)).into_response();
                }

                tracing::info!("Stored {}", sanitized_file_name);
                return Json(json!({
                    "url": format!("/audio/{}", sanitized_file_name),
                    "filename": sanitized_file_name
                }))
                .into_response();
            }
            Ok(None) => break,
            Err(e) => return (StatusCode::BAD_REQUEST, format!("Multipart error: {}", e)).into_response(),
        }
    }

    (StatusCode::BAD_REQUEST, "No file found").into_response()
}
