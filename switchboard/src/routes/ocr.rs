use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::AppState;

fn error(status: StatusCode, message: &str) -> axum::response::Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Turns an uploaded PDF (multipart field `pdf`) into document text.
pub async fn parse_pdf(State(state): State<AppState>, mut multipart: Multipart) -> impl IntoResponse {
    let mut pdf = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("pdf") {
                    continue;
                }
                let is_pdf = field
                    .content_type()
                    .and_then(|ct| ct.parse::<mime::Mime>().ok())
                    .map(|m| m.essence_str() == mime::APPLICATION_PDF.essence_str())
                    .unwrap_or(false);
                if !is_pdf {
                    return error(StatusCode::BAD_REQUEST, "File must be a PDF");
                }
                match field.bytes().await {
                    Ok(bytes) => pdf = Some(bytes),
                    Err(e) => return error(StatusCode::BAD_REQUEST, &format!("Multipart error: {}", e)),
                }
                break;
            }
            Ok(None) => break,
            Err(e) => return error(StatusCode::BAD_REQUEST, &format!("Multipart error: {}", e)),
        }
    }

    let Some(pdf) = pdf else {
        return error(StatusCode::BAD_REQUEST, "No PDF file provided");
    };

    let Some(ocr) = state.ocr.as_ref() else {
        tracing::error!("PDF upload rejected: OCR_API_KEY is not set");
        return error(StatusCode::SERVICE_UNAVAILABLE, "OCR is not configured");
    };

    tracing::info!("Processing PDF ({} bytes)", pdf.len());
    match ocr.extract(&pdf).await {
        Ok(document) => {
            tracing::info!(
                "OCR extracted {} chars from {} pages",
                document.content.len(),
                document.metadata.pages_processed
            );
            Json(document).into_response()
        }
        Err(e) => {
            tracing::error!("OCR failed: {}", e);
            error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process PDF with OCR")
        }
    }
}
