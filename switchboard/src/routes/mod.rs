use axum::http::HeaderMap;

use studio::core::switchboard::AUTH_HEADER;

use crate::AppState;

pub mod internal_api;
pub mod jobs;
pub mod ocr;
pub mod upload;

/// Worker-facing routes require the shared key in `X-SWITCHBOARD-KEY`.
pub(crate) fn authorized(state: &AppState, headers: &HeaderMap) -> bool {
    let api_key = headers.get(AUTH_HEADER).and_then(|v| v.to_str().ok());
    api_key == Some(state.api_key.as_str())
}
