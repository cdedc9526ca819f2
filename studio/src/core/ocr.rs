use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::config::OcrConfig;
use crate::core::error::ApiError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRegion {
    pub id: String,
    pub coordinates: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub model: String,
    pub pages_processed: u32,
}

/// Text extracted from an uploaded PDF, ready to be submitted as job content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub images: Vec<ImageRegion>,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    pages: Vec<OcrPage>,
    #[serde(default)]
    usage_info: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct OcrPage {
    #[serde(default)]
    markdown: String,
    #[serde(default)]
    images: Vec<OcrImage>,
}

#[derive(Debug, Deserialize)]
struct OcrImage {
    id: String,
    top_left_x: Option<f64>,
    top_left_y: Option<f64>,
    bottom_right_x: Option<f64>,
    bottom_right_y: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    pages_processed: u32,
}

pub struct OcrClient {
    client: Client,
    config: OcrConfig,
}

impl OcrClient {
    pub fn new(config: OcrConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(300))
                .build()
                .unwrap_or_else(|_| Client::new()),
            config,
        }
    }

    /// Sends the PDF inline as a data URI and collects page markdown.
    pub async fn extract(&self, pdf: &[u8]) -> Result<Document, ApiError> {
        let encoded = general_purpose::STANDARD.encode(pdf);
        let body = json!({
            "model": self.config.model,
            "document": {
                "type": "document_url",
                "document_url": format!("data:application/pdf;base64,{}", encoded),
            },
            "include_image_base64": false,
        });

        let url = format!("{}/ocr", self.config.api_url.trim_end_matches('/'));
        log::info!("Sending {} byte PDF to OCR", pdf.len());

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let error_text = res.text().await.unwrap_or_default();
            log::error!("OCR Error {}: {}", status, error_text);
            return Err(ApiError::Status { status: status.as_u16(), body: error_text });
        }

        let response: OcrResponse = res.json().await?;
        Ok(into_document(response, &self.config.model))
    }
}

fn into_document(response: OcrResponse, requested_model: &str) -> Document {
    let pages_processed = response
        .usage_info
        .map(|u| u.pages_processed)
        .unwrap_or(response.pages.len() as u32);

    let content = response
        .pages
        .iter()
        .map(|p| p.markdown.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
        .trim()
        .to_string();

    let images = response
        .pages
        .into_iter()
        .flat_map(|p| p.images)
        .filter_map(|img| {
            let (x, y) = (img.top_left_x?, img.top_left_y?);
            let (right, bottom) = (img.bottom_right_x?, img.bottom_right_y?);
            Some(ImageRegion {
                id: img.id,
                coordinates: BoundingBox { x, y, width: right - x, height: bottom - y },
            })
        })
        .collect();

    Document {
        content,
        images,
        metadata: DocumentMetadata {
            model: response.model.unwrap_or_else(|| requested_model.to_string()),
            pages_processed,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>;

    async fn start_mock_ocr(status: StatusCode, reply: serde_json::Value) -> (String, Seen) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let app = Router::new().route(
            "/ocr",
            post(move |headers: HeaderMap, Json(body): Json<serde_json::Value>| {
                let recorder = recorder.clone();
                let reply = reply.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    recorder.lock().unwrap().push((auth, body));
                    (status, Json(reply))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        (format!("http://{}", addr), seen)
    }

    fn config(api_url: &str) -> OcrConfig {
        OcrConfig {
            api_url: format!("{}/", api_url),
            api_key: "ocr-key".to_string(),
            model: "mistral-ocr-latest".to_string(),
        }
    }

    #[tokio::test]
    async fn extract_sends_pdf_as_data_uri() {
        let (url, seen) = start_mock_ocr(
            StatusCode::OK,
            serde_json::json!({
                "model": "mistral-ocr-2505",
                "pages": [{ "index": 0, "markdown": "  Hello PDF.\n" }],
                "usage_info": { "pages_processed": 1 }
            }),
        )
        .await;
        let client = OcrClient::new(config(&url));

        let doc = client.extract(b"%PDF-1.4").await.unwrap();

        assert_eq!(doc.content, "Hello PDF.");
        assert_eq!(doc.metadata.model, "mistral-ocr-2505");
        assert_eq!(doc.metadata.pages_processed, 1);

        let seen = seen.lock().unwrap();
        let (auth, body) = &seen[0];
        assert_eq!(auth.as_deref(), Some("Bearer ocr-key"));
        assert_eq!(body["model"], "mistral-ocr-latest");
        assert_eq!(body["document"]["type"], "document_url");
        assert_eq!(
            body["document"]["document_url"],
            format!("data:application/pdf;base64,{}", general_purpose::STANDARD.encode(b"%PDF-1.4"))
        );
        assert_eq!(body["include_image_base64"], false);
    }

    #[tokio::test]
    async fn extract_surfaces_vendor_errors() {
        let (url, _) = start_mock_ocr(
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({ "message": "boom" }),
        )
        .await;
        let client = OcrClient::new(config(&url));

        let err = client.extract(b"%PDF-1.4").await.unwrap_err();

        assert!(matches!(err, ApiError::Status { status: 500, .. }));
    }

    #[test]
    fn joined_content_is_trimmed() {
        let response: OcrResponse = serde_json::from_value(serde_json::json!({
            "pages": [{ "markdown": "\n\n  First." }, { "markdown": "Last.  \n" }]
        }))
        .unwrap();

        let doc = into_document(response, "mistral-ocr-latest");

        assert_eq!(doc.content, "First.\n\nLast.");
    }

    #[test]
    fn pages_are_joined_and_boxes_converted() {
        let response: OcrResponse = serde_json::from_value(serde_json::json!({
            "model": "mistral-ocr-2505",
            "pages": [
                {
                    "index": 0,
                    "markdown": "# Title\nIntro.",
                    "images": [{
                        "id": "img-0.jpeg",
                        "top_left_x": 10.0, "top_left_y": 20.0,
                        "bottom_right_x": 110.0, "bottom_right_y": 70.0
                    }]
                },
                { "index": 1, "markdown": "Second page.", "images": [{ "id": "img-1.jpeg" }] }
            ],
            "usage_info": { "pages_processed": 2, "doc_size_bytes": 1234 }
        }))
        .unwrap();

        let doc = into_document(response, "mistral-ocr-latest");

        assert_eq!(doc.content, "# Title\nIntro.\n\nSecond page.");
        assert_eq!(doc.metadata.model, "mistral-ocr-2505");
        assert_eq!(doc.metadata.pages_processed, 2);
        assert_eq!(doc.images.len(), 1);
        assert_eq!(
            doc.images[0].coordinates,
            BoundingBox { x: 10.0, y: 20.0, width: 100.0, height: 50.0 }
        );
    }

    #[test]
    fn missing_usage_counts_pages() {
        let response: OcrResponse = serde_json::from_value(serde_json::json!({
            "pages": [{ "markdown": "a" }, { "markdown": "b" }, { "markdown": "c" }]
        }))
        .unwrap();

        let doc = into_document(response, "mistral-ocr-latest");

        assert_eq!(doc.metadata.pages_processed, 3);
        assert_eq!(doc.metadata.model, "mistral-ocr-latest");
        assert!(doc.images.is_empty());
    }

    #[test]
    fn document_serializes_with_camel_case_metadata() {
        let doc = Document {
            content: "text".to_string(),
            images: vec![],
            metadata: DocumentMetadata { model: "m".to_string(), pages_processed: 1 },
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["metadata"]["pagesProcessed"], 1);
    }
}
