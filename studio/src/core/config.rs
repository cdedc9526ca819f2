use serde::Deserialize;
use std::fs;
use anyhow::Result;

use crate::core::error::ApiError;

/// Environment variable consulted when a config section leaves `api_key` out.
pub const API_KEY_ENV: &str = "STUDIO_API_KEY";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub switchboard: SwitchboardConfig,
    pub llm: LlmConfig,
    pub tts: TtsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SwitchboardConfig {
    pub api_url: String,
    pub auth_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub api_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl LlmConfig {
    pub fn api_key(&self) -> Result<&str, ApiError> {
        non_empty(&self.api_key).ok_or(ApiError::MissingCredential("LLM API key"))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TtsConfig {
    pub api_url: String,
    #[serde(default = "default_tts_model")]
    pub model: String,
    pub api_key: Option<String>,
    #[serde(default = "default_pace")]
    pub pace: f32,
    #[serde(default = "default_loudness")]
    pub loudness: f32,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_true")]
    pub enable_preprocessing: bool,
}

impl TtsConfig {
    pub fn api_key(&self) -> Result<&str, ApiError> {
        non_empty(&self.api_key).ok_or(ApiError::MissingCredential("TTS API key"))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_min_call_interval")]
    pub min_call_interval_ms: u64,
    #[serde(default = "default_outbox_interval")]
    pub outbox_interval_secs: u64,
    pub cache_dir: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            min_call_interval_ms: default_min_call_interval(),
            outbox_interval_secs: default_outbox_interval(),
            cache_dir: None,
        }
    }
}

impl PipelineConfig {
    pub fn cache_dir(&self) -> String {
        match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => {
                let home_dir = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                format!("{}/.studio/cache", home_dir)
            }
        }
    }
}

/// OCR collaborator settings. Used by the HTTP front door, which builds them
/// from its environment.
#[derive(Debug, Deserialize, Clone)]
pub struct OcrConfig {
    pub api_url: String,
    pub api_key: String,
    #[serde(default = "default_ocr_model")]
    pub model: String,
}

fn default_tts_model() -> String { "bulbul:v2".to_string() }
fn default_pace() -> f32 { 1.0 }
fn default_loudness() -> f32 { 1.2 }
fn default_sample_rate() -> u32 { 22050 }
fn default_true() -> bool { true }
fn default_poll_interval() -> u64 { 5 }
fn default_min_call_interval() -> u64 { 1000 }
fn default_outbox_interval() -> u64 { 300 }
pub fn default_ocr_model() -> String { "mistral-ocr-latest".to_string() }

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub fn parse_config(content: &str) -> Result<Config> {
    let mut config: Config = toml::from_str(content)?;
    let env_key = std::env::var(API_KEY_ENV).ok();
    if non_empty(&config.llm.api_key).is_none() {
        config.llm.api_key = env_key.clone();
    }
    if non_empty(&config.tts.api_key).is_none() {
        config.tts.api_key = env_key;
    }
    Ok(config)
}

pub fn load_config(path: &str) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

pub const STARTER_CONFIG: &str = r#"
[switchboard]
api_url = "http://localhost:8899"
auth_key = "my-secret-key-123"

[llm]
api_url = "https://api.sarvam.ai/v1"
model = "sarvam-m"
# api_key = "..."   # or export STUDIO_API_KEY

[tts]
api_url = "https://api.sarvam.ai"
model = "bulbul:v2"

[pipeline]
poll_interval_secs = 5
min_call_interval_ms = 1000
"#;
