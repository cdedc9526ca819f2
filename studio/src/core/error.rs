use thiserror::Error;

/// Failure of a single call to a remote collaborator.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} is not configured")]
    MissingCredential(&'static str),
    #[error("rate limit exceeded after {attempts} attempts")]
    RateLimited { attempts: u32 },
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ApiError::Status { status: 429, .. })
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum SummarizationError {
    #[error("failed to summarize chunk {chunk}: {source}")]
    Api {
        chunk: usize,
        #[source]
        source: ApiError,
    },
    #[error("no summary generated for chunk {0}")]
    Empty(usize),
}

#[derive(Debug, Error)]
pub enum ScriptGenerationError {
    #[error("prompt still too long after processing: {tokens} tokens (max: {limit})")]
    OverBudget { tokens: usize, limit: usize },
    #[error("failed to generate podcast script: {0}")]
    Api(#[from] ApiError),
    #[error("no script generated by the language model")]
    Empty,
    #[error("script is not valid JSON: {0}")]
    Parse(String),
    #[error("invalid script format received from the language model")]
    InvalidShape,
    #[error("generated script is too short ({0} turns) - insufficient content for podcast")]
    TooShort(usize),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("content is required")]
    EmptyContent,
    #[error("no audio segments were generated ({attempted} attempted)")]
    NoAudio { attempted: usize },
}
