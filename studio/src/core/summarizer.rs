use std::sync::Arc;

use crate::core::error::SummarizationError;
use crate::core::llm::{ChatModel, ChatRequest};
use crate::core::podcast::ChunkSummary;
use crate::core::rate_limit::RateLimiter;
use crate::core::tokens;

const TEMPERATURE: f32 = 0.5;
const MAX_OUTPUT_TOKENS: u32 = 4096;
const FALLBACK_CHARS: usize = 2000;

pub struct ChunkSummarizer {
    llm: Arc<dyn ChatModel>,
    limiter: Arc<RateLimiter>,
}

impl ChunkSummarizer {
    pub fn new(llm: Arc<dyn ChatModel>, limiter: Arc<RateLimiter>) -> Self {
        Self { llm, limiter }
    }

    /// `index` is 0-based; the prompt shows it 1-based.
    pub fn prompt(chunk: &str, index: usize, total: usize) -> String {
        format!(
            "You are a content summarizer. Please provide a comprehensive summary of the following content.\n\n\
             This is chunk {} of {} from a larger document.\n\n\
             Content to summarize:\n{}\n\n\
             Requirements:\n\
             - Create a detailed summary that captures all key points, concepts, and important technical details\n\
             - Maintain the technical accuracy and context\n\
             - Include specific examples, numbers, and data points mentioned\n\
             - Keep the summary comprehensive but concise\n\
             - Focus on the most important information that would be relevant for a podcast discussion\n\n\
             Provide only the summary without any additional formatting or explanations.",
            index + 1,
            total,
            chunk
        )
    }

    pub async fn summarize(&self, chunk: &str, index: usize, total: usize) -> Result<String, SummarizationError> {
        let request = ChatRequest::user(Self::prompt(chunk, index, total), TEMPERATURE)
            .with_max_tokens(MAX_OUTPUT_TOKENS);

        log::info!("Summarizing chunk {}/{} (~{} tokens)", index + 1, total, tokens::estimate(chunk));

        let summary = self
            .limiter
            .run(|| self.llm.chat(&request))
            .await
            .map_err(|source| SummarizationError::Api { chunk: index, source })?;

        let summary = summary.trim();
        if summary.is_empty() {
            return Err(SummarizationError::Empty(index));
        }
        Ok(summary.to_string())
    }

    /// Never fails: a chunk that cannot be summarized contributes its own
    /// leading text instead.
    pub async fn summarize_or_fallback(&self, chunk: &str, index: usize, total: usize) -> ChunkSummary {
        match self.summarize(chunk, index, total).await {
            Ok(summary) => ChunkSummary { chunk_index: index, summary, succeeded: true },
            Err(e) => {
                log::error!("{}. Using truncated original text.", e);
                ChunkSummary {
                    chunk_index: index,
                    summary: fallback_summary(chunk),
                    succeeded: false,
                }
            }
        }
    }
}

pub fn fallback_summary(chunk: &str) -> String {
    format!("{}...", tokens::truncate_chars(chunk, FALLBACK_CHARS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ApiError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedChat {
        replies: Mutex<Vec<Result<String, ApiError>>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedChat {
        fn new(replies: Vec<Result<String, ApiError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedChat {
        async fn chat(&self, request: &ChatRequest) -> Result<String, ApiError> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies.lock().unwrap().remove(0)
        }
    }

    fn summarizer(chat: Arc<ScriptedChat>) -> ChunkSummarizer {
        ChunkSummarizer::new(chat, Arc::new(RateLimiter::new(std::time::Duration::ZERO)))
    }

    #[test]
    fn prompt_shows_one_based_position() {
        let prompt = ChunkSummarizer::prompt("Body text.", 2, 5);
        assert!(prompt.contains("This is chunk 3 of 5 from a larger document."));
        assert!(prompt.contains("Content to summarize:\nBody text.\n\n"));
    }

    #[tokio::test]
    async fn uses_summary_settings() {
        let chat = ScriptedChat::new(vec![Ok("  A dense summary. ".to_string())]);
        let summary = summarizer(chat.clone()).summarize("chunk", 0, 1).await.unwrap();

        assert_eq!(summary, "A dense summary.");
        let requests = chat.requests.lock().unwrap();
        assert_eq!(requests[0].temperature, 0.5);
        assert_eq!(requests[0].max_tokens, Some(4096));
    }

    #[tokio::test]
    async fn blank_summary_is_an_error() {
        let chat = ScriptedChat::new(vec![Ok("   ".to_string())]);
        let err = summarizer(chat).summarize("chunk", 4, 6).await.unwrap_err();
        assert!(matches!(err, SummarizationError::Empty(4)));
    }

    #[tokio::test]
    async fn failure_falls_back_to_leading_text() {
        let chunk = "x".repeat(2500);
        let chat = ScriptedChat::new(vec![Err(ApiError::RateLimited { attempts: 4 })]);

        let result = summarizer(chat).summarize_or_fallback(&chunk, 1, 3).await;

        assert!(!result.succeeded);
        assert_eq!(result.chunk_index, 1);
        assert_eq!(result.summary.len(), 2003);
        assert!(result.summary.ends_with("x..."));
    }

    #[test]
    fn short_chunks_fall_back_whole() {
        assert_eq!(fallback_summary("Short chunk."), "Short chunk....");
    }
}
