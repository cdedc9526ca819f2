use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use crate::core::chunker;
use crate::core::podcast::ChunkSummary;
use crate::core::steps::Steps;
use crate::core::summarizer::ChunkSummarizer;
use crate::core::tokens;

/// Content at or under this estimate goes to the script writer untouched.
pub const MAX_TOKENS_FOR_SCRIPT: usize = 4000;
pub const CHUNK_TOKENS: usize = 4000;
pub const MAX_CHUNKS: usize = 20;
pub const SUMMARY_PAUSE: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, PartialEq)]
pub struct PreparedContent {
    pub content: String,
    /// Trailing chunks left out by the chunk cap.
    pub truncated_chunks: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPlan {
    pub chunks: Vec<String>,
    pub dropped: usize,
}

pub fn plan_chunks(content: &str, chunk_tokens: usize, max_chunks: usize) -> ChunkPlan {
    let mut chunks = chunker::chunk(content, chunk_tokens);
    let dropped = chunks.len().saturating_sub(max_chunks);
    if dropped > 0 {
        log::warn!(
            "Document split into {} chunks, only the first {} will be summarized",
            chunks.len(),
            max_chunks
        );
        chunks.truncate(max_chunks);
    }
    ChunkPlan { chunks, dropped }
}

pub fn combine_summaries(title: &str, summaries: &[ChunkSummary]) -> String {
    let sections = summaries
        .iter()
        .map(|s| format!("Section {}: {}", s.chunk_index + 1, s.summary))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Document: {}\n\nThe following is a comprehensive summary of the document organized by sections:\n\n{}",
        title, sections
    )
}

/// Fits a document into the script writer's budget by summarizing it chunk
/// by chunk when it is too long.
pub struct ContentPreprocessor {
    summarizer: ChunkSummarizer,
    summary_pause: Duration,
}

impl ContentPreprocessor {
    pub fn new(summarizer: ChunkSummarizer) -> Self {
        Self {
            summarizer,
            summary_pause: SUMMARY_PAUSE,
        }
    }

    pub async fn process(&self, content: &str, title: &str, steps: &Steps) -> Result<PreparedContent> {
        let needs_chunking = steps
            .run("process-content", || async {
                let estimated = tokens::estimate(content);
                log::info!("Content has ~{} tokens (limit {})", estimated, MAX_TOKENS_FOR_SCRIPT);
                Ok::<_, anyhow::Error>(estimated > MAX_TOKENS_FOR_SCRIPT)
            })
            .await?;

        if !needs_chunking {
            return Ok(PreparedContent {
                content: content.to_string(),
                truncated_chunks: 0,
            });
        }

        let plan: ChunkPlan = steps
            .run("create-chunks", || async {
                Ok::<_, anyhow::Error>(plan_chunks(content, CHUNK_TOKENS, MAX_CHUNKS))
            })
            .await?;

        let total = plan.chunks.len();
        log::info!("Summarizing {} chunks for '{}'", total, title);

        let mut summaries = Vec::with_capacity(total);
        for (index, chunk) in plan.chunks.iter().enumerate() {
            let summary: ChunkSummary = steps
                .run(&format!("summarize-chunk-{}", index + 1), || async {
                    Ok::<_, anyhow::Error>(self.summarizer.summarize_or_fallback(chunk, index, total).await)
                })
                .await?;
            summaries.push(summary);

            if index + 1 < total {
                steps
                    .sleep(&format!("wait-after-chunk-{}", index + 1), self.summary_pause)
                    .await?;
            }
        }

        let failed = summaries.iter().filter(|s| !s.succeeded).count();
        if failed > 0 {
            log::warn!("{} of {} chunks fell back to truncated text", failed, total);
        }

        let combined: String = steps
            .run("combine-summaries", || async {
                Ok::<_, anyhow::Error>(combine_summaries(title, &summaries))
            })
            .await?;

        log::info!(
            "Combined summary has ~{} tokens (from ~{})",
            tokens::estimate(&combined),
            tokens::estimate(content)
        );

        Ok(PreparedContent {
            content: combined,
            truncated_chunks: plan.dropped,
        })
    }
}
